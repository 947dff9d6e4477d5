use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    editor: EditorConfig,
    #[serde(default)]
    player: PlayerConfig,
}

#[derive(Deserialize, Default)]
struct EditorConfig {
    viewport_bars: Option<u32>,
    pitch_low_octave: Option<i32>,
    pitch_high_octave: Option<i32>,
    undo_depth: Option<usize>,
}

#[derive(Deserialize, Default)]
struct PlayerConfig {
    tick_interval_ms: Option<u64>,
    track: Option<usize>,
}

/// Editing parameters resolved from the config files.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSettings {
    pub viewport_bars: f32,
    pub pitch_low_octave: i32,
    pub pitch_high_octave: i32,
    pub undo_depth: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            viewport_bars: 2.0,
            pitch_low_octave: 3,
            pitch_high_octave: 5,
            undo_depth: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSettings {
    pub tick_interval: Duration,
    pub track: usize,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1),
            track: 0,
        }
    }
}

pub struct Config {
    editor: EditorConfig,
    player: PlayerConfig,
}

impl Config {
    /// Embedded defaults overlaid with the user's config file, if any.
    pub fn load() -> Self {
        let mut config = Self::embedded();
        if let Some(path) = user_config_path() {
            if path.exists() {
                config.merge_file(&path);
            }
        }
        config
    }

    /// Embedded defaults overlaid with the TOML text `user`.
    pub fn from_toml_str(user: &str) -> Result<Self, toml::de::Error> {
        let user: ConfigFile = toml::from_str(user)?;
        let mut config = Self::embedded();
        config.merge(user);
        Ok(config)
    }

    /// Embedded defaults overlaid with the file at `path`. Unreadable or
    /// malformed files are logged and skipped.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::embedded();
        config.merge_file(path);
        config
    }

    fn embedded() -> Self {
        let base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        Self {
            editor: base.editor,
            player: base.player,
        }
    }

    fn merge_file(&mut self, path: &Path) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => self.merge(user),
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
            }
        }
    }

    fn merge(&mut self, user: ConfigFile) {
        merge_editor(&mut self.editor, user.editor);
        merge_player(&mut self.player, user.player);
    }

    pub fn editor(&self) -> EditorSettings {
        let fallback = EditorSettings::default();
        let low = self
            .editor
            .pitch_low_octave
            .unwrap_or(fallback.pitch_low_octave);
        let high = self
            .editor
            .pitch_high_octave
            .unwrap_or(fallback.pitch_high_octave);
        if high < low {
            log::warn!(target: "config", "pitch_high_octave {} is below pitch_low_octave {}, swapping", high, low);
        }
        EditorSettings {
            viewport_bars: self
                .editor
                .viewport_bars
                .filter(|&bars| bars > 0)
                .map(|bars| bars as f32)
                .unwrap_or(fallback.viewport_bars),
            pitch_low_octave: low.min(high),
            pitch_high_octave: low.max(high),
            undo_depth: self.editor.undo_depth.unwrap_or(fallback.undo_depth).max(1),
        }
    }

    pub fn player(&self) -> PlayerSettings {
        let fallback = PlayerSettings::default();
        PlayerSettings {
            tick_interval: self
                .player
                .tick_interval_ms
                .map(|ms| Duration::from_millis(ms.clamp(1, 100)))
                .unwrap_or(fallback.tick_interval),
            track: self.player.track.unwrap_or(fallback.track),
        }
    }
}

/// `<config dir>/midiseq/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("midiseq").join("config.toml"))
}

fn merge_editor(base: &mut EditorConfig, user: EditorConfig) {
    if user.viewport_bars.is_some() {
        base.viewport_bars = user.viewport_bars;
    }
    if user.pitch_low_octave.is_some() {
        base.pitch_low_octave = user.pitch_low_octave;
    }
    if user.pitch_high_octave.is_some() {
        base.pitch_high_octave = user.pitch_high_octave;
    }
    if user.undo_depth.is_some() {
        base.undo_depth = user.undo_depth;
    }
}

fn merge_player(base: &mut PlayerConfig, user: PlayerConfig) {
    if user.tick_interval_ms.is_some() {
        base.tick_interval_ms = user.tick_interval_ms;
    }
    if user.track.is_some() {
        base.track = user.track;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.editor(), EditorSettings::default());
        assert_eq!(config.player(), PlayerSettings::default());
    }

    #[test]
    fn user_values_override_only_what_they_set() {
        let config = Config::from_toml_str(
            r#"
            [editor]
            viewport_bars = 4
            [player]
            track = 2
            "#,
        )
        .unwrap();
        let editor = config.editor();
        assert_eq!(editor.viewport_bars, 4.0);
        assert_eq!(editor.pitch_low_octave, 3);
        assert_eq!(editor.undo_depth, 500);
        assert_eq!(config.player().track, 2);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = Config::from_toml_str(
            r#"
            [editor]
            undo_depth = 0
            pitch_low_octave = 6
            pitch_high_octave = 2
            [player]
            tick_interval_ms = 5000
            "#,
        )
        .unwrap();
        let editor = config.editor();
        assert_eq!(editor.undo_depth, 1);
        assert_eq!((editor.pitch_low_octave, editor.pitch_high_octave), (2, 6));
        assert_eq!(config.player().tick_interval, Duration::from_millis(100));
    }

    #[test]
    fn malformed_text_is_an_error() {
        assert!(Config::from_toml_str("[editor\nviewport_bars = ").is_err());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "viewport_bars = [").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.editor(), EditorSettings::default());

        std::fs::write(&path, "[player]\ntick_interval_ms = 10\n").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.player().tick_interval, Duration::from_millis(10));
    }
}
