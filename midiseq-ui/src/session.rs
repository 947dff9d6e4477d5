//! One interactive editing session: a sequencer, its action log, and an
//! optional player thread, driven one input line at a time.
//!
//! A line is either a key name (see [`crate::keys`]) or a `:` command:
//! `:save PATH`, `:track N`, `:play`, `:stop`, `:show`, `:quit`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use midiseq_audio::PlayerThread;
use midiseq_core::action::{dispatch, EditorAction};
use midiseq_core::config::{EditorSettings, PlayerSettings};
use midiseq_core::interaction_log::InteractionLog;
use midiseq_core::persistence;
use midiseq_core::sequencer::MidiSequencer;
use midiseq_types::MidiSong;

use crate::keys;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// The view may have changed and should be redrawn.
    Redraw,
    /// Nothing to redraw; print this instead.
    Message(String),
    Quit,
}

pub struct Session {
    seq: MidiSequencer,
    log: Option<InteractionLog>,
    player: Option<PlayerThread>,
    tick_interval: Duration,
    save_path: Option<PathBuf>,
}

impl Session {
    pub fn new(song: MidiSong, editor: &EditorSettings, player: &PlayerSettings) -> Self {
        let mut seq = MidiSequencer::with_settings(Arc::new(song), editor);
        if player.track != seq.track_number() {
            seq.set_track_number(player.track);
        }
        Self {
            seq,
            log: None,
            player: None,
            tick_interval: player.tick_interval,
            save_path: None,
        }
    }

    pub fn with_log(mut self, log: InteractionLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Where `:save` without an argument writes.
    pub fn with_save_path(mut self, path: PathBuf) -> Self {
        self.save_path = Some(path);
        self
    }

    pub fn sequencer(&self) -> &MidiSequencer {
        &self.seq
    }

    pub fn apply(&mut self, action: &EditorAction) {
        let result = dispatch(&mut self.seq, action);
        log::debug!(target: "editor", "{:?} -> changed {}", action, result.model_changed);
        if let Some(log) = self.log.as_mut() {
            log.log_action(action, &result);
        }
    }

    pub fn handle_line(&mut self, line: &str) -> LineOutcome {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return LineOutcome::Message(String::new());
        }
        if let Some(cmd) = line.strip_prefix(':') {
            return self.handle_command(cmd.trim());
        }
        match keys::parse_key(line).and_then(keys::action_for_key) {
            Some(action) => {
                self.apply(&action);
                LineOutcome::Redraw
            }
            None => LineOutcome::Message(format!("unbound key: {}", line)),
        }
    }

    fn handle_command(&mut self, cmd: &str) -> LineOutcome {
        let (name, arg) = match cmd.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (cmd, None),
        };
        match name {
            "q" | "quit" => LineOutcome::Quit,
            "show" => LineOutcome::Redraw,
            "save" | "w" => {
                let path = match arg.map(PathBuf::from).or_else(|| self.save_path.clone()) {
                    Some(path) => path,
                    None => return LineOutcome::Message("save needs a path".into()),
                };
                LineOutcome::Message(self.save(&path))
            }
            "track" => match arg.and_then(|a| a.parse::<usize>().ok()) {
                Some(track) => {
                    self.seq.set_track_number(track);
                    if let Some(player) = &self.player {
                        player.set_track(track);
                    }
                    LineOutcome::Redraw
                }
                None => LineOutcome::Message("track needs a number".into()),
            },
            "play" => LineOutcome::Message(self.play()),
            "stop" => {
                if let Some(player) = &self.player {
                    player.stop();
                }
                LineOutcome::Message("stopped".into())
            }
            other => LineOutcome::Message(format!("unknown command: {}", other)),
        }
    }

    fn save(&mut self, path: &Path) -> String {
        match persistence::save_song(path, &self.seq.song) {
            Ok(()) => {
                self.save_path = Some(path.to_path_buf());
                format!("saved {}", path.display())
            }
            Err(e) => {
                log::error!(target: "persistence", "save to {} failed: {}", path.display(), e);
                format!("save failed: {}", e)
            }
        }
    }

    fn play(&mut self) -> String {
        if self.player.is_none() {
            let track = self.seq.track_number();
            match PlayerThread::spawn(Arc::clone(&self.seq.song), track, self.tick_interval) {
                Ok(player) => self.player = Some(player),
                Err(e) => {
                    log::error!(target: "player", "could not start player: {}", e);
                    return format!("could not start player: {}", e);
                }
            }
        }
        if let Some(player) = &self.player {
            player.start();
        }
        "playing".into()
    }

    /// Stop playback and join the player thread.
    pub fn close(mut self) {
        if let Some(player) = self.player.take() {
            if let Some(summary) = player.shutdown() {
                log::info!(
                    target: "player",
                    "final tick stats: avg {}us max {}us lock failures {}",
                    summary.avg_us, summary.max_us, summary.lock_failures
                );
            }
        }
    }
}
