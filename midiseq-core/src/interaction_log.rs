//! Append-only JSONL log of editor actions, and replay of such a log.
//!
//! The default log lives at `<data dir>/midiseq/actions.jsonl`. Each session
//! starts with a header line; every dispatched action follows as one JSON
//! object, so the file can be watched with `tail -f`.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::action::{dispatch, DispatchResult, EditorAction};
use crate::sequencer::MidiSequencer;

/// `<data dir>/midiseq/`, or the working directory when there is none.
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("midiseq"))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub struct InteractionLog {
    writer: BufWriter<File>,
    session_start: Instant,
}

#[derive(Serialize)]
struct SessionHeader {
    event: &'static str,
    epoch_ms: u128,
    pid: u32,
    track: usize,
}

#[derive(Serialize)]
struct ActionLogEntry<'a> {
    t_ms: u128,
    action: &'a EditorAction,
    model_changed: bool,
}

#[derive(Deserialize)]
struct ReplayEntry {
    // Headers carry `event` instead.
    action: Option<EditorAction>,
}

impl InteractionLog {
    /// Open the default action log. `None` if it cannot be created.
    pub fn actions(track: usize) -> Option<Self> {
        let dir = log_dir();
        if std::fs::create_dir_all(&dir).is_err() {
            return None;
        }
        Self::open_at(&dir.join("actions.jsonl"), track)
    }

    /// Append to the log at `path`, writing a session header first.
    pub fn open_at(path: &Path, track: usize) -> Option<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()?;
        let mut log = Self {
            writer: BufWriter::new(file),
            session_start: Instant::now(),
        };
        let header = SessionHeader {
            event: "session_start",
            epoch_ms: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
            pid: std::process::id(),
            track,
        };
        log.write_line(&header);
        Some(log)
    }

    pub fn log_action(&mut self, action: &EditorAction, result: &DispatchResult) {
        let entry = ActionLogEntry {
            t_ms: self.session_start.elapsed().as_millis(),
            action,
            model_changed: result.model_changed,
        };
        self.write_line(&entry);
    }

    fn write_line(&mut self, value: &impl Serialize) {
        if let Ok(json) = serde_json::to_string(value) {
            let _ = writeln!(self.writer, "{}", json);
            let _ = self.writer.flush();
        }
    }
}

#[derive(Debug)]
pub enum ReplayError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl From<std::io::Error> for ReplayError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for ReplayError {}

/// Dispatch every action in the log at `path` onto `seed` and return it.
///
/// Session headers, blank lines and lines that do not parse are skipped.
pub fn replay_action_log(path: &Path, mut seed: MidiSequencer) -> Result<MidiSequencer, ReplayError> {
    let file = File::open(path)?;
    let mut replayed = 0usize;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: ReplayEntry = match serde_json::from_str(&line) {
            Ok(e) => e,
            Err(_) => continue,
        };
        if let Some(action) = entry.action {
            dispatch(&mut seed, &action);
            replayed += 1;
        }
    }
    log::info!(target: "editor", "replayed {} action(s) from {}", replayed, path.display());
    Ok(seed)
}

/// Parse one log line back into its action, if it holds one.
pub fn parse_action_line(line: &str) -> Result<Option<EditorAction>, ReplayError> {
    let entry: ReplayEntry = serde_json::from_str(line)?;
    Ok(entry.action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use midiseq_types::TestContent;

    #[test]
    fn replay_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jsonl");
        File::create(&path).unwrap();

        let seq = replay_action_log(&path, MidiSequencer::make_test(TestContent::EightQNotes)).unwrap();
        assert!(seq.selection.is_empty());
        assert!(!seq.can_undo());
    }

    #[test]
    fn replay_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = replay_action_log(
            &dir.path().join("missing.jsonl"),
            MidiSequencer::make_test(TestContent::Empty),
        );
        assert!(matches!(result, Err(ReplayError::Io(_))));
    }

    #[test]
    fn logged_session_replays_to_same_track() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.jsonl");
        let actions = [
            EditorAction::SelectNextNote,
            EditorAction::ChangePitch(2),
            EditorAction::AdvanceCursor(8),
            EditorAction::InsertNote,
            EditorAction::Undo,
            EditorAction::ChangeCursorPitch(1),
            EditorAction::InsertNote,
        ];

        let mut live = MidiSequencer::make_test(TestContent::EightQNotes);
        {
            let mut log = InteractionLog::open_at(&path, 0).unwrap();
            for action in &actions {
                let result = dispatch(&mut live, action);
                log.log_action(action, &result);
            }
        }
        // Noise that replay must skip.
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(f, "not json").unwrap();
            writeln!(f).unwrap();
        }

        let replayed =
            replay_action_log(&path, MidiSequencer::make_test(TestContent::EightQNotes)).unwrap();
        let events = |seq: &MidiSequencer| {
            seq.track_snapshot()
                .iter()
                .map(|(_, e)| *e)
                .collect::<Vec<_>>()
        };
        assert_eq!(events(&replayed), events(&live));
        assert_eq!(replayed.context, live.context);
        replayed.assert_valid();
    }

    #[test]
    fn header_lines_hold_no_action() {
        let line = r#"{"event":"session_start","epoch_ms":1,"pid":2,"track":0}"#;
        assert_eq!(parse_action_line(line).unwrap(), None);
        let line = r#"{"t_ms":5,"action":{"ChangePitch":-3},"model_changed":true}"#;
        assert_eq!(
            parse_action_line(line).unwrap(),
            Some(EditorAction::ChangePitch(-3))
        );
    }
}
