//! # midiseq-core
//!
//! Editing engine for midiseq. Owns everything that changes a song from the
//! editor's side: selection, cursor and viewport, undoable commands, the
//! high-level editor operations, and saving songs to disk.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use midiseq_core::action::{dispatch, EditorAction};
//! use midiseq_core::config::Config;
//! use midiseq_core::sequencer::MidiSequencer;
//! use midiseq_types::MidiSong;
//!
//! // 1. Editor settings from the embedded config plus the user's overrides
//! let config = Config::load();
//! let song = Arc::new(MidiSong::new());
//! let mut seq = MidiSequencer::with_settings(Arc::clone(&song), &config.editor());
//!
//! // 2. Drive it with actions (or call seq.editor() directly)
//! dispatch(&mut seq, &EditorAction::InsertNote);
//! dispatch(&mut seq, &EditorAction::ChangePitch(7));
//! dispatch(&mut seq, &EditorAction::Undo);
//!
//! // 3. Hand `song` to a player; it sees edits through the song's lock
//! ```
//!
//! ## Module Overview
//!
//! - [`sequencer`]: `MidiSequencer`, the owner of song, selection, context and history
//! - [`editor`]: `MidiEditor` operations: navigate, transpose, move, resize, insert, delete
//! - [`command`]: `ReplaceDataCommand` and its factories, `UndoRedoStack`
//! - [`context`]: cursor and viewport (`MidiEditorContext`, `NoteAttribute`)
//! - [`selection`]: `MidiSelectionModel`
//! - [`screen_scale`]: `NoteScreenScale`, viewport to pixel mapping
//! - [`action`]: `EditorAction` and `dispatch()`
//! - [`config`]: TOML configuration (embedded defaults + user override)
//! - [`persistence`]: SQLite `save_song` / `load_song`
//! - [`interaction_log`]: JSONL action log and replay

pub mod action;
pub mod command;
pub mod config;
pub mod context;
pub mod editor;
pub mod interaction_log;
pub mod persistence;
pub mod screen_scale;
pub mod selection;
pub mod sequencer;
