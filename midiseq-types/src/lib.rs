//! # midiseq-types
//!
//! Data model shared by the editor and the player: pitch helpers, events,
//! the time-ordered track store, and the song with its player/editor lock.

pub mod error;
pub mod event;
pub mod lock;
pub mod pitch;
pub mod song;
pub mod time;
pub mod track;

pub use error::TrackError;
pub use event::{MidiEndEvent, MidiEvent, MidiEventType, MidiNoteEvent, MidiTestEvent};
pub use lock::{EditorGuard, EditorReadGuard, MidiLock, PlayerGuard};
pub use song::{MidiSong, SongTracks};
pub use track::{EventId, MidiTrack, NoteRange, TestContent, TimeRange};
