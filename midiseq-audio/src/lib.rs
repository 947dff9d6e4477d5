//! # midiseq-audio
//!
//! Plays one track of a shared [`midiseq_types::MidiSong`] as a gate and a
//! pitch CV. [`player::MidiPlayer`] is the real-time core and is driven by
//! whoever owns the audio clock; [`player_thread::PlayerThread`] runs it on
//! a dedicated thread for the standalone binary.

pub mod host;
pub mod player;
pub mod player_thread;
pub mod telemetry;

pub use host::{ChannelHost, PlayerFeedback, PlayerHost, RecordingHost};
pub use player::{MidiPlayer, TickOutcome, TrackPlayer};
pub use player_thread::{PlayerCommand, PlayerThread};
pub use telemetry::{PlayerTelemetry, TelemetrySummary};
