use std::fmt;

/// A broken track invariant, as reported by [`crate::MidiTrack::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrackError {
    MissingEnd,
    MultipleEnds { count: usize },
    /// Something is stored after the end marker.
    EndNotLast { time: f32 },
    OutOfOrder { time: f32, previous: f32 },
    NegativeStart { time: f32 },
    NonPositiveDuration { time: f32, duration: f32 },
    NoteExtendsPastEnd { note_end: f32, track_end: f32 },
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEnd => write!(f, "track has no end event"),
            Self::MultipleEnds { count } => write!(f, "track has {} end events", count),
            Self::EndNotLast { time } => {
                write!(f, "event at {} stored after the end event", time)
            }
            Self::OutOfOrder { time, previous } => {
                write!(f, "event at {} follows event at {}", time, previous)
            }
            Self::NegativeStart { time } => write!(f, "event starts at negative time {}", time),
            Self::NonPositiveDuration { time, duration } => {
                write!(f, "note at {} has duration {}", time, duration)
            }
            Self::NoteExtendsPastEnd {
                note_end,
                track_end,
            } => write!(f, "note ends at {} past track end {}", note_end, track_end),
        }
    }
}

impl std::error::Error for TrackError {}
