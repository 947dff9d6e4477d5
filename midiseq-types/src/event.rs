use serde::{Deserialize, Serialize};

use crate::pitch;

/// Discriminant of a [`MidiEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MidiEventType {
    Note,
    End,
    Test,
}

/// A sounding note. Pitch is CV (1V/octave, 0 = C4), times are quarter notes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MidiNoteEvent {
    pub start_time: f32,
    pub pitch_cv: f32,
    pub duration: f32,
}

impl MidiNoteEvent {
    pub fn new(start_time: f32, pitch_cv: f32, duration: f32) -> Self {
        Self {
            start_time,
            pitch_cv,
            duration,
        }
    }

    pub fn end_time(&self) -> f32 {
        self.start_time + self.duration
    }

    pub fn set_pitch(&mut self, octave: i32, semi: i32) {
        self.pitch_cv = pitch::pitch_to_cv(octave, semi);
    }

    pub fn semitone(&self) -> i32 {
        pitch::cv_to_semitone(self.pitch_cv)
    }

    /// Whether `time` falls inside `[start, end)`.
    pub fn contains_time(&self, time: f32) -> bool {
        self.start_time <= time && time < self.end_time()
    }
}

impl Default for MidiNoteEvent {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// Marks where the track ends (and loops).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MidiEndEvent {
    pub start_time: f32,
}

/// Payload-only event used by tests of the container itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MidiTestEvent {
    pub start_time: f32,
    pub value: i32,
}

/// An event stored in a track.
///
/// Equality is type aware: a note and an end marker never compare equal,
/// even at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MidiEvent {
    Note(MidiNoteEvent),
    End(MidiEndEvent),
    Test(MidiTestEvent),
}

impl MidiEvent {
    pub fn note(start_time: f32, pitch_cv: f32, duration: f32) -> Self {
        MidiEvent::Note(MidiNoteEvent::new(start_time, pitch_cv, duration))
    }

    pub fn end(start_time: f32) -> Self {
        MidiEvent::End(MidiEndEvent { start_time })
    }

    pub fn test(start_time: f32, value: i32) -> Self {
        MidiEvent::Test(MidiTestEvent { start_time, value })
    }

    pub fn event_type(&self) -> MidiEventType {
        match self {
            MidiEvent::Note(_) => MidiEventType::Note,
            MidiEvent::End(_) => MidiEventType::End,
            MidiEvent::Test(_) => MidiEventType::Test,
        }
    }

    pub fn start_time(&self) -> f32 {
        match self {
            MidiEvent::Note(n) => n.start_time,
            MidiEvent::End(e) => e.start_time,
            MidiEvent::Test(t) => t.start_time,
        }
    }

    pub fn set_start_time(&mut self, time: f32) {
        match self {
            MidiEvent::Note(n) => n.start_time = time,
            MidiEvent::End(e) => e.start_time = time,
            MidiEvent::Test(t) => t.start_time = time,
        }
    }

    /// `start + duration` for notes, `start` for everything else.
    pub fn effective_end_time(&self) -> f32 {
        match self {
            MidiEvent::Note(n) => n.end_time(),
            _ => self.start_time(),
        }
    }

    pub fn as_note(&self) -> Option<&MidiNoteEvent> {
        match self {
            MidiEvent::Note(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_note_mut(&mut self) -> Option<&mut MidiNoteEvent> {
        match self {
            MidiEvent::Note(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_note(&self) -> bool {
        matches!(self, MidiEvent::Note(_))
    }

    pub fn is_end(&self) -> bool {
        matches!(self, MidiEvent::End(_))
    }
}

impl From<MidiNoteEvent> for MidiEvent {
    fn from(note: MidiNoteEvent) -> Self {
        MidiEvent::Note(note)
    }
}

impl From<MidiEndEvent> for MidiEvent {
    fn from(end: MidiEndEvent) -> Self {
        MidiEvent::End(end)
    }
}
