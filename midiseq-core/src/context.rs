//! Cursor and viewport state for the note editor.

use serde::{Deserialize, Serialize};

use midiseq_types::pitch::{self, OCTAVE};
use midiseq_types::time::bar_to_time;
use midiseq_types::{EventId, MidiNoteEvent, MidiTrack};

use crate::selection::MidiSelectionModel;

/// Which note property the generic "change" keys edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoteAttribute {
    #[default]
    Pitch,
    Duration,
    StartTime,
}

/// The viewport moves in steps of this many quarter notes.
const VIEWPORT_STEP_BARS: f32 = 2.0;

/// Cursor `(time, pitch)` plus the visible window.
///
/// Time bounds are half-open, `[start_time, end_time)`; pitch bounds are
/// inclusive, `[pitch_low, pitch_hi]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiEditorContext {
    cursor_time: f32,
    cursor_pitch: f32,
    start_time: f32,
    end_time: f32,
    pitch_low: f32,
    pitch_hi: f32,
    track_number: usize,
    pub note_attribute: NoteAttribute,
}

impl Default for MidiEditorContext {
    fn default() -> Self {
        Self {
            cursor_time: 0.0,
            cursor_pitch: 0.0,
            start_time: 0.0,
            end_time: bar_to_time(VIEWPORT_STEP_BARS),
            pitch_low: pitch::pitch_to_cv(3, 0),
            pitch_hi: pitch::pitch_to_cv(5, 0),
            track_number: 0,
            note_attribute: NoteAttribute::Pitch,
        }
    }
}

impl MidiEditorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context starting at time 0 that shows `bars` bars and the octaves
    /// `[low_octave, high_octave]` (both given as `C` of that octave).
    pub fn with_viewport(bars: f32, low_octave: i32, high_octave: i32) -> Self {
        assert!(bars > 0.0, "viewport must have positive width");
        assert!(low_octave <= high_octave, "pitch band is inverted");
        let pitch_low = pitch::pitch_to_cv(low_octave, 0);
        let pitch_hi = pitch::pitch_to_cv(high_octave, 0);
        Self {
            start_time: 0.0,
            end_time: bar_to_time(bars),
            pitch_low,
            pitch_hi,
            cursor_pitch: pitch_low.max(0.0).min(pitch_hi),
            ..Self::default()
        }
    }

    pub fn cursor_time(&self) -> f32 {
        self.cursor_time
    }

    pub fn set_cursor_time(&mut self, time: f32) {
        self.cursor_time = time;
    }

    pub fn cursor_pitch(&self) -> f32 {
        self.cursor_pitch
    }

    pub fn set_cursor_pitch(&mut self, pitch: f32) {
        self.cursor_pitch = pitch;
    }

    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    pub fn end_time(&self) -> f32 {
        self.end_time
    }

    /// Set the time window directly. The caller restores the cursor invariant.
    pub fn set_time_range(&mut self, start: f32, end: f32) {
        assert!(end > start, "empty time window [{start}, {end})");
        self.start_time = start;
        self.end_time = end;
    }

    pub fn pitch_low(&self) -> f32 {
        self.pitch_low
    }

    pub fn pitch_hi(&self) -> f32 {
        self.pitch_hi
    }

    pub fn set_pitch_range(&mut self, low: f32, hi: f32) {
        assert!(hi >= low, "inverted pitch window [{low}, {hi}]");
        self.pitch_low = low;
        self.pitch_hi = hi;
    }

    pub fn track_number(&self) -> usize {
        self.track_number
    }

    pub fn set_track_number(&mut self, track_number: usize) {
        self.track_number = track_number;
    }

    pub fn cursor_in_viewport_time(&self) -> bool {
        self.cursor_time >= self.start_time && self.cursor_time < self.end_time
    }

    pub fn cursor_in_viewport_pitch(&self) -> bool {
        self.cursor_pitch >= self.pitch_low && self.cursor_pitch <= self.pitch_hi
    }

    pub fn cursor_in_viewport(&self) -> bool {
        self.cursor_in_viewport_time() && self.cursor_in_viewport_pitch()
    }

    pub fn assert_cursor_in_viewport(&self) {
        assert!(
            self.cursor_in_viewport(),
            "cursor ({}, {}) outside viewport [{}, {}) x [{}, {}]",
            self.cursor_time,
            self.cursor_pitch,
            self.start_time,
            self.end_time,
            self.pitch_low,
            self.pitch_hi
        );
    }

    /// Page the time window so it contains the cursor.
    ///
    /// The window moves by a whole number of two-bar steps: the required
    /// advance is rounded to the nearest step. If rounding undershoots, the
    /// window is snapped to the step boundary at or below the cursor.
    pub fn adjust_viewport_for_cursor(&mut self) {
        if !self.cursor_in_viewport_time() {
            let step = bar_to_time(VIEWPORT_STEP_BARS);
            let width = self.end_time - self.start_time;
            let advance = ((self.cursor_time - self.start_time) / step).round() * step;
            self.start_time += advance;
            self.end_time += advance;

            if !self.cursor_in_viewport_time() {
                let page = step.min(width);
                self.start_time = (self.cursor_time / page).floor() * page;
                self.end_time = self.start_time + width;
            }
            log::debug!(
                target: "editor",
                "viewport moved to [{}, {})",
                self.start_time,
                self.end_time
            );
        }
        self.scroll_viewport_to_cursor_pitch();
        debug_assert!(self.cursor_in_viewport_time());
    }

    /// Shift the pitch window by whole octaves until it holds the cursor.
    pub fn scroll_viewport_to_cursor_pitch(&mut self) {
        let octaves = if self.cursor_pitch > self.pitch_hi {
            ((self.cursor_pitch - self.pitch_hi) / OCTAVE).ceil()
        } else if self.cursor_pitch < self.pitch_low {
            -((self.pitch_low - self.cursor_pitch) / OCTAVE).ceil()
        } else {
            return;
        };
        self.pitch_hi += octaves * OCTAVE;
        self.pitch_low += octaves * OCTAVE;
    }

    /// Move the cursor onto the first selected note. No-op when no note is selected.
    pub fn set_cursor_to_selection(&mut self, selection: &MidiSelectionModel) {
        if let Some(note) = selection.notes().next() {
            self.cursor_time = note.start_time;
            self.cursor_pitch = note.pitch_cv;
        }
    }

    /// Notes that start inside the window and sit inside the pitch band.
    pub fn get_events<'a>(
        &self,
        track: &'a MidiTrack,
    ) -> impl Iterator<Item = (EventId, &'a MidiNoteEvent)> + Clone + 'a {
        let (end, low, hi) = (self.end_time, self.pitch_low, self.pitch_hi);
        track
            .time_range_notes(self.start_time, self.end_time)
            .filter(move |(_, note)| {
                note.start_time < end && note.pitch_cv >= low && note.pitch_cv <= hi
            })
    }
}
