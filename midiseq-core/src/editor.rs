//! User-level editing operations.
//!
//! Each operation finds its targets through the selection, builds a
//! [`ReplaceDataCommand`], runs it on the undo stack, and then puts the
//! cursor, viewport and selection back in a consistent state. Amounts are
//! in editing units (sixteenth notes) unless stated otherwise.

use std::sync::Arc;

use midiseq_types::pitch::{self, SEMITONE};
use midiseq_types::time::units_to_time;
use midiseq_types::{EventId, MidiEvent, MidiNoteEvent, MidiTrack, TimeRange};

use crate::command::ReplaceDataCommand;
use crate::context::NoteAttribute;
use crate::selection::SelectedEvent;
use crate::sequencer::MidiSequencer;

/// Absolute limit for the cursor pitch, in volts either side of C4.
pub const CURSOR_PITCH_LIMIT: f32 = 5.0;

/// Largest transposition in one step: the full cursor pitch range.
pub const MAX_TRANSPOSE_SEMITONES: i32 = 120;

/// Duration of notes created by [`MidiEditor::insert_note`], in quarter notes.
pub const INSERTED_NOTE_DURATION: f32 = 1.0;

pub struct MidiEditor<'a> {
    seq: &'a mut MidiSequencer,
}

impl<'a> MidiEditor<'a> {
    pub fn new(seq: &'a mut MidiSequencer) -> Self {
        Self { seq }
    }

    pub fn sequencer(&self) -> &MidiSequencer {
        self.seq
    }

    /// Select the note after the selected one, or the first note when
    /// nothing is selected. Reaching the End clears the selection.
    pub fn select_next_note(&mut self) {
        self.seq.assert_valid();
        let seq = &*self.seq;
        let next = seq.with_track(|track| {
            let rest = match seq.selection.first() {
                None => track.iter(),
                Some(selected) => track.iter_after(locate(track, selected)),
            };
            next_note(rest)
        });
        self.select_or_clear(next);
        self.update_cursor();
        self.seq.context.adjust_viewport_for_cursor();
    }

    /// Select the note before the selected one, or the last note when
    /// nothing is selected. Stepping back from the first note clears the
    /// selection.
    pub fn select_prev_note(&mut self) {
        self.seq.assert_valid();
        let seq = &*self.seq;
        let prev = seq.with_track(|track| {
            let before = match seq.selection.first() {
                None => track.iter(),
                Some(selected) => track.iter_before(locate(track, selected)),
            };
            before
                .rev()
                .find_map(|(id, e)| e.as_note().map(|n| (id, *n)))
        });
        self.select_or_clear(prev);
        self.update_cursor();
        self.seq.context.adjust_viewport_for_cursor();
    }

    fn select_or_clear(&mut self, found: Option<(EventId, MidiNoteEvent)>) {
        match found {
            Some((id, note)) => self.seq.selection.select(id, note.into()),
            None => self.seq.selection.clear(),
        }
    }

    /// Put the cursor on the first selected note, unless it already sits on
    /// one of the selected notes.
    pub fn update_cursor(&mut self) {
        let ctx = &self.seq.context;
        let mut notes = self.seq.selection.notes().peekable();
        let Some(first) = notes.peek().copied().copied() else {
            return;
        };
        let on_selection = notes.any(|n| {
            n.start_time == ctx.cursor_time() && n.pitch_cv == ctx.cursor_pitch()
        });
        if !on_selection {
            self.seq.context.set_cursor_time(first.start_time);
            self.seq.context.set_cursor_pitch(first.pitch_cv);
        }
    }

    /// Transpose the selected notes by at most [`MAX_TRANSPOSE_SEMITONES`].
    /// The cursor follows them within ±[`CURSOR_PITCH_LIMIT`].
    pub fn change_pitch(&mut self, semitones: i32) {
        let semitones = semitones.clamp(-MAX_TRANSPOSE_SEMITONES, MAX_TRANSPOSE_SEMITONES);
        if semitones == 0 || !self.seq.selection.has_notes() {
            return;
        }
        let cmd = ReplaceDataCommand::make_change_pitch_command(self.seq, semitones);
        self.execute(cmd);
        self.seq.assert_valid();

        let pitch = (self.seq.context.cursor_pitch() + semitones as f32 * SEMITONE)
            .clamp(-CURSOR_PITCH_LIMIT, CURSOR_PITCH_LIMIT);
        self.seq.context.set_cursor_pitch(pitch);
        self.seq.context.adjust_viewport_for_cursor();
        self.seq.context.assert_cursor_in_viewport();
    }

    /// Move the selected notes by `amount` units. The cursor follows them.
    pub fn change_start_time(&mut self, amount: i32) {
        if amount == 0 || !self.seq.selection.has_notes() {
            return;
        }
        let song = Arc::clone(&self.seq.song);
        let _locked = song.editor_lock();

        let cmd = ReplaceDataCommand::make_change_start_time_command(
            self.seq,
            units_to_time(amount),
        );
        self.execute(cmd);
        self.seq.assert_valid();

        self.seq.context.set_cursor_to_selection(&self.seq.selection);
        self.seq.context.adjust_viewport_for_cursor();
        self.seq.context.assert_cursor_in_viewport();
    }

    /// Lengthen or shorten the selected notes by `amount` units.
    pub fn change_duration(&mut self, amount: i32) {
        if amount == 0 || !self.seq.selection.has_notes() {
            return;
        }
        let cmd =
            ReplaceDataCommand::make_change_duration_command(self.seq, units_to_time(amount));
        self.execute(cmd);
        self.seq.assert_valid();
    }

    /// Route `amount` to pitch, start time or duration, whichever the
    /// context currently edits.
    pub fn change_selected_attribute(&mut self, amount: i32) {
        match self.seq.context.note_attribute {
            NoteAttribute::Pitch => self.change_pitch(amount),
            NoteAttribute::StartTime => self.change_start_time(amount),
            NoteAttribute::Duration => self.change_duration(amount),
        }
    }

    pub fn set_note_editor_attribute(&mut self, attribute: NoteAttribute) {
        self.seq.context.note_attribute = attribute;
    }

    /// Insert a quarter note at the cursor and select it.
    pub fn insert_note(&mut self) {
        let song = Arc::clone(&self.seq.song);
        let _locked = song.editor_lock();

        let note = MidiNoteEvent::new(
            self.seq.context.cursor_time(),
            self.seq.context.cursor_pitch(),
            INSERTED_NOTE_DURATION,
        );
        let cmd = ReplaceDataCommand::make_insert_note_command(self.seq, note);
        self.execute(cmd);
        self.seq.assert_valid();
    }

    /// Delete every selected note as one undoable step.
    pub fn delete_note(&mut self) {
        if self.seq.selection.is_empty() {
            return;
        }
        let cmd = ReplaceDataCommand::make_delete_command(self.seq);
        self.execute(cmd);
        self.seq.selection.clear();
    }

    /// Move the cursor by `amount` units (never before time 0) and select
    /// whatever note is under it.
    pub fn advance_cursor(&mut self, amount: i32) {
        if amount == 0 {
            return;
        }
        self.seq.context.assert_cursor_in_viewport();
        let time = (self.seq.context.cursor_time() + units_to_time(amount)).max(0.0);
        self.seq.context.set_cursor_time(time);
        self.update_selection_for_cursor();
        self.seq.context.adjust_viewport_for_cursor();
        self.seq.context.assert_cursor_in_viewport();
        self.seq.assert_valid();
    }

    /// Move the cursor pitch by `semitones`, within ±[`CURSOR_PITCH_LIMIT`].
    pub fn change_cursor_pitch(&mut self, semitones: i32) {
        let pitch = (self.seq.context.cursor_pitch() + semitones as f32 * SEMITONE)
            .clamp(-CURSOR_PITCH_LIMIT, CURSOR_PITCH_LIMIT);
        self.seq.context.set_cursor_pitch(pitch);
        self.seq.context.scroll_viewport_to_cursor_pitch();
        self.update_selection_for_cursor();
    }

    /// Select the first note in the viewport's time window that is on the
    /// cursor's semitone and sounds at the cursor time. Clears the selection
    /// when there is none.
    pub fn update_selection_for_cursor(&mut self) {
        let ctx = &self.seq.context;
        let cursor_semi = pitch::cv_to_semitone(ctx.cursor_pitch());
        let cursor_time = ctx.cursor_time();
        let found = self.seq.with_track(|track| {
            track
                .time_range_notes(ctx.start_time(), ctx.end_time())
                .find(|(_, note)| {
                    note.semitone() == cursor_semi && note.contains_time(cursor_time)
                })
                .map(|(id, note)| (id, *note))
        });
        self.select_or_clear(found);
    }

    /// Panic unless some selected event starts at the cursor time.
    pub fn assert_cursor_in_selection(&self) {
        assert!(!self.seq.selection.is_empty(), "nothing selected");
        let time = self.seq.context.cursor_time();
        assert!(
            self.seq.selection.events().any(|e| e.start_time() == time),
            "cursor time {} is not on the selection",
            time
        );
    }

    fn execute(&mut self, cmd: ReplaceDataCommand) {
        log::debug!(target: "editor", "{:?}", cmd);
        let seq = &mut *self.seq;
        seq.undo_stack
            .execute(Box::new(cmd), &seq.song, &mut seq.selection);
    }
}

/// Where `selected` lives in `track` now: its id if that still holds the
/// same value, otherwise the first value-equal event.
fn locate(track: &MidiTrack, selected: &SelectedEvent) -> EventId {
    if track.find_event_pointer(selected.id) == Some(&selected.event) {
        return selected.id;
    }
    match track.find_event_deep(&selected.event) {
        Some(id) => id,
        None => panic!("selected {:?} is not in the track", selected.event),
    }
}

/// First note in `events`, stopping at the End marker.
fn next_note(events: TimeRange<'_>) -> Option<(EventId, MidiNoteEvent)> {
    for (id, event) in events {
        match event {
            MidiEvent::Note(note) => return Some((id, *note)),
            MidiEvent::End(_) => return None,
            MidiEvent::Test(_) => continue,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use midiseq_types::TestContent;

    #[test]
    fn next_from_empty_selects_first() {
        let mut seq = MidiSequencer::make_test(TestContent::EightQNotes);
        seq.editor().select_next_note();
        let note = *seq.selection.notes().next().unwrap();
        assert_eq!(note.start_time, 0.0);
        assert_eq!(seq.context.cursor_time(), 0.0);
        assert_eq!(seq.context.cursor_pitch(), note.pitch_cv);
    }

    #[test]
    fn prev_from_empty_selects_last() {
        let mut seq = MidiSequencer::make_test(TestContent::EightQNotes);
        seq.editor().select_prev_note();
        assert_eq!(seq.selection.notes().next().unwrap().start_time, 7.0);
        seq.assert_valid();
    }

    #[test]
    fn prev_from_first_clears() {
        let mut seq = MidiSequencer::make_test(TestContent::EightQNotes);
        seq.editor().select_next_note();
        seq.editor().select_prev_note();
        assert!(seq.selection.is_empty());
    }

    #[test]
    fn next_on_empty_track_selects_nothing() {
        let mut seq = MidiSequencer::make_test(TestContent::Empty);
        seq.editor().select_next_note();
        assert!(seq.selection.is_empty());
        seq.editor().select_prev_note();
        assert!(seq.selection.is_empty());
    }

    #[test]
    fn navigation_skips_test_events() {
        let mut seq = MidiSequencer::make_test(TestContent::OneQ1);
        {
            let guard = seq.song.editor_lock();
            guard
                .borrow_mut()
                .track_mut(0)
                .unwrap()
                .insert_event(MidiEvent::test(0.5, 9));
        }
        seq.editor().select_next_note();
        assert_eq!(seq.selection.notes().next().unwrap().start_time, 1.0);
        seq.editor().select_prev_note();
        assert!(seq.selection.is_empty());
    }

    #[test]
    fn cursor_stays_if_already_on_selection() {
        let mut seq = MidiSequencer::make_test(TestContent::FourTouchingQuarters);
        seq.editor().select_next_note();
        seq.editor().select_next_note();
        assert_eq!(seq.context.cursor_time(), 1.0);
        seq.editor().update_cursor();
        assert_eq!(seq.context.cursor_time(), 1.0);
    }

    #[test]
    fn change_duration_by_units() {
        let mut seq = MidiSequencer::make_test(TestContent::EightQNotes);
        seq.editor().select_next_note();
        seq.editor().change_duration(2);
        let note = *seq.selection.notes().next().unwrap();
        assert_eq!(note.duration, 1.0);
    }

    #[test]
    fn change_with_empty_selection_is_a_no_op() {
        let mut seq = MidiSequencer::make_test(TestContent::EightQNotes);
        seq.editor().change_pitch(3);
        seq.editor().change_start_time(3);
        seq.editor().change_duration(3);
        assert!(!seq.can_undo());
    }

    #[test]
    fn selected_attribute_routes_by_context() {
        let mut seq = MidiSequencer::make_test(TestContent::EightQNotes);
        seq.editor().select_next_note();
        seq.editor().set_note_editor_attribute(NoteAttribute::StartTime);
        seq.editor().change_selected_attribute(4);
        assert_eq!(seq.selection.notes().next().unwrap().start_time, 1.0);
        assert_eq!(seq.context.cursor_time(), 1.0);
        seq.editor().assert_cursor_in_selection();
    }

    #[test]
    fn cursor_pitch_is_clamped() {
        let mut seq = MidiSequencer::make_test(TestContent::Empty);
        seq.editor().change_cursor_pitch(12 * 20);
        assert_eq!(seq.context.cursor_pitch(), CURSOR_PITCH_LIMIT);
        seq.context.assert_cursor_in_viewport();
        seq.editor().change_cursor_pitch(-12 * 40);
        assert_eq!(seq.context.cursor_pitch(), -CURSOR_PITCH_LIMIT);
        seq.context.assert_cursor_in_viewport();
    }

    #[test]
    #[should_panic(expected = "not on the selection")]
    fn cursor_off_selection_is_caught() {
        let mut seq = MidiSequencer::make_test(TestContent::EightQNotes);
        seq.editor().select_next_note();
        seq.context.set_cursor_time(0.25);
        seq.editor().assert_cursor_in_selection();
    }

    #[test]
    fn zero_transpose_records_nothing() {
        let mut seq = MidiSequencer::make_test(TestContent::EightQNotes);
        seq.editor().select_next_note();
        seq.editor().change_pitch(0);
        seq.editor().change_selected_attribute(0);
        assert!(!seq.can_undo());
    }

    #[test]
    fn huge_transpose_is_bounded() {
        let mut seq = MidiSequencer::make_test(TestContent::EightQNotes);
        seq.editor().select_next_note();
        let before = seq.selection.notes().next().unwrap().pitch_cv;

        seq.editor().change_pitch(i32::MAX);

        let after = seq.selection.notes().next().unwrap().pitch_cv;
        assert!((after - before - MAX_TRANSPOSE_SEMITONES as f32 * SEMITONE).abs() < 1e-4);
        assert_eq!(seq.context.cursor_pitch(), CURSOR_PITCH_LIMIT);
        seq.assert_valid();

        seq.editor().change_pitch(i32::MIN);
        assert!(seq.context.cursor_pitch() >= -CURSOR_PITCH_LIMIT);
        seq.assert_valid();
    }
}
