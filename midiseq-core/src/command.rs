//! Undoable edits.
//!
//! Every change to a track goes through a [`SequencerCommand`] executed on an
//! [`UndoRedoStack`]. The only concrete command is [`ReplaceDataCommand`]: it
//! removes one list of events and adds another, and undoes by doing the
//! opposite. Higher-level edits are factories that build one.

use std::collections::VecDeque;
use std::fmt;

use midiseq_types::pitch::SEMITONE;
use midiseq_types::time::extended_track_length;
use midiseq_types::{MidiEvent, MidiNoteEvent, MidiSong, MidiTrack, SongTracks};

use crate::selection::MidiSelectionModel;
use crate::sequencer::MidiSequencer;

/// Notes never shrink below this many quarter notes.
pub const MIN_NOTE_DURATION: f32 = 0.001;

pub trait SequencerCommand: fmt::Debug + Send {
    fn execute(&mut self, song: &MidiSong, selection: &mut MidiSelectionModel);
    fn undo(&mut self, song: &MidiSong, selection: &mut MidiSelectionModel);
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceDataCommand {
    name: &'static str,
    track_number: usize,
    remove_data: Vec<MidiEvent>,
    add_data: Vec<MidiEvent>,
}

impl ReplaceDataCommand {
    pub fn new(
        name: &'static str,
        track_number: usize,
        remove_data: Vec<MidiEvent>,
        add_data: Vec<MidiEvent>,
    ) -> Self {
        Self {
            name,
            track_number,
            remove_data,
            add_data,
        }
    }

    pub fn track_number(&self) -> usize {
        self.track_number
    }

    pub fn remove_data(&self) -> &[MidiEvent] {
        &self.remove_data
    }

    pub fn add_data(&self) -> &[MidiEvent] {
        &self.add_data
    }

    /// Nothing to remove and nothing to add.
    pub fn is_empty(&self) -> bool {
        self.remove_data.is_empty() && self.add_data.is_empty()
    }

    /// Delete every selected event.
    pub fn make_delete_command(seq: &MidiSequencer) -> Self {
        let remove = seq.selection.events().copied().collect();
        Self::new("delete notes", seq.track_number(), remove, Vec::new())
    }

    /// Insert `note`, growing the track if the note runs past its end.
    pub fn make_insert_note_command(seq: &MidiSequencer, note: MidiNoteEvent) -> Self {
        let (remove, mut add) = seq.with_track(|track| extend_track_for(track, note.end_time()));
        add.push(note.into());
        Self::new("insert note", seq.track_number(), remove, add)
    }

    /// Transpose the selected notes by `semitones`. Never changes track length.
    pub fn make_change_pitch_command(seq: &MidiSequencer, semitones: i32) -> Self {
        let delta = semitones as f32 * SEMITONE;
        Self::make_change_note_command(
            "change pitch",
            seq,
            |note| note.pitch_cv += delta,
            false,
        )
    }

    /// Move the selected notes by `delta` quarter notes, clamping at time 0.
    pub fn make_change_start_time_command(seq: &MidiSequencer, delta: f32) -> Self {
        Self::make_change_note_command(
            "change start time",
            seq,
            |note| note.start_time = (note.start_time + delta).max(0.0),
            true,
        )
    }

    /// Lengthen or shorten the selected notes by `delta` quarter notes.
    pub fn make_change_duration_command(seq: &MidiSequencer, delta: f32) -> Self {
        Self::make_change_note_command(
            "change duration",
            seq,
            |note| note.duration = (note.duration + delta).max(MIN_NOTE_DURATION),
            true,
        )
    }

    /// Replace each selected note with `xform` applied to a copy of it.
    ///
    /// With `can_change_length`, a result that ends past the track's End
    /// also moves the End out to [`extended_track_length`].
    pub fn make_change_note_command(
        name: &'static str,
        seq: &MidiSequencer,
        xform: impl Fn(&mut MidiNoteEvent),
        can_change_length: bool,
    ) -> Self {
        let mut old_notes = Vec::new();
        let mut new_notes = Vec::new();
        let mut latest_end = 0.0f32;
        for note in seq.selection.notes() {
            let mut changed = *note;
            xform(&mut changed);
            latest_end = latest_end.max(changed.end_time());
            old_notes.push(MidiEvent::Note(*note));
            new_notes.push(MidiEvent::Note(changed));
        }

        let (mut remove, mut add) = if can_change_length && !new_notes.is_empty() {
            seq.with_track(|track| extend_track_for(track, latest_end))
        } else {
            (Vec::new(), Vec::new())
        };
        remove.extend(old_notes);
        add.extend(new_notes);
        Self::new(name, seq.track_number(), remove, add)
    }

    fn apply(
        &self,
        song: &MidiSong,
        selection: &mut MidiSelectionModel,
        insert: &[MidiEvent],
        delete: &[MidiEvent],
    ) {
        let guard = song.editor_lock();
        let mut tracks = guard.borrow_mut();
        let track = target_track(&mut tracks, self.track_number);
        for event in insert {
            track.insert_event(*event);
        }
        for event in delete {
            track.delete_event(event);
        }

        // Select what this step put in. End markers are never selected.
        selection.clear();
        for event in insert.iter().filter(|e| e.is_note()) {
            let Some(id) = track.find_event_deep(event) else {
                panic!("{}: inserted {:?} went missing", self.name, event);
            };
            selection.extend_selection(id, *event);
        }
    }
}

impl SequencerCommand for ReplaceDataCommand {
    fn execute(&mut self, song: &MidiSong, selection: &mut MidiSelectionModel) {
        self.apply(song, selection, &self.add_data, &self.remove_data);
        log::debug!(
            target: "undo",
            "{}: +{} -{} on track {}",
            self.name,
            self.add_data.len(),
            self.remove_data.len(),
            self.track_number
        );
    }

    fn undo(&mut self, song: &MidiSong, selection: &mut MidiSelectionModel) {
        self.apply(song, selection, &self.remove_data, &self.add_data);
        log::debug!(target: "undo", "undo {}", self.name);
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn target_track(tracks: &mut SongTracks, track_number: usize) -> &mut MidiTrack {
    match tracks.track_mut(track_number) {
        Some(track) => track,
        None => panic!("command targets missing track {track_number}"),
    }
}

/// Events to remove and add so the track is long enough for material
/// ending at `needed`. Both lists are empty when it already is.
fn extend_track_for(track: &MidiTrack, needed: f32) -> (Vec<MidiEvent>, Vec<MidiEvent>) {
    match track.end_event() {
        Some((_, end)) if needed > end.start_time => {
            let new_end = MidiEvent::end(extended_track_length(needed));
            (vec![MidiEvent::End(*end)], vec![new_end])
        }
        _ => (Vec::new(), Vec::new()),
    }
}

/// Undo and redo history of executed commands.
///
/// A fresh `execute` empties the redo side. `undo` and `redo` on an empty
/// side panic; callers check [`Self::can_undo`] / [`Self::can_redo`] first.
#[derive(Debug, Default)]
pub struct UndoRedoStack {
    undo_stack: VecDeque<Box<dyn SequencerCommand>>,
    redo_stack: VecDeque<Box<dyn SequencerCommand>>,
    max_depth: Option<usize>,
    generation: u64,
}

impl UndoRedoStack {
    /// Unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// History that forgets its oldest entry beyond `max_depth` commands.
    pub fn with_capacity(max_depth: usize) -> Self {
        assert!(max_depth >= 1, "undo depth must be at least 1");
        Self {
            max_depth: Some(max_depth),
            ..Self::default()
        }
    }

    pub fn execute(
        &mut self,
        mut command: Box<dyn SequencerCommand>,
        song: &MidiSong,
        selection: &mut MidiSelectionModel,
    ) {
        command.execute(song, selection);
        if let Some(max) = self.max_depth {
            while self.undo_stack.len() >= max {
                if let Some(dropped) = self.undo_stack.pop_front() {
                    log::debug!(target: "undo", "history full, forgetting {}", dropped.name());
                }
            }
        }
        self.undo_stack.push_back(command);
        self.redo_stack.clear();
        self.generation += 1;
    }

    pub fn undo(&mut self, song: &MidiSong, selection: &mut MidiSelectionModel) {
        let Some(mut command) = self.undo_stack.pop_back() else {
            panic!("undo with an empty undo stack");
        };
        command.undo(song, selection);
        self.redo_stack.push_back(command);
        self.generation += 1;
    }

    pub fn redo(&mut self, song: &MidiSong, selection: &mut MidiSelectionModel) {
        let Some(mut command) = self.redo_stack.pop_back() else {
            panic!("redo with an empty redo stack");
        };
        command.execute(song, selection);
        self.undo_stack.push_back(command);
        self.generation += 1;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Bumped by every execute, undo and redo.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midiseq_types::TestContent;

    fn first_note_selected(content: TestContent) -> MidiSequencer {
        let mut seq = MidiSequencer::make_test(content);
        let (id, event) = seq.with_track(|t| {
            let (id, note) = t.first_note().unwrap();
            (id, MidiEvent::Note(*note))
        });
        seq.selection.select(id, event);
        seq
    }

    fn run(seq: &mut MidiSequencer, cmd: ReplaceDataCommand) {
        seq.undo_stack
            .execute(Box::new(cmd), &seq.song, &mut seq.selection);
    }

    #[test]
    fn delete_then_undo_restores_note_and_selection() {
        let mut seq = first_note_selected(TestContent::EightQNotes);
        let deleted = *seq.selection.first().unwrap();
        let cmd = ReplaceDataCommand::make_delete_command(&seq);
        assert_eq!(cmd.remove_data(), &[deleted.event]);
        run(&mut seq, cmd);
        assert_eq!(seq.track_snapshot().note_count(), 7);
        assert!(seq.selection.is_empty());

        seq.undo_stack.undo(&seq.song, &mut seq.selection);
        assert_eq!(seq.track_snapshot().note_count(), 8);
        assert_eq!(seq.selection.len(), 1);
        assert!(seq.selection.is_selected_deep(&deleted.event));
        seq.assert_valid();
    }

    #[test]
    fn change_pitch_reselects_new_note() {
        let mut seq = first_note_selected(TestContent::EightQNotes);
        let before = seq.selection.notes().next().copied().unwrap();
        let cmd = ReplaceDataCommand::make_change_pitch_command(&seq, 1);
        assert_eq!(cmd.add_data().len(), 1);
        run(&mut seq, cmd);
        let after = seq.selection.notes().next().copied().unwrap();
        assert!((after.pitch_cv - (before.pitch_cv + SEMITONE)).abs() < 1e-6);
        assert_eq!(after.start_time, before.start_time);
        seq.assert_valid();
    }

    #[test]
    fn start_time_clamps_at_zero() {
        let mut seq = first_note_selected(TestContent::EightQNotes);
        let cmd = ReplaceDataCommand::make_change_start_time_command(&seq, -3.0);
        run(&mut seq, cmd);
        assert_eq!(seq.selection.notes().next().unwrap().start_time, 0.0);
        assert_eq!(seq.track_snapshot().note_count(), 8);
    }

    #[test]
    fn duration_has_floor() {
        let mut seq = first_note_selected(TestContent::EightQNotes);
        let cmd = ReplaceDataCommand::make_change_duration_command(&seq, -10.0);
        run(&mut seq, cmd);
        assert_eq!(
            seq.selection.notes().next().unwrap().duration,
            MIN_NOTE_DURATION
        );
    }

    #[test]
    fn lengthening_past_end_moves_end_marker() {
        let mut seq = first_note_selected(TestContent::OneQ1);
        assert_eq!(seq.track_snapshot().length(), 4.0);
        // note 1..2 grows to 1..6.5
        let cmd = ReplaceDataCommand::make_change_duration_command(&seq, 4.5);
        assert_eq!(cmd.remove_data().len(), 2);
        assert_eq!(cmd.add_data().len(), 2);
        run(&mut seq, cmd);
        assert_eq!(seq.track_snapshot().length(), 16.0);
        assert_eq!(seq.selection.len(), 1);
        seq.assert_valid();

        seq.undo_stack.undo(&seq.song, &mut seq.selection);
        assert_eq!(seq.track_snapshot().length(), 4.0);
        seq.assert_valid();
    }

    #[test]
    fn pitch_change_never_extends() {
        let seq = first_note_selected(TestContent::OneQ1);
        let cmd = ReplaceDataCommand::make_change_pitch_command(&seq, 12);
        assert!(cmd.remove_data().iter().all(|e| e.is_note()));
    }

    #[test]
    fn insert_extends_when_needed() {
        let mut seq = MidiSequencer::make_test(TestContent::Empty);
        let cmd = ReplaceDataCommand::make_insert_note_command(
            &seq,
            MidiNoteEvent::new(0.0, 0.0, 1.0),
        );
        run(&mut seq, cmd);
        let track = seq.track_snapshot();
        assert_eq!(track.note_count(), 1);
        assert_eq!(track.length(), 8.0);
        assert_eq!(seq.selection.len(), 1);
        seq.assert_valid();
    }

    #[test]
    fn fresh_execute_clears_redo() {
        let mut seq = first_note_selected(TestContent::EightQNotes);
        let cmd = ReplaceDataCommand::make_change_pitch_command(&seq, 1);
        run(&mut seq, cmd);
        seq.undo_stack.undo(&seq.song, &mut seq.selection);
        assert!(seq.undo_stack.can_redo());
        let cmd = ReplaceDataCommand::make_change_pitch_command(&seq, 2);
        run(&mut seq, cmd);
        assert!(!seq.undo_stack.can_redo());
        assert_eq!(seq.undo_stack.undo_len(), 1);
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut seq = first_note_selected(TestContent::EightQNotes);
        seq.undo_stack = UndoRedoStack::with_capacity(2);
        for _ in 0..3 {
            let cmd = ReplaceDataCommand::make_change_pitch_command(&seq, 1);
            run(&mut seq, cmd);
        }
        assert_eq!(seq.undo_stack.undo_len(), 2);
        seq.undo_stack.undo(&seq.song, &mut seq.selection);
        seq.undo_stack.undo(&seq.song, &mut seq.selection);
        assert!(!seq.undo_stack.can_undo());
        // One transpose could not be undone.
        let note = seq.selection.notes().next().copied().unwrap();
        assert!((note.pitch_cv - (-1.0 + SEMITONE)).abs() < 1e-5);
    }

    #[test]
    #[should_panic(expected = "empty undo stack")]
    fn undo_on_empty_panics() {
        let mut seq = MidiSequencer::make_test(TestContent::Empty);
        seq.undo_stack.undo(&seq.song, &mut seq.selection);
    }

    #[test]
    #[should_panic(expected = "empty redo stack")]
    fn redo_on_empty_panics() {
        let mut seq = MidiSequencer::make_test(TestContent::Empty);
        seq.undo_stack.redo(&seq.song, &mut seq.selection);
    }
}
