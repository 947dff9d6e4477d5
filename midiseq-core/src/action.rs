//! Editor actions and their dispatch.
//!
//! Front ends translate input into [`EditorAction`]s and hand them to
//! [`dispatch`]. Actions are serializable so sessions can be logged and
//! replayed (see `interaction_log`).

use serde::{Deserialize, Serialize};

use crate::context::NoteAttribute;
use crate::sequencer::MidiSequencer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorAction {
    SelectNextNote,
    SelectPrevNote,
    /// Semitones.
    ChangePitch(i32),
    /// Sixteenth-note units.
    ChangeStartTime(i32),
    /// Sixteenth-note units.
    ChangeDuration(i32),
    /// Routed by the context's current [`NoteAttribute`].
    ChangeSelectedAttribute(i32),
    SetNoteAttribute(NoteAttribute),
    InsertNote,
    DeleteNote,
    /// Sixteenth-note units.
    AdvanceCursor(i32),
    /// Semitones.
    ChangeCursorPitch(i32),
    Undo,
    Redo,
}

impl EditorAction {
    /// Whether the action can change track contents.
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            Self::ChangePitch(_)
                | Self::ChangeStartTime(_)
                | Self::ChangeDuration(_)
                | Self::ChangeSelectedAttribute(_)
                | Self::InsertNote
                | Self::DeleteNote
                | Self::Undo
                | Self::Redo
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// The track was mutated (a command ran, or history moved).
    pub model_changed: bool,
}

impl DispatchResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn changed() -> Self {
        Self {
            model_changed: true,
        }
    }
}

/// Run one action against the sequencer.
///
/// `Undo` and `Redo` with nothing to undo or redo do nothing here.
pub fn dispatch(seq: &mut MidiSequencer, action: &EditorAction) -> DispatchResult {
    let generation = seq.undo_stack.generation();
    match action {
        EditorAction::SelectNextNote => seq.editor().select_next_note(),
        EditorAction::SelectPrevNote => seq.editor().select_prev_note(),
        EditorAction::ChangePitch(semitones) => seq.editor().change_pitch(*semitones),
        EditorAction::ChangeStartTime(amount) => seq.editor().change_start_time(*amount),
        EditorAction::ChangeDuration(amount) => seq.editor().change_duration(*amount),
        EditorAction::ChangeSelectedAttribute(amount) => {
            seq.editor().change_selected_attribute(*amount)
        }
        EditorAction::SetNoteAttribute(attribute) => {
            seq.editor().set_note_editor_attribute(*attribute)
        }
        EditorAction::InsertNote => seq.editor().insert_note(),
        EditorAction::DeleteNote => seq.editor().delete_note(),
        EditorAction::AdvanceCursor(amount) => seq.editor().advance_cursor(*amount),
        EditorAction::ChangeCursorPitch(semitones) => {
            seq.editor().change_cursor_pitch(*semitones)
        }
        EditorAction::Undo => {
            if !seq.can_undo() {
                log::debug!(target: "editor", "nothing to undo");
                return DispatchResult::none();
            }
            seq.undo();
        }
        EditorAction::Redo => {
            if !seq.can_redo() {
                log::debug!(target: "editor", "nothing to redo");
                return DispatchResult::none();
            }
            seq.redo();
        }
    }

    if seq.undo_stack.generation() != generation {
        DispatchResult::changed()
    } else {
        DispatchResult::none()
    }
}
