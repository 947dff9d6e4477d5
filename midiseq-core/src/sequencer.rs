//! Top-level owner of one editing session.

use std::sync::Arc;

use midiseq_types::{MidiSong, MidiTrack, TestContent};

use crate::command::UndoRedoStack;
use crate::config::EditorSettings;
use crate::context::MidiEditorContext;
use crate::editor::MidiEditor;
use crate::selection::MidiSelectionModel;

/// A song plus the selection, cursor/viewport and history that edit it.
///
/// The song is shared with the player through the `Arc`; everything else
/// belongs to the editing thread. [`MidiEditor`] borrows the sequencer for
/// the duration of one operation.
#[derive(Debug)]
pub struct MidiSequencer {
    pub song: Arc<MidiSong>,
    pub selection: MidiSelectionModel,
    pub context: MidiEditorContext,
    pub undo_stack: UndoRedoStack,
}

impl MidiSequencer {
    pub fn new(song: Arc<MidiSong>) -> Self {
        Self::from_parts(song, MidiEditorContext::new(), UndoRedoStack::new())
    }

    pub fn with_settings(song: Arc<MidiSong>, settings: &EditorSettings) -> Self {
        let context = MidiEditorContext::with_viewport(
            settings.viewport_bars,
            settings.pitch_low_octave,
            settings.pitch_high_octave,
        );
        Self::from_parts(song, context, UndoRedoStack::with_capacity(settings.undo_depth))
    }

    /// Sequencer on a fresh song holding `content` at track 0, with the
    /// default viewport: two bars from time 0, C3 to C5.
    pub fn make_test(content: TestContent) -> Self {
        Self::new(Arc::new(MidiSong::make_test(content, 0)))
    }

    fn from_parts(song: Arc<MidiSong>, context: MidiEditorContext, undo_stack: UndoRedoStack) -> Self {
        {
            let guard = song.editor_lock();
            guard.borrow_mut().create_track(context.track_number());
        }
        Self {
            song,
            selection: MidiSelectionModel::new(),
            context,
            undo_stack,
        }
    }

    pub fn editor(&mut self) -> MidiEditor<'_> {
        MidiEditor::new(self)
    }

    pub fn track_number(&self) -> usize {
        self.context.track_number()
    }

    /// Switch the edited track, creating it if needed. Clears the selection.
    pub fn set_track_number(&mut self, track_number: usize) {
        {
            let guard = self.song.editor_lock();
            guard.borrow_mut().create_track(track_number);
        }
        self.context.set_track_number(track_number);
        self.selection.clear();
        log::info!(target: "editor", "editing track {}", track_number);
    }

    /// Run `f` on the edited track under the editor lock.
    pub fn with_track<R>(&self, f: impl FnOnce(&MidiTrack) -> R) -> R {
        let guard = self.song.editor_read();
        let tracks = guard.data();
        match tracks.track(self.track_number()) {
            Some(track) => f(track),
            None => panic!("edited track {} does not exist", self.track_number()),
        }
    }

    pub fn track_snapshot(&self) -> MidiTrack {
        self.with_track(MidiTrack::clone)
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_stack.can_redo()
    }

    /// Undo the last command and bring the cursor to whatever it reselected.
    pub fn undo(&mut self) {
        self.undo_stack.undo(&self.song, &mut self.selection);
        self.follow_selection();
    }

    pub fn redo(&mut self) {
        self.undo_stack.redo(&self.song, &mut self.selection);
        self.follow_selection();
    }

    fn follow_selection(&mut self) {
        self.context.set_cursor_to_selection(&self.selection);
        self.context.adjust_viewport_for_cursor();
        self.context.assert_cursor_in_viewport();
    }

    /// Panic unless the track is valid, every selected event is the one
    /// stored under its id, and the cursor is inside the viewport.
    pub fn assert_valid(&self) {
        self.with_track(|track| {
            track.assert_valid();
            for selected in &self.selection {
                match track.find_event_pointer(selected.id) {
                    Some(stored) if *stored == selected.event => {}
                    stored => panic!(
                        "selection holds {:?} but the track has {:?}",
                        selected, stored
                    ),
                }
            }
        });
        self.context.assert_cursor_in_viewport();
    }
}
