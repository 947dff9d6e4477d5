//! The editor's current selection.
//!
//! Members are tracked by identity ([`EventId`]) and carry a value copy of
//! the event. Identity answers "is this stored event selected"; the value
//! copy answers "is an event like this selected" after undo or redo has
//! swapped the stored identities.

use midiseq_types::{EventId, MidiEvent, MidiNoteEvent};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedEvent {
    pub id: EventId,
    pub event: MidiEvent,
}

#[derive(Debug, Clone, Default)]
pub struct MidiSelectionModel {
    selection: Vec<SelectedEvent>,
}

impl MidiSelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with exactly this event.
    pub fn select(&mut self, id: EventId, event: MidiEvent) {
        self.selection.clear();
        self.selection.push(SelectedEvent { id, event });
    }

    /// Add an event to the selection. Selecting the same identity twice is a no-op.
    pub fn extend_selection(&mut self, id: EventId, event: MidiEvent) {
        if !self.is_selected(id) {
            self.selection.push(SelectedEvent { id, event });
        }
    }

    pub fn clear(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: EventId) -> bool {
        self.selection.iter().any(|s| s.id == id)
    }

    /// Value comparison against every member.
    pub fn is_selected_deep(&self, event: &MidiEvent) -> bool {
        self.selection.iter().any(|s| s.event == *event)
    }

    pub fn len(&self) -> usize {
        self.selection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SelectedEvent> {
        self.selection.iter()
    }

    pub fn first(&self) -> Option<&SelectedEvent> {
        self.selection.first()
    }

    pub fn events(&self) -> impl Iterator<Item = &MidiEvent> {
        self.selection.iter().map(|s| &s.event)
    }

    pub fn notes(&self) -> impl Iterator<Item = &MidiNoteEvent> {
        self.selection.iter().filter_map(|s| s.event.as_note())
    }

    pub fn has_notes(&self) -> bool {
        self.notes().next().is_some()
    }

    /// The member that finishes last: `start + duration` for notes, `start` otherwise.
    pub fn get_last(&self) -> Option<&SelectedEvent> {
        self.selection.iter().max_by(|a, b| {
            a.event
                .effective_end_time()
                .total_cmp(&b.event.effective_end_time())
        })
    }
}

impl<'a> IntoIterator for &'a MidiSelectionModel {
    type Item = &'a SelectedEvent;
    type IntoIter = std::slice::Iter<'a, SelectedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
