//! Time-ordered event storage.
//!
//! A track is a multi-map from start time to event. Events at the same time
//! keep their insertion order. Each stored event gets an [`EventId`] that
//! stays valid until that event is removed, so selections and the player can
//! refer to "this event" without holding references into the map.

use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::error::TrackError;
use crate::event::{MidiEvent, MidiEndEvent, MidiNoteEvent};
use crate::pitch;

/// Stable handle to an event inside one track.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Start time with a total order, so it can key a BTreeMap.
#[derive(Debug, Clone, Copy)]
struct TimeKey(f32);

impl PartialEq for TimeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimeKey {}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Adding 0.0 folds -0.0 into 0.0.
        (self.0 + 0.0).total_cmp(&(other.0 + 0.0))
    }
}

/// Map key: time first, then insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey {
    time: TimeKey,
    id: EventId,
}

impl EventKey {
    fn lowest(time: f32) -> Self {
        Self {
            time: TimeKey(time),
            id: EventId(0),
        }
    }

    fn highest(time: f32) -> Self {
        Self {
            time: TimeKey(time),
            id: EventId(u64::MAX),
        }
    }
}

/// Canned contents for tests and demos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestContent {
    /// Only an end event, at time 0.
    Empty,
    /// Eight half-beat notes, one per quarter, rising a semitone each from C3. Two bars long.
    EightQNotes,
    /// A single quarter note at time 1. One bar long.
    OneQ1,
    /// Four quarter notes back to back. One bar long.
    FourTouchingQuarters,
    /// Like `FourTouchingQuarters`, but each note is slightly shorter than a beat.
    FourAlmostTouchingQuarters,
}

#[derive(Debug, Clone, Default)]
pub struct MidiTrack {
    events: BTreeMap<EventKey, MidiEvent>,
    index: HashMap<EventId, TimeKey>,
    next_id: u64,
}

impl MidiTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_test(content: TestContent) -> Self {
        let mut track = Self::new();
        match content {
            TestContent::Empty => {
                track.insert_end(0.0);
            }
            TestContent::EightQNotes => {
                for i in 0..8 {
                    let mut note = MidiNoteEvent::new(i as f32, 0.0, 0.5);
                    note.set_pitch(3, i);
                    track.insert_event(note.into());
                }
                track.insert_end(8.0);
            }
            TestContent::OneQ1 => {
                track.insert_event(MidiEvent::note(1.0, pitch::pitch_to_cv(3, 0), 1.0));
                track.insert_end(4.0);
            }
            TestContent::FourTouchingQuarters | TestContent::FourAlmostTouchingQuarters => {
                let duration = if content == TestContent::FourTouchingQuarters {
                    1.0
                } else {
                    0.99
                };
                for i in 0..4 {
                    track.insert_event(MidiEvent::note(
                        i as f32,
                        pitch::pitch_to_cv(3, i),
                        duration,
                    ));
                }
                track.insert_end(4.0);
            }
        }
        track
    }

    /// Store an event. No invariants are checked here; see [`Self::validate`].
    pub fn insert_event(&mut self, event: MidiEvent) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        let time = TimeKey(event.start_time());
        self.events.insert(EventKey { time, id }, event);
        self.index.insert(id, time);
        id
    }

    pub fn insert_end(&mut self, time: f32) -> EventId {
        self.insert_event(MidiEvent::end(time))
    }

    /// Remove the first stored event value-equal to `event`.
    ///
    /// Panics if there is none: callers only ever delete events they found in
    /// this track, so a miss means the caller holds stale data.
    pub fn delete_event(&mut self, event: &MidiEvent) -> EventId {
        let Some(id) = self.find_event_deep(event) else {
            panic!("delete_event: {:?} is not in the track", event);
        };
        self.delete_by_id(id);
        id
    }

    /// Remove the event with this identity, if it is still stored.
    pub fn delete_by_id(&mut self, id: EventId) -> Option<MidiEvent> {
        let time = self.index.remove(&id)?;
        self.events.remove(&EventKey { time, id })
    }

    /// Identity lookup.
    pub fn find_event_pointer(&self, id: EventId) -> Option<&MidiEvent> {
        let time = *self.index.get(&id)?;
        self.events.get(&EventKey { time, id })
    }

    /// Value lookup, restricted to events sharing `event`'s start time.
    pub fn find_event_deep(&self, event: &MidiEvent) -> Option<EventId> {
        let time = event.start_time();
        self.events
            .range(EventKey::lowest(time)..=EventKey::highest(time))
            .find(|(_, stored)| *stored == event)
            .map(|(key, _)| key.id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> TimeRange<'_> {
        TimeRange {
            inner: self.events.range(..),
        }
    }

    /// Every event with `start <= t <= end`, in time order.
    pub fn time_range(&self, start: f32, end: f32) -> TimeRange<'_> {
        let lo = EventKey::lowest(start);
        let inner = if TimeKey(start) > TimeKey(end) {
            self.events.range(lo..lo)
        } else {
            self.events.range(lo..=EventKey::highest(end))
        };
        TimeRange { inner }
    }

    /// Notes only, with `start <= t <= end`, in time order.
    pub fn time_range_notes(&self, start: f32, end: f32) -> NoteRange<'_> {
        NoteRange {
            inner: self.time_range(start, end),
        }
    }

    pub fn first(&self) -> Option<(EventId, &MidiEvent)> {
        self.events.iter().next().map(|(k, e)| (k.id, e))
    }

    pub fn last(&self) -> Option<(EventId, &MidiEvent)> {
        self.events.iter().next_back().map(|(k, e)| (k.id, e))
    }

    pub fn first_note(&self) -> Option<(EventId, &MidiNoteEvent)> {
        self.iter().notes().next()
    }

    /// The event stored right after `id`.
    pub fn next_after(&self, id: EventId) -> Option<(EventId, &MidiEvent)> {
        let key = self.key_of(id)?;
        self.events
            .range((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(k, e)| (k.id, e))
    }

    /// The event stored right before `id`.
    pub fn prev_before(&self, id: EventId) -> Option<(EventId, &MidiEvent)> {
        let key = self.key_of(id)?;
        self.events
            .range(..key)
            .next_back()
            .map(|(k, e)| (k.id, e))
    }

    /// Events stored after `id`, in time order.
    pub fn iter_after(&self, id: EventId) -> TimeRange<'_> {
        let inner = match self.key_of(id) {
            Some(key) => self.events.range((Bound::Excluded(key), Bound::Unbounded)),
            None => {
                let lo = EventKey::lowest(0.0);
                self.events.range(lo..lo)
            }
        };
        TimeRange { inner }
    }

    /// Events stored before `id`, in time order. Reverse it to walk backwards.
    pub fn iter_before(&self, id: EventId) -> TimeRange<'_> {
        let inner = match self.key_of(id) {
            Some(key) => self.events.range(..key),
            None => {
                let lo = EventKey::lowest(0.0);
                self.events.range(lo..lo)
            }
        };
        TimeRange { inner }
    }

    /// The end marker. For a valid track it is the last event.
    pub fn end_event(&self) -> Option<(EventId, &MidiEndEvent)> {
        if let Some((id, MidiEvent::End(end))) = self.last() {
            return Some((id, end));
        }
        self.iter().rev().find_map(|(id, e)| match e {
            MidiEvent::End(end) => Some((id, end)),
            _ => None,
        })
    }

    /// Nominal track length in quarter notes; 0 when there is no end marker.
    pub fn length(&self) -> f32 {
        self.end_event().map(|(_, end)| end.start_time).unwrap_or(0.0)
    }

    pub fn note_count(&self) -> usize {
        self.iter().notes().count()
    }

    fn key_of(&self, id: EventId) -> Option<EventKey> {
        self.index.get(&id).map(|&time| EventKey { time, id })
    }

    /// Check every structural invariant of the track.
    pub fn validate(&self) -> Result<(), TrackError> {
        let mut previous: Option<f32> = None;
        let mut end_time: Option<f32> = None;
        let mut end_count = 0;
        let mut last_note_end = 0.0_f32;

        for (_, event) in self.iter() {
            let time = event.start_time();
            if let Some(prev) = previous {
                if !(time >= prev) {
                    return Err(TrackError::OutOfOrder {
                        time,
                        previous: prev,
                    });
                }
            }
            previous = Some(time);
            if !(time >= 0.0) {
                return Err(TrackError::NegativeStart { time });
            }
            if end_time.is_some() && !event.is_end() {
                return Err(TrackError::EndNotLast { time });
            }
            match event {
                MidiEvent::Note(note) => {
                    if !(note.duration > 0.0) {
                        return Err(TrackError::NonPositiveDuration {
                            time,
                            duration: note.duration,
                        });
                    }
                    last_note_end = last_note_end.max(note.end_time());
                }
                MidiEvent::End(end) => {
                    end_count += 1;
                    end_time = Some(end.start_time);
                }
                MidiEvent::Test(_) => {}
            }
        }

        match end_count {
            0 => return Err(TrackError::MissingEnd),
            1 => {}
            count => return Err(TrackError::MultipleEnds { count }),
        }
        let track_end = end_time.unwrap_or(0.0);
        if last_note_end > track_end {
            return Err(TrackError::NoteExtendsPastEnd {
                note_end: last_note_end,
                track_end,
            });
        }
        Ok(())
    }

    /// Panic if the track is malformed. For tests and debug checks.
    pub fn assert_valid(&self) {
        if let Err(e) = self.validate() {
            panic!("invalid track: {}", e);
        }
    }
}

/// Events in a time window. Cloning restarts the walk from the same window.
#[derive(Clone)]
pub struct TimeRange<'a> {
    inner: btree_map::Range<'a, EventKey, MidiEvent>,
}

impl<'a> TimeRange<'a> {
    /// Restrict to notes.
    pub fn notes(self) -> NoteRange<'a> {
        NoteRange { inner: self }
    }
}

impl<'a> Iterator for TimeRange<'a> {
    type Item = (EventId, &'a MidiEvent);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, e)| (k.id, e))
    }
}

impl DoubleEndedIterator for TimeRange<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, e)| (k.id, e))
    }
}

/// Notes in a time window; other event types are skipped.
#[derive(Clone)]
pub struct NoteRange<'a> {
    inner: TimeRange<'a>,
}

impl<'a> Iterator for NoteRange<'a> {
    type Item = (EventId, &'a MidiNoteEvent);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .by_ref()
            .find_map(|(id, event)| event.as_note().map(|note| (id, note)))
    }
}

impl DoubleEndedIterator for NoteRange<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while let Some((id, event)) = self.inner.next_back() {
            if let Some(note) = event.as_note() {
                return Some((id, note));
            }
        }
        None
    }
}
