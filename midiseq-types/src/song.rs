use crate::lock::{EditorGuard, EditorReadGuard, MidiLock, PlayerGuard};
use crate::track::{MidiTrack, TestContent};

/// Sparse, index-addressed set of tracks.
#[derive(Debug, Clone, Default)]
pub struct SongTracks {
    tracks: Vec<Option<MidiTrack>>,
}

impl SongTracks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, index: usize) -> Option<&MidiTrack> {
        self.tracks.get(index).and_then(|t| t.as_ref())
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut MidiTrack> {
        self.tracks.get_mut(index).and_then(|t| t.as_mut())
    }

    /// Get the track at `index`, creating an empty one (end marker at 0) if needed.
    pub fn create_track(&mut self, index: usize) -> &mut MidiTrack {
        if self.tracks.len() <= index {
            self.tracks.resize_with(index + 1, || None);
        }
        self.tracks[index].get_or_insert_with(|| MidiTrack::make_test(TestContent::Empty))
    }

    pub fn set_track(&mut self, index: usize, track: MidiTrack) {
        if self.tracks.len() <= index {
            self.tracks.resize_with(index + 1, || None);
        }
        self.tracks[index] = Some(track);
    }

    /// One past the highest index ever populated.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &MidiTrack)> {
        self.tracks
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| (i, t)))
    }

    pub fn assert_valid(&self) {
        for (_, track) in self.iter() {
            track.assert_valid();
        }
    }
}

/// A song: tracks plus the one lock that guards all of them.
///
/// Share it between the editor and the player as `Arc<MidiSong>`.
#[derive(Debug, Default)]
pub struct MidiSong {
    lock: MidiLock<SongTracks>,
}

impl MidiSong {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: SongTracks) -> Self {
        Self {
            lock: MidiLock::new(tracks),
        }
    }

    /// A song holding one canned track at `track_number`.
    pub fn make_test(content: TestContent, track_number: usize) -> Self {
        let mut tracks = SongTracks::new();
        tracks.set_track(track_number, MidiTrack::make_test(content));
        Self::from_tracks(tracks)
    }

    pub fn lock(&self) -> &MidiLock<SongTracks> {
        &self.lock
    }

    pub fn editor_lock(&self) -> EditorGuard<'_, SongTracks> {
        self.lock.editor_lock()
    }

    pub fn editor_read(&self) -> EditorReadGuard<'_, SongTracks> {
        self.lock.editor_read()
    }

    pub fn player_try_lock(&self) -> Option<PlayerGuard<'_, SongTracks>> {
        self.lock.player_try_lock()
    }

    /// Copy of all tracks, taken under the editor lock.
    pub fn snapshot(&self) -> SongTracks {
        self.editor_read().data().clone()
    }

    pub fn assert_valid(&self) {
        self.editor_read().data().assert_valid();
    }
}
