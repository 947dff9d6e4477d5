//! Real-time playback of one track.
//!
//! [`MidiPlayer::time_elapsed`] is called once per audio block. It never
//! blocks: if the editor holds the song lock, the tick is skipped, the host
//! is told, and playback restarts cleanly from the current time on the next
//! tick that gets the lock. The player itself never logs or allocates;
//! whether a tick allocates is up to the [`PlayerHost`] it drives.

use std::sync::Arc;

use midiseq_types::{EventId, MidiEvent, MidiSong, MidiTrack};

use crate::host::PlayerHost;

/// Fixed playback tempo.
pub const TEMPO_BPM: f64 = 120.0;

/// What one call to [`MidiPlayer::time_elapsed`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stopped, or the track does not exist.
    Idle,
    /// Took the lock and caught up with the clock.
    Played,
    /// The editor held the lock; the tick was skipped.
    LockFailed,
}

/// Iteration state over one track. Only valid between resets: any edit to
/// the song forces a reset before the next event is read.
#[derive(Debug, Clone)]
pub struct TrackPlayer {
    cur_event: Option<EventId>,
    note_off_time: Option<f64>,
    loop_start: f64,
    is_reset: bool,
}

impl Default for TrackPlayer {
    fn default() -> Self {
        Self {
            cur_event: None,
            note_off_time: None,
            loop_start: 0.0,
            is_reset: true,
        }
    }
}

impl TrackPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a reset on the next tick that holds the lock.
    pub fn request_reset(&mut self) {
        self.is_reset = true;
    }

    pub fn needs_reset(&self) -> bool {
        self.is_reset
    }

    pub fn note_off_time(&self) -> Option<f64> {
        self.note_off_time
    }

    pub fn loop_start(&self) -> f64 {
        self.loop_start
    }

    /// Start over from the top of `track`, with the loop anchored at `now`.
    pub fn reset(&mut self, track: &MidiTrack, now: f64, host: &mut impl PlayerHost) {
        self.cur_event = track.first().map(|(id, _)| id);
        self.note_off_time = None;
        self.loop_start = now;
        self.is_reset = false;
        host.set_gate(false);
    }

    /// Do the next due thing, if any. Returns whether anything happened.
    pub fn play_once(&mut self, track: &MidiTrack, now: f64, host: &mut impl PlayerHost) -> bool {
        if let Some(off) = self.note_off_time {
            if off <= now {
                self.note_off_time = None;
                host.set_gate(false);
                return true;
            }
        }

        let Some(id) = self.cur_event else {
            return false;
        };
        let Some(event) = track.find_event_pointer(id) else {
            // The event went away without a reset; wait for the next one.
            self.cur_event = None;
            self.is_reset = true;
            return false;
        };
        let due = self.loop_start + event.start_time() as f64;
        if due > now {
            return false;
        }

        match event {
            MidiEvent::Note(note) => {
                host.set_cv(note.pitch_cv);
                host.set_gate(true);
                self.note_off_time = Some(due + note.duration as f64);
                self.cur_event = track.next_after(id).map(|(next, _)| next);
            }
            MidiEvent::End(end) => {
                if end.start_time <= 0.0 {
                    // Zero-length loop: nothing to play until the track changes.
                    self.cur_event = None;
                    return false;
                }
                self.loop_start += end.start_time as f64;
                self.cur_event = track.first().map(|(first, _)| first);
            }
            MidiEvent::Test(_) => {
                self.cur_event = track.next_after(id).map(|(next, _)| next);
            }
        }
        true
    }
}

pub struct MidiPlayer<H: PlayerHost> {
    song: Arc<MidiSong>,
    host: H,
    track_number: usize,
    cur_metric_time: f64,
    is_playing: bool,
    track_player: TrackPlayer,
}

impl<H: PlayerHost> MidiPlayer<H> {
    pub fn new(song: Arc<MidiSong>, host: H, track_number: usize) -> Self {
        Self {
            song,
            host,
            track_number,
            cur_metric_time: 0.0,
            is_playing: false,
            track_player: TrackPlayer::new(),
        }
    }

    pub fn start(&mut self) {
        self.is_playing = true;
        self.track_player.request_reset();
    }

    pub fn stop(&mut self) {
        self.is_playing = false;
        self.track_player.note_off_time = None;
        self.host.set_gate(false);
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn set_track_number(&mut self, track_number: usize) {
        self.track_number = track_number;
        self.track_player.request_reset();
    }

    pub fn track_number(&self) -> usize {
        self.track_number
    }

    /// Quarter notes since the player was created.
    pub fn metric_time(&self) -> f64 {
        self.cur_metric_time
    }

    pub fn track_player(&self) -> &TrackPlayer {
        &self.track_player
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Advance the clock by `seconds` and play whatever came due.
    pub fn time_elapsed(&mut self, seconds: f32) -> TickOutcome {
        self.cur_metric_time += seconds as f64 * TEMPO_BPM / 60.0;
        if !self.is_playing {
            return TickOutcome::Idle;
        }

        let Some(guard) = self.song.player_try_lock() else {
            self.track_player.request_reset();
            self.host.on_lock_failed();
            return TickOutcome::LockFailed;
        };
        let dirty = self.song.lock().data_model_dirty();
        let tracks = guard.data();
        let Some(track) = tracks.track(self.track_number) else {
            return TickOutcome::Idle;
        };

        if dirty || self.track_player.needs_reset() {
            self.track_player
                .reset(track, self.cur_metric_time, &mut self.host);
        }
        while self
            .track_player
            .play_once(track, self.cur_metric_time, &mut self.host)
        {}
        TickOutcome::Played
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{PlayerFeedback, RecordingHost};
    use midiseq_types::pitch::pitch_to_cv;
    use midiseq_types::TestContent;
    use std::sync::mpsc;
    use std::thread;

    fn player(content: TestContent) -> MidiPlayer<RecordingHost> {
        let song = Arc::new(MidiSong::make_test(content, 0));
        let mut p = MidiPlayer::new(song, RecordingHost::new(), 0);
        p.start();
        p
    }

    /// Seconds for `quarters` quarter notes at the fixed tempo.
    fn secs(quarters: f32) -> f32 {
        quarters * 60.0 / TEMPO_BPM as f32
    }

    #[test]
    fn clock_runs_while_stopped() {
        let song = Arc::new(MidiSong::make_test(TestContent::OneQ1, 0));
        let mut p = MidiPlayer::new(song, RecordingHost::new(), 0);
        assert_eq!(p.time_elapsed(1.0), TickOutcome::Idle);
        assert_eq!(p.metric_time(), 2.0);
        assert!(p.host().calls.is_empty());
    }

    #[test]
    fn plays_note_on_and_off() {
        let mut p = player(TestContent::OneQ1);
        assert_eq!(p.time_elapsed(0.0), TickOutcome::Played);
        assert_eq!(p.host_mut().take(), vec![PlayerFeedback::Gate(false)]);

        p.time_elapsed(secs(1.0));
        assert_eq!(
            p.host_mut().take(),
            vec![
                PlayerFeedback::Cv(pitch_to_cv(3, 0)),
                PlayerFeedback::Gate(true)
            ]
        );
        assert_eq!(p.track_player().note_off_time(), Some(2.0));

        p.time_elapsed(secs(0.5));
        assert!(p.host().calls.is_empty());
        p.time_elapsed(secs(0.5));
        assert_eq!(p.host_mut().take(), vec![PlayerFeedback::Gate(false)]);
    }

    #[test]
    fn several_events_in_one_tick() {
        let mut p = player(TestContent::FourTouchingQuarters);
        p.time_elapsed(0.0);
        // Jump straight past the whole bar.
        p.time_elapsed(secs(3.5));
        assert_eq!(p.host().notes_started(), 4);
        assert!(p.host().gate());
    }

    #[test]
    fn touching_notes_release_before_retrigger() {
        let mut p = player(TestContent::FourTouchingQuarters);
        p.time_elapsed(0.0);
        p.time_elapsed(secs(0.5));
        p.host_mut().take();
        p.time_elapsed(secs(0.5));
        assert_eq!(
            p.host_mut().take(),
            vec![
                PlayerFeedback::Gate(false),
                PlayerFeedback::Cv(pitch_to_cv(3, 1)),
                PlayerFeedback::Gate(true)
            ]
        );
    }

    #[test]
    fn track_loops_at_end() {
        let mut p = player(TestContent::OneQ1);
        p.time_elapsed(0.0);
        p.time_elapsed(secs(4.0));
        assert_eq!(p.track_player().loop_start(), 4.0);
        p.host_mut().take();
        p.time_elapsed(secs(1.0));
        assert_eq!(p.host().notes_started(), 1);
    }

    #[test]
    fn empty_track_does_not_spin() {
        let mut p = player(TestContent::Empty);
        assert_eq!(p.time_elapsed(secs(100.0)), TickOutcome::Played);
        assert_eq!(p.host().notes_started(), 0);
    }

    #[test]
    fn missing_track_is_idle() {
        let song = Arc::new(MidiSong::make_test(TestContent::OneQ1, 0));
        let mut p = MidiPlayer::new(song, RecordingHost::new(), 5);
        p.start();
        assert_eq!(p.time_elapsed(1.0), TickOutcome::Idle);
    }

    #[test]
    fn stop_drops_gate_and_pending_off() {
        let mut p = player(TestContent::OneQ1);
        p.time_elapsed(0.0);
        p.time_elapsed(secs(1.0));
        p.time_elapsed(secs(0.1));
        assert!(p.host().gate());
        p.stop();
        assert!(!p.host().gate());
        assert_eq!(p.track_player().note_off_time(), None);
        assert_eq!(p.time_elapsed(1.0), TickOutcome::Idle);
    }

    #[test]
    fn edit_resets_playback() {
        let song = Arc::new(MidiSong::make_test(TestContent::OneQ1, 0));
        let mut p = MidiPlayer::new(Arc::clone(&song), RecordingHost::new(), 0);
        p.start();
        p.time_elapsed(0.0);
        p.time_elapsed(secs(1.5));
        assert!(p.host().gate());

        drop(song.editor_lock());
        p.host_mut().take();
        p.time_elapsed(0.0);
        // Reset: gate low, loop re-anchored at now.
        assert_eq!(p.host_mut().take(), vec![PlayerFeedback::Gate(false)]);
        assert_eq!(p.track_player().loop_start(), 1.5);
        assert_eq!(p.track_player().note_off_time(), None);
    }

    #[test]
    fn contention_skips_tick_and_notifies() {
        let song = Arc::new(MidiSong::make_test(TestContent::OneQ1, 0));
        let mut p = MidiPlayer::new(Arc::clone(&song), RecordingHost::new(), 0);
        p.start();

        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let editor = {
            let song = Arc::clone(&song);
            thread::spawn(move || {
                let _guard = song.editor_lock();
                locked_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })
        };
        locked_rx.recv().unwrap();

        for _ in 0..5 {
            assert_eq!(p.time_elapsed(secs(0.5)), TickOutcome::LockFailed);
        }
        assert_eq!(
            p.host()
                .calls
                .iter()
                .filter(|c| **c == PlayerFeedback::LockFailed)
                .count(),
            5
        );
        assert!(p.track_player().needs_reset());

        release_tx.send(()).unwrap();
        editor.join().unwrap();
        assert_eq!(p.time_elapsed(0.0), TickOutcome::Played);
    }

    #[test]
    fn recovery_after_contention_starts_fresh() {
        // Take a note on, then lose the lock for a while: the pending
        // note-off from before must not fire after recovery.
        let song = Arc::new(MidiSong::make_test(TestContent::OneQ1, 0));
        let mut p = MidiPlayer::new(Arc::clone(&song), RecordingHost::new(), 0);
        p.start();
        p.time_elapsed(0.0);
        p.time_elapsed(secs(1.25));
        assert!(p.host().gate());
        assert_eq!(p.track_player().note_off_time(), Some(2.0));

        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let editor = {
            let song = Arc::clone(&song);
            thread::spawn(move || {
                let _guard = song.editor_lock();
                locked_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })
        };
        locked_rx.recv().unwrap();
        for _ in 0..3 {
            p.time_elapsed(secs(0.25));
        }
        release_tx.send(()).unwrap();
        editor.join().unwrap();

        p.host_mut().take();
        p.time_elapsed(0.0);
        // now = 2.0: a fresh start anchored here, first note due at 3.0.
        assert_eq!(p.track_player().loop_start(), 2.0);
        assert_eq!(p.track_player().note_off_time(), None);
        assert_eq!(p.host_mut().take(), vec![PlayerFeedback::Gate(false)]);

        p.time_elapsed(secs(1.0));
        assert_eq!(p.host().notes_started(), 1);
        assert_eq!(p.track_player().note_off_time(), Some(4.0));
    }
}
