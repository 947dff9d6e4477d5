//! What the player drives: a gate, a pitch CV, and a conflict notification.

use std::sync::mpsc::Sender;

/// Output capability consumed by [`crate::player::MidiPlayer`].
///
/// Implementations are called from the real-time thread and must not block.
pub trait PlayerHost {
    fn set_gate(&mut self, gate: bool);
    /// Pitch in volts, 1V/octave, 0V = C4.
    fn set_cv(&mut self, cv: f32);
    /// The player could not take the song lock this tick. Not an error.
    fn on_lock_failed(&mut self);
}

/// One host call, as data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerFeedback {
    Gate(bool),
    Cv(f32),
    LockFailed,
}

/// Forwards every host call over a channel to a non-real-time reader.
pub struct ChannelHost {
    tx: Sender<PlayerFeedback>,
}

impl ChannelHost {
    pub fn new(tx: Sender<PlayerFeedback>) -> Self {
        Self { tx }
    }

    fn send(&self, feedback: PlayerFeedback) {
        // A closed receiver just means nobody is listening any more.
        let _ = self.tx.send(feedback);
    }
}

impl PlayerHost for ChannelHost {
    fn set_gate(&mut self, gate: bool) {
        self.send(PlayerFeedback::Gate(gate));
    }

    fn set_cv(&mut self, cv: f32) {
        self.send(PlayerFeedback::Cv(cv));
    }

    fn on_lock_failed(&mut self) {
        self.send(PlayerFeedback::LockFailed);
    }
}

/// Keeps every host call in order. For tests and offline rendering.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Vec<PlayerFeedback>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// The gate level after all recorded calls.
    pub fn gate(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                PlayerFeedback::Gate(g) => Some(*g),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Number of rising gate edges, i.e. notes started.
    pub fn notes_started(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == PlayerFeedback::Gate(true))
            .count()
    }

    pub fn take(&mut self) -> Vec<PlayerFeedback> {
        std::mem::take(&mut self.calls)
    }
}

impl PlayerHost for RecordingHost {
    fn set_gate(&mut self, gate: bool) {
        self.calls.push(PlayerFeedback::Gate(gate));
    }

    fn set_cv(&mut self, cv: f32) {
        self.calls.push(PlayerFeedback::Cv(cv));
    }

    fn on_lock_failed(&mut self) {
        self.calls.push(PlayerFeedback::LockFailed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn channel_host_forwards_in_order() {
        let (tx, rx) = mpsc::channel();
        let mut host = ChannelHost::new(tx);
        host.set_cv(0.5);
        host.set_gate(true);
        host.on_lock_failed();
        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                PlayerFeedback::Cv(0.5),
                PlayerFeedback::Gate(true),
                PlayerFeedback::LockFailed
            ]
        );
    }

    #[test]
    fn channel_host_survives_closed_receiver() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut host = ChannelHost::new(tx);
        host.set_gate(true);
    }

    #[test]
    fn recording_host_tracks_gate() {
        let mut host = RecordingHost::new();
        assert!(!host.gate());
        host.set_gate(true);
        host.set_cv(1.0);
        assert!(host.gate());
        host.set_gate(false);
        assert!(!host.gate());
        assert_eq!(host.notes_started(), 1);
        assert_eq!(host.take().len(), 3);
        assert!(host.calls.is_empty());
    }
}
