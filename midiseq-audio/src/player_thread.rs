//! The player on its own thread, fed by a command channel.

use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use midiseq_types::MidiSong;

use crate::host::{ChannelHost, PlayerFeedback};
use crate::player::{MidiPlayer, TickOutcome};
use crate::telemetry::{PlayerTelemetry, TelemetrySummary};

const SUMMARY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Start,
    Stop,
    SetTrack(usize),
    Shutdown,
}

pub struct PlayerThread {
    cmd_tx: Sender<PlayerCommand>,
    feedback_rx: mpsc::Receiver<PlayerFeedback>,
    handle: Option<JoinHandle<TelemetrySummary>>,
}

impl PlayerThread {
    pub fn spawn(song: Arc<MidiSong>, track: usize, tick_interval: Duration) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let (feedback_tx, feedback_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("midiseq-player".into())
            .spawn(move || {
                let player = MidiPlayer::new(song, ChannelHost::new(feedback_tx), track);
                PlayerLoop::new(player, cmd_rx, tick_interval).run()
            })?;
        log::info!(target: "player", "player thread started on track {}", track);

        Ok(Self {
            cmd_tx,
            feedback_rx,
            handle: Some(handle),
        })
    }

    pub fn start(&self) {
        self.send(PlayerCommand::Start);
    }

    pub fn stop(&self) {
        self.send(PlayerCommand::Stop);
    }

    pub fn set_track(&self, track: usize) {
        self.send(PlayerCommand::SetTrack(track));
    }

    fn send(&self, cmd: PlayerCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            log::warn!(target: "player", "player thread is gone, dropped {:?}", cmd);
        }
    }

    /// Everything the player sent to its host since the last call.
    pub fn drain_feedback(&self) -> Vec<PlayerFeedback> {
        self.feedback_rx.try_iter().collect()
    }

    /// Stop the thread and return its final telemetry.
    pub fn shutdown(mut self) -> Option<TelemetrySummary> {
        self.join()
    }

    fn join(&mut self) -> Option<TelemetrySummary> {
        let handle = self.handle.take()?;
        let _ = self.cmd_tx.send(PlayerCommand::Shutdown);
        match handle.join() {
            Ok(summary) => Some(summary),
            Err(_) => {
                log::error!(target: "player", "player thread panicked");
                None
            }
        }
    }
}

impl Drop for PlayerThread {
    fn drop(&mut self) {
        self.join();
    }
}

struct PlayerLoop {
    player: MidiPlayer<ChannelHost>,
    cmd_rx: Receiver<PlayerCommand>,
    tick_interval: Duration,
    telemetry: PlayerTelemetry,
    last_tick: Instant,
    last_summary: Instant,
}

impl PlayerLoop {
    fn new(
        player: MidiPlayer<ChannelHost>,
        cmd_rx: Receiver<PlayerCommand>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            player,
            cmd_rx,
            tick_interval,
            telemetry: PlayerTelemetry::new(),
            last_tick: Instant::now(),
            last_summary: Instant::now(),
        }
    }

    fn run(mut self) -> TelemetrySummary {
        let budget_us = self.tick_interval.as_micros().min(u32::MAX as u128) as u32;
        loop {
            let remaining = self.tick_interval.saturating_sub(self.last_tick.elapsed());
            crossbeam_channel::select! {
                recv(self.cmd_rx) -> result => match result {
                    Ok(cmd) => {
                        if self.handle_cmd(cmd) {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                default(remaining) => {}
            }

            let now = Instant::now();
            let elapsed = now.duration_since(self.last_tick);
            if elapsed >= self.tick_interval {
                self.last_tick = now;
                let tick_start = Instant::now();
                if self.player.time_elapsed(elapsed.as_secs_f32()) == TickOutcome::LockFailed {
                    self.telemetry.record_lock_failure();
                }
                self.telemetry.record(tick_start.elapsed(), budget_us);
            }

            if self.last_summary.elapsed() >= SUMMARY_INTERVAL {
                self.last_summary = Instant::now();
                let s = self.telemetry.take_summary();
                log::debug!(
                    target: "player",
                    "tick avg {}us max {}us p95 {}us overruns {} lock failures {}",
                    s.avg_us, s.max_us, s.p95_us, s.overruns, s.lock_failures
                );
            }
        }
        log::info!(target: "player", "player thread stopped");
        self.telemetry.take_summary()
    }

    /// Returns true on shutdown.
    fn handle_cmd(&mut self, cmd: PlayerCommand) -> bool {
        match cmd {
            PlayerCommand::Start => self.player.start(),
            PlayerCommand::Stop => self.player.stop(),
            PlayerCommand::SetTrack(track) => self.player.set_track_number(track),
            PlayerCommand::Shutdown => return true,
        }
        false
    }
}
