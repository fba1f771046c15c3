//! Simulated audio engine
//!
//! Stands in for a platform player: it validates song URIs, "prepares"
//! after a configurable delay and reports completion once the track
//! length has elapsed in wall-clock time. No audio is produced.

use crate::config::SimulatedEngineSettings;
use crossbeam_channel::{after, never, select, unbounded, Receiver, Sender};
use playhead_playback::{Engine, EngineNotifier, Generation, PlaybackError, Result, Song};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use url::Url;

/// What a scheduled timer reports when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fire {
    Prepared,
    Completed,
}

enum TimerCommand {
    /// Replace the pending timer
    Schedule {
        delay: Duration,
        generation: Generation,
        fire: Fire,
    },
    Cancel,
    Shutdown,
}

/// Playhead bookkeeping of the loaded source
#[derive(Debug, Default)]
struct Clock {
    generation: Generation,
    duration: Duration,
    /// Position accumulated before the current run
    offset: Duration,
    /// Set while rendering
    running_since: Option<Instant>,
}

impl Clock {
    fn position(&self) -> Duration {
        let elapsed = self
            .running_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        (self.offset + elapsed).min(self.duration)
    }

    fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.position())
    }
}

pub struct SimulatedEngine {
    settings: SimulatedEngineSettings,
    clock: Arc<Mutex<Clock>>,
    timer_tx: Sender<TimerCommand>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedEngine {
    pub fn new(settings: SimulatedEngineSettings, notifier: EngineNotifier) -> Self {
        let (timer_tx, timer_rx) = unbounded();
        let worker = thread::Builder::new()
            .name("playhead-engine".to_string())
            .spawn(move || run_timer(&timer_rx, &notifier));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to start engine timer thread: {}", e);
                None
            }
        };

        Self {
            settings,
            clock: Arc::new(Mutex::new(Clock::default())),
            timer_tx,
            worker,
        }
    }

    /// Check that `uri` is well formed and uses an accepted scheme
    pub fn validate_uri(&self, uri: &str) -> Result<Url> {
        let url = Url::parse(uri)
            .map_err(|e| PlaybackError::UnsupportedSource(format!("{}: {}", uri, e)))?;

        if !self
            .settings
            .schemes
            .iter()
            .any(|scheme| scheme.eq_ignore_ascii_case(url.scheme()))
        {
            return Err(PlaybackError::UnsupportedSource(format!(
                "{}: scheme '{}' not accepted",
                uri,
                url.scheme()
            )));
        }

        Ok(url)
    }

    fn clock(&self) -> MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule(&self, delay: Duration, generation: Generation, fire: Fire) {
        let _ = self.timer_tx.send(TimerCommand::Schedule {
            delay,
            generation,
            fire,
        });
    }

    fn cancel(&self) {
        let _ = self.timer_tx.send(TimerCommand::Cancel);
    }

    fn schedule_completion(&self) {
        let (remaining, generation) = {
            let clock = self.clock();
            (clock.remaining(), clock.generation)
        };
        self.schedule(remaining, generation, Fire::Completed);
    }
}

impl Engine for SimulatedEngine {
    fn load(&mut self, song: &Song, generation: Generation) -> Result<()> {
        let url = self.validate_uri(song.uri())?;
        tracing::debug!("Preparing {} ({})", url, generation);

        {
            let mut clock = self.clock();
            *clock = Clock {
                generation,
                duration: song
                    .duration()
                    .unwrap_or_else(|| self.settings.default_track_duration()),
                offset: Duration::ZERO,
                running_since: None,
            };
        }

        self.schedule(self.settings.prepare_delay(), generation, Fire::Prepared);
        Ok(())
    }

    fn start(&mut self) {
        {
            let mut clock = self.clock();
            let finished = clock.remaining().is_zero();
            if clock.running_since.is_some() && !finished {
                return;
            }
            // Restart a track that already played to its end
            clock.offset = if finished { Duration::ZERO } else { clock.offset };
            clock.running_since = Some(Instant::now());
        }
        self.schedule_completion();
    }

    fn pause(&mut self) {
        let mut clock = self.clock();
        clock.offset = clock.position();
        clock.running_since = None;
        drop(clock);
        self.cancel();
    }

    fn stop(&mut self) {
        let mut clock = self.clock();
        clock.offset = Duration::ZERO;
        clock.running_since = None;
        drop(clock);
        self.cancel();
    }

    fn seek_to(&mut self, position: Duration) {
        let running = {
            let mut clock = self.clock();
            clock.offset = position.min(clock.duration);
            if clock.running_since.is_some() {
                clock.running_since = Some(Instant::now());
                true
            } else {
                false
            }
        };

        if running {
            self.schedule_completion();
        }
    }

    fn current_position(&self) -> Duration {
        self.clock().position()
    }

    fn duration(&self) -> Duration {
        self.clock().duration
    }

    fn reset(&mut self) {
        *self.clock() = Clock::default();
        self.cancel();
    }

    fn release(&mut self) {
        self.reset();
        let _ = self.timer_tx.send(TimerCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Engine timer thread panicked");
            }
        }
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        let _ = self.timer_tx.send(TimerCommand::Shutdown);
    }
}

/// Timer worker: holds at most one pending notification
fn run_timer(commands: &Receiver<TimerCommand>, notifier: &EngineNotifier) {
    let mut pending: Option<(Receiver<Instant>, Generation, Fire)> = None;

    loop {
        let deadline = match &pending {
            Some((deadline, _, _)) => deadline.clone(),
            None => never(),
        };

        select! {
            recv(commands) -> command => match command {
                Ok(TimerCommand::Schedule { delay, generation, fire }) => {
                    pending = Some((after(delay), generation, fire));
                }
                Ok(TimerCommand::Cancel) => pending = None,
                Ok(TimerCommand::Shutdown) | Err(_) => break,
            },
            recv(deadline) -> _ => {
                if let Some((_, generation, fire)) = pending.take() {
                    let sent = match fire {
                        Fire::Prepared => notifier.prepared(generation),
                        Fire::Completed => notifier.completed(generation),
                    };
                    if sent.is_err() {
                        tracing::debug!("Controller gone, stopping engine timer");
                        break;
                    }
                }
            },
        }
    }
}
