//! Transport state machine
//!
//! Tracks engine readiness and mediates every play/pause/stop/seek
//! request against the [`Engine`]:
//!
//! ```text
//! IDLE --load--> INITIALIZED --> PREPARING --Prepared--> PREPARED --start--> STARTED
//! STARTED <--start/pause--> PAUSED
//! STARTED --Completed--> PLAYBACK_COMPLETED
//! STARTED|PAUSED --stop--> STOPPED
//! any --Error--> ERROR            any --release--> END
//! ```
//!
//! The machine never picks a finish reason; it only reports what the
//! engine told it through [`EventOutcome`].

use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::{Engine, EngineEvent, EngineEventKind, Generation};
use crate::types::{Song, TransportState};

/// What to do once the pending load reports `Prepared`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PreparedAction {
    autostart: bool,
    seek: Option<Duration>,
}

/// How an engine event affected the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Event belongs to a superseded load
    Stale,

    /// Event is current but meaningless in the current state
    Ignored,

    /// Pending load became ready (and started if requested)
    Prepared,

    /// Loaded track played to its end
    Completed,

    /// Engine failure
    Failed(String),
}

/// Engine readiness tracking plus in-flight command bookkeeping
pub struct TransportStateMachine {
    engine: Box<dyn Engine>,
    state: TransportState,
    generation: Generation,
    loaded: Option<Song>,
    on_prepared: PreparedAction,
    transitions: Vec<TransportState>,
}

impl TransportStateMachine {
    pub fn new(engine: Box<dyn Engine>) -> Self {
        Self {
            engine,
            state: TransportState::Idle,
            generation: Generation::default(),
            loaded: None,
            on_prepared: PreparedAction::default(),
            transitions: Vec::new(),
        }
    }

    // ===== Queries =====

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Generation of the most recent load
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Song handed to the engine by the most recent successful load
    pub fn loaded_song(&self) -> Option<&Song> {
        self.loaded.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Started
    }

    pub fn is_paused(&self) -> bool {
        self.state == TransportState::Paused
    }

    pub fn is_loading(&self) -> bool {
        self.state == TransportState::Preparing
    }

    /// Playing, or preparing a load that starts on its own
    pub fn will_play(&self) -> bool {
        match self.state {
            TransportState::Started => true,
            TransportState::Initialized | TransportState::Preparing => self.on_prepared.autostart,
            _ => false,
        }
    }

    /// Playhead reported by the engine, zero when nothing is loaded
    pub fn current_position(&self) -> Duration {
        if self.state.has_source() {
            self.engine.current_position()
        } else {
            Duration::ZERO
        }
    }

    /// Duration reported by the engine, zero when nothing is loaded
    pub fn duration(&self) -> Duration {
        if self.state.has_source() {
            self.engine.duration()
        } else {
            Duration::ZERO
        }
    }

    /// Drain transitions recorded since the last call, oldest first
    pub fn take_transitions(&mut self) -> Vec<TransportState> {
        std::mem::take(&mut self.transitions)
    }

    // ===== Commands =====

    /// Load `song`, superseding whatever was loaded or preparing
    ///
    /// With `autostart` playback begins as soon as the engine reports the
    /// source prepared, after seeking to `start_at` if given.
    /// Returns `false` when the engine rejects the reference.
    pub fn load(&mut self, song: Song, autostart: bool, start_at: Option<Duration>) -> bool {
        if self.state == TransportState::End {
            return false;
        }

        if matches!(self.state, TransportState::Started | TransportState::Paused) {
            self.engine.stop();
        }

        self.generation = self.generation.next();
        self.on_prepared = PreparedAction::default();

        match self.engine.load(&song, self.generation) {
            Ok(()) => {
                debug!(
                    "Loading {} (generation {}, autostart {})",
                    song.uri(),
                    self.generation,
                    autostart
                );
                self.loaded = Some(song);
                self.on_prepared = PreparedAction {
                    autostart,
                    seek: start_at,
                };
                self.transition(TransportState::Initialized);
                self.transition(TransportState::Preparing);
                true
            }
            Err(e) => {
                warn!("Engine rejected {}: {}", song.uri(), e);
                self.loaded = None;
                self.transition(TransportState::Error);
                false
            }
        }
    }

    /// Start or resume the loaded song
    ///
    /// While preparing, playback is scheduled for when the engine is ready.
    /// From `STOPPED` the loaded song is prepared again.
    /// Returns `false` when nothing is loaded.
    pub fn play(&mut self) -> bool {
        match self.state {
            TransportState::Prepared | TransportState::Paused | TransportState::PlaybackCompleted => {
                self.engine.start();
                self.transition(TransportState::Started);
                true
            }
            TransportState::Started => true,
            TransportState::Initialized | TransportState::Preparing => {
                self.on_prepared.autostart = true;
                true
            }
            TransportState::Stopped => {
                let Some(song) = self.loaded.clone() else {
                    return false;
                };
                let resume_at = self.on_prepared.seek;
                self.load(song, true, resume_at)
            }
            TransportState::Idle | TransportState::Error | TransportState::End => false,
        }
    }

    /// Seek then start
    pub fn play_from(&mut self, position: Duration) -> bool {
        self.seek_to(position) && self.play()
    }

    /// Pause; only valid while started
    pub fn pause(&mut self) -> bool {
        if self.state != TransportState::Started {
            return false;
        }
        self.engine.pause();
        self.transition(TransportState::Paused);
        true
    }

    /// Stop; only valid while started or paused
    pub fn stop(&mut self) -> bool {
        if !matches!(self.state, TransportState::Started | TransportState::Paused) {
            return false;
        }
        self.engine.stop();
        self.on_prepared = PreparedAction::default();
        self.transition(TransportState::Stopped);
        true
    }

    /// Stop from any loaded state, including mid-prepare
    ///
    /// The loaded song is kept; a later `play` prepares it again.
    pub fn force_stop(&mut self) -> bool {
        if !self.state.has_source() {
            return false;
        }
        self.engine.stop();
        self.on_prepared = PreparedAction::default();
        self.transition(TransportState::Stopped);
        true
    }

    /// Move the playhead, clamped to the track duration
    ///
    /// While preparing or stopped the seek is kept and applied once the
    /// source is ready again. Returns `false` when nothing is loaded.
    pub fn seek_to(&mut self, position: Duration) -> bool {
        if !self.state.has_source() {
            return false;
        }

        let target = self.clamp_to_duration(position);
        match self.state {
            TransportState::Initialized | TransportState::Preparing | TransportState::Stopped => {
                self.on_prepared.seek = Some(target);
            }
            _ => self.engine.seek_to(target),
        }
        true
    }

    /// Drop the loaded source and go back to `IDLE`
    ///
    /// Any load still preparing is invalidated.
    pub fn reset(&mut self) {
        if self.state == TransportState::End {
            return;
        }
        if self.state != TransportState::Idle {
            self.engine.reset();
        }
        self.generation = self.generation.next();
        self.loaded = None;
        self.on_prepared = PreparedAction::default();
        self.transition(TransportState::Idle);
    }

    /// Tear the engine down; the machine stays in `END` for good
    pub fn release(&mut self) -> bool {
        if self.state == TransportState::End {
            return false;
        }
        self.engine.release();
        self.generation = self.generation.next();
        self.loaded = None;
        self.on_prepared = PreparedAction::default();
        self.transition(TransportState::End);
        true
    }

    // ===== Engine callbacks =====

    /// Apply an engine event
    pub fn handle_event(&mut self, event: EngineEvent) -> EventOutcome {
        if event.generation != self.generation || self.state == TransportState::End {
            debug!(
                "Ignoring stale {:?} from generation {} (current {})",
                event.kind, event.generation, self.generation
            );
            return EventOutcome::Stale;
        }

        match event.kind {
            EngineEventKind::Prepared => {
                if self.state != TransportState::Preparing {
                    return EventOutcome::Ignored;
                }
                self.transition(TransportState::Prepared);

                let action = std::mem::take(&mut self.on_prepared);
                if let Some(position) = action.seek {
                    self.engine.seek_to(position);
                }
                if action.autostart {
                    self.engine.start();
                    self.transition(TransportState::Started);
                }
                EventOutcome::Prepared
            }
            EngineEventKind::Completed => {
                if self.state != TransportState::Started {
                    return EventOutcome::Ignored;
                }
                self.transition(TransportState::PlaybackCompleted);
                EventOutcome::Completed
            }
            EngineEventKind::Error(cause) => {
                warn!("Engine error on generation {}: {}", event.generation, cause);
                self.loaded = None;
                self.on_prepared = PreparedAction::default();
                self.transition(TransportState::Error);
                EventOutcome::Failed(cause)
            }
        }
    }

    fn clamp_to_duration(&self, position: Duration) -> Duration {
        let reported = self.engine.duration();
        let limit = if reported.is_zero() {
            self.loaded.as_ref().and_then(Song::duration)
        } else {
            Some(reported)
        };

        match limit {
            Some(limit) => position.min(limit),
            None => position,
        }
    }

    fn transition(&mut self, to: TransportState) {
        if self.state == to {
            return;
        }
        debug!("Transport {} -> {}", self.state, to);
        self.state = to;
        self.transitions.push(to);
    }
}
