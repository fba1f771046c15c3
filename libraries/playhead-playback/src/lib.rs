//! Playhead - Playback Control
//!
//! Engine-agnostic playback control for a queue of songs.
//!
//! This crate provides:
//! - Playhead-relative play queue (enqueue, skip, skip back, remove)
//! - Transport state machine mirroring the engine lifecycle
//! - Finish reasons for every track that stops being current
//! - Listener and channel notifications, delivered outside the controller lock
//!
//! # Architecture
//!
//! `playhead-playback` never touches audio:
//! - The platform engine is supplied through the [`Engine`] trait
//! - The engine reports readiness, completion and failure on an
//!   [`EngineNotifier`], tagged with the [`Generation`] of the load
//! - Events of superseded loads are discarded
//!
//! # Example
//!
//! ```rust
//! use playhead_playback::{
//!     Engine, EngineNotifier, Generation, PlaybackConfig, PlaybackController, Player, Result,
//!     Song,
//! };
//! use std::time::Duration;
//!
//! // Engine that is ready as soon as it is given a source
//! struct InstantEngine {
//!     notifier: EngineNotifier,
//! }
//!
//! impl Engine for InstantEngine {
//!     fn load(&mut self, _song: &Song, generation: Generation) -> Result<()> {
//!         self.notifier.prepared(generation)
//!     }
//!     fn start(&mut self) {}
//!     fn pause(&mut self) {}
//!     fn stop(&mut self) {}
//!     fn seek_to(&mut self, _position: Duration) {}
//!     fn current_position(&self) -> Duration {
//!         Duration::ZERO
//!     }
//!     fn duration(&self) -> Duration {
//!         Duration::from_secs(180)
//!     }
//! }
//!
//! let controller = PlaybackController::with_engine(PlaybackConfig::default(), |notifier| {
//!     InstantEngine { notifier }
//! })?;
//!
//! controller.enqueue(Song::new("file:///music/a.mp3").with_title("A"));
//! controller.enqueue(Song::new("file:///music/b.mp3").with_title("B"));
//! controller.process_events();
//!
//! assert!(controller.play());
//! controller.skip();
//! controller.process_events();
//!
//! assert_eq!(controller.now_playing().unwrap().title(), Some("B"));
//! assert!(controller.is_playing());
//! # Ok::<(), playhead_playback::PlaybackError>(())
//! ```

mod controller;
mod engine;
mod error;
mod events;
pub mod queue;
pub mod transport;
pub mod types;

// Public exports
pub use controller::{PlaybackController, Player};
pub use engine::{
    engine_channel, Engine, EngineEvent, EngineEventKind, EngineEvents, EngineNotifier, Generation,
};
pub use error::{PlaybackError, Result};
pub use events::{ChannelListener, PlaybackListener, PlayerEvent};
pub use queue::Queue;
pub use transport::{EventOutcome, TransportStateMachine};
pub use types::{FinishReason, PlaybackConfig, Song, TransportControlFlags, TransportState};
