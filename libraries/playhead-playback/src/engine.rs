//! Audio engine boundary
//!
//! The controller never decodes or renders audio itself. It drives an
//! [`Engine`] with fire-and-forget commands and learns about readiness,
//! completion and failure through [`EngineEvent`]s the engine posts on an
//! [`EngineNotifier`]. Every event carries the [`Generation`] of the load
//! that produced it so results of superseded loads can be told apart.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::fmt;
use std::time::Duration;

use crate::error::{PlaybackError, Result};
use crate::types::Song;

/// Identifies one load request
///
/// Incremented on every load; an event whose generation differs from the
/// transport's current one belongs to a superseded load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Platform audio engine
///
/// Implementors load, start, pause and stop one source at a time.
/// `load` only begins preparing: the engine reports readiness later by
/// posting [`EngineEventKind::Prepared`] with the same generation.
#[cfg_attr(test, mockall::automock)]
pub trait Engine: Send {
    /// Hand a source to the engine and start preparing it
    ///
    /// # Returns
    /// * `Ok(())` - Prepare started, an event will follow
    /// * `Err(_)` - Reference rejected outright (malformed, unsupported scheme, ...)
    fn load(&mut self, song: &Song, generation: Generation) -> Result<()>;

    /// Start or resume rendering
    fn start(&mut self);

    /// Pause rendering, keeping the playhead
    fn pause(&mut self);

    /// Stop rendering
    fn stop(&mut self);

    /// Move the playhead
    fn seek_to(&mut self, position: Duration);

    /// Playhead of the loaded source
    fn current_position(&self) -> Duration;

    /// Duration of the loaded source, zero while unknown
    fn duration(&self) -> Duration;

    /// Drop the loaded source and return to idle
    fn reset(&mut self) {
        self.stop();
    }

    /// Free engine resources; no command follows
    fn release(&mut self) {}
}

/// What happened to a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEventKind {
    /// Source is ready to start
    Prepared,

    /// Source played to its end
    Completed,

    /// Preparing or rendering failed
    Error(String),
}

/// Event posted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    /// Load the event belongs to
    pub generation: Generation,

    pub kind: EngineEventKind,
}

/// Messages on the controller's inbound channel
#[derive(Debug)]
pub(crate) enum Message {
    Engine(EngineEvent),
    Shutdown,
}

/// Create the channel between an engine and a controller
///
/// The notifier goes to the engine, the receiving half to
/// `PlaybackController::new`.
pub fn engine_channel(capacity: usize) -> (EngineNotifier, EngineEvents) {
    let (tx, rx) = bounded(capacity.max(1));
    (EngineNotifier { tx: tx.clone() }, EngineEvents { rx, tx })
}

/// Sending half handed to the engine
#[derive(Debug, Clone)]
pub struct EngineNotifier {
    tx: Sender<Message>,
}

impl EngineNotifier {
    /// Post an event
    ///
    /// Blocks while the channel is full. Engines must therefore not post
    /// from inside a command call when the consumer may be behind.
    pub fn notify(&self, event: EngineEvent) -> Result<()> {
        self.tx
            .send(Message::Engine(event))
            .map_err(|_| PlaybackError::ChannelClosed)
    }

    pub fn prepared(&self, generation: Generation) -> Result<()> {
        self.notify(EngineEvent {
            generation,
            kind: EngineEventKind::Prepared,
        })
    }

    pub fn completed(&self, generation: Generation) -> Result<()> {
        self.notify(EngineEvent {
            generation,
            kind: EngineEventKind::Completed,
        })
    }

    pub fn error(&self, generation: Generation, cause: impl Into<String>) -> Result<()> {
        self.notify(EngineEvent {
            generation,
            kind: EngineEventKind::Error(cause.into()),
        })
    }
}

/// Receiving half owned by the controller
#[derive(Debug)]
pub struct EngineEvents {
    rx: Receiver<Message>,
    tx: Sender<Message>,
}

impl EngineEvents {
    pub(crate) fn try_next(&self) -> Option<Message> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next message
    ///
    /// `None` on timeout. The channel never disconnects while `self` is
    /// alive since it keeps a sender for shutdown requests.
    pub(crate) fn next_timeout(&self, timeout: Duration) -> Option<Message> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub(crate) fn request_shutdown(&self) {
        // Full channel means the loop is busy and will see the release anyway
        let _ = self.tx.try_send(Message::Shutdown);
    }

    /// Number of events waiting to be processed
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
