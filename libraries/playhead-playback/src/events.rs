//! Client notifications
//!
//! The controller reports track endings and transport transitions to a
//! [`PlaybackListener`]. Notifications are collected while the controller
//! lock is held and delivered after it is released, so a listener may call
//! straight back into the controller.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::types::{FinishReason, Song, TransportState};

/// Events emitted by the playback controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// A track stopped being the one playing
    SongFinished {
        /// Why it finished
        reason: FinishReason,
        /// The finished track, if the queue still knew it
        song: Option<Song>,
    },

    /// Transport moved to a new state
    StateChanged {
        /// The new state
        state: TransportState,
    },

    /// Queue contents changed
    QueueChanged {
        /// New queue length
        length: usize,
    },
}

/// Receives controller notifications
///
/// Called outside the controller lock, in the order events happened.
pub trait PlaybackListener: Send + Sync {
    fn on_song_finished(&self, _reason: FinishReason, _song: Option<&Song>) {}

    fn on_state_changed(&self, _state: TransportState) {}

    fn on_queue_changed(&self, _length: usize) {}
}

/// Route one event to the matching listener callback
pub(crate) fn dispatch(listener: &dyn PlaybackListener, event: &PlayerEvent) {
    match event {
        PlayerEvent::SongFinished { reason, song } => {
            listener.on_song_finished(*reason, song.as_ref());
        }
        PlayerEvent::StateChanged { state } => listener.on_state_changed(*state),
        PlayerEvent::QueueChanged { length } => listener.on_queue_changed(*length),
    }
}

/// Listener forwarding every event onto a channel
///
/// Events are dropped once the receiving side is gone.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: Sender<PlayerEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiver its events arrive on
    pub fn new() -> (Self, Receiver<PlayerEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    fn forward(&self, event: PlayerEvent) {
        self.tx.send(event).ok();
    }
}

impl PlaybackListener for ChannelListener {
    fn on_song_finished(&self, reason: FinishReason, song: Option<&Song>) {
        self.forward(PlayerEvent::SongFinished {
            reason,
            song: song.cloned(),
        });
    }

    fn on_state_changed(&self, state: TransportState) {
        self.forward(PlayerEvent::StateChanged { state });
    }

    fn on_queue_changed(&self, length: usize) {
        self.forward(PlayerEvent::QueueChanged { length });
    }
}
