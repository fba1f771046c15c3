use playhead_playback::{FinishReason, PlaybackListener, Song, TransportState};

/// Logs controller notifications
#[derive(Debug, Default)]
pub struct LoggingListener;

impl PlaybackListener for LoggingListener {
    fn on_song_finished(&self, reason: FinishReason, song: Option<&Song>) {
        match (reason, song) {
            (FinishReason::Error, Some(song)) => tracing::warn!("{} failed", song),
            (FinishReason::Error, None) => tracing::warn!("Playback failed"),
            (reason, Some(song)) => tracing::info!("Finished {} ({})", song, reason),
            (reason, None) => tracing::info!("Finished ({})", reason),
        }
    }

    fn on_state_changed(&self, state: TransportState) {
        tracing::debug!("Transport state: {}", state);
    }

    fn on_queue_changed(&self, length: usize) {
        tracing::debug!("Queue length: {}", length);
    }
}
