//! Core types for playback control

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::error::{PlaybackError, Result};

/// One playable track
///
/// Immutable once built. Two songs are equal when they point at the same
/// content reference, whatever their metadata says.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    uri: String,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    artwork: Option<String>,
    duration: Option<Duration>,
}

impl Song {
    /// Create a song from its content reference
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: None,
            artist: None,
            album: None,
            artwork: None,
            duration: None,
        }
    }

    /// Set the display title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the artist name
    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Set the album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set the artwork location
    #[must_use]
    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    /// Set a duration hint, used until the engine reports the real one
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Content reference handed to the engine
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn artwork(&self) -> Option<&str> {
        self.artwork.as_deref()
    }

    /// Duration hint supplied at construction
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

impl PartialEq for Song {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for Song {}

impl Hash for Song {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.artist, &self.title) {
            (Some(artist), Some(title)) => write!(f, "{} - {}", artist, title),
            (None, Some(title)) => write!(f, "{}", title),
            _ => write!(f, "{}", self.uri),
        }
    }
}

/// Engine readiness as tracked by the transport state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    /// Nothing loaded
    Idle,

    /// Engine accepted a source, prepare not yet requested
    Initialized,

    /// Waiting for the engine to report the source as prepared
    Preparing,

    /// Source ready, not started
    Prepared,

    /// Rendering audio
    Started,

    /// Paused mid-track
    Paused,

    /// Stopped; a new prepare is needed before playing again
    Stopped,

    /// Track played to its end
    PlaybackCompleted,

    /// Engine reported a failure
    Error,

    /// Controller released, no further commands accepted
    End,
}

impl TransportState {
    /// Whether a source is loaded in the engine
    pub fn has_source(self) -> bool {
        !matches!(self, Self::Idle | Self::Error | Self::End)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initialized => "initialized",
            Self::Preparing => "preparing",
            Self::Prepared => "prepared",
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::PlaybackCompleted => "playback_completed",
            Self::Error => "error",
            Self::End => "end",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a track stopped being the one playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Played to completion
    SongEnd,

    /// Left through the skip button
    SkipButton,

    /// Engine failed while playing it
    Error,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SongEnd => "song_end",
            Self::SkipButton => "skip_button",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Buttons a media-session front end should expose
///
/// Stored verbatim by the controller; nothing in the transport reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransportControlFlags(u32);

impl TransportControlFlags {
    pub const PREVIOUS: Self = Self(1);
    pub const REWIND: Self = Self(1 << 1);
    pub const PLAY: Self = Self(1 << 2);
    pub const PLAY_PAUSE: Self = Self(1 << 3);
    pub const PAUSE: Self = Self(1 << 4);
    pub const STOP: Self = Self(1 << 5);
    pub const FAST_FORWARD: Self = Self(1 << 6);
    pub const NEXT: Self = Self(1 << 7);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TransportControlFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Playhead limit below which skip-back moves to the previous track (default: 2000)
    pub skip_back_threshold_ms: u64,

    /// Load and start the next track when one ends naturally (default: true)
    pub auto_advance: bool,

    /// Bound of the engine event channel (default: 64)
    pub event_capacity: usize,

    /// Initial transport control flags (default: none)
    pub transport_flags: TransportControlFlags,
}

impl PlaybackConfig {
    pub fn skip_back_threshold(&self) -> Duration {
        Duration::from_millis(self.skip_back_threshold_ms)
    }

    /// Reject values the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(PlaybackError::InvalidConfig(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            skip_back_threshold_ms: 2000,
            auto_advance: true,
            event_capacity: 64,
            transport_flags: TransportControlFlags::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlaybackConfig::default();
        assert_eq!(config.skip_back_threshold(), Duration::from_secs(2));
        assert!(config.auto_advance);
        assert_eq!(config.event_capacity, 64);
        assert_eq!(config.transport_flags, TransportControlFlags::empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = PlaybackConfig {
            event_capacity: 0,
            ..PlaybackConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PlaybackError::InvalidConfig(_))
        ));
    }

    #[test]
    fn songs_compare_by_uri_only() {
        let a = Song::new("file:///music/a.mp3").with_title("A");
        let renamed = Song::new("file:///music/a.mp3").with_title("Another title");
        let b = Song::new("file:///music/b.mp3").with_title("A");

        assert_eq!(a, renamed);
        assert_ne!(a, b);
    }

    #[test]
    fn song_display_prefers_metadata() {
        let bare = Song::new("file:///music/a.mp3");
        assert_eq!(bare.to_string(), "file:///music/a.mp3");

        let titled = bare.clone().with_title("Intro");
        assert_eq!(titled.to_string(), "Intro");

        let full = titled.with_artist("Band");
        assert_eq!(full.to_string(), "Band - Intro");
    }

    #[test]
    fn loaded_states() {
        assert!(!TransportState::Idle.has_source());
        assert!(!TransportState::Error.has_source());
        assert!(!TransportState::End.has_source());
        assert!(TransportState::Preparing.has_source());
        assert!(TransportState::Stopped.has_source());
        assert!(TransportState::PlaybackCompleted.has_source());
    }

    #[test]
    fn transport_flags_combine() {
        let flags = TransportControlFlags::PLAY_PAUSE | TransportControlFlags::NEXT;
        assert!(flags.contains(TransportControlFlags::NEXT));
        assert!(!flags.contains(TransportControlFlags::PREVIOUS));
        assert_eq!(flags.bits(), 8 | 128);
    }
}
