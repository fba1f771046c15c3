//! Playhead-relative play queue
//!
//! An ordered list of songs plus a cursor on the "now playing" entry:
//!
//! ```text
//!   index:   0        1        2        3        4
//!          [ A ]    [ B ]    [ C ]    [ D ]    [ E ]
//!          played   played   cursor   upcoming upcoming
//! ```
//!
//! Positions returned by [`Queue::enqueue`] and accepted by
//! [`Queue::skip_to`] are relative to the cursor. Positions accepted by
//! [`Queue::remove`] are 1-based absolute indices.

use std::time::Duration;

use crate::types::Song;

/// Result of moving the cursor forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Cursor moved to the given index
    Moved(usize),

    /// Cursor was on the last entry and wrapped to index 0
    Wrapped,
}

/// Result of moving the cursor backward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retreat {
    /// Cursor index after the move
    pub index: usize,

    /// Whether the cursor now points at a different entry
    pub changed: bool,
}

/// Entry taken out of the queue by [`Queue::remove`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Absolute 0-based index the song occupied
    pub index: usize,

    /// The removed song
    pub song: Song,

    /// Whether the removed entry was the cursor entry
    pub was_current: bool,
}

/// Ordered songs plus a playhead cursor
///
/// Invariant: `cursor < songs.len()` whenever the queue is non-empty.
/// `cursor` is 0 and meaningless while the queue is empty.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    songs: Vec<Song>,
    cursor: usize,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a song
    ///
    /// Returns its position relative to the cursor: 0 if it became the
    /// cursor entry (queue was empty), 1 if it plays next, and so on.
    pub fn enqueue(&mut self, song: Song) -> usize {
        if self.songs.is_empty() {
            self.songs.push(song);
            self.cursor = 0;
            return 0;
        }

        self.songs.push(song);
        self.songs.len() - 1 - self.cursor
    }

    /// Put `song` in the cursor slot
    ///
    /// An empty queue gets it as its only entry. Returns `false` when the
    /// cursor entry already was `song`.
    pub fn replace_current(&mut self, song: Song) -> bool {
        if self.songs.is_empty() {
            self.songs.push(song);
            self.cursor = 0;
            return true;
        }

        if self.songs[self.cursor] == song {
            return false;
        }

        self.songs[self.cursor] = song;
        true
    }

    /// Move the cursor `position` entries away from where it is
    ///
    /// `0` means stay. Fails without touching anything when the target
    /// falls outside the queue.
    pub fn skip_to(&mut self, position: i64) -> bool {
        let Some(target) = self.relative_index(position) else {
            return false;
        };

        self.cursor = target;
        true
    }

    /// Move the cursor to the next entry, wrapping after the last one
    ///
    /// Returns `None` on an empty queue.
    pub fn advance(&mut self) -> Option<Advance> {
        if self.songs.is_empty() {
            return None;
        }

        if self.cursor + 1 >= self.songs.len() {
            self.cursor = 0;
            Some(Advance::Wrapped)
        } else {
            self.cursor += 1;
            Some(Advance::Moved(self.cursor))
        }
    }

    /// Move the cursor back one entry if the playhead is still near the start
    ///
    /// On the first entry, or once `playhead` reached `threshold`, the cursor
    /// stays where it is so the current track can restart.
    /// Returns `None` on an empty queue.
    pub fn retreat(&mut self, playhead: Duration, threshold: Duration) -> Option<Retreat> {
        if self.songs.is_empty() {
            return None;
        }

        if self.cursor > 0 && playhead < threshold {
            self.cursor -= 1;
            return Some(Retreat {
                index: self.cursor,
                changed: true,
            });
        }

        Some(Retreat {
            index: self.cursor,
            changed: false,
        })
    }

    /// Drop entries
    ///
    /// With `preserve_current` only the cursor entry survives and becomes
    /// index 0; otherwise the queue is cleared.
    pub fn empty(&mut self, preserve_current: bool) {
        if preserve_current && !self.songs.is_empty() {
            let current = self.songs.swap_remove(self.cursor);
            self.songs.clear();
            self.songs.push(current);
        } else {
            self.songs.clear();
        }
        self.cursor = 0;
    }

    /// Remove the entry at the 1-based absolute `position`
    ///
    /// The cursor keeps pointing at the same song when an earlier entry goes.
    /// When the cursor entry itself goes, the cursor stays numerically put
    /// (now on the following song) or clamps to the new last entry.
    pub fn remove(&mut self, position: i64) -> Option<Removal> {
        if position < 1 {
            return None;
        }
        let index = usize::try_from(position - 1).ok()?;
        if index >= self.songs.len() {
            return None;
        }

        let was_current = index == self.cursor;
        let song = self.songs.remove(index);

        if index < self.cursor {
            self.cursor -= 1;
        } else if was_current && self.cursor >= self.songs.len() {
            self.cursor = self.songs.len().saturating_sub(1);
        }

        Some(Removal {
            index,
            song,
            was_current,
        })
    }

    /// Number of queued songs
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Cursor entry
    pub fn now_playing(&self) -> Option<&Song> {
        self.songs.get(self.cursor)
    }

    /// Cursor index, `None` on an empty queue
    pub fn current_index(&self) -> Option<usize> {
        if self.songs.is_empty() {
            None
        } else {
            Some(self.cursor)
        }
    }

    /// Whether the cursor sits on the last entry
    pub fn is_at_end(&self) -> bool {
        !self.songs.is_empty() && self.cursor + 1 == self.songs.len()
    }

    /// Number of entries at least partially behind the playhead
    ///
    /// `current_counted` tells whether playback has begun consuming the
    /// cursor entry.
    pub fn queue_position(&self, current_counted: bool) -> usize {
        if self.songs.is_empty() {
            return 0;
        }
        self.cursor + usize::from(current_counted)
    }

    /// Song at absolute 0-based index
    pub fn get(&self, index: usize) -> Option<&Song> {
        self.songs.get(index)
    }

    /// All songs in queue order
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    fn relative_index(&self, position: i64) -> Option<usize> {
        if self.songs.is_empty() {
            return None;
        }
        let cursor = i64::try_from(self.cursor).ok()?;
        let target = usize::try_from(cursor.checked_add(position)?).ok()?;
        (target < self.songs.len()).then_some(target)
    }
}
