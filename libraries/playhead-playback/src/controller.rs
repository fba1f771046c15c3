//! Playback controller - core orchestration
//!
//! Composes the [`Queue`] and the [`TransportStateMachine`] behind one lock.
//! Every command and every engine event runs to completion under that lock;
//! the notifications it produces are handed to listeners only after the
//! lock is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use crate::{
    engine::{engine_channel, Engine, EngineEvent, EngineEvents, EngineNotifier, Message},
    error::{PlaybackError, Result},
    events::{dispatch, ChannelListener, PlaybackListener, PlayerEvent},
    queue::{Advance, Queue},
    transport::{EventOutcome, TransportStateMachine},
    types::{FinishReason, PlaybackConfig, Song, TransportControlFlags, TransportState},
};

/// How long the event loop waits before re-checking for release
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Command surface exposed to clients
///
/// Invalid requests (pausing while stopped, skipping out of range, ...)
/// return `false` and change nothing.
pub trait Player: Send + Sync {
    /// Start or resume the loaded song
    fn play(&self) -> bool;

    /// Seek the loaded song to `start`, then play
    fn play_from(&self, start: Duration) -> bool;

    /// Put `song` in the now-playing slot and play it from the beginning
    fn play_song(&self, song: Song) -> bool;

    /// Put `song` in the now-playing slot and play it from `start`
    fn play_song_from(&self, song: Song, start: Duration) -> bool;

    fn pause(&self) -> bool;

    fn stop(&self) -> bool;

    fn seek_to(&self, position: Duration) -> bool;

    /// Append to the queue, returning the position relative to the playhead
    fn enqueue(&self, song: Song) -> usize;

    /// Move `position` entries from the now-playing one (0 = stay)
    fn skip_to(&self, position: i64) -> bool;

    fn skip(&self);

    fn skip_back(&self);

    fn empty_queue(&self);

    /// Remove the entry at the 1-based absolute `position`
    fn remove_from_queue(&self, position: i64) -> bool;

    fn get_current_position(&self) -> Duration;

    fn get_duration(&self) -> Duration;

    fn now_playing(&self) -> Option<Song>;

    fn is_playing(&self) -> bool;

    fn is_loading(&self) -> bool;

    fn get_state(&self) -> TransportState;

    fn get_queue_length(&self) -> usize;

    /// Entries at least partially behind the playhead
    fn get_queue_position(&self) -> usize;

    fn set_transport_control_flags(&self, flags: TransportControlFlags);
}

/// Central playback control
///
/// Cheap to clone; clones share the same queue, transport and listeners.
#[derive(Clone)]
pub struct PlaybackController {
    shared: Arc<Shared>,
}

struct Shared {
    core: Mutex<Core>,
    events: EngineEvents,
    event_loop_running: AtomicBool,
}

/// State guarded by the controller lock
struct Core {
    queue: Queue,
    transport: TransportStateMachine,
    config: PlaybackConfig,
    transport_flags: TransportControlFlags,
    listeners: Vec<Arc<dyn PlaybackListener>>,
    pending_events: Vec<PlayerEvent>,
}

impl PlaybackController {
    /// Create a controller around an engine that is already wired to `events`
    pub fn new(
        engine: Box<dyn Engine>,
        events: EngineEvents,
        config: PlaybackConfig,
    ) -> Result<Self> {
        config.validate()?;

        let core = Core {
            queue: Queue::new(),
            transport: TransportStateMachine::new(engine),
            transport_flags: config.transport_flags,
            config,
            listeners: Vec::new(),
            pending_events: Vec::new(),
        };

        Ok(Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                events,
                event_loop_running: AtomicBool::new(false),
            }),
        })
    }

    /// Create the event channel from `config`, then the engine, then the controller
    pub fn with_engine<E, F>(config: PlaybackConfig, build_engine: F) -> Result<Self>
    where
        E: Engine + 'static,
        F: FnOnce(EngineNotifier) -> E,
    {
        config.validate()?;
        let (notifier, events) = engine_channel(config.event_capacity);
        let engine = build_engine(notifier);
        Self::new(Box::new(engine), events, config)
    }

    // ===== Listeners =====

    pub fn add_listener(&self, listener: Arc<dyn PlaybackListener>) {
        self.lock().listeners.push(listener);
    }

    pub fn clear_listeners(&self) {
        self.lock().listeners.clear();
    }

    /// Receive every future notification on a channel
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        let (listener, rx) = ChannelListener::new();
        self.add_listener(Arc::new(listener));
        rx
    }

    // ===== Engine events =====

    /// Apply every engine event waiting in the channel
    ///
    /// Returns the number of engine events handled. Does nothing while the
    /// event loop thread owns the channel.
    pub fn process_events(&self) -> usize {
        let mut handled = 0;
        loop {
            // Checked per event: a listener may spawn the loop mid-drain
            let progressed = self.with_core(|core| {
                if self.shared.event_loop_running.load(Ordering::Acquire) {
                    return false;
                }
                match self.shared.events.try_next() {
                    Some(Message::Engine(event)) => {
                        core.on_engine_event(event);
                        true
                    }
                    Some(Message::Shutdown) => true,
                    None => false,
                }
            });
            if !progressed {
                return handled;
            }
            handled += 1;
        }
    }

    /// Consume engine events on a dedicated thread
    ///
    /// The thread ends once the controller is released or every handle to
    /// it has been dropped.
    pub fn spawn_event_loop(&self) -> Result<JoinHandle<()>> {
        {
            let core = self.lock();
            if core.transport.state() == TransportState::End {
                return Err(PlaybackError::Released);
            }
            if self.shared.event_loop_running.swap(true, Ordering::AcqRel) {
                return Err(PlaybackError::EventLoopRunning);
            }
        }

        let weak = Arc::downgrade(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("playhead-events".to_string())
            .spawn(move || Self::run_event_loop(&weak));

        match spawned {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.shared.event_loop_running.store(false, Ordering::Release);
                Err(PlaybackError::Io(e))
            }
        }
    }

    fn run_event_loop(weak: &Weak<Shared>) {
        debug!("Event loop started");
        while let Some(shared) = weak.upgrade() {
            let controller = Self { shared };
            match controller.shared.events.next_timeout(EVENT_POLL_INTERVAL) {
                Some(Message::Engine(event)) => {
                    controller.with_core(|core| core.on_engine_event(event));
                }
                Some(Message::Shutdown) => {
                    controller
                        .shared
                        .event_loop_running
                        .store(false, Ordering::Release);
                    break;
                }
                None => {
                    if controller.is_released() {
                        controller
                            .shared
                            .event_loop_running
                            .store(false, Ordering::Release);
                        break;
                    }
                }
            }
        }
        debug!("Event loop stopped");
    }

    // ===== Lifecycle =====

    /// Release the engine; every later transport command fails
    ///
    /// Returns `false` if the controller was already released.
    pub fn release(&self) -> bool {
        let released = self.with_core(|core| {
            info!("Releasing playback controller");
            core.transport.release()
        });
        if released {
            self.shared.events.request_shutdown();
        }
        released
    }

    pub fn is_released(&self) -> bool {
        self.lock().transport.state() == TransportState::End
    }

    // ===== Extra queries =====

    pub fn is_paused(&self) -> bool {
        self.lock().transport.is_paused()
    }

    pub fn get_transport_control_flags(&self) -> TransportControlFlags {
        self.lock().transport_flags
    }

    /// Copy of the whole queue, in order
    pub fn queue_snapshot(&self) -> Vec<Song> {
        self.lock().queue.songs().to_vec()
    }

    /// Absolute index of the now-playing entry
    pub fn current_index(&self) -> Option<usize> {
        self.lock().queue.current_index()
    }

    pub fn config(&self) -> PlaybackConfig {
        self.lock().config.clone()
    }

    // ===== Internal =====

    fn lock(&self) -> MutexGuard<'_, Core> {
        self.shared
            .core
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` under the lock, then notify listeners with the lock released
    fn with_core<R>(&self, f: impl FnOnce(&mut Core) -> R) -> R {
        let (result, events, listeners) = {
            let mut core = self.lock();
            let result = f(&mut core);
            let events = core.take_events();
            let listeners = if events.is_empty() {
                Vec::new()
            } else {
                core.listeners.clone()
            };
            (result, events, listeners)
        };

        for event in &events {
            for listener in &listeners {
                dispatch(listener.as_ref(), event);
            }
        }

        result
    }
}

impl Player for PlaybackController {
    fn play(&self) -> bool {
        self.with_core(|core| core.transport.play())
    }

    fn play_from(&self, start: Duration) -> bool {
        self.with_core(|core| core.transport.play_from(start))
    }

    fn play_song(&self, song: Song) -> bool {
        self.with_core(|core| core.play_song(song, None))
    }

    fn play_song_from(&self, song: Song, start: Duration) -> bool {
        self.with_core(|core| core.play_song(song, Some(start)))
    }

    fn pause(&self) -> bool {
        self.with_core(|core| core.transport.pause())
    }

    fn stop(&self) -> bool {
        self.with_core(|core| core.transport.stop())
    }

    fn seek_to(&self, position: Duration) -> bool {
        self.with_core(|core| core.transport.seek_to(position))
    }

    fn enqueue(&self, song: Song) -> usize {
        self.with_core(|core| core.enqueue(song))
    }

    fn skip_to(&self, position: i64) -> bool {
        self.with_core(|core| core.skip_to(position))
    }

    fn skip(&self) {
        self.with_core(Core::skip);
    }

    fn skip_back(&self) {
        self.with_core(Core::skip_back);
    }

    fn empty_queue(&self) {
        self.with_core(Core::empty_queue);
    }

    fn remove_from_queue(&self, position: i64) -> bool {
        self.with_core(|core| core.remove_from_queue(position))
    }

    fn get_current_position(&self) -> Duration {
        self.lock().transport.current_position()
    }

    fn get_duration(&self) -> Duration {
        self.lock().transport.duration()
    }

    fn now_playing(&self) -> Option<Song> {
        self.lock().queue.now_playing().cloned()
    }

    fn is_playing(&self) -> bool {
        self.lock().transport.is_playing()
    }

    fn is_loading(&self) -> bool {
        self.lock().transport.is_loading()
    }

    fn get_state(&self) -> TransportState {
        self.lock().transport.state()
    }

    fn get_queue_length(&self) -> usize {
        self.lock().queue.len()
    }

    fn get_queue_position(&self) -> usize {
        self.lock().queue_position()
    }

    fn set_transport_control_flags(&self, flags: TransportControlFlags) {
        self.lock().transport_flags = flags;
    }
}

impl Core {
    fn play_song(&mut self, song: Song, start: Option<Duration>) -> bool {
        if self.transport.state() == TransportState::End {
            return false;
        }

        info!("Playing {}", song);
        if self.queue.replace_current(song.clone()) {
            self.emit_queue_changed();
        }
        self.transport.load(song, true, start)
    }

    fn enqueue(&mut self, song: Song) -> usize {
        let was_empty = self.queue.is_empty();
        debug!("Enqueueing {}", song);
        let position = self.queue.enqueue(song.clone());
        self.emit_queue_changed();

        if was_empty {
            self.transport.load(song, false, None);
        }
        position
    }

    fn skip(&mut self) {
        if self.transport.state() == TransportState::End {
            return;
        }
        let Some(previous) = self.queue.now_playing().cloned() else {
            return;
        };

        let resume = self.transport.will_play();
        self.emit_finished(FinishReason::SkipButton, Some(previous));

        match self.queue.advance() {
            Some(Advance::Wrapped) => {
                info!("Skipped past the last track, stopping at the first one");
                self.load_current(false);
                self.transport.force_stop();
            }
            Some(Advance::Moved(index)) => {
                debug!("Skipped to index {}", index);
                self.load_current(resume);
            }
            None => {}
        }
    }

    fn skip_back(&mut self) {
        if self.transport.state() == TransportState::End {
            return;
        }

        let playhead = self.transport.current_position();
        let resume = self.transport.will_play();
        let threshold = self.config.skip_back_threshold();
        let Some(retreat) = self.queue.retreat(playhead, threshold) else {
            return;
        };

        if !retreat.changed
            && self.transport.loaded_song() == self.queue.now_playing()
            && self.transport.seek_to(Duration::ZERO)
        {
            debug!("Restarting current track");
            return;
        }

        debug!("Skipped back to index {}", retreat.index);
        self.load_current(resume);
    }

    fn skip_to(&mut self, position: i64) -> bool {
        let previous_index = self.queue.current_index();
        let previous = self.queue.now_playing().cloned();

        if !self.queue.skip_to(position) {
            debug!("Rejected skip to relative position {}", position);
            return false;
        }
        if self.queue.current_index() == previous_index
            || self.transport.state() == TransportState::End
        {
            return true;
        }

        let resume = self.transport.will_play();
        self.emit_finished(FinishReason::SkipButton, previous);
        self.load_current(resume);
        true
    }

    fn empty_queue(&mut self) {
        let preserve_current = self.transport.is_playing() || self.transport.is_paused();
        self.queue.empty(preserve_current);
        self.emit_queue_changed();

        if !preserve_current {
            self.transport.reset();
        }
    }

    fn remove_from_queue(&mut self, position: i64) -> bool {
        let Some(removal) = self.queue.remove(position) else {
            debug!("Rejected removal of position {}", position);
            return false;
        };
        debug!("Removed {} from index {}", removal.song, removal.index);
        self.emit_queue_changed();

        if removal.was_current {
            if self.queue.is_empty() {
                self.transport.reset();
            } else {
                let resume = self.transport.will_play();
                self.load_current(resume);
            }
        }
        true
    }

    fn queue_position(&self) -> usize {
        let consumed = matches!(
            self.transport.state(),
            TransportState::Started | TransportState::Paused | TransportState::PlaybackCompleted
        ) || !self.transport.current_position().is_zero();

        self.queue.queue_position(consumed)
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        let song = self.transport.loaded_song().cloned();

        match self.transport.handle_event(event) {
            EventOutcome::Stale | EventOutcome::Ignored | EventOutcome::Prepared => {}
            EventOutcome::Completed => {
                self.emit_finished(FinishReason::SongEnd, song);
                if self.config.auto_advance && !self.queue.is_at_end() {
                    if let Some(Advance::Moved(index)) = self.queue.advance() {
                        debug!("Advancing to index {}", index);
                        self.load_current(true);
                    }
                }
            }
            EventOutcome::Failed(cause) => {
                warn!("Playback failed: {}", cause);
                self.emit_finished(FinishReason::Error, song);
            }
        }
    }

    /// Load the cursor entry, or go idle when the queue is empty
    fn load_current(&mut self, autostart: bool) -> bool {
        match self.queue.now_playing().cloned() {
            Some(song) => self.transport.load(song, autostart, None),
            None => {
                self.transport.reset();
                false
            }
        }
    }

    // ===== Event emission =====

    fn flush_transitions(&mut self) {
        for state in self.transport.take_transitions() {
            self.pending_events.push(PlayerEvent::StateChanged { state });
        }
    }

    fn emit(&mut self, event: PlayerEvent) {
        self.flush_transitions();
        self.pending_events.push(event);
    }

    fn emit_finished(&mut self, reason: FinishReason, song: Option<Song>) {
        self.emit(PlayerEvent::SongFinished { reason, song });
    }

    fn emit_queue_changed(&mut self) {
        let length = self.queue.len();
        self.emit(PlayerEvent::QueueChanged { length });
    }

    fn take_events(&mut self) -> Vec<PlayerEvent> {
        self.flush_transitions();
        std::mem::take(&mut self.pending_events)
    }
}
