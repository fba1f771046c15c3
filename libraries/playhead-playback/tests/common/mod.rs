//! Shared helpers for playback integration tests

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use playhead_playback::{
    engine_channel, Engine, EngineNotifier, FinishReason, Generation, PlaybackConfig,
    PlaybackController, PlaybackError, PlayerEvent, Result, Song, TransportState,
};
use std::sync::{Arc, Mutex, MutexGuard, Once};
use std::time::Duration;

static INIT: Once = Once::new();

/// Install a test subscriber once per test binary
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Songs whose URI starts with this are rejected by the fake engine
pub const REJECTED_SCHEME: &str = "bogus://";

pub fn song(id: &str) -> Song {
    Song::new(format!("file:///music/{}.mp3", id)).with_title(id.to_uppercase())
}

/// Engine command as seen by the fake engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Load(String),
    Start,
    Pause,
    Stop,
    Seek(Duration),
    Reset,
    Release,
}

#[derive(Debug, Default)]
struct EngineState {
    calls: Vec<Call>,
    position: Duration,
    duration: Duration,
    last_generation: Option<Generation>,
}

/// Engine that records commands and posts events on demand
///
/// With `auto_prepare` every accepted load posts `Prepared` right away.
struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
    notifier: EngineNotifier,
    auto_prepare: bool,
}

impl FakeEngine {
    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap()
    }
}

impl Engine for FakeEngine {
    fn load(&mut self, song: &Song, generation: Generation) -> Result<()> {
        if song.uri().starts_with(REJECTED_SCHEME) {
            return Err(PlaybackError::UnsupportedSource(song.uri().to_string()));
        }

        {
            let mut state = self.state();
            state.calls.push(Call::Load(song.uri().to_string()));
            state.position = Duration::ZERO;
            state.last_generation = Some(generation);
        }

        if self.auto_prepare {
            self.notifier.prepared(generation)?;
        }
        Ok(())
    }

    fn start(&mut self) {
        self.state().calls.push(Call::Start);
    }

    fn pause(&mut self) {
        self.state().calls.push(Call::Pause);
    }

    fn stop(&mut self) {
        self.state().calls.push(Call::Stop);
    }

    fn seek_to(&mut self, position: Duration) {
        let mut state = self.state();
        state.calls.push(Call::Seek(position));
        state.position = position;
    }

    fn current_position(&self) -> Duration {
        self.state().position
    }

    fn duration(&self) -> Duration {
        self.state().duration
    }

    fn reset(&mut self) {
        let mut state = self.state();
        state.calls.push(Call::Reset);
        state.position = Duration::ZERO;
    }

    fn release(&mut self) {
        self.state().calls.push(Call::Release);
    }
}

/// Test-side view of the fake engine
#[derive(Clone)]
pub struct EngineHandle {
    state: Arc<Mutex<EngineState>>,
    notifier: EngineNotifier,
}

impl EngineHandle {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Load(uri) => Some(uri),
                _ => None,
            })
            .collect()
    }

    /// Pretend the engine played up to `position`
    pub fn set_position(&self, position: Duration) {
        self.state.lock().unwrap().position = position;
    }

    pub fn last_generation(&self) -> Generation {
        self.state
            .lock()
            .unwrap()
            .last_generation
            .expect("engine never loaded anything")
    }

    pub fn prepare(&self) {
        self.notifier.prepared(self.last_generation()).unwrap();
    }

    pub fn complete(&self) {
        self.notifier.completed(self.last_generation()).unwrap();
    }

    pub fn fail(&self, cause: &str) {
        self.notifier.error(self.last_generation(), cause).unwrap();
    }

    pub fn notifier(&self) -> EngineNotifier {
        self.notifier.clone()
    }
}

pub fn controller() -> (PlaybackController, EngineHandle) {
    controller_with(PlaybackConfig::default(), true)
}

/// Controller whose engine waits for `EngineHandle::prepare`
pub fn manual_controller() -> (PlaybackController, EngineHandle) {
    controller_with(PlaybackConfig::default(), false)
}

pub fn controller_with(
    config: PlaybackConfig,
    auto_prepare: bool,
) -> (PlaybackController, EngineHandle) {
    init_tracing();

    let (notifier, events) = engine_channel(config.event_capacity);
    let state = Arc::new(Mutex::new(EngineState {
        duration: Duration::from_secs(180),
        ..EngineState::default()
    }));

    let engine = FakeEngine {
        state: Arc::clone(&state),
        notifier: notifier.clone(),
        auto_prepare,
    };
    let controller = PlaybackController::new(Box::new(engine), events, config).unwrap();

    (controller, EngineHandle { state, notifier })
}

pub fn finish_reasons(rx: &Receiver<PlayerEvent>) -> Vec<FinishReason> {
    rx.try_iter()
        .filter_map(|event| match event {
            PlayerEvent::SongFinished { reason, .. } => Some(reason),
            _ => None,
        })
        .collect()
}

pub fn states(rx: &Receiver<PlayerEvent>) -> Vec<TransportState> {
    rx.try_iter()
        .filter_map(|event| match event {
            PlayerEvent::StateChanged { state } => Some(state),
            _ => None,
        })
        .collect()
}
