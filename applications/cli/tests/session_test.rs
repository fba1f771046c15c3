//! Drive the terminal session against the simulated engine

use playhead_cli::commands::{execute, parse_command, Outcome};
use playhead_cli::config::SimulatedEngineSettings;
use playhead_cli::{session, SimulatedEngine};
use playhead_playback::{PlaybackConfig, PlaybackController, Player, TransportState};
use std::io::Cursor;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

fn start_controller() -> (PlaybackController, JoinHandle<()>) {
    let settings = SimulatedEngineSettings {
        prepare_delay_ms: 0,
        ..SimulatedEngineSettings::default()
    };
    let controller = PlaybackController::with_engine(PlaybackConfig::default(), |notifier| {
        SimulatedEngine::new(settings, notifier)
    })
    .unwrap();
    let event_loop = controller.spawn_event_loop().unwrap();
    (controller, event_loop)
}

fn shutdown(controller: &PlaybackController, event_loop: JoinHandle<()>) {
    assert!(controller.release());
    event_loop.join().unwrap();
}

fn wait_for_state(controller: &PlaybackController, state: TransportState) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if controller.get_state() == state {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn run_line(controller: &PlaybackController, line: &str) -> String {
    let command = parse_command(line).unwrap().unwrap();
    match execute(controller, command) {
        Outcome::Continue(message) => message,
        Outcome::Quit => panic!("unexpected quit"),
    }
}

#[test]
fn script_stops_at_quit_and_reports_errors() {
    let (controller, event_loop) = start_controller();
    let script = "\
enqueue file:///music/a.mp3 Alpha
enqueue file:///music/b.mp3 Beta

rewind
quit
enqueue file:///music/c.mp3 Gamma
";
    let mut output = Vec::new();

    session::run(&controller, Cursor::new(script), &mut output).unwrap();

    let output = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(
        lines,
        vec![
            "queued Alpha at +0",
            "queued Beta at +1",
            "error: Unknown command: rewind",
        ]
    );
    assert_eq!(controller.get_queue_length(), 2);
    shutdown(&controller, event_loop);
}

#[test]
fn play_skip_and_status() {
    let (controller, event_loop) = start_controller();

    run_line(&controller, "enqueue file:///music/a.mp3 Alpha");
    run_line(&controller, "enqueue https://example.com/b.mp3 Beta");
    assert!(wait_for_state(&controller, TransportState::Prepared));

    assert_eq!(run_line(&controller, "play"), "ok");
    assert!(controller.is_playing());

    run_line(&controller, "skip");
    assert!(wait_for_state(&controller, TransportState::Started));
    assert_eq!(controller.now_playing().unwrap().title(), Some("Beta"));

    let status = run_line(&controller, "status");
    assert!(status.starts_with("started | Beta |"), "{}", status);
    assert!(status.ends_with("queue 2/2"), "{}", status);

    let listing = run_line(&controller, "queue");
    assert_eq!(listing, "    1. Alpha\n>   2. Beta");

    shutdown(&controller, event_loop);
}

#[test]
fn unsupported_scheme_is_refused() {
    let (controller, event_loop) = start_controller();

    assert_eq!(
        run_line(&controller, "play ftp://example.com/c.mp3"),
        "play not possible now"
    );
    assert_eq!(controller.get_state(), TransportState::Error);

    shutdown(&controller, event_loop);
}

#[test]
fn pause_keeps_position() {
    let (controller, event_loop) = start_controller();

    run_line(&controller, "enqueue file:///music/a.mp3 Alpha");
    assert!(wait_for_state(&controller, TransportState::Prepared));
    run_line(&controller, "seek 12000");
    run_line(&controller, "play");
    assert_eq!(run_line(&controller, "pause"), "ok");

    let position = controller.get_current_position();
    assert!(position >= Duration::from_secs(12));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(controller.get_current_position(), position);

    shutdown(&controller, event_loop);
}
