//! Property-based tests for queue and controller
//!
//! Uses proptest to verify invariants across many random inputs.

mod common;

use playhead_playback::{Player, Queue, Song, TransportState};
use proptest::prelude::*;
use std::time::Duration;

// ===== Helpers =====

#[derive(Debug, Clone)]
enum QueueOp {
    Enqueue(String),
    ReplaceCurrent(String),
    SkipTo(i64),
    Advance,
    Retreat(u64),
    Empty(bool),
    Remove(i64),
}

fn arbitrary_song_id() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}"
}

fn arbitrary_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        4 => arbitrary_song_id().prop_map(QueueOp::Enqueue),
        1 => arbitrary_song_id().prop_map(QueueOp::ReplaceCurrent),
        2 => (-6i64..6).prop_map(QueueOp::SkipTo),
        2 => Just(QueueOp::Advance),
        2 => (0u64..5000).prop_map(QueueOp::Retreat),
        1 => any::<bool>().prop_map(QueueOp::Empty),
        2 => (-2i64..12).prop_map(QueueOp::Remove),
    ]
}

fn apply(queue: &mut Queue, op: &QueueOp) {
    let threshold = Duration::from_millis(2000);
    match op {
        QueueOp::Enqueue(id) => {
            queue.enqueue(common::song(id));
        }
        QueueOp::ReplaceCurrent(id) => {
            queue.replace_current(common::song(id));
        }
        QueueOp::SkipTo(position) => {
            queue.skip_to(*position);
        }
        QueueOp::Advance => {
            queue.advance();
        }
        QueueOp::Retreat(ms) => {
            queue.retreat(Duration::from_millis(*ms), threshold);
        }
        QueueOp::Empty(preserve) => queue.empty(*preserve),
        QueueOp::Remove(position) => {
            queue.remove(*position);
        }
    }
}

fn queue_of(len: usize) -> Queue {
    let mut queue = Queue::new();
    for i in 0..len {
        queue.enqueue(common::song(&format!("s{}", i)));
    }
    queue
}

// ===== Property Tests =====

proptest! {
    /// Property: enqueue on an empty queue returns 0, then N-1 for the Nth song
    #[test]
    fn enqueue_returns_sequential_positions(count in 1usize..60) {
        let mut queue = Queue::new();
        for n in 1..=count {
            prop_assert_eq!(queue.enqueue(common::song(&format!("s{}", n))), n - 1);
        }
        prop_assert_eq!(queue.len(), count);
        prop_assert_eq!(queue.current_index(), Some(0));
    }

    /// Property: the cursor always points inside a non-empty queue
    #[test]
    fn cursor_stays_in_bounds(ops in prop::collection::vec(arbitrary_op(), 0..80)) {
        let mut queue = Queue::new();
        for op in &ops {
            apply(&mut queue, op);
            match queue.current_index() {
                Some(index) => {
                    prop_assert!(index < queue.len());
                    prop_assert!(queue.now_playing().is_some());
                }
                None => {
                    prop_assert!(queue.is_empty());
                    prop_assert!(queue.now_playing().is_none());
                }
            }
        }
    }

    /// Property: skipping by zero always succeeds and never moves
    #[test]
    fn skip_to_zero_is_identity(len in 1usize..30, cursor in 0usize..30) {
        let mut queue = queue_of(len);
        let cursor = cursor % len;
        prop_assert!(queue.skip_to(i64::try_from(cursor).unwrap()));
        let before = queue.now_playing().cloned();

        prop_assert!(queue.skip_to(0));
        prop_assert_eq!(queue.now_playing().cloned(), before);
    }

    /// Property: out-of-range removal is rejected without mutation
    #[test]
    fn remove_out_of_range_is_rejected(len in 0usize..20, beyond in 1i64..20, below in 0i64..20) {
        let mut queue = queue_of(len);
        let snapshot: Vec<Song> = queue.songs().to_vec();
        let length = i64::try_from(len).unwrap();

        prop_assert!(queue.remove(length + beyond).is_none());
        prop_assert!(queue.remove(-below).is_none());
        prop_assert_eq!(queue.songs(), snapshot.as_slice());
    }

    /// Property: removing an entry before the cursor keeps the same song playing
    #[test]
    fn remove_before_cursor_keeps_song(len in 2usize..20, cursor in 1usize..20, victim in 0usize..20) {
        let mut queue = queue_of(len);
        let cursor = 1 + cursor % (len - 1);
        let victim = victim % cursor;
        queue.skip_to(i64::try_from(cursor).unwrap());
        let playing = queue.now_playing().cloned();

        let removal = queue.remove(i64::try_from(victim + 1).unwrap()).unwrap();
        prop_assert!(!removal.was_current);
        prop_assert_eq!(queue.now_playing().cloned(), playing);
        prop_assert_eq!(queue.current_index(), Some(cursor - 1));
    }

    /// Property: queue position never exceeds the queue length
    #[test]
    fn queue_position_is_bounded(ops in prop::collection::vec(arbitrary_op(), 0..40), counted in any::<bool>()) {
        let mut queue = Queue::new();
        for op in &ops {
            apply(&mut queue, op);
        }
        prop_assert!(queue.queue_position(counted) <= queue.len());
    }
}

// ===== Controller properties =====

#[derive(Debug, Clone)]
enum Command {
    Enqueue(String),
    Play,
    Pause,
    Stop,
    Skip,
    SkipBack(u64),
    SkipTo(i64),
    Remove(i64),
    Empty,
    Complete,
}

fn arbitrary_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        4 => arbitrary_song_id().prop_map(Command::Enqueue),
        2 => Just(Command::Play),
        1 => Just(Command::Pause),
        1 => Just(Command::Stop),
        2 => Just(Command::Skip),
        1 => (0u64..4000).prop_map(Command::SkipBack),
        1 => (-4i64..4).prop_map(Command::SkipTo),
        1 => (-1i64..8).prop_map(Command::Remove),
        1 => Just(Command::Empty),
        1 => Just(Command::Complete),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: no command sequence breaks the controller's view of the queue
    #[test]
    fn controller_stays_consistent(commands in prop::collection::vec(arbitrary_command(), 1..40)) {
        let (controller, engine) = common::controller();

        for command in &commands {
            match command {
                Command::Enqueue(id) => {
                    controller.enqueue(common::song(id));
                }
                Command::Play => {
                    controller.play();
                }
                Command::Pause => {
                    controller.pause();
                }
                Command::Stop => {
                    controller.stop();
                }
                Command::Skip => controller.skip(),
                Command::SkipBack(ms) => {
                    engine.set_position(Duration::from_millis(*ms));
                    controller.skip_back();
                }
                Command::SkipTo(position) => {
                    controller.skip_to(*position);
                }
                Command::Remove(position) => {
                    controller.remove_from_queue(*position);
                }
                Command::Empty => controller.empty_queue(),
                Command::Complete => {
                    if controller.is_playing() {
                        engine.complete();
                    }
                }
            }
            controller.process_events();

            let length = controller.get_queue_length();
            match controller.current_index() {
                Some(index) => prop_assert!(index < length),
                None => {
                    prop_assert_eq!(length, 0);
                    prop_assert!(!controller.is_playing());
                }
            }
            if controller.is_playing() {
                prop_assert!(controller.now_playing().is_some());
            }
            prop_assert!(controller.get_queue_position() <= length);
            prop_assert_ne!(controller.get_state(), TransportState::End);
        }
    }
}
