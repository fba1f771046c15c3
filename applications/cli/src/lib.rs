//! Playhead CLI - terminal front end for the playback controller

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod listener;
pub mod session;

pub use config::CliConfig;
pub use engine::SimulatedEngine;
pub use error::{CliError, Result};
pub use listener::LoggingListener;
