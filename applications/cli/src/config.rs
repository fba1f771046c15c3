/// CLI configuration
use crate::error::{CliError, Result};
use playhead_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "playhead.toml";

/// Prefix of environment overrides, e.g. `PLAYHEAD_PLAYBACK__AUTO_ADVANCE=false`
pub const ENV_PREFIX: &str = "PLAYHEAD";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub log: LogSettings,

    #[serde(default)]
    pub engine: SimulatedEngineSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatedEngineSettings {
    /// Time between `load` and the prepared notification
    #[serde(default = "default_prepare_delay_ms")]
    pub prepare_delay_ms: u64,

    /// Track length for songs without a duration hint
    #[serde(default = "default_track_secs")]
    pub default_track_secs: u64,

    /// URI schemes the engine accepts
    #[serde(default = "default_schemes")]
    pub schemes: Vec<String>,
}

impl SimulatedEngineSettings {
    pub fn prepare_delay(&self) -> Duration {
        Duration::from_millis(self.prepare_delay_ms)
    }

    pub fn default_track_duration(&self) -> Duration {
        Duration::from_secs(self.default_track_secs)
    }
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `playhead.toml` in the
    /// working directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (PLAYHEAD_SECTION__KEY)
        // List values are comma separated: PLAYHEAD_ENGINE__SCHEMES=file,https
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("engine.schemes")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.playback.validate()?;

        if self.engine.schemes.is_empty() {
            return Err(CliError::Config(
                "engine.schemes must name at least one URI scheme".to_string(),
            ));
        }

        if self.engine.default_track_secs == 0 {
            return Err(CliError::Config(
                "engine.default_track_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SimulatedEngineSettings {
    fn default() -> Self {
        Self {
            prepare_delay_ms: default_prepare_delay_ms(),
            default_track_secs: default_track_secs(),
            schemes: default_schemes(),
        }
    }
}

// Default values
fn default_log_level() -> String {
    "playhead_playback=info,playhead_cli=info".to_string()
}

fn default_prepare_delay_ms() -> u64 {
    150
}

fn default_track_secs() -> u64 {
    30
}

fn default_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string(), "file".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = CliConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.playback.skip_back_threshold_ms, 2000);
        assert_eq!(config.engine.prepare_delay(), Duration::from_millis(150));
        assert_eq!(config.log.level, "playhead_playback=info,playhead_cli=info");
    }

    #[test]
    #[serial]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[playback]
skip_back_threshold_ms = 3500
auto_advance = false

[engine]
prepare_delay_ms = 10
schemes = ["file"]
"#
        )
        .unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.playback.skip_back_threshold_ms, 3500);
        assert!(!config.playback.auto_advance);
        assert_eq!(config.playback.event_capacity, 64);
        assert_eq!(config.engine.prepare_delay_ms, 10);
        assert_eq!(config.engine.schemes, vec!["file".to_string()]);
        assert_eq!(config.engine.default_track_secs, 30);
    }

    #[test]
    #[serial]
    fn missing_explicit_file_is_an_error() {
        let result = CliConfig::load(Some(Path::new("/nonexistent/playhead.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn zero_event_capacity_is_rejected() {
        let mut config = CliConfig::default();
        config.playback.event_capacity = 0;
        assert!(matches!(config.validate(), Err(CliError::Playback(_))));
    }

    #[test]
    fn empty_scheme_list_is_rejected() {
        let mut config = CliConfig::default();
        config.engine.schemes.clear();
        assert!(matches!(config.validate(), Err(CliError::Config(_))));
    }

    #[test]
    #[serial]
    fn environment_overrides_single_value() {
        env::set_var("PLAYHEAD_PLAYBACK__SKIP_BACK_THRESHOLD_MS", "3500");

        let result = CliConfig::load(None);
        env::remove_var("PLAYHEAD_PLAYBACK__SKIP_BACK_THRESHOLD_MS");

        let config = result.unwrap();
        assert_eq!(config.playback.skip_back_threshold_ms, 3500);
        assert_eq!(config.engine.schemes, default_schemes());
    }

    #[test]
    #[serial]
    fn environment_overrides_scheme_list() {
        env::set_var("PLAYHEAD_ENGINE__SCHEMES", "file");
        let single = CliConfig::load(None);
        env::set_var("PLAYHEAD_ENGINE__SCHEMES", "file,https");
        let several = CliConfig::load(None);
        env::remove_var("PLAYHEAD_ENGINE__SCHEMES");

        assert_eq!(single.unwrap().engine.schemes, vec!["file".to_string()]);
        assert_eq!(
            several.unwrap().engine.schemes,
            vec!["file".to_string(), "https".to_string()]
        );
    }
}
