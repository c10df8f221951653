//! Game configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Tunable rules and timers for a game session.
///
/// Every field has a default, so an empty TOML file is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct GameConfig {
    /// Guns each player starts with.
    #[serde(default = "default_starting_guns")]
    starting_guns: u32,

    /// Fewest players the host may start with.
    #[serde(default = "default_min_players")]
    min_players: usize,

    /// Seconds the crew has to commit guns to a mutiny.
    #[serde(default = "default_mutiny_timeout_secs")]
    mutiny_timeout_secs: u64,

    /// Seconds for each navigation stage (proposals, then the commit).
    #[serde(default = "default_navigation_timeout_secs")]
    navigation_timeout_secs: u64,

    /// Seconds the captain has to pick and confirm a team.
    #[serde(default = "default_selection_timeout_secs")]
    selection_timeout_secs: u64,

    /// Seconds of discussion before the elimination ballot closes.
    #[serde(default = "default_discussion_timeout_secs")]
    discussion_timeout_secs: u64,

    /// Whether a team picked after a successful mutiny faces another mutiny.
    #[serde(default)]
    remutiny_after_reselection: bool,

    /// Fixed RNG seed; sessions draw from the OS when unset.
    #[serde(default)]
    #[setters(strip_option)]
    seed: Option<u64>,
}

#[instrument]
fn default_starting_guns() -> u32 {
    3
}

#[instrument]
fn default_min_players() -> usize {
    crate::games::mutiny::MIN_PLAYERS
}

#[instrument]
fn default_mutiny_timeout_secs() -> u64 {
    60
}

#[instrument]
fn default_navigation_timeout_secs() -> u64 {
    90
}

#[instrument]
fn default_selection_timeout_secs() -> u64 {
    120
}

#[instrument]
fn default_discussion_timeout_secs() -> u64 {
    120
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_guns: default_starting_guns(),
            min_players: default_min_players(),
            mutiny_timeout_secs: default_mutiny_timeout_secs(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            selection_timeout_secs: default_selection_timeout_secs(),
            discussion_timeout_secs: default_discussion_timeout_secs(),
            remutiny_after_reselection: false,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(seed = ?config.seed, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        if config.min_players < crate::games::mutiny::MIN_PLAYERS {
            return Err(ConfigError::new(format!(
                "min_players must be at least {}, got {}",
                crate::games::mutiny::MIN_PLAYERS,
                config.min_players
            )));
        }
        Ok(config)
    }

    /// Renders the configuration as TOML.
    #[instrument(skip(self))]
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to render config: {}", e)))
    }

    /// Mutiny vote window.
    pub fn mutiny_timeout(&self) -> Duration {
        Duration::from_secs(self.mutiny_timeout_secs)
    }

    /// Window for each navigation stage.
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Team selection window.
    pub fn selection_timeout(&self) -> Duration {
        Duration::from_secs(self.selection_timeout_secs)
    }

    /// Discussion and ballot window.
    pub fn discussion_timeout(&self) -> Duration {
        Duration::from_secs(self.discussion_timeout_secs)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = GameConfig::from_toml("").unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(*config.starting_guns(), 3);
        assert_eq!(config.mutiny_timeout(), Duration::from_secs(60));
        assert!(!*config.remutiny_after_reselection());
    }

    #[test]
    fn test_overrides() {
        let config = GameConfig::from_toml(
            "mutiny_timeout_secs = 5\nremutiny_after_reselection = true\nseed = 42\n",
        )
        .unwrap();
        assert_eq!(config.mutiny_timeout(), Duration::from_secs(5));
        assert!(*config.remutiny_after_reselection());
        assert_eq!(*config.seed(), Some(42));
    }

    #[test]
    fn test_min_players_below_table_rejected() {
        let err = GameConfig::from_toml("min_players = 3").unwrap_err();
        assert!(err.message.contains("min_players"));
    }

    #[test]
    fn test_setters_chain() {
        let config = GameConfig::default().with_seed(9).with_starting_guns(4);
        assert_eq!(*config.seed(), Some(9));
        assert_eq!(*config.starting_guns(), 4);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = GameConfig::default().with_seed(3);
        let rendered = config.to_toml().unwrap();
        assert_eq!(GameConfig::from_toml(&rendered).unwrap(), config);
    }
}
