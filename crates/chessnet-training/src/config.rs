//! Pipeline configuration.
//!
//! [`PipelineConfig`] is a plain serde struct with `#[serde(default)]`, so a JSON
//! configuration file only needs to name the fields it changes:
//!
//! ```
//! use chessnet_training::config::PipelineConfig;
//!
//! let config: PipelineConfig =
//!     serde_json::from_str(r#"{ "max_networks": 8, "language": "russian" }"#).unwrap();
//! assert_eq!(config.max_networks, 8);
//! assert_eq!(config.dataset_size, 1000);
//! config.validate().unwrap();
//! ```

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Language of lifecycle messages.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Russian,
}

/// Where and how networks are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub directory: PathBuf,
    /// File names start with this prefix; other files in the directory are ignored.
    pub prefix: String,
    /// Extension without the leading dot.
    pub extension: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("Neural Networks"),
            prefix: "Net ".to_owned(),
            extension: "json".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum curated samples per network.
    pub dataset_size: usize,
    /// Training epochs over each dataset.
    pub repeats: usize,
    /// Rounds played by the duel stage.
    pub duel_iterations: usize,
    /// Per-side clock of analysis games.
    pub self_play_seconds: u64,
    /// Per-side clock of duel games.
    pub duel_seconds: u64,
    pub checkpoint_interval_seconds: u64,
    /// Population size restored after every duel stage.
    pub max_networks: usize,
    /// Best networks kept untouched by the replacement policy.
    pub elite_count: usize,
    /// Share of the non-elite population kept unchanged is `1 / not_editing_divisor`.
    pub not_editing_divisor: usize,
    /// Worst networks replaced by fresh random ones.
    pub destroy_count: usize,
    /// Plies after which a game is drawn.
    pub max_plies: usize,
    pub search_depth: u8,
    pub language: Language,
    pub store: StoreConfig,
    /// Seeds every random choice of the pipeline when set.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_size: 1000,
            repeats: 3,
            duel_iterations: 3,
            self_play_seconds: 60,
            duel_seconds: 150,
            checkpoint_interval_seconds: 30,
            max_networks: 16,
            elite_count: 4,
            not_editing_divisor: 3,
            destroy_count: 2,
            max_plies: 300,
            search_depth: 2,
            language: Language::English,
            store: StoreConfig::default(),
            seed: None,
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("max_networks must be at least 1")]
    NoNetworks,
    #[display("elite_count ({elite_count}) must not exceed max_networks ({max_networks})")]
    TooManyElites {
        elite_count: usize,
        max_networks: usize,
    },
    #[display("not_editing_divisor must be greater than 0")]
    ZeroDivisor,
    #[display("search_depth must be at least 1")]
    ZeroSearchDepth,
    #[display("max_plies must be at least 1")]
    ZeroMaxPlies,
    #[display("store extension must not be empty")]
    EmptyExtension,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_networks == 0 {
            return Err(ConfigError::NoNetworks);
        }
        if self.elite_count > self.max_networks {
            return Err(ConfigError::TooManyElites {
                elite_count: self.elite_count,
                max_networks: self.max_networks,
            });
        }
        if self.not_editing_divisor == 0 {
            return Err(ConfigError::ZeroDivisor);
        }
        if self.search_depth == 0 {
            return Err(ConfigError::ZeroSearchDepth);
        }
        if self.max_plies == 0 {
            return Err(ConfigError::ZeroMaxPlies);
        }
        if self.store.extension.is_empty() {
            return Err(ConfigError::EmptyExtension);
        }
        Ok(())
    }

    #[must_use]
    pub fn self_play_clock(&self) -> Duration {
        Duration::from_secs(self.self_play_seconds)
    }

    #[must_use]
    pub fn duel_clock(&self) -> Duration {
        Duration::from_secs(self.duel_seconds)
    }

    #[must_use]
    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_seconds)
    }
}
