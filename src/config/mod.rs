//! Layered configuration
//!
//! Four layers, later ones win:
//! 1. Built-in defaults
//! 2. User config (~/.config/chainwitness/config.toml)
//! 3. Project config (.chainwitness.toml or --config PATH)
//! 4. CLI flags

mod effective;
mod merge;
mod settings;

pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, PROJECT_CONFIG_FILE};
pub use merge::{deep_merge, merge_layers};
pub use settings::{HashingSettings, KeySettings, LoggingSettings, Settings, VerificationSettings};
