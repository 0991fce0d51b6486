//! Configuration loading and management.

use std::path::{Path, PathBuf};

use ep_core::{DEFAULT_ALPHA, MalformedPolicy};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Close opens left on the stack at the last timestamp in the log.
    pub close_unmatched_at_end: bool,
    /// What to do with rows that are neither open nor close.
    pub malformed: MalformedPolicy,
    /// Significance level for the comparison.
    pub alpha: f64,
    /// Categories to compare.
    pub comparison: ComparisonConfig,
}

/// The two categories fed to the significance test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    pub left: String,
    pub right: String,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            left: "manual".to_string(),
            right: "auto".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            close_unmatched_at_end: false,
            malformed: MalformedPolicy::default(),
            alpha: DEFAULT_ALPHA,
            comparison: ComparisonConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // EP_ALPHA, EP_COMPARISON__LEFT, ...
        figment = figment.merge(Env::prefixed("EP_").split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    fn validate(&self) -> Result<(), figment::Error> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(format!("alpha must be between 0 and 1 exclusive, got {}", self.alpha).into());
        }
        if self.comparison.left.trim().is_empty() || self.comparison.right.trim().is_empty() {
            return Err("comparison categories must not be empty".into());
        }
        Ok(())
    }
}

/// Returns the platform-specific config directory for ep.
///
/// On Linux: `~/.config/ep`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ep"))
}
