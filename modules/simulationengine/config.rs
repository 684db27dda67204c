use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use shared_logging::LogLevel;

use crate::{
    estimation::CRITICAL_T_95,
    methods::{Conditioning, EffectMode},
    request::{SimulationRequest, MIN_SAMPLE_SIZE},
};

/// Lab configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabConfig {
    /// Values used when the caller does not override them.
    #[serde(default)]
    pub defaults: RunDefaults,
    /// Log sink settings.
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Significance settings.
    #[serde(default)]
    pub review: ReviewSettings,
    /// Catalog replacing the built-in one; relative paths resolve against the config file.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

impl LabConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading lab config {}", path.display()))?;
        let mut config =
            Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        let source_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        for candidate in [config.catalog.as_mut(), config.logging.path.as_mut()]
            .into_iter()
            .flatten()
        {
            if candidate.is_relative() {
                *candidate = source_dir.join(&*candidate);
            }
        }
        Ok(config)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.defaults.n < MIN_SAMPLE_SIZE {
            bail!(
                "defaults.n = {} is below the minimum sample size {MIN_SAMPLE_SIZE}",
                self.defaults.n
            );
        }
        if !(self.review.critical_t.is_finite() && self.review.critical_t > 0.0) {
            bail!("review.critical_t must be positive, got {}", self.review.critical_t);
        }
        Ok(())
    }

    /// Request built from the configured defaults.
    #[must_use]
    pub fn default_request(&self) -> SimulationRequest {
        SimulationRequest::new(self.defaults.scenario.clone())
            .with_n(self.defaults.n)
            .with_seed(self.defaults.seed)
            .with_effect(EffectMode::from_realistic(self.defaults.literature))
            .with_conditioning(Conditioning::from_toggle(self.defaults.conditioned))
    }
}

/// `[defaults]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDefaults {
    /// Scenario id.
    #[serde(default = "default_scenario")]
    pub scenario: String,
    /// Sample size.
    #[serde(default = "default_n")]
    pub n: usize,
    /// Seed.
    #[serde(default = "default_seed")]
    pub seed: u32,
    /// Simulate with the literature effect.
    #[serde(default)]
    pub literature: bool,
    /// Surface the conditional regression.
    #[serde(default)]
    pub conditioned: bool,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            scenario: default_scenario(),
            n: default_n(),
            seed: default_seed(),
            literature: false,
            conditioned: false,
        }
    }
}

/// `[logging]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// JSON-lines log file; stderr when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Minimum level written.
    #[serde(default = "default_level")]
    pub level: LogLevel,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            path: None,
            level: default_level(),
        }
    }
}

/// `[review]` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewSettings {
    /// Critical `|t|` for the verdicts.
    #[serde(default = "default_critical_t")]
    pub critical_t: f64,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            critical_t: default_critical_t(),
        }
    }
}

fn default_scenario() -> String {
    "c1".into()
}

const fn default_n() -> usize {
    1_000
}

const fn default_seed() -> u32 {
    42
}

const fn default_level() -> LogLevel {
    LogLevel::Info
}

const fn default_critical_t() -> f64 {
    CRITICAL_T_95
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_document_uses_defaults() {
        let config = LabConfig::from_toml_str("").unwrap();
        assert_eq!(config, LabConfig::default());
        let request = config.default_request();
        assert_eq!(request, SimulationRequest::new("c1"));
    }

    #[test]
    fn load_resolves_relative_paths() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("lab.toml");
        fs::write(
            &path,
            r#"
catalog = "scenarios.toml"

[defaults]
scenario = "m3"
n = 5000
seed = 7
literature = true
conditioned = true

[logging]
path = "logs/lab.log"
level = "WARN"

[review]
critical_t = 2.58
"#,
        )
        .unwrap();
        let config = LabConfig::load(&path).unwrap();
        assert_eq!(config.catalog, Some(tmp.path().join("scenarios.toml")));
        assert_eq!(config.logging.path, Some(tmp.path().join("logs/lab.log")));
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert!((config.review.critical_t - 2.58).abs() < f64::EPSILON);
        let request = config.default_request();
        assert_eq!(request.scenario_id, "m3");
        assert_eq!(request.n, 5_000);
        assert_eq!(request.seed, 7);
        assert_eq!(request.effect, EffectMode::Literature);
        assert_eq!(request.conditioning, Conditioning::OnCollider);
    }

    #[test]
    fn lowercase_log_level_loads() {
        let config = LabConfig::from_toml_str("[logging]\nlevel = \"info\"\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);
        let config = LabConfig::from_toml_str("[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn invalid_values_fail_the_load() {
        assert!(LabConfig::from_toml_str("[defaults]\nn = 2\n").is_err());
        assert!(LabConfig::from_toml_str("[review]\ncritical_t = 0.0\n").is_err());
        assert!(LabConfig::from_toml_str("[defaults]\nseed = -1\n").is_err());
        let tmp = tempdir().unwrap();
        assert!(LabConfig::load(tmp.path().join("missing.toml")).is_err());
    }
}
