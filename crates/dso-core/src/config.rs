//! Orchestrator configuration
//!
//! Loaded from TOML or YAML (by file extension) and validated on load.
//!
//! ```toml
//! lock_timeout_ms = 2000
//! max_blocked_attempts = 3
//! default_coverage_threshold = 100.0
//!
//! [persistence]
//! backend = "json_dir"
//! path = "/var/lib/dso/sessions"
//! ```

use crate::error::DsoError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Orchestrator-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Per-session lock wait before `ConcurrencyTimeout`
    pub lock_timeout_ms: u64,
    /// Blocked advances before a session is marked blocked
    pub max_blocked_attempts: u32,
    /// Coverage threshold when no override or constraint applies
    pub default_coverage_threshold: f64,
    /// Where sessions are stored
    pub persistence: PersistenceConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2000,
            max_blocked_attempts: 3,
            default_coverage_threshold: 100.0,
            persistence: PersistenceConfig::Memory,
        }
    }
}

/// Persistence backend selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum PersistenceConfig {
    /// Process memory only
    #[default]
    Memory,
    /// One JSON document per session under `path`
    JsonDir {
        /// Storage directory (created if missing)
        path: PathBuf,
    },
}

impl OrchestratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With lock timeout
    #[inline]
    #[must_use]
    pub fn with_lock_timeout_ms(mut self, ms: u64) -> Self {
        self.lock_timeout_ms = ms;
        self
    }

    /// With blocked-attempt limit
    #[inline]
    #[must_use]
    pub fn with_max_blocked_attempts(mut self, attempts: u32) -> Self {
        self.max_blocked_attempts = attempts;
        self
    }

    /// With default coverage threshold
    #[inline]
    #[must_use]
    pub fn with_default_coverage_threshold(mut self, percent: f64) -> Self {
        self.default_coverage_threshold = percent;
        self
    }

    /// With persistence backend
    #[inline]
    #[must_use]
    pub fn with_persistence(mut self, persistence: PersistenceConfig) -> Self {
        self.persistence = persistence;
        self
    }

    /// Lock timeout as a duration
    #[inline]
    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Load and validate a `.toml`, `.yaml` or `.yml` file
    ///
    /// # Errors
    /// Returns `DsoError::Configuration` if the file is unreadable, has an
    /// unsupported extension, fails to parse, or holds invalid values
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DsoError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DsoError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let config: Self = match extension.as_deref() {
            Some("toml") => toml::from_str(&text).map_err(|e| invalid(path, &e))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&text).map_err(|e| invalid(path, &e))?,
            _ => {
                return Err(DsoError::Configuration(format!(
                    "unsupported config format: {} (expected .toml, .yaml or .yml)",
                    path.display()
                )))
            }
        };
        config.validate()?;
        tracing::debug!(path = %path.display(), "orchestrator config loaded");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    /// Returns `DsoError::Configuration` describing the first bad value
    pub fn validate(&self) -> Result<(), DsoError> {
        if self.lock_timeout_ms == 0 {
            return Err(DsoError::Configuration(
                "lock_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_blocked_attempts == 0 {
            return Err(DsoError::Configuration(
                "max_blocked_attempts must be at least 1".to_string(),
            ));
        }
        validate_threshold(self.default_coverage_threshold)?;
        if let PersistenceConfig::JsonDir { path } = &self.persistence {
            if path.as_os_str().is_empty() {
                return Err(DsoError::Configuration(
                    "persistence path must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Check a coverage percentage
pub(crate) fn validate_threshold(percent: f64) -> Result<(), DsoError> {
    if percent.is_finite() && (0.0..=100.0).contains(&percent) {
        Ok(())
    } else {
        Err(DsoError::Configuration(format!(
            "coverage threshold must be within 0..=100, got {percent}"
        )))
    }
}

fn invalid(path: &Path, err: &dyn std::fmt::Display) -> DsoError {
    DsoError::Configuration(format!("invalid config {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_toml() {
        let file = write(
            ".toml",
            r#"
lock_timeout_ms = 500
max_blocked_attempts = 5

[persistence]
backend = "json_dir"
path = "/tmp/dso"
"#,
        );
        let config = OrchestratorConfig::load(file.path()).unwrap();
        assert_eq!(config.lock_timeout_ms, 500);
        assert_eq!(config.max_blocked_attempts, 5);
        assert_eq!(config.default_coverage_threshold, 100.0);
        assert_eq!(
            config.persistence,
            PersistenceConfig::JsonDir {
                path: PathBuf::from("/tmp/dso")
            }
        );
    }

    #[test]
    fn loads_yaml() {
        let file = write(
            ".yml",
            "default_coverage_threshold: 80\npersistence:\n  backend: memory\n",
        );
        let config = OrchestratorConfig::load(file.path()).unwrap();
        assert_eq!(config.default_coverage_threshold, 80.0);
        assert_eq!(config.persistence, PersistenceConfig::Memory);
    }

    #[test]
    fn rejects_nonsense() {
        let file = write(".toml", "max_blocked_attempts = 0\n");
        assert!(OrchestratorConfig::load(file.path())
            .unwrap_err()
            .is_configuration());

        let file = write(".json", "{}");
        assert!(OrchestratorConfig::load(file.path()).is_err());

        assert!(OrchestratorConfig::new()
            .with_default_coverage_threshold(120.0)
            .validate()
            .is_err());
        assert!(OrchestratorConfig::new()
            .with_default_coverage_threshold(f64::NAN)
            .validate()
            .is_err());
    }
}
