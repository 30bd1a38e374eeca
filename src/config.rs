//! Engine configuration, loadable from TOML (`memquery.toml`) with
//! environment overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::DbError;
use crate::query::MAX_QUERY_DEPTH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum predicate nesting before evaluation fails.
    pub max_query_depth: usize,
    /// Emit `dev6!` benchmark lines for each scan.
    pub bench_logs: bool,
    /// error|warn|info|debug|trace
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_query_depth: MAX_QUERY_DEPTH, bench_logs: true, log_level: "info".into() }
    }
}

impl EngineConfig {
    /// # Errors
    /// Returns `DbError::Config` if the text is not valid TOML for this structure.
    pub fn from_toml_str(s: &str) -> Result<Self, DbError> {
        toml::from_str(s).map_err(|e| DbError::Config(e.to_string()))
    }

    /// # Errors
    /// Returns `DbError::Io` if the file cannot be read and `DbError::Config` if it does not parse.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DbError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Apply `MEMQUERY_MAX_QUERY_DEPTH`, `MEMQUERY_BENCH_LOGS` and
    /// `MEMQUERY_LOG_LEVEL` from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|k| std::env::var(k).ok())
    }

    /// Same as [`Self::with_env_overrides`] with a custom variable lookup.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("MEMQUERY_MAX_QUERY_DEPTH") {
            match v.parse() {
                Ok(n) => self.max_query_depth = n,
                Err(_) => log::warn!("ignoring MEMQUERY_MAX_QUERY_DEPTH={v}: not a number"),
            }
        }
        if let Some(v) = lookup("MEMQUERY_BENCH_LOGS") {
            match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" => self.bench_logs = true,
                "0" | "false" | "off" => self.bench_logs = false,
                _ => log::warn!("ignoring MEMQUERY_BENCH_LOGS={v}"),
            }
        }
        if let Some(v) = lookup("MEMQUERY_LOG_LEVEL") {
            self.log_level = v;
        }
        self
    }

    #[must_use]
    pub fn level_filter(&self) -> log::LevelFilter {
        match self.log_level.to_ascii_lowercase().as_str() {
            "off" => log::LevelFilter::Off,
            "error" => log::LevelFilter::Error,
            "warn" => log::LevelFilter::Warn,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            _ => log::LevelFilter::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = EngineConfig::from_toml_str("max_query_depth = 8").unwrap();
        assert_eq!(cfg.max_query_depth, 8);
        assert!(cfg.bench_logs);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("max_query_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn overrides_apply_and_skip_garbage() {
        let cfg = EngineConfig::default().with_overrides(|k| match k {
            "MEMQUERY_MAX_QUERY_DEPTH" => Some("nope".into()),
            "MEMQUERY_BENCH_LOGS" => Some("off".into()),
            "MEMQUERY_LOG_LEVEL" => Some("DEBUG".into()),
            _ => None,
        });
        assert_eq!(cfg.max_query_depth, MAX_QUERY_DEPTH);
        assert!(!cfg.bench_logs);
        assert_eq!(cfg.level_filter(), log::LevelFilter::Debug);
    }
}
