use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ElasticError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .and_then(|v| v.parse().ok())
}

// ── Balancer config ───────────────────────────────────────────

/// Fleet and balancing configuration, typically parsed from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancerConfig {
    /// Number of nodes in the fleet. Fixed for the fleet's lifetime.
    #[serde(default = "default_node_count")]
    pub node_count: usize,
    /// Slots in every node's task queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Initial overload bound, as a fraction of queue capacity.
    #[serde(default = "default_overload_bound")]
    pub overload_bound: f64,
    /// Initial underload bound, as a fraction of queue capacity.
    #[serde(default = "default_underload_bound")]
    pub underload_bound: f64,
    /// Upper limit applied to a recalculated underload bound.
    #[serde(default = "default_underload_ceiling")]
    pub underload_ceiling: f64,
    /// Number of utilization samples kept for threshold recalculation.
    #[serde(default = "default_history_len")]
    pub history_len: usize,
    /// Service time added to every busy node per tick.
    #[serde(default = "default_tick_value")]
    pub tick_value: u64,
    /// Run a rebalance pass every N submitted tasks.
    #[serde(default = "default_rebalance_every")]
    pub rebalance_every: usize,
    /// Standard-deviation multiplier used when recalculating bounds.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    /// Recalculate bounds every N steps. 0 = never.
    #[serde(default)]
    pub recalculate_every: usize,
}

fn default_node_count() -> usize { 5 }
fn default_queue_capacity() -> usize { 50 }
fn default_overload_bound() -> f64 { 0.95 }
fn default_underload_bound() -> f64 { 0.3 }
fn default_underload_ceiling() -> f64 { 0.3 }
fn default_history_len() -> usize { 1000 }
fn default_tick_value() -> u64 { 43_000 }
fn default_rebalance_every() -> usize { 5 }
fn default_sensitivity() -> f64 { 2.0 }

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            node_count: default_node_count(),
            queue_capacity: default_queue_capacity(),
            overload_bound: default_overload_bound(),
            underload_bound: default_underload_bound(),
            underload_ceiling: default_underload_ceiling(),
            history_len: default_history_len(),
            tick_value: default_tick_value(),
            rebalance_every: default_rebalance_every(),
            sensitivity: default_sensitivity(),
            recalculate_every: 0,
        }
    }
}

// ── Loading & Validation ────────────────────────────────────────────

impl BalancerConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ElasticError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ElasticError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ElasticError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Convention: `ELASTIC_<KEY>` overrides the field `<key>`, e.g.
    /// `ELASTIC_NODE_COUNT` → `node_count`. Unparseable values are ignored.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parsed("ELASTIC_NODE_COUNT") {
            self.node_count = v;
        }
        if let Some(v) = env_parsed("ELASTIC_QUEUE_CAPACITY") {
            self.queue_capacity = v;
        }
        if let Some(v) = env_parsed("ELASTIC_OVERLOAD_BOUND") {
            self.overload_bound = v;
        }
        if let Some(v) = env_parsed("ELASTIC_UNDERLOAD_BOUND") {
            self.underload_bound = v;
        }
        if let Some(v) = env_parsed("ELASTIC_UNDERLOAD_CEILING") {
            self.underload_ceiling = v;
        }
        if let Some(v) = env_parsed("ELASTIC_HISTORY_LEN") {
            self.history_len = v;
        }
        if let Some(v) = env_parsed("ELASTIC_TICK_VALUE") {
            self.tick_value = v;
        }
        if let Some(v) = env_parsed("ELASTIC_REBALANCE_EVERY") {
            self.rebalance_every = v;
        }
        if let Some(v) = env_parsed("ELASTIC_SENSITIVITY") {
            self.sensitivity = v;
        }
        if let Some(v) = env_parsed("ELASTIC_RECALCULATE_EVERY") {
            self.recalculate_every = v;
        }
    }

    /// Validate field ranges.
    pub fn validate(&self) -> Result<(), ElasticError> {
        if self.node_count == 0 {
            return Err(ElasticError::Config("node_count must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ElasticError::Config("queue_capacity must be at least 1".into()));
        }
        if self.history_len == 0 {
            return Err(ElasticError::Config("history_len must be at least 1".into()));
        }
        if self.tick_value == 0 {
            return Err(ElasticError::Config("tick_value must be positive".into()));
        }
        if self.rebalance_every == 0 {
            return Err(ElasticError::Config("rebalance_every must be at least 1".into()));
        }
        for (name, value) in [
            ("overload_bound", self.overload_bound),
            ("underload_bound", self.underload_bound),
            ("underload_ceiling", self.underload_ceiling),
            ("sensitivity", self.sensitivity),
        ] {
            if !value.is_finite() {
                return Err(ElasticError::Config(format!("{name} must be finite, got {value}")));
            }
        }
        if self.underload_bound > self.overload_bound {
            return Err(ElasticError::Config(format!(
                "underload_bound ({}) exceeds overload_bound ({})",
                self.underload_bound, self.overload_bound
            )));
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Balancer config:");
        tracing::info!("  fleet:       nodes={}, queue_capacity={}", self.node_count, self.queue_capacity);
        tracing::info!("  bounds:      overload={}, underload={} (ceiling {})", self.overload_bound, self.underload_bound, self.underload_ceiling);
        tracing::info!("  adaptation:  history_len={}, sensitivity={}, every={}", self.history_len, self.sensitivity, self.recalculate_every);
        tracing::info!("  timing:      tick_value={}, rebalance_every={}", self.tick_value, self.rebalance_every);
    }

    /// JSON view for snapshots and dashboards.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "fleet": { "nodes": self.node_count, "queue_capacity": self.queue_capacity },
            "bounds": {
                "overload": self.overload_bound,
                "underload": self.underload_bound,
                "underload_ceiling": self.underload_ceiling,
            },
            "adaptation": {
                "history_len": self.history_len,
                "sensitivity": self.sensitivity,
                "recalculate_every": self.recalculate_every,
            },
            "timing": { "tick_value": self.tick_value, "rebalance_every": self.rebalance_every },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_fleet() {
        let c = BalancerConfig::default();
        assert_eq!(c.node_count, 5);
        assert_eq!(c.queue_capacity, 50);
        assert_eq!(c.overload_bound, 0.95);
        assert_eq!(c.underload_bound, 0.3);
        assert_eq!(c.history_len, 1000);
        assert_eq!(c.tick_value, 43_000);
        assert_eq!(c.recalculate_every, 0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: BalancerConfig = toml::from_str("node_count = 8\noverload_bound = 0.9\n").unwrap();
        assert_eq!(c.node_count, 8);
        assert_eq!(c.overload_bound, 0.9);
        assert_eq!(c.queue_capacity, 50);
        assert_eq!(c.sensitivity, 2.0);
    }

    #[test]
    fn empty_toml_is_default() {
        let c: BalancerConfig = toml::from_str("").unwrap();
        assert_eq!(c, BalancerConfig::default());
    }

    #[test]
    fn rejects_empty_fleet() {
        let c = BalancerConfig { node_count: 0, ..Default::default() };
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("node_count"));
    }

    #[test]
    fn rejects_zero_capacity() {
        let c = BalancerConfig { queue_capacity: 0, ..Default::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let c = BalancerConfig {
            overload_bound: 0.2,
            underload_bound: 0.4,
            ..Default::default()
        };
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn rejects_non_finite_bound() {
        let c = BalancerConfig { overload_bound: f64::NAN, ..Default::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = toml::from_str::<BalancerConfig>("node_count = \"five\"").unwrap_err();
        let err: ElasticError = err.into();
        assert!(matches!(err, ElasticError::ConfigParse(_)));
    }

    #[test]
    fn summary_reports_fleet_shape() {
        let s = BalancerConfig::default().summary();
        assert_eq!(s["fleet"]["nodes"], 5);
        assert_eq!(s["fleet"]["queue_capacity"], 50);
    }
}
