//! Service configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sheetsync_calc::EvaluationMode;

/// Configuration of the workbook service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// How formula failures are treated during mutations and simulations
    pub evaluation: EvaluationMode,
    /// Long-poll budget
    pub wait: WaitConfig,
    /// Request and tenant limits
    pub limits: Limits,
}

impl ServiceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With long-poll attempt count
    #[inline]
    #[must_use]
    pub fn with_wait_attempts(mut self, max_attempts: u32) -> Self {
        self.wait.max_attempts = max_attempts;
        self
    }

    /// With long-poll interval
    #[inline]
    #[must_use]
    pub fn with_wait_interval(mut self, interval: Duration) -> Self {
        self.wait.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With limits
    #[inline]
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// With workbook quota per license
    #[inline]
    #[must_use]
    pub fn with_max_workbooks(mut self, max: usize) -> Self {
        self.limits.max_workbooks_per_license = max;
        self
    }

    /// With evaluation mode
    #[inline]
    #[must_use]
    pub fn with_evaluation(mut self, mode: EvaluationMode) -> Self {
        self.evaluation = mode;
        self
    }
}

/// Long-poll budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Reads of the store before reporting no change
    pub max_attempts: u32,
    /// Pause between reads in milliseconds
    pub interval_ms: u64,
}

impl WaitConfig {
    /// Pause between reads
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval_ms: 1000,
        }
    }
}

/// Request and tenant limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Workbooks one license may own
    pub max_workbooks_per_license: usize,
    /// Largest accepted or produced snapshot
    pub max_snapshot_bytes: usize,
    /// Longest accepted cell input, in characters
    pub max_input_len: usize,
    /// Largest range a simulation may write or read
    pub max_simulation_cells: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_workbooks_per_license: 1000,
            max_snapshot_bytes: 10 * 1024 * 1024,
            max_input_len: 512,
            max_simulation_cells: 100_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServiceConfig::new();
        assert_eq!(config.wait.max_attempts, 30);
        assert_eq!(config.wait.interval(), Duration::from_secs(1));
        assert_eq!(config.limits.max_input_len, 512);
        assert_eq!(config.evaluation, EvaluationMode::Suppress);
    }

    #[test]
    fn builder() {
        let config = ServiceConfig::new()
            .with_wait_attempts(3)
            .with_wait_interval(Duration::from_millis(250))
            .with_max_workbooks(2)
            .with_evaluation(EvaluationMode::Strict);
        assert_eq!(config.wait, WaitConfig { max_attempts: 3, interval_ms: 250 });
        assert_eq!(config.limits.max_workbooks_per_license, 2);
        assert_eq!(config.evaluation, EvaluationMode::Strict);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{"wait": {"interval_ms": 10}, "evaluation": "strict"}"#).unwrap();
        assert_eq!(config.wait.max_attempts, 30);
        assert_eq!(config.wait.interval_ms, 10);
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.evaluation, EvaluationMode::Strict);
    }
}
