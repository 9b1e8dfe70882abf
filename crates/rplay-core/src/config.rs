//! Router tuning knobs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::agents::RunLimits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    /// Client replies evaluate objective progress once the conversation has
    /// more than this many turns
    #[serde(default = "default_objective_min_turns")]
    pub objective_min_turns: usize,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_run_timeout_secs() -> u64 {
    120
}

fn default_max_tool_rounds() -> usize {
    20
}

fn default_objective_min_turns() -> usize {
    2
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            run_timeout_secs: default_run_timeout_secs(),
            max_tool_rounds: default_max_tool_rounds(),
            objective_min_turns: default_objective_min_turns(),
        }
    }
}

impl RouterConfig {
    pub fn run_limits(&self) -> RunLimits {
        RunLimits {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            run_timeout: Duration::from_secs(self.run_timeout_secs.max(1)),
            max_tool_rounds: self.max_tool_rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RouterConfig = toml::from_str("run_timeout_secs = 30").unwrap();
        assert_eq!(config.run_timeout_secs, 30);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.max_tool_rounds, 20);
        assert_eq!(config.objective_min_turns, 2);
    }

    #[test]
    fn test_run_limits() {
        let limits = RouterConfig::default().run_limits();
        assert_eq!(limits.poll_interval, Duration::from_millis(500));
        assert_eq!(limits.run_timeout, Duration::from_secs(120));
        assert_eq!(limits, RunLimits::default());
    }
}
