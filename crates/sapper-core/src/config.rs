//! Engine configuration loading and defaults.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration, loaded from a YAML file with environment
/// overrides for the API endpoint and token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub api: ApiConfig,
    pub limits: LimitConfig,
    pub rules: ArenaRules,
    pub strategy: StrategyConfig,
}

/// Arena HTTP endpoint and auth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// API token. Usually supplied via `ARENA_TOKEN`.
    pub token: Option<String>,
    /// `Authorization: Bearer` when true, `X-Auth-Token` otherwise.
    pub use_bearer: bool,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://games-test.datsteam.dev".to_string(),
            token: None,
            use_bearer: true,
            request_timeout_secs: 10,
        }
    }
}

/// Shared request budget and scheduler sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Global ceiling shared by every outbound call.
    pub requests_per_second: f64,
    pub bucket_capacity: f64,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Bounded FIFO capacity of the command scheduler.
    pub queue_capacity: usize,
    /// Per-tick budget for draining the command queue.
    pub submit_budget_ms: u64,
    /// Transport-failure retries per command before giving up.
    pub transport_retries: u32,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 3.0,
            bucket_capacity: 3.0,
            base_backoff_ms: 500,
            max_backoff_ms: 16_000,
            queue_capacity: 8,
            submit_budget_ms: 40,
            transport_retries: 3,
        }
    }
}

/// Arena rule constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaRules {
    pub tick_interval_ms: u64,
    pub vision_radius: i32,
    pub bomb_range: i32,
    /// Default fuse, in ticks.
    pub fuse_ticks: u32,
    pub max_path_len: usize,
    pub mob_danger_radius: i32,
    /// Suppress re-farming a destroyed obstacle tile for this many ticks.
    pub farm_cooldown_ticks: u64,
}

impl Default for ArenaRules {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            vision_radius: 5,
            bomb_range: 1,
            fuse_ticks: 160,
            max_path_len: 30,
            mob_danger_radius: 2,
            farm_cooldown_ticks: 30,
        }
    }
}

/// Scoring weights, role counts, and planner thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Path length penalty.
    pub alpha: f64,
    /// Risk penalty.
    pub beta: f64,
    /// Interference penalty.
    pub gamma: f64,
    /// Scout information gain bonus.
    pub delta: f64,

    pub anchor_count: usize,
    pub farmer_count: usize,
    pub scout_count: usize,

    pub farm_search_radius: i32,
    /// Escape reachability budget after placing, in steps.
    pub escape_steps: u32,
    /// Hazard horizon applied to tiles a path transits.
    pub transit_horizon: u32,
    pub evade_radius: i32,
    pub scout_frontier_limit: usize,
    pub max_candidates: usize,

    /// Farmer pressure thresholds: ticks without a valid placement before
    /// relaxing the k requirement.
    pub relaxed_after_ticks: u32,
    pub desperate_after_ticks: u32,

    /// Hard reservation lifetime, in ticks.
    pub hard_ttl_ticks: u64,
    /// Booster shop cadence, in ticks.
    pub booster_interval_ticks: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            beta: 10.0,
            gamma: 5.0,
            delta: 20.0,
            anchor_count: 1,
            farmer_count: 4,
            scout_count: 1,
            farm_search_radius: 10,
            escape_steps: 8,
            transit_horizon: 2,
            evade_radius: 8,
            scout_frontier_limit: 10,
            max_candidates: 20,
            relaxed_after_ticks: 12,
            desperate_after_ticks: 30,
            hard_ttl_ticks: 3,
            booster_interval_ticks: 40,
        }
    }
}

impl EngineConfig {
    /// Load from a YAML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let mut config: EngineConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Self {
        let mut config = EngineConfig::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("ARENA_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(token) = std::env::var("ARENA_TOKEN") {
            self.api.token = Some(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.limits.requests_per_second, 3.0);
        assert_eq!(config.rules.max_path_len, 30);
        assert_eq!(config.strategy.hard_ttl_ticks, 3);
    }

    #[test]
    fn partial_yaml_overrides_one_section() {
        let config: EngineConfig =
            serde_yaml::from_str("limits:\n  queue_capacity: 4\n").unwrap();
        assert_eq!(config.limits.queue_capacity, 4);
        assert_eq!(config.limits.requests_per_second, 3.0);
    }
}
