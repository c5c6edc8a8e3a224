//! Configuration for research runs.

use serde::{Deserialize, Serialize};

use crate::action::SearchEngine;

/// Fidelity/speed trade-off for page observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    Fast,
    #[default]
    Balanced,
    Thorough,
}

/// Observation limits derived from a [`PerformanceMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeProfile {
    pub max_links: usize,
    /// Character budget for text-only extraction.
    pub text_budget: usize,
    /// Run deep analysis on every observation.
    pub always_deep: bool,
    pub quick_timeout_ms: u64,
}

impl PerformanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceMode::Fast => "fast",
            PerformanceMode::Balanced => "balanced",
            PerformanceMode::Thorough => "thorough",
        }
    }

    pub fn profile(&self) -> ModeProfile {
        match self {
            PerformanceMode::Fast => ModeProfile {
                max_links: 10,
                text_budget: 1200,
                always_deep: false,
                quick_timeout_ms: 8_000,
            },
            PerformanceMode::Balanced => ModeProfile {
                max_links: 20,
                text_budget: 1500,
                always_deep: false,
                quick_timeout_ms: 15_000,
            },
            PerformanceMode::Thorough => ModeProfile {
                max_links: 40,
                text_budget: 1500,
                always_deep: true,
                quick_timeout_ms: 15_000,
            },
        }
    }

    pub fn is_fast(&self) -> bool {
        matches!(self, PerformanceMode::Fast)
    }
}

impl std::fmt::Display for PerformanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PerformanceMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(PerformanceMode::Fast),
            "balanced" => Ok(PerformanceMode::Balanced),
            "thorough" => Ok(PerformanceMode::Thorough),
            other => Err(format!("unknown performance mode '{other}'")),
        }
    }
}

/// Budgets and cadences for a research run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Maximum loop iterations.
    /// Default: 30
    pub max_steps: u32,

    /// Finding capacity; also the auto-finish threshold.
    /// Default: 10
    pub max_findings: usize,

    /// Replans allowed per run.
    /// Default: 2
    pub max_replans: u32,

    /// A planned search runs on steps where `(step - 1) % search_every == 0`.
    /// Default: 3
    pub search_every: u32,

    /// Deep page analysis runs on every `analysis_every`-th step.
    /// Default: 2
    pub analysis_every: u32,

    /// Pause after a plan-driven search, in milliseconds.
    /// Default: 1000
    pub search_settle_ms: u64,

    /// Default: 20000
    pub navigation_timeout_ms: u64,

    /// Timeout for non-navigation browser calls.
    /// Default: 15000
    pub browser_timeout_ms: u64,

    /// Timeout for a single planner or decision model call.
    /// Default: 60000
    pub model_timeout_ms: u64,

    /// History entries visible to the decision prompt.
    /// Default: 6
    pub history_window: usize,

    pub default_engine: SearchEngine,

    pub performance_mode: PerformanceMode,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_steps: 30,
            max_findings: 10,
            max_replans: 2,
            search_every: 3,
            analysis_every: 2,
            search_settle_ms: 1_000,
            navigation_timeout_ms: 20_000,
            browser_timeout_ms: 15_000,
            model_timeout_ms: 60_000,
            history_window: 6,
            default_engine: SearchEngine::Google,
            performance_mode: PerformanceMode::Balanced,
        }
    }
}

impl ResearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short runs with light observation.
    pub fn fast() -> Self {
        Self {
            max_steps: 15,
            max_findings: 5,
            max_replans: 1,
            search_settle_ms: 500,
            performance_mode: PerformanceMode::Fast,
            ..Self::default()
        }
    }

    /// Longer runs with deep analysis on every observation.
    pub fn thorough() -> Self {
        Self {
            max_steps: 50,
            max_findings: 15,
            performance_mode: PerformanceMode::Thorough,
            ..Self::default()
        }
    }

    /// Builder: set max steps.
    pub fn max_steps(mut self, steps: u32) -> Self {
        self.max_steps = steps;
        self
    }

    /// Builder: set finding capacity.
    pub fn max_findings(mut self, findings: usize) -> Self {
        self.max_findings = findings;
        self
    }

    /// Builder: set replan ceiling.
    pub fn max_replans(mut self, replans: u32) -> Self {
        self.max_replans = replans;
        self
    }

    /// Builder: set the planned-search cadence.
    pub fn search_every(mut self, steps: u32) -> Self {
        self.search_every = steps;
        self
    }

    /// Builder: set the deep-analysis cadence.
    pub fn analysis_every(mut self, steps: u32) -> Self {
        self.analysis_every = steps;
        self
    }

    /// Builder: set the post-search pause.
    pub fn search_settle(mut self, ms: u64) -> Self {
        self.search_settle_ms = ms;
        self
    }

    pub fn mode(mut self, mode: PerformanceMode) -> Self {
        self.performance_mode = mode;
        self
    }

    pub fn engine(mut self, engine: SearchEngine) -> Self {
        self.default_engine = engine;
        self
    }

    /// Whether `step` (1-indexed) is a plan-driven search step.
    pub fn is_search_step(&self, step: u32) -> bool {
        let every = self.search_every.max(1);
        step.saturating_sub(1) % every == 0
    }

    /// Whether `step` (1-indexed) gets deep page analysis.
    pub fn is_analysis_step(&self, step: u32, mode: PerformanceMode) -> bool {
        if mode.profile().always_deep {
            return true;
        }
        let every = self.analysis_every.max(1);
        step % every == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResearchConfig::default();
        assert_eq!(config.max_steps, 30);
        assert_eq!(config.max_findings, 10);
        assert_eq!(config.max_replans, 2);
        assert_eq!(config.history_window, 6);
        assert_eq!(config.performance_mode, PerformanceMode::Balanced);
    }

    #[test]
    fn test_builder() {
        let config = ResearchConfig::new()
            .max_steps(12)
            .max_findings(3)
            .search_settle(0)
            .engine(SearchEngine::Bing);
        assert_eq!(config.max_steps, 12);
        assert_eq!(config.max_findings, 3);
        assert_eq!(config.search_settle_ms, 0);
        assert_eq!(config.default_engine, SearchEngine::Bing);
    }

    #[test]
    fn search_steps_follow_cadence() {
        let config = ResearchConfig::default();
        let steps: Vec<u32> = (1..=10).filter(|s| config.is_search_step(*s)).collect();
        assert_eq!(steps, vec![1, 4, 7, 10]);
    }

    #[test]
    fn analysis_alternates_unless_thorough() {
        let config = ResearchConfig::default();
        assert!(!config.is_analysis_step(1, PerformanceMode::Balanced));
        assert!(config.is_analysis_step(2, PerformanceMode::Balanced));
        assert!(config.is_analysis_step(1, PerformanceMode::Thorough));
    }

    #[test]
    fn mode_profiles() {
        assert_eq!(PerformanceMode::Fast.profile().text_budget, 1200);
        assert_eq!(PerformanceMode::Thorough.profile().max_links, 40);
        assert_eq!("FAST".parse::<PerformanceMode>().unwrap(), PerformanceMode::Fast);
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let config: ResearchConfig = serde_json::from_str(r#"{"max_steps": 5}"#).unwrap();
        assert_eq!(config.max_steps, 5);
        assert_eq!(config.search_every, 3);
    }
}
