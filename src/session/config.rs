//! Session-wide configuration: safety-gate thresholds, VLM provider
//! selection, and the humanization RNG seed. YAML-loadable via
//! `serde_yaml`; CLI flags (see `cli`) override individual fields after
//! loading.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::VlmClientConfig;

fn default_max_actions_per_min() -> u32 {
    30
}

fn default_max_clicks() -> u32 {
    300
}

fn default_session_timeout_secs() -> u64 {
    300
}

fn default_decision_interval_secs() -> f64 {
    2.0
}

fn default_vlm_timeout_secs() -> u64 {
    30
}

fn default_vlm_max_retries() -> u32 {
    2
}

fn default_vlm_budget() -> u32 {
    50
}

fn default_priority_profile() -> String {
    "balanced".to_string()
}

fn default_rng_seed() -> u64 {
    0
}

/// VLM provider selection: which backend to build, and the
/// budget/timeout/retry knobs `VlmClient` wraps it with. Credentials
/// are read separately via `ProviderKeys::from_env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlmProviderConfig {
    pub provider: String,
    pub model: String,
    #[serde(default = "default_vlm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_vlm_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_vlm_budget")]
    pub budget_per_session: u32,
}

impl VlmProviderConfig {
    pub fn client_config(&self) -> VlmClientConfig {
        VlmClientConfig {
            budget_per_session: self.budget_per_session,
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
        }
    }
}

/// The full session configuration surface named in spec.md §6's CLI
/// flags — everything the core consumes, minus flag parsing itself
/// (that lives in `cli`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_max_actions_per_min")]
    pub max_actions_per_min: u32,
    #[serde(default = "default_max_clicks")]
    pub max_clicks: u32,
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    #[serde(default = "default_decision_interval_secs")]
    pub decision_interval_secs: f64,
    #[serde(default)]
    pub humanize: bool,
    #[serde(default = "default_rng_seed")]
    pub rng_seed: u64,
    #[serde(default)]
    pub use_som_annotation: bool,
    #[serde(default = "default_priority_profile")]
    pub priority_profile: String,
    #[serde(default)]
    pub vlm: Option<VlmProviderConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            max_actions_per_min: default_max_actions_per_min(),
            max_clicks: default_max_clicks(),
            session_timeout_secs: default_session_timeout_secs(),
            decision_interval_secs: default_decision_interval_secs(),
            humanize: true,
            rng_seed: default_rng_seed(),
            use_som_annotation: true,
            priority_profile: default_priority_profile(),
            vlm: None,
        }
    }
}

impl SessionConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn decision_interval(&self) -> Duration {
        Duration::from_secs_f64(self.decision_interval_secs.max(0.0))
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Live mode requires a positive VLM budget whenever a provider is
    /// configured, per spec.md §4.14.
    pub fn validate_for_live_mode(&self) -> Result<(), String> {
        if self.dry_run {
            return Ok(());
        }
        if let Some(vlm) = &self.vlm {
            if vlm.budget_per_session == 0 {
                return Err(format!(
                    "live mode with vlm provider '{}' configured requires budget_per_session > 0",
                    vlm.provider
                ));
            }
        }
        Ok(())
    }
}

/// `*_API_KEY` environment variable lookups. Absence never aborts
/// startup — it just leaves the corresponding provider unavailable.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    keys: std::collections::HashMap<String, String>,
}

impl ProviderKeys {
    /// Scans the process environment for `*_API_KEY` variables and
    /// indexes them by provider name (the prefix, lower-cased).
    pub fn from_env() -> Self {
        let mut keys = std::collections::HashMap::new();
        for (name, value) in std::env::vars() {
            if let Some(prefix) = name.strip_suffix("_API_KEY") {
                keys.insert(prefix.to_lowercase(), value);
            }
        }
        Self { keys }
    }

    pub fn get(&self, provider: &str) -> Option<&str> {
        self.keys.get(&provider.to_lowercase()).map(|s| s.as_str())
    }

    pub fn has(&self, provider: &str) -> bool {
        self.get(provider).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_live_mode_values() {
        let config = SessionConfig::default();
        assert_eq!(config.max_actions_per_min, 30);
        assert_eq!(config.max_clicks, 300);
        assert_eq!(config.session_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn yaml_round_trip_fills_defaults_for_missing_fields() {
        let yaml = "dry_run: false\nmax_actions_per_min: 10\n";
        let config = SessionConfig::from_yaml(yaml).unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.max_actions_per_min, 10);
        assert_eq!(config.max_clicks, 300);
    }

    #[test]
    fn live_mode_rejects_zero_budget_vlm_provider() {
        let mut config = SessionConfig { dry_run: false, ..SessionConfig::default() };
        config.vlm = Some(VlmProviderConfig {
            provider: "anthropic".to_string(),
            model: "claude".to_string(),
            timeout_secs: 30,
            max_retries: 2,
            budget_per_session: 0,
        });
        assert!(config.validate_for_live_mode().is_err());
    }

    #[test]
    fn live_mode_accepts_positive_budget() {
        let mut config = SessionConfig { dry_run: false, ..SessionConfig::default() };
        config.vlm = Some(VlmProviderConfig {
            provider: "anthropic".to_string(),
            model: "claude".to_string(),
            timeout_secs: 30,
            max_retries: 2,
            budget_per_session: 10,
        });
        assert!(config.validate_for_live_mode().is_ok());
    }

    #[test]
    fn dry_run_never_requires_a_vlm_budget() {
        let config = SessionConfig::default();
        assert!(config.validate_for_live_mode().is_ok());
    }

    #[test]
    fn provider_keys_absent_does_not_panic() {
        let keys = ProviderKeys::from_env();
        assert!(keys.get("definitely_not_a_real_provider_xyz").is_none());
    }
}
