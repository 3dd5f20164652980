//! Command-line surface (spec.md §6): platform/VLM selection, safety
//! thresholds, UI mode, and the `--self-check`/`--validate-templates`
//! offline paths. Gated behind the `cli` feature, matching the
//! teacher's own optional `clap` dependency.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::session::{SessionConfig, VlmProviderConfig};

/// How the session surfaces its state to the operator. Neither variant
/// is implemented by this crate (the full widget tree is out of scope
/// per spec.md's Non-goals) — this only records the operator's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UiMode {
    Headless,
    Tui,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Closed-loop perception/decision/execution assistant", long_about = None)]
pub struct Cli {
    /// Which platform adapter an integrator should construct (e.g.
    /// "playcover", "emulator", "adb"). This crate consumes only the
    /// `PlatformAdapter` trait; no concrete adapter ships here.
    #[arg(long, default_value = "emulator")]
    pub platform: String,

    /// YAML config file to load before applying these flags as
    /// overrides. Missing file is not an error unless `--self-check` or
    /// live mode requires a setting it would have supplied.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub vlm_provider: Option<String>,

    #[arg(long)]
    pub vlm_model: Option<String>,

    #[arg(long, default_value_t = 30)]
    pub vlm_timeout_secs: u64,

    #[arg(long, default_value_t = 2)]
    pub vlm_max_retries: u32,

    #[arg(long, default_value_t = 50)]
    pub vlm_budget: u32,

    /// Run without dispatching any input; still recognizes and decides.
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, default_value_t = 30)]
    pub max_actions_per_min: u32,

    #[arg(long, default_value_t = 300)]
    pub max_clicks: u32,

    #[arg(long, default_value_t = 300)]
    pub session_timeout: u64,

    #[arg(long, default_value_t = 2.0)]
    pub decision_interval: f64,

    #[arg(long)]
    pub humanize: bool,

    #[arg(long, default_value_t = 0)]
    pub rng_seed: u64,

    #[arg(long, value_enum, default_value_t = UiMode::Headless)]
    pub ui: UiMode,

    /// Runs the offline self-check harness against synthetic fixtures
    /// in this directory instead of a live session, writing a
    /// `SelfCheckReport` to `--self-check-out`.
    #[arg(long)]
    pub self_check: Option<PathBuf>,

    #[arg(long, default_value = "selfcheck-report.json")]
    pub self_check_out: PathBuf,

    /// Prints the template registry's missing-template report and exits.
    #[arg(long)]
    pub validate_templates: bool,

    /// Directory holding `heroes.json`/`items.json`/`synergies.json` and
    /// the template PNGs themselves, consulted by `--validate-templates`.
    #[arg(long, default_value = "data/game")]
    pub template_root: PathBuf,
}

impl Cli {
    /// Loads `--config` (if given) as the base, then layers every CLI
    /// flag the operator actually set on top. Flags with a
    /// `default_value_t` can't distinguish "explicitly passed" from
    /// "defaulted", so they always win over the file — this matches
    /// spec.md's framing of CLI flags as the final override layer.
    pub fn session_config(&self) -> Result<SessionConfig, anyhow::Error> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                SessionConfig::from_yaml(&text)?
            }
            None => SessionConfig::default(),
        };

        config.dry_run = self.dry_run;
        config.max_actions_per_min = self.max_actions_per_min;
        config.max_clicks = self.max_clicks;
        config.session_timeout_secs = self.session_timeout;
        config.decision_interval_secs = self.decision_interval;
        config.humanize = self.humanize;
        config.rng_seed = self.rng_seed;

        if let (Some(provider), Some(model)) = (&self.vlm_provider, &self.vlm_model) {
            config.vlm = Some(VlmProviderConfig {
                provider: provider.clone(),
                model: model.clone(),
                timeout_secs: self.vlm_timeout_secs,
                max_retries: self.vlm_max_retries,
                budget_per_session: self.vlm_budget,
            });
        }

        config.validate_for_live_mode().map_err(anyhow::Error::msg)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_build_a_live_mode_config_with_spec_defaults() {
        let cli = Cli::parse_from(["jinchanchan"]);
        let config = cli.session_config().unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.max_actions_per_min, 30);
    }

    #[test]
    fn live_mode_without_a_budget_is_still_valid_when_no_provider_is_set() {
        let cli = Cli::parse_from(["jinchanchan", "--max-clicks", "50"]);
        let config = cli.session_config().unwrap();
        assert_eq!(config.max_clicks, 50);
        assert!(config.vlm.is_none());
    }

    #[test]
    fn vlm_flags_require_both_provider_and_model_to_take_effect() {
        let cli = Cli::parse_from(["jinchanchan", "--vlm-provider", "anthropic"]);
        let config = cli.session_config().unwrap();
        assert!(config.vlm.is_none());
    }

    #[test]
    fn setting_both_provider_and_model_builds_a_vlm_provider_config() {
        let cli = Cli::parse_from(["jinchanchan", "--vlm-provider", "anthropic", "--vlm-model", "claude", "--vlm-budget", "10"]);
        let config = cli.session_config().unwrap();
        let vlm = config.vlm.unwrap();
        assert_eq!(vlm.provider, "anthropic");
        assert_eq!(vlm.budget_per_session, 10);
    }

    #[test]
    fn ui_mode_defaults_to_headless() {
        let cli = Cli::parse_from(["jinchanchan"]);
        assert_eq!(cli.ui, UiMode::Headless);
    }
}
