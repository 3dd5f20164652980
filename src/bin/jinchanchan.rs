//! Live-session entry point. Wires CLI flags into a `SessionConfig`,
//! reports capability status, and runs `SessionLoop::run` against a
//! platform adapter supplied by the integrator.
//!
//! No concrete `PlatformAdapter` or `VlmBackend` ships in this crate
//! (spec.md's Non-goals): this binary demonstrates the wiring and
//! serves `--validate-templates`/`--self-check`, but the live path
//! requires linking in an adapter of the caller's own.

use std::path::Path;

use clap::Parser;

use jinchanchan::capabilities::{CapabilityMatrix, CapabilityStatus};
use jinchanchan::cli::Cli;
use jinchanchan::session::{ProviderKeys, SessionConfig};
use jinchanchan::vision::TemplateRegistry;

fn report_capabilities(config: &SessionConfig) -> CapabilityMatrix {
    let mut matrix = CapabilityMatrix::new();

    matrix.record("template_matching", CapabilityStatus::Available, "opencv-free pixel matcher");

    match &config.vlm {
        Some(vlm) => {
            let keys = ProviderKeys::from_env();
            if keys.has(&vlm.provider) {
                matrix.record("vlm", CapabilityStatus::Available, format!("{} ({})", vlm.provider, vlm.model));
            } else {
                matrix.record(
                    "vlm",
                    CapabilityStatus::NotConfigured,
                    format!("{} configured but no {}_API_KEY set", vlm.provider, vlm.provider.to_uppercase()),
                );
            }
        }
        None => matrix.record("vlm", CapabilityStatus::NotConfigured, "no provider configured, rules-only"),
    }

    matrix.record(
        "platform_adapter",
        CapabilityStatus::Unavailable,
        "no concrete adapter linked into this build",
    );

    matrix
}

fn validate_templates(template_root: &Path) -> anyhow::Result<()> {
    let heroes_path = template_root.join("heroes.json");
    let items_path = template_root.join("items.json");
    let synergies_path = template_root.join("synergies.json");

    let heroes = std::fs::read_to_string(&heroes_path)?;
    let heroes: jinchanchan::data::HeroDataSet = serde_json::from_str(&heroes)?;
    let items = std::fs::read_to_string(&items_path)?;
    let items: jinchanchan::data::ItemDataSet = serde_json::from_str(&items)?;
    let synergies = std::fs::read_to_string(&synergies_path)?;
    let synergies: jinchanchan::data::SynergyDataSet = serde_json::from_str(&synergies)?;

    let mut registry = TemplateRegistry::new();
    let count = registry.load_from_game_data(&heroes, &items, &synergies);
    println!("registered {} template entries", count);

    let stats = registry.get_stats();
    println!("{:?}", stats);
    println!("{}", registry.missing_templates_report(template_root));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cancelled = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    jinchanchan::init(cancelled.clone());

    if cli.validate_templates {
        return validate_templates(&cli.template_root);
    }

    let config = cli.session_config()?;
    let matrix = report_capabilities(&config);
    log::info!("capability report:\n{}", matrix.report());
    log::info!("recognition flavor: {}", matrix.flavor());

    if let Some(fixtures_dir) = &cli.self_check {
        anyhow::bail!(
            "self-check mode belongs to the `selfcheck` binary; run `selfcheck --fixtures {}` instead",
            fixtures_dir.display()
        );
    }

    anyhow::bail!(
        "no concrete PlatformAdapter is linked into this binary; \
         implement `jinchanchan::platform::PlatformAdapter` for your target platform \
         and drive `jinchanchan::session::SessionLoop` directly from your own binary"
    );
}
