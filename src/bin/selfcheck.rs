//! Offline replay binary: runs the recognition/decision pipeline over a
//! directory of screenshot fixtures with no platform adapter or VLM
//! backend, and writes a `SelfCheckReport` JSON artifact.

use std::path::{Path, PathBuf};

use clap::Parser;

use jinchanchan::data::{HeroDataSet, ItemDataSet, SynergyDataSet};
use jinchanchan::decision::HybridDecisionEngine;
use jinchanchan::replay::{Fixture, SelfCheckHarness};
use jinchanchan::vision::{OcrEngine, RecognitionEngine, TemplateMatcher, TemplateRegistry};

#[derive(Parser, Debug)]
#[command(author, version, about = "Offline recognition/decision replay over screenshot fixtures", long_about = None)]
struct Args {
    /// Directory of PNG/JPEG screenshots to replay.
    #[arg(long)]
    fixtures: PathBuf,

    /// Directory holding `heroes.json`/`items.json`/`synergies.json` and
    /// the template PNGs themselves. Missing game-data files leave the
    /// registry empty; recognition just finds nothing.
    #[arg(long, default_value = "data/game")]
    template_root: PathBuf,

    #[arg(long, default_value = "selfcheck-report.json")]
    out: PathBuf,
}

fn load_registry(template_root: &Path) -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    let heroes = std::fs::read_to_string(template_root.join("heroes.json"))
        .ok()
        .and_then(|s| serde_json::from_str::<HeroDataSet>(&s).ok())
        .unwrap_or_default();
    let items = std::fs::read_to_string(template_root.join("items.json"))
        .ok()
        .and_then(|s| serde_json::from_str::<ItemDataSet>(&s).ok())
        .unwrap_or_default();
    let synergies = std::fs::read_to_string(template_root.join("synergies.json"))
        .ok()
        .and_then(|s| serde_json::from_str::<SynergyDataSet>(&s).ok())
        .unwrap_or_default();
    registry.load_from_game_data(&heroes, &items, &synergies);
    registry
}

fn load_fixtures(dir: &Path) -> anyhow::Result<Vec<Fixture>> {
    let mut fixtures = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_image = matches!(
            path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()),
            Some(ext) if ext == "png" || ext == "jpg" || ext == "jpeg"
        );
        if !is_image {
            continue;
        }
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("fixture").to_string();
        let screenshot = image::open(&path)?.to_rgb8();
        fixtures.push(Fixture::new(name, screenshot));
    }
    fixtures.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(fixtures)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cancelled = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    jinchanchan::init(cancelled);

    let registry = load_registry(&args.template_root);
    let missing_templates = registry.missing_templates_report(&args.template_root);

    let recognition =
        RecognitionEngine::new(registry, TemplateMatcher::new(0.75), OcrEngine::default(), args.template_root.clone())?;
    let decision_engine = HybridDecisionEngine::new(true, false);
    let mut harness = SelfCheckHarness::new(recognition, decision_engine);

    let fixtures = load_fixtures(&args.fixtures)?;
    log::info!("loaded {} fixtures from {}", fixtures.len(), args.fixtures.display());

    let outcomes = harness.run(&fixtures).await;
    let repeat = harness.run(&fixtures).await;
    let stable = outcomes == repeat;

    let report = harness.build_report(outcomes, stable, missing_templates, String::new());
    std::fs::write(&args.out, report.to_json()?)?;

    log::info!("wrote self-check report to {} ({} fixtures, stable={})", args.out.display(), report.fixture_count, stable);
    Ok(())
}
