//! Combines the quick rule table with an optional VLM fallback into a
//! single decision surface.

use image::RgbImage;

use crate::action::{Action, ActionKind};
use crate::llm::{PromptBuilder, ResponseParser, VlmClient};
use crate::rules::{ActionValidator, QuickActionEngine};
use crate::state::GameState;
use crate::vision::som_annotator::SoMAnnotator;

/// Where a `DecisionResult`'s action came from. Never "unknown": every
/// path through `decide` assigns one of these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Rule,
    Llm,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct DecisionResult {
    pub action: Action,
    pub source: DecisionSource,
    pub llm_analysis: Option<String>,
    pub confidence: f64,
    pub latency_ms: u64,
}

impl DecisionResult {
    fn rule(action: Action) -> Self {
        Self { action, source: DecisionSource::Rule, llm_analysis: None, confidence: 1.0, latency_ms: 0 }
    }

    fn fallback() -> Self {
        Self {
            action: Action::wait(1.0, "no rule matched and no decision is available"),
            source: DecisionSource::Fallback,
            llm_analysis: None,
            confidence: 0.0,
            latency_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionStats {
    pub total_decisions: u64,
    pub rule_decisions: u64,
    pub llm_decisions: u64,
    pub llm_errors: u64,
    pub avg_latency_ms: f64,
}

/// Three-step decision surface: rules first, VLM second, a safe
/// `Wait` fallback last. Priority profiles only alter the VLM prompt;
/// they never change which rule wins.
pub struct HybridDecisionEngine {
    quick_action_engine: QuickActionEngine,
    action_validator: ActionValidator,
    response_parser: ResponseParser,
    prompt_builder: PromptBuilder,
    som_annotator: SoMAnnotator,
    use_som_annotation: bool,
    llm_fallback: bool,
    stats: DecisionStats,
}

impl HybridDecisionEngine {
    pub fn new(use_som_annotation: bool, llm_fallback: bool) -> Self {
        Self {
            quick_action_engine: QuickActionEngine::new(),
            action_validator: ActionValidator::new(),
            response_parser: ResponseParser::new(),
            prompt_builder: PromptBuilder::default(),
            som_annotator: SoMAnnotator::default(),
            use_som_annotation,
            llm_fallback,
            stats: DecisionStats::default(),
        }
    }

    pub fn quick_action_engine_mut(&mut self) -> &mut QuickActionEngine {
        &mut self.quick_action_engine
    }

    pub fn stats(&self) -> DecisionStats {
        self.stats
    }

    /// Runs the three-step algorithm: rules, then (if enabled) a VLM
    /// fallback, then an unconditional `Wait`.
    pub async fn decide(
        &mut self,
        screenshot: &RgbImage,
        state: &GameState,
        priority: &str,
        force_llm: bool,
        vlm_client: Option<&mut VlmClient>,
    ) -> DecisionResult {
        self.stats.total_decisions += 1;

        if !force_llm {
            if let Some(action) = self.quick_action_engine.check_quick_actions(state) {
                let fixed = self.action_validator.validate_and_fix(&action, state);
                if fixed.kind != ActionKind::None {
                    self.stats.rule_decisions += 1;
                    return DecisionResult::rule(fixed);
                }
            }
        }

        if self.llm_fallback {
            if let Some(client) = vlm_client {
                let started = std::time::Instant::now();
                match self.llm_decide(screenshot, state, priority, client).await {
                    Some(mut result) => {
                        result.latency_ms = started.elapsed().as_millis() as u64;
                        self.update_latency_stats(result.latency_ms);
                        self.stats.llm_decisions += 1;
                        return result;
                    }
                    None => {
                        self.stats.llm_errors += 1;
                    }
                }
            }
        }

        DecisionResult::fallback()
    }

    async fn llm_decide(
        &mut self,
        screenshot: &RgbImage,
        state: &GameState,
        priority: &str,
        client: &mut VlmClient,
    ) -> Option<DecisionResult> {
        let annotation_description = if self.use_som_annotation {
            let (_annotated, groups) = self.som_annotator.create_full_annotation(screenshot);
            Some(
                groups
                    .iter()
                    .flat_map(|(label, regions)| regions.iter().map(move |r| format!("{}:{}", label, r.id)))
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        } else {
            None
        };

        let context = state.to_context();
        let prompt = self.prompt_builder.build_decision_prompt(&context, priority, annotation_description.as_deref());
        let system_prompt = self.prompt_builder.build_system_prompt();

        let response = match client.chat_with_image(&prompt, screenshot, Some(&system_prompt)).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("vlm call failed during decision: {}", e);
                return None;
            }
        };

        let parsed = self.response_parser.parse(&response);
        if let Some(error) = parsed.error {
            log::warn!("failed to parse vlm response: {}", error);
            return None;
        }
        let action = parsed.action?;
        let fixed = self.action_validator.validate_and_fix(&action, state);
        Some(DecisionResult {
            action: fixed,
            source: DecisionSource::Llm,
            llm_analysis: Some(parsed.analysis),
            confidence: parsed.confidence,
            latency_ms: 0,
        })
    }

    fn update_latency_stats(&mut self, latency_ms: u64) {
        let total = self.stats.llm_decisions + 1;
        self.stats.avg_latency_ms =
            (self.stats.avg_latency_ms * (total - 1) as f64 + latency_ms as f64) / total as f64;
    }

    pub fn enable_rule(&mut self, name: &str) {
        self.quick_action_engine.enable_rule(name);
    }

    pub fn disable_rule(&mut self, name: &str) {
        self.quick_action_engine.disable_rule(name);
    }
}

impl Default for HybridDecisionEngine {
    fn default() -> Self {
        Self::new(true, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::testing::{MockOutcome, MockVlmBackend};
    use crate::llm::VlmClientConfig;

    fn screenshot() -> RgbImage {
        RgbImage::from_pixel(1920, 1080, image::Rgb([0, 0, 0]))
    }

    #[tokio::test]
    async fn rule_wins_over_llm_when_a_rule_matches() {
        let mut engine = HybridDecisionEngine::new(false, true);
        let mut state = GameState::new();
        state.hp = 15;
        state.gold = 10;
        let result = engine.decide(&screenshot(), &state, "balanced", false, None).await;
        assert_eq!(result.source, DecisionSource::Rule);
        assert_eq!(result.action.kind, ActionKind::LevelUp);
        assert_eq!(result.confidence, 1.0);
    }

    #[tokio::test]
    async fn falls_back_to_wait_when_no_rule_and_no_client() {
        let mut engine = HybridDecisionEngine::new(false, true);
        let state = GameState::new();
        let result = engine.decide(&screenshot(), &state, "balanced", false, None).await;
        assert_eq!(result.source, DecisionSource::Fallback);
        assert_eq!(result.action.kind, ActionKind::Wait);
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn uses_llm_when_no_rule_matches() {
        let mut engine = HybridDecisionEngine::new(false, true);
        let state = GameState::new();
        let backend = MockVlmBackend::new(vec![MockOutcome::Ok(
            r#"```json
{"action_type": "wait", "analysis": "nothing urgent", "confidence": 0.8}
```"#
                .to_string(),
        )]);
        let mut client = VlmClient::new(Box::new(backend), VlmClientConfig::default());
        let result = engine.decide(&screenshot(), &state, "balanced", false, Some(&mut client)).await;
        assert_eq!(result.source, DecisionSource::Llm);
        assert_eq!(result.llm_analysis.as_deref(), Some("nothing urgent"));
    }

    #[tokio::test]
    async fn force_llm_skips_rule_evaluation() {
        let mut engine = HybridDecisionEngine::new(false, true);
        let mut state = GameState::new();
        state.hp = 15;
        state.gold = 10;
        let backend = MockVlmBackend::new(vec![MockOutcome::Ok(
            r#"{"action_type": "refresh_shop", "confidence": 0.7}"#.to_string(),
        )]);
        let mut client = VlmClient::new(Box::new(backend), VlmClientConfig::default());
        let result = engine.decide(&screenshot(), &state, "balanced", true, Some(&mut client)).await;
        assert_eq!(result.source, DecisionSource::Llm);
        assert_eq!(result.action.kind, ActionKind::RefreshShop);
    }
}
