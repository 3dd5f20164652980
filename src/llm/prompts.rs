//! Prompt construction for the VLM decision path.

use serde_json::Value;

/// The baseline system prompt describing the assistant's role, domain
/// knowledge, and the JSON schema it must reply in.
pub const SYSTEM_PROMPT: &str = "\
You are an assistant playing an auto-battler drafting phase. You observe a screenshot \
of the shop, board, bench, gold, level, and active synergies, and you decide the single \
best next action. Favor efficient gold usage, timely leveling, and completing item and \
hero synergy breakpoints. Reply with a single fenced JSON object:\n\
{\n\
  \"analysis\": \"...\", \"detected_gold\": <int>, \"detected_level\": <int>, \"detected_hp\": <int>,\n\
  \"action_type\": \"buy_hero|sell_hero|move_hero|refresh_shop|level_up|equip_item|wait|none\",\n\
  \"action_target\": \"...\", \"action_position\": [...], \"action_source_position\": [...] | null,\n\
  \"reasoning\": \"...\", \"confidence\": <0..1>\n\
}\n\
Only one action per reply.";

const DECISION_PROMPT_TEMPLATE: &str = "Current game state:\n{game_state_summary}\n\nPhase: {phase}\n\n{priority_instruction}\n\nChoose the single best next action and reply with the JSON schema from the system prompt.";

/// Strategy blurb per priority profile. Profiles only steer the prompt
/// text; they never change rule evaluation.
fn priority_instruction(priority: &str) -> &'static str {
    match priority {
        "save_gold" => "Priority: preserve gold. Avoid buying or refreshing unless it's nearly free or board-critical.",
        "level_up" => "Priority: level aggressively. Prefer LevelUp whenever affordable over other actions.",
        "chase_three" => "Priority: chase three-star upgrades. Prioritize buying the third copy of any hero you hold two of.",
        "protect_hp" => "Priority: protect health. Prefer board-strengthening actions over economy plays.",
        _ => "Priority: balanced play. Weigh economy, board strength, and tempo evenly.",
    }
}

/// Builds a decision prompt from a `GameState`-shaped JSON value (as
/// produced by `GameState::to_context`) and a priority profile name.
pub fn build_decision_prompt(game_state: &Value, priority: &str) -> String {
    let mut summary_parts = Vec::new();
    if let Some(gold) = game_state.get("gold") {
        summary_parts.push(format!("gold: {}", gold));
    }
    if let Some(level) = game_state.get("level") {
        summary_parts.push(format!("level: {}", level));
    }
    if let Some(hp) = game_state.get("hp") {
        summary_parts.push(format!("hp: {}", hp));
    }
    if let Some(round) = game_state.get("round") {
        summary_parts.push(format!("round: {}", round));
    }
    if let Some(board) = game_state.get("heroes_on_board") {
        summary_parts.push(format!("heroes on board: {}", board));
    }
    if let Some(bench) = game_state.get("heroes_on_bench") {
        summary_parts.push(format!("heroes on bench: {}", bench));
    }
    if let Some(synergies) = game_state.get("active_synergies") {
        summary_parts.push(format!("active synergies: {}", synergies));
    }
    let phase = game_state.get("phase").map(|p| p.to_string()).unwrap_or_else(|| "unknown".to_string());

    DECISION_PROMPT_TEMPLATE
        .replace("{game_state_summary}", &summary_parts.join("\n"))
        .replace("{phase}", &phase)
        .replace("{priority_instruction}", priority_instruction(priority))
}

/// Builds a short prompt asking the model to describe a screenshot,
/// without requesting an action.
pub fn build_analysis_prompt() -> &'static str {
    "Describe the current shop, board, bench, gold, level, and active synergies visible in this screenshot."
}

/// Wraps a description of an annotated screenshot's numbered regions so
/// the model can refer to them by id rather than pixel coordinates.
pub fn build_annotation_prompt(annotation_description: &str) -> String {
    format!(
        "The screenshot has numbered regions overlaid: {}. Refer to elements by their number when relevant.",
        annotation_description
    )
}

/// Accumulates custom domain knowledge and game-version context on top
/// of the baseline system prompt, for callers that want to extend it
/// without editing the constant.
pub struct PromptBuilder {
    game_version: String,
    custom_knowledge: Vec<String>,
}

impl PromptBuilder {
    pub fn new(game_version: impl Into<String>) -> Self {
        Self { game_version: game_version.into(), custom_knowledge: Vec::new() }
    }

    pub fn add_custom_knowledge(&mut self, knowledge: impl Into<String>) {
        self.custom_knowledge.push(knowledge.into());
    }

    pub fn build_system_prompt(&self) -> String {
        let mut prompt = format!("{}\nGame version: {}.", SYSTEM_PROMPT, self.game_version);
        if !self.custom_knowledge.is_empty() {
            prompt.push_str("\nAdditional knowledge:\n");
            prompt.push_str(&self.custom_knowledge.join("\n"));
        }
        prompt
    }

    pub fn build_decision_prompt(
        &self,
        game_state: &Value,
        priority: &str,
        annotation_description: Option<&str>,
    ) -> String {
        let base = build_decision_prompt(game_state, priority);
        match annotation_description {
            Some(desc) => format!("{}\n\n{}", build_annotation_prompt(desc), base),
            None => base,
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new("S1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_prompt_includes_priority_instruction() {
        let state = serde_json::json!({"gold": 20, "level": 5, "hp": 80});
        let prompt = build_decision_prompt(&state, "level_up");
        assert!(prompt.contains("gold: 20"));
        assert!(prompt.contains("level aggressively"));
    }

    #[test]
    fn unknown_priority_falls_back_to_balanced() {
        let state = serde_json::json!({});
        let prompt = build_decision_prompt(&state, "nonexistent");
        assert!(prompt.contains("balanced"));
    }

    #[test]
    fn prompt_builder_appends_custom_knowledge() {
        let mut builder = PromptBuilder::new("S13");
        builder.add_custom_knowledge("star_guardian breakpoints are 3/5/7/9");
        let prompt = builder.build_system_prompt();
        assert!(prompt.contains("star_guardian breakpoints"));
        assert!(prompt.contains("S13"));
    }

    #[test]
    fn annotated_decision_prompt_prepends_region_description() {
        let builder = PromptBuilder::default();
        let state = serde_json::json!({});
        let prompt = builder.build_decision_prompt(&state, "balanced", Some("1=shop slot 1"));
        assert!(prompt.starts_with("The screenshot has numbered regions"));
    }
}
