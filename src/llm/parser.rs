//! Turns a VLM's free-form reply into a structured `Action`.
//!
//! Two ordered strategies, with explicit confidence degradation: the
//! primary path extracts a JSON object (fenced first, else the first
//! balanced `{...}` block) and maps it onto the wire schema; if no JSON
//! is found or it fails to deserialize, a secondary keyword-scan path
//! infers an action kind from bilingual keywords at a flat, low
//! confidence.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::action::{Action, ActionKind};
use crate::data::VlmReplyWire;

/// Result of parsing one VLM response.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub raw_text: String,
    pub analysis: String,
    pub action: Option<Action>,
    pub detected_gold: Option<i32>,
    pub detected_level: Option<i32>,
    pub detected_hp: Option<i32>,
    pub error: Option<String>,
    pub confidence: f64,
}

impl ParsedResponse {
    fn error(raw_text: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            analysis: String::new(),
            action: None,
            detected_gold: None,
            detected_level: None,
            detected_hp: None,
            error: Some(error.into()),
            confidence: 0.0,
        }
    }
}

fn action_keyword_table() -> &'static [(&'static str, ActionKind)] {
    static TABLE: OnceLock<Vec<(&'static str, ActionKind)>> = OnceLock::new();
    TABLE
        .get_or_init(|| {
            vec![
                ("buy_hero", ActionKind::BuyHero),
                ("buy", ActionKind::BuyHero),
                ("购买", ActionKind::BuyHero),
                ("sell_hero", ActionKind::SellHero),
                ("sell", ActionKind::SellHero),
                ("出售", ActionKind::SellHero),
                ("move_hero", ActionKind::MoveHero),
                ("move", ActionKind::MoveHero),
                ("移动", ActionKind::MoveHero),
                ("refresh_shop", ActionKind::RefreshShop),
                ("refresh", ActionKind::RefreshShop),
                ("刷新", ActionKind::RefreshShop),
                ("level_up", ActionKind::LevelUp),
                ("level", ActionKind::LevelUp),
                ("升级", ActionKind::LevelUp),
                ("equip_item", ActionKind::EquipItem),
                ("equip", ActionKind::EquipItem),
                ("装备", ActionKind::EquipItem),
                ("wait", ActionKind::Wait),
                ("等待", ActionKind::Wait),
                ("none", ActionKind::None),
                ("无操作", ActionKind::None),
            ]
        })
        .as_slice()
}

fn action_kind_from_str(s: &str) -> ActionKind {
    let lowered = s.to_lowercase();
    action_keyword_table()
        .iter()
        .find(|(kw, _)| *kw == lowered)
        .map(|(_, kind)| *kind)
        .unwrap_or(ActionKind::None)
}

/// Parses structured-or-free-form VLM output into an `Action`.
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, response_text: &str) -> ParsedResponse {
        match extract_json_object(response_text) {
            Some(json_str) => match serde_json::from_str::<VlmReplyWire>(&json_str) {
                Ok(wire) => self.parse_wire_response(response_text, wire),
                Err(_) => self.parse_unstructured_response(response_text),
            },
            None => self.parse_unstructured_response(response_text),
        }
    }

    /// Applies an expected-type whitelist: an action type outside the
    /// expected set is kept but its confidence is halved, flagging it as
    /// unexpected rather than silently discarding it.
    pub fn parse_with_validation(&self, response_text: &str, expected_types: &[ActionKind]) -> ParsedResponse {
        let mut parsed = self.parse(response_text);
        if let Some(action) = &parsed.action {
            if !expected_types.contains(&action.kind) {
                parsed.confidence *= 0.5;
                if let Some(action) = parsed.action.as_mut() {
                    action.confidence *= 0.5;
                }
            }
        }
        parsed
    }

    fn parse_wire_response(&self, raw_text: &str, wire: VlmReplyWire) -> ParsedResponse {
        let kind = action_kind_from_str(&wire.action_type);
        let confidence = wire.confidence.unwrap_or(0.9);
        let action = build_action_from_wire(kind, &wire, confidence);
        ParsedResponse {
            raw_text: raw_text.to_string(),
            analysis: wire.analysis.unwrap_or_default(),
            action,
            detected_gold: wire.detected_gold,
            detected_level: wire.detected_level,
            detected_hp: wire.detected_hp,
            error: None,
            confidence,
        }
    }

    fn parse_unstructured_response(&self, raw_text: &str) -> ParsedResponse {
        let lowered = raw_text.to_lowercase();
        let matched = action_keyword_table().iter().find(|(kw, _)| lowered.contains(kw));
        let Some((keyword, kind)) = matched else {
            return ParsedResponse::error(raw_text, "no JSON and no recognizable action keyword in response");
        };
        let target = extract_target(raw_text, keyword);
        let mut action = bare_action_for_kind(*kind, target, truncate_chars(raw_text, 200));
        action.confidence = 0.5;
        ParsedResponse {
            raw_text: raw_text.to_string(),
            analysis: truncate_chars(raw_text, 200),
            action: Some(action),
            detected_gold: None,
            detected_level: None,
            detected_hp: None,
            error: None,
            confidence: 0.5,
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

fn build_action_from_wire(kind: ActionKind, wire: &VlmReplyWire, confidence: f64) -> Option<Action> {
    let reasoning = wire.reasoning.clone().unwrap_or_default();
    let mut action = match kind {
        ActionKind::BuyHero => {
            let target = wire.action_target.clone()?;
            let slot = wire.action_position.as_ref().and_then(|p| p.first()).copied().unwrap_or(0);
            Action::buy_hero(target, slot, reasoning)
        }
        ActionKind::SellHero => {
            let target = wire.action_target.clone()?;
            let pos = wire.action_position.as_ref()?;
            Action::sell_hero(target, (*pos.first()?, *pos.get(1).unwrap_or(&-1)), reasoning)
        }
        ActionKind::MoveHero => {
            let target = wire.action_target.clone()?;
            let from = wire.action_source_position.as_ref()?;
            let to = wire.action_position.as_ref()?;
            Action::move_hero(
                target,
                (*from.first()?, *from.get(1).unwrap_or(&0)),
                (*to.first()?, *to.get(1).unwrap_or(&0)),
                reasoning,
            )
        }
        ActionKind::RefreshShop => Action::refresh_shop(reasoning),
        ActionKind::LevelUp => Action::level_up(reasoning),
        ActionKind::Wait => Action::wait(1.0, reasoning),
        ActionKind::EquipItem => {
            let target = wire.action_target.clone()?;
            let mut action = Action::none_action(reasoning);
            action.kind = ActionKind::EquipItem;
            action.target = Some(target);
            action.position = wire.action_position.clone();
            action
        }
        _ => Action::none_action(reasoning),
    };
    action.confidence = confidence;
    Some(action)
}

fn bare_action_for_kind(kind: ActionKind, target: Option<String>, reasoning: String) -> Action {
    match kind {
        ActionKind::BuyHero => Action::buy_hero(target.unwrap_or_default(), 0, reasoning),
        ActionKind::SellHero => Action::sell_hero(target.unwrap_or_default(), (0, -1), reasoning),
        ActionKind::MoveHero => Action::move_hero(target.unwrap_or_default(), (0, 0), (0, 0), reasoning),
        ActionKind::RefreshShop => Action::refresh_shop(reasoning),
        ActionKind::LevelUp => Action::level_up(reasoning),
        ActionKind::Wait => Action::wait(1.0, reasoning),
        _ => Action::none_action(reasoning),
    }
}

fn extract_target(text: &str, keyword: &str) -> Option<String> {
    static CACHE: OnceLock<std::sync::Mutex<HashMap<String, Regex>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| std::sync::Mutex::new(HashMap::new()));
    let mut guard = cache.lock().unwrap();
    let pattern = guard.entry(keyword.to_string()).or_insert_with(|| {
        let escaped = regex::escape(keyword);
        Regex::new(&format!(r#"{}["\s]+([^"，。\n]+)"#, escaped)).expect("valid target regex")
    });
    pattern.captures(text).map(|c| c[1].trim().to_string())
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// First fenced ```json ... ``` block, else the first balanced
/// `{...}` block found by tracking brace depth (not a greedy regex,
/// which would over-match across multiple top-level objects).
fn extract_json_object(text: &str) -> Option<String> {
    if let Some(fenced) = extract_fenced_json(text) {
        return Some(fenced);
    }
    extract_balanced_braces(text)
}

fn extract_fenced_json(text: &str) -> Option<String> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let re = FENCE.get_or_init(|| Regex::new(r"```json\s*([\s\S]*?)```").expect("valid fence regex"));
    re.captures(text).map(|c| c[1].trim().to_string())
}

fn extract_balanced_braces(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        let ch = byte as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(text[start..end].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Free-function entry point mirroring the module's primary use case.
pub fn parse_llm_response(response_text: &str) -> ParsedResponse {
    ResponseParser::new().parse(response_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json_action() {
        let text = r#"Here is my plan:
```json
{"analysis": "shop has ahri", "action_type": "buy_hero", "action_target": "ahri", "action_position": [2], "reasoning": "cheap copy", "confidence": 0.9}
```
"#;
        let parsed = ResponseParser::new().parse(text);
        let action = parsed.action.unwrap();
        assert_eq!(action.kind, ActionKind::BuyHero);
        assert_eq!(action.target.as_deref(), Some("ahri"));
        assert_eq!(action.position, Some(vec![2]));
    }

    #[test]
    fn extracts_first_balanced_object_ignoring_nested_nonjson_braces() {
        let text = r#"random text { "a": 1 } trailing {not json"#;
        let extracted = extract_json_object(text).unwrap();
        assert_eq!(extracted, r#"{ "a": 1 }"#);
    }

    #[test]
    fn balanced_brace_extraction_handles_braces_inside_strings() {
        let text = r#"prefix {"reasoning": "use { carefully }", "action_type": "wait"} suffix"#;
        let extracted = extract_json_object(text).unwrap();
        assert!(extracted.ends_with("\"wait\"}"));
    }

    #[test]
    fn falls_back_to_keyword_scan_without_json() {
        let parsed = ResponseParser::new().parse("I think we should refresh the shop now");
        let action = parsed.action.unwrap();
        assert_eq!(action.kind, ActionKind::RefreshShop);
        assert_eq!(action.confidence, 0.5);
    }

    #[test]
    fn bilingual_keyword_is_recognized() {
        let parsed = ResponseParser::new().parse("建议购买 ahri 补强阵容");
        let action = parsed.action.unwrap();
        assert_eq!(action.kind, ActionKind::BuyHero);
    }

    #[test]
    fn unparseable_response_surfaces_error() {
        let parsed = ResponseParser::new().parse("static noise with no useful content");
        assert!(parsed.action.is_none());
        assert!(parsed.error.is_some());
    }

    #[test]
    fn parse_with_validation_degrades_confidence_for_unexpected_type() {
        let text = r#"```json
{"action_type": "wait", "confidence": 0.9}
```"#;
        let parsed = ResponseParser::new().parse_with_validation(text, &[ActionKind::BuyHero]);
        assert!(parsed.confidence < 0.9);
    }
}
