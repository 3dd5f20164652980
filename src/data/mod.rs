//! Static game-data JSON shapes (heroes/items/synergies) and the VLM
//! wire-response schema. These are the serde surface other modules
//! build their in-memory types from; nothing here is mutated at
//! runtime.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One entry of `heroes.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroData {
    pub name: String,
    pub cost: i32,
    #[serde(default)]
    pub synergies: Vec<String>,
}

/// Top-level shape of `heroes.json`: a bare array of hero entries.
pub type HeroDataSet = Vec<HeroData>;

/// One entry of an `items.json` `base_items`/`combined_items` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub name: String,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Top-level shape of `items.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemDataSet {
    #[serde(default)]
    pub base_items: Vec<ItemData>,
    #[serde(default)]
    pub combined_items: Vec<ItemData>,
}

/// One entry of `synergies.json`'s `synergies` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyData {
    #[serde(default)]
    pub breakpoints: Vec<i32>,
    #[serde(default)]
    pub description: String,
}

/// Top-level shape of `synergies.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SynergyDataSet {
    #[serde(default)]
    pub synergies: HashMap<String, SynergyData>,
}

/// The fenced-JSON shape a VLM is asked to reply with. Every field but
/// `action_type` is optional: a reply may only detect state without
/// proposing an action, or vice versa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlmReplyWire {
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub detected_gold: Option<i32>,
    #[serde(default)]
    pub detected_level: Option<i32>,
    #[serde(default)]
    pub detected_hp: Option<i32>,
    pub action_type: String,
    #[serde(default)]
    pub action_target: Option<String>,
    #[serde(default)]
    pub action_position: Option<Vec<i32>>,
    #[serde(default)]
    pub action_source_position: Option<Vec<i32>>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hero_data_set_parses_bare_array() {
        let json = r#"[{"name": "ahri", "cost": 4, "synergies": ["star_guardian"]}]"#;
        let heroes: HeroDataSet = serde_json::from_str(json).unwrap();
        assert_eq!(heroes[0].name, "ahri");
        assert_eq!(heroes[0].cost, 4);
    }

    #[test]
    fn item_data_set_defaults_missing_lists_to_empty() {
        let set: ItemDataSet = serde_json::from_str("{}").unwrap();
        assert!(set.base_items.is_empty());
        assert!(set.combined_items.is_empty());
    }

    #[test]
    fn vlm_reply_wire_tolerates_missing_optional_fields() {
        let json = r#"{"action_type": "wait"}"#;
        let wire: VlmReplyWire = serde_json::from_str(json).unwrap();
        assert_eq!(wire.action_type, "wait");
        assert!(wire.action_target.is_none());
        assert!(wire.confidence.is_none());
    }
}
