//! The action algebra: what can be done, and at what priority.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Every kind of operation the control layer can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    BuyHero,
    SellHero,
    MoveHero,
    RefreshShop,
    LockShop,
    LevelUp,
    EquipItem,
    UnequipItem,
    CombineItems,
    DeployHero,
    RecallHero,
    Wait,
    None,
}

/// Scheduling priority; higher values execute first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum ActionPriority {
    Background = 0,
    Low = 25,
    Normal = 50,
    High = 75,
    Critical = 100,
}

impl ActionPriority {
    pub fn value(&self) -> i32 {
        *self as i32
    }
}

/// A single executable game operation, with the provenance and
/// confidence needed for downstream validation and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub target: Option<String>,
    pub position: Option<Vec<i32>>,
    pub source_position: Option<Vec<i32>>,
    pub priority: ActionPriority,
    pub reasoning: String,
    pub confidence: f64,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Action {
    fn bare(kind: ActionKind, priority: ActionPriority) -> Self {
        Self {
            kind,
            target: None,
            position: None,
            source_position: None,
            priority,
            reasoning: String::new(),
            confidence: 1.0,
            metadata: HashMap::new(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn buy_hero(hero_name: impl Into<String>, slot_index: i32, reasoning: impl Into<String>) -> Self {
        Self {
            target: Some(hero_name.into()),
            position: Some(vec![slot_index]),
            ..Self::bare(ActionKind::BuyHero, ActionPriority::High).with_reasoning(reasoning)
        }
    }

    pub fn sell_hero(hero_name: impl Into<String>, position: (i32, i32), reasoning: impl Into<String>) -> Self {
        Self {
            target: Some(hero_name.into()),
            position: Some(vec![position.0, position.1]),
            ..Self::bare(ActionKind::SellHero, ActionPriority::Low).with_reasoning(reasoning)
        }
    }

    pub fn move_hero(
        hero_name: impl Into<String>,
        from_pos: (i32, i32),
        to_pos: (i32, i32),
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            target: Some(hero_name.into()),
            source_position: Some(vec![from_pos.0, from_pos.1]),
            position: Some(vec![to_pos.0, to_pos.1]),
            ..Self::bare(ActionKind::MoveHero, ActionPriority::Normal).with_reasoning(reasoning)
        }
    }

    pub fn refresh_shop(reasoning: impl Into<String>) -> Self {
        Self::bare(ActionKind::RefreshShop, ActionPriority::Normal).with_reasoning(reasoning)
    }

    pub fn level_up(reasoning: impl Into<String>) -> Self {
        Self::bare(ActionKind::LevelUp, ActionPriority::High).with_reasoning(reasoning)
    }

    pub fn wait(duration_secs: f64, reasoning: impl Into<String>) -> Self {
        let mut action = Self::bare(ActionKind::Wait, ActionPriority::Background).with_reasoning(reasoning);
        action.metadata.insert("duration".to_string(), serde_json::json!(duration_secs));
        action
    }

    pub fn none_action(reasoning: impl Into<String>) -> Self {
        Self::bare(ActionKind::None, ActionPriority::Background).with_reasoning(reasoning)
    }

    pub fn duration_secs(&self) -> f64 {
        self.metadata.get("duration").and_then(|v| v.as_f64()).unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classmethod_constructors_set_expected_priority() {
        assert_eq!(Action::buy_hero("ahri", 0, "").priority, ActionPriority::High);
        assert_eq!(Action::sell_hero("ahri", (0, 0), "").priority, ActionPriority::Low);
        assert_eq!(Action::move_hero("ahri", (0, 0), (1, 1), "").priority, ActionPriority::Normal);
        assert_eq!(Action::refresh_shop("").priority, ActionPriority::Normal);
        assert_eq!(Action::level_up("").priority, ActionPriority::High);
        assert_eq!(Action::wait(2.0, "").priority, ActionPriority::Background);
        assert_eq!(Action::none_action("").priority, ActionPriority::Background);
    }

    #[test]
    fn priority_ordering_matches_numeric_values() {
        assert!(ActionPriority::Critical > ActionPriority::High);
        assert!(ActionPriority::High > ActionPriority::Normal);
        assert!(ActionPriority::Normal > ActionPriority::Low);
        assert!(ActionPriority::Low > ActionPriority::Background);
    }

    #[test]
    fn wait_duration_roundtrips_through_metadata() {
        let action = Action::wait(3.5, "cooldown");
        assert!((action.duration_secs() - 3.5).abs() < 1e-9);
    }
}
