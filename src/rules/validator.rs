//! Validates and, where possible, repairs actions against the current
//! `GameState` before they reach the executor.

use crate::action::{Action, ActionKind};
use crate::state::GameState;

const MAX_BOARD_ROWS: i32 = 4;
const MAX_BOARD_COLS: i32 = 7;
const REFRESH_COST: i32 = 2;
const LEVEL_UP_COST: i32 = 4;
const MAX_LEVEL: i32 = 9;

/// Outcome of validating a single action.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub action: Action,
    pub modified_action: Option<Action>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn valid(action: Action) -> Self {
        Self { is_valid: true, action, modified_action: None, error: None, warnings: Vec::new() }
    }

    fn valid_with_warnings(action: Action, warnings: Vec<String>) -> Self {
        Self { is_valid: true, action, modified_action: None, error: None, warnings }
    }

    fn invalid(action: Action, error: impl Into<String>) -> Self {
        Self { is_valid: false, action, modified_action: None, error: Some(error.into()), warnings: Vec::new() }
    }
}

/// Per-kind validation rules, plus a repair path for the two action
/// kinds where a best-effort fix (not merely a rejection) is possible.
pub struct ActionValidator;

impl ActionValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, action: &Action, state: &GameState) -> ValidationResult {
        match action.kind {
            ActionKind::BuyHero => self.validate_buy_hero(action, state),
            ActionKind::SellHero => self.validate_sell_hero(action, state),
            ActionKind::MoveHero => self.validate_move_hero(action, state),
            ActionKind::RefreshShop => self.validate_refresh_shop(action, state),
            ActionKind::LevelUp => self.validate_level_up(action, state),
            ActionKind::EquipItem => self.validate_equip_item(action, state),
            ActionKind::Wait => ValidationResult::valid(action.clone()),
            ActionKind::None => ValidationResult::valid(action.clone()),
            _ => ValidationResult::invalid(action.clone(), format!("no validator registered for {:?}", action.kind)),
        }
    }

    /// Validates, and on failure attempts a repair; if no repair applies,
    /// degrades to a `none_action` carrying the original error message.
    pub fn validate_and_fix(&self, action: &Action, state: &GameState) -> Action {
        let result = self.validate(action, state);
        if result.is_valid {
            return result.action;
        }
        if let Some(fixed) = self.try_fix_action(action, state) {
            return fixed;
        }
        Action::none_action(format!(
            "action rejected: {}",
            result.error.unwrap_or_else(|| "unknown validation failure".to_string())
        ))
    }

    /// Validates a list of actions independently: no attempt is made to
    /// simulate the cumulative effect of earlier actions in the batch on
    /// later ones.
    pub fn batch_validate(&self, actions: &[Action], state: &GameState) -> Vec<ValidationResult> {
        actions.iter().map(|a| self.validate(a, state)).collect()
    }

    fn validate_buy_hero(&self, action: &Action, state: &GameState) -> ValidationResult {
        let Some(target) = action.target.as_deref() else {
            return ValidationResult::invalid(action.clone(), "buy_hero requires a target");
        };
        let Some(position) = action.position.as_ref() else {
            return ValidationResult::invalid(action.clone(), "buy_hero requires a position");
        };
        let Some(&slot_index) = position.first() else {
            return ValidationResult::invalid(action.clone(), "buy_hero position is empty");
        };
        if !(0..5).contains(&slot_index) {
            return ValidationResult::invalid(action.clone(), format!("shop slot {} out of range", slot_index));
        }
        let Some(slot) = state.shop_slots.get(slot_index as usize) else {
            return ValidationResult::invalid(action.clone(), format!("shop slot {} not found", slot_index));
        };
        if slot.sold {
            return ValidationResult::invalid(action.clone(), format!("shop slot {} is already sold", slot_index));
        }
        let mut warnings = Vec::new();
        if slot.hero_name.as_deref() != Some(target) {
            warnings.push(format!(
                "target '{}' does not match shop slot {} hero '{}'",
                target,
                slot_index,
                slot.hero_name.as_deref().unwrap_or("none")
            ));
        }
        if state.gold < slot.cost {
            return ValidationResult::invalid(
                action.clone(),
                format!("insufficient gold: have {}, need {}", state.gold, slot.cost),
            );
        }
        if !state.has_bench_space() {
            warnings.push("bench is full, buy may fail or force an immediate sell".to_string());
        }
        ValidationResult::valid_with_warnings(action.clone(), warnings)
    }

    fn validate_sell_hero(&self, action: &Action, state: &GameState) -> ValidationResult {
        let Some(target) = action.target.as_deref() else {
            return ValidationResult::invalid(action.clone(), "sell_hero requires a target");
        };
        let exists = state.heroes.iter().chain(state.bench_heroes.iter()).any(|h| h.name == target);
        if !exists {
            return ValidationResult::invalid(action.clone(), format!("hero '{}' not found on board or bench", target));
        }
        ValidationResult::valid(action.clone())
    }

    fn validate_move_hero(&self, action: &Action, _state: &GameState) -> ValidationResult {
        if action.target.is_none() {
            return ValidationResult::invalid(action.clone(), "move_hero requires a target");
        }
        let Some(source) = action.source_position.as_ref() else {
            return ValidationResult::invalid(action.clone(), "move_hero requires a source_position");
        };
        let Some(dest) = action.position.as_ref() else {
            return ValidationResult::invalid(action.clone(), "move_hero requires a position");
        };
        if source.len() < 2 || dest.len() < 2 {
            return ValidationResult::invalid(action.clone(), "move_hero positions must have row and col");
        }
        let (row, col) = (dest[0], dest[1]);
        if !(0..MAX_BOARD_ROWS).contains(&row) || !(0..MAX_BOARD_COLS).contains(&col) {
            return ValidationResult::invalid(
                action.clone(),
                format!("destination ({}, {}) is outside the {}x{} board", row, col, MAX_BOARD_ROWS, MAX_BOARD_COLS),
            );
        }
        ValidationResult::valid(action.clone())
    }

    fn validate_refresh_shop(&self, action: &Action, state: &GameState) -> ValidationResult {
        if state.shop_locked {
            return ValidationResult::invalid(action.clone(), "shop is locked");
        }
        if state.gold < REFRESH_COST {
            return ValidationResult::invalid(
                action.clone(),
                format!("insufficient gold: have {}, need {}", state.gold, REFRESH_COST),
            );
        }
        ValidationResult::valid(action.clone())
    }

    fn validate_level_up(&self, action: &Action, state: &GameState) -> ValidationResult {
        if state.level >= MAX_LEVEL {
            return ValidationResult::invalid(action.clone(), format!("already at max level {}", MAX_LEVEL));
        }
        if state.gold < LEVEL_UP_COST {
            return ValidationResult::invalid(
                action.clone(),
                format!("insufficient gold: have {}, need {}", state.gold, LEVEL_UP_COST),
            );
        }
        ValidationResult::valid(action.clone())
    }

    fn validate_equip_item(&self, action: &Action, state: &GameState) -> ValidationResult {
        let Some(target) = action.target.as_deref() else {
            return ValidationResult::invalid(action.clone(), "equip_item requires a target");
        };
        if !state.heroes.iter().any(|h| h.name == target) {
            return ValidationResult::invalid(action.clone(), format!("hero '{}' is not on the board", target));
        }
        ValidationResult::valid(action.clone())
    }

    /// Best-effort repair for the two kinds where the failure is
    /// plausibly just a stale coordinate rather than a genuinely
    /// impossible action. Anything else falls through to `None`.
    fn try_fix_action(&self, action: &Action, state: &GameState) -> Option<Action> {
        match action.kind {
            ActionKind::BuyHero => {
                let target = action.target.as_deref()?;
                let slot = state.shop_slots.iter().find(|s| s.hero_name.as_deref() == Some(target) && !s.sold)?;
                let mut fixed = action.clone();
                fixed.position = Some(vec![slot.index as i32]);
                fixed.confidence *= 0.9;
                Some(fixed)
            }
            ActionKind::MoveHero => {
                let dest = action.position.as_ref()?;
                if dest.len() < 2 {
                    return None;
                }
                let row = dest[0].clamp(0, MAX_BOARD_ROWS - 1);
                let col = dest[1].clamp(0, MAX_BOARD_COLS - 1);
                let mut fixed = action.clone();
                fixed.position = Some(vec![row, col]);
                fixed.confidence *= 0.9;
                Some(fixed)
            }
            _ => None,
        }
    }
}

impl Default for ActionValidator {
    fn default() -> Self {
        Self::new()
    }
}
