//! Fast, deterministic rules evaluated before any LLM fallback.
//!
//! Rules are plain value records (name, priority, predicate, factory) held
//! in a `Vec` rather than as trait objects or subclasses: there is no
//! per-rule state beyond the closures themselves, and a flat table is
//! easier to reorder and unit-test than a class hierarchy would be.

use crate::action::{Action, ActionPriority};
use crate::state::GameState;

type Predicate = fn(&GameState) -> bool;
type Factory = fn(&GameState) -> Action;

/// A single quick-action rule: a name, a condition, and the action to
/// build when that condition holds.
pub struct QuickActionRule {
    pub name: &'static str,
    pub description: &'static str,
    pub priority: ActionPriority,
    pub enabled: bool,
    condition: Predicate,
    factory: Factory,
}

impl QuickActionRule {
    pub fn new(
        name: &'static str,
        description: &'static str,
        priority: ActionPriority,
        condition: Predicate,
        factory: Factory,
    ) -> Self {
        Self { name, description, priority, enabled: true, condition, factory }
    }

    fn matches(&self, state: &GameState) -> bool {
        self.enabled && (self.condition)(state)
    }

    fn build(&self, state: &GameState) -> Action {
        let mut action = (self.factory)(state);
        action.metadata.insert("rule_name".to_string(), serde_json::json!(self.name));
        action
    }
}

/// Evaluates the registered rules against a `GameState`, highest priority
/// first, and returns the first match (or all matches, for callers that
/// want the full ranked list).
pub struct QuickActionEngine {
    rules: Vec<QuickActionRule>,
}

impl QuickActionEngine {
    pub fn new() -> Self {
        let mut engine = Self { rules: Vec::new() };
        engine.register_default_rules();
        engine
    }

    fn register_default_rules(&mut self) {
        self.register_rule(QuickActionRule::new(
            "auto_free_refresh",
            "Refresh the shop when affordable and nothing in it is already owned",
            ActionPriority::Normal,
            should_refresh,
            |_state| Action::refresh_shop("no owned heroes in shop, refreshing"),
        ));
        self.register_rule(QuickActionRule::new(
            "auto_buy_for_three_star",
            "Buy a shop copy that would complete a three-star upgrade",
            ActionPriority::High,
            can_complete_three_star,
            create_buy_action_for_three_star,
        ));
        self.register_rule(QuickActionRule::new(
            "emergency_level_up",
            "Level up immediately when HP is critically low",
            ActionPriority::Critical,
            |state| state.hp <= 30 && state.gold >= LEVEL_UP_COST && state.level < 9,
            |_state| Action::level_up("hp critical, leveling up for board strength"),
        ));
        self.register_rule(QuickActionRule::new(
            "auto_buy_needed_hero",
            "Buy an affordable shop hero when there's room on the board",
            ActionPriority::High,
            has_needed_hero_in_shop,
            create_buy_needed_hero_action,
        ));
        self.register_rule(QuickActionRule::new(
            "auto_sell_extra_hero",
            "Sell a duplicate single-copy bench hero to free up space",
            ActionPriority::Low,
            has_sellable_hero,
            create_sell_action,
        ));
    }

    pub fn register_rule(&mut self, rule: QuickActionRule) {
        self.rules.push(rule);
    }

    pub fn enable_rule(&mut self, name: &str) {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.name == name) {
            rule.enabled = true;
        }
    }

    pub fn disable_rule(&mut self, name: &str) {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.name == name) {
            rule.enabled = false;
        }
    }

    /// Returns the highest-priority matching rule's action, if any.
    /// A rule whose factory panics is caught and skipped rather than
    /// bringing down the tick.
    pub fn check_quick_actions(&self, state: &GameState) -> Option<Action> {
        let mut candidates: Vec<&QuickActionRule> =
            self.rules.iter().filter(|r| r.matches(state)).collect();
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
        for rule in candidates {
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| rule.build(state))) {
                Ok(action) => return Some(action),
                Err(_) => {
                    log::warn!("quick action rule '{}' panicked while building its action", rule.name);
                    continue;
                }
            }
        }
        None
    }

    /// All matching rules' actions, ranked by priority descending. A
    /// supplement to `check_quick_actions` for callers that want the
    /// full ranked list rather than only the winner.
    pub fn matching_rules(&self, state: &GameState) -> Vec<Action> {
        let mut candidates: Vec<&QuickActionRule> =
            self.rules.iter().filter(|r| r.matches(state)).collect();
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
        candidates
            .into_iter()
            .filter_map(|rule| {
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| rule.build(state))).ok()
            })
            .collect()
    }
}

impl Default for QuickActionEngine {
    fn default() -> Self {
        Self::new()
    }
}

const REFRESH_COST: i32 = 2;
const LEVEL_UP_COST: i32 = 4;
const THREE_STAR_COST_CAP: i32 = 3;

fn should_refresh(state: &GameState) -> bool {
    if !state.can_refresh || state.gold < REFRESH_COST {
        return false;
    }
    let owned: Vec<&str> = state
        .heroes
        .iter()
        .chain(state.bench_heroes.iter())
        .map(|h| h.name.as_str())
        .collect();
    !state
        .shop_slots
        .iter()
        .filter_map(|s| s.hero_name.as_deref())
        .any(|name| owned.contains(&name))
}

fn can_complete_three_star(state: &GameState) -> bool {
    find_three_star_candidate(state).is_some()
}

fn create_buy_action_for_three_star(state: &GameState) -> Action {
    let (slot_index, hero_name) = find_three_star_candidate(state).expect("matches() already confirmed");
    Action::buy_hero(hero_name, slot_index, "completes a three-star upgrade")
}

fn find_three_star_candidate(state: &GameState) -> Option<(i32, String)> {
    state.shop_slots.iter().find_map(|slot| {
        let hero_name = slot.hero_name.as_ref()?;
        if slot.sold {
            return None;
        }
        if slot.cost > THREE_STAR_COST_CAP || state.gold < slot.cost {
            return None;
        }
        if state.hero_count(hero_name) == 2 {
            Some((slot.index as i32, hero_name.clone()))
        } else {
            None
        }
    })
}

fn has_needed_hero_in_shop(state: &GameState) -> bool {
    find_needed_hero_candidate(state).is_some()
}

fn create_buy_needed_hero_action(state: &GameState) -> Action {
    let (slot_index, hero_name) = find_needed_hero_candidate(state).expect("matches() already confirmed");
    Action::buy_hero(hero_name, slot_index, "affordable hero, board has room")
}

/// Only checks affordability and board room, not whether the hero is
/// strategically useful: the heuristic deliberately stays simple.
fn find_needed_hero_candidate(state: &GameState) -> Option<(i32, String)> {
    if !state.can_add_hero() || state.gold < 1 {
        return None;
    }
    state.shop_slots.iter().find_map(|slot| {
        let hero_name = slot.hero_name.as_ref()?;
        if slot.sold || state.gold < slot.cost {
            return None;
        }
        Some((slot.index as i32, hero_name.clone()))
    })
}

fn has_sellable_hero(state: &GameState) -> bool {
    find_sellable_hero(state).is_some()
}

fn create_sell_action(state: &GameState) -> Action {
    let (index, hero_name) = find_sellable_hero(state).expect("matches() already confirmed");
    Action::sell_hero(hero_name, (index as i32, -1), "duplicate single-copy bench hero, freeing space")
}

fn find_sellable_hero(state: &GameState) -> Option<(usize, String)> {
    if state.has_bench_space() {
        return None;
    }
    state.bench_heroes.iter().enumerate().find_map(|(i, hero)| {
        if state.hero_count(&hero.name) == 1 {
            Some((i, hero.name.clone()))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Hero, ShopSlotState};

    fn slot(index: usize, hero: &str, cost: i32) -> ShopSlotState {
        ShopSlotState { index, hero_name: Some(hero.to_string()), cost, sold: false }
    }

    #[test]
    fn emergency_level_up_beats_everything_when_hp_critical() {
        let mut state = GameState::new();
        state.hp = 15;
        state.gold = 10;
        let engine = QuickActionEngine::new();
        let action = engine.check_quick_actions(&state).unwrap();
        assert_eq!(action.kind, crate::action::ActionKind::LevelUp);
    }

    #[test]
    fn auto_buy_needed_hero_only_checks_affordability() {
        let mut state = GameState::new();
        state.gold = 3;
        state.hp = 100;
        state.shop_slots = vec![slot(0, "ahri", 3)];
        let engine = QuickActionEngine::new();
        let action = engine.check_quick_actions(&state).unwrap();
        assert_eq!(action.kind, crate::action::ActionKind::BuyHero);
        assert_eq!(action.target.as_deref(), Some("ahri"));
    }

    #[test]
    fn disabled_rule_is_skipped() {
        let mut state = GameState::new();
        state.hp = 15;
        state.gold = 10;
        let mut engine = QuickActionEngine::new();
        engine.disable_rule("emergency_level_up");
        let action = engine.check_quick_actions(&state);
        assert!(action.is_none() || action.unwrap().kind != crate::action::ActionKind::LevelUp);
    }

    fn full_bench_with_one_singleton() -> Vec<Hero> {
        let mut bench: Vec<Hero> = (0..8).map(|i| Hero::new(format!("filler{i}"), 1)).collect();
        bench.push(Hero::new("lux", 2));
        bench
    }

    #[test]
    fn auto_sell_extra_hero_targets_single_copy_bench_hero_when_bench_full() {
        let mut state = GameState::new();
        state.hp = 100;
        state.gold = 0;
        state.bench_heroes = full_bench_with_one_singleton();
        let engine = QuickActionEngine::new();
        let action = engine.check_quick_actions(&state).unwrap();
        assert_eq!(action.kind, crate::action::ActionKind::SellHero);
        assert_eq!(action.target.as_deref(), Some("lux"));
    }

    #[test]
    fn auto_sell_extra_hero_does_not_fire_with_bench_space() {
        let mut state = GameState::new();
        state.hp = 100;
        state.gold = 0;
        state.bench_heroes.push(Hero::new("lux", 2));
        let engine = QuickActionEngine::new();
        let action = engine.check_quick_actions(&state);
        assert!(action.is_none());
    }

    #[test]
    fn matching_rules_returns_ranked_list() {
        let mut state = GameState::new();
        state.hp = 15;
        state.gold = 10;
        state.bench_heroes = full_bench_with_one_singleton();
        let engine = QuickActionEngine::new();
        let all = engine.matching_rules(&state);
        assert!(all.len() >= 2);
        assert_eq!(all[0].kind, crate::action::ActionKind::LevelUp);
    }
}
