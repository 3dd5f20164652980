//! The aggregate game state read by rules/decision/validator components.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::vision::recognition_engine::RecognizedEntity;
use crate::vision::regions::RegionCatalog;
use crate::vision::template_registry::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Loading,
    Preparation,
    Combat,
    Carousel,
    Settlement,
    Unknown,
}

impl Default for GamePhase {
    fn default() -> Self {
        Self::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    pub name: String,
    pub cost: i32,
    pub stars: i32,
    pub level: i32,
    pub synergies: Vec<String>,
    pub position: Option<(i32, i32)>,
    pub items: Vec<String>,
}

impl Hero {
    pub fn new(name: impl Into<String>, cost: i32) -> Self {
        Self {
            name: name.into(),
            cost,
            stars: 1,
            level: 1,
            synergies: Vec::new(),
            position: None,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synergy {
    pub name: String,
    pub count: i32,
    pub breakpoints: Vec<i32>,
    pub active: bool,
    pub next_breakpoint: Option<i32>,
}

impl Synergy {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), count: 1, breakpoints: Vec::new(), active: true, next_breakpoint: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopSlotState {
    pub index: usize,
    pub hero_name: Option<String>,
    pub cost: i32,
    pub sold: bool,
}

impl ShopSlotState {
    pub fn empty(index: usize) -> Self {
        Self { index, hero_name: None, cost: 0, sold: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub phase: GamePhase,
    pub round_number: i32,
    pub stage: i32,

    pub gold: i32,
    pub hp: i32,
    pub level: i32,
    pub exp: i32,
    pub exp_to_level: i32,

    pub heroes: Vec<Hero>,
    pub bench_heroes: Vec<Hero>,
    pub synergies: HashMap<String, Synergy>,

    pub shop_slots: Vec<ShopSlotState>,
    pub shop_locked: bool,
    pub can_refresh: bool,

    pub available_items: Vec<String>,
    pub opponents_hp: HashMap<String, i32>,

    pub timestamp: f64,
    pub confidence: f64,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            phase: GamePhase::default(),
            round_number: 0,
            stage: 0,
            gold: 0,
            hp: 100,
            level: 1,
            exp: 0,
            exp_to_level: 0,
            heroes: Vec::new(),
            bench_heroes: Vec::new(),
            synergies: HashMap::new(),
            shop_slots: (0..5).map(ShopSlotState::empty).collect(),
            shop_locked: false,
            can_refresh: true,
            available_items: Vec::new(),
            opponents_hp: HashMap::new(),
            timestamp: 0.0,
            confidence: 1.0,
        }
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hero_count(&self, name: &str) -> usize {
        self.heroes.iter().filter(|h| h.name == name).count()
            + self.bench_heroes.iter().filter(|h| h.name == name).count()
    }

    pub fn total_hero_count(&self) -> usize {
        self.heroes.len()
    }

    pub fn max_hero_count(&self) -> i32 {
        self.level
    }

    pub fn can_add_hero(&self) -> bool {
        (self.total_hero_count() as i32) < self.max_hero_count()
    }

    pub fn bench_slots_used(&self) -> usize {
        self.bench_heroes.len()
    }

    pub fn has_bench_space(&self) -> bool {
        self.bench_heroes.len() < 9
    }

    pub fn synergy_progress(&self, name: &str) -> Option<&Synergy> {
        self.synergies.get(name)
    }

    pub fn active_synergies(&self) -> Vec<String> {
        self.synergies.iter().filter(|(_, s)| s.active).map(|(name, _)| name.clone()).collect()
    }

    /// Serializable context for an LLM prompt.
    pub fn to_context(&self) -> serde_json::Value {
        serde_json::json!({
            "phase": self.phase,
            "round": format!("{}-{}", self.stage, self.round_number),
            "gold": self.gold,
            "hp": self.hp,
            "level": self.level,
            "exp": format!("{}/{}", self.exp, self.exp_to_level),
            "heroes_on_board": self.heroes.iter().map(|h| h.name.clone()).collect::<Vec<_>>(),
            "heroes_on_bench": self.bench_heroes.iter().map(|h| h.name.clone()).collect::<Vec<_>>(),
            "active_synergies": self.active_synergies(),
            "shop": self.shop_slots.iter().map(|s| serde_json::json!({
                "slot": s.index, "hero": s.hero_name, "cost": s.cost,
            })).collect::<Vec<_>>(),
        })
    }

    /// Bulk mutator applying this tick's recognition results. Each facet
    /// is independently optional: omitted facets leave the prior state
    /// untouched. Costs are not resolvable from vision alone and are set
    /// to the `0` sentinel (filled in elsewhere from static game data).
    pub fn update_from_recognition(
        &mut self,
        shop_entities: Option<&[Option<RecognizedEntity>]>,
        board_entities: Option<&[RecognizedEntity]>,
        bench_entities: Option<&[Option<RecognizedEntity>]>,
        synergy_entities: Option<&[RecognizedEntity]>,
        item_entities: Option<&[RecognizedEntity]>,
    ) {
        if let Some(shop) = shop_entities {
            for (i, entity) in shop.iter().enumerate() {
                if i >= self.shop_slots.len() {
                    break;
                }
                match entity {
                    Some(e) => {
                        self.shop_slots[i].hero_name = Some(e.id.clone());
                        self.shop_slots[i].cost = 0;
                        self.shop_slots[i].sold = false;
                    }
                    None => {
                        self.shop_slots[i].hero_name = None;
                        self.shop_slots[i].cost = 0;
                        self.shop_slots[i].sold = true;
                    }
                }
            }
        }

        if let Some(board) = board_entities {
            self.heroes.clear();
            let (board_x, board_y, cell_w, cell_h) = RegionCatalog::board_geometry();
            for entity in board {
                if entity.kind != EntityKind::Hero {
                    continue;
                }
                let col = (entity.bbox_global.0 - board_x).div_euclid(cell_w as i32);
                let row = (entity.bbox_global.1 - board_y).div_euclid(cell_h as i32);
                let position = if (0..=3).contains(&row) && (0..=6).contains(&col) {
                    Some((row, col))
                } else {
                    None
                };
                let mut hero = Hero::new(entity.id.clone(), 0);
                hero.position = position;
                self.heroes.push(hero);
            }
        }

        if let Some(bench) = bench_entities {
            self.bench_heroes.clear();
            for entity in bench.iter().flatten() {
                if entity.kind != EntityKind::Hero {
                    continue;
                }
                self.bench_heroes.push(Hero::new(entity.id.clone(), 0));
            }
        }

        if let Some(synergies) = synergy_entities {
            for entity in synergies {
                if entity.kind != EntityKind::Synergy {
                    continue;
                }
                self.synergies
                    .entry(entity.id.clone())
                    .and_modify(|s| s.active = true)
                    .or_insert_with(|| Synergy::new(entity.id.clone()));
            }
        }

        if let Some(items) = item_entities {
            self.available_items =
                items.iter().filter(|e| e.kind == EntityKind::Item).map(|e| e.id.clone()).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::recognition_engine::RecognitionMethod;

    fn entity(kind: EntityKind, id: &str, bbox: (i32, i32, i32, i32)) -> RecognizedEntity {
        RecognizedEntity {
            kind,
            id: id.to_string(),
            confidence: 0.9,
            method: RecognitionMethod::Template,
            bbox_global: bbox,
            slot_index: None,
        }
    }

    #[test]
    fn default_state_has_five_empty_shop_slots() {
        let state = GameState::new();
        assert_eq!(state.shop_slots.len(), 5);
        assert!(state.shop_slots.iter().all(|s| s.sold));
    }

    #[test]
    fn shop_update_sets_cost_zero_sentinel() {
        let mut state = GameState::new();
        let shop = vec![Some(entity(EntityKind::Hero, "ahri", (0, 0, 10, 10))), None, None, None, None];
        state.update_from_recognition(Some(&shop), None, None, None, None);
        assert_eq!(state.shop_slots[0].hero_name.as_deref(), Some("ahri"));
        assert_eq!(state.shop_slots[0].cost, 0);
        assert!(!state.shop_slots[0].sold);
        assert!(state.shop_slots[1].sold);
    }

    #[test]
    fn synergy_update_never_deactivates_absent_synergies() {
        let mut state = GameState::new();
        state.synergies.insert("star_guardian".to_string(), Synergy::new("star_guardian"));
        // an empty recognition tick (synergy not currently visible) must
        // leave the prior active flag untouched
        state.update_from_recognition(None, None, None, Some(&[]), None);
        assert!(state.synergies.get("star_guardian").unwrap().active);
    }

    #[test]
    fn board_update_computes_row_col_from_bbox() {
        let mut state = GameState::new();
        let (board_x, board_y, cell_w, cell_h) = RegionCatalog::board_geometry();
        let bbox = (board_x + cell_w as i32, board_y + 2 * cell_h as i32, board_x + 2 * cell_w as i32, board_y + 3 * cell_h as i32);
        let board = vec![entity(EntityKind::Hero, "lux", bbox)];
        state.update_from_recognition(None, Some(&board), None, None, None);
        assert_eq!(state.heroes[0].position, Some((2, 1)));
    }

    #[test]
    fn can_add_hero_respects_level_cap() {
        let mut state = GameState::new();
        state.level = 1;
        state.heroes.push(Hero::new("ahri", 1));
        assert!(!state.can_add_hero());
    }
}
