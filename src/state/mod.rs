pub mod game_state;

pub use game_state::{GamePhase, GameState, Hero, ShopSlotState, Synergy};
