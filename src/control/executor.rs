//! Translates a validated `Action` into platform input, scaled to the
//! current window resolution and lightly humanized.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::action::{Action, ActionKind};
use crate::error::ExecutionError;
use crate::geometry::transform::{CoordinateTransform, Size};
use crate::platform::{MouseButton, PlatformAdapter};

const BASE_SIZE: Size = Size { width: 1920, height: 1080 };

/// Base-resolution anchor points the executor issues input against.
/// These are independent of `vision::regions`' recognition-time
/// layout: they mark where a click lands, not where a template is
/// searched for.
struct ReferenceCoords;

impl ReferenceCoords {
    const SHOP_SLOTS: [(f64, f64); 5] = [(380.0, 1000.0), (670.0, 1000.0), (960.0, 1000.0), (1250.0, 1000.0), (1540.0, 1000.0)];
    const REFRESH_BUTTON: (f64, f64) = (200.0, 1000.0);
    const LEVEL_UP_BUTTON: (f64, f64) = (200.0, 930.0);
    const BOARD_ORIGIN: (f64, f64) = (200.0, 400.0);
    const BOARD_CELL_SIZE: (f64, f64) = (80.0, 80.0);

    fn bench_slot(index: i32) -> (f64, f64) {
        (200.0 + index as f64 * 80.0, 820.0)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub action: Action,
    pub error: Option<String>,
    pub latency_ms: u64,
}

/// Humanization jitter applied to each click point: independent of
/// window scale, since it models pointer imprecision, not layout.
const JITTER_X: i32 = 10;
const JITTER_Y: i32 = 5;

pub struct ActionExecutor {
    adapter: Box<dyn PlatformAdapter>,
    transform: CoordinateTransform,
    humanize: bool,
    random_delay_range: (f64, f64),
    rng: SmallRng,
    total_actions: u64,
    successful_actions: u64,
    failed_actions: u64,
}

impl ActionExecutor {
    pub fn new(
        adapter: Box<dyn PlatformAdapter>,
        resolution: Option<(u32, u32)>,
        humanize: bool,
        rng_seed: u64,
    ) -> Result<Self, ExecutionError> {
        let (width, height) = resolution.unwrap_or((1920, 1080));
        let transform = CoordinateTransform::new(BASE_SIZE, Size::new(width, height), None)
            .map_err(|_| ExecutionError::UnknownAction)?;
        Ok(Self {
            adapter,
            transform,
            humanize,
            random_delay_range: (0.05, 0.2),
            rng: SmallRng::seed_from_u64(rng_seed),
            total_actions: 0,
            successful_actions: 0,
            failed_actions: 0,
        })
    }

    /// Rebuilds the coordinate transform for a new window size. Called
    /// whenever the session observes the window has resized.
    pub fn update_resolution(&mut self, width: u32, height: u32) -> Result<(), ExecutionError> {
        self.transform = CoordinateTransform::new(BASE_SIZE, Size::new(width, height), None)
            .map_err(|_| ExecutionError::UnknownAction)?;
        Ok(())
    }

    pub fn auto_detect_resolution(&mut self) -> Result<(), ExecutionError> {
        if let Some(info) = self.adapter.window_info() {
            self.update_resolution(info.width, info.height)?;
        }
        Ok(())
    }

    /// Passthrough to the wrapped adapter. `SessionLoop` drives capture
    /// through the same adapter instance the executor dispatches input
    /// to, rather than holding a second handle to it.
    pub fn screenshot(&mut self) -> Result<image::RgbImage, crate::error::AdapterError> {
        self.adapter.screenshot()
    }

    pub fn window_info(&self) -> Option<crate::platform::WindowInfo> {
        self.adapter.window_info()
    }

    pub fn stats(&self) -> (u64, u64, u64) {
        (self.total_actions, self.successful_actions, self.failed_actions)
    }

    pub async fn execute(&mut self, action: &Action) -> ExecutionResult {
        self.total_actions += 1;
        let started = std::time::Instant::now();

        if self.humanize {
            self.random_delay().await;
        }

        let outcome = match action.kind {
            ActionKind::BuyHero => self.execute_buy_hero(action),
            ActionKind::SellHero => self.execute_sell_hero(action),
            ActionKind::MoveHero => self.execute_move_hero(action),
            ActionKind::RefreshShop => self.execute_refresh_shop(),
            ActionKind::LevelUp => self.execute_level_up(),
            ActionKind::EquipItem => self.execute_equip_item(),
            ActionKind::Wait => {
                self.execute_wait(action).await;
                Ok(())
            }
            ActionKind::None => Ok(()),
            _ => Err(ExecutionError::UnknownAction),
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => {
                self.successful_actions += 1;
                ExecutionResult { success: true, action: action.clone(), error: None, latency_ms }
            }
            Err(e) => {
                self.failed_actions += 1;
                ExecutionResult { success: false, action: action.clone(), error: Some(e.to_string()), latency_ms }
            }
        }
    }

    fn execute_buy_hero(&mut self, action: &Action) -> Result<(), ExecutionError> {
        let slot = action.position.as_ref().and_then(|p| p.first()).copied().unwrap_or(0);
        if !(0..5).contains(&slot) {
            return Err(ExecutionError::UnknownAction);
        }
        let base = ReferenceCoords::SHOP_SLOTS[slot as usize];
        self.click_with_jitter(base)?;
        Ok(())
    }

    fn execute_sell_hero(&mut self, action: &Action) -> Result<(), ExecutionError> {
        let position = action.position.as_ref().ok_or(ExecutionError::UnknownAction)?;
        let (row, col) = (position.first().copied().unwrap_or(0), position.get(1).copied().unwrap_or(-1));
        let base = self.hero_position_coords((row, col))?;
        let (x, y) = self.scaled_with_jitter(base);
        self.adapter.click(x, y, MouseButton::Right, 1, 0.1).map_err(ExecutionError::from)?;
        Ok(())
    }

    fn execute_move_hero(&mut self, action: &Action) -> Result<(), ExecutionError> {
        let source = action.source_position.as_ref().ok_or(ExecutionError::UnknownAction)?;
        let dest = action.position.as_ref().ok_or(ExecutionError::UnknownAction)?;
        let from_base = self.hero_position_coords((
            source.first().copied().unwrap_or(0),
            source.get(1).copied().unwrap_or(-1),
        ))?;
        let to_base = self.hero_position_coords((
            dest.first().copied().unwrap_or(0),
            dest.get(1).copied().unwrap_or(-1),
        ))?;
        let from = self.transform.map_point(from_base.0, from_base.1);
        let to = self.transform.map_point(to_base.0, to_base.1);
        self.adapter.drag(from, to, 0.3).map_err(ExecutionError::from)?;
        Ok(())
    }

    fn execute_refresh_shop(&mut self) -> Result<(), ExecutionError> {
        self.click_with_jitter(ReferenceCoords::REFRESH_BUTTON)
    }

    fn execute_level_up(&mut self) -> Result<(), ExecutionError> {
        self.click_with_jitter(ReferenceCoords::LEVEL_UP_BUTTON)
    }

    fn execute_equip_item(&mut self) -> Result<(), ExecutionError> {
        // not yet implemented: no reference anchor exists for item-to-hero drag targets
        Err(ExecutionError::UnknownAction)
    }

    async fn execute_wait(&mut self, action: &Action) {
        let duration = action.duration_secs().max(0.0);
        tokio::time::sleep(std::time::Duration::from_secs_f64(duration)).await;
    }

    /// Resolves a `(row, col)` position to a base-resolution pixel
    /// point. `col == -1` marks a bench slot addressed by `row`;
    /// otherwise it's a board cell.
    fn hero_position_coords(&self, position: (i32, i32)) -> Result<(f64, f64), ExecutionError> {
        let (row, col) = position;
        if col == -1 {
            if !(0..9).contains(&row) {
                return Err(ExecutionError::UnknownAction);
            }
            Ok(ReferenceCoords::bench_slot(row))
        } else {
            if !(0..4).contains(&row) || !(0..7).contains(&col) {
                return Err(ExecutionError::UnknownAction);
            }
            let (ox, oy) = ReferenceCoords::BOARD_ORIGIN;
            let (cw, ch) = ReferenceCoords::BOARD_CELL_SIZE;
            Ok((ox + col as f64 * cw + cw / 2.0, oy + row as f64 * ch + ch / 2.0))
        }
    }

    fn click_with_jitter(&mut self, base_point: (f64, f64)) -> Result<(), ExecutionError> {
        let (x, y) = self.scaled_with_jitter(base_point);
        self.adapter.click(x, y, MouseButton::Left, 1, 0.1).map_err(ExecutionError::from)?;
        Ok(())
    }

    fn scaled_with_jitter(&mut self, base_point: (f64, f64)) -> (i32, i32) {
        let (x, y) = self.transform.map_point(base_point.0, base_point.1);
        if self.humanize {
            (x + self.rng.random_range(-JITTER_X..=JITTER_X), y + self.rng.random_range(-JITTER_Y..=JITTER_Y))
        } else {
            (x, y)
        }
    }

    async fn random_delay(&mut self) {
        let (lo, hi) = self.random_delay_range;
        let delay = self.rng.random_range(lo..hi);
        tokio::time::sleep(std::time::Duration::from_secs_f64(delay)).await;
    }
}
