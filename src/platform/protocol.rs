//! The platform boundary: whatever captures the game window and
//! dispatches input. No concrete adapter ships in this crate — only
//! the trait surface the control layer consumes, plus a test double.

use image::RgbImage;

use crate::error::AdapterError;

/// Which mouse button a click/drag uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Window geometry and identity, as reported by the platform adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub title: String,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    pub window_id: Option<u64>,
}

impl WindowInfo {
    pub fn rect(&self) -> (i32, i32, u32, u32) {
        (self.left, self.top, self.width, self.height)
    }

    pub fn center(&self) -> (i32, i32) {
        (self.left + self.width as i32 / 2, self.top + self.height as i32 / 2)
    }
}

/// Whatever captures the game window and dispatches input to it. All
/// coordinates passed in are screen-absolute; `screenshot` returns the
/// game window's own content, not the whole desktop.
pub trait PlatformAdapter: Send {
    fn screenshot(&mut self) -> Result<RgbImage, AdapterError>;

    fn click(&mut self, x: i32, y: i32, button: MouseButton, clicks: u32, interval: f64) -> Result<bool, AdapterError>;

    fn drag(&mut self, from: (i32, i32), to: (i32, i32), duration: f64) -> Result<bool, AdapterError>;

    fn scroll(&mut self, x: i32, y: i32, clicks: i32) -> Result<bool, AdapterError>;

    fn type_text(&mut self, text: &str, interval: f64) -> Result<bool, AdapterError>;

    fn press_key(&mut self, key: &str) -> Result<bool, AdapterError>;

    fn window_info(&self) -> Option<WindowInfo>;

    fn window_to_screen(&self, x: i32, y: i32) -> (i32, i32);

    fn screen_to_window(&self, x: i32, y: i32) -> (i32, i32);

    fn is_active(&self) -> bool;

    fn activate(&mut self) -> Result<bool, AdapterError>;

    fn scale_factor(&self) -> f64;
}

#[cfg(any(test, feature = "test-support"))]
pub mod testing {
    use super::*;

    /// Records every call it receives and replays a fixed screenshot and
    /// window geometry; input methods always succeed unless
    /// `fail_input` is set.
    pub struct MockPlatformAdapter {
        pub screenshot: RgbImage,
        pub window: WindowInfo,
        pub fail_input: bool,
        pub clicks: Vec<(i32, i32, MouseButton)>,
        pub drags: Vec<((i32, i32), (i32, i32))>,
    }

    impl MockPlatformAdapter {
        pub fn new(screenshot: RgbImage, window: WindowInfo) -> Self {
            Self { screenshot, window, fail_input: false, clicks: Vec::new(), drags: Vec::new() }
        }
    }

    impl PlatformAdapter for MockPlatformAdapter {
        fn screenshot(&mut self) -> Result<RgbImage, AdapterError> {
            Ok(self.screenshot.clone())
        }

        fn click(&mut self, x: i32, y: i32, button: MouseButton, _clicks: u32, _interval: f64) -> Result<bool, AdapterError> {
            if self.fail_input {
                return Err(AdapterError::InputFailed("mock click failure".to_string()));
            }
            self.clicks.push((x, y, button));
            Ok(true)
        }

        fn drag(&mut self, from: (i32, i32), to: (i32, i32), _duration: f64) -> Result<bool, AdapterError> {
            if self.fail_input {
                return Err(AdapterError::InputFailed("mock drag failure".to_string()));
            }
            self.drags.push((from, to));
            Ok(true)
        }

        fn scroll(&mut self, _x: i32, _y: i32, _clicks: i32) -> Result<bool, AdapterError> {
            Ok(!self.fail_input)
        }

        fn type_text(&mut self, _text: &str, _interval: f64) -> Result<bool, AdapterError> {
            Ok(!self.fail_input)
        }

        fn press_key(&mut self, _key: &str) -> Result<bool, AdapterError> {
            Ok(!self.fail_input)
        }

        fn window_info(&self) -> Option<WindowInfo> {
            Some(self.window.clone())
        }

        fn window_to_screen(&self, x: i32, y: i32) -> (i32, i32) {
            (x + self.window.left, y + self.window.top)
        }

        fn screen_to_window(&self, x: i32, y: i32) -> (i32, i32) {
            (x - self.window.left, y - self.window.top)
        }

        fn is_active(&self) -> bool {
            true
        }

        fn activate(&mut self) -> Result<bool, AdapterError> {
            Ok(true)
        }

        fn scale_factor(&self) -> f64 {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockPlatformAdapter;
    use super::*;

    fn window() -> WindowInfo {
        WindowInfo { title: "Game".to_string(), left: 10, top: 20, width: 1920, height: 1080, window_id: None }
    }

    #[test]
    fn window_to_screen_and_back_round_trips() {
        let adapter = MockPlatformAdapter::new(RgbImage::new(1920, 1080), window());
        let (sx, sy) = adapter.window_to_screen(5, 5);
        assert_eq!((sx, sy), (15, 25));
        assert_eq!(adapter.screen_to_window(sx, sy), (5, 5));
    }

    #[test]
    fn click_is_recorded_and_can_be_made_to_fail() {
        let mut adapter = MockPlatformAdapter::new(RgbImage::new(1920, 1080), window());
        adapter.click(100, 200, MouseButton::Left, 1, 0.1).unwrap();
        assert_eq!(adapter.clicks.len(), 1);

        adapter.fail_input = true;
        assert!(adapter.click(0, 0, MouseButton::Right, 1, 0.1).is_err());
    }
}
