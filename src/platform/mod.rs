pub mod protocol;

pub use protocol::{MouseButton, PlatformAdapter, WindowInfo};
