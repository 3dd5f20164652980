pub mod quick_actions;
pub mod validator;

pub use quick_actions::{QuickActionEngine, QuickActionRule};
pub use validator::{ActionValidator, ValidationResult};
