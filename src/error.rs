//! Error kinds for every subsystem. Hand-rolled `Display` + `std::error::Error`
//! impls, matching the style used across the codebase rather than a derive
//! macro.

use std::fmt;

/// Failure constructing or using a [`crate::geometry::transform::CoordinateTransform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    InvalidGeometry(String),
    DegenerateTransform,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGeometry(s) => write!(f, "invalid geometry: {}", s),
            Self::DegenerateTransform => write!(f, "degenerate transform: zero scale"),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Out-of-range region index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionIndexOutOfRange {
    pub region: &'static str,
    pub index: i32,
    pub max: i32,
}

impl fmt::Display for RegionIndexOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region index out of range: {} index {} (max {})",
            self.region, self.index, self.max
        )
    }
}

impl std::error::Error for RegionIndexOutOfRange {}

/// Template registry / manifest failures.
#[derive(Debug, Clone)]
pub enum TemplateError {
    Io(String),
    Decode(String),
    MissingTemplate { kind: String, id: String },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(s) => write!(f, "template registry io error: {}", s),
            Self::Decode(s) => write!(f, "template registry decode error: {}", s),
            Self::MissingTemplate { kind, id } => {
                write!(f, "missing template for {}:{}", kind, id)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Platform adapter failures (capture/input/window lookup).
#[derive(Debug, Clone)]
pub enum AdapterError {
    WindowNotFound(String),
    CaptureFailed(String),
    InputFailed(String),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowNotFound(s) => write!(f, "window not found: {}", s),
            Self::CaptureFailed(s) => write!(f, "capture failed: {}", s),
            Self::InputFailed(s) => write!(f, "input failed: {}", s),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Recognition backend init/exec failure. Contained within a tick; the
/// session logs and proceeds with the prior `GameState`.
#[derive(Debug, Clone)]
pub enum RecognitionError {
    BackendUnavailable(String),
    ExecutionFailed(String),
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackendUnavailable(s) => write!(f, "recognition backend unavailable: {}", s),
            Self::ExecutionFailed(s) => write!(f, "recognition execution failed: {}", s),
        }
    }
}

impl std::error::Error for RecognitionError {}

/// Errors surfaced by `VlmClient`.
#[derive(Debug, Clone, PartialEq)]
pub enum VlmError {
    BudgetExhausted,
    Timeout,
    BackendError(String),
}

impl fmt::Display for VlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BudgetExhausted => write!(f, "vlm call budget exhausted"),
            Self::Timeout => write!(f, "vlm call timed out"),
            Self::BackendError(s) => write!(f, "vlm backend error: {}", s),
        }
    }
}

impl std::error::Error for VlmError {}

/// Errors from `ActionExecutor`.
#[derive(Debug, Clone)]
pub enum ExecutionError {
    UnknownAction,
    Adapter(AdapterError),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAction => write!(f, "unknown action kind"),
            Self::Adapter(e) => write!(f, "executor adapter error: {}", e),
        }
    }
}

impl std::error::Error for ExecutionError {}

impl From<AdapterError> for ExecutionError {
    fn from(e: AdapterError) -> Self {
        Self::Adapter(e)
    }
}

/// Unrecoverable setup failure. Only this terminates the session loop.
#[derive(Debug, Clone)]
pub struct FatalError(pub String);

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fatal error: {}", self.0)
    }
}

impl std::error::Error for FatalError {}

/// A runtime safety gate denial. Not an error: counted and logged at warn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyBlockReason {
    RateLimited,
    ClickCapReached,
}

impl fmt::Display for SafetyBlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited"),
            Self::ClickCapReached => write!(f, "click cap reached"),
        }
    }
}
