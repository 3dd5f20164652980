pub mod ocr_engine;
pub mod recognition_engine;
pub mod regions;
pub mod som_annotator;
pub mod template_matcher;
pub mod template_registry;

pub use ocr_engine::{OcrBackend, OcrEngine, OcrResult};
pub use recognition_engine::{RecognitionEngine, RecognizedEntity, RecognitionMethod};
pub use regions::{RegionCatalog, UIRegion};
pub use template_matcher::{MatchResult, TemplateMatcher};
pub use template_registry::{EntityKind, RegistryStats, TemplateEntry, TemplateRegistry};
