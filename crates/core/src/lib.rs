pub mod chapter;
pub mod config;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod fetch;
pub mod memory;
pub mod metadata;
pub mod navigation;
pub mod parse;
pub mod preprocess;
pub mod readability;
pub mod scoring;
pub mod text;

pub use chapter::{ChapterConfig, ChapterDetector, ChapterInfo, ChapterSource, UrlPatternSpec, format_url};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::{BookChapter, Engine, LockReport, NavigationOutcome};
pub use error::{PagewalkError, Result};
pub use extract::{
    ExtractConfig, ExtractionFailure, ExtractionMethod, ExtractionResult, StageOutcome, TextExtractor, extract_text,
};
pub use fetch::{FetchConfig, FetchResult, HttpFetcher, PageSource, fetch, fetch_cancellable};
pub use memory::{ClearScope, MemorySnapshot, PatternMemory, StepOutcome};
pub use metadata::Metadata;
pub use navigation::{Direction, NavigationConfig, NavigationLink, NavigationLinks, NavigationTier, step_url};
pub use parse::Document;
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
pub use readability::{ReadabilityConfig, ReadabilityExtractor, StructuredExtractor};
#[doc(hidden)]
pub use scoring::{ScoreConfig, ScoreResult, calculate_score};
