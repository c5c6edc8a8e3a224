///! Semantic Perceiver - page analysis over plain HTTP
///!
///! Fetches a page, extracts readable text with `scraper` and builds a
///! structured [`PageAnalysis`](research_core::PageAnalysis):
///! - Content type classification (article, documentation, search, etc.)
///! - Language detection
///! - Extractive summary and key points
///! - Keyword and data point extraction
pub mod analyzer;
pub mod classifier;
pub mod errors;
pub mod extract;
pub mod keywords;
pub mod language;
pub mod models;
pub mod summarizer;

// Re-exports
pub use analyzer::{AnalyzerConfig, SemanticPageAnalyzer};
pub use classifier::Classifier;
pub use errors::{Result, SemanticError};
pub use extract::extract_document;
pub use keywords::KeywordExtractor;
pub use language::LanguageDetector;
pub use models::*;
pub use summarizer::Summarizer;
