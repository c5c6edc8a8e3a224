///! Data models for page analysis
use research_core::PageLink;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Article or blog post
    Article,
    /// Reference or API documentation
    Documentation,
    /// Search engine results
    Search,
    /// E-commerce product page
    Product,
    /// Forum thread or Q&A page
    Discussion,
    /// Form or login page
    Form,
    /// Error page
    Error,
    /// Unknown or mixed content
    Unknown,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Article => "article",
            ContentType::Documentation => "documentation",
            ContentType::Search => "search",
            ContentType::Product => "product",
            ContentType::Discussion => "discussion",
            ContentType::Form => "form",
            ContentType::Error => "error",
            ContentType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// ISO 639-1 language code (e.g., "en", "zh", "es")
    pub code: String,
    /// Human-readable language name
    pub name: String,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f64,
}

/// Content summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    /// Short summary (1-2 sentences)
    pub short: String,
    /// Medium summary (paragraph)
    pub medium: Option<String>,
    /// Key points extracted
    pub key_points: Vec<String>,
    /// Word count of original content
    pub word_count: usize,
}

/// Readable content extracted from an HTML document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Main body text
    pub body: String,
    /// Page title
    pub title: Option<String>,
    /// Meta description
    pub description: Option<String>,
    /// Headings in document order
    pub headings: Vec<String>,
    /// Absolute http(s) links with their text
    pub links: Vec<PageLink>,
    /// Character count of `body`
    pub char_count: usize,
}

impl ExtractedText {
    /// Get all text content concatenated
    pub fn all_text(&self) -> String {
        let mut parts = Vec::new();

        if let Some(ref title) = self.title {
            parts.push(title.clone());
        }

        if let Some(ref desc) = self.description {
            parts.push(desc.clone());
        }

        parts.extend(self.headings.clone());
        parts.push(self.body.clone());

        parts.join("\n\n")
    }
}
