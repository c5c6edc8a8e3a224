///! Content type classification
use crate::models::*;
use once_cell::sync::Lazy;
use regex::Regex;
use research_core::observer::is_search_results_url;
use url::Url;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid classifier pattern"))
        .collect()
}

static ARTICLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\b(article|post|blog|news|story)\b",
        r"(?i)\b(author|published|updated|posted)\b",
        r"(?i)\b(\d+ min read|read more|continue reading)\b",
    ])
});

static DOC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\b(documentation|api reference|reference)\b",
        r"(?i)\b(parameters|returns|arguments|example usage)\b",
        r"(?i)\b(function|method|struct|module|class|trait)\b",
    ])
});

static PRODUCT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\b(price|buy|cart|checkout|purchase|in stock)\b",
        r"[$€£]\s?\d+(?:[.,]\d{2})?",
        r"(?i)\b(add to cart|buy now|free shipping)\b",
    ])
});

static DISCUSSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\b(reply|replies|answered|asked|votes?|comments?)\b",
        r"(?i)\b(thread|forum|upvoted?|accepted answer)\b",
    ])
});

static FORM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\b(sign up|sign in|log ?in|register|subscribe)\b",
        r"(?i)\b(email|password|username)\b",
    ])
});

static ERROR_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(404|not found|error|forbidden|access denied)\b").expect("valid error pattern"));

const DOC_HOST_PREFIXES: &[&str] = &["docs.", "doc.", "developer.", "developers."];
const DOC_PATH_MARKERS: &[&str] = &["/docs", "/doc/", "/api/", "/reference", "/manual"];
const DISCUSSION_HOSTS: &[&str] = &[
    "stackoverflow.com",
    "stackexchange.com",
    "reddit.com",
    "news.ycombinator.com",
    "discourse",
];
/// Bodies at least this long lean towards article.
const LONG_BODY_CHARS: usize = 1500;
/// Error pages are short; longer pages mentioning "error" are content.
const ERROR_BODY_CHARS: usize = 600;

/// Content classifier
#[derive(Clone, Default)]
pub struct Classifier;

impl Classifier {
    /// Create new classifier
    pub fn new() -> Self {
        Self
    }

    /// Classify content type from the page URL and its extracted text
    pub fn classify(&self, text: &ExtractedText, url: Option<&Url>) -> ContentType {
        if let Some(url) = url {
            if is_search_results_url(url.as_str()) {
                return ContentType::Search;
            }
        }

        if let Some(title) = &text.title {
            if ERROR_TITLE.is_match(title) && text.char_count < ERROR_BODY_CHARS {
                return ContentType::Error;
            }
        }

        let all_text = text.all_text();
        let (doc_hint, discussion_hint) = url.map(url_hints).unwrap_or((0.0, 0.0));
        let long_body = if text.char_count >= LONG_BODY_CHARS { 2.0 } else { 0.0 };

        // Fixed order decides ties.
        let scores = [
            (ContentType::Documentation, doc_hint + score_patterns(&all_text, &DOC_PATTERNS)),
            (ContentType::Discussion, discussion_hint + score_patterns(&all_text, &DISCUSSION_PATTERNS)),
            (ContentType::Article, long_body + score_patterns(&all_text, &ARTICLE_PATTERNS)),
            (ContentType::Product, score_patterns(&all_text, &PRODUCT_PATTERNS)),
            (ContentType::Form, score_patterns(&all_text, &FORM_PATTERNS)),
        ];

        let mut best = (ContentType::Unknown, 0.0);
        for (content_type, score) in scores {
            if score > best.1 {
                best = (content_type, score);
            }
        }
        best.0
    }
}

fn url_hints(url: &Url) -> (f64, f64) {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let path = url.path().to_ascii_lowercase();

    let doc = if DOC_HOST_PREFIXES.iter().any(|p| host.starts_with(p))
        || host == "docs.rs"
        || DOC_PATH_MARKERS.iter().any(|m| path.contains(m))
    {
        4.0
    } else {
        0.0
    };
    let discussion = if DISCUSSION_HOSTS.iter().any(|h| host.contains(h))
        || (host == "github.com" && (path.contains("/issues/") || path.contains("/discussions/")))
    {
        4.0
    } else {
        0.0
    };
    (doc, discussion)
}

/// Count pattern matches, capped per pattern so one repeated word cannot dominate.
fn score_patterns(text: &str, patterns: &[Regex]) -> f64 {
    patterns
        .iter()
        .map(|p| p.find_iter(text).count().min(5) as f64)
        .sum()
}
