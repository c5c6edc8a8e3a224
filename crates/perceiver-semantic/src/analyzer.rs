///! HTTP-backed page analyzer
use crate::{
    classifier::Classifier, errors::*, extract::extract_document, keywords::KeywordExtractor,
    language::LanguageDetector, models::*, summarizer::Summarizer,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use research_core::{
    duration_ms, AgentError, AnalyzeOptions, PageAnalysis, PageAnalyzer, QuickText,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; soulresearch/0.1; +https://github.com/soulbrowser)";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,text/plain;q=0.8";
const MAX_KEYWORDS: usize = 8;
const MAX_FACTS: usize = 6;
const MAX_FACT_CHARS: usize = 240;

/// Sentences carrying numbers worth quoting: percentages, money, years, versions, counts.
static FACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d+(?:[.,]\d+)?\s?%|[$€£]\s?\d|\b(?:19|20)\d{2}\b|\bv?\d+\.\d+(?:\.\d+)?\b|\b\d{2,}(?:,\d{3})*\s+[a-z]+)",
    )
    .expect("valid fact pattern")
});

/// Analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub user_agent: String,
    /// Response bodies are cut off after this many bytes.
    pub max_download_bytes: usize,
    /// Readable text kept per page.
    pub max_body_chars: usize,
    pub connect_timeout_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_download_bytes: 2 * 1024 * 1024,
            max_body_chars: 20_000,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Text processing stages, cheap to clone into blocking tasks
#[derive(Clone, Default)]
struct Pipeline {
    classifier: Classifier,
    summarizer: Summarizer,
    keywords: KeywordExtractor,
    language: LanguageDetector,
}

/// Page analyzer that fetches pages over HTTP and analyzes them locally
pub struct SemanticPageAnalyzer {
    client: reqwest::Client,
    config: AnalyzerConfig,
    pipeline: Pipeline,
}

impl SemanticPageAnalyzer {
    /// Create a new analyzer
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| SemanticError::InvalidInput(format!("http client: {e}")))?;
        Ok(Self {
            client,
            config,
            pipeline: Pipeline::default(),
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze an already fetched document
    pub fn analyze_html(&self, url: &Url, html: &str, max_links: usize) -> PageAnalysis {
        self.pipeline
            .analyze(url, html, max_links, self.config.max_body_chars)
    }

    /// Fetch `url`, returning the final URL after redirects and the decoded body
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<(Url, String)> {
        let parsed = Url::parse(url)
            .map_err(|e| SemanticError::InvalidInput(format!("bad url '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SemanticError::InvalidInput(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let started = Instant::now();
        let mut response = self
            .client
            .get(parsed)
            .timeout(timeout)
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SemanticError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !is_textual(&content_type) {
            return Err(SemanticError::UnsupportedContent(content_type));
        }

        let final_url = response.url().clone();
        let limit = self.config.max_download_bytes;
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| request_error(url, timeout, e))?
        {
            body.extend_from_slice(&chunk);
            if body.len() >= limit {
                body.truncate(limit);
                debug!(target: "analyzer", url, limit, "download limit reached, truncating body");
                break;
            }
        }

        debug!(
            target: "analyzer",
            url = %final_url,
            bytes = body.len(),
            elapsed_ms = duration_ms(started.elapsed()),
            "fetched page"
        );
        Ok((final_url, String::from_utf8_lossy(&body).into_owned()))
    }
}

fn request_error(url: &str, timeout: Duration, err: reqwest::Error) -> SemanticError {
    if err.is_timeout() {
        SemanticError::Timeout {
            url: url.to_string(),
            timeout_ms: duration_ms(timeout),
        }
    } else if err.is_connect() {
        SemanticError::Fetch {
            url: url.to_string(),
            reason: format!("connection failed: {err}"),
        }
    } else {
        SemanticError::Fetch {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Missing content types are accepted; servers often omit them.
fn is_textual(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml")
        || content_type.contains("text/plain")
}

impl Pipeline {
    fn analyze(&self, url: &Url, html: &str, max_links: usize, max_body_chars: usize) -> PageAnalysis {
        let text = extract_document(html, Some(url), max_body_chars);
        let keywords = self.keywords.extract(&text, MAX_KEYWORDS);
        let summary = self.summarizer.summarize(&text, &keywords);
        let content_type = self.classifier.classify(&text, Some(url));
        let language = self.language.detect(&text.all_text()).ok();

        let mut data_points = Vec::new();
        if let Some(language) = &language {
            data_points.push(format!("language: {}", language.name));
        }
        data_points.extend(facts(&text.body));
        if !keywords.is_empty() {
            data_points.push(format!("keywords: {}", keywords.join(", ")));
        }
        if summary.word_count > 0 {
            data_points.push(format!(
                "reading ease: {:.0}/100",
                self.summarizer.calculate_readability(&text.body)
            ));
        }

        let confidence = confidence(&text, &summary, content_type, language.as_ref());
        let page_url = url.as_str();
        let links = text
            .links
            .iter()
            .filter(|link| link.url != page_url)
            .take(max_links)
            .cloned()
            .collect();

        PageAnalysis {
            summary: summary
                .medium
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| summary.short.clone()),
            title: text
                .title
                .clone()
                .unwrap_or_else(|| url.host_str().unwrap_or(page_url).to_string()),
            key_points: summary.key_points,
            content_type: content_type.as_str().to_string(),
            links,
            data_points,
            confidence,
        }
    }

    fn quick_text(&self, url: &Url, html: &str, max_body_chars: usize) -> QuickText {
        let text = extract_document(html, Some(url), max_body_chars);
        let body = if text.body.is_empty() {
            text.description.unwrap_or_default()
        } else {
            text.body
        };
        QuickText {
            text: body,
            title: text.title,
        }
    }
}

/// Number-bearing sentences, in document order.
fn facts(body: &str) -> Vec<String> {
    body.lines()
        .flat_map(|line| line.unicode_sentences())
        .map(str::trim)
        .filter(|s| {
            s.chars().count() <= MAX_FACT_CHARS
                && s.unicode_words().count() >= 4
                && FACT.is_match(s)
        })
        .take(MAX_FACTS)
        .map(str::to_string)
        .collect()
}

/// Heuristic confidence that the analysis reflects real page content.
fn confidence(
    text: &ExtractedText,
    summary: &ContentSummary,
    content_type: ContentType,
    language: Option<&LanguageInfo>,
) -> f32 {
    let mut score = 0.2;
    if text.title.is_some() {
        score += 0.15;
    }
    score += (summary.word_count.min(600) as f64 / 600.0) * 0.35;
    if !matches!(content_type, ContentType::Unknown | ContentType::Error) {
        score += 0.15;
    }
    if let Some(language) = language {
        score += language.confidence * 0.15;
    }
    if content_type == ContentType::Error {
        score = score.min(0.2);
    }
    score.clamp(0.0, 1.0) as f32
}

#[async_trait]
impl PageAnalyzer for SemanticPageAnalyzer {
    async fn analyze(&self, url: &str, options: AnalyzeOptions) -> std::result::Result<PageAnalysis, AgentError> {
        let (final_url, html) = self.fetch(url, options.timeout).await?;
        let pipeline = self.pipeline.clone();
        let max_body_chars = self.config.max_body_chars;
        let analysis = tokio::task::spawn_blocking(move || {
            pipeline.analyze(&final_url, &html, options.max_links, max_body_chars)
        })
        .await
        .map_err(|e| SemanticError::Task(e.to_string()))?;
        debug!(
            target: "analyzer",
            url,
            content_type = %analysis.content_type,
            confidence = analysis.confidence,
            "analyzed page"
        );
        Ok(analysis)
    }

    async fn quick_extract_text(&self, url: &str, timeout: Duration) -> std::result::Result<QuickText, AgentError> {
        let (final_url, html) = self.fetch(url, timeout).await?;
        let pipeline = self.pipeline.clone();
        let max_body_chars = self.config.max_body_chars;
        let quick = tokio::task::spawn_blocking(move || {
            pipeline.quick_text(&final_url, &html, max_body_chars)
        })
        .await
        .map_err(|e| SemanticError::Task(e.to_string()))?;
        Ok(quick)
    }
}
