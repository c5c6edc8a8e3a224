//! Page observation with a per-run cache keyed by exact URL.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::orchestrator::config::PerformanceMode;
use crate::ports::{AnalyzeOptions, BrowserDriver, ElementQuery, PageAnalysis, PageAnalyzer, PageLink};
use crate::utils::{bounded, squash_whitespace, truncate_chars};

pub const PLACEHOLDER_URL: &str = "about:blank";
const CONTENT_UNAVAILABLE: &str = "Content unavailable for this page.";
const DEEP_SUMMARY_BUDGET: usize = 2_000;
const LINK_TEXT_LIMIT: usize = 120;

static SEARCH_RESULTS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^https?://(?:www\.)?(?:google\.[a-z.]+/search|bing\.com/search|duckduckgo\.com/(?:html/?)?\?(?:[^#]*&)?q=|html\.duckduckgo\.com/html)",
    )
    .expect("valid search results regex")
});

/// Whether `url` is a results page of a known search engine.
pub fn is_search_results_url(url: &str) -> bool {
    SEARCH_RESULTS_URL.is_match(url)
}

/// Snapshot of the current page as seen by the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    pub url: String,
    pub title: String,
    pub content_summary: String,
    pub links: Vec<PageLink>,
    pub is_search_results_page: bool,
}

impl PageState {
    pub fn placeholder(reason: &str) -> Self {
        Self {
            url: PLACEHOLDER_URL.to_string(),
            title: String::new(),
            content_summary: format!("Page state unavailable: {reason}"),
            links: Vec::new(),
            is_search_results_page: false,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.url == PLACEHOLDER_URL && self.links.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    pub max_links: usize,
    pub do_deep_analysis: bool,
    pub fast: bool,
}

impl ObserveOptions {
    pub fn for_mode(mode: PerformanceMode, do_deep_analysis: bool) -> Self {
        Self {
            max_links: mode.profile().max_links,
            do_deep_analysis,
            fast: mode.is_fast(),
        }
    }

    fn text_budget(&self) -> usize {
        self.mode().profile().text_budget
    }

    fn quick_timeout(&self) -> Duration {
        Duration::from_millis(self.mode().profile().quick_timeout_ms)
    }

    fn mode(&self) -> PerformanceMode {
        if self.fast {
            PerformanceMode::Fast
        } else {
            PerformanceMode::Balanced
        }
    }
}

/// Reads page state from the browser and analyzer, caching by URL for one run.
pub struct PageObserver {
    analyzer: Option<Arc<dyn PageAnalyzer>>,
    browser_timeout: Duration,
    cache: HashMap<String, PageState>,
}

impl PageObserver {
    pub fn new(analyzer: Option<Arc<dyn PageAnalyzer>>, browser_timeout: Duration) -> Self {
        Self {
            analyzer,
            browser_timeout,
            cache: HashMap::new(),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Observe the current page. Never fails: browser errors yield a placeholder.
    pub async fn observe(&mut self, browser: &dyn BrowserDriver, opts: ObserveOptions) -> PageState {
        let info = match bounded(
            "current page info",
            self.browser_timeout,
            browser.current_page_info(),
        )
        .await
        {
            Ok(info) => info,
            Err(err) => {
                warn!(target: "observer", error = %err, "page info unavailable, using placeholder");
                return PageState::placeholder(&err.to_string());
            }
        };

        if let Some(state) = self.cache.get(&info.url) {
            debug!(target: "observer", url = %info.url, "page state cache hit");
            return state.clone();
        }

        let links = self.extract_links(browser, &info.url, opts.max_links).await;
        let content_summary = self.summarize(browser, &info.url, opts).await;
        let state = PageState {
            is_search_results_page: is_search_results_url(&info.url),
            url: info.url.clone(),
            title: info.title,
            content_summary,
            links,
        };
        debug!(
            target: "observer",
            url = %state.url,
            links = state.links.len(),
            search_results = state.is_search_results_page,
            "observed page"
        );
        self.cache.insert(info.url, state.clone());
        state
    }

    async fn extract_links(
        &self,
        browser: &dyn BrowserDriver,
        page_url: &str,
        max_links: usize,
    ) -> Vec<PageLink> {
        let anchors = match bounded(
            "link extraction",
            self.browser_timeout,
            browser.get_all_elements("a[href]", ElementQuery::links(max_links.saturating_mul(3))),
        )
        .await
        {
            Ok(anchors) => anchors,
            Err(err) => {
                warn!(target: "observer", url = page_url, error = %err, "link extraction failed");
                return Vec::new();
            }
        };

        let base = Url::parse(page_url).ok();
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for anchor in anchors {
            let Some(href) = anchor.attribute.as_deref() else {
                continue;
            };
            let Some(url) = absolute_http_url(base.as_ref(), href) else {
                continue;
            };
            if !seen.insert(url.clone()) {
                continue;
            }
            let text = squash_whitespace(&anchor.text);
            let text = if text.is_empty() {
                url.clone()
            } else {
                truncate_chars(&text, LINK_TEXT_LIMIT)
            };
            links.push(PageLink { text, url });
            if links.len() >= max_links {
                break;
            }
        }
        links
    }

    async fn summarize(&self, browser: &dyn BrowserDriver, url: &str, opts: ObserveOptions) -> String {
        let budget = opts.text_budget();
        if let Some(analyzer) = self.analyzer.as_ref() {
            if opts.do_deep_analysis {
                let options = AnalyzeOptions {
                    max_links: opts.max_links,
                    timeout: self.browser_timeout,
                };
                match bounded("page analysis", self.browser_timeout, analyzer.analyze(url, options)).await {
                    Ok(analysis) => return render_analysis(&analysis),
                    Err(err) => {
                        warn!(target: "observer", url, error = %err, "deep analysis failed, falling back to text");
                    }
                }
            }
            let timeout = opts.quick_timeout();
            match bounded("quick text extraction", timeout, analyzer.quick_extract_text(url, timeout)).await {
                Ok(quick) if !quick.text.trim().is_empty() => {
                    return truncate_chars(&squash_whitespace(&quick.text), budget);
                }
                Ok(_) => debug!(target: "observer", url, "quick extraction returned no text"),
                Err(err) => warn!(target: "observer", url, error = %err, "quick extraction failed"),
            }
        }

        match bounded("body text", self.browser_timeout, browser.get_text("body")).await {
            Ok(text) if !text.trim().is_empty() => truncate_chars(&squash_whitespace(&text), budget),
            Ok(_) => CONTENT_UNAVAILABLE.to_string(),
            Err(err) => {
                warn!(target: "observer", url, error = %err, "body text unavailable");
                CONTENT_UNAVAILABLE.to_string()
            }
        }
    }
}

fn absolute_http_url(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let parsed = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(href).ok()?,
        Err(_) => return None,
    };
    match parsed.scheme() {
        "http" | "https" => Some(parsed.to_string()),
        _ => None,
    }
}

/// Compact text rendering of an analyzer result.
pub fn render_analysis(analysis: &PageAnalysis) -> String {
    let mut out = format!(
        "[{} | confidence {:.2}] {}\n{}",
        analysis.content_type,
        analysis.confidence,
        analysis.title.trim(),
        analysis.summary.trim()
    );
    if !analysis.key_points.is_empty() {
        out.push_str("\nKey points:");
        for point in analysis.key_points.iter().take(6) {
            out.push_str("\n- ");
            out.push_str(point.trim());
        }
    }
    if !analysis.data_points.is_empty() {
        out.push_str("\nData: ");
        out.push_str(
            &analysis
                .data_points
                .iter()
                .take(8)
                .map(|d| d.trim())
                .collect::<Vec<_>>()
                .join("; "),
        );
    }
    if !analysis.links.is_empty() {
        out.push_str("\nCandidate links:");
        for link in analysis.links.iter().take(5) {
            out.push_str(&format!("\n- {} ({})", link.text, link.url));
        }
    }
    truncate_chars(&out, DEEP_SUMMARY_BUDGET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_search_result_pages() {
        assert!(is_search_results_url("https://www.google.com/search?q=rust"));
        assert!(is_search_results_url("https://www.google.co.uk/search?q=rust"));
        assert!(is_search_results_url("https://www.bing.com/search?q=rust"));
        assert!(is_search_results_url("https://duckduckgo.com/?q=rust&ia=web"));
        assert!(is_search_results_url("https://duckduckgo.com/?t=h_&q=rust"));
        assert!(is_search_results_url("https://html.duckduckgo.com/html/?q=rust"));
        assert!(!is_search_results_url("https://www.rust-lang.org/learn"));
        assert!(!is_search_results_url("https://duckduckgo.com/about"));
    }

    #[test]
    fn resolves_relative_links_and_drops_non_http() {
        let base = Url::parse("https://docs.rs/tokio/latest/tokio/").ok();
        assert_eq!(
            absolute_http_url(base.as_ref(), "../sync/index.html").as_deref(),
            Some("https://docs.rs/tokio/latest/sync/index.html")
        );
        assert_eq!(absolute_http_url(base.as_ref(), "mailto:a@b.c"), None);
        assert_eq!(absolute_http_url(base.as_ref(), "#top"), None);
        assert_eq!(absolute_http_url(None, "/relative"), None);
    }

    #[test]
    fn placeholder_is_blank_page() {
        let state = PageState::placeholder("timeout");
        assert!(state.is_placeholder());
        assert!(state.content_summary.contains("timeout"));
    }

    #[test]
    fn analysis_rendering_is_compact() {
        let analysis = PageAnalysis {
            summary: "A guide.".into(),
            title: "Guide".into(),
            key_points: vec!["one".into(), "two".into()],
            content_type: "documentation".into(),
            links: vec![],
            data_points: vec!["2024".into()],
            confidence: 0.8,
        };
        let text = render_analysis(&analysis);
        assert!(text.starts_with("[documentation | confidence 0.80] Guide"));
        assert!(text.contains("- two"));
        assert!(text.contains("Data: 2024"));
    }
}
