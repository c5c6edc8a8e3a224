///! HTML to readable text via `scraper`
use crate::models::ExtractedText;
use research_core::PageLink;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

const CONTENT_REGIONS: &[&str] = &["article", "main", "[role=\"main\"]"];
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "noscript", "svg", "aside", "form", "iframe",
    "template",
];
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "td", "th", "article",
    "section", "main", "blockquote", "pre", "figcaption", "dt", "dd",
];
/// A content region shorter than this is ignored in favour of `<body>`.
const MIN_REGION_CHARS: usize = 200;
const MAX_HEADINGS: usize = 20;
const MAX_LINKS: usize = 200;

/// Parse `html` and pull out the title, description, headings, links and
/// readable body text (capped at `max_body_chars` characters).
///
/// Relative links are resolved against `base`; only http(s) links are kept.
pub fn extract_document(html: &str, base: Option<&Url>, max_body_chars: usize) -> ExtractedText {
    let doc = Html::parse_document(html);

    let title = first_text(&doc, "title").or_else(|| meta_content(&doc, "og:title"));
    let description =
        meta_content(&doc, "description").or_else(|| meta_content(&doc, "og:description"));
    let headings = collect_headings(&doc);
    let links = collect_links(&doc, base);
    let body = readable_body(&doc, max_body_chars);

    ExtractedText {
        char_count: body.chars().count(),
        body,
        title,
        description,
        headings,
        links,
    }
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .map(|el| squash(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn meta_content(doc: &Html, name: &str) -> Option<String> {
    let sel = Selector::parse("meta").ok()?;
    doc.select(&sel)
        .filter(|el| {
            let attrs = el.value();
            attrs
                .attr("name")
                .or_else(|| attrs.attr("property"))
                .is_some_and(|value| value.eq_ignore_ascii_case(name))
        })
        .filter_map(|el| el.value().attr("content"))
        .map(squash)
        .find(|content| !content.is_empty())
}

fn collect_headings(doc: &Html) -> Vec<String> {
    let Ok(sel) = Selector::parse("h1, h2, h3") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    doc.select(&sel)
        .map(|el| squash(&el.text().collect::<String>()))
        .filter(|heading| !heading.is_empty() && seen.insert(heading.clone()))
        .take(MAX_HEADINGS)
        .collect()
}

fn collect_links(doc: &Html, base: Option<&Url>) -> Vec<PageLink> {
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for el in doc.select(&sel) {
        let Some(href) = el.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let Some(mut url) = resolve(href, base) else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }
        url.set_fragment(None);
        let url = url.to_string();
        if !seen.insert(url.clone()) {
            continue;
        }
        let text = squash(&el.text().collect::<String>());
        links.push(PageLink {
            text: if text.is_empty() { url.clone() } else { text },
            url,
        });
        if links.len() >= MAX_LINKS {
            break;
        }
    }
    links
}

fn resolve(href: &str, base: Option<&Url>) -> Option<Url> {
    match base {
        Some(base) => base.join(href).ok(),
        None => Url::parse(href).ok(),
    }
}

fn readable_body(doc: &Html, max_chars: usize) -> String {
    for region in CONTENT_REGIONS {
        let Ok(sel) = Selector::parse(region) else {
            continue;
        };
        if let Some(el) = doc.select(&sel).next() {
            let text = element_text(&el, max_chars);
            if text.chars().count() >= MIN_REGION_CHARS {
                return text;
            }
        }
    }

    if let Ok(sel) = Selector::parse("body") {
        if let Some(body) = doc.select(&sel).next() {
            return element_text(&body, max_chars);
        }
    }

    let raw: String = doc.root_element().text().collect();
    collapse_lines(&raw, max_chars)
}

fn element_text(el: &ElementRef<'_>, max_chars: usize) -> String {
    // Byte budget is a loose upper bound; the char cap is applied after collapsing.
    let budget = max_chars.saturating_mul(4);
    let mut buf = String::new();
    collect_text(el, &mut buf, budget);
    collapse_lines(&buf, max_chars)
}

fn collect_text(node: &ElementRef<'_>, buf: &mut String, budget: usize) {
    for child in node.children() {
        if buf.len() >= budget {
            return;
        }
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(el) => {
                let tag = el.name();
                if SKIP_TAGS.contains(&tag) {
                    continue;
                }
                if BLOCK_TAGS.contains(&tag) {
                    buf.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(&child_ref, buf, budget);
                }
                if BLOCK_TAGS.contains(&tag) {
                    buf.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Squash whitespace inside lines, drop blank lines and cap the result.
fn collapse_lines(text: &str, max_chars: usize) -> String {
    let joined = text
        .lines()
        .map(squash)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    match joined.char_indices().nth(max_chars) {
        Some((idx, _)) => joined[..idx].trim_end().to_string(),
        None => joined,
    }
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<!doctype html>
<html>
  <head>
    <title>  Async Rust   Guide </title>
    <meta name="description" content="Learn how async works in Rust.">
  </head>
  <body>
    <nav><a href="/home">Home</a></nav>
    <h1>Async Rust</h1>
    <p>Futures are lazy.   They do nothing unless polled.</p>
    <h2>Executors</h2>
    <p>An executor drives futures to completion.</p>
    <script>var tracking = "ignored";</script>
    <a href="/book/ch01.html#intro">Chapter 1</a>
    <a href="https://tokio.rs/">Tokio</a>
    <a href="https://tokio.rs/#top">Tokio again</a>
    <a href="mailto:someone@example.com">Mail</a>
    <a href="#footnote">Footnote</a>
  </body>
</html>"##;

    fn base() -> Url {
        Url::parse("https://rust-lang.github.io/async-book/").unwrap()
    }

    #[test]
    fn extracts_metadata_and_headings() {
        let text = extract_document(PAGE, Some(&base()), 10_000);
        assert_eq!(text.title.as_deref(), Some("Async Rust Guide"));
        assert_eq!(
            text.description.as_deref(),
            Some("Learn how async works in Rust.")
        );
        assert_eq!(text.headings, vec!["Async Rust", "Executors"]);
    }

    #[test]
    fn body_skips_scripts_and_navigation() {
        let text = extract_document(PAGE, Some(&base()), 10_000);
        assert!(text.body.contains("Futures are lazy. They do nothing unless polled."));
        assert!(!text.body.contains("tracking"));
        assert!(!text.body.contains("Home"));
        assert_eq!(text.char_count, text.body.chars().count());
    }

    #[test]
    fn links_are_resolved_and_deduplicated() {
        let text = extract_document(PAGE, Some(&base()), 10_000);
        let urls: Vec<&str> = text.links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://rust-lang.github.io/home",
                "https://rust-lang.github.io/book/ch01.html",
                "https://tokio.rs/",
            ]
        );
    }

    #[test]
    fn body_respects_char_budget() {
        let text = extract_document(PAGE, None, 20);
        assert!(text.body.chars().count() <= 20);
    }

    #[test]
    fn prefers_substantial_article_region() {
        let article = "Ownership rules keep memory safe. ".repeat(10);
        let html = format!(
            "<html><body><div>Sidebar promo</div><article><p>{article}</p></article></body></html>"
        );
        let text = extract_document(&html, None, 10_000);
        assert!(text.body.starts_with("Ownership rules"));
        assert!(!text.body.contains("Sidebar"));
    }
}
