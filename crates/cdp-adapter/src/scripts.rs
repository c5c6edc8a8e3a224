//! JavaScript snippets evaluated in the page.

use research_core::WaitPolicy;

/// Quote `value` as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Collects up to `limit` matches as `[{text, attribute}]`.
pub(crate) fn collect_elements(selector: &str, attribute: &str, limit: usize) -> String {
    format!(
        r#"(() => {{
  const out = [];
  for (const el of document.querySelectorAll({selector})) {{
    if (out.length >= {limit}) break;
    const text = (el.innerText || el.textContent || "").replace(/\s+/g, " ").trim();
    const attribute = el.getAttribute({attribute});
    out.push({{ text, attribute }});
  }}
  return out;
}})()"#,
        selector = js_string(selector),
        attribute = js_string(attribute),
        limit = limit,
    )
}

/// True once the document reached the state `wait` asks for.
pub(crate) fn ready_state_check(wait: WaitPolicy) -> Option<&'static str> {
    match wait {
        WaitPolicy::Load => Some("document.readyState === 'complete'"),
        WaitPolicy::DomContentLoaded => Some("document.readyState !== 'loading'"),
        WaitPolicy::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_quoted() {
        let script = collect_elements(r#"a[href*="x"]"#, "href", 5);
        assert!(script.contains(r#"querySelectorAll("a[href*=\"x\"]")"#));
        assert!(script.contains("getAttribute(\"href\")"));
        assert!(script.contains("out.length >= 5"));
    }

    #[test]
    fn no_wait_has_no_check() {
        assert!(ready_state_check(WaitPolicy::None).is_none());
        assert!(ready_state_check(WaitPolicy::Load)
            .unwrap()
            .contains("complete"));
    }
}
