/// Pull the first JSON object out of a model reply.
///
/// Accepts a bare object, an object inside a fenced code block, or an object
/// embedded in prose (matched by brace depth).
pub fn extract_json_object(raw: &str) -> Option<String> {
    if raw.trim_start().starts_with('{') {
        return Some(trim_symmetric(raw));
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if block.contains('{') {
                return Some(trim_symmetric(block));
            }
        }
    }

    let start = raw.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(raw[start..=start + idx].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_fenced_block() {
        let input = "Here is the plan:\n```json\n{\"strategy\":\"search\"}\n```";
        let extracted = extract_json_object(input).expect("json");
        assert_eq!(extracted, "{\"strategy\":\"search\"}");
    }

    #[test]
    fn extracts_from_inline_object() {
        let input = "text { \"tool\": \"goBack\" } more";
        assert_eq!(
            extract_json_object(input).as_deref(),
            Some("{ \"tool\": \"goBack\" }")
        );
    }

    #[test]
    fn braces_inside_strings_do_not_close_the_object() {
        let input = "Answer: {\"summary\": \"use } carefully\", \"n\": {\"a\": 1}} trailing";
        let extracted = extract_json_object(input).expect("json");
        let value: serde_json::Value = serde_json::from_str(&extracted).expect("valid json");
        assert_eq!(value["n"]["a"], 1);
    }

    #[test]
    fn returns_none_when_missing() {
        assert!(extract_json_object("no braces").is_none());
        assert!(extract_json_object("unbalanced { \"a\": 1").is_none());
    }
}
