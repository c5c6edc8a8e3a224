use std::future::Future;
use std::time::Duration;

use crate::errors::AgentError;

/// Run a collaborator call under a deadline, mapping expiry to [`AgentError::Timeout`].
pub async fn bounded<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T, AgentError>
where
    F: Future<Output = Result<T, AgentError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AgentError::timeout(operation, duration_ms(limit))),
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Truncate `text` to at most `max_chars` characters. A cut text ends in an
/// ellipsis, which counts toward the limit.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().nth(max_chars).is_none() {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let cut = text
        .char_indices()
        .nth(max_chars - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    format!("{}…", &text[..cut])
}

/// The last `max_chars` characters of `text`.
pub fn tail_chars(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}

/// Collapse runs of whitespace into single spaces.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 3), "hé…");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn truncated_text_stays_within_budget() {
        let long = "ü".repeat(50);
        for budget in [1, 2, 10, 49] {
            let cut = truncate_chars(&long, budget);
            assert_eq!(cut.chars().count(), budget);
            assert!(cut.ends_with('…'));
        }
    }

    #[test]
    fn duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_millis(1_500)), 1_500);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }

    #[test]
    fn tail_takes_last_chars() {
        assert_eq!(tail_chars("abcdef", 2), "ef");
        assert_eq!(tail_chars("ab", 5), "ab");
    }

    #[tokio::test]
    async fn bounded_maps_expiry_to_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, AgentError>(())
        };
        let err = bounded("slow call", Duration::from_millis(10), slow)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Timeout { timeout_ms: 10, .. }));
    }

    #[test]
    fn squash_collapses_whitespace() {
        assert_eq!(squash_whitespace("  a \n\t b  "), "a b");
    }
}
