///! Keyword extraction module
use crate::models::*;
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with", "this", "but", "they", "have",
    "had", "what", "when", "where", "who", "which", "why", "how", "you", "your", "can", "not",
    "all", "more", "one", "also", "into", "than", "then", "there", "their", "our", "use", "using",
    "or", "if", "so", "do", "does", "we", "i", "may", "about", "these", "those", "such",
];
const TITLE_BOOST: f64 = 1.5;
const HEADING_BOOST: f64 = 1.3;

/// Keyword extractor
#[derive(Clone)]
pub struct KeywordExtractor {
    stop_words: HashSet<&'static str>,
}

impl KeywordExtractor {
    /// Create new keyword extractor
    pub fn new() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Lowercase keywords ranked by boosted term frequency, at most `max`.
    pub fn extract(&self, text: &ExtractedText, max: usize) -> Vec<String> {
        let mut scores: HashMap<String, f64> = HashMap::new();
        for word in self.tokenize(&text.body) {
            *scores.entry(word).or_insert(0.0) += 1.0;
        }

        // Boost keywords that appear in headings or title
        if let Some(ref title) = text.title {
            for word in self.tokenize(title) {
                if let Some(score) = scores.get_mut(&word) {
                    *score *= TITLE_BOOST;
                }
            }
        }
        for heading in &text.headings {
            for word in self.tokenize(heading) {
                if let Some(score) = scores.get_mut(&word) {
                    *score *= HEADING_BOOST;
                }
            }
        }

        let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.into_iter().take(max).map(|(word, _)| word).collect()
    }

    /// Lowercase content words: no stop words, no numbers, longer than two chars
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(str::to_lowercase)
            .filter(|w| {
                w.chars().count() > 2
                    && !w.chars().all(|c| c.is_ascii_digit())
                    && !self.stop_words.contains(w.as_str())
            })
            .collect()
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}
