///! Extractive summarization
use crate::models::*;
use unicode_segmentation::UnicodeSegmentation;

/// Sentences shorter than this many words are treated as fragments.
const MIN_SENTENCE_WORDS: usize = 4;
/// Longer "sentences" are usually unsegmented blobs (tables, menus).
const MAX_SENTENCE_CHARS: usize = 400;
const MAX_CANDIDATES: usize = 60;
const MEDIUM_SENTENCES: usize = 5;
const MAX_KEY_POINTS: usize = 5;
const MAX_HEADING_POINTS: usize = 3;

/// Text summarizer
#[derive(Clone, Default)]
pub struct Summarizer;

impl Summarizer {
    /// Create new summarizer
    pub fn new() -> Self {
        Self
    }

    /// Generate a lead summary, a keyword-ranked medium summary and key points.
    ///
    /// `keywords` are lowercase terms, most relevant first.
    pub fn summarize(&self, text: &ExtractedText, keywords: &[String]) -> ContentSummary {
        let sentences = self.extract_sentences(&text.body);
        let word_count = self.count_words(&text.body);

        let short = if sentences.is_empty() {
            text.description.clone().unwrap_or_default()
        } else {
            sentences.iter().take(2).cloned().collect::<Vec<_>>().join(" ")
        };

        let ranked = self.rank_sentences(&sentences, keywords);

        let medium = if sentences.len() > 2 {
            let mut picked: Vec<usize> = ranked.iter().take(MEDIUM_SENTENCES).copied().collect();
            picked.sort_unstable();
            Some(
                picked
                    .iter()
                    .map(|&idx| sentences[idx].as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        } else {
            None
        };

        let mut key_points: Vec<String> = text
            .headings
            .iter()
            .filter(|heading| Some(*heading) != text.title.as_ref())
            .take(MAX_HEADING_POINTS)
            .cloned()
            .collect();
        for idx in ranked {
            if key_points.len() >= MAX_KEY_POINTS {
                break;
            }
            let sentence = &sentences[idx];
            if !key_points.contains(sentence) {
                key_points.push(sentence.clone());
            }
        }

        ContentSummary {
            short,
            medium,
            key_points,
            word_count,
        }
    }

    /// Count words in text
    fn count_words(&self, text: &str) -> usize {
        text.unicode_words().count()
    }

    /// Split text into trimmed sentences, dropping fragments and blobs
    fn extract_sentences(&self, text: &str) -> Vec<String> {
        text.lines()
            .flat_map(|line| line.unicode_sentences())
            .map(|s| s.trim().to_string())
            .filter(|s| {
                s.chars().count() <= MAX_SENTENCE_CHARS
                    && s.unicode_words().count() >= MIN_SENTENCE_WORDS
            })
            .take(MAX_CANDIDATES)
            .collect()
    }

    /// Sentence indices ordered by keyword density, earlier sentences first on ties
    fn rank_sentences(&self, sentences: &[String], keywords: &[String]) -> Vec<usize> {
        let mut scored: Vec<(usize, f64)> = sentences
            .iter()
            .enumerate()
            .map(|(idx, sentence)| {
                let words: Vec<String> =
                    sentence.unicode_words().map(|w| w.to_lowercase()).collect();
                let hits = words.iter().filter(|w| keywords.contains(w)).count() as f64;
                let density = hits / (words.len().max(1) as f64).sqrt();
                // Slight preference for the lead of the document.
                let position = 1.0 / (idx as f64 + 2.0);
                (idx, density + position)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.into_iter().map(|(idx, _)| idx).collect()
    }

    /// Calculate readability score (Flesch Reading Ease)
    pub fn calculate_readability(&self, text: &str) -> f64 {
        let sentence_count = text
            .unicode_sentences()
            .filter(|s| !s.trim().is_empty())
            .count() as f64;

        if sentence_count == 0.0 {
            return 0.0;
        }

        let word_count = self.count_words(text) as f64;
        let syllable_count = self.estimate_syllables(text) as f64;

        // Score = 206.835 - 1.015 * (words/sentences) - 84.6 * (syllables/words)
        let avg_sentence_length = word_count / sentence_count;
        let avg_syllables_per_word = syllable_count / word_count.max(1.0);

        let score = 206.835 - 1.015 * avg_sentence_length - 84.6 * avg_syllables_per_word;
        score.clamp(0.0, 100.0)
    }

    /// Estimate syllable count (simplified algorithm)
    fn estimate_syllables(&self, text: &str) -> usize {
        text.unicode_words()
            .map(|word| self.count_syllables_in_word(word))
            .sum()
    }

    /// Count vowel groups, minus a silent trailing 'e'
    fn count_syllables_in_word(&self, word: &str) -> usize {
        let word_lower = word.to_lowercase();
        let mut syllable_count = 0;
        let mut previous_was_vowel = false;

        for ch in word_lower.chars() {
            let vowel = matches!(ch, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
            if vowel && !previous_was_vowel {
                syllable_count += 1;
            }
            previous_was_vowel = vowel;
        }

        if word_lower.ends_with('e') && syllable_count > 1 {
            syllable_count -= 1;
        }

        syllable_count.max(1)
    }
}
