///! Language detection module
use crate::{errors::*, models::*};
use whatlang::{detect, Lang};

/// Enough characters for whatlang to be reliable; the rest is ignored.
const SAMPLE_CHARS: usize = 2000;

/// Language detector
#[derive(Clone, Default)]
pub struct LanguageDetector;

impl LanguageDetector {
    /// Create new language detector
    pub fn new() -> Self {
        Self
    }

    /// Detect language from text
    pub fn detect(&self, text: &str) -> Result<LanguageInfo> {
        if text.trim().is_empty() {
            return Err(SemanticError::InvalidInput(
                "Cannot detect language from empty text".to_string(),
            ));
        }

        let sample: String = text.chars().take(SAMPLE_CHARS).collect();
        let info = detect(&sample).ok_or_else(|| {
            SemanticError::LanguageDetectionFailed(
                "Could not detect language from text".to_string(),
            )
        })?;

        let (code, name) = Self::describe(info.lang());
        Ok(LanguageInfo {
            code: code.to_string(),
            name: name.to_string(),
            confidence: info.confidence(),
        })
    }

    /// ISO 639-1 code and English name
    fn describe(lang: Lang) -> (&'static str, &'static str) {
        match lang {
            Lang::Eng => ("en", "English"),
            Lang::Cmn => ("zh", "Chinese"),
            Lang::Spa => ("es", "Spanish"),
            Lang::Fra => ("fr", "French"),
            Lang::Deu => ("de", "German"),
            Lang::Rus => ("ru", "Russian"),
            Lang::Jpn => ("ja", "Japanese"),
            Lang::Por => ("pt", "Portuguese"),
            Lang::Ita => ("it", "Italian"),
            Lang::Kor => ("ko", "Korean"),
            Lang::Ara => ("ar", "Arabic"),
            Lang::Hin => ("hi", "Hindi"),
            Lang::Nld => ("nl", "Dutch"),
            Lang::Pol => ("pl", "Polish"),
            Lang::Tur => ("tr", "Turkish"),
            Lang::Vie => ("vi", "Vietnamese"),
            _ => ("unknown", "Unknown"),
        }
    }
}
