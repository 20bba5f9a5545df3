//! Query Processor output types (spec §3, §4.4).

use serde::{Deserialize, Serialize};

use crate::tokenization::TokenizationResult;

/// Detected language mix of a raw query string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LanguageMix {
    pub thai_fraction: f32,
    pub thai_detected: bool,
    pub has_english: bool,
    pub mixed_content: bool,
}

impl LanguageMix {
    pub fn detect(text: &str) -> Self {
        let thai_fraction = crate::thai_fraction(text);
        let thai_detected = thai_fraction > 0.0;
        let has_english = text.chars().any(|c| c.is_ascii_alphabetic());
        let mixed_content = thai_fraction > 0.0 && thai_fraction < 1.0 && has_english;
        Self {
            thai_fraction,
            thai_detected,
            has_english,
            mixed_content,
        }
    }
}

/// Tag identifying which reformulation a `QueryVariant` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariantType {
    Original,
    Tokenized,
    CompoundSplit,
    ThaiOnly,
    EnglishOnly,
    Phrase,
    Fallback,
}

/// One query to send to the index engine.
///
/// Invariant: `weight(ORIGINAL) == 1.0`; weight of any other type `<= 1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryVariant {
    pub text: String,
    pub variant_type: VariantType,
    pub weight: f32,
    pub engine_id: Option<String>,
    pub phrase_quoted: bool,
}

impl QueryVariant {
    pub fn original(text: &str) -> Self {
        Self {
            text: text.to_string(),
            variant_type: VariantType::Original,
            weight: 1.0,
            engine_id: None,
            phrase_quoted: false,
        }
    }
}

/// Output of the Query Processor.
///
/// Invariant: at least one variant (the original) is always present;
/// variants appear in descending weight order.
#[derive(Debug, Clone)]
pub struct ProcessedQuery {
    pub original_query: String,
    pub language: LanguageMix,
    pub primary_tokenization: Option<TokenizationResult>,
    pub variants: Vec<QueryVariant>,
    /// Dictionary compounds the Tokenizer Facade merged back together for
    /// this query, independent of whether a `COMPOUND_SPLIT` variant was
    /// generated from them.
    pub compound_words: Vec<String>,
}

impl ProcessedQuery {
    /// Enforces the "descending weight" invariant and truncates to
    /// `max_variants`, dropping the lowest-weighted tail first.
    pub fn finalize(mut self, max_variants: usize) -> Self {
        self.variants
            .sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
        self.variants.truncate(max_variants.max(1));
        self
    }

    pub fn compound_words_detected(&self) -> Vec<String> {
        self.compound_words.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_mix_pure_thai() {
        let m = LanguageMix::detect("สวัสดีครับ");
        assert!(m.thai_detected);
        assert!(!m.mixed_content);
    }

    #[test]
    fn language_mix_mixed() {
        let m = LanguageMix::detect("Smart Farm เกษตรอัจฉริยะ");
        assert!(m.thai_detected);
        assert!(m.has_english);
        assert!(m.mixed_content);
    }

    #[test]
    fn finalize_sorts_and_truncates() {
        let pq = ProcessedQuery {
            original_query: "x".into(),
            language: LanguageMix::detect("x"),
            primary_tokenization: None,
            compound_words: Vec::new(),
            variants: vec![
                QueryVariant {
                    text: "a".into(),
                    variant_type: VariantType::Fallback,
                    weight: 0.5,
                    engine_id: None,
                    phrase_quoted: false,
                },
                QueryVariant::original("x"),
            ],
        };
        let pq = pq.finalize(5);
        assert_eq!(pq.variants[0].variant_type, VariantType::Original);
    }
}
