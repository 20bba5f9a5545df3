//! Tokenizer Facade: engine fallback ladder + compound-word preservation
//! (spec §3, §4.3).

use std::sync::Arc;
use std::time::Duration;

use thaisearch_dictionary::DictionaryStore;

use thaisearch_core::tokenization::{TokenizationError, TokenizationResult, Tokenizer};

const MAX_COMPOUND_SPAN: usize = 6;

/// Result of a facade tokenization pass, carrying the compound-merged
/// tokens (used as the primary `TOKENIZED` variant), the pre-merge tokens,
/// and the list of dictionary compounds the merge pass actually found (the
/// Query Processor reports these separately from whatever `COMPOUND_SPLIT`
/// variant it derives from the merged token list).
pub struct FacadeTokenization {
    pub result: TokenizationResult,
    pub raw_tokens: Vec<String>,
    pub compounds_merged: Vec<String>,
    /// Confidence of each entry in `compounds_merged`, parallel by index:
    /// the minimum of the span's component confidences, capped to 0.95
    /// (spec §4.3 step 3).
    pub compound_confidences: Vec<f32>,
}

/// Wraps a priority-ordered list of engines and applies the compound-word
/// merge pass over whichever engine's output wins.
pub struct TokenizerFacade {
    engines: Vec<Arc<dyn Tokenizer>>,
    dictionary: Arc<DictionaryStore>,
}

impl TokenizerFacade {
    pub fn new(engines: Vec<Arc<dyn Tokenizer>>, dictionary: Arc<DictionaryStore>) -> Self {
        Self { engines, dictionary }
    }

    /// Tries each engine in priority order. The first success wins; a
    /// timeout or internal error moves to the next engine. If every engine
    /// fails, returns a single-token fallback result (never an error) —
    /// the caller always gets *something* to search with (spec §4.3).
    pub async fn tokenize(&self, text: &str, timeout: Duration) -> TokenizationResult {
        self.tokenize_detailed(text, timeout).await.result
    }

    /// Same fallback ladder as `tokenize`, but also returns the pre-merge
    /// tokens and the list of compounds the merge pass produced.
    pub async fn tokenize_detailed(&self, text: &str, timeout: Duration) -> FacadeTokenization {
        if text.is_empty() {
            let engine_id = self
                .engines
                .first()
                .map(|e| e.engine_id())
                .unwrap_or("newmm");
            let result = TokenizationResult::empty(engine_id);
            return FacadeTokenization {
                result,
                raw_tokens: Vec::new(),
                compounds_merged: Vec::new(),
                compound_confidences: Vec::new(),
            };
        }

        for engine in &self.engines {
            let started = std::time::Instant::now();
            match engine.tokenize(text, timeout).await {
                Ok(result) => {
                    thaisearch_metrics::record_tokenization(engine.engine_id(), started.elapsed(), true);
                    let raw_tokens = result.tokens.clone();
                    let (result, compounds_merged, compound_confidences) =
                        self.with_compounds_preserved(result);
                    return FacadeTokenization {
                        result,
                        raw_tokens,
                        compounds_merged,
                        compound_confidences,
                    };
                }
                Err(e) => {
                    thaisearch_metrics::record_tokenization(engine.engine_id(), started.elapsed(), false);
                    tracing::warn!(
                        engine = engine.engine_id(),
                        error = %e,
                        "tokenizer engine failed, trying next"
                    );
                }
            }
        }

        tracing::error!("all tokenizer engines failed, using single-token fallback");
        FacadeTokenization {
            result: TokenizationResult::fallback(text),
            raw_tokens: Vec::new(),
            compounds_merged: Vec::new(),
            compound_confidences: Vec::new(),
        }
    }

    /// Merges adjacent tokens that concatenate into a known dictionary
    /// word, using greedy longest match: at each position, prefer the
    /// longest run of subsequent tokens whose concatenation is a dictionary
    /// entry. Ties on span length cannot occur since the concatenated text
    /// is the same string; "earliest start" is implied by the left-to-right
    /// scan. Returns the merged result and the list of compound words found.
    fn with_compounds_preserved(
        &self,
        mut result: TokenizationResult,
    ) -> (TokenizationResult, Vec<String>, Vec<f32>) {
        if result.tokens.len() < 2 {
            return (result, Vec::new(), Vec::new());
        }

        let words = self.dictionary.words();
        let mut merged = Vec::with_capacity(result.tokens.len());
        let mut merged_confidence = Vec::with_capacity(result.tokens.len());
        let mut compounds = Vec::new();
        let mut compound_confidences = Vec::new();
        let mut i = 0;

        while i < result.tokens.len() {
            let max_span = MAX_COMPOUND_SPAN.min(result.tokens.len() - i);
            let mut matched_span = None;

            for span in (2..=max_span).rev() {
                let candidate: String = result.tokens[i..i + span].concat();
                if words.contains(&candidate) {
                    matched_span = Some((span, candidate));
                    break;
                }
            }

            match matched_span {
                Some((span, candidate)) => {
                    // Confidence of the merged span is the minimum of its
                    // component confidences, capped to 0.95 (spec §4.3 step 3).
                    let span_confidence = (i..i + span)
                        .map(|idx| result.confidence_at(idx))
                        .fold(f32::MAX, f32::min)
                        .min(0.95);
                    compounds.push(candidate.clone());
                    compound_confidences.push(span_confidence);
                    merged.push(candidate);
                    merged_confidence.push(span_confidence);
                    i += span;
                }
                None => {
                    merged_confidence.push(result.confidence_at(i));
                    merged.push(result.tokens[i].clone());
                    i += 1;
                }
            }
        }

        result.tokens = merged;
        result.confidence = Some(merged_confidence);
        (result, compounds, compound_confidences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;

    struct AlwaysFails;
    #[async_trait]
    impl Tokenizer for AlwaysFails {
        fn engine_id(&self) -> &str {
            "broken"
        }
        async fn tokenize(
            &self,
            _text: &str,
            _timeout: Duration,
        ) -> Result<TokenizationResult, TokenizationError> {
            Err(TokenizationError::EngineInternal(
                "broken".into(),
                "boom".into(),
            ))
        }
    }

    struct FixedTokens(Vec<&'static str>);
    #[async_trait]
    impl Tokenizer for FixedTokens {
        fn engine_id(&self) -> &str {
            "fixed"
        }
        async fn tokenize(
            &self,
            text: &str,
            _timeout: Duration,
        ) -> Result<TokenizationResult, TokenizationError> {
            Ok(TokenizationResult {
                original_text: text.to_string(),
                tokens: self.0.iter().map(|s| s.to_string()).collect(),
                confidence: None,
                engine_id: "fixed".into(),
                duration: Duration::ZERO,
                success: true,
                error_reason: None,
            })
        }
    }

    fn dictionary_with(words: &[&str]) -> Arc<DictionaryStore> {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::json!({ "test": words });
        f.write_all(json.to_string().as_bytes()).unwrap();
        Arc::new(DictionaryStore::load(f.path()).unwrap())
    }

    #[tokio::test]
    async fn falls_back_when_all_engines_fail() {
        let facade = TokenizerFacade::new(vec![Arc::new(AlwaysFails)], dictionary_with(&[]));
        let r = facade.tokenize("ข้าว", Duration::from_millis(50)).await;
        assert!(!r.success);
        assert_eq!(r.tokens, vec!["ข้าว".to_string()]);
    }

    #[tokio::test]
    async fn falls_through_to_second_engine() {
        let facade = TokenizerFacade::new(
            vec![Arc::new(AlwaysFails), Arc::new(FixedTokens(vec!["ข้าว"]))],
            dictionary_with(&[]),
        );
        let r = facade.tokenize("ข้าว", Duration::from_millis(50)).await;
        assert!(r.success);
        assert_eq!(r.engine_id, "fixed");
    }

    #[tokio::test]
    async fn merges_adjacent_tokens_into_dictionary_compound() {
        let facade = TokenizerFacade::new(
            vec![Arc::new(FixedTokens(vec!["เกษตร", "อัจฉริยะ"]))],
            dictionary_with(&["เกษตรอัจฉริยะ"]),
        );
        let r = facade.tokenize("เกษตรอัจฉริยะ", Duration::from_millis(50)).await;
        assert_eq!(r.tokens, vec!["เกษตรอัจฉริยะ".to_string()]);
    }

    #[tokio::test]
    async fn empty_input_short_circuits_engines() {
        let facade = TokenizerFacade::new(vec![Arc::new(AlwaysFails)], dictionary_with(&[]));
        let r = facade.tokenize("", Duration::from_millis(50)).await;
        assert!(r.success);
        assert!(r.tokens.is_empty());
    }
}
