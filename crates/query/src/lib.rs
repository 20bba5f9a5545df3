//! Query Processor: language detection and query variant generation
//! (spec §3, §4.4).

use std::sync::Arc;
use std::time::Duration;

use thaisearch_core::query::{LanguageMix, ProcessedQuery, QueryVariant, VariantType};
use thaisearch_tokenizer::TokenizerFacade;

/// Generation weight per spec §4.4's variant-generation table. `TOKENIZED`
/// differs between the pure-Thai row (0.9) and the mixed-content row
/// (0.85), so it takes the language mix as context; every other type has a
/// single fixed weight across the rows that emit it. `COMPOUND_SPLIT`'s
/// `0.7 × first-compound-confidence` factor is applied by the caller, which
/// has the confidence value; this returns the bare `0.7`.
fn generation_weight(variant_type: VariantType, mixed_content: bool) -> f32 {
    match variant_type {
        VariantType::Original => 1.0,
        VariantType::Phrase => 1.0,
        VariantType::Tokenized => {
            if mixed_content {
                0.85
            } else {
                0.9
            }
        }
        VariantType::CompoundSplit => 0.7,
        VariantType::ThaiOnly | VariantType::EnglishOnly => 0.7,
        VariantType::Fallback => 0.5,
    }
}

pub struct QueryProcessor {
    facade: Arc<TokenizerFacade>,
}

impl QueryProcessor {
    pub fn new(facade: Arc<TokenizerFacade>) -> Self {
        Self { facade }
    }

    /// Builds the full set of query variants for one request (spec §4.4):
    ///
    /// - pure non-Thai: the original query alone, no tokenization call
    /// - pure Thai, multi-token: `TOKENIZED` (+ `COMPOUND_SPLIT` when the
    ///   merge pass found a compound)
    /// - pure Thai, single token: `TOKENIZED` is identical to `ORIGINAL`
    ///   and is dropped to avoid a redundant call to the index engine
    /// - mixed Thai/English: `TOKENIZED`, plus `THAI_ONLY` and
    ///   `ENGLISH_ONLY` script-isolated variants
    /// - tokenization failed: a `FALLBACK` variant alongside `ORIGINAL`
    ///
    /// A query quoted end-to-end (`"..."`) is marked `phrase_quoted` on the
    /// `ORIGINAL` variant instead of generating a separate `PHRASE` entry,
    /// since it covers the same text.
    pub async fn process(
        &self,
        query: &str,
        timeout: Duration,
        max_variants: usize,
    ) -> ProcessedQuery {
        let language = LanguageMix::detect(query);
        let (text, phrase_quoted) = strip_phrase_quotes(query);

        let mut original = QueryVariant::original(text);
        original.phrase_quoted = phrase_quoted;
        let mut variants = vec![original];
        let mut compound_words = Vec::new();

        let primary_tokenization = if language.thai_detected {
            let detailed = self.facade.tokenize_detailed(text, timeout).await;

            if !detailed.result.success {
                variants.push(QueryVariant {
                    text: text.to_string(),
                    variant_type: VariantType::Fallback,
                    weight: generation_weight(VariantType::Fallback, language.mixed_content),
                    engine_id: Some(detailed.result.engine_id.clone()),
                    phrase_quoted: false,
                });
            } else {
                let tokenized_text = detailed.result.tokens.join(" ");
                if tokenized_text.trim() != text.trim() {
                    variants.push(QueryVariant {
                        text: tokenized_text,
                        variant_type: VariantType::Tokenized,
                        weight: generation_weight(VariantType::Tokenized, language.mixed_content),
                        engine_id: Some(detailed.result.engine_id.clone()),
                        phrase_quoted: false,
                    });
                }

                // `compound_words_detected()` reports every dictionary
                // compound the facade merged, independent of whether a
                // COMPOUND_SPLIT variant gets generated from it.
                compound_words = detailed.compounds_merged.clone();

                // COMPOUND_SPLIT only belongs to the pure-Thai row of the
                // variant-generation table (spec §4.4); the mixed row emits
                // THAI_ONLY/ENGLISH_ONLY instead. It also requires at least
                // two tokens post-merge — a whole-query compound that the
                // merge pass reassembled into a single token is already
                // exactly ORIGINAL, so emitting it again here would be a
                // duplicate (spec §4.4 "pure Thai, single token" row).
                if !language.mixed_content
                    && detailed.result.tokens.len() >= 2
                    && !detailed.compounds_merged.is_empty()
                {
                    if let Some(first_token) = detailed.result.tokens.first() {
                        let confidence = detailed.compound_confidences.first().copied().unwrap_or(0.8);
                        variants.push(QueryVariant {
                            text: first_token.clone(),
                            variant_type: VariantType::CompoundSplit,
                            weight: generation_weight(VariantType::CompoundSplit, false) * confidence,
                            engine_id: Some(detailed.result.engine_id.clone()),
                            phrase_quoted: false,
                        });
                    }
                }

                if language.mixed_content {
                    let thai_only = only_thai(text);
                    let english_only = only_non_thai(text);
                    if !thai_only.trim().is_empty() {
                        variants.push(QueryVariant {
                            text: thai_only,
                            variant_type: VariantType::ThaiOnly,
                            weight: generation_weight(VariantType::ThaiOnly, true),
                            engine_id: None,
                            phrase_quoted: false,
                        });
                    }
                    if !english_only.trim().is_empty() {
                        variants.push(QueryVariant {
                            text: english_only,
                            variant_type: VariantType::EnglishOnly,
                            weight: generation_weight(VariantType::EnglishOnly, true),
                            engine_id: None,
                            phrase_quoted: false,
                        });
                    }
                }
            }

            Some(detailed.result)
        } else {
            None
        };

        ProcessedQuery {
            original_query: query.to_string(),
            language,
            primary_tokenization,
            variants,
            compound_words,
        }
        .finalize(max_variants)
    }
}

fn strip_phrase_quotes(text: &str) -> (&str, bool) {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        (&trimmed[1..trimmed.len() - 1], true)
    } else {
        (text, false)
    }
}

fn only_thai(text: &str) -> String {
    text.chars()
        .map(|c| {
            if thaisearch_core::is_thai_codepoint(c) || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn only_non_thai(text: &str) -> String {
    text.chars()
        .map(|c| {
            if !thaisearch_core::is_thai_codepoint(c) {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use thaisearch_dictionary::DictionaryStore;
    use thaisearch_tokenizer::NewmmTokenizer;

    fn facade_with(words: &[&str]) -> Arc<TokenizerFacade> {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::json!({ "test": words });
        f.write_all(json.to_string().as_bytes()).unwrap();
        let dict = Arc::new(DictionaryStore::load(f.path()).unwrap());
        Arc::new(TokenizerFacade::new(
            vec![Arc::new(NewmmTokenizer::new(dict.clone()))],
            dict,
        ))
    }

    #[tokio::test]
    async fn pure_english_has_only_original_variant() {
        let processor = QueryProcessor::new(facade_with(&[]));
        let pq = processor
            .process("smart farm", Duration::from_millis(100), 5)
            .await;
        assert_eq!(pq.variants.len(), 1);
        assert_eq!(pq.variants[0].variant_type, VariantType::Original);
    }

    #[tokio::test]
    async fn pure_thai_multi_token_gets_tokenized_variant() {
        let processor = QueryProcessor::new(facade_with(&[]));
        let pq = processor
            .process("ข้าวโพด", Duration::from_millis(100), 5)
            .await;
        assert!(pq
            .variants
            .iter()
            .any(|v| v.variant_type == VariantType::Tokenized));
    }

    #[tokio::test]
    async fn mixed_content_gets_script_isolated_variants() {
        let processor = QueryProcessor::new(facade_with(&["เกษตรอัจฉริยะ"]));
        let pq = processor
            .process("Smart Farm เกษตรอัจฉริยะ", Duration::from_millis(100), 10)
            .await;
        assert!(pq
            .variants
            .iter()
            .any(|v| v.variant_type == VariantType::ThaiOnly && (v.weight - 0.7).abs() < 1e-6));
        assert!(pq
            .variants
            .iter()
            .any(|v| v.variant_type == VariantType::EnglishOnly && (v.weight - 0.7).abs() < 1e-6));
        // mixed-content row: TOKENIZED is 0.85, not the pure-Thai row's 0.9,
        // and no COMPOUND_SPLIT variant is emitted (spec §4.4 table).
        assert!(pq
            .variants
            .iter()
            .any(|v| v.variant_type == VariantType::Tokenized && (v.weight - 0.85).abs() < 1e-6));
        assert!(!pq.variants.iter().any(|v| v.variant_type == VariantType::CompoundSplit));
    }

    /// An engine that returns pre-fixed, already-fragmented tokens,
    /// standing in for a dictionary-agnostic engine (`attacut`/`deepcut`)
    /// that splits a compound into its component syllables the way the
    /// real engines do — unlike `NewmmTokenizer`, which shares the same
    /// dictionary and would never produce fragments for it to merge.
    struct FragmentingEngine(Vec<&'static str>);
    #[async_trait::async_trait]
    impl thaisearch_core::tokenization::Tokenizer for FragmentingEngine {
        fn engine_id(&self) -> &str {
            "fragmenting"
        }
        async fn tokenize(
            &self,
            text: &str,
            _timeout: Duration,
        ) -> Result<thaisearch_core::tokenization::TokenizationResult, thaisearch_core::tokenization::TokenizationError>
        {
            Ok(thaisearch_core::tokenization::TokenizationResult {
                original_text: text.to_string(),
                tokens: self.0.iter().map(|s| s.to_string()).collect(),
                confidence: None,
                engine_id: "fragmenting".into(),
                duration: Duration::ZERO,
                success: true,
                error_reason: None,
            })
        }
    }

    #[tokio::test]
    async fn compound_preservation_matches_spec_scenario_weights() {
        // spec §8 scenario 1: dictionary has "วากาเมะ"; the base engine
        // fragments it into syllables the way a dictionary-agnostic
        // tokenizer would. Expected: ORIGINAL 1.0, TOKENIZED 0.9,
        // COMPOUND_SPLIT 0.7 × confidence (confidence defaults to 0.8 when
        // the engine never reports one, so the effective weight is 0.56,
        // still `<= 0.7` per the invariant in spec §3).
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(serde_json::json!({"test": ["วากาเมะ"]}).to_string().as_bytes()).unwrap();
        let dict = Arc::new(DictionaryStore::load(f.path()).unwrap());
        let facade = Arc::new(TokenizerFacade::new(
            vec![Arc::new(FragmentingEngine(vec!["สาหร่าย", "วา", "กา", "เมะ"]))],
            dict,
        ));
        let processor = QueryProcessor::new(facade);
        let pq = processor
            .process("สาหร่ายวากาเมะ", Duration::from_millis(100), 5)
            .await;

        let original = pq.variants.iter().find(|v| v.variant_type == VariantType::Original).unwrap();
        assert!((original.weight - 1.0).abs() < 1e-6);

        let tokenized = pq.variants.iter().find(|v| v.variant_type == VariantType::Tokenized).unwrap();
        assert!((tokenized.weight - 0.9).abs() < 1e-6);
        assert_eq!(tokenized.text, "สาหร่าย วากาเมะ");

        let compound = pq.variants.iter().find(|v| v.variant_type == VariantType::CompoundSplit).unwrap();
        assert_eq!(compound.text, "สาหร่าย");
        assert!(compound.weight > 0.0 && compound.weight <= 0.7);

        assert_eq!(pq.compound_words_detected(), vec!["วากาเมะ".to_string()]);
    }

    #[tokio::test]
    async fn whole_query_compound_merging_to_one_token_skips_tokenized_and_compound_split() {
        // The whole query is itself one dictionary compound; a fragmenting
        // engine splits it into syllables and the facade's merge pass
        // reassembles it into exactly one token equal to the original text.
        // Spec §4.4's "pure Thai, single token" row is ORIGINAL only.
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(serde_json::json!({"test": ["วากาเมะ"]}).to_string().as_bytes()).unwrap();
        let dict = Arc::new(DictionaryStore::load(f.path()).unwrap());
        let facade = Arc::new(TokenizerFacade::new(
            vec![Arc::new(FragmentingEngine(vec!["วา", "กา", "เมะ"]))],
            dict,
        ));
        let processor = QueryProcessor::new(facade);
        let pq = processor.process("วากาเมะ", Duration::from_millis(100), 5).await;

        assert_eq!(pq.variants.len(), 1);
        assert_eq!(pq.variants[0].variant_type, VariantType::Original);
        assert!(!pq.variants.iter().any(|v| v.variant_type == VariantType::Tokenized));
        assert!(!pq.variants.iter().any(|v| v.variant_type == VariantType::CompoundSplit));
        // still reported even though no COMPOUND_SPLIT variant was generated
        assert_eq!(pq.compound_words_detected(), vec!["วากาเมะ".to_string()]);
    }

    #[tokio::test]
    async fn quoted_query_marks_phrase_on_original() {
        let processor = QueryProcessor::new(facade_with(&[]));
        let pq = processor
            .process("\"smart farm\"", Duration::from_millis(100), 5)
            .await;
        assert!(pq.variants[0].phrase_quoted);
        assert_eq!(pq.variants[0].text, "smart farm");
    }

    #[tokio::test]
    async fn variant_count_is_bounded_by_max_variants() {
        let processor = QueryProcessor::new(facade_with(&["เกษตรอัจฉริยะ"]));
        let pq = processor
            .process("Smart Farm เกษตรอัจฉริยะ", Duration::from_millis(100), 2)
            .await;
        assert!(pq.variants.len() <= 2);
    }
}
