//! Tokenization engine contract and result type (spec §3, §4.2).

use std::time::Duration;
use thiserror::Error;

/// Output of any engine invocation.
///
/// Invariant: `tokens.concat()` (after the engine's declared whitespace
/// policy) equals `original_text`.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizationResult {
    pub original_text: String,
    pub tokens: Vec<String>,
    /// Per-token confidence in [0.0, 1.0]. Absent confidence is treated as
    /// 0.8 by callers (spec §4.2), not encoded here as a sentinel.
    pub confidence: Option<Vec<f32>>,
    pub engine_id: String,
    pub duration: Duration,
    pub success: bool,
    pub error_reason: Option<String>,
}

impl TokenizationResult {
    /// A single-token result covering the whole input, used by the facade's
    /// fallback policy (spec §4.3) when every engine fails.
    pub fn fallback(original_text: &str) -> Self {
        Self {
            original_text: original_text.to_string(),
            tokens: vec![original_text.to_string()],
            confidence: None,
            engine_id: "fallback".to_string(),
            duration: Duration::ZERO,
            success: false,
            error_reason: Some("all tokenization engines failed".to_string()),
        }
    }

    /// Empty input returns an empty-token result in O(1) (spec §4.2).
    pub fn empty(engine_id: &str) -> Self {
        Self {
            original_text: String::new(),
            tokens: Vec::new(),
            confidence: None,
            engine_id: engine_id.to_string(),
            duration: Duration::ZERO,
            success: true,
            error_reason: None,
        }
    }

    /// Confidence for token at `index`, defaulting absent values to 0.8.
    pub fn confidence_at(&self, index: usize) -> f32 {
        self.confidence
            .as_ref()
            .and_then(|c| c.get(index).copied())
            .unwrap_or(0.8)
    }
}

/// Codepoint offsets of each token's start/end in `original`, used by
/// `POST /api/v1/tokenize` (spec §6). Offsets are codepoints, not UTF-8
/// bytes (spec §9 Open Question (a), resolved in DESIGN.md).
///
/// Tokens are located by a left-to-right scan rather than by summing
/// lengths, since an engine's whitespace policy may drop separators that
/// appeared between tokens in `original` (spec §3's reconstruction
/// invariant is "after whitespace-normalization", not "exact
/// concatenation"). Returns `tokens.len() + 1` offsets.
pub fn word_boundaries(original: &str, tokens: &[String]) -> Vec<usize> {
    let chars: Vec<char> = original.chars().collect();
    let mut boundaries = Vec::with_capacity(tokens.len() + 1);
    let mut cursor = 0usize;
    boundaries.push(0);

    for token in tokens {
        let token_chars: Vec<char> = token.chars().collect();
        if token_chars.is_empty() {
            boundaries.push(cursor);
            continue;
        }

        let search_end = chars.len().saturating_sub(token_chars.len());
        let found = (cursor..=search_end).find(|&start| chars[start..start + token_chars.len()] == token_chars[..]);

        let start = found.unwrap_or(cursor);
        cursor = start + token_chars.len();
        boundaries.push(cursor);
    }

    boundaries
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizationError {
    #[error("tokenizer '{0}' timed out")]
    Timeout(String),
    #[error("tokenizer '{0}' failed internally: {1}")]
    EngineInternal(String, String),
    #[error("input too large: {0} bytes")]
    InputTooLarge(usize),
    #[error("all tokenization engines failed")]
    AllEnginesFailed,
}

/// Common contract every segmenter implements (spec §4.2).
///
/// Implementations must be safe to invoke concurrently — no interior
/// mutation that isn't itself `Send + Sync`.
#[async_trait::async_trait]
pub trait Tokenizer: Send + Sync {
    /// Stable identifier used in `TokenizationResult::engine_id` and in
    /// metrics labels.
    fn engine_id(&self) -> &str;

    async fn tokenize(
        &self,
        text: &str,
        timeout: std::time::Duration,
    ) -> Result<TokenizationResult, TokenizationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_marks_failure() {
        let r = TokenizationResult::fallback("ข้าว");
        assert!(!r.success);
        assert_eq!(r.tokens, vec!["ข้าว".to_string()]);
    }

    #[test]
    fn empty_is_success_with_no_tokens() {
        let r = TokenizationResult::empty("newmm");
        assert!(r.success);
        assert!(r.tokens.is_empty());
    }

    #[test]
    fn word_boundaries_cover_whole_text_when_concatenated() {
        let tokens = vec!["เกษตร".to_string(), "อัจฉริยะ".to_string()];
        let boundaries = word_boundaries("เกษตรอัจฉริยะ", &tokens);
        assert_eq!(boundaries, vec![0, 5, 13]);
        assert_eq!(boundaries.len(), tokens.len() + 1);
    }

    #[test]
    fn word_boundaries_skip_dropped_whitespace() {
        let tokens = vec!["Smart".to_string(), "Farm".to_string()];
        let boundaries = word_boundaries("Smart Farm", &tokens);
        assert_eq!(boundaries, vec![0, 5, 10]);
    }

    #[test]
    fn confidence_defaults_to_point_eight() {
        let r = TokenizationResult {
            original_text: "ab".into(),
            tokens: vec!["a".into(), "b".into()],
            confidence: None,
            engine_id: "newmm".into(),
            duration: Duration::ZERO,
            success: true,
            error_reason: None,
        };
        assert_eq!(r.confidence_at(0), 0.8);
    }
}
