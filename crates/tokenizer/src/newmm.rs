//! `newmm`: a dictionary-augmented longest-match Thai segmenter.
//!
//! This is the one tokenization engine the proxy implements natively rather
//! than calling out over HTTP (see the design note on engine choice). It is
//! deterministic and has no model weights: Thai runs are segmented by
//! maximal munch against the compound dictionary, falling back to a single
//! character when nothing matches; non-Thai runs are split on whitespace.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thaisearch_dictionary::DictionaryStore;

use thaisearch_core::tokenization::{TokenizationError, TokenizationResult, Tokenizer};

const MAX_WORD_CHARS: usize = 16;

pub struct NewmmTokenizer {
    dictionary: Arc<DictionaryStore>,
}

impl NewmmTokenizer {
    pub fn new(dictionary: Arc<DictionaryStore>) -> Self {
        Self { dictionary }
    }

    fn segment(&self, text: &str) -> Vec<String> {
        let words = self.dictionary.words();
        let mut tokens = Vec::new();

        for run in split_runs(text) {
            if run.chars().next().map(thaisearch_core::is_thai_codepoint) == Some(true) {
                tokens.extend(segment_thai_run(&run, &words));
            } else {
                tokens.extend(run.split_whitespace().map(str::to_string));
            }
        }
        tokens
    }
}

/// Splits `text` into maximal runs that are either "starts with a Thai
/// codepoint" or not, preserving interior whitespace for the non-Thai
/// branch to split on.
fn split_runs(text: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut current_is_thai: Option<bool> = None;

    for c in text.chars() {
        let is_thai = thaisearch_core::is_thai_codepoint(c);
        match current_is_thai {
            Some(state) if state == is_thai || c.is_whitespace() => current.push(c),
            Some(_) => {
                runs.push(std::mem::take(&mut current));
                current.push(c);
                current_is_thai = Some(is_thai);
            }
            None => {
                current.push(c);
                current_is_thai = Some(is_thai);
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Greedy longest-match segmentation of a single Thai run against the
/// dictionary. Falls back to one-character tokens where no dictionary word
/// starts at the current position.
fn segment_thai_run(run: &str, words: &std::collections::HashSet<String>) -> Vec<String> {
    let chars: Vec<char> = run.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        let max_len = MAX_WORD_CHARS.min(chars.len() - i);
        let mut matched = None;
        for len in (1..=max_len).rev() {
            let candidate: String = chars[i..i + len].iter().collect();
            if len > 1 && words.contains(&candidate) {
                matched = Some(candidate);
                break;
            }
        }

        match matched {
            Some(word) => {
                let advanced = word.chars().count();
                tokens.push(word);
                i += advanced;
            }
            None => {
                tokens.push(chars[i].to_string());
                i += 1;
            }
        }
    }
    tokens
}

#[async_trait]
impl Tokenizer for NewmmTokenizer {
    fn engine_id(&self) -> &str {
        "newmm"
    }

    async fn tokenize(
        &self,
        text: &str,
        timeout: Duration,
    ) -> Result<TokenizationResult, TokenizationError> {
        if text.is_empty() {
            return Ok(TokenizationResult::empty(self.engine_id()));
        }
        if text.len() > 64 * 1024 {
            return Err(TokenizationError::InputTooLarge(text.len()));
        }

        let start = Instant::now();
        let text_owned = text.to_string();
        let dictionary = self.dictionary.clone();

        let result = tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || {
                NewmmTokenizer { dictionary }.segment(&text_owned)
            }),
        )
        .await;

        match result {
            Ok(Ok(tokens)) => Ok(TokenizationResult {
                original_text: text.to_string(),
                tokens,
                confidence: None,
                engine_id: self.engine_id().to_string(),
                duration: start.elapsed(),
                success: true,
                error_reason: None,
            }),
            Ok(Err(e)) => Err(TokenizationError::EngineInternal(
                self.engine_id().to_string(),
                e.to_string(),
            )),
            Err(_) => Err(TokenizationError::Timeout(self.engine_id().to_string())),
        }
    }
}
