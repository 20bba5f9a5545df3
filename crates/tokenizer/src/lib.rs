//! Tokenization engines and the engine-selection facade (spec §3, §4.2, §4.3).

mod facade;
mod http_engine;
mod newmm;

pub use facade::{FacadeTokenization, TokenizerFacade};
pub use http_engine::HttpTokenizerEngine;
pub use newmm::NewmmTokenizer;

pub use thaisearch_core::tokenization::{Tokenizer, TokenizationError, TokenizationResult};
