//! Index Engine Client (spec §3, §4.5).

mod client;
mod error;
mod search;

pub use client::{IndexEngineClient, IndexEngineClientConfig};
pub use error::IndexEngineError;
pub use search::search_variant;
