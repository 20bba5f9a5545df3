//! Search Proxy Service (C10): the orchestrator that ties every other
//! component together behind one request-facing API (spec §3, §4.10).

mod cache;
mod clients;
mod service;

pub use cache::{fingerprint, SearchCache};
pub use clients::ClientRegistry;
pub use service::{SearchProxyService, MAX_QUERY_CHARS};
