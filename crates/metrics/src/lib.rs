//! Metrics & Health (spec §3, §4.9, §6).

mod health;
mod prometheus;
mod recorders;

pub use health::{aggregate, ComponentHealth, HealthReport, HealthStatus};
pub use prometheus::{init_metrics, metrics_handler};
pub use recorders::{
    record_cache_lookup, record_config_reload, record_error, record_request,
    record_search_call, record_search_request, record_tokenization,
};
