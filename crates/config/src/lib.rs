//! Config Manager (spec §3, §4.8).

mod error;
mod manager;
mod settings;
mod watcher;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use settings::{apply_env_map, build_snapshot, load_layered, parse_env_file, RawSettings};
pub use watcher::{spawn as spawn_hot_reload, DEFAULT_DEBOUNCE};
