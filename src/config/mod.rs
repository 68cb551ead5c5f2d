pub mod loader;
pub mod schema;

pub use loader::{CliOverrides, ConfigError, get_config_path, load_config, save_config};
pub use schema::{Config, SafeSummary, StoreConfig};
