mod error;
mod load;
mod paths;
mod types;

pub use load::{load_config, LoadedConfig};
pub use paths::ConfigPaths;
pub use types::LoggingConfig;
