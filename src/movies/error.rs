use std::io;

/// Failures of the data source behind a movie lookup.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("catalog IO error: {0}")]
    Io(#[from] io::Error),
    #[error("catalog parse error: {0}")]
    Catalog(#[from] serde_yaml::Error),
}
