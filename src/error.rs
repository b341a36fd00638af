use thiserror::Error;

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("{0}.target must be at least 1")]
    ZeroRepTarget(&'static str),
}
