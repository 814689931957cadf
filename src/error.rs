use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Connection pool errors.
///
/// `DirectoryUnavailable` and `HandshakeFailed` are produced by the
/// connection factory and are non-fatal to a running pool: the maintenance
/// tick logs them and retries on its next run.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("directory returned no usable server for {target}")]
    DirectoryUnavailable { target: String },

    #[error("handshake with {server} failed: {reason}")]
    HandshakeFailed { server: String, reason: String },

    #[error("no usable connection in pool")]
    NoUsableConnection,

    #[error("pool is shut down")]
    PoolClosed,

    #[error("could not open any initial connection: {0}")]
    StartFailed(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
