use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("text store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid text store payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("text store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("no text store configured, set MICROCOPY_STORE_URL or MICROCOPY_SEED_FILE")]
    MissingStore,

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
