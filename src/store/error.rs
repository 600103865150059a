use std::path::PathBuf;

pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid store or sheet name: {0:?}")]
    InvalidName(String),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("malformed row in {path}: {source}")]
    MalformedRow {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("url parsing error: {0}")]
    UrlParsing(String),
    #[error("remote store rejected the request with status {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
