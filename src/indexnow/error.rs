use std::path::PathBuf;

pub type IndexNowResult<T> = core::result::Result<T, IndexNowError>;

#[derive(Debug, thiserror::Error)]
pub enum IndexNowError {
    #[error("{0} is missing")]
    ConfigMissing(&'static str),
    #[error("figment extraction error: {0}")]
    Config(#[from] Box<figment::Error>),
    #[error("failed to write the key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("url parsing error: {0}")]
    UrlParsing(String),
    #[error("ping rejected with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for IndexNowError {
    fn from(value: figment::Error) -> Self {
        Self::Config(Box::new(value))
    }
}
