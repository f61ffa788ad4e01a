use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("gif not found: {0}")]
    NotFound(String),
    #[error("url must not be empty")]
    EmptyUrl,
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
    #[error("backend failure: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
