use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("catalog API returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}
