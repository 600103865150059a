use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use strum_macros::AsRefStr;

pub type WebResult<T> = core::result::Result<T, Error>;

#[derive(Debug, AsRefStr, thiserror::Error)]
pub enum Error {
    #[error("data parsing error: {0}")]
    DataParsing(#[from] super::types::DataParsingError),

    #[error("request body rejected: {0}")]
    BodyRejected(#[from] BytesRejection),

    #[error("timed out waiting for the store lock")]
    LockTimeout,

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

impl Error {
    pub fn status_code_and_client_error(&self) -> (StatusCode, ClientError) {
        use ClientError::*;

        match self {
            Error::DataParsing(data_er) => {
                (StatusCode::BAD_REQUEST, BadRequest(data_er.to_string()))
            }
            // Keeps axum's status, 413 for an oversized body.
            Error::BodyRejected(rejection) => {
                (rejection.status(), BadRequest(rejection.body_text()))
            }
            Error::LockTimeout => (
                StatusCode::INTERNAL_SERVER_ERROR,
                InternalError("Timed out waiting for the store lock".to_string()),
            ),
            Error::Store(store_er) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                InternalError(store_er.to_string()),
            ),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::debug!("{:<12} - into_response(Error: {self:?})", "INTO_RESP");

        // Construct a response
        let mut res = StatusCode::INTERNAL_SERVER_ERROR.into_response();

        // Insert the Error into response so that it can be retrieved later.
        res.extensions_mut().insert(Arc::new(self));

        res
    }
}

/// What the caller gets to see, the `Display` output is the `error` field of the body.
#[derive(Debug, AsRefStr, derive_more::Display)]
pub enum ClientError {
    #[display("{_0}")]
    BadRequest(String),
    #[display("{_0}")]
    InternalError(String),
}
