//! Error types for the WordPress API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the server returned an unexpected
//! status." Every variant produced after a response arrived keeps the
//! [`ResponseMeta`], so the status line stays observable next to the error.
//! A 2xx status other than the expected one is not an error at all; it is
//! reported through [`ResponseMeta::is_expected`] on the successful value.

use serde::Deserialize;

use crate::response::ResponseMeta;

/// Boxed error produced by a transport implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by every client operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the response body could not be read.
    #[error("transport failed: {source}")]
    Transport {
        #[source]
        source: BoxError,
    },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A 2xx body did not match the expected shape.
    #[error("failed to decode {} response: {source}", .meta.status_line())]
    Decode {
        meta: ResponseMeta,
        #[source]
        source: serde_json::Error,
    },

    /// The server returned 404.
    #[error("resource not found ({})", .meta.status_line())]
    NotFound {
        meta: ResponseMeta,
        remote: Option<RemoteError>,
    },

    /// The server returned a non-2xx status other than 404.
    #[error("unexpected status {}: {}", .meta.status_line(), describe(.remote.as_ref(), .body))]
    Status {
        meta: ResponseMeta,
        remote: Option<RemoteError>,
        body: String,
    },

    /// The context was cancelled before the call completed.
    #[error("request cancelled")]
    Cancelled,

    /// The context deadline passed before the call completed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub(crate) fn transport(source: impl Into<BoxError>) -> Self {
        ApiError::Transport {
            source: source.into(),
        }
    }

    /// Response metadata, when the failure happened after a response arrived.
    pub fn meta(&self) -> Option<&ResponseMeta> {
        match self {
            ApiError::Decode { meta, .. }
            | ApiError::NotFound { meta, .. }
            | ApiError::Status { meta, .. } => Some(meta),
            _ => None,
        }
    }

    /// HTTP status code, when a response arrived.
    pub fn status(&self) -> Option<u16> {
        self.meta().map(|meta| meta.status)
    }

    /// The server's structured error body, if it sent one.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ApiError::NotFound { remote, .. } | ApiError::Status { remote, .. } => remote.as_ref(),
            _ => None,
        }
    }

    /// True for errors raised because the context ended.
    pub fn is_context_error(&self) -> bool {
        matches!(self, ApiError::Cancelled | ApiError::DeadlineExceeded)
    }
}

/// Error body returned by the REST API, e.g.
/// `{"code":"rest_term_invalid","message":"Term does not exist.","data":{"status":404}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl RemoteError {
    pub(crate) fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

fn describe(remote: Option<&RemoteError>, body: &str) -> String {
    match remote {
        Some(remote) => format!("{} ({})", remote.message, remote.code),
        None => body.to_string(),
    }
}
