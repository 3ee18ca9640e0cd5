//! Error types for the Edge Config client.
//!
//! # Design
//! The taxonomy is closed: every failed call lands in exactly one of the four
//! variants below. A missing item is not an error; `get` resolves to `None`
//! and `has` to `false` instead. Classification happens where the response is
//! interpreted, so callers only ever `match` on a variant.
//!
//! Every message starts with [`CLIENT_ID`] so errors stay recognisable after
//! they have been wrapped by a consumer.

use thiserror::Error;

use crate::http::TransportError;

/// Fixed identifier prefixed to every error message.
pub const CLIENT_ID: &str = "edge-config";

/// Errors returned by `EdgeConfigClient` operations.
#[derive(Debug, Error)]
pub enum EdgeConfigError {
    /// The connection string was absent, empty, or not a valid Edge Config
    /// connection string (bad URL, no store id, no token).
    #[error("edge-config: No connection string provided")]
    NoConnectionString,

    /// The store itself does not exist (as opposed to a single missing key).
    #[error("edge-config: Edge Config not found")]
    EdgeConfigNotFound,

    /// The request never produced a response.
    #[error("edge-config: Network error")]
    NetworkError(#[source] TransportError),

    /// The server answered with a status the client does not expect, or with
    /// a success body it cannot decode.
    #[error("edge-config: Unexpected error (HTTP {status})")]
    UnexpectedError { status: u16 },
}

impl EdgeConfigError {
    /// HTTP status attached to the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            EdgeConfigError::UnexpectedError { status } => Some(*status),
            EdgeConfigError::EdgeConfigNotFound => Some(404),
            _ => None,
        }
    }
}
