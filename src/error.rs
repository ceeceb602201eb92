use serde_json::Value;
use thiserror::Error;

use crate::types::MeterType;

/// Errors reported by the client.
///
/// All of these are local to a single call; none of them leave the client in
/// a state that needs reconstruction. `Unreachable` and `AccessDenied` are
/// the user-actionable ones (reconnect or re-authenticate); `SchemaDrift`
/// and `Derivation` mean the device firmware changed its API surface.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection-level failure; retrying is up to the caller.
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// The device rejected the request (HTTP 401/403).
    #[error("access denied for resource {resource}")]
    AccessDenied {
        resource: String,
        /// Device-supplied `error` field, when the body carried one.
        error: Option<String>,
        /// Device-supplied `message` field, when the body carried one.
        message: Option<String>,
    },

    /// Device-reported application error or unexpected response.
    #[error("api error: {0}")]
    Api(String),

    /// A response no longer matches its declared shape (strict mode only).
    #[error("response for '{shape}' does not match the expected schema; missing: {missing:?}, added: {added:?}")]
    SchemaDrift {
        shape: &'static str,
        /// Required fields absent from the response.
        missing: Vec<&'static str>,
        /// Keys present in the response but not declared in the shape.
        added: Vec<String>,
        /// The raw payload, kept for diagnostics.
        raw: Value,
    },

    /// The requested meter category is not reported by this installation.
    #[error("meter '{meter}' is not available; available meters: {available:?}")]
    MeterNotAvailable {
        meter: MeterType,
        available: Vec<MeterType>,
    },

    /// A field was present but its derived value could not be computed.
    #[error("could not derive '{field}' of '{shape}': {reason}")]
    Derivation {
        shape: &'static str,
        field: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
