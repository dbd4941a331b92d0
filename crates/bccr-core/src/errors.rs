use thiserror::Error;

/// Failures crossing the transport boundary, plus local validation errors.
///
/// `Protocol` and `Forbidden` are surfaced to the user; `NotFound` on an
/// inbound event is logged and dropped by the reconciler, but surfaced when a
/// user action caused it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid channel address: {0}")]
    InvalidChannel(String),
}
