// File: ./src/error.rs
// Error kinds surfaced by the reminder core.
use thiserror::Error;

/// The calendar document could not be read or understood.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("calendar source unavailable: {0}")]
    Source(#[from] std::io::Error),
    #[error("calendar document is not valid UTF-8")]
    Encoding,
    #[error("document is not an iCalendar file")]
    NotACalendar,
    #[error("malformed calendar: {0}")]
    Grammar(String),
}

/// A single send to a single subscriber did not go through.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery to {subscriber} timed out after {secs}s")]
    Timeout { subscriber: String, secs: u64 },
    #[error("delivery to {subscriber} rejected: {reason}")]
    Rejected { subscriber: String, reason: String },
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("subscriber store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("subscriber store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("invalid subscriber id: {0:?}")]
    InvalidId(String),
}

/// Why a dispatch did not complete. Parse and store failures skip a whole
/// cycle; delivery failures only surface from single-subscriber dispatches.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}
