//! Error values synthesised by the library itself.
//!
//! Streams carry a user-chosen `Err` type end to end; the values here only
//! appear where an operator manufactures an error of its own. Operators
//! that do so require `Err: From<...>` for the relevant type.

use std::time::Duration;

use thiserror::Error;

/// Emitted by `timeout` when no item arrived within the window and no
/// fallback source was configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no item arrived within {after:?}")]
pub struct TimeoutError {
  pub after: Duration,
}

/// Emitted by `first` / `last` when the stream completed empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("stream completed without emitting an item")]
pub struct MissingElementError;

/// Emitted by the demand bridge under `BackpressureStrategy::Error` when an
/// item arrives with no outstanding demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("item arrived without downstream demand")]
pub struct OverflowError;

/// Wraps a failure reported by a `using` release callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("resource release failed: {detail}")]
pub struct CleanupError {
  pub detail: String,
}
