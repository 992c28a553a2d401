// ============================================================================
// spark-signal-utils - Errors
// ============================================================================

use thiserror::Error;

/// Errors returned by reactive collections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The operation exists for parity with ordinary sets but is not
    /// available on a reactive one.
    #[error("`{operation}` is not supported on a reactive set")]
    UnsupportedOperation {
        /// Name of the rejected operation.
        operation: &'static str,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
