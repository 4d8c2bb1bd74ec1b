//! Error types for Trickle operations.
//!
//! A single error enum covers every failure a decoder can report. One
//! variant is special: [`TrickleError::InsufficientInput`] is a transient
//! control signal, not a failure. It means "the engine ran out of buffered
//! bytes mid-step; call again once more data exists". Engines absorb it in
//! their `feed` path and never enter a failed state because of it.
//!
//! The error type is `Clone` so that an engine that has hit a hard failure
//! can replay the original error on every subsequent call (sticky
//! failure).

use thiserror::Error;

/// The main error type for Trickle operations.
#[derive(Debug, Clone, Error)]
pub enum TrickleError {
    /// More input is required before the current step can complete.
    ///
    /// Transient: the reader state is left exactly where it was, and the
    /// same step succeeds once more bytes have been appended.
    #[error("more input is required to make progress")]
    InsufficientInput,

    /// A code-length list violates the canonical-code invariants.
    #[error("malformed Huffman table: {message}")]
    MalformedHuffmanTable {
        /// Description of the invalid assignment.
        message: String,
    },

    /// Corrupt compressed data.
    #[error("malformed stream at bit {bit_position}: {message}")]
    MalformedStream {
        /// Bit position at which the corruption was detected.
        bit_position: u64,
        /// Description of the corruption.
        message: String,
    },

    /// `finish` was called before the final block was decoded.
    #[error("stream is incomplete: finish called before the final block")]
    IncompleteStream,
}

/// Result type alias for Trickle operations.
pub type Result<T> = std::result::Result<T, TrickleError>;

impl TrickleError {
    /// Create a malformed Huffman table error.
    pub fn malformed_table(message: impl Into<String>) -> Self {
        Self::MalformedHuffmanTable {
            message: message.into(),
        }
    }

    /// Create a malformed stream error.
    pub fn malformed_stream(bit_position: u64, message: impl Into<String>) -> Self {
        Self::MalformedStream {
            bit_position,
            message: message.into(),
        }
    }

    /// Whether this is the transient "feed me more bytes" signal.
    pub fn is_insufficient_input(&self) -> bool {
        matches!(self, Self::InsufficientInput)
    }
}
