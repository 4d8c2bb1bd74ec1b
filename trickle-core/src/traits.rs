//! Core traits for streaming decompression.
//!
//! [`Decompressor`] is the capability interface every decoding variant
//! implements. Callers pick a concrete variant at construction time and
//! drive it through this trait alone; no later type inspection is needed.

use crate::error::Result;

/// A streaming decompressor.
///
/// One instance handles one decompression job. The caller owns pacing:
/// compressed bytes go in via [`feed`](Self::feed) in arbitrary chunks
/// (including empty ones, which act as a no-op poll), and decompressed
/// bytes come back out through [`drain_output`](Self::drain_output).
/// Instances are not thread-safe; parallel jobs need one instance per
/// stream.
pub trait Decompressor {
    /// Reset to the initial state with empty output and a cleared error.
    fn start(&mut self) -> Result<()>;

    /// Enqueue compressed bytes and decode as far as they allow.
    ///
    /// Running out of input mid-block is not an error; the engine
    /// suspends at an exact resume position and this call succeeds.
    /// Returns the original failure if the engine has already failed.
    fn feed(&mut self, input: &[u8]) -> Result<()>;

    /// Declare the input complete.
    ///
    /// Fails with [`TrickleError::IncompleteStream`](crate::error::TrickleError::IncompleteStream)
    /// if the final block has not been fully decoded.
    fn finish(&mut self) -> Result<()>;

    /// Whether undrained output is available.
    fn has_output(&self) -> bool;

    /// Take all decompressed bytes produced since the last drain.
    fn drain_output(&mut self) -> Vec<u8>;

    /// Decompress a complete buffer in one call (convenience method).
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.start()?;
        self.feed(input)?;
        self.finish()?;
        Ok(self.drain_output())
    }
}
