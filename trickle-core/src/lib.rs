//! # Trickle Core
//!
//! Core components for the Trickle streaming decompression library:
//! a chunk-fed [`BitStream`], the shared [`TrickleError`] type, and the
//! [`Decompressor`] capability trait implemented by each decoding
//! variant.
//!
//! ## Example
//!
//! ```rust
//! use trickle_core::bitstream::BitStream;
//!
//! let mut bits = BitStream::new();
//! bits.append(&[0b0001_1101]);
//! assert_eq!(bits.get_bits(3).unwrap(), 0b101);
//! assert_eq!(bits.get_bits(5).unwrap(), 0b00011);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitstream;
pub mod error;
pub mod traits;

// Re-exports
pub use bitstream::{BitStream, BitStreamState};
pub use error::{Result, TrickleError};
pub use traits::Decompressor;
