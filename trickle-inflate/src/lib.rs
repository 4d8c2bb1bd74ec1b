//! # Trickle Inflate
//!
//! Streaming decoder for the DEFLATE-style compressed block format:
//! stored, fixed-Huffman, and dynamic-Huffman blocks, fed in arbitrary
//! chunks.
//!
//! The decoder never blocks and never reparses: when the buffered input
//! ends mid-element, it suspends at an exact bit position and resumes on
//! the next [`Inflater::feed`]. Output accumulates internally (it doubles
//! as the back-reference window) and is handed out through a read-once
//! drain cursor.
//!
//! ## One-shot
//!
//! ```rust
//! use trickle_inflate::inflate;
//!
//! // A single stored block holding "Hello".
//! let compressed = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o'];
//! assert_eq!(inflate(&compressed).unwrap(), b"Hello");
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use trickle_inflate::Inflater;
//!
//! let compressed = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o'];
//! let mut inflater = Inflater::new();
//! let mut output = Vec::new();
//! for chunk in compressed.chunks(3) {
//!     inflater.feed(chunk).unwrap();
//!     if inflater.has_output() {
//!         output.extend(inflater.drain_output());
//!     }
//! }
//! inflater.finish().unwrap();
//! assert_eq!(output, b"Hello");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod huffman;
pub mod inflate;
pub mod tables;

// Re-exports
pub use huffman::Huffman;
pub use inflate::{Inflater, Phase, inflate};
