//! Chunk-fed bit-level reading for streaming decompression.
//!
//! [`BitStream`] owns a queue of pending input bytes and exposes
//! bit-granularity reads over them. Callers append compressed bytes in
//! arbitrary chunks; reads that cannot be satisfied fail with the
//! transient [`TrickleError::InsufficientInput`] and leave the reader
//! exactly where it was, so the same read can be retried after the next
//! `append` without reparsing anything.
//!
//! # Bit Ordering
//!
//! Bits are consumed LSB-first (least significant bit of each byte
//! first), matching the packing order of DEFLATE-style block formats.
//!
//! # Example
//!
//! ```
//! use trickle_core::bitstream::BitStream;
//!
//! let mut bits = BitStream::new();
//! bits.append(&[0b1100_0101]);
//! assert_eq!(bits.get_bits(3).unwrap(), 0b101);
//! assert_eq!(bits.get_bits(5).unwrap(), 0b11000);
//! assert!(bits.get_bits(1).is_err()); // queue drained
//! ```

use crate::error::{Result, TrickleError};

/// A bit reader over an internally owned queue of input chunks.
///
/// The accumulator register is 32 bits wide; the valid-bit count never
/// exceeds it. At most 24-bit reads are supported, which covers every
/// field in the block format (the widest is the 16-bit stored-block
/// length).
#[derive(Debug, Clone, Default)]
pub struct BitStream {
    /// Pending input bytes, appended by the caller.
    input: Vec<u8>,
    /// Read cursor into `input`.
    pos: usize,
    /// Bit accumulator (LSB-first).
    bit_buffer: u32,
    /// Number of valid bits in the accumulator.
    num_bits: u32,
    /// Total bits consumed so far (for error reporting).
    total_bits: u64,
}

/// Saved position of a [`BitStream`], used to roll back a partially
/// completed multi-field read when input runs out mid-step.
///
/// A snapshot is only valid until the next call to [`BitStream::append`],
/// which may compact the consumed prefix of the queue.
#[derive(Debug, Clone, Copy)]
pub struct BitStreamState {
    pos: usize,
    bit_buffer: u32,
    num_bits: u32,
    total_bits: u64,
}

impl BitStream {
    /// Create an empty bit stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of input bytes to the pending queue.
    ///
    /// Never blocks and never fails; the caller controls memory pressure
    /// by chunk size. The consumed prefix of the queue is compacted away
    /// first, so long-running jobs do not accumulate dead bytes.
    pub fn append(&mut self, bytes: &[u8]) {
        if self.pos > 0 {
            self.input.drain(..self.pos);
            self.pos = 0;
        }
        self.input.extend_from_slice(bytes);
    }

    /// Total number of bits consumed so far.
    pub fn bit_position(&self) -> u64 {
        self.total_bits
    }

    /// Number of valid bits currently buffered in the accumulator.
    pub fn bits_available(&self) -> u32 {
        self.num_bits
    }

    /// Pull one byte from the pending queue into the accumulator.
    ///
    /// Fails with [`TrickleError::InsufficientInput`] if the queue is
    /// empty. The accumulator must have room for a whole byte.
    pub fn load_byte(&mut self) -> Result<()> {
        debug_assert!(self.num_bits <= 24, "accumulator full");
        if self.pos >= self.input.len() {
            return Err(TrickleError::InsufficientInput);
        }
        self.bit_buffer |= (self.input[self.pos] as u32) << self.num_bits;
        self.num_bits += 8;
        self.pos += 1;
        Ok(())
    }

    /// Load bytes from the queue until the accumulator holds more than 24
    /// valid bits or the queue is exhausted. Infallible.
    pub fn refill(&mut self) {
        while self.num_bits <= 24 && self.pos < self.input.len() {
            self.bit_buffer |= (self.input[self.pos] as u32) << self.num_bits;
            self.num_bits += 8;
            self.pos += 1;
        }
    }

    /// Read `count` bits, LSB-first, refilling from the queue as needed.
    ///
    /// On [`TrickleError::InsufficientInput`] nothing is consumed; excess
    /// high bits stay buffered for the next call.
    pub fn get_bits(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= 24, "cannot read more than 24 bits at once");
        if count == 0 {
            return Ok(0);
        }
        if self.num_bits < count {
            self.refill();
            if self.num_bits < count {
                return Err(TrickleError::InsufficientInput);
            }
        }
        let value = self.bit_buffer & ((1u32 << count) - 1);
        self.bit_buffer >>= count;
        self.num_bits -= count;
        self.total_bits += count as u64;
        Ok(value)
    }

    /// Peek at `count` bits without consuming them.
    pub fn peek_bits(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= 24, "cannot peek more than 24 bits at once");
        if count == 0 {
            return Ok(0);
        }
        if self.num_bits < count {
            self.refill();
            if self.num_bits < count {
                return Err(TrickleError::InsufficientInput);
            }
        }
        Ok(self.bit_buffer & ((1u32 << count) - 1))
    }

    /// Discard `count` already-buffered bits.
    pub fn consume(&mut self, count: u32) {
        debug_assert!(count <= self.num_bits, "consuming unbuffered bits");
        self.bit_buffer >>= count;
        self.num_bits -= count;
        self.total_bits += count as u64;
    }

    /// Discard any unconsumed bits of the current byte.
    pub fn align_to_byte(&mut self) {
        let remainder = self.num_bits % 8;
        if remainder > 0 {
            self.consume(remainder);
        }
    }

    /// Byte-align and return the next raw byte.
    ///
    /// Whole bytes already loaded into the accumulator are drained first;
    /// otherwise the byte comes straight from the queue, bypassing the
    /// accumulator. Fails with [`TrickleError::InsufficientInput`] if no
    /// byte is available.
    pub fn read_byte(&mut self) -> Result<u8> {
        self.align_to_byte();
        if self.num_bits >= 8 {
            let byte = (self.bit_buffer & 0xFF) as u8;
            self.consume(8);
            Ok(byte)
        } else if self.pos < self.input.len() {
            let byte = self.input[self.pos];
            self.pos += 1;
            self.total_bits += 8;
            Ok(byte)
        } else {
            Err(TrickleError::InsufficientInput)
        }
    }

    /// Snapshot the current read position for potential rollback.
    pub fn save_state(&self) -> BitStreamState {
        BitStreamState {
            pos: self.pos,
            bit_buffer: self.bit_buffer,
            num_bits: self.num_bits,
            total_bits: self.total_bits,
        }
    }

    /// Restore a previously saved read position.
    pub fn restore_state(&mut self, state: BitStreamState) {
        self.pos = state.pos;
        self.bit_buffer = state.bit_buffer;
        self.num_bits = state.num_bits;
        self.total_bits = state.total_bits;
    }
}
