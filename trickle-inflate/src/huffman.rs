//! Canonical Huffman decoding tables.
//!
//! The block format transmits Huffman codes as per-symbol code lengths
//! only; the codes themselves are canonical. Given fixed lengths, codes
//! are assigned deterministically: length by length, and within a length
//! consecutively in increasing symbol order. Shorter codes numerically
//! precede all longer codes, which is what makes the range-based bound
//! search in the slow decode path correct.
//!
//! Decoding uses a 512-entry fast table keyed by a bit-reversed 9-bit
//! prefix (reversed because bits arrive low-bit-first on the wire); codes
//! longer than 9 bits fall back to extending the prefix one bit at a time
//! against per-length code bounds.

use crate::tables::LITLEN_ALPHABET_SIZE;
use trickle_core::bitstream::BitStream;
use trickle_core::error::{Result, TrickleError};

/// Maximum code length in the block format (15 bits).
pub const MAX_CODE_LENGTH: usize = 15;

/// A canonical Huffman decode table.
///
/// Built once per tree needed: literal/length, distance, and (for dynamic
/// blocks) the transient code-length tree all use the same structure.
#[derive(Debug, Clone)]
pub struct Huffman {
    /// Fast lookup keyed by bit-reversed 9-bit prefix; packed
    /// `(length << 9) | symbol`, 0 = sentinel (slow path).
    fast: [u16; 1 << Self::FAST_BITS],
    /// First canonical code of each length.
    firstcode: [u16; MAX_CODE_LENGTH + 1],
    /// Exclusive upper code bound per length, for the slow-path search.
    maxcode: [u32; MAX_CODE_LENGTH + 1],
    /// Offset of each length's first symbol in the rank-sorted arrays.
    firstsymbol: [u16; MAX_CODE_LENGTH + 1],
    /// Code length per canonical rank.
    size: [u8; LITLEN_ALPHABET_SIZE],
    /// Symbol value per canonical rank.
    value: [u16; LITLEN_ALPHABET_SIZE],
}

impl Huffman {
    /// Number of bits resolved by the fast table.
    const FAST_BITS: u32 = 9;

    /// Symbol mask for packed fast-table entries.
    const FAST_MASK: u16 = (1 << Self::FAST_BITS) - 1;

    /// Build a decode table from per-symbol code lengths.
    ///
    /// A length of 0 marks an unused symbol; valid lengths are 1-15.
    /// Fails with [`TrickleError::MalformedHuffmanTable`] if the lengths
    /// over-subscribe the code space (Kraft-McMillan violation), since a
    /// corrupt table risks out-of-range decodes. Incomplete codes are
    /// tolerated; an all-zero list builds a table that rejects every
    /// decode.
    pub fn build(lengths: &[u8]) -> Result<Self> {
        if lengths.len() > LITLEN_ALPHABET_SIZE {
            return Err(TrickleError::malformed_table(format!(
                "alphabet size {} exceeds maximum {}",
                lengths.len(),
                LITLEN_ALPHABET_SIZE
            )));
        }

        // Count symbols per length; length 0 is excluded.
        let mut count = [0u32; MAX_CODE_LENGTH + 1];
        for &len in lengths {
            if len as usize > MAX_CODE_LENGTH {
                return Err(TrickleError::malformed_table(format!(
                    "code length {} exceeds maximum {}",
                    len, MAX_CODE_LENGTH
                )));
            }
            if len > 0 {
                count[len as usize] += 1;
            }
        }

        // Assign canonical code ranges length by length.
        let mut firstcode = [0u16; MAX_CODE_LENGTH + 1];
        let mut maxcode = [0u32; MAX_CODE_LENGTH + 1];
        let mut firstsymbol = [0u16; MAX_CODE_LENGTH + 1];
        let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
        let mut code = 0u32;
        let mut total = 0u16;
        for len in 1..=MAX_CODE_LENGTH {
            code = (code + count[len - 1]) << 1;
            if code + count[len] > 1u32 << len {
                return Err(TrickleError::malformed_table(
                    "over-subscribed code lengths",
                ));
            }
            firstcode[len] = code as u16;
            firstsymbol[len] = total;
            next_code[len] = code;
            maxcode[len] = code + count[len];
            total += count[len] as u16;
        }

        // Populate the rank-sorted arrays and the fast table.
        let mut fast = [0u16; 1 << Self::FAST_BITS];
        let mut size = [0u8; LITLEN_ALPHABET_SIZE];
        let mut value = [0u16; LITLEN_ALPHABET_SIZE];
        for (symbol, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let len_idx = len as usize;
            let c = next_code[len_idx];
            next_code[len_idx] += 1;

            let rank = firstsymbol[len_idx] as usize + (c - firstcode[len_idx] as u32) as usize;
            size[rank] = len;
            value[rank] = symbol as u16;

            if len_idx <= Self::FAST_BITS as usize {
                let entry = ((len as u16) << Self::FAST_BITS) | symbol as u16;
                let mut index = Self::reverse_bits(c as u16, len) as usize;
                while index < 1 << Self::FAST_BITS {
                    fast[index] = entry;
                    index += 1 << len_idx;
                }
            }
        }

        Ok(Self {
            fast,
            firstcode,
            maxcode,
            firstsymbol,
            size,
            value,
        })
    }

    /// Reverse the low `length` bits of a code.
    fn reverse_bits(mut code: u16, length: u8) -> u16 {
        let mut reversed = 0u16;
        for _ in 0..length {
            reversed = (reversed << 1) | (code & 1);
            code >>= 1;
        }
        reversed
    }

    /// Decode one symbol from the bit stream.
    ///
    /// Fails with [`TrickleError::InsufficientInput`] if the buffered
    /// input ends mid-code (transient; the caller is expected to roll the
    /// reader back and retry after more input), or with
    /// [`TrickleError::MalformedStream`] if no code matches within 15
    /// bits.
    #[inline]
    pub fn decode(&self, bits: &mut BitStream) -> Result<u16> {
        bits.refill();
        if bits.bits_available() >= Self::FAST_BITS {
            let key = bits.peek_bits(Self::FAST_BITS)?;
            let entry = self.fast[key as usize];
            if entry != 0 {
                let len = (entry >> Self::FAST_BITS) as u32;
                bits.consume(len);
                return Ok(entry & Self::FAST_MASK);
            }
            // Sentinel: no code of length <= 9 matches this prefix, so the
            // canonical bound at length 9 is already exceeded. Extend the
            // bit-reversed prefix one bit at a time.
            let code = Self::reverse_bits(key as u16, Self::FAST_BITS as u8) as u32;
            bits.consume(Self::FAST_BITS);
            self.decode_extend(bits, code, Self::FAST_BITS as usize + 1)
        } else {
            // Fewer than 9 bits buffered: a short code may still fit, so
            // build the running code from length 1.
            self.decode_extend(bits, 0, 1)
        }
    }

    /// Extend `code` one bit per length starting at `from`, bounded by
    /// `maxcode`, and resolve it through the rank-sorted arrays.
    fn decode_extend(&self, bits: &mut BitStream, mut code: u32, from: usize) -> Result<u16> {
        for len in from..=MAX_CODE_LENGTH {
            code = (code << 1) | bits.get_bits(1)?;
            if code < self.maxcode[len] {
                let rank =
                    self.firstsymbol[len] as usize + (code - self.firstcode[len] as u32) as usize;
                debug_assert_eq!(self.size[rank] as usize, len);
                return Ok(self.value[rank]);
            }
        }
        Err(TrickleError::malformed_stream(
            bits.bit_position(),
            "no matching Huffman code within 15 bits",
        ))
    }
}
