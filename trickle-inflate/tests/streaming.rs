//! End-to-end streaming tests: whole streams, byte-at-a-time feeding,
//! drain semantics, and malformed input handling.

use trickle_core::error::TrickleError;
use trickle_core::traits::Decompressor;
use trickle_inflate::{Inflater, Phase, inflate};

/// Little bit-level writer for building test streams.
struct BitSink {
    bytes: Vec<u8>,
    bit: usize,
}

impl BitSink {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit: 0,
        }
    }

    fn push_bit(&mut self, bit: u32) {
        if self.bit % 8 == 0 {
            self.bytes.push(0);
        }
        if bit != 0 {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 1 << (self.bit % 8);
        }
        self.bit += 1;
    }

    /// Write a fixed-width field, low bit first.
    fn write_bits(&mut self, value: u32, count: u32) {
        for i in 0..count {
            self.push_bit((value >> i) & 1);
        }
    }

    /// Write a Huffman code, high bit first (codes go on the wire
    /// most-significant-bit leading).
    fn write_code(&mut self, code: u32, len: u32) {
        for i in (0..len).rev() {
            self.push_bit((code >> i) & 1);
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// A single stored block holding "Hello".
const STORED_HELLO: [u8; 10] = [
    0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o',
];

/// A single fixed-Huffman block holding "abc".
const FIXED_ABC: [u8; 5] = [0x4B, 0x4C, 0x4A, 0x06, 0x00];

/// Fixed-Huffman "abc" followed by a length-4, distance-1 match:
/// the overlapping reference expands to "abccccc".
const FIXED_OVERLAP: [u8; 6] = [0x4B, 0x4C, 0x4A, 0x06, 0x01, 0x00];

/// Build a dynamic-Huffman block that decodes to "aabbbb".
///
/// Literal/length tree: 'a', 'b', and end-of-block, all 2 bits
/// (canonical codes 00, 01, 10). Distance tree: one unused 1-bit code.
/// The code-length tree uses symbols 1, 2, and 18, all 2 bits.
fn build_dynamic_aabbbb() -> Vec<u8> {
    let mut sink = BitSink::new();

    sink.write_bits(1, 1); // BFINAL
    sink.write_bits(2, 2); // BTYPE = dynamic
    sink.write_bits(0, 5); // HLIT: 257 literal/length codes
    sink.write_bits(0, 5); // HDIST: 1 distance code
    sink.write_bits(14, 4); // HCLEN: 18 code-length values

    // Code-length-code lengths in permutation order
    // [16,17,18,0,8,7,9,6,10,5,11,4,12,3,13,2,14,1,15]: length 2 for
    // symbols 18, 2, and 1, zero elsewhere.
    let clen_values = [0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 2];
    for v in clen_values {
        sink.write_bits(v, 3);
    }

    // Canonical codes for the code-length tree: 1 -> 00, 2 -> 01,
    // 18 -> 10. 258 lengths total (257 literal/length + 1 distance):
    // 97 zeros, 2, 2, 157 zeros, 2, then 1 for the distance code.
    sink.write_code(0b10, 2); // 18: run of zeros
    sink.write_bits(97 - 11, 7); // repeat 97
    sink.write_code(0b01, 2); // length 2 for 'a' (97)
    sink.write_code(0b01, 2); // length 2 for 'b' (98)
    sink.write_code(0b10, 2);
    sink.write_bits(138 - 11, 7); // repeat 138 zeros (99..=236)
    sink.write_code(0b10, 2);
    sink.write_bits(19 - 11, 7); // repeat 19 zeros (237..=255)
    sink.write_code(0b01, 2); // length 2 for end-of-block (256)
    sink.write_code(0b00, 2); // length 1 for distance symbol 0

    // Body: a a b b b b <end>, with codes a=00, b=01, end=10.
    sink.write_code(0b00, 2);
    sink.write_code(0b00, 2);
    sink.write_code(0b01, 2);
    sink.write_code(0b01, 2);
    sink.write_code(0b01, 2);
    sink.write_code(0b01, 2);
    sink.write_code(0b10, 2);

    sink.into_bytes()
}

/// Build a dynamic-Huffman block that decodes to "abcabcabc" via a
/// length-6, distance-3 match, exercising repeat codes 16, 17, and 18
/// and a dynamic distance table.
///
/// Literal/length tree: 'a'-'d', end-of-block, and length symbol 260,
/// all 3 bits (codes 000..101 in symbol order; 'd' is unused padding so
/// the header can use repeat code 16). Distance tree: one 1-bit code
/// for symbol 2 (distance 3). Code-length tree: symbols 0, 1, 3, 16,
/// 17, 18, all 3 bits (codes 000..101 in symbol order).
fn build_dynamic_match() -> Vec<u8> {
    let mut sink = BitSink::new();

    sink.write_bits(1, 1); // BFINAL
    sink.write_bits(2, 2); // BTYPE = dynamic
    sink.write_bits(4, 5); // HLIT: 261 literal/length codes
    sink.write_bits(2, 5); // HDIST: 3 distance codes
    sink.write_bits(14, 4); // HCLEN: 18 code-length values

    let clen_values = [3, 3, 3, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 3];
    for v in clen_values {
        sink.write_bits(v, 3);
    }

    // 264 lengths (261 literal/length + 3 distance).
    sink.write_code(0b101, 3); // 18: 97 zeros (0..=96)
    sink.write_bits(97 - 11, 7);
    sink.write_code(0b010, 3); // length 3 for 'a' (97)
    sink.write_code(0b011, 3); // 16: repeat previous 3 times (98..=100)
    sink.write_bits(0, 2);
    sink.write_code(0b101, 3); // 18: 138 zeros (101..=238)
    sink.write_bits(138 - 11, 7);
    sink.write_code(0b100, 3); // 17: 10 zeros (239..=248)
    sink.write_bits(10 - 3, 3);
    sink.write_code(0b100, 3); // 17: 7 zeros (249..=255)
    sink.write_bits(7 - 3, 3);
    sink.write_code(0b010, 3); // length 3 for end-of-block (256)
    sink.write_code(0b100, 3); // 17: 3 zeros (257..=259)
    sink.write_bits(0, 3);
    sink.write_code(0b010, 3); // length 3 for length symbol 260
    sink.write_code(0b000, 3); // distance 0 unused
    sink.write_code(0b000, 3); // distance 1 unused
    sink.write_code(0b001, 3); // length 1 for distance symbol 2

    // Body: a b c, then match (length 6, distance 3), then end.
    // Literal/length codes: a=000, b=001, c=010, end=100, 260=101.
    sink.write_code(0b000, 3);
    sink.write_code(0b001, 3);
    sink.write_code(0b010, 3);
    sink.write_code(0b101, 3); // length 6, no extra bits
    sink.write_code(0b0, 1); // distance symbol 2 -> distance 3
    sink.write_code(0b100, 3);

    sink.into_bytes()
}

/// Feed `data` one byte at a time, draining as output appears, and
/// assert the stream completes with the expected output.
fn assert_byte_at_a_time(data: &[u8], expected: &[u8]) {
    let mut inflater = Inflater::new();
    let mut output = Vec::new();
    for &byte in data {
        inflater.feed(&[byte]).unwrap();
        // An empty feed is a poll and must not disturb anything.
        inflater.feed(&[]).unwrap();
        if inflater.has_output() {
            output.extend(inflater.drain_output());
        }
    }
    inflater.finish().unwrap();
    output.extend(inflater.drain_output());
    assert_eq!(output, expected);
}

#[test]
fn test_stored_block() {
    assert_eq!(inflate(&STORED_HELLO).unwrap(), b"Hello");
}

#[test]
fn test_fixed_block() {
    assert_eq!(inflate(&FIXED_ABC).unwrap(), b"abc");
}

#[test]
fn test_fixed_overlapping_match() {
    assert_eq!(inflate(&FIXED_OVERLAP).unwrap(), b"abccccc");
}

#[test]
fn test_dynamic_block() {
    assert_eq!(inflate(&build_dynamic_aabbbb()).unwrap(), b"aabbbb");
}

#[test]
fn test_dynamic_block_with_match() {
    assert_eq!(inflate(&build_dynamic_match()).unwrap(), b"abcabcabc");
}

#[test]
fn test_multiple_stored_blocks() {
    // "Hi" in a non-final stored block, "ya!" in a final one.
    let compressed = [
        0x00, 0x02, 0x00, 0xFD, 0xFF, b'H', b'i', // BFINAL=0
        0x01, 0x03, 0x00, 0xFC, 0xFF, b'y', b'a', b'!', // BFINAL=1
    ];
    assert_eq!(inflate(&compressed).unwrap(), b"Hiya!");
}

#[test]
fn test_byte_at_a_time_stored() {
    assert_byte_at_a_time(&STORED_HELLO, b"Hello");
}

#[test]
fn test_byte_at_a_time_fixed() {
    assert_byte_at_a_time(&FIXED_OVERLAP, b"abccccc");
}

#[test]
fn test_byte_at_a_time_dynamic() {
    assert_byte_at_a_time(&build_dynamic_aabbbb(), b"aabbbb");
}

#[test]
fn test_drain_preserves_back_reference_window() {
    let mut inflater = Inflater::new();

    // 24 bits in: enough for the header plus 'a' and 'b', not 'c'.
    inflater.feed(&FIXED_OVERLAP[..3]).unwrap();
    assert!(inflater.has_output());
    assert_eq!(inflater.drain_output(), b"ab");
    assert!(!inflater.has_output());

    // The match that follows reaches back past the drain point.
    inflater.feed(&FIXED_OVERLAP[3..]).unwrap();
    inflater.finish().unwrap();
    assert_eq!(inflater.drain_output(), b"ccccc");
    assert_eq!(inflater.output(), b"abccccc");
}

#[test]
fn test_large_stored_block_in_chunks() {
    let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let mut compressed = vec![0x01, 0xE8, 0x03, 0x17, 0xFC]; // LEN=1000
    compressed.extend_from_slice(&payload);

    let mut inflater = Inflater::new();
    for chunk in compressed.chunks(7) {
        inflater.feed(chunk).unwrap();
    }
    inflater.finish().unwrap();
    assert_eq!(inflater.drain_output(), payload);
}

#[test]
fn test_trailing_bytes_after_final_block() {
    let mut inflater = Inflater::new();
    inflater.feed(&STORED_HELLO).unwrap();
    assert_eq!(inflater.phase(), Phase::Done);

    // Bytes past the final block are ignored, not decoded.
    inflater.feed(&[0xDE, 0xAD]).unwrap();
    inflater.finish().unwrap();
    assert_eq!(inflater.drain_output(), b"Hello");
}

#[test]
fn test_finish_mid_stream_is_recoverable() {
    let mut inflater = Inflater::new();
    inflater.feed(&FIXED_ABC[..2]).unwrap();
    assert!(matches!(
        inflater.finish().unwrap_err(),
        TrickleError::IncompleteStream
    ));

    inflater.feed(&FIXED_ABC[2..]).unwrap();
    inflater.finish().unwrap();
    assert_eq!(inflater.drain_output(), b"abc");
}

#[test]
fn test_over_subscribed_dynamic_table() {
    // Dynamic header whose four transmitted code-length-code lengths are
    // all 1: four length-1 codes over-subscribe the code space.
    let mut sink = BitSink::new();
    sink.write_bits(1, 1);
    sink.write_bits(2, 2);
    sink.write_bits(0, 5);
    sink.write_bits(0, 5);
    sink.write_bits(0, 4); // HCLEN: 4 values
    for _ in 0..4 {
        sink.write_bits(1, 3);
    }
    let compressed = sink.into_bytes();

    let mut inflater = Inflater::new();
    let err = inflater.feed(&compressed).unwrap_err();
    assert!(matches!(err, TrickleError::MalformedHuffmanTable { .. }));
    assert_eq!(inflater.phase(), Phase::Failed);

    // Sticky: more input replays the same error.
    assert!(matches!(
        inflater.feed(&STORED_HELLO).unwrap_err(),
        TrickleError::MalformedHuffmanTable { .. }
    ));
}

#[test]
fn test_repeat_code_without_previous_length() {
    // First code-length entry is symbol 16 (copy previous), which has
    // nothing to copy.
    let mut sink = BitSink::new();
    sink.write_bits(1, 1);
    sink.write_bits(2, 2);
    sink.write_bits(0, 5);
    sink.write_bits(0, 5);
    sink.write_bits(0, 4); // 4 values: symbols 16, 17, 18, 0
    sink.write_bits(2, 3); // 16 -> length 2
    sink.write_bits(2, 3); // 17 -> length 2
    sink.write_bits(0, 3);
    sink.write_bits(0, 3);
    sink.write_code(0b00, 2); // symbol 16 first
    sink.write_bits(0, 2);
    let compressed = sink.into_bytes();

    assert!(matches!(
        inflate(&compressed).unwrap_err(),
        TrickleError::MalformedStream { .. }
    ));
}

#[test]
fn test_decompress_all_through_trait() {
    let mut inflater = Inflater::new();
    assert_eq!(inflater.decompress_all(&FIXED_ABC).unwrap(), b"abc");

    // decompress_all resets, so the same instance can run again.
    assert_eq!(inflater.decompress_all(&STORED_HELLO).unwrap(), b"Hello");
}

#[test]
fn test_start_clears_failure() {
    let mut inflater = Inflater::new();
    inflater.feed(&[0x07]).unwrap_err(); // reserved block type
    assert_eq!(inflater.phase(), Phase::Failed);

    inflater.start().unwrap();
    inflater.feed(&STORED_HELLO).unwrap();
    inflater.finish().unwrap();
    assert_eq!(inflater.drain_output(), b"Hello");
}
