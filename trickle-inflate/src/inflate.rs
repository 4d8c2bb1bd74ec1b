//! Streaming block decoding.
//!
//! [`Inflater`] decodes a sequence of compressed blocks (stored,
//! fixed-Huffman, or dynamic-Huffman) delivered in arbitrary chunks. The
//! decoder is a state machine: each phase reads what it needs from the
//! internal [`BitStream`], and any step that runs out of buffered input
//! suspends by rolling the reader back to the step boundary and leaving
//! the resume records untouched. The next `feed` picks up exactly where
//! the last one stopped, so no input is ever reparsed.
//!
//! The accumulated output doubles as the back-reference window and is
//! never truncated while a job is live; callers drain it through a
//! read-once cursor.

use crate::huffman::Huffman;
use crate::tables::{
    CODELEN_ALPHABET_SIZE, CODE_LENGTH_ORDER, DISTANCE_EXTRA_BITS, END_OF_BLOCK,
    LENGTH_EXTRA_BITS, decode_distance, decode_length, fixed_distance_lengths,
    fixed_litlen_lengths,
};
use trickle_core::bitstream::BitStream;
use trickle_core::error::{Result, TrickleError};
use trickle_core::traits::Decompressor;

/// Decoder phase.
///
/// `Done` and `Failed` are terminal; `Failed` is sticky, and the engine
/// replays the original error on every later call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reading the 3-bit block header (final flag + block type).
    BlockHeader,
    /// Copying a stored (uncompressed) block.
    Stored,
    /// Building the fixed literal/length and distance tables.
    FixedBody,
    /// Reading a dynamic block's table definitions.
    DynamicHeader,
    /// Decoding compressed block data.
    HuffmanBody,
    /// The final block has been decoded.
    Done,
    /// A hard error occurred.
    Failed,
}

/// Resume record for a partially read dynamic block header.
#[derive(Debug, Clone)]
struct DynamicState {
    /// Literal/length code count (HLIT + 257).
    hlit: usize,
    /// Distance code count (HDIST + 1).
    hdist: usize,
    /// Code-length code count (HCLEN + 4).
    hclen: usize,
    /// Code-length-code lengths, indexed by symbol.
    clen_lengths: [u8; CODELEN_ALPHABET_SIZE],
    /// How many 3-bit code-length values have been read.
    clen_read: usize,
    /// Combined literal/length + distance code lengths.
    lengths: Vec<u8>,
    /// How many of `lengths` have been decoded.
    lengths_read: usize,
}

impl DynamicState {
    /// Record `repeat` copies of one code length, rejecting runs that
    /// would spill past the announced table size.
    fn push_length(&mut self, bit_position: u64, value: u8, repeat: usize) -> Result<()> {
        if self.lengths_read + repeat > self.lengths.len() {
            return Err(TrickleError::malformed_stream(
                bit_position,
                "code-length run past end of table",
            ));
        }
        for _ in 0..repeat {
            self.lengths[self.lengths_read] = value;
            self.lengths_read += 1;
        }
        Ok(())
    }
}

/// Streaming decoder for the compressed block format.
///
/// One instance handles one decompression job: `start`, repeated `feed`,
/// `finish`, drain. Not thread-safe; use one instance per stream.
#[derive(Debug)]
pub struct Inflater {
    /// Chunk-fed bit reader over the compressed input.
    stream: BitStream,
    /// Full decoded output; also the back-reference window, so it is
    /// never truncated while the job is live.
    window: Vec<u8>,
    /// Read-once cursor into `window` for `drain_output`.
    drained: usize,
    /// Current state-machine phase.
    phase: Phase,
    /// Whether the current block carries the final flag.
    final_block: bool,
    /// Active literal/length table.
    litlen: Option<Huffman>,
    /// Active distance table.
    dist: Option<Huffman>,
    /// Bytes still to copy for a suspended stored block.
    stored_remaining: Option<usize>,
    /// Resume record for a suspended dynamic header.
    dynamic: Option<DynamicState>,
    /// First hard error, replayed on every later call.
    error: Option<TrickleError>,
}

impl Inflater {
    /// Create a decoder ready for the first block.
    pub fn new() -> Self {
        Self {
            stream: BitStream::new(),
            window: Vec::new(),
            drained: 0,
            phase: Phase::BlockHeader,
            final_block: false,
            litlen: None,
            dist: None,
            stored_remaining: None,
            dynamic: None,
            error: None,
        }
    }

    /// Current decoder phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The error that moved the decoder to [`Phase::Failed`], if any.
    pub fn last_error(&self) -> Option<&TrickleError> {
        self.error.as_ref()
    }

    /// All output produced so far, including already-drained bytes.
    pub fn output(&self) -> &[u8] {
        &self.window
    }

    /// Reset to the initial state with empty output and a cleared error.
    pub fn start(&mut self) -> Result<()> {
        *self = Self::new();
        Ok(())
    }

    /// Enqueue compressed bytes and decode as far as they allow.
    ///
    /// Running out of input mid-block is not an error: the decoder
    /// suspends at an exact resume position and this call returns `Ok`.
    /// An empty `input` acts as a no-op poll. Once the decoder has
    /// failed, every call returns the original error.
    pub fn feed(&mut self, input: &[u8]) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.stream.append(input);
        self.run()
    }

    /// Declare the input complete.
    ///
    /// Fails with [`TrickleError::IncompleteStream`] unless the final
    /// block has been fully decoded.
    pub fn finish(&mut self) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if self.phase == Phase::Done {
            Ok(())
        } else {
            Err(TrickleError::IncompleteStream)
        }
    }

    /// Whether undrained output is available.
    pub fn has_output(&self) -> bool {
        self.drained < self.window.len()
    }

    /// Take all output produced since the last drain.
    ///
    /// Draining never discards the underlying bytes; they stay live as
    /// the back-reference window for later blocks.
    pub fn drain_output(&mut self) -> Vec<u8> {
        let out = self.window[self.drained..].to_vec();
        self.drained = self.window.len();
        out
    }

    /// Drive the state machine until done, failed, or out of input.
    fn run(&mut self) -> Result<()> {
        loop {
            let step = match self.phase {
                Phase::Done | Phase::Failed => return Ok(()),
                Phase::BlockHeader => self.block_header(),
                Phase::Stored => self.stored_block(),
                Phase::FixedBody => self.fixed_body(),
                Phase::DynamicHeader => self.dynamic_header(),
                Phase::HuffmanBody => self.huffman_body(),
            };
            match step {
                Ok(()) => {}
                Err(e) if e.is_insufficient_input() => return Ok(()),
                Err(e) => {
                    self.phase = Phase::Failed;
                    self.error = Some(e.clone());
                    return Err(e);
                }
            }
        }
    }

    /// Enter the phase that follows a completed block.
    fn end_block(&mut self) {
        self.phase = if self.final_block {
            Phase::Done
        } else {
            Phase::BlockHeader
        };
    }

    /// Read the 1-bit final flag and 2-bit block type.
    fn block_header(&mut self) -> Result<()> {
        let saved = self.stream.save_state();
        let bfinal = match self.stream.get_bits(1) {
            Ok(v) => v,
            Err(e) => {
                self.stream.restore_state(saved);
                return Err(e);
            }
        };
        let btype = match self.stream.get_bits(2) {
            Ok(v) => v,
            Err(e) => {
                self.stream.restore_state(saved);
                return Err(e);
            }
        };

        self.final_block = bfinal != 0;
        match btype {
            0 => self.phase = Phase::Stored,
            1 => self.phase = Phase::FixedBody,
            2 => self.phase = Phase::DynamicHeader,
            _ => {
                return Err(TrickleError::malformed_stream(
                    self.stream.bit_position(),
                    "reserved block type 3",
                ));
            }
        }
        Ok(())
    }

    /// Copy a stored block: aligned LEN, one's-complement NLEN, raw bytes.
    fn stored_block(&mut self) -> Result<()> {
        let mut remaining = match self.stored_remaining.take() {
            Some(n) => n,
            None => {
                let saved = self.stream.save_state();
                self.stream.align_to_byte();
                let len = match self.stream.get_bits(16) {
                    Ok(v) => v,
                    Err(e) => {
                        self.stream.restore_state(saved);
                        return Err(e);
                    }
                };
                let nlen = match self.stream.get_bits(16) {
                    Ok(v) => v,
                    Err(e) => {
                        self.stream.restore_state(saved);
                        return Err(e);
                    }
                };
                if len != (!nlen & 0xFFFF) {
                    return Err(TrickleError::malformed_stream(
                        self.stream.bit_position(),
                        format!("stored block length check failed: {} vs {}", len, !nlen & 0xFFFF),
                    ));
                }
                len as usize
            }
        };

        while remaining > 0 {
            match self.stream.read_byte() {
                Ok(byte) => {
                    self.window.push(byte);
                    remaining -= 1;
                }
                Err(e) => {
                    self.stored_remaining = Some(remaining);
                    return Err(e);
                }
            }
        }
        self.end_block();
        Ok(())
    }

    /// Build the fixed literal/length and distance tables.
    fn fixed_body(&mut self) -> Result<()> {
        self.litlen = Some(Huffman::build(&fixed_litlen_lengths())?);
        self.dist = Some(Huffman::build(&fixed_distance_lengths())?);
        self.phase = Phase::HuffmanBody;
        Ok(())
    }

    /// Read a dynamic block's table definitions and build both tables.
    fn dynamic_header(&mut self) -> Result<()> {
        let mut st = match self.dynamic.take() {
            Some(st) => st,
            None => {
                let saved = self.stream.save_state();
                let (hlit, hdist, hclen) = match Self::header_counts(&mut self.stream) {
                    Ok(v) => v,
                    Err(e) => {
                        self.stream.restore_state(saved);
                        return Err(e);
                    }
                };
                DynamicState {
                    hlit,
                    hdist,
                    hclen,
                    clen_lengths: [0; CODELEN_ALPHABET_SIZE],
                    clen_read: 0,
                    lengths: vec![0u8; hlit + hdist],
                    lengths_read: 0,
                }
            }
        };

        match Self::dynamic_step(&mut self.stream, &mut st) {
            Ok(()) => {
                let (litlen_lengths, dist_lengths) = st.lengths.split_at(st.hlit);
                self.litlen = Some(Huffman::build(litlen_lengths)?);
                self.dist = Some(Huffman::build(dist_lengths)?);
                self.phase = Phase::HuffmanBody;
                Ok(())
            }
            Err(e) => {
                if e.is_insufficient_input() {
                    self.dynamic = Some(st);
                }
                Err(e)
            }
        }
    }

    /// Read the three table-size fields of a dynamic block header.
    fn header_counts(stream: &mut BitStream) -> Result<(usize, usize, usize)> {
        let hlit = stream.get_bits(5)? as usize + 257;
        let hdist = stream.get_bits(5)? as usize + 1;
        let hclen = stream.get_bits(4)? as usize + 4;
        Ok((hlit, hdist, hclen))
    }

    /// Advance a dynamic header as far as buffered input allows.
    fn dynamic_step(stream: &mut BitStream, st: &mut DynamicState) -> Result<()> {
        while st.clen_read < st.hclen {
            let len = stream.get_bits(3)?;
            st.clen_lengths[CODE_LENGTH_ORDER[st.clen_read]] = len as u8;
            st.clen_read += 1;
        }

        // 19 symbols; cheap enough to rebuild when a suspended header
        // resumes, which keeps the resume record a plain data struct.
        let clen_table = Huffman::build(&st.clen_lengths)?;

        let total = st.hlit + st.hdist;
        while st.lengths_read < total {
            let saved = stream.save_state();
            if let Err(e) = Self::length_entry(&clen_table, stream, st) {
                if e.is_insufficient_input() {
                    stream.restore_state(saved);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Decode one code-length entry: a literal length 0-15 or one of the
    /// repeat codes 16/17/18 with its extra bits.
    fn length_entry(
        clen_table: &Huffman,
        stream: &mut BitStream,
        st: &mut DynamicState,
    ) -> Result<()> {
        let symbol = clen_table.decode(stream)?;
        match symbol {
            0..=15 => st.push_length(stream.bit_position(), symbol as u8, 1),
            16 => {
                if st.lengths_read == 0 {
                    return Err(TrickleError::malformed_stream(
                        stream.bit_position(),
                        "repeat code with no previous length",
                    ));
                }
                let repeat = stream.get_bits(2)? as usize + 3;
                let prev = st.lengths[st.lengths_read - 1];
                st.push_length(stream.bit_position(), prev, repeat)
            }
            17 => {
                let repeat = stream.get_bits(3)? as usize + 3;
                st.push_length(stream.bit_position(), 0, repeat)
            }
            18 => {
                let repeat = stream.get_bits(7)? as usize + 11;
                st.push_length(stream.bit_position(), 0, repeat)
            }
            _ => Err(TrickleError::malformed_stream(
                stream.bit_position(),
                format!("invalid code-length symbol {}", symbol),
            )),
        }
    }

    /// Decode compressed block data: literals, end-of-block, and
    /// length/distance back-references.
    fn huffman_body(&mut self) -> Result<()> {
        let (litlen, dist) = match (&self.litlen, &self.dist) {
            (Some(l), Some(d)) => (l, d),
            _ => {
                return Err(TrickleError::malformed_stream(
                    self.stream.bit_position(),
                    "decode tables missing",
                ));
            }
        };

        loop {
            // Each symbol step is atomic: on a short read the reader
            // rolls back here and the next feed retries the whole step.
            let saved = self.stream.save_state();
            let symbol = match litlen.decode(&mut self.stream) {
                Ok(s) => s,
                Err(e) => {
                    if e.is_insufficient_input() {
                        self.stream.restore_state(saved);
                    }
                    return Err(e);
                }
            };

            if symbol < 256 {
                self.window.push(symbol as u8);
                continue;
            }
            if symbol == END_OF_BLOCK {
                self.end_block();
                return Ok(());
            }
            if symbol > 285 {
                return Err(TrickleError::malformed_stream(
                    self.stream.bit_position(),
                    format!("invalid literal/length symbol {}", symbol),
                ));
            }

            let length_idx = (symbol - 257) as usize;
            let extra = match self.stream.get_bits(LENGTH_EXTRA_BITS[length_idx] as u32) {
                Ok(v) => v,
                Err(e) => {
                    self.stream.restore_state(saved);
                    return Err(e);
                }
            };
            let length = decode_length(symbol, extra as u16) as usize;

            let dist_symbol = match dist.decode(&mut self.stream) {
                Ok(s) => s,
                Err(e) => {
                    if e.is_insufficient_input() {
                        self.stream.restore_state(saved);
                    }
                    return Err(e);
                }
            };
            if dist_symbol >= 30 {
                return Err(TrickleError::malformed_stream(
                    self.stream.bit_position(),
                    format!("invalid distance symbol {}", dist_symbol),
                ));
            }
            let dist_extra = match self
                .stream
                .get_bits(DISTANCE_EXTRA_BITS[dist_symbol as usize] as u32)
            {
                Ok(v) => v,
                Err(e) => {
                    self.stream.restore_state(saved);
                    return Err(e);
                }
            };
            let distance = decode_distance(dist_symbol, dist_extra as u16) as usize;

            if distance > self.window.len() {
                return Err(TrickleError::malformed_stream(
                    self.stream.bit_position(),
                    format!(
                        "back-reference distance {} exceeds {} bytes of output",
                        distance,
                        self.window.len()
                    ),
                ));
            }
            // Byte by byte so overlapping references (distance < length)
            // replicate the freshly written bytes.
            for _ in 0..length {
                let byte = self.window[self.window.len() - distance];
                self.window.push(byte);
            }
        }
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for Inflater {
    fn start(&mut self) -> Result<()> {
        Inflater::start(self)
    }

    fn feed(&mut self, input: &[u8]) -> Result<()> {
        Inflater::feed(self, input)
    }

    fn finish(&mut self) -> Result<()> {
        Inflater::finish(self)
    }

    fn has_output(&self) -> bool {
        Inflater::has_output(self)
    }

    fn drain_output(&mut self) -> Vec<u8> {
        Inflater::drain_output(self)
    }
}

/// Decompress a complete compressed byte sequence in one call.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Inflater::new();
    inflater.feed(data)?;
    inflater.finish()?;
    Ok(inflater.drain_output())
}
