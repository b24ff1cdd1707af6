//! Little-endian bit stream over a byte-oriented [`Read`] source.
//!
//! Bits are consumed LSB-first within each byte, bytes in stream order: reading 8 bits
//! twice from the byte sequence `0xAB 0xCD` yields `0xAB` then `0xCD`, and reading a
//! single bit from `0xAB` yields `1` (its low bit).

use std::io::Read;

use crate::error::DecompressError;

/// Maximum number of bits a single [`BitReader::read`] call may request.
pub const MAX_READ_BITS: u32 = 24;

/// Keeps the accumulator topped up well past any single `read`/`peek` call so that the
/// hot path (symbol decode) touches the underlying reader at most once per command.
const REFILL_THRESHOLD_BITS: u32 = 56;

/// A bit-accurate reader over an arbitrary byte source.
///
/// Not restartable and has no seek: once bits are consumed they are gone. The reader
/// keeps a 64-bit accumulator (`bits`, `num_bits` valid bits starting at the LSB) and
/// refills it in bulk from the wrapped [`Read`], which is the performance contract
/// behind `peek(24)` + `consume(n)` needing no per-call refill.
pub struct BitReader<R> {
    inner: R,
    bits: u64,
    num_bits: u32,
    eof: bool,
}

impl<R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, bits: 0, num_bits: 0, eof: false }
    }

    /// Non-destructive refill hint: tops up the accumulator from the underlying
    /// reader without consuming anything, and sets an internal EOF flag once the
    /// source is exhausted.
    pub fn fill(&mut self) {
        let mut byte = [0u8; 1];
        while self.num_bits <= REFILL_THRESHOLD_BITS && !self.eof {
            match self.inner.read(&mut byte) {
                Ok(0) => self.eof = true,
                Ok(_) => {
                    self.bits |= (byte[0] as u64) << self.num_bits;
                    self.num_bits += 8;
                }
                Err(_) => self.eof = true,
            }
        }
    }

    /// Fails with [`DecompressError::UnexpectedEof`] only once the source is fully
    /// exhausted with no bits left at all. Bits requested past the true end of a
    /// (nearly) exhausted stream are implicitly zero-padded, the same tolerance a
    /// canonical Huffman code near the tail of the stream relies on: its prefix
    /// determines the symbol well before every requested bit is "real".
    pub fn ensure_available(&mut self, nbits: u32) -> Result<(), DecompressError> {
        if nbits == 0 {
            return Ok(());
        }
        if self.num_bits < nbits {
            self.fill();
        }
        if self.num_bits == 0 && self.eof {
            log::warn!("bit reader exhausted while {nbits} bits were requested");
            return Err(DecompressError::UnexpectedEof);
        }
        Ok(())
    }

    /// Returns the next `nbits` bits without advancing the stream.
    pub fn peek(&mut self, nbits: u32) -> Result<u32, DecompressError> {
        debug_assert!(nbits <= MAX_READ_BITS);
        self.ensure_available(nbits)?;
        let mask = if nbits == 32 { u32::MAX } else { (1u32 << nbits) - 1 };
        Ok((self.bits as u32) & mask)
    }

    /// Advances the stream by `nbits`. Saturates at zero so that zero-padded reads
    /// near the tail of the stream never underflow.
    pub fn consume(&mut self, nbits: u32) {
        self.bits = self.bits.checked_shr(nbits).unwrap_or(0);
        self.num_bits = self.num_bits.saturating_sub(nbits);
    }

    /// Reads and consumes `nbits` (1..=24) from the stream.
    pub fn read(&mut self, nbits: u32) -> Result<u32, DecompressError> {
        let value = self.peek(nbits)?;
        self.consume(nbits);
        Ok(value)
    }

    /// Reads a single bit as a `bool`.
    pub fn read_bit(&mut self) -> Result<bool, DecompressError> {
        Ok(self.read(1)? != 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_bytes_in_stream_order() {
        let mut r = BitReader::new(&[0xABu8, 0xCD][..]);
        assert_eq!(r.read(8).unwrap(), 0xAB);
        assert_eq!(r.read(8).unwrap(), 0xCD);
    }

    #[test]
    fn reads_low_bit_first() {
        let mut r = BitReader::new(&[0xABu8][..]);
        // 0xAB = 1010_1011, low bit is 1.
        assert!(r.read_bit().unwrap());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut r = BitReader::new(&[0xFFu8, 0x00][..]);
        let a = r.peek(4).unwrap();
        let b = r.peek(4).unwrap();
        assert_eq!(a, b);
        r.consume(4);
        assert_eq!(r.read(4).unwrap(), 0xF);
    }

    #[test]
    fn reads_across_byte_boundary() {
        // bits (LSB-first across bytes): byte0=0b0000_0001, byte1=0b0000_0010
        // reading 9 bits should yield 0b1_00000001 = 0x101
        let mut r = BitReader::new(&[0b0000_0001u8, 0b0000_0010][..]);
        assert_eq!(r.read(9).unwrap(), 0x101);
    }

    #[test]
    fn unexpected_eof_on_starved_read() {
        let mut r = BitReader::new(&[0xFFu8][..]);
        r.read(8).unwrap();
        assert!(matches!(r.read(1), Err(DecompressError::UnexpectedEof)));
    }
}
