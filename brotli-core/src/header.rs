//! Stream and meta-block header decoding (§4.4).

use std::io::Read;

use crate::bit_reader::BitReader;
use crate::error::DecompressError;

/// Result of decoding the stream header: an optional advertised total size and the
/// chosen window size.
pub struct StreamHeader {
    pub decoded_size: Option<u64>,
    pub window_bits: u32,
    pub max_backward: u64,
}

/// Reads the 3-bit size-length prefix and, if nonzero, that many bytes of
/// little-endian decoded size.
pub fn decode_size<R: Read>(reader: &mut BitReader<R>) -> Result<Option<u64>, DecompressError> {
    let size_bytes = reader.read(3)?;
    if size_bytes == 0 {
        return Ok(None);
    }
    let mut value = 0u64;
    for i in 0..size_bytes {
        let byte = reader.read(8)? as u64;
        value |= byte << (8 * i);
    }
    Ok(Some(value))
}

/// Picks the window size: explicit only when the advertised size is absent or wider
/// than 16 bits, otherwise the default 16.
pub fn decode_window_bits<R: Read>(
    reader: &mut BitReader<R>,
    decoded_size: Option<u64>,
) -> Result<u32, DecompressError> {
    let needs_choice = match decoded_size {
        None => true,
        Some(size) => input_size_bits(size) > 16,
    };
    let window_bits = if needs_choice {
        if reader.read_bit()? {
            17 + reader.read(3)?
        } else {
            16
        }
    } else {
        16
    };
    if !(16..=24).contains(&window_bits) {
        return Err(DecompressError::MalformedStream("window_bits out of range"));
    }
    Ok(window_bits)
}

/// Reads the full stream header: size advertisement then window bits.
pub fn decode_stream_header<R: Read>(reader: &mut BitReader<R>) -> Result<StreamHeader, DecompressError> {
    let decoded_size = decode_size(reader)?;
    let window_bits = decode_window_bits(reader, decoded_size)?;
    let max_backward = (1u64 << window_bits) - 16;
    log::trace!("stream header: decoded_size={decoded_size:?} window_bits={window_bits}");
    Ok(StreamHeader { decoded_size, window_bits, max_backward })
}

fn bit_length(value: u64) -> u32 {
    64 - value.leading_zeros()
}

/// Number of bits needed to hold `value`, except exact powers of two count one bit
/// fewer than [`bit_length`] would give them. Used both to decide whether the stream
/// header carries an explicit window-bits field and to size the meta-block length
/// field when the total decoded size is known; must match `decode.c`'s
/// `input_size_bits` derivation bit-for-bit, since the reference encoder sizes its
/// output around this exact (slightly irregular) count.
fn input_size_bits(value: u64) -> u32 {
    if value == 0 {
        return 0;
    }
    let bits = bit_length(value);
    if value.is_power_of_two() {
        bits - 1
    } else {
        bits
    }
}

/// Outcome of decoding one meta-block's length header.
pub struct MetaBlockHeader {
    pub input_end: bool,
    /// Number of bytes this meta-block must produce; `None` only for the legal empty
    /// terminator (`input_end` with no known size and no nibbles read).
    pub meta_len: u64,
}

/// Decodes `input_end` and the meta-block length (§4.4).
///
/// `decoded_size` and `pos` together determine whether the length is implied by the
/// stream's total advertised size.
pub fn decode_meta_block_length<R: Read>(
    reader: &mut BitReader<R>,
    decoded_size: Option<u64>,
    pos: u64,
) -> Result<MetaBlockHeader, DecompressError> {
    let input_end = reader.read_bit()?;

    let meta_len = if let Some(total) = decoded_size {
        if input_end {
            total.checked_sub(pos).ok_or(DecompressError::MalformedStream("meta-block overruns advertised size"))?
        } else {
            // Mirrors decode.c's DecodeMetaBlockLength literally: full 8-bit chunks
            // only, looped while the remaining count is still positive going in. For
            // a count that isn't a multiple of 8 this reads one chunk past what the
            // count alone would need (the analogous trailing partial-bit read in the
            // original is dead code, since by then the remaining count has already
            // gone to zero or negative) — the reference encoder pads accordingly.
            let mut remaining = input_size_bits(total) as i64;
            let mut value = 0u64;
            let mut shift = 0u32;
            while remaining > 0 {
                let byte = reader.read(8)? as u64;
                value |= byte << shift;
                remaining -= 8;
                shift += 8;
            }
            value + 1
        }
    } else if input_end {
        0
    } else {
        let nib = reader.read(3)?;
        let mut value = 0u64;
        for i in 0..nib {
            let nibble = reader.read(4)? as u64;
            value |= nibble << (4 * i);
        }
        value + 1
    };

    log::trace!("meta-block header: input_end={input_end} meta_len={meta_len}");
    Ok(MetaBlockHeader { input_end, meta_len })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn absent_size_reads_no_bytes() {
        // 3 zero bits: size_bytes = 0.
        let mut r = BitReader::new(&[0b000u8][..]);
        assert_eq!(decode_size(&mut r).unwrap(), None);
    }

    #[test]
    fn one_byte_size_is_little_endian() {
        // size_bytes = 1 (0b001), then one byte 0x2A (0b0010_1010), both LSB-first.
        let bytes = encode_bits(&[1, 0, 0, 0, 1, 0, 1, 0, 1, 0, 0]);
        let mut r = BitReader::new(&bytes[..]);
        assert_eq!(decode_size(&mut r).unwrap(), Some(0x2A));
    }

    #[test]
    fn default_window_bits_is_sixteen_when_size_fits() {
        let mut r = BitReader::new(&[0u8][..]);
        assert_eq!(decode_window_bits(&mut r, Some(100)).unwrap(), 16);
    }

    #[test]
    fn explicit_window_bits_when_bit_unset_stays_sixteen() {
        let mut r = BitReader::new(&[0u8][..]);
        assert_eq!(decode_window_bits(&mut r, None).unwrap(), 16);
    }

    #[test]
    fn explicit_window_bits_reads_three_more() {
        // bit 1 (has explicit) then 3 bits for the extra: 101 = 5 -> 17+5 = 22
        let bytes = encode_bits(&[1, 1, 0, 1]);
        let mut r = BitReader::new(&bytes[..]);
        assert_eq!(decode_window_bits(&mut r, None).unwrap(), 22);
    }

    #[test]
    fn exact_power_of_two_size_does_not_force_explicit_window_bits() {
        // 2^16 needs 16 bits to hold it (not 17): input_size_bits counts one fewer
        // for exact powers of two, so this must NOT read the "has explicit" bit.
        assert_eq!(input_size_bits(1u64 << 16), 16);
        let mut r = BitReader::new(&[0b1111_1111u8][..]);
        assert_eq!(decode_window_bits(&mut r, Some(1u64 << 16)).unwrap(), 16);
    }

    #[test]
    fn just_above_a_power_of_two_does_force_explicit_window_bits() {
        assert_eq!(input_size_bits((1u64 << 16) + 1), 17);
        let bytes = encode_bits(&[0]); // "has explicit" bit unset -> stays 16
        let mut r = BitReader::new(&bytes[..]);
        assert_eq!(decode_window_bits(&mut r, Some((1u64 << 16) + 1)).unwrap(), 16);
    }

    #[test]
    fn meta_block_length_chunk_loop_rounds_up_to_a_full_byte() {
        // decoded_size = 100 -> input_size_bits = 7, which is not a multiple of 8, so
        // the reference decoder's chunk loop still reads a full 8-bit chunk (its
        // trailing partial-bit read is unreachable), and the encoder pads to match.
        // input_end=0, then one byte 0x05 (meta_block_length = 5, then +1 = 6).
        let bytes = encode_bits(&[0, 1, 0, 1, 0, 0, 0, 0, 0]);
        let mut r = BitReader::new(&bytes[..]);
        let header = decode_meta_block_length(&mut r, Some(100), 0).unwrap();
        assert!(!header.input_end);
        assert_eq!(header.meta_len, 6);
    }

    /// Packs a sequence of LSB-first bit values into bytes for test fixtures.
    fn encode_bits(bits: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; bits.len().div_ceil(8)];
        for (i, &bit) in bits.iter().enumerate() {
            if bit != 0 {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        bytes
    }
}
