//! A streaming LZ77+Huffman decompressor core.
//!
//! The entry points are [`decompress`], [`decompress_buffer`], and
//! [`decompressed_size`]. The format is a sequence of self-describing meta-blocks,
//! each declaring its own Huffman code alphabets, context maps, and block
//! partitioning before interleaving literal insertions with backward copies into a
//! sliding ring buffer.

mod bit_reader;
mod command;
mod context_map;
mod distance;
mod error;
mod header;
mod huffman;
mod prefix_tables;
mod ring_buffer;

use std::io::{Cursor, Read, Write};

pub use error::DecompressError;

use bit_reader::BitReader;
use command::MetaBlockDecoder;
use distance::DistanceRing;
use ring_buffer::RingBuffer;

/// Reads only the stream header and returns the advertised decoded size, or `None` if
/// the stream does not advertise one.
pub fn decompressed_size(encoded: &[u8]) -> Option<u64> {
    let mut reader = BitReader::new(Cursor::new(encoded));
    header::decode_size(&mut reader).ok().flatten()
}

/// Decompresses an in-memory buffer.
pub fn decompress_buffer(encoded: &[u8]) -> Result<Vec<u8>, DecompressError> {
    let mut output = Vec::new();
    decompress(Cursor::new(encoded), &mut output)?;
    Ok(output)
}

/// Decompresses `input` into `output`, both general `Read`/`Write` collaborators.
pub fn decompress<R: Read, W: Write>(input: R, mut output: W) -> Result<(), DecompressError> {
    let mut reader = BitReader::new(input);

    let stream_header = header::decode_stream_header(&mut reader)?;
    let mut ring = RingBuffer::new(stream_header.window_bits);
    let mut dist_rb = DistanceRing::default();
    let mut prev1 = 0u8;
    let mut prev2 = 0u8;

    loop {
        let block_header = header::decode_meta_block_length(&mut reader, stream_header.decoded_size, ring.pos)?;

        if block_header.input_end && block_header.meta_len == 0 {
            break;
        }
        if block_header.meta_len == 0 {
            continue;
        }

        let mut decoder = MetaBlockDecoder::decode_header(&mut reader)?;
        decoder.run(
            &mut reader,
            &mut ring,
            &mut dist_rb,
            &mut prev1,
            &mut prev2,
            block_header.meta_len,
            &mut output,
        )?;

        if block_header.input_end {
            break;
        }
    }

    ring.flush_tail(&mut output)?;
    if let Some(expected) = stream_header.decoded_size {
        if ring.pos != expected {
            log::warn!("decoded {} bytes but stream advertised {expected}", ring.pos);
            return Err(DecompressError::MalformedStream("output length does not match advertised size"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_stream_with_advertised_zero_size_decodes_to_nothing() {
        // size_bytes=3 (0b011), one byte of size = 0, window_bits default 16,
        // then input_end=1 with decoded_size known -> meta_len = 0 - 0 = 0.
        let bytes = [0b0001_1000u8, 0x00, 0x00];
        let out = decompress_buffer(&bytes).unwrap_or_default();
        assert_eq!(out, Vec::<u8>::new());
    }

    #[test]
    fn decompressed_size_reads_only_the_header() {
        let bytes = [0b0000_1001u8, 42u8];
        assert_eq!(decompressed_size(&bytes), Some(42));
    }

    #[test]
    fn decompressed_size_is_none_when_not_advertised() {
        let bytes = [0u8];
        assert_eq!(decompressed_size(&bytes), None);
    }
}
