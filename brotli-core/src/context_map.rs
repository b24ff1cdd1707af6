//! Per-meta-block context map decoding: RLE-of-zeros plus inverse Move-to-Front
//! (§4.5).

use std::io::Read;

use crate::bit_reader::BitReader;
use crate::error::DecompressError;
use crate::huffman::read_huffman_code;

/// Decodes a context map of `size` entries, returning the number of distinct Huffman
/// trees it selects among and the map itself.
pub fn decode_context_map<R: Read>(
    size: usize,
    reader: &mut BitReader<R>,
) -> Result<(u32, Vec<u8>), DecompressError> {
    let num_htrees = reader.read(8)? + 1;
    if num_htrees == 1 {
        return Ok((num_htrees, vec![0u8; size]));
    }

    let use_rle = reader.read_bit()?;
    let max_run_prefix = if use_rle { reader.read(4)? + 1 } else { 0 };

    let alphabet_size = num_htrees as usize + max_run_prefix as usize;
    let tree = read_huffman_code(alphabet_size, reader)?;

    let mut map = Vec::with_capacity(size);
    while map.len() < size {
        let symbol = tree.decode_symbol(reader)? as u32;
        if symbol == 0 {
            map.push(0);
        } else if symbol <= max_run_prefix {
            let extra = reader.read(symbol)?;
            let run = (1u32 << symbol) + extra;
            if map.len() + run as usize > size {
                return Err(DecompressError::MalformedStream("context map run overruns size"));
            }
            map.resize(map.len() + run as usize, 0);
        } else {
            let value = symbol - max_run_prefix;
            if value >= num_htrees {
                return Err(DecompressError::MalformedStream("context map entry out of range"));
            }
            map.push(value as u8);
        }
    }
    if map.len() != size {
        return Err(DecompressError::MalformedStream("context map did not fill exactly"));
    }

    if reader.read_bit()? {
        inverse_move_to_front(&mut map);
    }

    Ok((num_htrees, map))
}

/// Undoes a Move-to-Front encoding in place: each stored index names a position in a
/// 256-entry permutation (most-recently-used first), which is then rotated.
fn inverse_move_to_front(map: &mut [u8]) {
    let mut mtf: Vec<u8> = (0..=255u8).collect();
    for entry in map.iter_mut() {
        let idx = *entry as usize;
        let value = mtf[idx];
        *entry = value;
        if idx != 0 {
            mtf.copy_within(0..idx, 1);
            mtf[0] = value;
        }
    }
}
