//! Per-meta-block block-type/length bookkeeping and the main command loop (§4.6).

use std::io::{Read, Write};

use crate::bit_reader::BitReader;
use crate::context_map::decode_context_map;
use crate::distance::DistanceRing;
use crate::error::DecompressError;
use crate::huffman::{read_huffman_code, HuffmanTree};
use crate::prefix_tables::{
    CONTEXT_LOOKUP, CONTEXT_LOOKUP_OFFSETS, COPY_LENGTH_PREFIX, COPY_RANGE_LUT, INSERT_LENGTH_PREFIX,
    INSERT_RANGE_LUT,
};
use crate::ring_buffer::RingBuffer;

/// Per-category block-type state: how many types exist, the tree used to decode a
/// type switch, the tree used to decode the next block's length, and the rolling
/// 2-entry history of recent types (§4.6.1).
struct BlockCategoryState {
    num_types: u32,
    type_tree: Option<HuffmanTree>,
    len_tree: Option<HuffmanTree>,
    current_type: u32,
    block_length: u32,
    type_ring: [u32; 2],
    ring_idx: u32,
}

impl BlockCategoryState {
    fn decode<R: Read>(reader: &mut BitReader<R>) -> Result<Self, DecompressError> {
        let has_types = reader.read_bit()?;
        if !has_types {
            return Ok(Self {
                num_types: 1,
                type_tree: None,
                len_tree: None,
                current_type: 0,
                block_length: u32::MAX,
                type_ring: [0, 1],
                ring_idx: 0,
            });
        }
        let num_types = reader.read(8)? + 1;
        let type_alphabet = num_types as usize + 2;
        let type_tree = read_huffman_code(type_alphabet, reader)?;
        let len_tree = read_huffman_code(crate::prefix_tables::BLOCK_LENGTH_PREFIX.len(), reader)?;
        let block_length = decode_block_length(&len_tree, reader)?;
        Ok(Self {
            num_types,
            type_tree: Some(type_tree),
            len_tree: Some(len_tree),
            current_type: 0,
            block_length,
            type_ring: [0, 1],
            ring_idx: 0,
        })
    }

    /// Performs a type switch per §4.6.1 and refreshes `block_length`.
    fn switch_type<R: Read>(&mut self, reader: &mut BitReader<R>) -> Result<(), DecompressError> {
        let type_tree = self.type_tree.as_ref().expect("switch_type only called when num_types > 1");
        let len_tree = self.len_tree.as_ref().expect("switch_type only called when num_types > 1");
        let type_code = type_tree.decode_symbol(reader)? as u32;
        let new_type = match type_code {
            0 => self.type_ring[(self.ring_idx & 1) as usize],
            1 => (self.type_ring[((self.ring_idx.wrapping_sub(1)) & 1) as usize] + 1) % self.num_types,
            _ => type_code - 2,
        };
        self.type_ring[(self.ring_idx & 1) as usize] = new_type;
        self.ring_idx = self.ring_idx.wrapping_add(1);
        self.current_type = new_type;
        self.block_length = decode_block_length(len_tree, reader)?;
        Ok(())
    }
}

fn decode_block_length<R: Read>(tree: &HuffmanTree, reader: &mut BitReader<R>) -> Result<u32, DecompressError> {
    let code = tree.decode_symbol(reader)? as usize;
    let entry = crate::prefix_tables::BLOCK_LENGTH_PREFIX
        .get(code)
        .ok_or(DecompressError::MalformedStream("block length code out of range"))?;
    Ok(entry.offset + reader.read(entry.nbits)?)
}

/// Everything needed to run the command loop for one meta-block.
pub struct MetaBlockDecoder {
    literal: BlockCategoryState,
    insert_copy: BlockCategoryState,
    distance: BlockCategoryState,
    postfix_bits: u32,
    num_direct: u32,
    context_modes: Vec<u8>,
    context_map_lit: Vec<u8>,
    context_map_dist: Vec<u8>,
    literal_trees: Vec<HuffmanTree>,
    insert_copy_trees: Vec<HuffmanTree>,
    distance_trees: Vec<HuffmanTree>,
}

impl MetaBlockDecoder {
    pub fn decode_header<R: Read>(reader: &mut BitReader<R>) -> Result<Self, DecompressError> {
        let literal = BlockCategoryState::decode(reader)?;
        let insert_copy = BlockCategoryState::decode(reader)?;
        let distance = BlockCategoryState::decode(reader)?;

        let postfix_bits = reader.read(2)?;
        let nibble = reader.read(4)?;
        let num_direct = 16 + (nibble << postfix_bits);

        let mut context_modes = Vec::with_capacity(literal.num_types as usize);
        for _ in 0..literal.num_types {
            context_modes.push(reader.read(2)? as u8);
        }

        let (num_literal_htrees, context_map_lit) =
            decode_context_map((literal.num_types as usize) << 6, reader)?;
        let (num_dist_htrees, context_map_dist) =
            decode_context_map((distance.num_types as usize) << 2, reader)?;

        let mut literal_trees = Vec::with_capacity(num_literal_htrees as usize);
        for _ in 0..num_literal_htrees {
            literal_trees.push(read_huffman_code(256, reader)?);
        }
        let mut insert_copy_trees = Vec::with_capacity(insert_copy.num_types as usize);
        for _ in 0..insert_copy.num_types {
            insert_copy_trees.push(read_huffman_code(704, reader)?);
        }
        let num_distance_codes = num_direct + (48 << postfix_bits);
        let mut distance_trees = Vec::with_capacity(num_dist_htrees as usize);
        for _ in 0..num_dist_htrees {
            distance_trees.push(read_huffman_code(num_distance_codes as usize, reader)?);
        }

        log::trace!(
            "meta-block: literal_types={} insert_copy_types={} distance_types={} num_direct={num_direct}",
            literal.num_types,
            insert_copy.num_types,
            distance.num_types,
        );

        Ok(Self {
            literal,
            insert_copy,
            distance,
            postfix_bits,
            num_direct,
            context_modes,
            context_map_lit,
            context_map_dist,
            literal_trees,
            insert_copy_trees,
            distance_trees,
        })
    }

    /// Runs the command loop until exactly `meta_len` bytes have been produced.
    pub fn run<R: Read, W: Write>(
        &mut self,
        reader: &mut BitReader<R>,
        ring: &mut RingBuffer,
        dist_rb: &mut DistanceRing,
        prev1: &mut u8,
        prev2: &mut u8,
        meta_len: u64,
        output: &mut W,
    ) -> Result<(), DecompressError> {
        let meta_block_end = ring.pos + meta_len;

        while ring.pos < meta_block_end {
            if self.insert_copy.block_length == 0 {
                self.insert_copy.switch_type(reader)?;
            }
            self.insert_copy.block_length -= 1;

            let htree = &self.insert_copy_trees[self.insert_copy.current_type as usize];
            let symbol = htree.decode_symbol(reader)? as u32;

            let mut range_idx = symbol >> 6;
            let mut distance_code: Option<i64> = Some(0);
            if range_idx >= 2 {
                range_idx -= 2;
                distance_code = None;
            }

            let insert_code = INSERT_RANGE_LUT[range_idx as usize] + ((symbol >> 3) & 7);
            let copy_code = COPY_RANGE_LUT[range_idx as usize] + (symbol & 7);

            let insert_entry = INSERT_LENGTH_PREFIX
                .get(insert_code as usize)
                .ok_or(DecompressError::MalformedStream("insert code out of range"))?;
            let copy_entry = COPY_LENGTH_PREFIX
                .get(copy_code as usize)
                .ok_or(DecompressError::MalformedStream("copy code out of range"))?;
            let insert_len = insert_entry.offset + reader.read(insert_entry.nbits)?;
            let copy_len = copy_entry.offset + reader.read(copy_entry.nbits)?;

            self.insert_literals(reader, ring, prev1, prev2, insert_len as u64, meta_block_end, output)?;

            if ring.pos == meta_block_end {
                break;
            }

            if distance_code.is_none() {
                if self.distance.block_length == 0 {
                    self.distance.switch_type(reader)?;
                }
                self.distance.block_length -= 1;

                let dctx = (copy_len.saturating_sub(2)).min(3) as usize;
                let dist_map_slice = &self.context_map_dist
                    [(self.distance.current_type as usize) << 2..][..4];
                let dhtree = &self.distance_trees[dist_map_slice[dctx] as usize];
                let s = dhtree.decode_symbol(reader)? as u32;

                let resolved_code = if s < self.num_direct {
                    s as i64
                } else {
                    let t = s - self.num_direct;
                    let postfix_mask = (1u32 << self.postfix_bits) - 1;
                    let postfix = t & postfix_mask;
                    let tprime = t >> self.postfix_bits;
                    let nbits = (tprime >> 1) + 1;
                    let offset = ((2 + (tprime & 1)) << nbits) as i64 - 4;
                    self.num_direct as i64
                        + ((offset + reader.read(nbits)? as i64) << self.postfix_bits)
                        + postfix as i64
                };
                distance_code = Some(resolved_code);
            }
            let distance_code = distance_code.expect("resolved above");

            let distance = if distance_code > 0 {
                dist_rb.resolve(distance_code as u32)?
            } else {
                // Short-code 0: reuse the most recently pushed distance without
                // mutating the ring (§3 invariant).
                dist_rb.resolve(0)?
            };

            let max_dist = ring.pos.min(ring.max_backward());
            if distance > max_dist || ring.pos + copy_len as u64 > meta_block_end {
                return Err(DecompressError::InvalidBackref);
            }
            if distance_code > 0 {
                dist_rb.push(distance);
            }

            ring.self_copy(distance, copy_len as u64, output)?;

            *prev1 = ring.byte_at(ring.pos.wrapping_sub(1));
            *prev2 = ring.byte_at(ring.pos.wrapping_sub(2));
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_literals<R: Read, W: Write>(
        &mut self,
        reader: &mut BitReader<R>,
        ring: &mut RingBuffer,
        prev1: &mut u8,
        prev2: &mut u8,
        insert_len: u64,
        meta_block_end: u64,
        output: &mut W,
    ) -> Result<(), DecompressError> {
        for _ in 0..insert_len {
            if ring.pos >= meta_block_end {
                return Err(DecompressError::MalformedStream("insert overruns meta-block"));
            }
            if self.literal.block_length == 0 {
                self.literal.switch_type(reader)?;
            }
            self.literal.block_length -= 1;

            let context_mode = self.context_modes[self.literal.current_type as usize] as usize;
            let base1 = CONTEXT_LOOKUP_OFFSETS[context_mode * 2];
            let base2 = CONTEXT_LOOKUP_OFFSETS[context_mode * 2 + 1];
            let ctx = (CONTEXT_LOOKUP[base1 + *prev2 as usize] | CONTEXT_LOOKUP[base2 + *prev1 as usize]) as usize;

            let lit_map_slice = &self.context_map_lit[(self.literal.current_type as usize) << 6..][..64];
            let htree = &self.literal_trees[lit_map_slice[ctx] as usize];
            let byte = htree.decode_symbol(reader)? as u8;

            ring.put(byte, output)?;
            *prev2 = *prev1;
            *prev1 = byte;
        }
        Ok(())
    }
}
