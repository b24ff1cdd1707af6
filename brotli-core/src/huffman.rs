//! Canonical Huffman tree construction and decode.
//!
//! Canonical assignment means the tree is uniquely determined by the code-length
//! vector: shorter codes sort first, ties broken by ascending symbol index. Lookup is
//! fast for short codes via a first-level table indexed by the next `TABLE_BITS`
//! peeked bits; codes longer than that fall back to a binary descent through a small
//! `left`/`right` tree, mirroring the table+tree split the teacher crate uses for its
//! own Char&Len and Position Huffman tables.

use std::io::Read;

use crate::bit_reader::BitReader;
use crate::error::DecompressError;

/// Width of the first-level lookup table, in bits.
const TABLE_BITS: u32 = 8;

const MAX_CODE_LENGTH: usize = 15;

/// Sentinel marking a `table`/`left`/`right` slot as not yet allocated. Distinct from
/// every real symbol index (alphabet is capped well below `u16::MAX`) and from every
/// internal-node index, so it can't be confused with a leaf decoding to symbol 0.
const EMPTY: u16 = u16::MAX;

/// A single canonical Huffman tree over an alphabet of up to 704 symbols (the largest
/// alphabet this format uses, for insert-and-copy codes).
pub struct HuffmanTree {
    /// Table indexed by the next `TABLE_BITS` bits. Entries below `alphabet_size` are
    /// final symbols; entries at or above it are indices into `left`/`right`.
    table: Vec<u16>,
    left: Vec<u16>,
    right: Vec<u16>,
    /// Code length per symbol, needed to know how many bits a table hit consumed.
    lengths: Vec<u8>,
    alphabet_size: u16,
    /// Set for a one-symbol alphabet: that symbol decodes without touching the bit
    /// reader at all, so a (nearly) exhausted stream never spuriously fails on a
    /// code that needs none of its remaining bits.
    degenerate: Option<u16>,
}

impl HuffmanTree {
    /// Builds a canonical tree from a code-length vector (0 = symbol absent).
    ///
    /// A degenerate one-symbol tree (a single nonzero-length-free symbol) is legal and
    /// decodes without consuming any bits.
    pub fn build(code_lengths: &[u8]) -> Result<Self, DecompressError> {
        let alphabet_size = code_lengths.len();
        if alphabet_size > u16::MAX as usize {
            return Err(DecompressError::MalformedStream("alphabet too large"));
        }

        let mut count_per_length = [0u32; MAX_CODE_LENGTH + 1];
        let mut num_symbols = 0;
        let mut only_symbol = 0u16;
        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len as usize > MAX_CODE_LENGTH {
                return Err(DecompressError::MalformedStream("huffman code length too long"));
            }
            if len > 0 {
                count_per_length[len as usize] += 1;
                num_symbols += 1;
                only_symbol = symbol as u16;
            }
        }

        let table_size = 1usize << TABLE_BITS;
        let mut tree = HuffmanTree {
            table: vec![EMPTY; table_size],
            left: Vec::new(),
            right: Vec::new(),
            lengths: code_lengths.to_vec(),
            alphabet_size: alphabet_size as u16,
            degenerate: None,
        };

        if num_symbols == 0 {
            return Err(DecompressError::MalformedStream("empty huffman alphabet"));
        }
        if num_symbols == 1 {
            // Degenerate tree: the one symbol decodes to itself, consuming zero bits,
            // without ever reading from the bit reader.
            tree.lengths[only_symbol as usize] = 0;
            tree.degenerate = Some(only_symbol);
            return Ok(tree);
        }

        // Canonical first-code-per-length, verifying Kraft's equality along the way.
        let mut first_code = [0u32; MAX_CODE_LENGTH + 2];
        let mut code = 0u32;
        for len in 1..=MAX_CODE_LENGTH {
            code = (code + count_per_length[len - 1]) << 1;
            first_code[len] = code;
        }
        let kraft_total: u64 = (1..=MAX_CODE_LENGTH)
            .map(|len| (count_per_length[len] as u64) << (MAX_CODE_LENGTH - len))
            .sum();
        if kraft_total != 1u64 << MAX_CODE_LENGTH {
            return Err(DecompressError::MalformedStream("huffman code lengths do not sum to one"));
        }

        let mut next_code = first_code;
        let mut next_internal_node = alphabet_size;
        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let len = len as usize;
            let canonical_code = next_code[len];
            next_code[len] += 1;
            // MSB-first canonical codeword, reversed to match the stream's LSB-first
            // bit order so that peeked low bits line up with the code's leading bits.
            let reversed = reverse_bits(canonical_code, len as u32);

            if len <= TABLE_BITS as usize {
                let step = 1usize << len;
                let mut idx = reversed as usize;
                while idx < table_size {
                    tree.table[idx] = symbol as u16;
                    idx += step;
                }
            } else {
                // Walk/create the secondary tree using the low TABLE_BITS bits to find
                // (or allocate) the root, then one bit at a time for the remainder.
                let mut node_ptr = NodeRef::Table(reversed as usize & (table_size - 1));
                let mut bit_index = TABLE_BITS;
                while bit_index < len as u32 {
                    let bit = (reversed >> bit_index) & 1;
                    let current = node_ptr.get(&tree);
                    let next_node = if current == EMPTY {
                        // First code to pass through this slot: allocate a fresh
                        // internal node for it.
                        let node = next_internal_node as u16;
                        next_internal_node += 1;
                        tree.left.push(EMPTY);
                        tree.right.push(EMPTY);
                        node_ptr.set(&mut tree, node);
                        node
                    } else {
                        current
                    };
                    node_ptr = if bit == 0 {
                        NodeRef::Left(next_node as usize - alphabet_size)
                    } else {
                        NodeRef::Right(next_node as usize - alphabet_size)
                    };
                    bit_index += 1;
                }
                node_ptr.set(&mut tree, symbol as u16);
            }
        }

        Ok(tree)
    }

    /// Decodes exactly one symbol, consuming exactly its code length in bits.
    pub fn decode_symbol<R: Read>(&self, reader: &mut BitReader<R>) -> Result<u16, DecompressError> {
        if let Some(symbol) = self.degenerate {
            return Ok(symbol);
        }
        let bits = reader.peek(TABLE_BITS)?;
        let mut symbol = self.table[bits as usize];
        if symbol < self.alphabet_size && self.lengths[symbol as usize] as u32 <= TABLE_BITS {
            reader.consume(self.lengths[symbol as usize] as u32);
            return Ok(symbol);
        }

        // Long code: descend the secondary tree one bit at a time past TABLE_BITS.
        reader.consume(TABLE_BITS);
        loop {
            let bit = reader.read(1)?;
            let index = symbol as usize - self.alphabet_size as usize;
            symbol = if bit == 0 { self.left[index] } else { self.right[index] };
            if (symbol as usize) < self.alphabet_size as usize {
                return Ok(symbol);
            }
        }
    }
}

enum NodeRef {
    Table(usize),
    Left(usize),
    Right(usize),
}

impl NodeRef {
    fn get(&self, tree: &HuffmanTree) -> u16 {
        match *self {
            NodeRef::Table(i) => tree.table[i],
            NodeRef::Left(i) => tree.left[i],
            NodeRef::Right(i) => tree.right[i],
        }
    }

    fn set(&self, tree: &mut HuffmanTree, value: u16) {
        match *self {
            NodeRef::Table(i) => tree.table[i] = value,
            NodeRef::Left(i) => tree.left[i] = value,
            NodeRef::Right(i) => tree.right[i] = value,
        }
    }
}

fn reverse_bits(value: u32, nbits: u32) -> u32 {
    let mut v = value;
    let mut r = 0u32;
    for _ in 0..nbits {
        r = (r << 1) | (v & 1);
        v >>= 1;
    }
    r
}

/// Order in which code-length-code lengths are stored in the complex-code header
/// (§4.2.1).
pub const CODE_LENGTH_CODE_ORDER: [usize; 19] =
    [1, 2, 3, 4, 0, 17, 18, 5, 6, 16, 7, 8, 9, 10, 11, 12, 13, 14, 15];

/// Number of symbols in the "code-length code" alphabet (lengths 0..18).
pub const CODE_LENGTH_ALPHABET_SIZE: usize = 19;

/// Decodes one Huffman tree for an alphabet of size `alphabet_size` (§4.2.1).
pub fn read_huffman_code<R: Read>(
    alphabet_size: usize,
    reader: &mut BitReader<R>,
) -> Result<HuffmanTree, DecompressError> {
    let simple = reader.read_bit()?;
    let mut code_lengths = vec![0u8; alphabet_size];

    if simple {
        let num_symbols = reader.read(2)? + 1;
        let mut max_bits = 0u32;
        let mut counter = alphabet_size as u32 - 1;
        while counter > 0 {
            counter >>= 1;
            max_bits += 1;
        }
        let mut symbols = [0u16; 4];
        for sym in symbols.iter_mut().take(num_symbols as usize) {
            let s = reader.read(max_bits)?;
            if s as usize >= alphabet_size {
                return Err(DecompressError::MalformedStream("simple huffman symbol out of range"));
            }
            *sym = s as u16;
        }
        // Unconditional per the reference decoder: symbol[0] always starts at length
        // 1, even for the degenerate one-symbol case, and gets overridden below for
        // num_symbols == 4 with tree-select bit 0.
        code_lengths[symbols[0] as usize] = 1;
        match num_symbols {
            1 => {}
            2 => code_lengths[symbols[1] as usize] = 1,
            3 => {
                code_lengths[symbols[1] as usize] = 2;
                code_lengths[symbols[2] as usize] = 2;
            }
            4 => {
                if reader.read_bit()? {
                    code_lengths[symbols[1] as usize] = 2;
                    code_lengths[symbols[2] as usize] = 3;
                    code_lengths[symbols[3] as usize] = 3;
                } else {
                    code_lengths[symbols[0] as usize] = 2;
                    code_lengths[symbols[1] as usize] = 2;
                    code_lengths[symbols[2] as usize] = 2;
                    code_lengths[symbols[3] as usize] = 2;
                }
            }
            _ => unreachable!("num_symbols is read(2)+1, bounded to 1..=4"),
        }
    } else {
        let num_codes = reader.read(4)? + 4;
        if num_codes as usize > CODE_LENGTH_ALPHABET_SIZE {
            return Err(DecompressError::MalformedStream("too many code-length codes"));
        }
        let mut code_len_code_lengths = [0u8; CODE_LENGTH_ALPHABET_SIZE];
        let start = 2 * reader.read(1)?;
        for i in start..num_codes {
            let len = read_code_length_value(reader)?;
            code_len_code_lengths[CODE_LENGTH_CODE_ORDER[i as usize]] = len;
        }
        let code_len_tree = HuffmanTree::build(&code_len_code_lengths)?;
        read_huffman_code_lengths(&code_len_tree, alphabet_size, &mut code_lengths, reader)?;
    }

    HuffmanTree::build(&code_lengths)
}

/// Decodes the 2-or-4-bit value table `{00->0, 10->3, 01->4, 110->2, 1110->1,
/// 1111->5}` (LSB-first) used for code-length-code lengths.
fn read_code_length_value<R: Read>(reader: &mut BitReader<R>) -> Result<u8, DecompressError> {
    if !reader.read_bit()? {
        return Ok(if reader.read_bit()? { 3 } else { 0 });
    }
    if !reader.read_bit()? {
        return Ok(4);
    }
    if !reader.read_bit()? {
        return Ok(2);
    }
    if !reader.read_bit()? {
        Ok(1)
    } else {
        Ok(5)
    }
}

/// Emits `alphabet_size` code lengths decoded through the just-built code-length tree
/// (§4.2.2).
fn read_huffman_code_lengths<R: Read>(
    code_len_tree: &HuffmanTree,
    alphabet_size: usize,
    code_lengths: &mut [u8],
    reader: &mut BitReader<R>,
) -> Result<(), DecompressError> {
    let max_symbol = if reader.read_bit()? {
        let nbits = 2 + 2 * reader.read(3)?;
        2 + reader.read(nbits)? as usize
    } else {
        alphabet_size
    };
    if max_symbol > alphabet_size {
        return Err(DecompressError::MalformedStream("max_symbol exceeds alphabet"));
    }

    let mut prev_code_len = 8u8;
    let mut symbol = 0usize;
    let mut remaining_budget = max_symbol;
    while symbol < alphabet_size && remaining_budget > 0 {
        remaining_budget -= 1;
        let code_len = code_len_tree.decode_symbol(reader)?;
        match code_len {
            0..=15 => {
                code_lengths[symbol] = code_len as u8;
                symbol += 1;
                if code_len != 0 {
                    prev_code_len = code_len as u8;
                }
            }
            16 => {
                let repeat = reader.read(2)? + 3;
                fill_repeat(code_lengths, &mut symbol, repeat, prev_code_len)?;
            }
            17 => {
                let repeat = reader.read(3)? + 3;
                fill_repeat(code_lengths, &mut symbol, repeat, 0)?;
            }
            18 => {
                let repeat = reader.read(7)? + 11;
                fill_repeat(code_lengths, &mut symbol, repeat, 0)?;
            }
            _ => return Err(DecompressError::MalformedStream("invalid code-length symbol")),
        }
    }
    for len in code_lengths.iter_mut().skip(symbol) {
        *len = 0;
    }
    Ok(())
}

fn fill_repeat(code_lengths: &mut [u8], symbol: &mut usize, repeat: u32, value: u8) -> Result<(), DecompressError> {
    if *symbol + repeat as usize > code_lengths.len() {
        return Err(DecompressError::MalformedStream("code length repeat overruns alphabet"));
    }
    for _ in 0..repeat {
        code_lengths[*symbol] = value;
        *symbol += 1;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn tree_roundtrip(lengths: &[u8]) -> HuffmanTree {
        HuffmanTree::build(lengths).expect("valid canonical lengths should build")
    }

    #[test]
    fn degenerate_single_symbol_tree_consumes_no_bits() {
        let lengths = [0u8, 0, 3, 0];
        let tree = tree_roundtrip(&lengths);
        let mut reader = BitReader::new(&[0u8][..]);
        assert_eq!(tree.decode_symbol(&mut reader).unwrap(), 2);
        // No bits were consumed: a second decode call returns the same symbol.
        assert_eq!(tree.decode_symbol(&mut reader).unwrap(), 2);
    }

    #[test]
    fn rejects_lengths_that_violate_kraft_inequality() {
        // Two symbols both claiming length 1 is exactly Kraft-complete (1/2+1/2=1);
        // three symbols at length 1 is over-subscribed.
        let bad = [1u8, 1, 1];
        assert!(HuffmanTree::build(&bad).is_err());
    }

    #[test]
    fn two_symbol_length_one_tree_round_trips() {
        let lengths = [1u8, 1];
        let tree = tree_roundtrip(&lengths);
        // symbol 0 -> code 0, symbol 1 -> code 1 (canonical, ascending).
        let mut reader = BitReader::new(&[0b0000_0001u8][..]);
        assert_eq!(tree.decode_symbol(&mut reader).unwrap(), 1);
    }

    #[test]
    fn long_code_descends_secondary_tree() {
        // A realistic length set mixing short and long codes (Kraft-exact).
        let lengths = [1u8, 2, 3, 4, 4];
        let tree = tree_roundtrip(&lengths);
        // Just confirm all five symbols are reachable by scanning a wide bit space.
        let mut seen = [false; 5];
        for byte in 0u32..=0xFF {
            let buf = [byte as u8, 0u8];
            let mut reader = BitReader::new(&buf[..]);
            if let Ok(sym) = tree.decode_symbol(&mut reader) {
                seen[sym as usize] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }
}
