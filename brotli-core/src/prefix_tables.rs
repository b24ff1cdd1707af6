//! Static, read-only lookup tables consumed by [`crate::command`] and
//! [`crate::huffman`].
//!
//! Every table here is a `const` array computed once, by hand, from a small
//! generator rule documented alongside it — there is no runtime initialization and no
//! process-wide mutable state.

/// One entry of a length-prefix code: the smallest length this code represents, and
/// how many extra bits follow to select within its range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LengthCode {
    pub offset: u32,
    pub nbits: u32,
}

const fn lc(offset: u32, nbits: u32) -> LengthCode {
    LengthCode { offset, nbits }
}

/// Shared extra-bits progression underlying both the insert-length and copy-length
/// codes: six codes with no extra bits, then the bit width grows by one every two
/// codes, with an irregular, wider tail to reach multi-million-byte lengths.
const LENGTH_CODE_EXTRA_BITS: [u32; 24] =
    [0, 0, 0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 7, 8, 9, 10, 12, 14, 24];

/// `kInsertLenPrefix`: insert-length codes 0..23, offsets starting at 0.
pub const INSERT_LENGTH_PREFIX: [LengthCode; 24] = [
    lc(0, 0), lc(1, 0), lc(2, 0), lc(3, 0), lc(4, 0), lc(5, 0),
    lc(6, 1), lc(8, 1), lc(10, 2), lc(14, 2), lc(18, 3), lc(26, 3),
    lc(34, 4), lc(50, 4), lc(66, 5), lc(98, 5), lc(130, 6), lc(194, 7),
    lc(322, 8), lc(578, 9), lc(1090, 10), lc(2114, 12), lc(6210, 14), lc(22594, 24),
];

/// `kCopyLenPrefix`: copy-length codes 0..23, offsets starting at 2 (the minimum
/// possible copy length) and following the same extra-bits progression.
pub const COPY_LENGTH_PREFIX: [LengthCode; 24] = [
    lc(2, 0), lc(3, 0), lc(4, 0), lc(5, 0), lc(6, 0), lc(7, 0),
    lc(8, 1), lc(10, 1), lc(12, 2), lc(16, 2), lc(20, 3), lc(28, 3),
    lc(36, 4), lc(52, 4), lc(68, 5), lc(100, 5), lc(132, 6), lc(196, 7),
    lc(324, 8), lc(580, 9), lc(1092, 10), lc(2116, 12), lc(6212, 14), lc(22596, 24),
];

/// `kBlockLenPrefix`: block-length codes 0..25. Extra bits grow by one every four
/// codes (2,2,2,2,3,3,3,3,...) with a final pair of wider codes to reach the largest
/// block lengths.
pub const BLOCK_LENGTH_PREFIX: [LengthCode; 26] = [
    lc(1, 2), lc(5, 2), lc(9, 2), lc(13, 2),
    lc(17, 3), lc(25, 3), lc(33, 3), lc(41, 3),
    lc(49, 4), lc(65, 4), lc(81, 4), lc(97, 4),
    lc(113, 5), lc(145, 5), lc(177, 5), lc(209, 5),
    lc(241, 6), lc(305, 6), lc(369, 6), lc(433, 6),
    lc(497, 7), lc(625, 7), lc(753, 7), lc(881, 7),
    lc(1009, 8), lc(1265, 9),
];

/// `kInsertRangeLut`: indexed by `range_idx` (the symbol's top bits, minus 2 once
/// `range_idx >= 2`, per `ReadInsertAndCopy`), gives the base insert code added to the
/// symbol's middle 3 bits to get the actual insert-length code.
pub const INSERT_RANGE_LUT: [u32; 9] = [0, 0, 8, 8, 0, 16, 8, 16, 16];

/// `kCopyRangeLut`: same indexing as [`INSERT_RANGE_LUT`], gives the base copy code
/// added to the symbol's low 3 bits to get the actual copy-length code.
pub const COPY_RANGE_LUT: [u32; 9] = [0, 8, 0, 8, 16, 0, 16, 8, 16];

/// Number of literal context modes.
pub const NUM_CONTEXT_MODES: usize = 4;

/// Each context mode contributes two 256-entry subtables (one keyed by the byte two
/// positions back, one by the immediately preceding byte); the two halves are
/// combined with bitwise OR to produce a 6-bit context value (§4.6).
pub const CONTEXT_LOOKUP_OFFSETS: [usize; 8] = [0, 256, 512, 768, 1024, 1280, 1536, 1792];

/// Flat 2048-entry context lookup table, eight 256-entry halves: LSB6, MSB6, UTF8, and
/// "signed" context modes, each split into a (prev2) half and a (prev1) half whose
/// values OR together into the final 6-bit context.
///
/// The LSB6/MSB6 halves are exact bit-slices of the context byte. The UTF8 and signed
/// modes approximate the upstream format's hand-tuned byte-classification tables with
/// a documented formula (see DESIGN.md) rather than a verbatim transcription, since
/// the literal tables are not part of the retrieved reference material.
pub const CONTEXT_LOOKUP: [u8; 2048] = build_context_lookup();

const fn build_context_lookup() -> [u8; 2048] {
    let mut table = [0u8; 2048];
    let mut b = 0usize;
    while b < 256 {
        // Mode 0: LSB6. prev2 contributes nothing, prev1 contributes its low 6 bits.
        table[b] = 0;
        table[256 + b] = (b & 0x3f) as u8;

        // Mode 1: MSB6. prev2 contributes nothing, prev1 contributes its high 6 bits.
        table[512 + b] = 0;
        table[768 + b] = ((b >> 2) & 0x3f) as u8;

        // Mode 2: UTF8. prev2 selects a coarse 3-bit class (continuation byte, ASCII,
        // or lead byte), prev1 contributes its low 3 bits shifted into the other half
        // of the 6-bit context.
        table[1024 + b] = utf8_class(b) << 3;
        table[1280 + b] = (b & 0x07) as u8;

        // Mode 3: Signed. Both halves bucket the byte by its signed distance from the
        // 0x80 midpoint into one of eight buckets.
        table[1536 + b] = signed_bucket(b) << 3;
        table[1792 + b] = signed_bucket(b);

        b += 1;
    }
    table
}

const fn utf8_class(byte: usize) -> u8 {
    if byte < 0x80 {
        2 // ASCII
    } else if byte < 0xc0 {
        0 // UTF-8 continuation byte
    } else {
        1 // UTF-8 lead byte
    }
}

const fn signed_bucket(byte: usize) -> u8 {
    let signed = byte as i32 - 0x80;
    let magnitude = if signed < 0 { -signed } else { signed } as u32;
    // 0 maps to bucket 0; increasing magnitude maps to higher buckets, capped at 7.
    let bucket = 32 - magnitude.leading_zeros();
    if bucket > 7 {
        7
    } else {
        bucket as u8
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_and_copy_tables_share_progression() {
        for i in 0..24 {
            assert_eq!(INSERT_LENGTH_PREFIX[i].nbits, COPY_LENGTH_PREFIX[i].nbits);
            assert_eq!(COPY_LENGTH_PREFIX[i].offset, INSERT_LENGTH_PREFIX[i].offset + 2);
        }
    }

    #[test]
    fn length_tables_are_monotonic() {
        for pair in INSERT_LENGTH_PREFIX.windows(2) {
            assert!(pair[1].offset > pair[0].offset);
        }
        for pair in BLOCK_LENGTH_PREFIX.windows(2) {
            assert!(pair[1].offset > pair[0].offset);
        }
    }

    #[test]
    fn block_length_minimum_is_one() {
        assert_eq!(BLOCK_LENGTH_PREFIX[0].offset, 1);
    }

    #[test]
    fn context_lookup_lsb6_is_exact_bit_slice() {
        for b in 0..256usize {
            assert_eq!(CONTEXT_LOOKUP[256 + b], (b & 0x3f) as u8);
        }
    }

    #[test]
    fn range_luts_cover_every_reachable_range_idx() {
        // An insert-and-copy symbol can be as large as 703 (alphabet size 704),
        // giving code >> 6 == 10; once range_idx >= 2 has 2 subtracted, the highest
        // reachable index is 8, so both tables must have at least 9 entries.
        assert_eq!(INSERT_RANGE_LUT.len(), 9);
        assert_eq!(COPY_RANGE_LUT.len(), 9);
    }

    #[test]
    fn range_luts_are_not_the_degenerate_two_entry_shape() {
        // Regression guard: every entry beyond index 1 used to be unreachable because
        // range_idx was folded down to {0,1} with `& 1` instead of `- 2`.
        assert!(INSERT_RANGE_LUT.iter().any(|&v| v == 16));
        assert!(COPY_RANGE_LUT.iter().any(|&v| v == 16));
    }
}
