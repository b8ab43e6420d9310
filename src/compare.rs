// Bounded Hamming comparison over packed nibble pairs
//
// A read layout byte carries two 4-bit base sets; the genome byte it lines
// up with carries two exact bases. ANDing the bytes leaves a zero nibble
// exactly where a base pair mismatches, so a 16-entry table over each
// nibble of the AND result counts 0, 1 or 2 mismatches per byte.

use crate::hits::ScoreT;

/// `NIBBLE_MISS[n]` is 1 when nibble `n` is empty (a mismatched base pair).
const NIBBLE_MISS: [ScoreT; 16] = {
    let mut tbl = [0 as ScoreT; 16];
    tbl[0] = 1;
    tbl
};

/// Count mismatches between a shifted read layout and the packed genome,
/// giving up as soon as the running total reaches `cutoff`.
///
/// `genome` must start at the byte holding the candidate position and cover
/// at least `read_layout.len()` bytes; the caller guarantees both.
pub fn full_compare(cutoff: ScoreT, read_layout: &[u8], genome: &[u8]) -> ScoreT {
    debug_assert!(genome.len() >= read_layout.len());
    let mut d: ScoreT = 0;
    for (r, g) in read_layout.iter().zip(genome.iter()) {
        if d >= cutoff {
            break;
        }
        let both = r & g;
        d += NIBBLE_MISS[(both & 0xF) as usize] + NIBBLE_MISS[(both >> 4) as usize];
    }
    d
}
