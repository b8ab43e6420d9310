// Seed hashing and candidate generation
//
// A seed is the K-base window at a read offset, hashed to one bit per base
// ({C,T} vs {A,G}); the counter table turns the hash into a positions
// bucket. Because buckets are pre-sorted by the projections of the bases
// that follow the window, the bucket shrinks by binary search, one position
// at a time, before any full comparison runs.
//
// Seeding runs in two stages: a specific stage over the first
// `index_interval` read offsets using the full sort depth, and, when that
// produced no zero-mismatch hit, a sensitive stage that slides a
// `n_seed_positions`-wide window across the read.

use crate::compare::full_compare;
use crate::encoding::{genome_base, the_bit};
use crate::hits::{FlagsT, HitCollector};
use crate::index::MapIndex;

/// Hash the K-base window at the start of `pread`.
pub fn hash_window(pread: &[u8], key_weight: u32) -> u32 {
    let mut k = 0u32;
    for &base in &pread[..key_weight as usize] {
        k = (k << 1) | the_bit(base);
    }
    k
}

/// Advance a window hash by one base.
#[inline]
pub fn shift_hash(k: u32, key_weight: u32, next_base: u8) -> u32 {
    ((k << 1) | the_bit(next_base)) & ((1u32 << key_weight) - 1)
}

/// Shrink a hash bucket using the read bases past the hashed window.
///
/// For each position `p` in `key_weight..depth` the bucket splits at the
/// first entry whose genome projection at `p` is 1; the read's projection
/// picks the half to keep. Stops as soon as a split leaves the range
/// unchanged.
pub fn find_candidates<'a>(
    read_tail: &[u8],
    genome: &[u8],
    key_weight: u32,
    depth: u32,
    mut bucket: &'a [u32],
) -> &'a [u32] {
    let lim = (depth as usize).min(read_tail.len());
    for p in key_weight as usize..lim {
        let first_one =
            bucket.partition_point(|&pos| the_bit(genome_base(genome, pos + p as u32)) == 0);
        if the_bit(read_tail[p]) == 0 {
            if first_one == bucket.len() {
                return bucket; // whole range already projects 0
            }
            bucket = &bucket[..first_one];
        } else {
            if first_one == 0 {
                return bucket; // whole range already projects 1
            }
            bucket = &bucket[first_one..];
        }
    }
    bucket
}

/// Normalize bucket positions to the read origin and keep the ones the
/// comparison layouts can be applied to without running off the genome.
fn push_hits(cand: &[u32], seed_offset: u32, read_len: usize, genome_size: u64, hits: &mut Vec<u32>) {
    for &pos in cand {
        if pos < seed_offset {
            continue;
        }
        let origin = pos - seed_offset;
        if origin as u64 + read_len as u64 + 1 <= genome_size {
            hits.push(origin);
        }
    }
}

/// Run the bounded Hamming comparison on every collected candidate.
fn check_hits<R: HitCollector>(
    hits: &[u32],
    read_even: &[u8],
    read_odd: &[u8],
    genome: &[u8],
    seed_round: u32,
    flags: FlagsT,
    res: &mut R,
) {
    for &pos in hits {
        if res.sure_ambig(seed_round) {
            break;
        }
        let byte = (pos >> 1) as usize;
        let diffs = if pos & 1 == 1 {
            full_compare(res.get_cutoff(), read_odd, &genome[byte..byte + read_odd.len()])
        } else {
            full_compare(res.get_cutoff(), read_even, &genome[byte..byte + read_even.len()])
        };
        res.update(pos, diffs, flags);
    }
}

/// Two-stage seeding for one encoded read on one strand/conversion.
///
/// `pread_seed` is the plain one-base-per-byte encoding used for hashing
/// and bucket narrowing; `read_even`/`read_odd` are its packed comparison
/// layouts. Candidates feed `res` through its cutoff.
pub fn process_seeds<R: HitCollector>(
    index: &MapIndex,
    max_candidates: u32,
    pread_seed: &[u8],
    read_even: &[u8],
    read_odd: &[u8],
    flags: FlagsT,
    hits: &mut Vec<u32>,
    res: &mut R,
) {
    let read_len = pread_seed.len();
    let kw = index.key_weight as usize;
    let interval = index.index_interval as usize;
    let genome_size = index.genome_size();
    let max_cand = max_candidates as usize;
    if read_len < kw + interval {
        return;
    }

    // specific stage: seeds at offsets 0..interval, full sort depth
    hits.clear();
    let depth = index.sort_depth - index.index_interval + 1;
    let mut k = hash_window(pread_seed, index.key_weight);
    for j in 0..interval {
        let bucket = index.bucket(k);
        if !bucket.is_empty() {
            let cand =
                find_candidates(&pread_seed[j..], &index.genome, index.key_weight, depth, bucket);
            if cand.len() <= max_cand {
                if hits.len() + cand.len() > max_cand {
                    // too repetitive for the specific stage
                    hits.clear();
                    break;
                }
                push_hits(cand, j as u32, read_len, genome_size, hits);
            }
        }
        if j + 1 < interval {
            k = shift_hash(k, index.key_weight, pread_seed[j + kw]);
        }
    }
    hits.sort_unstable();
    hits.dedup();
    check_hits(hits, read_even, read_odd, &index.genome, 0, flags, res);

    if res.optimal() {
        return;
    }

    // sensitive stage: windows of n_seed_positions at a stride chosen so the
    // fewest windows cover the read
    let n_seed = index.n_seed_positions as usize;
    if read_len < n_seed + interval {
        return;
    }
    hits.clear();
    let depth = index.n_seed_positions - index.index_interval + 1;
    let span = read_len - n_seed;
    let n_windows = (read_len + n_seed - 1) / n_seed;
    let shift = (span / n_windows.saturating_sub(1).max(1)).max(1);

    'windows: for offset in (0..=span).step_by(shift) {
        let mut k = hash_window(&pread_seed[offset..], index.key_weight);
        for j in 0..interval {
            let bucket = index.bucket(k);
            if !bucket.is_empty() {
                let cand = find_candidates(
                    &pread_seed[offset + j..],
                    &index.genome,
                    index.key_weight,
                    depth,
                    bucket,
                );
                if cand.len() <= max_cand {
                    if hits.len() + cand.len() > max_cand {
                        // over budget: fall back to what is collected so far
                        break 'windows;
                    }
                    push_hits(cand, (offset + j) as u32, read_len, genome_size, hits);
                }
            }
            if j + 1 < interval {
                k = shift_hash(k, index.key_weight, pread_seed[offset + j + kw]);
            }
        }
    }
    hits.sort_unstable();
    hits.dedup();
    check_hits(hits, read_even, read_odd, &index.genome, 1, flags, res);
}
