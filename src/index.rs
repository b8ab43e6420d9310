// Mapping index artifact
//
// The index is built offline and consumed read-only: a chromosome table,
// the packed four-bit genome, a prefix-sum `counter` over seed-hash
// buckets, and the per-bucket `positions` sorted by the hash and then by
// the 1-bit projections of the following genome bases. The file is
// memory-mapped and parsed with a forward cursor.

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::Path;

pub const INDEX_MAGIC: &[u8; 8] = b"BISALNIX";
pub const INDEX_VERSION: u32 = 1;

/// Ordered contig names with cumulative start offsets; `starts` has one
/// extra entry holding the total genome size.
#[derive(Debug, Clone)]
pub struct ChromLookup {
    pub names: Vec<String>,
    pub starts: Vec<u64>,
}

impl ChromLookup {
    pub fn genome_size(&self) -> u64 {
        *self.starts.last().unwrap_or(&0)
    }

    /// Resolve a genome offset to (chromosome index, offset within it).
    /// Mappings that straddle a chromosome boundary are rejected.
    pub fn get_chrom_idx_and_offset(&self, pos: u32, ref_ops: u32) -> Option<(usize, u32)> {
        let p = pos as u64;
        let idx = self.starts.partition_point(|&s| s <= p);
        if idx == 0 || idx == self.starts.len() {
            return None;
        }
        let chrom = idx - 1;
        if p + ref_ops as u64 > self.starts[chrom + 1] {
            return None;
        }
        Some((chrom, (p - self.starts[chrom]) as u32))
    }
}

/// The in-memory index an entire mapping run shares immutably.
#[derive(Debug)]
pub struct MapIndex {
    pub cl: ChromLookup,
    /// Packed genome, two 4-bit base sets per byte, even offset low nibble.
    pub genome: Vec<u8>,
    /// `counter[h + 1] - counter[h]` is the size of hash bucket `h`.
    pub counter: Vec<u32>,
    /// Genome offsets, bucket by bucket.
    pub positions: Vec<u32>,
    /// Seed hash weight K; `counter` has `2^K + 1` entries.
    pub key_weight: u32,
    /// Number of genome positions each bucket is sorted by.
    pub sort_depth: u32,
    /// Stride at which seed positions were stored.
    pub index_interval: u32,
    /// Sensitive-stage seed window width baked into the index.
    pub n_seed_positions: u32,
    /// Bucket-size ceiling the index was built excluding.
    pub max_candidates_ceiling: u32,
}

fn truncated() -> io::Error {
    io::Error::new(ErrorKind::InvalidData, "index file truncated")
}

fn take<'a>(buf: &'a [u8], off: &mut usize, n: usize) -> io::Result<&'a [u8]> {
    if n > buf.len() - *off {
        return Err(truncated());
    }
    let s = &buf[*off..*off + n];
    *off += n;
    Ok(s)
}

fn read_u32(buf: &[u8], off: &mut usize) -> io::Result<u32> {
    Ok(u32::from_le_bytes(take(buf, off, 4)?.try_into().unwrap()))
}

fn read_u64(buf: &[u8], off: &mut usize) -> io::Result<u64> {
    Ok(u64::from_le_bytes(take(buf, off, 8)?.try_into().unwrap()))
}

impl MapIndex {
    /// Load and validate an index file.
    pub fn read(path: &Path) -> io::Result<Self> {
        let file = File::open(path).map_err(|e| {
            io::Error::new(e.kind(), format!("failed to open index {}: {}", path.display(), e))
        })?;
        let mmap = unsafe { Mmap::map(&file)? };
        let buf: &[u8] = &mmap;
        let mut off = 0usize;

        let magic = take(buf, &mut off, INDEX_MAGIC.len())?;
        if magic != INDEX_MAGIC {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("{} is not a bisalign index", path.display()),
            ));
        }
        let version = read_u32(buf, &mut off)?;
        if version != INDEX_VERSION {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!(
                    "index {} has version {}, this build reads version {}",
                    path.display(),
                    version,
                    INDEX_VERSION
                ),
            ));
        }

        let key_weight = read_u32(buf, &mut off)?;
        let sort_depth = read_u32(buf, &mut off)?;
        let index_interval = read_u32(buf, &mut off)?;
        let n_seed_positions = read_u32(buf, &mut off)?;
        let max_candidates_ceiling = read_u32(buf, &mut off)?;
        if key_weight == 0 || key_weight > 31 {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("unusable seed key weight {}", key_weight),
            ));
        }
        if index_interval == 0 {
            return Err(io::Error::new(ErrorKind::InvalidData, "index interval is zero"));
        }
        if n_seed_positions > sort_depth {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!(
                    "seed window of {} positions exceeds the index sort depth {}",
                    n_seed_positions, sort_depth
                ),
            ));
        }
        if n_seed_positions < key_weight + index_interval {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!(
                    "seed window of {} positions cannot cover a {}-base hash at interval {}",
                    n_seed_positions, key_weight, index_interval
                ),
            ));
        }

        let n_chroms = read_u32(buf, &mut off)? as usize;
        let mut names = Vec::with_capacity(n_chroms);
        for _ in 0..n_chroms {
            let len = read_u32(buf, &mut off)? as usize;
            let raw = take(buf, &mut off, len)?;
            let name = std::str::from_utf8(raw)
                .map_err(|_| io::Error::new(ErrorKind::InvalidData, "chromosome name is not UTF-8"))?;
            names.push(name.to_string());
        }
        let mut starts = Vec::with_capacity(n_chroms + 1);
        for _ in 0..=n_chroms {
            starts.push(read_u64(buf, &mut off)?);
        }
        if starts.windows(2).any(|w| w[0] > w[1]) {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                "chromosome start offsets are not monotonic",
            ));
        }
        let cl = ChromLookup { names, starts };

        let genome_size = cl.genome_size();
        let genome_bytes = ((genome_size + 1) / 2) as usize;
        let genome = take(buf, &mut off, genome_bytes)?.to_vec();

        let counter_len = (1usize << key_weight) + 1;
        let counter_raw = take(buf, &mut off, counter_len * 4)?;
        let counter: Vec<u32> = counter_raw
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();

        let n_positions = read_u64(buf, &mut off)? as usize;
        let positions_raw = take(buf, &mut off, n_positions * 4)?;
        let positions: Vec<u32> = positions_raw
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();

        if *counter.last().unwrap() as usize != n_positions {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                "counter table does not cover the positions array",
            ));
        }

        log::debug!(
            "index: {} chromosomes, {} bp, K={}, sort depth {}, interval {}, {} seed positions, {} stored positions",
            cl.names.len(),
            genome_size,
            key_weight,
            sort_depth,
            index_interval,
            n_seed_positions,
            n_positions
        );

        Ok(MapIndex {
            cl,
            genome,
            counter,
            positions,
            key_weight,
            sort_depth,
            index_interval,
            n_seed_positions,
            max_candidates_ceiling,
        })
    }

    pub fn genome_size(&self) -> u64 {
        self.cl.genome_size()
    }

    /// The sorted positions of one hash bucket.
    pub fn bucket(&self, hash: u32) -> &[u32] {
        let lo = self.counter[hash as usize] as usize;
        let hi = self.counter[hash as usize + 1] as usize;
        &self.positions[lo..hi]
    }
}
