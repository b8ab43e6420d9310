// Shared fixtures: a miniature reference indexer producing the binary
// artifact the mapper consumes, plus FASTQ writers and a deterministic
// genome generator.
#![allow(dead_code)] // each test binary uses its own subset

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const KEY_WEIGHT: u32 = 10;
pub const SORT_DEPTH: u32 = 26;
pub const INDEX_INTERVAL: u32 = 1;
pub const N_SEED_POSITIONS: u32 = 20;
pub const CANDIDATES_CEILING: u32 = 100_000;

const INDEX_MAGIC: &[u8; 8] = b"BISALNIX";
const INDEX_VERSION: u32 = 1;

fn encode_genome_base(b: u8) -> u8 {
    match b {
        b'A' | b'a' => 1,
        b'C' | b'c' => 2,
        b'G' | b'g' => 4,
        b'T' | b't' => 8,
        _ => 0,
    }
}

fn projection_bit(b: u8) -> u32 {
    ((encode_genome_base(b) & 0b1010) != 0) as u32
}

/// Deterministic pseudo-random genome.
pub fn random_genome(n: usize, seed: u64) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut state = seed | 1;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            bases[(state >> 33) as usize % 4]
        })
        .collect()
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            _ => b'N',
        })
        .collect()
}

/// Build and write the index artifact for the given chromosomes: every
/// position (at the index interval, with a full sort window ahead of it)
/// hashed over its first KEY_WEIGHT projection bits, buckets sorted by the
/// projections that follow.
pub fn write_index(path: &Path, chroms: &[(&str, &[u8])]) -> io::Result<()> {
    let mut genome: Vec<u8> = Vec::new();
    let mut starts: Vec<u64> = vec![0];
    for (_, seq) in chroms {
        genome.extend_from_slice(seq);
        starts.push(genome.len() as u64);
    }
    let gs = genome.len();

    let n_buckets = 1usize << KEY_WEIGHT;
    let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); n_buckets];
    let mut pos = 0usize;
    while pos + SORT_DEPTH as usize <= gs {
        let mut h = 0u32;
        for p in pos..pos + KEY_WEIGHT as usize {
            h = (h << 1) | projection_bit(genome[p]);
        }
        buckets[h as usize].push(pos as u32);
        pos += INDEX_INTERVAL as usize;
    }
    for b in buckets.iter_mut() {
        b.sort_by(|&a, &c| {
            let key = |q: u32| -> Vec<u32> {
                (KEY_WEIGHT..SORT_DEPTH)
                    .map(|p| projection_bit(genome[q as usize + p as usize]))
                    .collect()
            };
            key(a).cmp(&key(c)).then(a.cmp(&c))
        });
    }

    let mut counter: Vec<u32> = Vec::with_capacity(n_buckets + 1);
    let mut positions: Vec<u32> = Vec::new();
    let mut total = 0u32;
    for b in &buckets {
        counter.push(total);
        total += b.len() as u32;
        positions.extend_from_slice(b);
    }
    counter.push(total);

    let mut packed = vec![0u8; (gs + 1) / 2];
    for (i, &b) in genome.iter().enumerate() {
        packed[i / 2] |= encode_genome_base(b) << ((i & 1) << 2);
    }

    let mut f = File::create(path)?;
    f.write_all(INDEX_MAGIC)?;
    f.write_all(&INDEX_VERSION.to_le_bytes())?;
    f.write_all(&KEY_WEIGHT.to_le_bytes())?;
    f.write_all(&SORT_DEPTH.to_le_bytes())?;
    f.write_all(&INDEX_INTERVAL.to_le_bytes())?;
    f.write_all(&N_SEED_POSITIONS.to_le_bytes())?;
    f.write_all(&CANDIDATES_CEILING.to_le_bytes())?;
    f.write_all(&(chroms.len() as u32).to_le_bytes())?;
    for (name, _) in chroms {
        f.write_all(&(name.len() as u32).to_le_bytes())?;
        f.write_all(name.as_bytes())?;
    }
    for s in &starts {
        f.write_all(&s.to_le_bytes())?;
    }
    f.write_all(&packed)?;
    for c in &counter {
        f.write_all(&c.to_le_bytes())?;
    }
    f.write_all(&(positions.len() as u64).to_le_bytes())?;
    for p in &positions {
        f.write_all(&p.to_le_bytes())?;
    }
    Ok(())
}

pub fn write_fastq(dir: &Path, name: &str, records: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let mut f = File::create(&path).unwrap();
    for (id, seq) in records {
        writeln!(
            f,
            "@{}\n{}\n+\n{}",
            id,
            String::from_utf8_lossy(seq),
            "I".repeat(seq.len())
        )
        .unwrap();
    }
    path
}

/// Parse tab-separated records from the output file.
pub fn read_records(path: &Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| l.split('\t').map(|s| s.to_string()).collect())
        .collect()
}
