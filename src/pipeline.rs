// Batch scheduler and mapping drivers
//
// A fixed pool of symmetric workers shares exactly two locks: one around
// the read loader and one around the writer plus statistics. A worker
// repeats: pull a batch under the input lock, map it entirely with
// thread-local scratch (encodings, hit lists, aligner matrices), then emit
// records and fold statistics under the output lock. Output order across
// workers is unspecified; every record is self-describing.

use crate::banded_align::{BandedAligner, ScoreScheme};
use crate::cigar::{self, CigarOp};
use crate::encoding::{encode_read, pack_layouts, revcomp};
use crate::hits::{
    strand_code, HitCollector, PeCandidates, PeResult, ScoreT, SeElement, SeResult,
};
use crate::index::MapIndex;
use crate::io::fastq_reader::ReadLoader;
use crate::io::sam_output::{self, sam_flags};
use crate::options::MapOpt;
use crate::seeding::process_seeds;
use crate::stats::{PeMapStats, SeMapStats};

use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

/// Single-end strand/conversion enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SeMode {
    TRich,
    ARich,
    Random,
}

/// One paired-end seeding round: which conversion the forward list is
/// encoded under, and whether the template ends are swapped.
#[derive(Clone, Copy, Debug)]
struct PeRound {
    enc_a_rich: bool,
    swap_ends: bool,
}

const PE_DIRECTIONAL: &[PeRound] = &[
    PeRound { enc_a_rich: false, swap_ends: false },
    PeRound { enc_a_rich: true, swap_ends: true },
];

const PE_PBAT: &[PeRound] = &[
    PeRound { enc_a_rich: true, swap_ends: false },
    PeRound { enc_a_rich: false, swap_ends: true },
];

const PE_RANDOM: &[PeRound] = &[
    PeRound { enc_a_rich: false, swap_ends: false },
    PeRound { enc_a_rich: true, swap_ends: true },
    PeRound { enc_a_rich: true, swap_ends: false },
    PeRound { enc_a_rich: false, swap_ends: true },
];

/// Per-worker encode/seed buffers, allocated once and reused across batches.
#[derive(Default)]
struct SeedScratch {
    pread: Vec<u8>,
    even: Vec<u8>,
    odd: Vec<u8>,
    hits: Vec<u32>,
}

fn seed_one<const A_RICH: bool>(
    seq: &[u8],
    flags: u16,
    index: &MapIndex,
    max_candidates: u32,
    scratch: &mut SeedScratch,
    res: &mut impl HitCollector,
) {
    encode_read::<A_RICH>(seq, &mut scratch.pread);
    pack_layouts(&scratch.pread, &mut scratch.even, &mut scratch.odd);
    process_seeds(
        index,
        max_candidates,
        &scratch.pread,
        &scratch.even,
        &scratch.odd,
        flags,
        &mut scratch.hits,
        res,
    );
}

fn seed_encoded(
    a_rich: bool,
    seq: &[u8],
    flags: u16,
    index: &MapIndex,
    max_candidates: u32,
    scratch: &mut SeedScratch,
    res: &mut impl HitCollector,
) {
    if a_rich {
        seed_one::<true>(seq, flags, index, max_candidates, scratch, res);
    } else {
        seed_one::<false>(seq, flags, index, max_candidates, scratch, res);
    }
}

/// Seed one single-end read on both strands under the mode's conversions.
fn seed_se_read(
    mode: SeMode,
    read: &[u8],
    index: &MapIndex,
    max_candidates: u32,
    scratch: &mut SeedScratch,
    res: &mut SeResult,
) {
    match mode {
        SeMode::TRich => {
            seed_one::<false>(read, strand_code('+', false), index, max_candidates, scratch, res);
            let rc = revcomp(read);
            seed_one::<true>(&rc, strand_code('-', false), index, max_candidates, scratch, res);
        }
        SeMode::ARich => {
            seed_one::<true>(read, strand_code('+', true), index, max_candidates, scratch, res);
            let rc = revcomp(read);
            seed_one::<false>(&rc, strand_code('-', true), index, max_candidates, scratch, res);
        }
        SeMode::Random => {
            seed_one::<false>(read, strand_code('+', false), index, max_candidates, scratch, res);
            seed_one::<true>(read, strand_code('+', true), index, max_candidates, scratch, res);
            let rc = revcomp(read);
            // reverse-complementing flips richness: encode under one
            // conversion, flag the other
            seed_one::<false>(&rc, strand_code('-', true), index, max_candidates, scratch, res);
            seed_one::<true>(&rc, strand_code('-', false), index, max_candidates, scratch, res);
        }
    }
}

/// Turn a surviving candidate into an alignment: score, adjusted position,
/// CIGAR, and edit distance. Near-diagonal hits (at most one mismatch) skip
/// the DP; the CIGAR is all-M and the score is closed-form.
fn align_read(
    elem: &mut SeElement,
    cigar: &mut String,
    read: &[u8],
    pread: &mut Vec<u8>,
    aligner: &mut BandedAligner,
    min_aligned_length: u32,
) {
    let len = read.len();
    if elem.diffs <= 1 {
        cigar.clear();
        let _ = write!(cigar, "{}M", len);
        let sch = aligner.scheme();
        elem.aln_score = sch.matching * (len as ScoreT - elem.diffs) + sch.mismatch * elem.diffs;
        return;
    }

    // re-encode the read the way it was compared: reverse-complementing
    // flips the conversion the bases were read under
    if elem.rc() {
        let rc = revcomp(read);
        if elem.a_rich() {
            encode_read::<false>(&rc, pread);
        } else {
            encode_read::<true>(&rc, pread);
        }
    } else if elem.a_rich() {
        encode_read::<true>(read, pread);
    } else {
        encode_read::<false>(read, pread);
    }

    let mut t_pos = elem.pos;
    let mut span = 0u32;
    let score = aligner.align(pread, &mut t_pos, &mut span, cigar);
    if span < min_aligned_length {
        elem.invalidate();
        return;
    }
    elem.pos = t_pos;
    elem.aln_score = score;
    // edit-distance identity for the unit scoring scheme
    let dels = cigar::count_op(cigar, CigarOp::D) as i32;
    elem.diffs = ((span as i32 - score as i32 + dels) / 2) as ScoreT;
}

/// Align best and second-best, then let the alignment scores re-rank them.
fn align_se_result(
    res: &mut SeResult,
    cigar: &mut String,
    tmp_cigar: &mut String,
    read: &[u8],
    pread: &mut Vec<u8>,
    aligner: &mut BandedAligner,
    min_aligned_length: u32,
) {
    let len = read.len();
    if len == 0 {
        return;
    }
    if res.best.valid_hit(len) {
        align_read(&mut res.best, cigar, read, pread, aligner, min_aligned_length);
    }
    if res.second_best.valid_hit(len) {
        align_read(&mut res.second_best, tmp_cigar, read, pread, aligner, min_aligned_length);
    }
    if res.sort_by_score() {
        std::mem::swap(cigar, tmp_cigar);
    }
}

fn lock_err(what: &str) -> io::Error {
    io::Error::new(ErrorKind::Other, format!("{} lock poisoned by a failed worker", what))
}

// ---------------------------------------------------------------------------
// single-end
// ---------------------------------------------------------------------------

struct SeSink {
    out: BufWriter<File>,
    stats: SeMapStats,
}

/// Map a single-end FASTQ file against the index, writing records to
/// `out_path`. Returns the accumulated statistics.
pub fn map_single_ended(
    opt: &MapOpt,
    index: &MapIndex,
    reads_file: &Path,
    out_path: &Path,
) -> io::Result<SeMapStats> {
    let mode = if opt.random_pbat {
        SeMode::Random
    } else if opt.a_rich || opt.pbat {
        SeMode::ARich
    } else {
        SeMode::TRich
    };
    let max_candidates =
        opt.resolve_max_candidates(index.genome_size(), index.max_candidates_ceiling)?;
    log::debug!("single-end mapping, mode {:?}, candidate budget {}", mode, max_candidates);

    let loader = Mutex::new(ReadLoader::new(reads_file, opt.min_read_length)?);
    let out = File::create(out_path).map_err(|e| {
        io::Error::new(e.kind(), format!("failed to create output {}: {}", out_path.display(), e))
    })?;
    let sink = Mutex::new(SeSink {
        out: BufWriter::new(out),
        stats: SeMapStats::default(),
    });

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opt.n_threads)
        .build()
        .map_err(|e| io::Error::new(ErrorKind::Other, e))?;

    let start = Instant::now();
    let worker_results: Vec<io::Result<()>> =
        pool.broadcast(|_| se_worker(opt, mode, index, max_candidates, &loader, &sink));
    for r in worker_results {
        r?;
    }

    let mut sink = sink.into_inner().map_err(|_| lock_err("output"))?;
    sink.out.flush()?;
    log::info!(
        "mapped {} reads in {:.2} s",
        sink.stats.total,
        start.elapsed().as_secs_f64()
    );
    Ok(sink.stats)
}

fn se_worker(
    opt: &MapOpt,
    mode: SeMode,
    index: &MapIndex,
    max_candidates: u32,
    loader: &Mutex<ReadLoader>,
    sink: &Mutex<SeSink>,
) -> io::Result<()> {
    let mut scratch = SeedScratch::default();
    let mut aligner =
        BandedAligner::new(&index.genome, index.genome_size() as u32, ScoreScheme::EDIT, 256);
    let mut pread = Vec::new();
    let mut names: Vec<String> = Vec::new();
    let mut reads: Vec<Vec<u8>> = Vec::new();
    let mut results: Vec<SeResult> = Vec::new();
    let mut cigars: Vec<String> = Vec::new();
    let mut tmp_cigar = String::new();

    loop {
        {
            let mut l = loader.lock().map_err(|_| lock_err("input"))?;
            l.load_batch(opt.batch_size, &mut names, &mut reads)?;
        }
        if reads.is_empty() {
            return Ok(());
        }
        let n = reads.len();
        log::debug!("batch of {} reads", n);

        results.clear();
        results.extend(reads.iter().map(|r| SeResult::new(r.len())));
        cigars.resize(n, String::new());
        for c in cigars.iter_mut() {
            c.clear();
        }

        let max_len = reads.iter().map(|r| r.len()).max().unwrap_or(0);
        aligner.ensure_read_len(max_len);

        for i in 0..n {
            if !reads[i].is_empty() {
                seed_se_read(mode, &reads[i], index, max_candidates, &mut scratch, &mut results[i]);
            }
        }
        for i in 0..n {
            align_se_result(
                &mut results[i],
                &mut cigars[i],
                &mut tmp_cigar,
                &reads[i],
                &mut pread,
                &mut aligner,
                opt.min_aligned_length,
            );
        }

        let mut guard = sink.lock().map_err(|_| lock_err("output"))?;
        let SeSink { out, stats } = &mut *guard;
        for i in 0..n {
            let written = sam_output::format_se(
                out,
                &index.cl,
                &results[i],
                &reads[i],
                &names[i],
                &cigars[i],
                opt.allow_ambig,
                0,
            )?;
            if !written && !(results[i].ambig() && !opt.allow_ambig) {
                // could not be placed (chromosome straddle or no alignment)
                results[i].best.invalidate();
            }
            stats.update(&reads[i], &results[i]);
        }
    }
}

// ---------------------------------------------------------------------------
// paired-end
// ---------------------------------------------------------------------------

struct PairedLoader {
    r1: ReadLoader,
    r2: ReadLoader,
}

impl PairedLoader {
    fn load_batch(
        &mut self,
        batch_size: usize,
        names1: &mut Vec<String>,
        reads1: &mut Vec<Vec<u8>>,
        names2: &mut Vec<String>,
        reads2: &mut Vec<Vec<u8>>,
    ) -> io::Result<()> {
        self.r1.load_batch(batch_size, names1, reads1)?;
        self.r2.load_batch(batch_size, names2, reads2)?;
        if reads1.len() != reads2.len() {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                "paired FASTQ files do not have the same number of reads",
            ));
        }
        Ok(())
    }
}

struct PeSink {
    out: BufWriter<File>,
    stats: PeMapStats,
}

/// Scratch for mate reconciliation: each forward-list candidate is aligned
/// at most once per round, the reverse-list candidate lazily per entry.
#[derive(Default)]
struct MateScratch {
    a_aligned: Vec<Option<SeElement>>,
    a_cigars: Vec<String>,
    b_cigar: String,
}

impl MateScratch {
    fn reset(&mut self, n: usize) {
        self.a_aligned.clear();
        self.a_aligned.resize(n, None);
        if self.a_cigars.len() < n {
            self.a_cigars.resize(n, String::new());
        }
    }
}

/// Map a pair of FASTQ files against the index. Concordant pairs emit two
/// records; pairs that cannot be reconciled fall back to per-end reporting.
pub fn map_paired_ended(
    opt: &MapOpt,
    index: &MapIndex,
    reads_file1: &Path,
    reads_file2: &Path,
    out_path: &Path,
) -> io::Result<PeMapStats> {
    let rounds: &[PeRound] = if opt.random_pbat {
        PE_RANDOM
    } else if opt.pbat {
        PE_PBAT
    } else {
        PE_DIRECTIONAL
    };
    let max_candidates =
        opt.resolve_max_candidates(index.genome_size(), index.max_candidates_ceiling)?;
    log::debug!(
        "paired-end mapping, {} seeding rounds, candidate budget {}",
        rounds.len(),
        max_candidates
    );

    let loader = Mutex::new(PairedLoader {
        r1: ReadLoader::new(reads_file1, opt.min_read_length)?,
        r2: ReadLoader::new(reads_file2, opt.min_read_length)?,
    });
    let out = File::create(out_path).map_err(|e| {
        io::Error::new(e.kind(), format!("failed to create output {}: {}", out_path.display(), e))
    })?;
    let sink = Mutex::new(PeSink {
        out: BufWriter::new(out),
        stats: PeMapStats::default(),
    });

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opt.n_threads)
        .build()
        .map_err(|e| io::Error::new(ErrorKind::Other, e))?;

    let start = Instant::now();
    let worker_results: Vec<io::Result<()>> =
        pool.broadcast(|_| pe_worker(opt, rounds, index, max_candidates, &loader, &sink));
    for r in worker_results {
        r?;
    }

    let mut sink = sink.into_inner().map_err(|_| lock_err("output"))?;
    sink.out.flush()?;
    log::info!(
        "mapped {} read pairs in {:.2} s",
        sink.stats.total_pairs,
        start.elapsed().as_secs_f64()
    );
    Ok(sink.stats)
}

#[derive(Default)]
struct PeBatchState {
    pe1: Vec<PeCandidates>,
    pe2: Vec<PeCandidates>,
    bests: Vec<PeResult>,
    se1: Vec<SeResult>,
    se2: Vec<SeResult>,
    cigars1: Vec<String>,
    cigars2: Vec<String>,
}

impl PeBatchState {
    fn prepare(&mut self, reads1: &[Vec<u8>], reads2: &[Vec<u8>], max_mates: usize) {
        let n = reads1.len();
        if self.pe1.len() < n {
            self.pe1.resize_with(n, || PeCandidates::new(max_mates));
            self.pe2.resize_with(n, || PeCandidates::new(max_mates));
            self.bests.resize_with(n, || PeResult::new(0, 0));
            self.se1.resize_with(n, || SeResult::new(0));
            self.se2.resize_with(n, || SeResult::new(0));
            self.cigars1.resize(n, String::new());
            self.cigars2.resize(n, String::new());
        }
        for i in 0..n {
            self.bests[i].reset(reads1[i].len(), reads2[i].len());
            self.se1[i].reset(reads1[i].len());
            self.se2[i].reset(reads2[i].len());
            self.cigars1[i].clear();
            self.cigars2[i].clear();
        }
    }
}

fn pe_worker(
    opt: &MapOpt,
    rounds: &[PeRound],
    index: &MapIndex,
    max_candidates: u32,
    loader: &Mutex<PairedLoader>,
    sink: &Mutex<PeSink>,
) -> io::Result<()> {
    let mut scratch = SeedScratch::default();
    let mut mates = MateScratch::default();
    let mut aligner =
        BandedAligner::new(&index.genome, index.genome_size() as u32, ScoreScheme::EDIT, 256);
    let mut pread = Vec::new();
    let mut tmp_cigar = String::new();
    let (mut names1, mut names2): (Vec<String>, Vec<String>) = (Vec::new(), Vec::new());
    let (mut reads1, mut reads2): (Vec<Vec<u8>>, Vec<Vec<u8>>) = (Vec::new(), Vec::new());
    let mut state = PeBatchState::default();

    loop {
        {
            let mut l = loader.lock().map_err(|_| lock_err("input"))?;
            l.load_batch(opt.batch_size, &mut names1, &mut reads1, &mut names2, &mut reads2)?;
        }
        if reads1.is_empty() {
            return Ok(());
        }
        let n = reads1.len();
        log::debug!("batch of {} read pairs", n);

        state.prepare(&reads1, &reads2, opt.max_mates);
        let max_len = reads1
            .iter()
            .chain(reads2.iter())
            .map(|r| r.len())
            .max()
            .unwrap_or(0);
        aligner.ensure_read_len(max_len);

        for round in rounds {
            for i in 0..n {
                if round.swap_ends {
                    seed_pe_pair(
                        round,
                        &reads2[i],
                        &reads1[i],
                        index,
                        max_candidates,
                        &mut scratch,
                        &mut state.pe2[i],
                        &mut state.pe1[i],
                    );
                    select_maps(
                        true,
                        &reads2[i],
                        &reads1[i],
                        &mut state.cigars2[i],
                        &mut state.cigars1[i],
                        &mut state.pe2[i],
                        &mut state.pe1[i],
                        &mut state.se2[i],
                        &mut state.se1[i],
                        &mut aligner,
                        opt,
                        &mut mates,
                        &mut pread,
                        &mut state.bests[i],
                    );
                } else {
                    seed_pe_pair(
                        round,
                        &reads1[i],
                        &reads2[i],
                        index,
                        max_candidates,
                        &mut scratch,
                        &mut state.pe1[i],
                        &mut state.pe2[i],
                    );
                    select_maps(
                        false,
                        &reads1[i],
                        &reads2[i],
                        &mut state.cigars1[i],
                        &mut state.cigars2[i],
                        &mut state.pe1[i],
                        &mut state.pe2[i],
                        &mut state.se1[i],
                        &mut state.se2[i],
                        &mut aligner,
                        opt,
                        &mut mates,
                        &mut pread,
                        &mut state.bests[i],
                    );
                }
            }
        }

        // per-end fallback alignment for pairs that will not be reported
        for i in 0..n {
            if pair_reportable(&state.bests[i], &reads1[i], &reads2[i], opt.allow_ambig) {
                continue;
            }
            align_se_result(
                &mut state.se1[i],
                &mut state.cigars1[i],
                &mut tmp_cigar,
                &reads1[i],
                &mut pread,
                &mut aligner,
                opt.min_aligned_length,
            );
            align_se_result(
                &mut state.se2[i],
                &mut state.cigars2[i],
                &mut tmp_cigar,
                &reads2[i],
                &mut pread,
                &mut aligner,
                opt.min_aligned_length,
            );
        }

        let mut guard = sink.lock().map_err(|_| lock_err("output"))?;
        let PeSink { out, stats } = &mut *guard;
        for i in 0..n {
            let (l1, l2) = (reads1[i].len(), reads2[i].len());
            let mut reported_as_pair = false;
            if pair_reportable(&state.bests[i], &reads1[i], &reads2[i], opt.allow_ambig) {
                reported_as_pair = sam_output::format_pe(
                    out,
                    &index.cl,
                    &state.bests[i],
                    &reads1[i],
                    &reads2[i],
                    &names1[i],
                    &names2[i],
                    &state.cigars1[i],
                    &state.cigars2[i],
                    opt.allow_ambig,
                )?;
                if !reported_as_pair {
                    // the pair could not be placed on one chromosome
                    state.bests[i].reset(l1, l2);
                    state.se1[i].reset(l1);
                    state.se2[i].reset(l2);
                }
            } else {
                let w1 = sam_output::format_se(
                    out,
                    &index.cl,
                    &state.se1[i],
                    &reads1[i],
                    &names1[i],
                    &state.cigars1[i],
                    opt.allow_ambig,
                    sam_flags::PAIRED | sam_flags::FIRST_IN_TEMPLATE,
                )?;
                if !w1 && !(state.se1[i].ambig() && !opt.allow_ambig) {
                    state.se1[i].best.invalidate();
                }
                let w2 = sam_output::format_se(
                    out,
                    &index.cl,
                    &state.se2[i],
                    &reads2[i],
                    &names2[i],
                    &state.cigars2[i],
                    opt.allow_ambig,
                    sam_flags::PAIRED | sam_flags::LAST_IN_TEMPLATE,
                )?;
                if !w2 && !(state.se2[i].ambig() && !opt.allow_ambig) {
                    state.se2[i].best.invalidate();
                }
            }
            stats.update(
                &state.bests[i],
                &state.se1[i],
                &state.se2[i],
                &reads1[i],
                &reads2[i],
                reported_as_pair,
            );
        }
    }
}

fn pair_reportable(best: &PeResult, read1: &[u8], read2: &[u8], allow_ambig: bool) -> bool {
    !read1.is_empty()
        && !read2.is_empty()
        && best.best.valid(read1.len(), read2.len())
        && (allow_ambig || !best.ambig())
}

/// Seed both ends for one round: the forward list is encoded as given, the
/// reverse list is reverse-complemented first, which flips its conversion.
#[allow(clippy::too_many_arguments)]
fn seed_pe_pair(
    round: &PeRound,
    read_a: &[u8],
    read_b: &[u8],
    index: &MapIndex,
    max_candidates: u32,
    scratch: &mut SeedScratch,
    pe_a: &mut PeCandidates,
    pe_b: &mut PeCandidates,
) {
    let flags_a = strand_code('+', round.enc_a_rich);
    let flags_b = strand_code('-', !round.enc_a_rich);
    pe_a.reset(read_a.len());
    pe_b.reset(read_b.len());
    if !read_a.is_empty() {
        seed_encoded(round.enc_a_rich, read_a, flags_a, index, max_candidates, scratch, pe_a);
    }
    if !read_b.is_empty() {
        let rc = revcomp(read_b);
        seed_encoded(round.enc_a_rich, &rc, flags_b, index, max_candidates, scratch, pe_b);
    }
}

/// Flatten both candidate heaps, search for the best concordant pair, and
/// remember each end's best single hits as the fallback.
#[allow(clippy::too_many_arguments)]
fn select_maps(
    swap_ends: bool,
    read_a: &[u8],
    read_b: &[u8],
    cig_a: &mut String,
    cig_b: &mut String,
    pe_a: &mut PeCandidates,
    pe_b: &mut PeCandidates,
    se_a: &mut SeResult,
    se_b: &mut SeResult,
    aligner: &mut BandedAligner,
    opt: &MapOpt,
    mates: &mut MateScratch,
    pread: &mut Vec<u8>,
    best: &mut PeResult,
) {
    pe_a.prepare_for_mating();
    pe_b.prepare_for_mating();
    best_pair(
        swap_ends, pe_a, pe_b, read_a, read_b, cig_a, cig_b, aligner, opt, mates, pread, best,
    );
    best_single(pe_a, se_a);
    best_single(pe_b, se_b);
}

fn best_single(pres: &PeCandidates, res: &mut SeResult) {
    for e in pres.candidates() {
        res.update(e.pos, e.diffs, e.flags);
    }
}

/// Sweep the position-sorted candidate lists for the best concordant pair.
///
/// For each reverse-list candidate `b`, forward-list candidates within the
/// fragment bounds of `b.pos + read_b_len` are considered; both sides are
/// aligned before acceptance, and the fragment bound is re-checked against
/// the aligned reference span.
#[allow(clippy::too_many_arguments)]
fn best_pair(
    swap_ends: bool,
    pe_a: &PeCandidates,
    pe_b: &PeCandidates,
    read_a: &[u8],
    read_b: &[u8],
    cig_a: &mut String,
    cig_b: &mut String,
    aligner: &mut BandedAligner,
    opt: &MapOpt,
    mates: &mut MateScratch,
    pread: &mut Vec<u8>,
    best: &mut PeResult,
) {
    let a_list = pe_a.candidates();
    let b_list = pe_b.candidates();
    mates.reset(a_list.len());

    let mut j1 = 0usize;
    for b0 in b_list {
        if !b0.valid_hit(read_b.len()) {
            continue;
        }
        let unaligned_lim = b0.pos + read_b.len() as u32;
        while j1 < a_list.len() && a_list[j1].pos + opt.max_frag < unaligned_lim {
            j1 += 1;
        }
        let mut b_aligned: Option<SeElement> = None;
        let mut j = j1;
        while j < a_list.len() && a_list[j].pos + opt.min_frag <= unaligned_lim {
            let a0 = a_list[j];
            if a0.valid_hit(read_a.len()) {
                if mates.a_aligned[j].is_none() {
                    let mut e = a0;
                    align_read(
                        &mut e,
                        &mut mates.a_cigars[j],
                        read_a,
                        pread,
                        aligner,
                        opt.min_aligned_length,
                    );
                    mates.a_aligned[j] = Some(e);
                }
                let sa = mates.a_aligned[j].unwrap();
                if sa.valid_hit(read_a.len()) {
                    if b_aligned.is_none() {
                        let mut e = *b0;
                        align_read(
                            &mut e,
                            &mut mates.b_cigar,
                            read_b,
                            pread,
                            aligner,
                            opt.min_aligned_length,
                        );
                        b_aligned = Some(e);
                    }
                    let sb = b_aligned.unwrap();
                    if sb.valid_hit(read_b.len()) {
                        let aligned_lim = sb.pos + cigar::reference_ops(&mates.b_cigar);
                        if sa.pos + opt.min_frag <= aligned_lim
                            && aligned_lim <= sa.pos + opt.max_frag
                            && sa.diffs + sb.diffs <= opt.max_frag_edit
                        {
                            let p = if swap_ends {
                                crate::hits::PeElement::new(sb, sa)
                            } else {
                                crate::hits::PeElement::new(sa, sb)
                            };
                            if best.update_by_score(p) {
                                cig_a.clone_from(&mates.a_cigars[j]);
                                cig_b.clone_from(&mates.b_cigar);
                            }
                        }
                    }
                }
            }
            j += 1;
        }
    }
}
