// SAM output
//
// Assembles one record per mapped read from the chromosome lookup and the
// winning candidate. Mapping quality is a placeholder (255); the edit
// distance travels in NM and the applied conversion in CV.

use crate::cigar;
use crate::encoding::revcomp;
use crate::hits::{PeResult, SeResult};
use crate::index::ChromLookup;
use std::io::{self, Write};

pub mod sam_flags {
    pub const PAIRED: u16 = 0x1;
    pub const PROPER_PAIR: u16 = 0x2;
    pub const READ_REVERSE: u16 = 0x10;
    pub const MATE_REVERSE: u16 = 0x20;
    pub const FIRST_IN_TEMPLATE: u16 = 0x40;
    pub const LAST_IN_TEMPLATE: u16 = 0x80;
    pub const SECONDARY: u16 = 0x100;
}

pub const MAPQ_UNAVAILABLE: u8 = 255;

#[allow(clippy::too_many_arguments)]
fn write_record(
    out: &mut dyn Write,
    name: &str,
    flag: u16,
    chrom: &str,
    pos_1based: u32,
    cigar: &str,
    rnext: &str,
    pnext_1based: u32,
    tlen: i64,
    seq: &[u8],
    edit_distance: i16,
    a_rich: bool,
) -> io::Result<()> {
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t*\tNM:i:{}\tCV:A:{}",
        name,
        flag,
        chrom,
        pos_1based,
        MAPQ_UNAVAILABLE,
        cigar,
        rnext,
        pnext_1based,
        tlen,
        String::from_utf8_lossy(seq),
        edit_distance,
        if a_rich { 'A' } else { 'T' },
    )
}

/// Emit a single-end record if the result clears the reporting bar.
///
/// `extra_flags` carries the template bits when a paired-end read falls
/// back to per-end reporting. Returns whether a record was written; a
/// `false` for a confidently mapped read means the position could not be
/// resolved to a single chromosome.
pub fn format_se(
    out: &mut dyn Write,
    cl: &ChromLookup,
    res: &SeResult,
    read: &[u8],
    name: &str,
    cigar_str: &str,
    allow_ambig: bool,
    extra_flags: u16,
) -> io::Result<bool> {
    if read.is_empty() || !res.best.valid(read.len()) || cigar_str.is_empty() {
        return Ok(false);
    }
    let ambig = res.ambig();
    if ambig && !allow_ambig {
        return Ok(false);
    }

    let best = res.best;
    let ref_ops = cigar::reference_ops(cigar_str);
    let (chrom_idx, start) = match cl.get_chrom_idx_and_offset(best.pos, ref_ops) {
        Some(hit) => hit,
        None => return Ok(false),
    };

    let mut flag = extra_flags;
    if best.rc() {
        flag |= sam_flags::READ_REVERSE;
    }
    if ambig {
        flag |= sam_flags::SECONDARY;
    }
    let seq = if best.rc() { revcomp(read) } else { read.to_vec() };

    write_record(
        out,
        name,
        flag,
        &cl.names[chrom_idx],
        start + 1,
        cigar_str,
        "*",
        0,
        0,
        &seq,
        best.diffs,
        best.a_rich(),
    )?;
    Ok(true)
}

/// Emit both records of a concordant pair. Returns false without writing
/// when the pair cannot be placed on one chromosome.
#[allow(clippy::too_many_arguments)]
pub fn format_pe(
    out: &mut dyn Write,
    cl: &ChromLookup,
    res: &PeResult,
    read1: &[u8],
    read2: &[u8],
    name1: &str,
    name2: &str,
    cigar1: &str,
    cigar2: &str,
    allow_ambig: bool,
) -> io::Result<bool> {
    if read1.is_empty() || read2.is_empty() {
        return Ok(false);
    }
    if !res.best.valid(read1.len(), read2.len()) || cigar1.is_empty() || cigar2.is_empty() {
        return Ok(false);
    }
    let ambig = res.ambig();
    if ambig && !allow_ambig {
        return Ok(false);
    }

    let (r1, r2) = (res.best.r1, res.best.r2);
    let ref_ops1 = cigar::reference_ops(cigar1);
    let ref_ops2 = cigar::reference_ops(cigar2);
    let (chr1, s1) = match cl.get_chrom_idx_and_offset(r1.pos, ref_ops1) {
        Some(hit) => hit,
        None => return Ok(false),
    };
    let (chr2, s2) = match cl.get_chrom_idx_and_offset(r2.pos, ref_ops2) {
        Some(hit) => hit,
        None => return Ok(false),
    };
    if chr1 != chr2 {
        return Ok(false);
    }

    let (e1, e2) = (s1 + ref_ops1, s2 + ref_ops2);
    let span = (e1.max(e2) - s1.min(s2)) as i64;
    // leftmost mate carries the positive template length
    let (tlen1, tlen2) = if s1 <= s2 { (span, -span) } else { (-span, span) };

    let mut base = sam_flags::PAIRED | sam_flags::PROPER_PAIR;
    if ambig {
        base |= sam_flags::SECONDARY;
    }
    let mut flag1 = base | sam_flags::FIRST_IN_TEMPLATE;
    let mut flag2 = base | sam_flags::LAST_IN_TEMPLATE;
    if r1.rc() {
        flag1 |= sam_flags::READ_REVERSE;
        flag2 |= sam_flags::MATE_REVERSE;
    }
    if r2.rc() {
        flag2 |= sam_flags::READ_REVERSE;
        flag1 |= sam_flags::MATE_REVERSE;
    }

    let seq1 = if r1.rc() { revcomp(read1) } else { read1.to_vec() };
    let seq2 = if r2.rc() { revcomp(read2) } else { read2.to_vec() };
    let chrom = &cl.names[chr1];

    write_record(
        out, name1, flag1, chrom, s1 + 1, cigar1, "=", s2 + 1, tlen1, &seq1, r1.diffs,
        r1.a_rich(),
    )?;
    write_record(
        out, name2, flag2, chrom, s2 + 1, cigar2, "=", s1 + 1, tlen2, &seq2, r2.diffs,
        r2.a_rich(),
    )?;
    Ok(true)
}
