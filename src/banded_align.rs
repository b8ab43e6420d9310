// Banded local alignment
//
// A narrow band of `bw = 2*MAX_OFF_DIAG + 1` diagonals is filled row by row
// over the reference window around a candidate position; cell (i, j) holds
// the best local score ending at reference base `t_beg + i - 1` and query
// base `i + j - bw`. Matrix and traceback are seeded to zero/blank, so an
// alignment may start and end anywhere (local alignment), and whatever the
// band cannot reach is soft-clipped.
//
// Each worker owns one aligner; the scratch buffers persist across calls
// and grow only when a batch raises the maximum read length.

use crate::cigar::compress_cigar;
use crate::encoding::genome_base;
use crate::hits::ScoreT;

/// Match/mismatch/indel scores, fixed when the aligner is built.
#[derive(Clone, Copy, Debug)]
pub struct ScoreScheme {
    pub matching: ScoreT,
    pub mismatch: ScoreT,
    pub indel: ScoreT,
}

impl ScoreScheme {
    /// Local-alignment scoring.
    pub const LOCAL: ScoreScheme = ScoreScheme {
        matching: 2,
        mismatch: -6,
        indel: -5,
    };

    /// Edit-distance scoring: with unit scores the number of edits in an
    /// aligned span follows from `(span - score + deletions) / 2`.
    pub const EDIT: ScoreScheme = ScoreScheme {
        matching: 1,
        mismatch: -1,
        indel: -1,
    };
}

/// Half-width of the band; bounds the indel size one alignment can absorb.
pub const MAX_OFF_DIAG: usize = 2;

const ARROW_DIAG: u8 = b'M';
const ARROW_ABOVE: u8 = b'D'; // consumes reference
const ARROW_LEFT: u8 = b'I'; // consumes query
const SOFT_CLIP: u8 = b'S';

pub struct BandedAligner<'g> {
    genome: &'g [u8],
    genome_size: u32,
    scheme: ScoreScheme,
    bw: usize,
    q_sz_max: usize,
    table: Vec<ScoreT>,
    traceback: Vec<u8>,
    cigar_scratch: Vec<u8>,
}

impl<'g> BandedAligner<'g> {
    pub fn new(
        genome: &'g [u8],
        genome_size: u32,
        scheme: ScoreScheme,
        max_read_len: usize,
    ) -> Self {
        let bw = 2 * MAX_OFF_DIAG + 1;
        let n_cells = (max_read_len + bw) * bw;
        BandedAligner {
            genome,
            genome_size,
            scheme,
            bw,
            q_sz_max: max_read_len,
            table: vec![0; n_cells],
            traceback: vec![b' '; n_cells],
            cigar_scratch: vec![0; 2 * (max_read_len + bw)],
        }
    }

    pub fn scheme(&self) -> ScoreScheme {
        self.scheme
    }

    /// Grow the scratch buffers to accommodate reads up to `read_len`.
    pub fn ensure_read_len(&mut self, read_len: usize) {
        if read_len <= self.q_sz_max {
            return;
        }
        self.q_sz_max = read_len;
        let n_cells = (read_len + self.bw) * self.bw;
        self.table.resize(n_cells, 0);
        self.traceback.resize(n_cells, b' ');
        self.cigar_scratch.resize(2 * (read_len + self.bw), 0);
    }

    /// Align an encoded query around `t_pos`. On return `t_pos` holds the
    /// reference offset where the alignment starts, `q_span` the number of
    /// query bases it covers, and `cigar` the compressed CIGAR including
    /// soft clips. Returns the alignment score.
    pub fn align(
        &mut self,
        qseq: &[u8],
        t_pos: &mut u32,
        q_span: &mut u32,
        cigar: &mut String,
    ) -> ScoreT {
        self.ensure_read_len(qseq.len());

        let bw = self.bw;
        let q_sz = qseq.len();
        let t_beg = (*t_pos as usize).saturating_sub((bw - 1) / 2);
        let t_shift = q_sz + bw;
        let t_lim = t_shift.min((self.genome_size as usize).saturating_sub(t_beg));
        let n_cells = t_shift * bw;

        self.table[..n_cells].fill(0);
        self.traceback[..n_cells].fill(b' ');

        let (m_sc, x_sc, g_sc) = (self.scheme.matching, self.scheme.mismatch, self.scheme.indel);

        for i in 1..t_lim {
            let left = if i < bw { bw - i } else { 0 };
            let right = bw.min(t_shift - i);
            let ref_base = genome_base(self.genome, (t_beg + i - 1) as u32);
            let row = i * bw;
            let prev = row - bw;

            // diagonal: match or mismatch, query advances with the column
            let q0 = i + left - bw;
            for (k, q) in (left..right).zip(q0..) {
                let sc = if qseq[q] & ref_base != 0 { m_sc } else { x_sc };
                let sc = sc + self.table[prev + k];
                if sc > self.table[row + k] {
                    self.table[row + k] = sc;
                    self.traceback[row + k] = ARROW_DIAG;
                }
            }
            // from above: deletion, reference advances alone
            for k in left..right.saturating_sub(1) {
                let sc = self.table[prev + k + 1] + g_sc;
                if sc > self.table[row + k] {
                    self.table[row + k] = sc;
                    self.traceback[row + k] = ARROW_ABOVE;
                }
            }
            // from the left: insertion, query advances alone
            for k in left + 1..right {
                let sc = self.table[row + k - 1] + g_sc;
                if sc > self.table[row + k] {
                    self.table[row + k] = sc;
                    self.traceback[row + k] = ARROW_LEFT;
                }
            }
        }

        // the alignment ends at the best cell anywhere in the band
        let mut best_idx = 0;
        let mut best_score: ScoreT = 0;
        for (idx, &s) in self.table[..n_cells].iter().enumerate() {
            if s > best_score {
                best_score = s;
                best_idx = idx;
            }
        }
        if best_score == 0 {
            cigar.clear();
            *q_span = 0;
            return 0;
        }

        let best_i = best_idx / bw;
        let best_j = best_idx % bw;

        // soft clip covering the query tail beyond the alignment end
        let soft_clip_end = (q_sz + bw - 1) - (best_i + best_j);
        let mut c_len = 0;
        self.cigar_scratch[..soft_clip_end].fill(SOFT_CLIP);
        c_len += soft_clip_end;

        // walk back to the first zero cell
        let (mut row, mut col) = (best_i, best_j);
        let mut score = self.table[row * bw + col];
        while score > 0 {
            let arrow = self.traceback[row * bw + col];
            match arrow {
                ARROW_ABOVE => {
                    row -= 1;
                    col += 1;
                }
                ARROW_LEFT => {
                    col -= 1;
                }
                _ => {
                    row -= 1;
                }
            }
            self.cigar_scratch[c_len] = arrow;
            c_len += 1;
            score = self.table[row * bw + col];
        }

        // soft clip covering the query head before the alignment start
        let soft_clip_start = (row + col) - (bw - 1);
        self.cigar_scratch[c_len..c_len + soft_clip_start].fill(SOFT_CLIP);
        c_len += soft_clip_start;

        self.cigar_scratch[..c_len].reverse();
        compress_cigar(&self.cigar_scratch[..c_len], cigar);

        *q_span = (q_sz - soft_clip_end - soft_clip_start) as u32;
        *t_pos = (t_beg + row) as u32;
        best_score
    }
}
