// Mapping statistics
//
// Workers fold per-batch counts into the shared statistics under the output
// lock; the totals end up in the `.mapstats` sibling of the output file.

use crate::hits::{PeResult, SeResult};

fn pct(a: u64, b: u64) -> f64 {
    let denom = if b == 0 { 1 } else { b };
    100.0 * a as f64 / denom as f64
}

#[derive(Debug, Default, Clone)]
pub struct SeMapStats {
    pub total: u64,
    pub unique: u64,
    pub ambiguous: u64,
    pub unmapped: u64,
    pub skipped: u64,
}

impl SeMapStats {
    pub fn update(&mut self, read: &[u8], res: &SeResult) {
        self.total += 1;
        if read.is_empty() {
            self.skipped += 1;
            self.unmapped += 1;
            return;
        }
        if res.best.valid(read.len()) {
            if res.ambig() {
                self.ambiguous += 1;
            } else {
                self.unique += 1;
            }
        } else {
            self.unmapped += 1;
        }
    }

    pub fn merge(&mut self, other: &SeMapStats) {
        self.total += other.total;
        self.unique += other.unique;
        self.ambiguous += other.ambiguous;
        self.unmapped += other.unmapped;
        self.skipped += other.skipped;
    }

    pub fn to_text(&self, n_tabs: usize) -> String {
        let t = "    ".repeat(n_tabs);
        let tt = "    ".repeat(n_tabs + 1);
        let mapped = self.unique + self.ambiguous;
        format!(
            "{t}total_reads: {}\n\
             {t}mapped:\n\
             {tt}percent_mapped: {:.4}\n\
             {tt}unique: {}\n\
             {tt}percent_unique: {:.4}\n\
             {tt}ambiguous: {}\n\
             {t}unmapped: {}\n\
             {t}skipped: {}\n",
            self.total,
            pct(mapped, self.total),
            self.unique,
            pct(self.unique, self.total),
            self.ambiguous,
            self.unmapped,
            self.skipped,
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct PeMapStats {
    pub total_pairs: u64,
    pub unique_pairs: u64,
    pub ambiguous_pairs: u64,
    pub unmapped_pairs: u64,
    pub end1: SeMapStats,
    pub end2: SeMapStats,
}

impl PeMapStats {
    /// Classify the pair outcome; the per-end stats are only touched when
    /// the pair fell back to single-end reporting.
    pub fn update(
        &mut self,
        res: &PeResult,
        se1: &SeResult,
        se2: &SeResult,
        read1: &[u8],
        read2: &[u8],
        reported_as_pair: bool,
    ) {
        self.total_pairs += 1;
        if res.best.valid(read1.len(), read2.len()) && !read1.is_empty() && !read2.is_empty() {
            if res.ambig() {
                self.ambiguous_pairs += 1;
            } else {
                self.unique_pairs += 1;
            }
        } else {
            self.unmapped_pairs += 1;
        }
        if !reported_as_pair {
            self.end1.update(read1, se1);
            self.end2.update(read2, se2);
        }
    }

    pub fn merge(&mut self, other: &PeMapStats) {
        self.total_pairs += other.total_pairs;
        self.unique_pairs += other.unique_pairs;
        self.ambiguous_pairs += other.ambiguous_pairs;
        self.unmapped_pairs += other.unmapped_pairs;
        self.end1.merge(&other.end1);
        self.end2.merge(&other.end2);
    }

    pub fn to_text(&self) -> String {
        let t = "    ";
        let mapped = self.unique_pairs + self.ambiguous_pairs;
        format!(
            "pairs:\n\
             {t}total_read_pairs: {}\n\
             {t}mapped:\n\
             {t}{t}percent_mapped: {:.4}\n\
             {t}{t}unique: {}\n\
             {t}{t}percent_unique: {:.4}\n\
             {t}{t}ambiguous: {}\n\
             {t}unmapped: {}\n\
             mate1:\n{}mate2:\n{}",
            self.total_pairs,
            pct(mapped, self.total_pairs),
            self.unique_pairs,
            pct(self.unique_pairs, self.total_pairs),
            self.ambiguous_pairs,
            self.unmapped_pairs,
            self.end1.to_text(1),
            self.end2.to_text(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::{HitCollector, SeResult};

    #[test]
    fn test_se_classification() {
        let mut stats = SeMapStats::default();
        let read = vec![b'A'; 50];

        let mut unique = SeResult::new(read.len());
        unique.update(100, 1, 0);
        stats.update(&read, &unique);

        let mut ambig = SeResult::new(read.len());
        ambig.update(100, 0, 0);
        ambig.update(500, 0, 0);
        stats.update(&read, &ambig);

        let unmapped = SeResult::new(read.len());
        stats.update(&read, &unmapped);

        stats.update(&[], &SeResult::new(0));

        assert_eq!(stats.total, 4);
        assert_eq!(stats.unique, 1);
        assert_eq!(stats.ambiguous, 1);
        assert_eq!(stats.unmapped, 2);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_merge_adds_counts() {
        let mut a = SeMapStats {
            total: 10,
            unique: 6,
            ambiguous: 1,
            unmapped: 3,
            skipped: 2,
        };
        let b = a.clone();
        a.merge(&b);
        assert_eq!(a.total, 20);
        assert_eq!(a.unique, 12);
        assert_eq!(a.skipped, 4);
    }

    #[test]
    fn test_text_report_shape() {
        let stats = SeMapStats {
            total: 100,
            unique: 80,
            ambiguous: 5,
            unmapped: 15,
            skipped: 0,
        };
        let text = stats.to_text(0);
        assert!(text.contains("total_reads: 100"));
        assert!(text.contains("percent_mapped: 85.0000"));
        assert!(text.contains("unique: 80"));
    }
}
