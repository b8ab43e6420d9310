// Mapping options
//
// One flat options struct mirrors the CLI; derived values that depend on
// the loaded index (the candidate budget) are resolved after index load and
// validated against what the index was built with.

use std::io::{self, ErrorKind};

/// Hard upper bound on the candidate budget, sensitive mode included.
pub const MAX_CANDIDATES_LIMIT: u32 = 1_000_000;

/// Candidate budget as a fraction of the genome when not in sensitive mode.
pub const CANDIDATES_GENOME_FRAC: f64 = 1e-5;

#[derive(Debug, Clone)]
pub struct MapOpt {
    // Processing
    pub n_threads: usize, // symmetric worker count
    pub batch_size: usize, // reads pulled per input-lock acquisition

    // Seeding
    pub max_candidates: Option<u32>, // explicit candidate budget (-c)
    pub sensitive: bool,             // push the budget to the ceiling

    // Paired-end
    pub max_mates: usize,    // candidate heap capacity per end
    pub min_frag: u32,       // minimum fragment length
    pub max_frag: u32,       // maximum fragment length
    pub max_frag_edit: i16,  // maximum summed edit distance of a pair

    // Protocol
    pub a_rich: bool,      // single-end reads are G->A converted
    pub pbat: bool,        // PBAT library: swapped PE strand/conversion
    pub random_pbat: bool, // enumerate all four PE combinations

    // Reporting
    pub allow_ambig: bool, // emit one representative of ambiguous mappings

    // Read admission
    pub min_read_length: usize,  // reads with fewer non-N bases are blanked
    pub min_aligned_length: u32, // shorter aligned spans are discarded
}

impl Default for MapOpt {
    fn default() -> Self {
        MapOpt {
            n_threads: 1,
            batch_size: 10_000,
            max_candidates: None,
            sensitive: false,
            max_mates: 20,
            min_frag: 32,
            max_frag: 3000,
            max_frag_edit: 40,
            a_rich: false,
            pbat: false,
            random_pbat: false,
            allow_ambig: false,
            min_read_length: 32,
            min_aligned_length: 32,
        }
    }
}

impl MapOpt {
    /// Final candidate budget for this run. An explicit request above the
    /// ceiling the index was built excluding is a parameter error; computed
    /// budgets clamp to it.
    pub fn resolve_max_candidates(&self, genome_size: u64, ceiling: u32) -> io::Result<u32> {
        if let Some(c) = self.max_candidates {
            if c > ceiling {
                return Err(io::Error::new(
                    ErrorKind::InvalidInput,
                    format!(
                        "requested {} candidates but the index was built excluding buckets over {}",
                        c, ceiling
                    ),
                ));
            }
            return Ok(c.min(MAX_CANDIDATES_LIMIT));
        }
        let computed = if self.sensitive {
            MAX_CANDIDATES_LIMIT
        } else {
            ((CANDIDATES_GENOME_FRAC * genome_size as f64) as u32).max(100)
        };
        Ok(computed.min(ceiling).min(MAX_CANDIDATES_LIMIT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_scales_with_genome() {
        let opt = MapOpt::default();
        assert_eq!(opt.resolve_max_candidates(3_000_000_000, u32::MAX).unwrap(), 30_000);
        // small genomes keep a usable floor
        assert_eq!(opt.resolve_max_candidates(10_000, u32::MAX).unwrap(), 100);
    }

    #[test]
    fn test_sensitive_budget_clamps_to_ceiling() {
        let opt = MapOpt {
            sensitive: true,
            ..Default::default()
        };
        assert_eq!(opt.resolve_max_candidates(3_000_000_000, 5000).unwrap(), 5000);
        assert_eq!(
            opt.resolve_max_candidates(3_000_000_000, u32::MAX).unwrap(),
            MAX_CANDIDATES_LIMIT
        );
    }

    #[test]
    fn test_explicit_budget_over_ceiling_is_fatal() {
        let opt = MapOpt {
            max_candidates: Some(10_000),
            ..Default::default()
        };
        assert!(opt.resolve_max_candidates(1_000_000, 5000).is_err());
        assert_eq!(opt.resolve_max_candidates(1_000_000, 20_000).unwrap(), 10_000);
    }
}
