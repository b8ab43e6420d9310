pub mod banded_align; // banded local alignment with traceback and CIGAR emission
pub mod cigar; // CIGAR compression and op accounting
pub mod compare; // bounded Hamming comparison over packed nibble pairs
pub mod encoding; // four-bit bisulfite read/genome encoding and packed layouts
pub mod hits; // single-end and paired-end candidate bookkeeping
pub mod index; // mapping index artifact (packed genome, seed buckets, chromosomes)
pub mod io; // FASTQ input and SAM output
pub mod options; // mapping options and derived parameters
pub mod pipeline; // batch scheduler and SE/PE mapping drivers
pub mod seeding; // seed hashing, bucket narrowing, two-stage seed driver
pub mod stats; // mapping statistics for the .mapstats report
