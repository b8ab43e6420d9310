// FASTQ input
//
// Thin wrapper around bio::io::fastq with transparent gzip support and
// batch loading. Names are truncated at the first whitespace by the parser;
// quality lines are ignored. Reads with too few non-N bases are blanked in
// place: they stay in the batch so every input read is accounted for, but
// nothing downstream will map them.

use bio::io::fastq;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const BUFFER_SIZE: usize = 4 * 1024 * 1024;

pub struct ReadLoader {
    records: fastq::Records<BufReader<Box<dyn Read + Send>>>,
    min_read_length: usize,
}

impl ReadLoader {
    /// Open a FASTQ file, gunzipping by extension.
    pub fn new(path: &Path, min_read_length: usize) -> io::Result<Self> {
        let file = File::open(path).map_err(|e| {
            io::Error::new(e.kind(), format!("failed to open reads file {}: {}", path.display(), e))
        })?;
        let reader: Box<dyn Read + Send> =
            if path.extension().and_then(|s| s.to_str()) == Some("gz") {
                Box::new(BufReader::with_capacity(BUFFER_SIZE, GzDecoder::new(file)))
            } else {
                Box::new(BufReader::with_capacity(BUFFER_SIZE, file))
            };
        Ok(ReadLoader {
            records: fastq::Reader::new(reader).records(),
            min_read_length,
        })
    }

    /// Pull up to `batch_size` reads into `names`/`seqs`, clearing both
    /// first. An empty batch signals end of input.
    pub fn load_batch(
        &mut self,
        batch_size: usize,
        names: &mut Vec<String>,
        seqs: &mut Vec<Vec<u8>>,
    ) -> io::Result<()> {
        names.clear();
        seqs.clear();
        for _ in 0..batch_size {
            match self.records.next() {
                Some(Ok(record)) => {
                    names.push(record.id().to_string());
                    let mut seq = record.seq().to_vec();
                    let informative =
                        seq.iter().filter(|&&b| b != b'N' && b != b'n').count();
                    if informative < self.min_read_length {
                        seq.clear();
                    }
                    seqs.push(seq);
                }
                Some(Err(e)) => {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, e));
                }
                None => break,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fastq(dir: &tempfile::TempDir, name: &str, records: &[(&str, &str)]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        for (id, seq) in records {
            writeln!(f, "@{}\n{}\n+\n{}", id, seq, "I".repeat(seq.len())).unwrap();
        }
        path
    }

    #[test]
    fn test_batch_loading_and_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fastq(
            &dir,
            "reads.fq",
            &[
                ("r1 extra comment", &"ACGT".repeat(10)),
                ("r2", &"TTTT".repeat(10)),
                ("r3", &"GGGG".repeat(10)),
            ],
        );
        let mut loader = ReadLoader::new(&path, 32).unwrap();
        let (mut names, mut seqs) = (Vec::new(), Vec::new());

        loader.load_batch(2, &mut names, &mut seqs).unwrap();
        assert_eq!(names, vec!["r1", "r2"]);
        assert_eq!(seqs[0].len(), 40);

        loader.load_batch(2, &mut names, &mut seqs).unwrap();
        assert_eq!(names, vec!["r3"]);

        loader.load_batch(2, &mut names, &mut seqs).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_short_and_n_heavy_reads_are_blanked() {
        let dir = tempfile::tempdir().unwrap();
        let n_heavy = format!("{}{}", "N".repeat(20), "ACGTACGTACGTACGT");
        let path = write_fastq(
            &dir,
            "reads.fq",
            &[("short", "ACGTACGT"), ("nheavy", &n_heavy), ("ok", &"ACGT".repeat(8))],
        );
        let mut loader = ReadLoader::new(&path, 32).unwrap();
        let (mut names, mut seqs) = (Vec::new(), Vec::new());
        loader.load_batch(10, &mut names, &mut seqs).unwrap();

        assert_eq!(names.len(), 3);
        assert!(seqs[0].is_empty());
        assert!(seqs[1].is_empty());
        assert_eq!(seqs[2].len(), 32);
    }

    #[test]
    fn test_gzipped_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.fq.gz");
        let f = File::create(&path).unwrap();
        let mut gz = flate2::write::GzEncoder::new(f, flate2::Compression::default());
        writeln!(gz, "@r1\n{}\n+\n{}", "ACGT".repeat(10), "I".repeat(40)).unwrap();
        gz.finish().unwrap();

        let mut loader = ReadLoader::new(&path, 32).unwrap();
        let (mut names, mut seqs) = (Vec::new(), Vec::new());
        loader.load_batch(10, &mut names, &mut seqs).unwrap();
        assert_eq!(names, vec!["r1"]);
        assert_eq!(seqs[0].len(), 40);
    }
}
