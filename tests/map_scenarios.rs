// End-to-end mapping scenarios against a freshly built index artifact.

mod common;

use bisalign::index::MapIndex;
use bisalign::options::MapOpt;
use bisalign::pipeline::{map_paired_ended, map_single_ended};
use common::{random_genome, read_records, revcomp, write_fastq, write_index};
use std::path::PathBuf;

fn test_opt() -> MapOpt {
    MapOpt {
        n_threads: 2,
        batch_size: 16,
        ..Default::default()
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    index: MapIndex,
    root: PathBuf,
}

fn fixture(genome: &[u8]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let index_path = root.join("ref.bsidx");
    write_index(&index_path, &[("chr1", genome)]).unwrap();
    let index = MapIndex::read(&index_path).unwrap();
    Fixture {
        _dir: dir,
        index,
        root,
    }
}

#[test]
fn test_exact_single_end_match() {
    let genome = random_genome(8000, 11);
    let fx = fixture(&genome);
    let reads = write_fastq(&fx.root, "reads.fq", &[("r1", &genome[1000..1040])]);
    let out = fx.root.join("out.sam");

    let stats = map_single_ended(&test_opt(), &fx.index, &reads, &out).unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.unique, 1);

    let records = read_records(&out);
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r[0], "r1");
    assert_eq!(r[1], "0");
    assert_eq!(r[2], "chr1");
    assert_eq!(r[3], "1001"); // offset 1000, 1-based
    assert_eq!(r[4], "255");
    assert_eq!(r[5], "40M");
    assert_eq!(r[9].as_bytes(), &genome[1000..1040]);
    assert_eq!(r[11], "NM:i:0");
    assert_eq!(r[12], "CV:A:T");
}

#[test]
fn test_bisulfite_converted_read_maps_clean() {
    let genome = random_genome(8000, 11);
    let fx = fixture(&genome);
    let converted: Vec<u8> = genome[1000..1040]
        .iter()
        .map(|&b| if b == b'C' { b'T' } else { b })
        .collect();
    let reads = write_fastq(&fx.root, "reads.fq", &[("r1", &converted)]);
    let out = fx.root.join("out.sam");

    let stats = map_single_ended(&test_opt(), &fx.index, &reads, &out).unwrap();
    assert_eq!(stats.unique, 1);

    let records = read_records(&out);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0][3], "1001");
    assert_eq!(records[0][5], "40M");
    assert_eq!(records[0][11], "NM:i:0");
    assert_eq!(records[0][12], "CV:A:T");
}

#[test]
fn test_two_position_ambiguity_dropped_by_default() {
    let mut genome = random_genome(8000, 13);
    let motif = genome[1000..1060].to_vec();
    genome[5000..5060].copy_from_slice(&motif);
    let fx = fixture(&genome);
    let reads = write_fastq(&fx.root, "reads.fq", &[("amb", &motif[..40])]);
    let out = fx.root.join("out.sam");

    let stats = map_single_ended(&test_opt(), &fx.index, &reads, &out).unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.ambiguous, 1);
    assert_eq!(stats.unique, 0);
    assert!(read_records(&out).is_empty());
}

#[test]
fn test_two_position_ambiguity_reported_when_allowed() {
    let mut genome = random_genome(8000, 13);
    let motif = genome[1000..1060].to_vec();
    genome[5000..5060].copy_from_slice(&motif);
    let fx = fixture(&genome);
    let reads = write_fastq(&fx.root, "reads.fq", &[("amb", &motif[..40])]);
    let out = fx.root.join("out.sam");

    let opt = MapOpt {
        allow_ambig: true,
        ..test_opt()
    };
    let stats = map_single_ended(&opt, &fx.index, &reads, &out).unwrap();
    assert_eq!(stats.ambiguous, 1);

    let records = read_records(&out);
    assert_eq!(records.len(), 1);
    let flag: u16 = records[0][1].parse().unwrap();
    assert!(flag & 0x100 != 0, "secondary bit set on the representative");
    assert!(records[0][3] == "1001" || records[0][3] == "5001");
}

#[test]
fn test_paired_end_concordant_pair() {
    let genome = random_genome(8000, 17);
    let fx = fixture(&genome);
    let r1 = write_fastq(&fx.root, "r1.fq", &[("p1", &genome[1000..1040])]);
    let r2_seq = revcomp(&genome[1260..1300]);
    let r2 = write_fastq(&fx.root, "r2.fq", &[("p1", &r2_seq)]);
    let out = fx.root.join("out.sam");

    let opt = MapOpt {
        min_frag: 50,
        max_frag: 500,
        ..test_opt()
    };
    let stats = map_paired_ended(&opt, &fx.index, &r1, &r2, &out).unwrap();
    assert_eq!(stats.total_pairs, 1);
    assert_eq!(stats.unique_pairs, 1);

    let records = read_records(&out);
    assert_eq!(records.len(), 2);
    let (a, b) = (&records[0], &records[1]);
    let flag1: u16 = a[1].parse().unwrap();
    let flag2: u16 = b[1].parse().unwrap();

    assert_eq!(a[3], "1001");
    assert_eq!(b[3], "1261");
    assert!(flag1 & 0x1 != 0 && flag2 & 0x1 != 0, "paired");
    assert!(flag1 & 0x2 != 0 && flag2 & 0x2 != 0, "proper pair");
    assert!(flag1 & 0x40 != 0 && flag2 & 0x80 != 0);
    assert!(flag2 & 0x10 != 0, "second mate reverse");
    assert!(flag1 & 0x20 != 0, "first mate sees mate-reverse");
    assert_eq!(a[6], "=");
    assert_eq!(a[7], "1261");
    assert_eq!(a[8], "300");
    assert_eq!(b[8], "-300");
    // mate 2 is stored reverse-complemented, so its SEQ is the genome text
    assert_eq!(b[9].as_bytes(), &genome[1260..1300]);
}

#[test]
fn test_too_distant_pair_falls_back_to_single_end() {
    let genome = random_genome(8000, 17);
    let fx = fixture(&genome);
    let r1 = write_fastq(&fx.root, "r1.fq", &[("p1", &genome[1000..1040])]);
    let r2_seq = revcomp(&genome[6000..6040]);
    let r2 = write_fastq(&fx.root, "r2.fq", &[("p1", &r2_seq)]);
    let out = fx.root.join("out.sam");

    let opt = MapOpt {
        min_frag: 50,
        max_frag: 1000,
        ..test_opt()
    };
    let stats = map_paired_ended(&opt, &fx.index, &r1, &r2, &out).unwrap();
    assert_eq!(stats.total_pairs, 1);
    assert_eq!(stats.unmapped_pairs, 1);
    assert_eq!(stats.end1.unique, 1);
    assert_eq!(stats.end2.unique, 1);

    let mut records = read_records(&out);
    records.sort_by_key(|r| r[3].parse::<u32>().unwrap());
    assert_eq!(records.len(), 2);
    let flag1: u16 = records[0][1].parse().unwrap();
    let flag2: u16 = records[1][1].parse().unwrap();

    assert_eq!(records[0][3], "1001");
    assert_eq!(records[1][3], "6001");
    assert!(flag1 & 0x1 != 0 && flag2 & 0x1 != 0, "still flagged paired");
    assert!(flag1 & 0x2 == 0 && flag2 & 0x2 == 0, "not a proper pair");
    assert_eq!(records[0][6], "*");
    assert_eq!(records[0][8], "0");
}

#[test]
fn test_single_deletion_read() {
    let genome = random_genome(8000, 19);
    let fx = fixture(&genome);
    // genome[1000..1040] with the base at window offset 25 removed
    let mut read = genome[1000..1025].to_vec();
    read.extend_from_slice(&genome[1026..1040]);
    assert_eq!(read.len(), 39);
    let reads = write_fastq(&fx.root, "reads.fq", &[("del", &read)]);
    let out = fx.root.join("out.sam");

    let stats = map_single_ended(&test_opt(), &fx.index, &reads, &out).unwrap();
    assert_eq!(stats.unique, 1);

    let records = read_records(&out);
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r[3], "1001");
    assert_eq!(r[5], "25M1D14M");
    assert_eq!(r[11], "NM:i:1");
}

#[test]
fn test_reverse_strand_read() {
    let genome = random_genome(8000, 23);
    let fx = fixture(&genome);
    let read = revcomp(&genome[3000..3040]);
    let reads = write_fastq(&fx.root, "reads.fq", &[("rev", &read)]);
    let out = fx.root.join("out.sam");

    let stats = map_single_ended(&test_opt(), &fx.index, &reads, &out).unwrap();
    assert_eq!(stats.unique, 1);

    let records = read_records(&out);
    assert_eq!(records.len(), 1);
    let flag: u16 = records[0][1].parse().unwrap();
    assert!(flag & 0x10 != 0);
    assert_eq!(records[0][3], "3001");
    // SEQ is emitted in reference orientation
    assert_eq!(records[0][9].as_bytes(), &genome[3000..3040]);
    // the library conversion, not the strand, drives the CV tag
    assert_eq!(records[0][12], "CV:A:T");
}

#[test]
fn test_unmappable_and_short_reads_counted() {
    let genome = random_genome(8000, 29);
    let fx = fixture(&genome);
    // a read from a different pseudo-random stream maps nowhere
    let alien = random_genome(40, 999);
    let short = b"ACGTACGT".to_vec();
    let reads = write_fastq(
        &fx.root,
        "reads.fq",
        &[("alien", &alien), ("short", &short)],
    );
    let out = fx.root.join("out.sam");

    let stats = map_single_ended(&test_opt(), &fx.index, &reads, &out).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.unmapped, 2);
    assert_eq!(stats.skipped, 1);
    assert!(read_records(&out).is_empty());
}
