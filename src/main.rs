use clap::Parser;
use std::io;
use std::path::PathBuf;

use bisalign::index::MapIndex;
use bisalign::options::MapOpt;
use bisalign::pipeline;

#[derive(Parser)]
#[command(name = "bisalign")]
#[command(about = "Map bisulfite-converted short reads against a packed-genome index", long_about = None)]
#[command(version)]
struct Cli {
    /// Mapping index built for the reference genome
    #[arg(short = 'i', long, value_name = "INDEX")]
    index: PathBuf,

    /// Output file; a .mapstats summary is written next to it
    #[arg(short = 'o', long, value_name = "FILE")]
    output: PathBuf,

    /// FASTQ input: one file for single-end, two for paired-end
    #[arg(value_name = "READS.FQ", required = true, num_args = 1..=2)]
    reads: Vec<PathBuf>,

    /// Worker threads (0 = all cores)
    #[arg(short = 't', long, value_name = "INT", default_value = "0")]
    threads: usize,

    /// Reads loaded per batch
    #[arg(short = 'b', long, value_name = "INT", default_value = "10000")]
    batch: usize,

    /// Max candidates for full comparison (default scales with genome size)
    #[arg(short = 'c', long, value_name = "INT")]
    candidates: Option<u32>,

    /// Max candidates kept as mates per end (paired-end)
    #[arg(short = 'p', long = "max-mates", value_name = "INT", default_value = "20")]
    max_mates: usize,

    /// Min fragment size (paired-end)
    #[arg(short = 'l', long = "min-frag", value_name = "INT", default_value = "32")]
    min_frag: u32,

    /// Max fragment size (paired-end)
    #[arg(short = 'L', long = "max-frag", value_name = "INT", default_value = "3000")]
    max_frag: u32,

    /// Max summed edit distance for a reported pair
    #[arg(long = "max-frag-edit", value_name = "INT", default_value = "40")]
    max_frag_edit: i16,

    /// Report one position for ambiguous mappers, flagged as secondary
    #[arg(short = 'a', long = "ambig")]
    allow_ambig: bool,

    /// Input follows the PBAT protocol
    #[arg(short = 'P', long)]
    pbat: bool,

    /// Input follows random PBAT
    #[arg(short = 'R', long = "random-pbat")]
    random_pbat: bool,

    /// Single-end reads are A-rich (G-to-A converted)
    #[arg(short = 'A', long = "a-rich")]
    a_rich: bool,

    /// Uncap the candidate budget for repetitive genomes
    #[arg(long)]
    sensitive: bool,

    /// Verbose (debug-level) logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(&cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> io::Result<()> {
    let n_threads = if cli.threads == 0 {
        num_cpus::get()
    } else {
        cli.threads
    };

    let opt = MapOpt {
        n_threads,
        batch_size: cli.batch.max(1),
        max_candidates: cli.candidates,
        sensitive: cli.sensitive,
        max_mates: cli.max_mates.max(2),
        min_frag: cli.min_frag,
        max_frag: cli.max_frag,
        max_frag_edit: cli.max_frag_edit,
        a_rich: cli.a_rich,
        pbat: cli.pbat,
        random_pbat: cli.random_pbat,
        allow_ambig: cli.allow_ambig,
        ..Default::default()
    };

    log::info!("loading index {}", cli.index.display());
    let index = MapIndex::read(&cli.index)?;
    log::info!(
        "index covers {} bp across {} chromosome(s)",
        index.genome_size(),
        index.cl.names.len()
    );
    log::info!("using {} thread(s)", opt.n_threads);

    let stats_text = match cli.reads.as_slice() {
        [se] => {
            log::info!("mapping single-end: {}", se.display());
            let stats = pipeline::map_single_ended(&opt, &index, se, &cli.output)?;
            stats.to_text(0)
        }
        [r1, r2] => {
            log::info!("mapping paired-end: {} {}", r1.display(), r2.display());
            let stats = pipeline::map_paired_ended(&opt, &index, r1, r2, &cli.output)?;
            stats.to_text()
        }
        _ => unreachable!("clap bounds the number of read files"),
    };

    let stats_path = PathBuf::from(format!("{}.mapstats", cli.output.display()));
    std::fs::write(&stats_path, stats_text).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("failed to write {}: {}", stats_path.display(), e),
        )
    })?;
    Ok(())
}
