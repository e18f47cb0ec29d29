mod export;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use eyre::{eyre, Result};
use human_panic::setup_panic;
use indicatif::{ProgressBar, ProgressStyle};
use libnonb::{NonBScanner, ScanConfig};

use export::Format;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
/// Non-B DNA structural motif detection.
struct Args {
    #[clap(flatten)]
    verbose: Verbosity,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect non-B DNA motifs in every record of a FASTA file
    Scan(ScanCmd),

    /// Report sequence composition and validation status
    Inspect {
        /// FASTA file to inspect
        #[clap(short, long)]
        input: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct ScanCmd {
    /// Input FASTA file
    #[clap(short, long)]
    input: PathBuf,

    /// Output file; stdout if omitted
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[clap(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Motif classes to detect (default: all nine)
    #[clap(short, long, num_args = 1..)]
    classes: Option<Vec<String>>,

    /// Disable sequence tiling for large records
    #[clap(long)]
    no_chunking: bool,

    /// Run detectors and chunks sequentially
    #[clap(long)]
    sequential: bool,

    /// Chunk size in bp for tiled analysis
    #[clap(long, default_value_t = 50_000)]
    chunk_size: usize,

    /// Overlap in bp between adjacent chunks
    #[clap(long, default_value_t = 2_000)]
    chunk_overlap: usize,

    /// Number of worker threads, by default num cpus
    #[clap(short = 'j', long)]
    num_threads: Option<usize>,

    /// Fail on unknown classes or invalid class/subclass pairings
    #[clap(long)]
    strict: bool,

    /// Suppress the progress bar
    #[clap(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    setup_panic!();
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    match args.command {
        Commands::Scan(cmd) => scan(cmd),
        Commands::Inspect { input } => inspect(input),
    }
}

fn scan(cmd: ScanCmd) -> Result<()> {
    if cmd.chunk_overlap >= cmd.chunk_size {
        return Err(eyre!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            cmd.chunk_overlap,
            cmd.chunk_size
        ));
    }
    let mut config = ScanConfig {
        parallel_detectors: !cmd.sequential,
        parallel_chunks: !cmd.sequential,
        use_chunking: !cmd.no_chunking,
        chunk_size: cmd.chunk_size,
        chunk_overlap: cmd.chunk_overlap,
        strict_taxonomy: cmd.strict,
        num_threads: cmd.num_threads,
        ..ScanConfig::default()
    };
    if let Some(classes) = &cmd.classes {
        config = config.with_classes_by_name(classes, cmd.strict)?;
    }

    let mut scanner = NonBScanner::with_config(config);

    let bar = if cmd.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(9);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner} [{elapsed_precise}] {bar:30} {pos}/{len} {msg}",
            )?
            .progress_chars("=> "),
        );
        bar
    };
    {
        let bar = bar.clone();
        scanner.set_progress_callback(Arc::new(
            move |detector, completed, total, _elapsed, motif_count| {
                bar.set_length(total as u64);
                bar.set_position(completed as u64);
                bar.set_message(format!("{detector}: {motif_count} motifs"));
            },
        ));
    }

    let reader = bio::io::fasta::Reader::from_file(&cmd.input)
        .map_err(|e| eyre!("failed to open {}: {e}", cmd.input.display()))?;

    let mut all_motifs = Vec::new();
    for record in reader.records() {
        let record = record?;
        let sequence = std::str::from_utf8(record.seq())?.to_string();
        log::info!("scanning {} ({} bp)", record.id(), sequence.len());
        let report = scanner.analyze_with_report(&sequence, record.id())?;
        log::info!(
            "{}: {} motifs in {:.2}s",
            record.id(),
            report.motifs.len(),
            report.elapsed_secs
        );
        for run in &report.detector_runs {
            if let Some(error) = &run.error {
                log::warn!("detector {} failed on {}: {error}", run.class, record.id());
            }
        }
        all_motifs.extend(report.motifs);
    }
    bar.finish_and_clear();

    summarize(&all_motifs);
    let writer = export::stdout_or_file(cmd.output.as_ref())?;
    export::write_motifs(&all_motifs, cmd.format, writer)?;
    Ok(())
}

fn summarize(motifs: &[libnonb::Motif]) {
    use std::collections::BTreeMap;
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for m in motifs {
        *counts.entry(m.class.canonical_name()).or_default() += 1;
    }
    log::info!("{} motifs total", motifs.len());
    for (class, count) in counts {
        log::info!("  {class}: {count}");
    }
}

fn inspect(input: PathBuf) -> Result<()> {
    let reader = bio::io::fasta::Reader::from_file(&input)
        .map_err(|e| eyre!("failed to open {}: {e}", input.display()))?;
    for record in reader.records() {
        let record = record?;
        let sequence = std::str::from_utf8(record.seq())?;
        let report = libnonb::preprocess::inspect(sequence);
        println!(">{}", record.id());
        println!("  length: {} bp", report.length);
        println!("  valid bases (ATGC): {}", report.valid_bases);
        println!(
            "  A={} T={} G={} C={} N={}",
            report.a_count, report.t_count, report.g_count, report.c_count, report.n_count
        );
        println!("  GC%: {:.2}", report.gc_percentage);
        println!("  AT%: {:.2}", report.at_percentage);
        println!("  balance: {}", report.gc_balance.as_str());
        for warning in &report.warnings {
            println!("  warning: {warning}");
        }
        for (ch, positions) in &report.invalid_characters {
            println!("  invalid character {ch:?} at {positions:?}");
        }
    }
    Ok(())
}
