use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use kmertax::{build_database, classify_reads, BuildOptions, ClassifyOptions};

#[derive(Parser)]
#[command(name = "kmertax", version)]
#[command(about = "K-mer based taxonomic read classifier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a classification database from reference FASTA files
    Build {
        /// Output database directory
        #[arg(short, long)]
        output: PathBuf,

        /// K-mer size (1..=31); incompatible with --shape
        #[arg(short = 'k', long = "kmer-size")]
        kmer_size: Option<usize>,

        /// Minimizer size; 0 disables minimizer selection
        #[arg(short = 'm', long = "minimizer-size", default_value_t = 0)]
        minimizer_size: usize,

        /// Spaced k-mer shape over O and - (e.g. OOO-O-OOO)
        #[arg(long)]
        shape: Option<String>,

        /// Reference FASTA file(s), optionally gzip-compressed
        #[arg(required = true)]
        references: Vec<PathBuf>,
    },

    /// Classify FASTQ reads against a database
    Classify {
        /// Database directory produced by `build`
        #[arg(short, long)]
        database: PathBuf,

        /// Prefix for <prefix>_classification.txt and <prefix>_summary.txt
        #[arg(short, long)]
        output: String,

        /// Phred+33 threshold below which bases are masked to N
        #[arg(long, default_value_t = 15)]
        quality: u8,

        /// Minimum database hits for a read to be classified
        #[arg(long = "min-hits", default_value_t = 3)]
        min_hits: u32,

        /// Read FASTQ file(s), optionally gzip-compressed
        #[arg(required = true)]
        reads: Vec<PathBuf>,
    },
}

fn spinner(msg: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&[
                "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
            ])
            .template("{spinner:.green} {msg}")
            .expect("Invalid spinner template"),
    );
    bar.set_message(msg.to_string());
    bar
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Build {
            output,
            kmer_size,
            minimizer_size,
            shape,
            references,
        } => {
            let bar = spinner("Building database...");
            let opts = BuildOptions {
                kmer_size,
                minimizer_size,
                shape,
            };
            let summary = build_database(&references, &opts, &output)?;
            bar.finish_with_message(format!(
                "Built {}: {} taxa, {} fingerprints ({}/{} references skipped)",
                output.display(),
                summary.taxa,
                summary.num_kmers,
                summary.skipped,
                summary.references
            ));
        }
        Commands::Classify {
            database,
            output,
            quality,
            min_hits,
            reads,
        } => {
            let bar = spinner("Classifying reads...");
            let opts = ClassifyOptions {
                quality_threshold: quality,
                min_hits,
            };
            let results = classify_reads(&database, &reads, &opts)?;
            bar.finish_with_message(format!("Classified {} reads.", results.lines.len()));

            let bar = spinner("Writing output files...");
            let classification_path = format!("{output}_classification.txt");
            let summary_path = format!("{output}_summary.txt");
            fs::write(&classification_path, results.get_classification_text())?;
            fs::write(&summary_path, results.get_summary_text())?;
            bar.finish_with_message(format!(
                "Wrote {classification_path} and {summary_path}."
            ));
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
