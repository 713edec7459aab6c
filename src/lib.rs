// src/lib.rs

pub mod build;
pub mod classify;
pub mod codec;
pub mod db;
pub mod extract;
pub mod seqio;
pub mod taxonomy;
pub mod types;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::classify::{build_summary, classify_file, render_classification, render_summary};
use crate::db::Database;
use crate::types::{ClassificationLine, SummaryRow};

pub use crate::build::{build_database, BuildOptions, BuildSummary};
pub use crate::classify::ClassifyOptions;

/// Classification results for a batch of read files, with minimal
/// duplication: tables are rendered on demand.
pub struct ClassificationResults {
    pub lines: Vec<ClassificationLine>,
    pub summary: Vec<SummaryRow>,
}

impl ClassificationResults {
    /// Generate the per-read classification table on demand.
    pub fn get_classification_text(&self) -> String {
        render_classification(&self.lines)
    }

    /// Generate the per-taxonomy summary table on demand.
    pub fn get_summary_text(&self) -> String {
        render_summary(&self.summary)
    }
}

/// Classify reads from one or more FASTQ files against a serialized
/// database directory. Per-file parallelism preserves input order.
pub fn classify_reads(
    db_dir: &Path,
    read_paths: &[PathBuf],
    opts: &ClassifyOptions,
) -> Result<ClassificationResults, Box<dyn Error>> {
    let t0 = Instant::now();
    let db = Database::load(db_dir)?;
    log::info!(
        "loaded database: {} fingerprints, k={} ({:.2?})",
        db.kmers.len(),
        db.params.kmer_size,
        t0.elapsed()
    );

    let t1 = Instant::now();
    let mut lines = Vec::new();
    for path in read_paths {
        lines.extend(classify_file(&db, path, opts)?);
    }
    log::info!("classified {} reads ({:.2?})", lines.len(), t1.elapsed());

    let summary = build_summary(&lines);
    Ok(ClassificationResults { lines, summary })
}
