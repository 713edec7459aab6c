use rayon::prelude::*;
use std::io;
use std::path::Path;

use super::classify_sequence::{classify_one, mask_low_quality, ClassifyOptions};
use crate::db::Database;
use crate::seqio::FastqReader;
use crate::types::{ClassificationLine, ReadRecord};

/// Classify every read of one FASTQ file.
///
/// Reads are classified in parallel against the shared immutable database;
/// the indexed map keeps the returned lines in input order.
pub fn classify_file(
    db: &Database,
    path: &Path,
    opts: &ClassifyOptions,
) -> io::Result<Vec<ClassificationLine>> {
    let reads: Vec<ReadRecord> = FastqReader::from_path(path)?.collect::<io::Result<Vec<_>>>()?;

    let lines = reads
        .par_iter()
        .map(|read| {
            let masked = mask_low_quality(&read.seq, &read.quals, opts.quality_threshold);
            classify_one(db, &read.id, &masked, opts)
        })
        .collect();

    Ok(lines)
}
