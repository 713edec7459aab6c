// src/build.rs

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

use ahash::AHashSet;
use log::{info, warn};

use crate::db::{self, DbParams, KmerMap, ShapeParams, VALUE_BITS};
use crate::extract::{ExtractMode, KmerShape};
use crate::seqio::FastaReader;
use crate::taxonomy::{self, is_valid_lineage, TaxonomyStore};

pub const DEFAULT_KMER_SIZE: usize = 25;

/// Builder configuration as supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Explicit k-mer size; `None` selects the default (or the shape's k).
    pub kmer_size: Option<usize>,
    /// Minimizer size; 0 disables minimizer selection.
    pub minimizer_size: usize,
    /// Spaced k-mer shape pattern over `{O, -}`.
    pub shape: Option<String>,
}

impl BuildOptions {
    /// Validate and resolve into an extraction mode. Fatal on k outside
    /// 1..=31, on `m >= k`, and on a shape combined with an explicit k or
    /// a minimizer size.
    pub fn resolve(&self) -> io::Result<ExtractMode> {
        if let Some(pattern) = &self.shape {
            if self.kmer_size.is_some() {
                return Err(io::Error::new(
                    ErrorKind::InvalidInput,
                    "a k-mer shape carries its own k; drop the explicit k-mer size",
                ));
            }
            if self.minimizer_size > 0 {
                return Err(io::Error::new(
                    ErrorKind::InvalidInput,
                    "minimizer selection cannot be combined with a k-mer shape",
                ));
            }
            return Ok(ExtractMode::Shaped(KmerShape::parse(pattern)?));
        }

        let k = self.kmer_size.unwrap_or(DEFAULT_KMER_SIZE);
        if !(1..=31).contains(&k) {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("k-mer size {k} out of range 1..=31"),
            ));
        }
        match self.minimizer_size {
            0 => Ok(ExtractMode::Plain { k }),
            m if m < k => Ok(ExtractMode::Minimizer { k, m }),
            m => Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("minimizer size {m} must be smaller than k ({k})"),
            )),
        }
    }
}

/// Counters reported after a successful build.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub references: u64,
    pub skipped: u64,
    pub taxa: usize,
    pub num_kmers: u64,
}

/// Build a database from reference FASTA files and serialize it into
/// `out_dir`.
///
/// Two streaming passes over the inputs: the first collects and validates
/// lineages (invalid records warn and drop out), the second extracts
/// fingerprints and merges conflicting assignments down to the LCA of the
/// taxa involved. Only the fingerprint map is held in memory.
pub fn build_database(
    refs: &[PathBuf],
    opts: &BuildOptions,
    out_dir: &Path,
) -> io::Result<BuildSummary> {
    let mode = opts.resolve()?;

    // Pass 1: distinct valid lineages, in order of first appearance.
    let t0 = Instant::now();
    let mut lineages: Vec<String> = Vec::new();
    let mut seen = AHashSet::new();
    let mut references = 0u64;
    let mut skipped = 0u64;
    for path in refs {
        for record in FastaReader::from_path(path)? {
            let record = record?;
            references += 1;
            let lineage = record.comment.trim();
            if !is_valid_lineage(lineage) {
                warn!("{}: invalid lineage {:?}, reference skipped", record.id, lineage);
                skipped += 1;
                continue;
            }
            if seen.insert(lineage.to_string()) {
                lineages.push(lineage.to_string());
            }
        }
    }
    if lineages.is_empty() {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            "no valid taxonomies in the reference set",
        ));
    }
    let store = TaxonomyStore::build(&lineages);
    info!(
        "pass 1: {} references, {} distinct taxonomies ({:.2?})",
        references,
        lineages.len(),
        t0.elapsed()
    );

    // Pass 2: fingerprint accumulation with LCA conflict merging.
    let t1 = Instant::now();
    let mut kmers = KmerMap::new();
    for path in refs {
        for record in FastaReader::from_path(path)? {
            let record = record?;
            // Lineages that did not survive pass 1 validation are skipped.
            let taxon = match store.id_of(record.comment.trim()) {
                Some(t) => t,
                None => continue,
            };
            for fingerprint in mode.fingerprints(record.seq.as_bytes()) {
                match kmers.get_mut(&fingerprint) {
                    None => {
                        kmers.insert(fingerprint, taxon);
                    }
                    Some(prev) if *prev != taxon => {
                        *prev = taxonomy::lca(&store.parents, *prev, taxon);
                    }
                    Some(_) => {}
                }
            }
        }
    }
    if kmers.is_empty() {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            "no fingerprints extracted from the reference set",
        ));
    }
    info!(
        "pass 2: {} distinct fingerprints ({:.2?})",
        kmers.len(),
        t1.elapsed()
    );

    let (kmer_size, minimizer_size, kmer_shape) = match &mode {
        ExtractMode::Plain { k } => (*k, 0, None),
        ExtractMode::Minimizer { k, m } => (*k, *m, None),
        ExtractMode::Shaped(shape) => (
            shape.k(),
            0,
            Some(ShapeParams {
                pattern: shape.pattern_string(),
                window_size: shape.window(),
            }),
        ),
    };
    let params = DbParams {
        kmer_size,
        minimizer_size,
        value_bits: VALUE_BITS,
        num_kmers: kmers.len() as u64,
        taxonomies: store
            .name_to_id
            .iter()
            .map(|(name, &id)| (name.clone(), id))
            .collect(),
        kmer_shape,
    };
    db::save(out_dir, &params, &store.parents, &kmers)?;
    info!("serialized database to {}", out_dir.display());

    Ok(BuildSummary {
        references,
        skipped,
        taxa: store.num_taxa(),
        num_kmers: params.num_kmers,
    })
}
