use ahash::AHashMap;

use crate::db::Database;
use crate::taxonomy::{self, TaxonId};
use crate::types::ClassificationLine;

/// Taxonomy reported when a read has no (or too few) database hits.
pub const NO_HITS: &str = "no hits";

/// Fallback when the winning taxon has no name in the store.
pub const UNCLASSIFIED: &str = "unclassified";

/// Per-read classification knobs.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyOptions {
    /// Phred+33 threshold; bases strictly below it are masked to N.
    pub quality_threshold: u8,
    /// Minimum database hits for a read to be classified.
    pub min_hits: u32,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            quality_threshold: 15,
            min_hits: 3,
        }
    }
}

/// Replace every base whose Phred+33 quality is strictly below `threshold`
/// with `N`. A quality string whose length differs from the sequence leaves
/// the sequence untouched.
pub fn mask_low_quality(seq: &str, quals: &str, threshold: u8) -> String {
    if seq.len() != quals.len() {
        return seq.to_string();
    }
    seq.chars()
        .zip(quals.chars())
        .map(|(base, q)| {
            let phred = (q as u32).saturating_sub(33);
            if phred < threshold as u32 {
                'N'
            } else {
                base
            }
        })
        .collect()
}

/// Classify one (already quality-masked) sequence against the database.
///
/// Fingerprints are tallied per taxon; the maximum tally wins, with ties
/// folded down to their LCA. Confidence is the winning tally over the
/// number of fingerprints extracted.
pub fn classify_one(
    db: &Database,
    read_id: &str,
    seq: &str,
    opts: &ClassifyOptions,
) -> ClassificationLine {
    let mut tally: AHashMap<TaxonId, u32> = AHashMap::new();
    let mut total_kmers = 0usize;
    let mut total_hits = 0u32;
    for fingerprint in db.mode.fingerprints(seq.as_bytes()) {
        total_kmers += 1;
        if let Some(&taxon) = db.kmers.get(&fingerprint) {
            *tally.entry(taxon).or_insert(0) += 1;
            total_hits += 1;
        }
    }

    if total_kmers == 0 {
        return no_hits_line(read_id, 0, 0, seq.len());
    }
    if total_hits < opts.min_hits || tally.is_empty() {
        return no_hits_line(read_id, total_hits, total_kmers, seq.len());
    }

    let max_count = tally.values().copied().max().unwrap_or(0);
    let mut tied = tally
        .iter()
        .filter(|(_, &count)| count == max_count)
        .map(|(&taxon, _)| taxon);
    let mut winner = tied.next().unwrap_or(taxonomy::ROOT_TAXON);
    for taxon in tied {
        winner = taxonomy::lca(&db.store.parents, winner, taxon);
    }

    let taxonomy = db
        .store
        .name_of(winner)
        .unwrap_or(UNCLASSIFIED)
        .to_string();
    ClassificationLine {
        read_id: read_id.to_string(),
        taxonomy,
        hit_count: max_count,
        total_kmers,
        confidence: max_count as f64 / total_kmers as f64,
        bases: seq.len(),
    }
}

fn no_hits_line(read_id: &str, hit_count: u32, total_kmers: usize, bases: usize) -> ClassificationLine {
    ClassificationLine {
        read_id: read_id.to_string(),
        taxonomy: NO_HITS.to_string(),
        hit_count,
        total_kmers,
        confidence: 0.0,
        bases,
    }
}
