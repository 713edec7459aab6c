// src/classify/classify_stats.rs

use std::fmt::Write as _;

use ahash::AHashMap;

use crate::types::{ClassificationLine, SummaryRow};

/// Per-taxonomy accumulator feeding the summary table.
#[derive(Default, Debug, Clone)]
struct TaxonAggregate {
    reads: u64,
    bases: u64,
    score_sum: f64,
}

/// Aggregate classification lines into summary rows, sorted descending by
/// read count. Rows with equal read counts sort by taxonomy for stable
/// output.
pub fn build_summary(lines: &[ClassificationLine]) -> Vec<SummaryRow> {
    let mut aggregates: AHashMap<&str, TaxonAggregate> = AHashMap::new();
    for line in lines {
        let agg = aggregates.entry(line.taxonomy.as_str()).or_default();
        agg.reads += 1;
        agg.bases += line.bases as u64;
        agg.score_sum += line.confidence;
    }

    let mut rows: Vec<SummaryRow> = aggregates
        .into_iter()
        .map(|(taxonomy, agg)| SummaryRow {
            taxonomy: taxonomy.to_string(),
            reads: agg.reads,
            avg_score: agg.score_sum / agg.reads as f64,
            total_bases: agg.bases,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.reads
            .cmp(&a.reads)
            .then_with(|| a.taxonomy.cmp(&b.taxonomy))
    });
    rows
}

/// Render the per-read classification table. TAB-separated, no header.
pub fn render_classification(lines: &[ClassificationLine]) -> String {
    let mut out = String::new();
    for line in lines {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            line.read_id, line.taxonomy, line.hit_count, line.total_kmers
        );
    }
    out
}

/// Render the summary table with its header row.
pub fn render_summary(rows: &[SummaryRow]) -> String {
    let mut out = String::from("Taxonomy\tReads\tAvg_Score\tTotal_Bases\n");
    for row in rows {
        let _ = writeln!(
            out,
            "{}\t{}\t{:.3}\t{}",
            row.taxonomy, row.reads, row.avg_score, row.total_bases
        );
    }
    out
}
