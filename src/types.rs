//src/types.rs

/// A reference sequence as parsed from FASTA. The comment field (everything
/// after the first whitespace in the header) carries the lineage string.
#[derive(Debug, Clone)]
pub struct RefRecord {
    pub id: String,
    pub comment: String,
    pub seq: String,
}

/// A query read as parsed from FASTQ.
#[derive(Debug, Clone)]
pub struct ReadRecord {
    pub id: String,
    pub seq: String,
    pub quals: String,
}

/// One row of per-read classifier output.
///
/// `confidence` and `bases` feed the summary table and are not printed in
/// the classification file itself.
#[derive(Debug, Clone)]
pub struct ClassificationLine {
    pub read_id: String,
    pub taxonomy: String,
    pub hit_count: u32,
    pub total_kmers: usize,
    pub confidence: f64,
    pub bases: usize,
}

/// One row of the per-taxonomy summary.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub taxonomy: String,
    pub reads: u64,
    pub avg_score: f64,
    pub total_bases: u64,
}
