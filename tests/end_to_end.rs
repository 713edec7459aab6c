// End-to-end scenarios: build a database from reference FASTA files in a
// temp directory, classify reads against it, and check the serialized
// artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use kmertax::db::{self, Database};
use kmertax::{build_database, classify_reads, BuildOptions, ClassifyOptions};

const LINEAGE: &str = "d__B;p__P;c__C;o__O;f__F;g__G;s__S";
const REF_25: &str = "ACGTACGTACGTACGTACGTACGTA";

fn write_fasta(dir: &Path, name: &str, records: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut text = String::new();
    for (header, seq) in records {
        text.push_str(&format!(">{header}\n{seq}\n"));
    }
    fs::write(&path, text).expect("write fasta");
    path
}

fn write_fastq(dir: &Path, name: &str, records: &[(&str, &str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut text = String::new();
    for (id, seq, quals) in records {
        text.push_str(&format!("@{id}\n{seq}\n+\n{quals}\n"));
    }
    fs::write(&path, text).expect("write fastq");
    path
}

fn revcomp(seq: &str) -> String {
    seq.chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'C' => 'G',
            'G' => 'C',
            'T' => 'A',
            other => other,
        })
        .collect()
}

fn build_single_reference(tmp: &TempDir) -> PathBuf {
    let fasta = write_fasta(
        tmp.path(),
        "refs.fa",
        &[(&format!("r1 {LINEAGE}"), REF_25)],
    );
    let db_dir = tmp.path().join("db");
    let opts = BuildOptions {
        kmer_size: Some(25),
        ..Default::default()
    };
    let summary = build_database(&[fasta], &opts, &db_dir).expect("build");
    assert_eq!(summary.num_kmers, 1);
    db_dir
}

fn classify_opts(min_hits: u32) -> ClassifyOptions {
    ClassifyOptions {
        quality_threshold: 15,
        min_hits,
    }
}

#[test]
fn single_25mer_reference_classifies_its_own_read() {
    let tmp = TempDir::new().unwrap();
    let db_dir = build_single_reference(&tmp);

    let reads = write_fastq(tmp.path(), "reads.fq", &[("q1", REF_25, &"I".repeat(25))]);
    let results = classify_reads(&db_dir, &[reads], &classify_opts(1)).expect("classify");

    assert_eq!(results.lines.len(), 1);
    let line = &results.lines[0];
    assert_eq!(line.read_id, "q1");
    assert_eq!(line.taxonomy, "s__S");
    assert_eq!(line.hit_count, 1);
    assert_eq!(line.total_kmers, 1);
    assert_eq!(line.confidence, 1.0);
}

#[test]
fn reverse_complement_read_classifies_identically() {
    let tmp = TempDir::new().unwrap();
    let db_dir = build_single_reference(&tmp);

    let rc = revcomp(REF_25);
    let reads = write_fastq(tmp.path(), "reads.fq", &[("q1", &rc, &"I".repeat(25))]);
    let results = classify_reads(&db_dir, &[reads], &classify_opts(1)).expect("classify");

    let line = &results.lines[0];
    assert_eq!(line.taxonomy, "s__S");
    assert_eq!(line.hit_count, 1);
}

#[test]
fn shared_kmer_of_two_species_stores_their_genus() {
    let tmp = TempDir::new().unwrap();
    let poly_a = "A".repeat(25);
    let fasta = write_fasta(
        tmp.path(),
        "refs.fa",
        &[
            ("r1 d__B;p__P;c__C;o__O;f__F;g__G;s__S1", poly_a.as_str()),
            ("r2 d__B;p__P;c__C;o__O;f__F;g__G;s__S2", poly_a.as_str()),
        ],
    );
    let db_dir = tmp.path().join("db");
    let opts = BuildOptions {
        kmer_size: Some(25),
        ..Default::default()
    };
    build_database(&[fasta], &opts, &db_dir).expect("build");

    let db = Database::load(&db_dir).expect("load");
    let fingerprint = db
        .mode
        .fingerprints(poly_a.as_bytes())
        .next()
        .expect("one fingerprint");
    let genus = db.store.id_of("g__G").expect("genus id");
    assert_eq!(db.kmers[&fingerprint], genus);
    assert_ne!(Some(genus), db.store.id_of("s__S1"));
    assert_ne!(Some(genus), db.store.id_of("s__S2"));
}

#[test]
fn minimizer_build_is_deterministic_and_no_larger() {
    let tmp = TempDir::new().unwrap();
    let seq = "ACGGTTACGCATACGTTAGCCATGCAGTTACGATCGATTGCCATAGCAAT";
    let fasta = write_fasta(tmp.path(), "refs.fa", &[(&format!("r1 {LINEAGE}"), seq)]);

    let plain_dir = tmp.path().join("plain");
    let plain = build_database(
        &[fasta.clone()],
        &BuildOptions {
            kmer_size: Some(25),
            ..Default::default()
        },
        &plain_dir,
    )
    .expect("plain build");

    let min_dir = tmp.path().join("minimizer");
    let minimized = build_database(
        &[fasta],
        &BuildOptions {
            kmer_size: Some(25),
            minimizer_size: 15,
            ..Default::default()
        },
        &min_dir,
    )
    .expect("minimizer build");

    assert!(minimized.num_kmers <= plain.num_kmers);

    let reads = write_fastq(tmp.path(), "reads.fq", &[("q1", seq, &"I".repeat(seq.len()))]);
    let results = classify_reads(&min_dir, &[reads], &classify_opts(1)).expect("classify");
    assert!(results.lines[0].hit_count >= 1);
    assert_eq!(results.lines[0].taxonomy, "s__S");
}

#[test]
fn fully_masked_read_reports_no_hits() {
    let tmp = TempDir::new().unwrap();
    let db_dir = build_single_reference(&tmp);

    let reads = write_fastq(tmp.path(), "reads.fq", &[("q1", REF_25, &"!".repeat(25))]);
    let results = classify_reads(&db_dir, &[reads], &classify_opts(1)).expect("classify");

    let line = &results.lines[0];
    assert_eq!(line.taxonomy, "no hits");
    assert_eq!(line.hit_count, 0);
    assert_eq!(line.total_kmers, 0);
    assert_eq!(line.confidence, 0.0);
}

#[test]
fn tied_species_resolve_to_their_genus() {
    let tmp = TempDir::new().unwrap();
    let kmer_x = REF_25;
    let kmer_y = "C".repeat(25);
    let fasta = write_fasta(
        tmp.path(),
        "refs.fa",
        &[
            ("r1 d__B;p__P;c__C;o__O;f__F;g__G;s__X", kmer_x),
            ("r2 d__B;p__P;c__C;o__O;f__F;g__G;s__Y", kmer_y.as_str()),
        ],
    );
    let db_dir = tmp.path().join("db");
    build_database(
        &[fasta],
        &BuildOptions {
            kmer_size: Some(25),
            ..Default::default()
        },
        &db_dir,
    )
    .expect("build");

    let read = format!("{kmer_x}{kmer_y}");
    let reads = write_fastq(
        tmp.path(),
        "reads.fq",
        &[("q1", read.as_str(), &"I".repeat(read.len()))],
    );
    let results = classify_reads(&db_dir, &[reads], &classify_opts(1)).expect("classify");

    let line = &results.lines[0];
    assert_eq!(line.taxonomy, "g__G");
    assert_eq!(line.hit_count, 1);
    assert_eq!(line.total_kmers, 26);
}

#[test]
fn database_round_trips_through_save_and_load() {
    let tmp = TempDir::new().unwrap();
    let db_dir = build_single_reference(&tmp);

    let first = Database::load(&db_dir).expect("first load");
    let second_dir = tmp.path().join("copy");
    db::save(&second_dir, &first.params, &first.store.parents, &first.kmers).expect("save");
    let second = Database::load(&second_dir).expect("second load");

    assert_eq!(first.params, second.params);
    assert_eq!(first.kmers, second.kmers);
    assert_eq!(first.store.parents, second.store.parents);
    assert_eq!(first.store.name_to_id, second.store.name_to_id);
}

#[test]
fn summary_accounts_for_every_classified_read() {
    let tmp = TempDir::new().unwrap();
    let db_dir = build_single_reference(&tmp);

    let garbage = "G".repeat(25);
    let reads = write_fastq(
        tmp.path(),
        "reads.fq",
        &[
            ("q1", REF_25, &"I".repeat(25)),
            ("q2", REF_25, &"I".repeat(25)),
            ("q3", garbage.as_str(), &"I".repeat(25)),
        ],
    );
    let results = classify_reads(&db_dir, &[reads], &classify_opts(1)).expect("classify");

    // Output order matches input order.
    let ids: Vec<&str> = results.lines.iter().map(|l| l.read_id.as_str()).collect();
    assert_eq!(ids, ["q1", "q2", "q3"]);

    for row in &results.summary {
        let matching: Vec<_> = results
            .lines
            .iter()
            .filter(|l| l.taxonomy == row.taxonomy)
            .collect();
        assert_eq!(row.reads as usize, matching.len());
        assert_eq!(
            row.total_bases,
            matching.iter().map(|l| l.bases as u64).sum::<u64>()
        );
    }

    assert_eq!(results.summary[0].taxonomy, "s__S");
    assert_eq!(results.summary[0].reads, 2);
    assert_eq!(results.summary[0].total_bases, 50);
    assert_eq!(results.summary[1].taxonomy, "no hits");

    let text = results.get_summary_text();
    assert!(text.starts_with("Taxonomy\tReads\tAvg_Score\tTotal_Bases\n"));
    assert!(text.contains("s__S\t2\t1.000\t50"));

    let classification = results.get_classification_text();
    assert_eq!(classification.lines().count(), 3);
    assert!(classification.starts_with("q1\ts__S\t1\t1\n"));
}

#[test]
fn build_fails_without_any_valid_taxonomy() {
    let tmp = TempDir::new().unwrap();
    let fasta = write_fasta(tmp.path(), "refs.fa", &[("r1 not a lineage", REF_25)]);
    let err = build_database(
        &[fasta],
        &BuildOptions {
            kmer_size: Some(25),
            ..Default::default()
        },
        &tmp.path().join("db"),
    )
    .unwrap_err();
    assert!(err.to_string().contains("taxonomies"));
}

#[test]
fn build_fails_without_any_fingerprint() {
    let tmp = TempDir::new().unwrap();
    // Valid lineage, but the sequence is shorter than k.
    let fasta = write_fasta(tmp.path(), "refs.fa", &[(&format!("r1 {LINEAGE}"), "ACGT")]);
    let err = build_database(
        &[fasta],
        &BuildOptions {
            kmer_size: Some(25),
            ..Default::default()
        },
        &tmp.path().join("db"),
    )
    .unwrap_err();
    assert!(err.to_string().contains("fingerprints"));
}

#[test]
fn invalid_records_warn_but_do_not_fail_the_build() {
    let tmp = TempDir::new().unwrap();
    let fasta = write_fasta(
        tmp.path(),
        "refs.fa",
        &[
            ("r1 not a lineage", REF_25),
            (&format!("r2 {LINEAGE}"), REF_25),
        ],
    );
    let summary = build_database(
        &[fasta],
        &BuildOptions {
            kmer_size: Some(25),
            ..Default::default()
        },
        &tmp.path().join("db"),
    )
    .expect("build");
    assert_eq!(summary.references, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.num_kmers, 1);
}
