// src/db.rs
//
// On-disk database layout: a directory holding `params.json` (build
// parameters and the taxonomy name map), `lineage.bin` (child/parent id
// pairs) and `kmers.bin` (fingerprint/taxon pairs). Binary files carry a
// u64 entry count followed by little-endian fixed-width pairs; entry order
// is not contractual.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::extract::{ExtractMode, KmerShape};
use crate::taxonomy::{ParentMap, TaxonId, TaxonomyStore};

pub const PARAMS_FILE: &str = "params.json";
pub const LINEAGE_FILE: &str = "lineage.bin";
pub const KMERS_FILE: &str = "kmers.bin";

/// Bit width of the stored taxon values.
pub const VALUE_BITS: u32 = 24;

/// Fingerprint -> taxon table. The stored taxon is the LCA of every
/// reference taxon the fingerprint occurred in.
pub type KmerMap = AHashMap<u64, TaxonId>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeParams {
    pub pattern: String,
    pub window_size: usize,
}

/// Contents of `params.json`. The taxonomy map holds individual level
/// texts, whole-lineage aliases and the synthetic root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbParams {
    pub kmer_size: usize,
    pub minimizer_size: usize,
    pub value_bits: u32,
    pub num_kmers: u64,
    pub taxonomies: BTreeMap<String, TaxonId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kmer_shape: Option<ShapeParams>,
}

impl DbParams {
    /// Reconstruct the extraction mode recorded by the build.
    pub fn extract_mode(&self) -> io::Result<ExtractMode> {
        if let Some(shape) = &self.kmer_shape {
            let parsed = KmerShape::parse(&shape.pattern)?;
            if parsed.window() != shape.window_size {
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    format!(
                        "shape pattern {:?} disagrees with window_size {}",
                        shape.pattern, shape.window_size
                    ),
                ));
            }
            return Ok(ExtractMode::Shaped(parsed));
        }
        if !(1..=31).contains(&self.kmer_size) {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("kmer_size {} out of range 1..=31", self.kmer_size),
            ));
        }
        if self.minimizer_size > 0 {
            if self.minimizer_size >= self.kmer_size {
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    format!(
                        "minimizer_size {} must be smaller than kmer_size {}",
                        self.minimizer_size, self.kmer_size
                    ),
                ));
            }
            Ok(ExtractMode::Minimizer {
                k: self.kmer_size,
                m: self.minimizer_size,
            })
        } else {
            Ok(ExtractMode::Plain { k: self.kmer_size })
        }
    }
}

/// A loaded classification database: immutable once constructed.
#[derive(Debug)]
pub struct Database {
    pub params: DbParams,
    pub mode: ExtractMode,
    pub kmers: KmerMap,
    pub store: TaxonomyStore,
}

impl Database {
    pub fn load(dir: &Path) -> io::Result<Database> {
        let params_path = dir.join(PARAMS_FILE);
        let text = fs::read_to_string(&params_path)
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", params_path.display())))?;
        let params: DbParams = serde_json::from_str(&text).map_err(|e| {
            io::Error::new(
                ErrorKind::InvalidData,
                format!("{}: {e}", params_path.display()),
            )
        })?;
        let mode = params.extract_mode()?;
        let parents = read_lineage_bin(&dir.join(LINEAGE_FILE))?;
        let kmers = read_kmers_bin(&dir.join(KMERS_FILE))?;

        let mut name_to_id = AHashMap::with_capacity(params.taxonomies.len());
        let mut id_to_name = AHashMap::new();
        for (name, &id) in &params.taxonomies {
            name_to_id.insert(name.clone(), id);
            // Whole-lineage aliases contain level separators and do not
            // take part in the reverse lookup.
            if !name.contains(';') {
                id_to_name.insert(id, name.clone());
            }
        }
        let store = TaxonomyStore {
            name_to_id,
            id_to_name,
            parents,
        };

        Ok(Database {
            params,
            mode,
            kmers,
            store,
        })
    }
}

/// Serialize a database into `dir`, creating it if needed. Each file is
/// written to a temporary sibling and renamed into place.
pub fn save(dir: &Path, params: &DbParams, parents: &ParentMap, kmers: &KmerMap) -> io::Result<()> {
    fs::create_dir_all(dir)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", dir.display())))?;

    let json = serde_json::to_string_pretty(params)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
    atomic_file(dir, PARAMS_FILE, |w| w.write_all(json.as_bytes()))?;

    atomic_file(dir, LINEAGE_FILE, |w| {
        w.write_all(&(parents.len() as u64).to_le_bytes())?;
        for (&child, &parent) in parents {
            w.write_all(&child.to_le_bytes())?;
            w.write_all(&parent.to_le_bytes())?;
        }
        Ok(())
    })?;

    atomic_file(dir, KMERS_FILE, |w| {
        w.write_all(&(kmers.len() as u64).to_le_bytes())?;
        for (&fingerprint, &taxon) in kmers {
            w.write_all(&fingerprint.to_le_bytes())?;
            w.write_all(&taxon.to_le_bytes())?;
        }
        Ok(())
    })
}

fn atomic_file<F>(dir: &Path, name: &str, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let tmp = dir.join(format!(".{name}.tmp"));
    let mut w = BufWriter::new(File::create(&tmp)?);
    write(&mut w)?;
    w.flush()?;
    drop(w);
    fs::rename(&tmp, dir.join(name))
}

fn read_u64_le(r: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_u32_le(r: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn open_bin(path: &Path) -> io::Result<BufReader<File>> {
    let f = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {e}", path.display())))?;
    Ok(BufReader::new(f))
}

fn truncated(path: &Path, e: io::Error) -> io::Error {
    if e.kind() == ErrorKind::UnexpectedEof {
        io::Error::new(
            ErrorKind::InvalidData,
            format!("{}: truncated database file", path.display()),
        )
    } else {
        e
    }
}

fn read_lineage_bin(path: &Path) -> io::Result<ParentMap> {
    let mut r = open_bin(path)?;
    let count = read_u64_le(&mut r).map_err(|e| truncated(path, e))?;
    let mut parents = ParentMap::with_capacity(count as usize);
    for _ in 0..count {
        let child = read_u32_le(&mut r).map_err(|e| truncated(path, e))?;
        let parent = read_u32_le(&mut r).map_err(|e| truncated(path, e))?;
        parents.insert(child, parent);
    }
    Ok(parents)
}

fn read_kmers_bin(path: &Path) -> io::Result<KmerMap> {
    let mut r = open_bin(path)?;
    let count = read_u64_le(&mut r).map_err(|e| truncated(path, e))?;
    let mut kmers = KmerMap::with_capacity(count as usize);
    for _ in 0..count {
        let fingerprint = read_u64_le(&mut r).map_err(|e| truncated(path, e))?;
        let taxon = read_u32_le(&mut r).map_err(|e| truncated(path, e))?;
        kmers.insert(fingerprint, taxon);
    }
    Ok(kmers)
}
