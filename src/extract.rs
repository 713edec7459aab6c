// src/extract.rs

use std::collections::VecDeque;
use std::io::{Error as IoError, ErrorKind};

use crate::codec::{canonical, encode_base, INVALID_BASE};

/// XOR mask applied to minimizer keys. Breaks ordering ties without biasing
/// the selection toward low-complexity minimizers; the constant is a
/// cross-build compatibility contract.
pub const MINIMIZER_XOR_MASK: u64 = 0xe37e28c4271b5a2d;

/// A spaced k-mer shape: `O` marks positions that contribute to the packed
/// k-mer, `-` marks skipped positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmerShape {
    pattern: Vec<bool>,
    k: usize,
}

impl KmerShape {
    /// Parse a pattern over `{O, -}`. The number of `O` positions becomes
    /// `k` and must lie in 1..=31.
    pub fn parse(pattern: &str) -> Result<Self, IoError> {
        let mut mask = Vec::with_capacity(pattern.len());
        for c in pattern.chars() {
            match c {
                'O' => mask.push(true),
                '-' => mask.push(false),
                _ => {
                    return Err(IoError::new(
                        ErrorKind::InvalidInput,
                        format!("invalid character {c:?} in shape {pattern:?}, expected O or -"),
                    ))
                }
            }
        }
        let k = mask.iter().filter(|&&keep| keep).count();
        if !(1..=31).contains(&k) {
            return Err(IoError::new(
                ErrorKind::InvalidInput,
                format!("shape {pattern:?} selects {k} bases, must select 1..=31"),
            ));
        }
        Ok(Self { pattern: mask, k })
    }

    /// Number of contributing (`O`) positions.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Total pattern length.
    pub fn window(&self) -> usize {
        self.pattern.len()
    }

    pub fn pattern_string(&self) -> String {
        self.pattern
            .iter()
            .map(|&keep| if keep { 'O' } else { '-' })
            .collect()
    }

    /// Pack the `O` positions of `window` into a 2-bit code. `None` if any
    /// selected base is invalid.
    fn pack(&self, window: &[u8]) -> Option<u64> {
        let mut packed = 0u64;
        for (i, &keep) in self.pattern.iter().enumerate() {
            if !keep {
                continue;
            }
            let code = encode_base(window[i]);
            if code == INVALID_BASE {
                return None;
            }
            packed = (packed << 2) | code;
        }
        Some(packed)
    }
}

/// Extraction mode, selected once per build or classify call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractMode {
    /// Every canonical k-mer.
    Plain { k: usize },
    /// Canonical minimizers of size `m` within k-length windows.
    Minimizer { k: usize, m: usize },
    /// Spaced k-mers packed through a shape.
    Shaped(KmerShape),
}

impl ExtractMode {
    /// Number of bases contributing to each fingerprint.
    pub fn k(&self) -> usize {
        match self {
            ExtractMode::Plain { k } | ExtractMode::Minimizer { k, .. } => *k,
            ExtractMode::Shaped(shape) => shape.k(),
        }
    }

    /// Lazy fingerprint stream over `seq`, in positional order. Invalid
    /// bases reset the rolling state and simply shorten the stream.
    pub fn fingerprints<'a>(&'a self, seq: &'a [u8]) -> Fingerprints<'a> {
        let inner = match self {
            ExtractMode::Plain { k } => Inner::Plain {
                k: *k,
                mask: kmer_mask(*k),
                acc: 0,
                valid: 0,
            },
            ExtractMode::Minimizer { k, m } => Inner::Minimizer {
                k: *k,
                m: *m,
                mask: kmer_mask(*m),
                toggle: MINIMIZER_XOR_MASK & kmer_mask(*m),
                acc: 0,
                valid: 0,
                window: VecDeque::new(),
            },
            ExtractMode::Shaped(shape) => Inner::Shaped { shape },
        };
        Fingerprints { seq, pos: 0, inner }
    }
}

fn kmer_mask(k: usize) -> u64 {
    (1u64 << (2 * k)) - 1
}

/// Iterator over the fingerprints of one nucleotide sequence. Finite and
/// consumed once.
pub struct Fingerprints<'a> {
    seq: &'a [u8],
    pos: usize,
    inner: Inner<'a>,
}

enum Inner<'a> {
    Plain {
        k: usize,
        mask: u64,
        acc: u64,
        valid: usize,
    },
    Minimizer {
        k: usize,
        m: usize,
        mask: u64,
        toggle: u64,
        acc: u64,
        valid: usize,
        /// `(masked_key, position)` pairs, keys strictly increasing back to
        /// front so the front always holds the window minimum.
        window: VecDeque<(u64, usize)>,
    },
    Shaped {
        shape: &'a KmerShape,
    },
}

impl Iterator for Fingerprints<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        match &mut self.inner {
            Inner::Plain { k, mask, acc, valid } => {
                while self.pos < self.seq.len() {
                    let code = encode_base(self.seq[self.pos]);
                    self.pos += 1;
                    if code == INVALID_BASE {
                        *acc = 0;
                        *valid = 0;
                        continue;
                    }
                    *acc = ((*acc << 2) | code) & *mask;
                    *valid += 1;
                    if *valid >= *k {
                        return Some(canonical(*acc, *k));
                    }
                }
                None
            }
            Inner::Minimizer {
                k,
                m,
                mask,
                toggle,
                acc,
                valid,
                window,
            } => {
                while self.pos < self.seq.len() {
                    let i = self.pos;
                    let code = encode_base(self.seq[i]);
                    self.pos += 1;
                    if code == INVALID_BASE {
                        *acc = 0;
                        *valid = 0;
                        window.clear();
                        continue;
                    }
                    *acc = ((*acc << 2) | code) & *mask;
                    *valid += 1;
                    if *valid >= *m {
                        let key = canonical(*acc, *m) ^ *toggle;
                        while let Some(&(back, _)) = window.back() {
                            if back >= key {
                                window.pop_back();
                            } else {
                                break;
                            }
                        }
                        window.push_back((key, i));
                        let bound = i as isize - *k as isize + *m as isize + 1;
                        while let Some(&(_, pos)) = window.front() {
                            if (pos as isize) < bound {
                                window.pop_front();
                            } else {
                                break;
                            }
                        }
                    }
                    if *valid >= *k {
                        if let Some(&(front, _)) = window.front() {
                            return Some(front ^ *toggle);
                        }
                    }
                }
                None
            }
            Inner::Shaped { shape } => {
                let shape = *shape;
                let window = shape.window();
                while self.pos + window <= self.seq.len() {
                    let offset = self.pos;
                    self.pos += 1;
                    if let Some(packed) = shape.pack(&self.seq[offset..offset + window]) {
                        return Some(canonical(packed, shape.k()));
                    }
                }
                None
            }
        }
    }
}
