//! Bust token generation: mtime fingerprints plus content digests.
//!
//! A token is `fingerprint[..stat_len] + digest[..hash_len]`. The
//! fingerprint is derived from the file's modification time and needs no
//! content read, so it doubles as a cheap "possibly unchanged" probe; the
//! digest is the change-sensitive part. Everything is lowercase hex so
//! tokens embed in filenames and query strings without escaping.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use dashmap::DashMap;
use sha2::{Digest as _, Sha256, Sha512};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::Error;
use crate::types::BustToken;

/// Supported content-hash functions. `Xxh3` is the non-cryptographic
/// fallback and also the cheapest choice for large asset trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256 via the sha2 crate.
    Sha256,
    /// SHA-512 via the sha2 crate.
    Sha512,
    /// 64-bit xxh3 checksum.
    Xxh3,
}

impl HashAlgorithm {
    /// Parse an algorithm name from configuration. Unknown names return
    /// `None`; the caller decides the fallback.
    pub fn from_name(name: &str) -> Option<Self> {
        return match name.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Some(HashAlgorithm::Sha256),
            "sha512" | "sha-512" => Some(HashAlgorithm::Sha512),
            "xxh3" | "xxhash" => Some(HashAlgorithm::Xxh3),
            _ => None,
        };
    }

    /// Lowercase hex digest of the data.
    pub fn digest_hex(self, data: &[u8]) -> String {
        return match self {
            HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(data)),
            HashAlgorithm::Sha512 => format!("{:x}", Sha512::digest(data)),
            HashAlgorithm::Xxh3 => format!("{:016x}", xxh3_64(data)),
        };
    }
}

/// Token length configuration resolved from the project config.
#[derive(Debug, Clone, Copy)]
pub struct TokenSpec {
    /// Content-hash algorithm for digest components.
    pub algorithm: HashAlgorithm,
    /// Digest component length per sub-token.
    pub hash_len: u32,
    /// Fingerprint component length per sub-token.
    pub stat_len: u32,
    /// Total token length; composite tokens truncate to this.
    pub total_len: u32,
}

/// Per-run cache of computed sub-tokens, keyed by file path.
///
/// Owned by the orchestrator, created per scan run, passed by reference into
/// token computation, discarded at run end. Concurrent map because scan
/// workers share it.
#[derive(Default)]
pub struct BustCache {
    entries: DashMap<PathBuf, CachedSubToken>,
}

/// A cached per-file sub-token plus the full fingerprint it was computed
/// under.
struct CachedSubToken {
    fingerprint: String,
    sub_token: String,
}

impl BustCache {
    /// Fresh empty cache for one scan run.
    pub fn new() -> Self {
        return Self { entries: DashMap::new() };
    }
}

/// Compute the bust token for a set of resolved paths.
///
/// One path yields its sub-token directly. Several paths (the multibust
/// case) yield the digest of the concatenated sub-tokens, truncated to the
/// total length — fixed-size output that still changes when any variant
/// changes. Callers pass paths in deterministic (lexicographic) order.
///
/// # Errors
///
/// Returns `Error::Io` if any file cannot be statted or read.
pub fn bust_token(paths: &[PathBuf], spec: TokenSpec, cache: &BustCache) -> Result<BustToken, Error> {
    if let [single] = paths {
        return Ok(BustToken(sub_token(single, spec, cache)?));
    }

    let mut combined = String::new();
    for path in paths {
        combined.push_str(&sub_token(path, spec, cache)?);
    }
    let digest = spec.algorithm.digest_hex(combined.as_bytes());
    return Ok(BustToken(truncated(&digest, spec.total_len)));
}

/// The fingerprint component alone — a cheap probe that never reads file
/// content. Used to decide whether an existing token can be left in place.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be statted.
pub fn fingerprint_component(path: &Path, spec: TokenSpec) -> Result<String, Error> {
    return Ok(truncated(&fingerprint_hex(path)?, spec.stat_len));
}

/// Full 16-char hex fingerprint of the file's modification time.
fn fingerprint_hex(path: &Path) -> Result<String, Error> {
    let modified = std::fs::metadata(path)?.modified()?;
    let (secs, nanos) = match modified.duration_since(UNIX_EPOCH) {
        Err(_) => (0u64, 0u32),
        Ok(d) => (d.as_secs(), d.subsec_nanos()),
    };
    let mut bytes = [0u8; 12];
    bytes
        .iter_mut()
        .zip(secs.to_le_bytes().iter().chain(nanos.to_le_bytes().iter()))
        .for_each(|(dst, src)| *dst = *src);
    return Ok(format!("{:016x}", xxh3_64(&bytes)));
}

/// Per-file sub-token, cached. A cache hit with an unchanged fingerprint
/// returns without re-reading content — a file referenced from many places
/// is hashed once per run.
fn sub_token(path: &Path, spec: TokenSpec, cache: &BustCache) -> Result<String, Error> {
    let fingerprint = fingerprint_hex(path)?;

    if let Some(hit) = cache.entries.get(path) {
        if hit.fingerprint == fingerprint {
            return Ok(hit.sub_token.clone());
        }
    }

    let content = std::fs::read(path)?;
    let digest = spec.algorithm.digest_hex(&content);
    let token = format!(
        "{}{}",
        truncated(&fingerprint, spec.stat_len),
        truncated(&digest, spec.hash_len)
    );
    cache.entries.insert(
        path.to_path_buf(),
        CachedSubToken { fingerprint, sub_token: token.clone() },
    );
    return Ok(token);
}

/// First `len` characters of a hex string.
fn truncated(hex: &str, len: u32) -> String {
    return hex.chars().take(usize::try_from(len).unwrap_or(0)).collect();
}
