//! Artifact content hashing.
//!
//! Content is streamed through the digest in fixed-size chunks. With line
//! ending normalization on, CRLF and lone CR become LF before hashing, so a
//! file checked out on Windows hashes like its Unix twin.

use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

use chainwitness_model::{Artifact, HashAlgorithm};

const CHUNK_SIZE: usize = 8192;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to read {label}: {source}")]
    Io {
        label: String,
        #[source]
        source: io::Error,
    },
}

/// Hex SHA-256 of everything `reader` yields.
///
/// `label` only names the stream in errors.
pub fn create_hash<R: Read>(reader: R, label: &str, normalize_line_endings: bool) -> Result<String, HashError> {
    create_hash_with(HashAlgorithm::Sha256, reader, label, normalize_line_endings)
}

pub fn create_hash_with<R: Read>(
    algorithm: HashAlgorithm,
    reader: R,
    label: &str,
    normalize_line_endings: bool,
) -> Result<String, HashError> {
    match algorithm {
        HashAlgorithm::Sha256 => digest_stream::<Sha256, R>(reader, label, normalize_line_endings),
        HashAlgorithm::Sha384 => digest_stream::<Sha384, R>(reader, label, normalize_line_endings),
        HashAlgorithm::Sha512 => digest_stream::<Sha512, R>(reader, label, normalize_line_endings),
    }
}

/// Hash a file from disk.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm, normalize_line_endings: bool) -> Result<String, HashError> {
    let label = path.display().to_string();
    let file = File::open(path).map_err(|source| HashError::Io {
        label: label.clone(),
        source,
    })?;
    create_hash_with(algorithm, file, &label, normalize_line_endings)
}

/// Build an artifact for a file, using `uri` as its recorded path.
pub fn artifact_for_file(
    uri: &str,
    path: &Path,
    algorithm: HashAlgorithm,
    normalize_line_endings: bool,
) -> Result<Artifact, HashError> {
    Ok(Artifact::new(uri, hash_file(path, algorithm, normalize_line_endings)?))
}

fn digest_stream<D: Digest, R: Read>(mut reader: R, label: &str, normalize: bool) -> Result<String, HashError> {
    let mut hasher = D::new();
    let mut buf = [0u8; CHUNK_SIZE];
    let mut normalizer = LineEndingNormalizer::default();
    let mut out = Vec::with_capacity(CHUNK_SIZE);

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(HashError::Io {
                    label: label.to_string(),
                    source,
                })
            }
        };
        if normalize {
            out.clear();
            normalizer.push(&buf[..n], &mut out);
            hasher.update(&out);
        } else {
            hasher.update(&buf[..n]);
        }
    }

    if normalize {
        out.clear();
        normalizer.finish(&mut out);
        hasher.update(&out);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// CRLF/CR to LF across chunk boundaries.
#[derive(Debug, Default)]
struct LineEndingNormalizer {
    pending_cr: bool,
}

impl LineEndingNormalizer {
    fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        for &b in chunk {
            if self.pending_cr {
                self.pending_cr = false;
                out.push(b'\n');
                if b == b'\n' {
                    continue;
                }
            }
            if b == b'\r' {
                self.pending_cr = true;
            } else {
                out.push(b);
            }
        }
    }

    fn finish(&mut self, out: &mut Vec<u8>) {
        if std::mem::take(&mut self.pending_cr) {
            out.push(b'\n');
        }
    }
}
