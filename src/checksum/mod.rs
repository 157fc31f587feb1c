//! Digest calculation for downloaded artifacts and parsing of the detached
//! checksum files repositories publish next to them.
mod md5;
mod sha;
pub mod verifier;

use std::{
    fmt::Display,
    io::{Error, ErrorKind},
    path::PathBuf,
};

use log::debug;
use tokio::io::AsyncReadExt;

use crate::transport::TransportError;

pub use verifier::{ChecksumVerifier, DigestStrategy, LocalDigest, SkipDigest};

/// The delimiter used to separate the checksum algorithm and the digest.
const CHECKSUM_DELIMITER: &str = ";";

/// The default chunk size used to read files.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Known errors for checksum operations.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// Represents errors that occur during IO operations
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    /// Occurs when a published checksum file does not start with a digest
    #[error("Malformed checksum file {path}, expected a {algorithm} hex digest")]
    MalformedChecksumFile {
        path: String,
        algorithm: ChecksumAlgorithm,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug)]
pub struct ChecksumOptions {
    /// The path to the file to process.
    pub filepath: PathBuf,

    /// The checksum algorithm to use.
    pub algorithm: ChecksumAlgorithm,

    /// Size of chunks to read at once, defaults to DEFAULT_CHUNK_SIZE.
    pub chunk_size: Option<usize>,
}

/// The digests Maven-layout repositories publish alongside artifacts.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Hash,
    PartialEq,
    Eq,
    strum_macros::Display,
    clap::ValueEnum,
    serde::Serialize,
    serde::Deserialize,
)]
#[cfg_attr(test, derive(strum_macros::EnumIter))]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5 (Message-Digest Algorithm 5), the digest every Maven repository publishes.
    #[default]
    MD5,
    /// SHA-1 (Secure Hash Algorithm 1), producing a 160-bit hash value.
    SHA1,
    /// SHA-256, part of the SHA-2 family, producing a 256-bit hash value.
    SHA256,
    /// SHA-512, part of the SHA-2 family, producing a 512-bit hash value.
    SHA512,
}

impl ChecksumAlgorithm {
    /// The suffix of the published checksum file, e.g. `md5` for `artifact.jar.md5`.
    pub fn extension(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::MD5 => "md5",
            ChecksumAlgorithm::SHA1 => "sha1",
            ChecksumAlgorithm::SHA256 => "sha256",
            ChecksumAlgorithm::SHA512 => "sha512",
        }
    }

    /// Length of the hex-encoded digest.
    pub fn hex_len(&self) -> usize {
        match self {
            ChecksumAlgorithm::MD5 => 32,
            ChecksumAlgorithm::SHA1 => 40,
            ChecksumAlgorithm::SHA256 => 64,
            ChecksumAlgorithm::SHA512 => 128,
        }
    }

    /// Calculates the checksum of a file using the current algorithm.
    pub async fn checksum_file(&self, options: &ChecksumOptions) -> Result<Vec<u8>, ChecksumError> {
        checksum_file(options).await.map_err(ChecksumError::IoError)
    }
}

/// Defines a checksum, which is a pair of an algorithm and a digest.
#[derive(Debug, Hash, PartialEq, Eq, Clone)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    /// Lowercase hex digest.
    pub digest: String,
}

impl Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.algorithm, CHECKSUM_DELIMITER, self.digest)
    }
}

impl Checksum {
    /// Parses the contents of a published checksum file.
    ///
    /// Repositories write either the bare digest or `<digest>  <filename>`,
    /// so only the first whitespace-delimited token is read. Hex case is
    /// ignored. Returns `None` when that token is not a digest of the
    /// expected length.
    pub fn from_published(algorithm: ChecksumAlgorithm, contents: &str) -> Option<Self> {
        let token = contents.split_whitespace().next()?;
        if token.len() != algorithm.hex_len() || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        Some(Checksum {
            algorithm,
            digest: token.to_ascii_lowercase(),
        })
    }

    /// Calculates the checksum of a file using the specified algorithm.
    pub async fn from_file(options: ChecksumOptions) -> Result<Self, ChecksumError> {
        let digest = options.algorithm.checksum_file(&options).await?;

        Ok(Checksum {
            algorithm: options.algorithm,
            digest: hex::encode(digest),
        })
    }
}

/// Calculates the checksum of a file using the specified algorithm.
pub async fn checksum_file(options: &ChecksumOptions) -> Result<Vec<u8>, Error> {
    debug!("{:?}", options);
    match options.algorithm {
        ChecksumAlgorithm::MD5 => md5::calculate_md5(options).await,
        ChecksumAlgorithm::SHA1 => sha::calculate_sha1(options).await,
        ChecksumAlgorithm::SHA256 => sha::calculate_sha256(options).await,
        ChecksumAlgorithm::SHA512 => sha::calculate_sha512(options).await,
    }
}

/// Feeds the file at `options.filepath` to `process_chunk` in chunks.
async fn process_file<F>(options: &ChecksumOptions, mut process_chunk: F) -> Result<u64, Error>
where
    F: FnMut(&[u8]),
{
    let filepath = &options.filepath;
    if !filepath.is_file() {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("File not found: {}", filepath.display()),
        ));
    }

    let mut file = tokio::fs::File::open(filepath).await?;
    let chunk_size = options.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1);
    let mut buffer = vec![0; chunk_size];
    let mut total_read = 0;

    loop {
        let bytes_read = file.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }

        process_chunk(&buffer[..bytes_read]);
        total_read += bytes_read as u64;
    }

    Ok(total_read)
}
