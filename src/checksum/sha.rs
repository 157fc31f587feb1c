use std::io::Error;

use sha2::Digest;

use super::{process_file, ChecksumOptions};

async fn calculate<D: Digest>(options: &ChecksumOptions) -> Result<Vec<u8>, Error> {
    let mut hasher = D::new();
    process_file(options, |chunk| hasher.update(chunk)).await?;

    Ok(hasher.finalize().to_vec())
}

/// Calculates the SHA1 checksum of a file.
pub async fn calculate_sha1(options: &ChecksumOptions) -> Result<Vec<u8>, Error> {
    calculate::<sha1::Sha1>(options).await
}

/// Calculates the SHA256 checksum of a file.
pub async fn calculate_sha256(options: &ChecksumOptions) -> Result<Vec<u8>, Error> {
    calculate::<sha2::Sha256>(options).await
}

/// Calculates the SHA512 checksum of a file.
pub async fn calculate_sha512(options: &ChecksumOptions) -> Result<Vec<u8>, Error> {
    calculate::<sha2::Sha512>(options).await
}
