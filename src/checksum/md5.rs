use std::io::Error;

use super::{process_file, ChecksumOptions};

/// Calculates the MD5 checksum of a file.
pub async fn calculate_md5(options: &ChecksumOptions) -> Result<Vec<u8>, Error> {
    let mut context = md5::Context::new();
    process_file(options, |chunk| context.consume(chunk)).await?;

    Ok(context.compute().0.to_vec())
}
