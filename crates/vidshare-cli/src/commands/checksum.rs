//! Checksum command implementation.

use anyhow::Result;

use vidshare_core::checksum::{ChecksumPolicy, ChecksumVerifier};

use super::ChecksumArgs;

/// Run the checksum command.
pub async fn run(args: ChecksumArgs) -> Result<()> {
    let digest = ChecksumVerifier::new(ChecksumPolicy::Strict)
        .compute(&args.file)
        .await
        .map_err(super::explain)?;

    println!("{digest}  {}", args.file.display());
    Ok(())
}
