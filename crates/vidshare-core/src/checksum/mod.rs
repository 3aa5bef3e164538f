//! File integrity digests.
//!
//! Checksums are SHA-256 digests rendered as lowercase hex. Hashing streams
//! the file through a fixed buffer so large videos never sit in memory.
//!
//! What happens when a digest cannot be *computed* (as opposed to not
//! matching) is governed by [`ChecksumPolicy`]: `Strict` turns the failure
//! into [`Error::ChecksumUnavailable`], `BestEffort` skips verification and
//! logs a warning.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// How to treat a failure to compute a digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumPolicy {
    /// A digest that cannot be computed is an error
    #[default]
    Strict,
    /// A digest that cannot be computed skips verification
    BestEffort,
}

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The digest matched the expected value
    Matched(String),
    /// No expected digest was provided
    NotRequested,
    /// The digest could not be computed and the policy allowed skipping
    Skipped(String),
}

impl Verification {
    /// Whether the file was positively verified.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// Computes and compares file digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumVerifier {
    policy: ChecksumPolicy,
}

impl ChecksumVerifier {
    /// Create a verifier with the given compute-failure policy.
    #[must_use]
    pub const fn new(policy: ChecksumPolicy) -> Self {
        Self { policy }
    }

    /// The compute-failure policy in effect.
    #[must_use]
    pub const fn policy(&self) -> ChecksumPolicy {
        self.policy
    }

    /// Compute the SHA-256 digest of a file as lowercase hex.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] if the file is missing, or
    /// [`Error::ChecksumUnavailable`] if it cannot be read.
    pub async fn compute(&self, path: &Path) -> Result<String> {
        let mut file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(unavailable(path, &e)),
        };

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

        loop {
            let n = file
                .read(&mut buffer)
                .await
                .map_err(|e| unavailable(path, &e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(to_hex(&hasher.finalize()))
    }

    /// Compute a digest for a file about to be shared.
    ///
    /// Under `BestEffort` a compute failure yields `Ok(None)` so the share
    /// goes out without a checksum.
    ///
    /// # Errors
    ///
    /// Returns the compute error under `Strict`.
    pub async fn digest_for_share(&self, path: &Path) -> Result<Option<String>> {
        match self.compute(path).await {
            Ok(digest) => Ok(Some(digest)),
            Err(Error::ChecksumUnavailable { reason, .. })
                if self.policy == ChecksumPolicy::BestEffort =>
            {
                tracing::warn!(path = %path.display(), %reason, "Sharing without checksum");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Verify a file against an expected digest.
    ///
    /// An absent or empty `expected` is not an error. On mismatch the file
    /// is left in place; callers decide whether to delete it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Integrity`] on mismatch, or the compute error when
    /// the policy is `Strict`.
    pub async fn verify(&self, path: &Path, expected: Option<&str>) -> Result<Verification> {
        let Some(expected) = expected.map(str::trim).filter(|e| !e.is_empty()) else {
            return Ok(Verification::NotRequested);
        };

        let actual = match self.compute(path).await {
            Ok(actual) => actual,
            Err(Error::ChecksumUnavailable { reason, .. })
                if self.policy == ChecksumPolicy::BestEffort =>
            {
                tracing::warn!(path = %path.display(), %reason, "Skipping integrity check");
                return Ok(Verification::Skipped(reason));
            }
            Err(e) => return Err(e),
        };

        if actual.eq_ignore_ascii_case(expected) {
            Ok(Verification::Matched(actual))
        } else {
            Err(Error::Integrity {
                expected: expected.to_ascii_lowercase(),
                actual,
            })
        }
    }
}

/// Render bytes as lowercase hex.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

fn unavailable(path: &Path, err: &std::io::Error) -> Error {
    Error::ChecksumUnavailable {
        path: PathBuf::from(path),
        reason: err.to_string(),
    }
}
