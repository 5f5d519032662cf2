//! Template digests for run reports.
//!
//! The digest identifies exactly which template revision a run submitted,
//! so two reports can be compared without keeping the template around.

use sha2::{Digest, Sha256};

/// Hasher for template bodies.
#[derive(Debug, Default)]
pub struct TemplateHasher;

impl TemplateHasher {
    /// Creates a new template hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the hex-encoded SHA-256 digest of a template body.
    #[must_use]
    pub fn digest(&self, body: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(body.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Computes a short digest (first 12 characters) for display purposes.
    #[must_use]
    pub fn short_digest(&self, digest: &str) -> String {
        digest.chars().take(12).collect()
    }
}
