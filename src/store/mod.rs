//! Persistence for pending verifications and profile updates.
//!
//! One pending record per subject; issuing a new code replaces any prior
//! record, and verification consumes the record exactly once (on success or
//! on expiry detection). The profile update is a separate write: a crash
//! between consume and update leaves the code spent and the profile
//! unverified, which is accepted.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

mod memory;
mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

/// A code waiting to be verified, keyed externally by subject id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingVerification {
    /// Build a record expiring `ttl` after `now`.
    #[must_use]
    pub fn issue(email: impl Into<String>, code: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            email: email.into(),
            code: code.into(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Storage seam shared by the OTP issuer and verifier.
///
/// Implementations must make each operation atomic at the single-record
/// level; no cross-record transactions are required.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Insert or replace the pending record for `subject`.
    async fn put_pending(&self, subject: &str, pending: PendingVerification) -> Result<()>;

    /// Read the pending record for `subject`, if any.
    async fn get_pending(&self, subject: &str) -> Result<Option<PendingVerification>>;

    /// Delete the pending record for `subject`, returning it.
    ///
    /// Deletion and read are one atomic step; `None` means another caller
    /// already consumed the record.
    async fn delete_pending(&self, subject: &str) -> Result<Option<PendingVerification>>;

    /// Mark the subject's pre-existing profile as student-verified.
    ///
    /// Fails if no profile exists; this service never creates profiles.
    async fn mark_verified(&self, subject: &str, email: &str) -> Result<()>;

    /// Cheap connectivity probe for the health endpoint.
    async fn ping(&self) -> Result<()>;
}
