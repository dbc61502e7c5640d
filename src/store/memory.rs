//! In-process store used when no DSN is configured (local development) and
//! by the test suite. A write lock per operation gives the same
//! single-record atomicity the database provides.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{PendingVerification, VerificationStore};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Profile {
    is_student_verified: bool,
    university_email: Option<String>,
}

#[derive(Debug, Default)]
pub struct MemStore {
    pending: RwLock<HashMap<String, PendingVerification>>,
    profiles: RwLock<HashMap<String, Profile>>,
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bare profile, standing in for the external registration
    /// flow that normally creates it.
    pub async fn seed_profile(&self, subject: &str) {
        self.profiles.write().await.insert(
            subject.to_string(),
            Profile {
                is_student_verified: false,
                university_email: None,
            },
        );
    }

    /// Profile state as `(is_student_verified, university_email)`.
    pub async fn profile(&self, subject: &str) -> Option<(bool, Option<String>)> {
        self.profiles
            .read()
            .await
            .get(subject)
            .map(|profile| (profile.is_student_verified, profile.university_email.clone()))
    }
}

#[async_trait]
impl VerificationStore for MemStore {
    async fn put_pending(&self, subject: &str, pending: PendingVerification) -> Result<()> {
        self.pending
            .write()
            .await
            .insert(subject.to_string(), pending);
        Ok(())
    }

    async fn get_pending(&self, subject: &str) -> Result<Option<PendingVerification>> {
        Ok(self.pending.read().await.get(subject).cloned())
    }

    async fn delete_pending(&self, subject: &str) -> Result<Option<PendingVerification>> {
        Ok(self.pending.write().await.remove(subject))
    }

    async fn mark_verified(&self, subject: &str, email: &str) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(subject)
            .ok_or_else(|| anyhow!("no profile exists for subject {subject}"))?;
        profile.is_student_verified = true;
        profile.university_email = Some(email.to_string());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
