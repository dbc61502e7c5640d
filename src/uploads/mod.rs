//! Pre-signed upload URLs for the caller's object-storage namespace.
//!
//! The handler is a thin policy layer: normalize the requested path, pin it
//! inside `users/<subject>/`, cap profile image indexes, then let
//! [`presign::Storage`] produce a short-lived SigV4 PUT URL and the matching
//! public read URL.

pub mod presign;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub use presign::Storage;

/// Why a requested upload path was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathPolicyError {
    #[error("missing path")]
    Empty,
    #[error("path must start with users/<your-id>/")]
    OutsideNamespace,
    #[error("profile index must be 0-4")]
    ProfileIndex,
}

/// Normalize a requested path into an object key and enforce the namespace
/// policy for `subject`.
///
/// Leading slashes are stripped; the key must live under `users/<subject>/`,
/// and profile images (`users/<id>/profile/<n>.webp`) are limited to indexes
/// 0 through 4.
///
/// # Errors
///
/// Returns a [`PathPolicyError`] describing the first rule the path broke.
pub fn object_key(raw_path: &str, subject: &str) -> Result<String, PathPolicyError> {
    let trimmed = raw_path.trim();
    if trimmed.is_empty() {
        return Err(PathPolicyError::Empty);
    }

    let key = trimmed.trim_start_matches('/');
    let prefix = format!("users/{subject}/");
    if !key.starts_with(&prefix) {
        return Err(PathPolicyError::OutsideNamespace);
    }

    static PROFILE_KEY: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^users/[^/]+/profile/(\d+)\.webp$").expect("profile key pattern")
    });
    if let Some(caps) = PROFILE_KEY.captures(key) {
        let index: u32 = caps[1].parse().map_err(|_| PathPolicyError::ProfileIndex)?;
        if index > 4 {
            return Err(PathPolicyError::ProfileIndex);
        }
    }

    Ok(key.to_string())
}
