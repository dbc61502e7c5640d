//! # Unibridge
//!
//! `unibridge` sits between a third-party session-token issuer and a backend
//! identity platform. It exposes four small HTTP flows:
//!
//! 1. **Token bridge:** verify an externally issued RS256 session token
//!    against the issuer's JWKS (constrained to an allow-list of authorized
//!    parties) and mint a locally trusted credential for the same subject.
//! 2. **OTP issuance:** generate a 6-digit code for a university email
//!    address, persist it with a 10-minute expiry, and deliver it by email.
//! 3. **OTP verification:** consume the pending code exactly once and mark
//!    the subject's profile as student-verified.
//! 4. **Upload URLs:** hand out short-lived pre-signed PUT URLs for the
//!    caller's own object-storage namespace.
//!
//! Pending codes live in `PostgreSQL` (one row per subject, see
//! `sql/schema.sql`) or in an in-process map when no DSN is configured.

pub mod api;
pub mod cli;
pub mod email;
pub mod store;
pub mod token;
pub mod uploads;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
