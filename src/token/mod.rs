//! RS256 token plumbing for both trust domains.
//!
//! - [`jwt`]: compact JWT signing/verification (PKCS#1 v1.5, SHA-256).
//! - [`jwks`]: JWKS parsing and RSA key material handling.
//! - [`verifier`]: cached keyset fetching plus claim checks (expiry, issuer,
//!   audience, authorized parties) and the bearer-introspection seam used by
//!   the authenticated handlers.

mod error;
pub mod jwks;
pub mod jwt;
pub mod verifier;

pub use error::Error;
pub use jwks::{Jwk, Jwks};
pub use jwt::{sign_rs256, verify_rs256, BridgeClaims, SessionClaims};
pub use verifier::{StaticSubject, SubjectVerifier, TokenSigner, TokenVerifier};
