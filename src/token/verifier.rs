//! Claim validation and cached keyset fetching.
//!
//! A [`TokenVerifier`] pairs a JWKS source (static, or fetched from the trust
//! domain's verification endpoint and cached) with the claim checks a given
//! deployment needs: expiry always, issuer/audience when configured, and an
//! authorized-parties allow-list for the inbound session tokens.

use chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::jwt::{sign_rs256, verify_rs256, BridgeClaims, SessionClaims};
use super::{Error, Jwks};
use crate::APP_USER_AGENT;

// Remote keysets are cached in memory; a stale cache or an unknown kid
// triggers a refresh, throttled so a flood of bad tokens cannot hammer the
// verification endpoint. On refresh failure the last known keyset stays in
// use.
const KEYSET_CACHE_TTL_SECONDS: u64 = 300;
const KEYSET_REFRESH_COOLDOWN_SECONDS: u64 = 30;

/// Lifetime of minted bridge credentials.
const BRIDGE_TOKEN_TTL_SECONDS: i64 = 3600;

#[derive(Debug)]
enum KeysetSource {
    /// Keyset supplied at construction and never refreshed.
    Static,
    /// Keyset fetched from the trust domain's JWKS endpoint.
    Remote { url: String, client: Client },
}

#[derive(Debug, Clone)]
struct KeysetCache {
    keyset: Jwks,
    fetched_at: Instant,
}

impl KeysetCache {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < Duration::from_secs(KEYSET_CACHE_TTL_SECONDS)
    }
}

/// Verifies RS256 tokens from one trust domain.
#[derive(Debug)]
pub struct TokenVerifier {
    source: KeysetSource,
    cache: RwLock<KeysetCache>,
    issuer: Option<String>,
    audience: Option<String>,
    authorized_parties: Option<Vec<String>>,
    last_refresh_unix: AtomicU64,
}

impl TokenVerifier {
    /// Build from a static keyset, no remote refresh.
    #[must_use]
    pub fn from_keyset(keyset: Jwks) -> Self {
        Self {
            source: KeysetSource::Static,
            cache: RwLock::new(KeysetCache {
                keyset,
                fetched_at: Instant::now(),
            }),
            issuer: None,
            audience: None,
            authorized_parties: None,
            last_refresh_unix: AtomicU64::new(0),
        }
    }

    /// Build a verifier that fetches its keyset from a JWKS URL.
    ///
    /// The initial fetch happens here so a misconfigured endpoint fails at
    /// startup instead of on the first request.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the keyset
    /// cannot be fetched or parsed.
    pub async fn from_remote(url: impl Into<String>) -> Result<Self, Error> {
        let url = url.into();
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .map_err(|err| Error::KeysetFetch(err.to_string()))?;
        let keyset = fetch_keyset(&client, &url).await?;

        Ok(Self {
            source: KeysetSource::Remote { url, client },
            cache: RwLock::new(KeysetCache {
                keyset,
                fetched_at: Instant::now(),
            }),
            issuer: None,
            audience: None,
            authorized_parties: None,
            last_refresh_unix: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Restrict accepted tokens to the given authorized parties (`azp`).
    #[must_use]
    pub fn with_authorized_parties(mut self, parties: Vec<String>) -> Self {
        self.authorized_parties = Some(parties);
        self
    }

    /// Verify a token's signature and claims against the current clock.
    ///
    /// # Errors
    ///
    /// Returns an error for any structural, cryptographic, or claim failure.
    pub async fn verify(&self, token: &str) -> Result<SessionClaims, Error> {
        self.verify_at(token, Utc::now().timestamp()).await
    }

    /// Same as [`Self::verify`] with an explicit clock, for tests.
    ///
    /// # Errors
    ///
    /// See [`Self::verify`].
    pub async fn verify_at(&self, token: &str, now_unix: i64) -> Result<SessionClaims, Error> {
        let claims = self.verify_signature(token).await?;
        self.check_claims(&claims, now_unix)?;
        Ok(claims)
    }

    async fn verify_signature(&self, token: &str) -> Result<SessionClaims, Error> {
        self.refresh_if_stale().await;

        let keyset = self.cache.read().await.keyset.clone();
        match verify_rs256::<SessionClaims>(token, &keyset) {
            Err(Error::UnknownKid(kid)) => {
                // Key rotation at the issuer: refresh once and retry.
                if !self.try_refresh().await {
                    return Err(Error::UnknownKid(kid));
                }
                let keyset = self.cache.read().await.keyset.clone();
                verify_rs256::<SessionClaims>(token, &keyset)
            }
            result => result,
        }
    }

    fn check_claims(&self, claims: &SessionClaims, now_unix: i64) -> Result<(), Error> {
        if claims.exp <= now_unix {
            return Err(Error::Expired);
        }
        if claims.nbf.is_some_and(|nbf| nbf > now_unix) {
            return Err(Error::NotYetValid);
        }
        if let Some(expected) = &self.issuer {
            if claims.iss.as_deref() != Some(expected.as_str()) {
                return Err(Error::InvalidIssuer);
            }
        }
        if let Some(expected) = &self.audience {
            if claims.aud.as_deref() != Some(expected.as_str()) {
                return Err(Error::InvalidAudience);
            }
        }
        if let Some(parties) = &self.authorized_parties {
            let azp = claims.azp.as_deref().unwrap_or("");
            if !parties.iter().any(|party| party == azp) {
                return Err(Error::UnauthorizedParty(azp.to_string()));
            }
        }
        Ok(())
    }

    async fn refresh_if_stale(&self) {
        let fresh = self.cache.read().await.is_fresh();
        if !fresh {
            self.try_refresh().await;
        }
    }

    /// Refresh the remote keyset, throttled by a cooldown. Returns whether a
    /// refresh happened.
    async fn try_refresh(&self) -> bool {
        let KeysetSource::Remote { url, client } = &self.source else {
            return false;
        };

        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let last = self.last_refresh_unix.load(Ordering::Relaxed);
        if now.saturating_sub(last) < KEYSET_REFRESH_COOLDOWN_SECONDS {
            return false;
        }
        self.last_refresh_unix.store(now, Ordering::Relaxed);

        match fetch_keyset(client, url).await {
            Ok(keyset) => {
                let mut cache = self.cache.write().await;
                cache.keyset = keyset;
                cache.fetched_at = Instant::now();
                true
            }
            Err(err) => {
                // Keep serving the last known keyset.
                warn!("keyset refresh failed: {err}");
                false
            }
        }
    }
}

async fn fetch_keyset(client: &Client, url: &str) -> Result<Jwks, Error> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| Error::KeysetFetch(err.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::KeysetFetch(format!(
            "{url} returned {}",
            response.status()
        )));
    }

    response
        .json::<Jwks>()
        .await
        .map_err(|err| Error::KeysetFetch(err.to_string()))
}

/// Bearer-credential introspection: given the raw token from an
/// `Authorization: Bearer` header, return the subject id or nothing.
#[async_trait::async_trait]
pub trait SubjectVerifier: Send + Sync {
    async fn subject_for(&self, token: &str) -> Option<String>;
}

#[async_trait::async_trait]
impl SubjectVerifier for TokenVerifier {
    async fn subject_for(&self, token: &str) -> Option<String> {
        match self.verify(token).await {
            Ok(claims) => claims.sub,
            Err(err) => {
                debug!("bearer credential rejected: {err}");
                None
            }
        }
    }
}

/// Fixed-subject introspection for tests and local tooling.
#[derive(Debug, Clone)]
pub struct StaticSubject(pub String);

#[async_trait::async_trait]
impl SubjectVerifier for StaticSubject {
    async fn subject_for(&self, _token: &str) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Mints RS256 bridge credentials for verified subjects.
#[derive(Debug)]
pub struct TokenSigner {
    private_key_pem: SecretString,
    kid: String,
    service_id: String,
    audience: String,
}

impl TokenSigner {
    /// Build a signer, validating the private key once up front.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not a parseable RSA private key.
    pub fn new(
        private_key_pem: SecretString,
        kid: impl Into<String>,
        service_id: impl Into<String>,
        audience: impl Into<String>,
    ) -> Result<Self, Error> {
        super::jwt::decode_private_key(private_key_pem.expose_secret().as_bytes())?;
        Ok(Self {
            private_key_pem,
            kid: kid.into(),
            service_id: service_id.into(),
            audience: audience.into(),
        })
    }

    /// Mint a credential carrying `subject` in the target trust domain.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn mint(&self, subject: &str) -> Result<String, Error> {
        let now = Utc::now().timestamp();
        let claims = BridgeClaims {
            iss: self.service_id.clone(),
            sub: self.service_id.clone(),
            aud: self.audience.clone(),
            uid: subject.to_string(),
            iat: now,
            exp: now + BRIDGE_TOKEN_TTL_SECONDS,
        };
        sign_rs256(
            self.private_key_pem.expose_secret().as_bytes(),
            self.kid.clone(),
            &claims,
        )
    }
}
