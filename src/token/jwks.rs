//! JWKS handling for the issuer and target trust domains.

use base64ct::{Base64UrlUnpadded, Encoding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};

use super::jwt::decode_private_key;
use super::Error;

/// A JSON Web Key Set as served by an identity provider's verification
/// endpoint (e.g. `/.well-known/jwks.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Parse a JWKS from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is not valid JSON or doesn't match the
    /// expected JWKS shape.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Find a key by `kid` (Key ID).
    #[must_use]
    pub fn find_by_kid(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Build a single-key JWKS from an RSA private key (PEM or DER).
    ///
    /// The public key is derived from the private key. Used by tests and by
    /// deployments that pin a static verification key instead of fetching one.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be parsed.
    pub fn from_rsa_private_key_pem_or_der(
        private_key_pem_or_der: &[u8],
        kid: impl Into<String>,
    ) -> Result<Self, Error> {
        let private_key = decode_private_key(private_key_pem_or_der)?;
        let public_key = RsaPublicKey::from(&private_key);
        let jwk = Jwk::from_rsa_public_key(&public_key, kid);
        Ok(Self { keys: vec![jwk] })
    }
}

/// A single RSA JSON Web Key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    pub kid: String,
    pub n: String,
    pub e: String,
}

impl Jwk {
    #[must_use]
    pub fn from_rsa_public_key(public_key: &RsaPublicKey, kid: impl Into<String>) -> Self {
        Self {
            kty: "RSA".to_string(),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            kid: kid.into(),
            n: Base64UrlUnpadded::encode_string(&public_key.n().to_bytes_be()),
            e: Base64UrlUnpadded::encode_string(&public_key.e().to_bytes_be()),
        }
    }

    /// Reconstruct the RSA public key from the JWK's `n`/`e` members.
    ///
    /// # Errors
    ///
    /// Returns an error if the key type is not RSA, the members are not valid
    /// base64url, or the modulus/exponent are rejected by the RSA crate.
    pub fn to_rsa_public_key(&self) -> Result<RsaPublicKey, Error> {
        if self.kty != "RSA" {
            return Err(Error::KeyParse);
        }
        let n = Base64UrlUnpadded::decode_vec(&self.n).map_err(|_| Error::Base64)?;
        let e = Base64UrlUnpadded::decode_vec(&self.e).map_err(|_| Error::Base64)?;
        Ok(RsaPublicKey::new(
            BigUint::from_bytes_be(&n),
            BigUint::from_bytes_be(&e),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::jwt::tests::TEST_PRIVATE_KEY_PEM;

    #[test]
    fn roundtrip_via_json() -> Result<(), Error> {
        let jwks = Jwks::from_rsa_private_key_pem_or_der(TEST_PRIVATE_KEY_PEM.as_bytes(), "k1")?;
        let json = serde_json::to_string(&jwks)?;
        let parsed = Jwks::from_json(&json)?;
        assert_eq!(jwks, parsed);
        Ok(())
    }

    #[test]
    fn find_by_kid_matches_exactly() -> Result<(), Error> {
        let jwks = Jwks::from_rsa_private_key_pem_or_der(TEST_PRIVATE_KEY_PEM.as_bytes(), "k1")?;
        assert!(jwks.find_by_kid("k1").is_some());
        assert!(jwks.find_by_kid("k2").is_none());
        Ok(())
    }

    #[test]
    fn public_key_reconstructs_from_members() -> Result<(), Error> {
        let jwks = Jwks::from_rsa_private_key_pem_or_der(TEST_PRIVATE_KEY_PEM.as_bytes(), "k1")?;
        let jwk = jwks.find_by_kid("k1").ok_or(Error::KeyParse)?;
        let key = jwk.to_rsa_public_key()?;
        assert_eq!(key.e(), &BigUint::from(65537u32));
        Ok(())
    }

    #[test]
    fn non_rsa_key_is_rejected() {
        let jwk = Jwk {
            kty: "EC".to_string(),
            alg: None,
            key_use: None,
            kid: "k1".to_string(),
            n: String::new(),
            e: String::new(),
        };
        assert!(matches!(jwk.to_rsa_public_key(), Err(Error::KeyParse)));
    }
}
