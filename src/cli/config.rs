//! Startup configuration, validated once from CLI matches before anything
//! binds a port or opens a connection.

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::fs;

/// S3-compatible storage settings; either all present or uploads disabled.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub dsn: Option<String>,
    pub session_jwks_url: String,
    pub session_issuer: Option<String>,
    pub authorized_parties: Vec<String>,
    /// Contents of the signing key file; `None` disables the token bridge.
    pub signing_key_pem: Option<SecretString>,
    pub signing_key_id: String,
    pub service_id: String,
    pub bridge_audience: String,
    pub email_api_url: String,
    /// `None` logs codes instead of sending email.
    pub email_api_key: Option<SecretString>,
    pub email_sender_name: String,
    pub email_sender_email: String,
    pub email_suffix: String,
    pub storage: Option<StorageConfig>,
}

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .map(String::to_string)
        .ok_or_else(|| anyhow!("missing required argument: --{name}"))
}

fn optional(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).map(String::to_string)
}

impl Config {
    /// # Errors
    ///
    /// Returns an error when a required argument is missing, the signing key
    /// file cannot be read, or the storage settings are only partly present.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let signing_key_pem = match optional(matches, "signing-key") {
            Some(path) => {
                let pem = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read signing key: {path}"))?;
                Some(SecretString::from(pem))
            }
            None => None,
        };

        let authorized_parties = required(matches, "authorized-parties")?
            .split(',')
            .map(str::trim)
            .filter(|party| !party.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
            dsn: optional(matches, "dsn"),
            session_jwks_url: required(matches, "session-jwks-url")?,
            session_issuer: optional(matches, "session-issuer"),
            authorized_parties,
            signing_key_pem,
            signing_key_id: required(matches, "signing-key-id")?,
            service_id: required(matches, "service-id")?,
            bridge_audience: required(matches, "bridge-audience")?,
            email_api_url: required(matches, "email-api-url")?,
            email_api_key: optional(matches, "email-api-key").map(SecretString::from),
            email_sender_name: required(matches, "email-sender-name")?,
            email_sender_email: required(matches, "email-sender-email")?,
            email_suffix: required(matches, "email-suffix")?,
            storage: storage_config(matches)?,
        })
    }
}

/// All-or-nothing: a partial storage configuration is a startup error, not a
/// runtime 503.
fn storage_config(matches: &ArgMatches) -> Result<Option<StorageConfig>> {
    let endpoint = optional(matches, "storage-endpoint");
    let bucket = optional(matches, "storage-bucket");
    let access_key_id = optional(matches, "storage-access-key");
    let secret_access_key = optional(matches, "storage-secret-key");
    let public_base_url = optional(matches, "storage-public-url");

    let provided = [
        &endpoint,
        &bucket,
        &access_key_id,
        &secret_access_key,
        &public_base_url,
    ]
    .iter()
    .filter(|value| value.is_some())
    .count();

    match provided {
        0 => Ok(None),
        5 => Ok(Some(StorageConfig {
            endpoint: endpoint.unwrap_or_default(),
            region: required(matches, "storage-region")?,
            bucket: bucket.unwrap_or_default(),
            access_key_id: access_key_id.unwrap_or_default(),
            secret_access_key: SecretString::from(secret_access_key.unwrap_or_default()),
            public_base_url: public_base_url.unwrap_or_default(),
        })),
        _ => Err(anyhow!(
            "incomplete storage configuration: endpoint, bucket, access key, secret key and public URL must all be set"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    fn matches(extra: &[&str]) -> ArgMatches {
        let mut args = vec![
            "unibridge",
            "--session-jwks-url",
            "https://sessions.example.com/jwks.json",
        ];
        args.extend_from_slice(extra);
        commands::new().get_matches_from(args)
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_matches(&matches(&[])).expect("config");
        assert_eq!(config.port, 8080);
        assert_eq!(config.dsn, None);
        assert_eq!(config.email_suffix, "@lpu.in");
        assert_eq!(config.service_id, "unibridge");
        assert!(config.signing_key_pem.is_none());
        assert!(config.storage.is_none());
        assert_eq!(
            config.authorized_parties,
            vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string()
            ]
        );
    }

    #[test]
    fn authorized_parties_split_and_trimmed() {
        let config = Config::from_matches(&matches(&[
            "--authorized-parties",
            "https://app.example.com, https://admin.example.com ,",
        ]))
        .expect("config");
        assert_eq!(
            config.authorized_parties,
            vec![
                "https://app.example.com".to_string(),
                "https://admin.example.com".to_string()
            ]
        );
    }

    #[test]
    fn partial_storage_is_rejected() {
        let err = Config::from_matches(&matches(&[
            "--storage-endpoint",
            "https://abc.r2.cloudflarestorage.com",
            "--storage-bucket",
            "user-content",
        ]))
        .expect_err("partial storage must fail");
        assert!(err.to_string().contains("incomplete storage configuration"));
    }

    #[test]
    fn full_storage_is_accepted() {
        let config = Config::from_matches(&matches(&[
            "--storage-endpoint",
            "https://abc.r2.cloudflarestorage.com",
            "--storage-bucket",
            "user-content",
            "--storage-access-key",
            "AKIDEXAMPLE",
            "--storage-secret-key",
            "secret",
            "--storage-public-url",
            "https://cdn.example.com",
        ]))
        .expect("config");

        let storage = config.storage.expect("storage");
        assert_eq!(storage.region, "auto");
        assert_eq!(storage.bucket, "user-content");
        assert_eq!(storage.secret_access_key.expose_secret(), "secret");
    }

    #[test]
    fn missing_signing_key_file_is_an_error() {
        let err = Config::from_matches(&matches(&[
            "--signing-key",
            "/nonexistent/key.pem",
        ]))
        .expect_err("unreadable key must fail");
        assert!(err.to_string().contains("Failed to read signing key"));
    }
}
