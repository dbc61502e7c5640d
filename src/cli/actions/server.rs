use crate::api::{
    handlers::{token_bridge::BridgeState, upload_url::UploadState, VerificationPolicy},
    serve, AppContext,
};
use crate::cli::{actions::Action, config::Config};
use crate::email::{ApiEmailSender, EmailSender, LogEmailSender};
use crate::store::{MemStore, PgStore, VerificationStore};
use crate::token::{SubjectVerifier, TokenSigner, TokenVerifier};
use crate::uploads::Storage;
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::warn;

/// Wire the configured collaborators together and run the server.
///
/// # Errors
///
/// Returns an error when the database is unreachable, the issuer keyset
/// cannot be fetched, or a configured credential is invalid.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server { config } = action;

    let store = build_store(&config).await?;

    let verifier = Arc::new(build_verifier(&config).await?);
    let subjects: Arc<dyn SubjectVerifier> = verifier.clone();

    let signer = match &config.signing_key_pem {
        Some(pem) => Some(
            TokenSigner::new(
                pem.clone(),
                &config.signing_key_id,
                &config.service_id,
                &config.bridge_audience,
            )
            .context("Invalid bridge signing key")?,
        ),
        None => {
            warn!("No signing key configured, token bridge will answer 500");
            None
        }
    };

    let mailer: Arc<dyn EmailSender> = match &config.email_api_key {
        Some(api_key) => Arc::new(ApiEmailSender::new(
            &config.email_api_url,
            api_key.clone(),
            &config.email_sender_name,
            &config.email_sender_email,
        )?),
        None => {
            warn!("No email API key configured, verification codes will be logged");
            Arc::new(LogEmailSender)
        }
    };

    let storage = match &config.storage {
        Some(settings) => Some(Arc::new(Storage::new(
            &settings.endpoint,
            &settings.region,
            &settings.bucket,
            &settings.access_key_id,
            settings.secret_access_key.clone(),
            &settings.public_base_url,
        )?)),
        None => {
            warn!("No object storage configured, uploads will answer 503");
            None
        }
    };

    let ctx = AppContext {
        store,
        subjects,
        bridge: Arc::new(BridgeState { verifier, signer }),
        mailer,
        policy: Arc::new(VerificationPolicy::new(config.email_suffix.clone())),
        uploads: UploadState { storage },
    };

    serve(config.port, ctx).await
}

async fn build_store(config: &Config) -> Result<Arc<dyn VerificationStore>> {
    match &config.dsn {
        Some(dsn) => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(dsn)
                .await
                .context("Failed to connect to database")?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            warn!("No DSN configured, using the in-process store");
            Ok(Arc::new(MemStore::new()))
        }
    }
}

async fn build_verifier(config: &Config) -> Result<TokenVerifier> {
    let mut verifier = TokenVerifier::from_remote(&config.session_jwks_url)
        .await
        .context("Failed to fetch the session issuer keyset")?
        .with_authorized_parties(config.authorized_parties.clone());

    if let Some(issuer) = &config.session_issuer {
        verifier = verifier.with_issuer(issuer.clone());
    }

    Ok(verifier)
}
