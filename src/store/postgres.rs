//! `PostgreSQL` store, `sql/schema.sql` holds the schema.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument};

use super::{PendingVerification, VerificationStore};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationStore for PgStore {
    async fn put_pending(&self, subject: &str, pending: PendingVerification) -> Result<()> {
        // Single-statement upsert: replaces any prior record atomically.
        let query = r"
            INSERT INTO pending_verifications (subject, email, code, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (subject) DO UPDATE
            SET email = EXCLUDED.email,
                code = EXCLUDED.code,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(subject)
            .bind(&pending.email)
            .bind(&pending.code)
            .bind(pending.created_at)
            .bind(pending.expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to upsert pending verification")?;

        Ok(())
    }

    async fn get_pending(&self, subject: &str) -> Result<Option<PendingVerification>> {
        let query = r"
            SELECT email, code, created_at, expires_at
            FROM pending_verifications
            WHERE subject = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(subject)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to load pending verification")?;

        Ok(row.map(|row| PendingVerification {
            email: row.get("email"),
            code: row.get("code"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
            expires_at: row.get::<DateTime<Utc>, _>("expires_at"),
        }))
    }

    async fn delete_pending(&self, subject: &str) -> Result<Option<PendingVerification>> {
        // RETURNING makes read-and-delete one statement; only one of two
        // concurrent consumers gets the row back.
        let query = r"
            DELETE FROM pending_verifications
            WHERE subject = $1
            RETURNING email, code, created_at, expires_at
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(subject)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete pending verification")?;

        Ok(row.map(|row| PendingVerification {
            email: row.get("email"),
            code: row.get("code"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
            expires_at: row.get::<DateTime<Utc>, _>("expires_at"),
        }))
    }

    async fn mark_verified(&self, subject: &str, email: &str) -> Result<()> {
        let query = r"
            UPDATE users
            SET is_student_verified = TRUE,
                university_email = $2,
                updated_at = NOW()
            WHERE subject = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(subject)
            .bind(email)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update user profile")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("no profile exists for subject {subject}"));
        }

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database ping failed")?;
        Ok(())
    }
}
