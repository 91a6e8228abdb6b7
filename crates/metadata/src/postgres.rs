//! PostgreSQL-based metadata store implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::*;
use crate::repos::{ArtifactRepo, ReportRepo};
use crate::store::{MetadataStore, next_submission_micros};
use async_trait::async_trait;
use sleuth_core::config::PgSslMode;
use sleuth_core::timestamp;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-based metadata store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters,
    /// so the password can come from the environment.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }
        if let Some(pass) = password {
            opts = opts.password(pass);
        }
        if let Some(mode) = ssl_mode {
            opts = opts.ssl_mode(match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            });
        }

        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{timeout_ms}ms"))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // Prepared statements cannot hold several commands.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactRepo for PostgresStore {
    async fn create_artifact(
        &self,
        artifact: &NewArtifact,
        now: OffsetDateTime,
    ) -> MetadataResult<ArtifactRow> {
        let mut tx = self.pool.begin().await?;

        // Serialize concurrent ingests so ids and submission times are
        // assigned in the same order. The lock mode conflicts with itself
        // but not with readers.
        sqlx::query("LOCK TABLE artifacts IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let newest: Option<i64> = sqlx::query_scalar("SELECT MAX(submitted_at_us) FROM artifacts")
            .fetch_one(&mut *tx)
            .await?;
        let submitted_at_us = next_submission_micros(now, newest);

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO artifacts (
                student_id, assignment_id, submitted_at_us, storage_key, file_name, hash
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&artifact.student_id)
        .bind(&artifact.assignment_id)
        .bind(submitted_at_us)
        .bind(&artifact.storage_key)
        .bind(&artifact.file_name)
        .bind(artifact.hash.to_hex())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| MetadataError::from_insert(e, format!("storage_key {}", artifact.storage_key)))?;

        tx.commit().await?;

        Ok(ArtifactRow {
            id,
            student_id: artifact.student_id.clone(),
            assignment_id: artifact.assignment_id.clone(),
            submitted_at_us,
            storage_key: artifact.storage_key.clone(),
            file_name: artifact.file_name.clone(),
            hash: artifact.hash.to_hex(),
        })
    }

    async fn get_artifact(&self, id: i64) -> MetadataResult<Option<ArtifactRow>> {
        let row = sqlx::query_as::<_, ArtifactRow>("SELECT * FROM artifacts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_fingerprints_before(
        &self,
        cutoff_us: Option<i64>,
    ) -> MetadataResult<Vec<FingerprintRow>> {
        let rows = sqlx::query_as::<_, FingerprintRow>(
            r#"
            SELECT id, hash FROM artifacts
            WHERE $1::BIGINT IS NULL OR submitted_at_us < $1
            ORDER BY id
            "#,
        )
        .bind(cutoff_us)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_artifacts(&self) -> MetadataResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artifacts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl ReportRepo for PostgresStore {
    async fn create_report(&self, report: &NewReport) -> MetadataResult<ReportRow> {
        let created_at_us = timestamp::to_unix_micros(report.created_at);
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reports (work_id, plagiarism, matched_work_id, created_at_us)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(report.work_id)
        .bind(report.plagiarism)
        .bind(report.matched_work_id)
        .bind(created_at_us)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MetadataError::from_insert(e, format!("report for work {}", report.work_id)))?;

        Ok(ReportRow {
            id,
            work_id: report.work_id,
            plagiarism: report.plagiarism,
            matched_work_id: report.matched_work_id,
            created_at_us,
        })
    }

    async fn get_report_by_work(&self, work_id: i64) -> MetadataResult<Option<ReportRow>> {
        let row = sqlx::query_as::<_, ReportRow>("SELECT * FROM reports WHERE work_id = $1")
            .bind(work_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_reported_work_ids(&self) -> MetadataResult<Vec<i64>> {
        let ids = sqlx::query_scalar("SELECT work_id FROM reports ORDER BY work_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
