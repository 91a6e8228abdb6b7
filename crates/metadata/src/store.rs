//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{ArtifactRepo, ReportRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: ArtifactRepo + ReportRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    slow_query: Duration,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and apply the schema.
    pub async fn new(
        path: impl AsRef<Path>,
        query_timeout_secs: Option<u64>,
    ) -> MetadataResult<Self> {
        let path = path.as_ref();
        let slow_query = Duration::from_secs(query_timeout_secs.unwrap_or(30));

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // One connection: writers are serialized, which the monotonic
        // timestamp assignment in create_artifact relies on.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool, slow_query };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "opened SQLite metadata store");
        Ok(store)
    }

    /// Run `fut`, warning when it exceeds the configured query threshold.
    /// SQLite cannot cancel a running statement, so this only observes.
    async fn timed<T>(&self, op: &'static str, fut: impl Future<Output = T>) -> T {
        let started = Instant::now();
        let out = fut.await;
        let elapsed = started.elapsed();
        if elapsed > self.slow_query {
            tracing::warn!(op, elapsed_ms = elapsed.as_millis() as u64, "slow SQLite query");
        }
        out
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use sleuth_core::timestamp;
    use time::OffsetDateTime;

    #[async_trait]
    impl ArtifactRepo for SqliteStore {
        async fn create_artifact(
            &self,
            artifact: &NewArtifact,
            now: OffsetDateTime,
        ) -> MetadataResult<ArtifactRow> {
            self.timed("create_artifact", async {
                let mut tx = self.pool.begin().await?;

                let newest: Option<i64> =
                    sqlx::query_scalar("SELECT MAX(submitted_at_us) FROM artifacts")
                        .fetch_one(&mut *tx)
                        .await?;
                let submitted_at_us = next_submission_micros(now, newest);

                let id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO artifacts (
                        student_id, assignment_id, submitted_at_us, storage_key, file_name, hash
                    ) VALUES (?, ?, ?, ?, ?, ?)
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
                .map_err(|e| {
                    MetadataError::from_insert(e, format!("storage_key {}", artifact.storage_key))
                })?;

                tx.commit().await?;

                Ok::<_, MetadataError>(ArtifactRow {
                    id,
                    student_id: artifact.student_id.clone(),
                    assignment_id: artifact.assignment_id.clone(),
                    submitted_at_us,
                    storage_key: artifact.storage_key.clone(),
                    file_name: artifact.file_name.clone(),
                    hash: artifact.hash.to_hex(),
                })
            })
            .await
        }

        async fn get_artifact(&self, id: i64) -> MetadataResult<Option<ArtifactRow>> {
            let row = sqlx::query_as::<_, ArtifactRow>("SELECT * FROM artifacts WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_fingerprints_before(
            &self,
            cutoff_us: Option<i64>,
        ) -> MetadataResult<Vec<FingerprintRow>> {
            let query = match cutoff_us {
                Some(cutoff) => sqlx::query_as::<_, FingerprintRow>(
                    "SELECT id, hash FROM artifacts WHERE submitted_at_us < ? ORDER BY id",
                )
                .bind(cutoff),
                None => {
                    sqlx::query_as::<_, FingerprintRow>("SELECT id, hash FROM artifacts ORDER BY id")
                }
            };
            let rows = self
                .timed("list_fingerprints_before", query.fetch_all(&self.pool))
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
    impl ReportRepo for SqliteStore {
        async fn create_report(&self, report: &NewReport) -> MetadataResult<ReportRow> {
            let created_at_us = timestamp::to_unix_micros(report.created_at);
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO reports (work_id, plagiarism, matched_work_id, created_at_us)
                VALUES (?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(report.work_id)
            .bind(report.plagiarism)
            .bind(report.matched_work_id)
            .bind(created_at_us)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                MetadataError::from_insert(e, format!("report for work {}", report.work_id))
            })?;

            Ok(ReportRow {
                id,
                work_id: report.work_id,
                plagiarism: report.plagiarism,
                matched_work_id: report.matched_work_id,
                created_at_us,
            })
        }

        async fn get_report_by_work(&self, work_id: i64) -> MetadataResult<Option<ReportRow>> {
            let row = sqlx::query_as::<_, ReportRow>("SELECT * FROM reports WHERE work_id = ?")
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
}

/// Submission time for a new artifact: `now` in microseconds, or one
/// microsecond after the newest stored artifact if the clock lags behind it.
pub(crate) fn next_submission_micros(
    now: time::OffsetDateTime,
    newest_us: Option<i64>,
) -> i64 {
    let now_us = sleuth_core::timestamp::to_unix_micros(now);
    match newest_us {
        Some(newest) if newest >= now_us => newest + 1,
        _ => now_us,
    }
}

const SCHEMA_SQL: &str = r#"
-- Artifacts: one row per accepted upload. Immutable.
CREATE TABLE IF NOT EXISTS artifacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id TEXT NOT NULL CHECK (length(student_id) > 0),
    assignment_id TEXT NOT NULL CHECK (length(assignment_id) > 0),
    submitted_at_us INTEGER NOT NULL,
    storage_key TEXT NOT NULL UNIQUE,
    file_name TEXT NOT NULL,
    hash TEXT NOT NULL CHECK (length(hash) = 64)
);
CREATE INDEX IF NOT EXISTS idx_artifacts_hash ON artifacts(hash);
CREATE INDEX IF NOT EXISTS idx_artifacts_submitted ON artifacts(submitted_at_us);

-- Reports: at most one per work, matched work present iff positive.
CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    work_id INTEGER NOT NULL,
    plagiarism INTEGER NOT NULL,
    matched_work_id INTEGER,
    created_at_us INTEGER NOT NULL,
    CHECK ((plagiarism = 1 AND matched_work_id IS NOT NULL)
        OR (plagiarism = 0 AND matched_work_id IS NULL))
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_reports_work ON reports(work_id);
"#;
