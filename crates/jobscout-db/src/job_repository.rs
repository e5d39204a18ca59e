use chrono::{DateTime, Utc};
use jobscout_core::error::AppError;
use jobscout_core::models::{JobRecord, JobSource};
use jobscout_core::traits::JobSink;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

/// PostgreSQL store for scraped jobs, deduplicated by URL.
#[derive(Clone)]
pub struct JobRepository {
    pool: Pool<Postgres>,
}

/// A job as stored, with its row id and insertion time.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredJob {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub job: JobRecord,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a job unless its URL is already stored.
    ///
    /// Returns `true` if a row was inserted. Existing rows are never updated.
    pub async fn insert(&self, job: &JobRecord) -> Result<bool, AppError> {
        let follower_count = job.follower_count.and_then(|c| i64::try_from(c).ok());

        let result = sqlx::query(
            r#"
            INSERT INTO scraped_jobs
                (url, title, company, location, source, posted_at, follower_count, actively_hiring)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(&job.url)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(job.source.as_str())
        .bind(job.posted_at)
        .bind(follower_count)
        .bind(job.actively_hiring)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    /// Most recently stored jobs, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<StoredJob>, AppError> {
        let rows = sqlx::query_as::<_, ScrapedJobRow>(
            r#"
            SELECT id, url, title, company, location, source, posted_at,
                   follower_count, actively_hiring, created_at
            FROM scraped_jobs
            ORDER BY created_at DESC, posted_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(StoredJob::try_from).collect()
    }

    /// Whether a job with this URL is stored.
    pub async fn exists(&self, url: &str) -> Result<bool, AppError> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM scraped_jobs WHERE url = $1)")
                .bind(url)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(row.0)
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scraped_jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(row.0.max(0) as u64)
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct ScrapedJobRow {
    id: Uuid,
    url: String,
    title: String,
    company: String,
    location: String,
    source: String,
    posted_at: DateTime<Utc>,
    follower_count: Option<i64>,
    actively_hiring: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ScrapedJobRow> for StoredJob {
    type Error = AppError;

    fn try_from(row: ScrapedJobRow) -> Result<Self, Self::Error> {
        let source: JobSource = row.source.parse().map_err(AppError::DatabaseError)?;
        let mut job = JobRecord::new(row.title, row.company, row.url, source)
            .with_location(row.location)
            .with_posted_at(row.posted_at);
        job.follower_count = row.follower_count.and_then(|c| u64::try_from(c).ok());
        job.actively_hiring = row.actively_hiring;

        Ok(StoredJob {
            id: row.id,
            created_at: row.created_at,
            job,
        })
    }
}

// -- Trait implementation --

impl JobSink for JobRepository {
    async fn upsert(&self, job: &JobRecord) -> Result<bool, AppError> {
        JobRepository::insert(self, job).await
    }
}
