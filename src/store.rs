//! Persistence of scraped song records.
//!
//! Records land in one Postgres table with the relation lists as JSONB
//! columns, keyed by (`original_song`, `search_query`). The upsert relies
//! on the database's native `ON CONFLICT` handling so repeated or
//! concurrent scrapes of the same song never create duplicate documents
//! and never need client-side locking.

use crate::error::ScrapeError;
use crate::types::{SampleRelation, SongIdentity, SongRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::Row;

/// Outcome of an upsert: whether the key was new or replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// The persistence seam the pipeline writes through, mockable for testing.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait(?Send)]
pub trait SongRepository {
    /// Insert the record, or fully overwrite the existing document with the
    /// same (`original_song`, `search_query`) key.
    async fn upsert(&self, record: &SongRecord) -> Result<UpsertOutcome, ScrapeError>;
}

/// Song storage over a Postgres connection pool.
pub struct SongStore {
    pool: sqlx::Pool<sqlx::Postgres>,
}

impl SongStore {
    /// Connect via a connection string and verify the database answers.
    /// Fails fast at startup rather than on the first write.
    pub async fn connect(url: &str) -> Result<Self, ScrapeError> {
        let pool = sqlx::PgPool::connect(url).await?;
        sqlx::query("select 1").execute(&pool).await?;
        log::debug!("Connected to song store");
        Ok(Self { pool })
    }

    /// Create the songs table and its key constraint if absent.
    pub async fn ensure_schema(&self) -> Result<(), ScrapeError> {
        sqlx::query(
            "
            create table if not exists songs (
                id bigserial primary key,
                original_song text not null,
                search_query text not null,
                samples jsonb not null,
                sampled_by jsonb not null,
                fetched_at timestamptz not null,
                unique (original_song, search_query)
            )
        ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a stored record by its key, if present.
    pub async fn find(
        &self,
        identity: &SongIdentity,
        search_query: &str,
    ) -> Result<Option<SongRecord>, ScrapeError> {
        let row = sqlx::query(
            "
            select samples, sampled_by, fetched_at from songs
            where original_song = $1 and search_query = $2
        ",
        )
        .bind(identity.original_song())
        .bind(search_query)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let samples: Json<Vec<SampleRelation>> = row.try_get("samples")?;
        let sampled_by: Json<Vec<SampleRelation>> = row.try_get("sampled_by")?;
        let fetched_at: DateTime<Utc> = row.try_get("fetched_at")?;

        Ok(Some(SongRecord {
            identity: identity.clone(),
            search_query: search_query.to_string(),
            samples: samples.0,
            sampled_by: sampled_by.0,
            fetched_at,
        }))
    }

    /// List the keys of every stored song, newest fetch first.
    pub async fn list_songs(&self) -> Result<Vec<(String, String, DateTime<Utc>)>, ScrapeError> {
        let rows = sqlx::query(
            "
            select original_song, search_query, fetched_at from songs
            order by fetched_at desc
        ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut songs = Vec::with_capacity(rows.len());
        for row in rows {
            songs.push((
                row.try_get("original_song")?,
                row.try_get("search_query")?,
                row.try_get("fetched_at")?,
            ));
        }
        Ok(songs)
    }
}

#[async_trait(?Send)]
impl SongRepository for SongStore {
    async fn upsert(&self, record: &SongRecord) -> Result<UpsertOutcome, ScrapeError> {
        // xmax = 0 only on freshly inserted rows, which distinguishes the
        // two outcomes without a second round trip. The conflict update
        // overwrites every data field but keeps the row's id.
        let row = sqlx::query(
            "
            insert into songs (original_song, search_query, samples, sampled_by, fetched_at)
            values ($1, $2, $3, $4, $5)
            on conflict (original_song, search_query) do update
            set samples = excluded.samples,
                sampled_by = excluded.sampled_by,
                fetched_at = excluded.fetched_at
            returning (xmax = 0) as inserted
        ",
        )
        .bind(record.original_song())
        .bind(&record.search_query)
        .bind(Json(&record.samples))
        .bind(Json(&record.sampled_by))
        .bind(record.fetched_at)
        .fetch_one(&self.pool)
        .await?;

        let inserted: bool = row.try_get("inserted")?;
        let outcome = if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        };
        log::debug!("Upserted {}: {outcome:?}", record.original_song());
        Ok(outcome)
    }
}
