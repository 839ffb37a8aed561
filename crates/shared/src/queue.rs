//! Durable post queue.
//!
//! Append-only persistence for pending-post jobs. The batch worker only ever
//! inserts; reads exist for tests and operator inspection.

use crate::models::{PostJob, PostStatus};
use crate::Database;
use anyhow::{Context, Result};
use rusqlite::params;
use tracing::info;

/// Post queue manager
pub struct PostQueue {
    db: Database,
}

impl PostQueue {
    /// Create a new post queue backed by the given database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append a pending-post job, returning its database id.
    ///
    /// Rejects records with an empty file-id list: a resolution pass with
    /// zero successful uploads must not produce a record.
    pub fn insert(&mut self, job: &PostJob) -> Result<i64> {
        if job.file_ids.is_empty() {
            anyhow::bail!("Refusing to persist a post job with no uploaded files");
        }

        let conn = self.db.conn_mut();

        conn.execute(
            "INSERT INTO post_queue (
                anime, poster, synopsis, genres, score, type,
                resolution, file_ids, range_start, range_end, dual_audio,
                status, timestamp
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13
            )",
            params![
                job.anime,
                job.poster,
                job.synopsis,
                job.genres,
                job.score,
                job.media_type,
                job.resolution,
                serde_json::to_string(&job.file_ids)?,
                job.range_start,
                job.range_end,
                job.dual_audio,
                job.status.to_string(),
                job.timestamp,
            ],
        )
        .context("Failed to insert post job")?;

        let id = conn.last_insert_rowid();
        info!(
            post_id = id,
            anime = %job.anime,
            resolution = %job.resolution,
            files = job.file_ids.len(),
            "Queued pending post"
        );

        Ok(id)
    }

    /// All jobs still awaiting publication, oldest first.
    pub fn pending(&self) -> Result<Vec<PostJob>> {
        let conn = self.db.conn();

        let mut stmt = conn.prepare(
            "SELECT id, anime, poster, synopsis, genres, score, type,
                    resolution, file_ids, range_start, range_end, dual_audio,
                    status, timestamp
             FROM post_queue WHERE status = 'pending_post' ORDER BY timestamp ASC",
        )?;

        let jobs = stmt
            .query_map([], row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(jobs)
    }

    /// Total number of records in the queue.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .conn()
            .query_row("SELECT COUNT(*) FROM post_queue", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Helper: Convert a database row to a PostJob
fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<PostJob> {
    let file_ids: String = row.get(8)?;
    Ok(PostJob {
        id: row.get(0)?,
        anime: row.get(1)?,
        poster: row.get(2)?,
        synopsis: row.get(3)?,
        genres: row.get(4)?,
        score: row.get(5)?,
        media_type: row.get(6)?,
        resolution: row.get(7)?,
        file_ids: serde_json::from_str(&file_ids).unwrap_or_default(),
        range_start: row.get(9)?,
        range_end: row.get(10)?,
        dual_audio: row.get(11)?,
        status: row
            .get::<_, String>(12)?
            .parse()
            .unwrap_or(PostStatus::PendingPost),
        timestamp: row.get(13)?,
    })
}
