//! The `blocker_events` table: one row per blocker calblock has written.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use crate::error::CalblockResult;

/// A blocker on record, keyed by `(calendar_id, origin_event_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockerRecord {
    /// The blocker's own ID on the destination calendar
    pub event_id: String,
    /// Destination calendar
    pub calendar_id: String,
    /// Destination account
    pub account_name: String,
    pub origin_event_id: String,
    pub origin_calendar_id: String,
    /// Revision marker of the source when the blocker was last written
    pub last_updated: String,
    pub response_status: Option<String>,
}

impl BlockerRecord {
    /// True when the blocker was written from this exact source revision.
    pub fn is_current(&self, origin_calendar_id: &str, revision_marker: &str) -> bool {
        self.origin_calendar_id == origin_calendar_id && self.last_updated == revision_marker
    }
}

const COLUMNS: &str = "event_id, calendar_id, account_name, origin_event_id, \
     origin_calendar_id, last_updated, response_status";

#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Ledger { pool }
    }

    pub async fn find(
        &self,
        calendar_id: &str,
        origin_event_id: &str,
    ) -> CalblockResult<Option<BlockerRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM blocker_events WHERE calendar_id = ? AND origin_event_id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(calendar_id)
            .bind(origin_event_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(record_from_row))
    }

    /// Insert or replace the row for `(calendar_id, origin_event_id)`.
    pub async fn upsert(&self, record: &BlockerRecord) -> CalblockResult<()> {
        sqlx::query(
            "INSERT INTO blocker_events
                (event_id, calendar_id, account_name, origin_event_id,
                 origin_calendar_id, last_updated, response_status)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (calendar_id, origin_event_id) DO UPDATE SET
                event_id = excluded.event_id,
                account_name = excluded.account_name,
                origin_calendar_id = excluded.origin_calendar_id,
                last_updated = excluded.last_updated,
                response_status = excluded.response_status",
        )
        .bind(&record.event_id)
        .bind(&record.calendar_id)
        .bind(&record.account_name)
        .bind(&record.origin_event_id)
        .bind(&record.origin_calendar_id)
        .bind(&record.last_updated)
        .bind(&record.response_status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Blockers on `calendar_id` that were copied from `origin_calendar_id`.
    pub async fn blockers_between(
        &self,
        origin_calendar_id: &str,
        calendar_id: &str,
    ) -> CalblockResult<Vec<BlockerRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM blocker_events
             WHERE origin_calendar_id = ? AND calendar_id = ?
             ORDER BY origin_event_id"
        );
        let rows = sqlx::query(&sql)
            .bind(origin_calendar_id)
            .bind(calendar_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    pub async fn all(&self) -> CalblockResult<Vec<BlockerRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM blocker_events ORDER BY calendar_id, origin_event_id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    pub async fn delete(&self, calendar_id: &str, origin_event_id: &str) -> CalblockResult<()> {
        sqlx::query("DELETE FROM blocker_events WHERE calendar_id = ? AND origin_event_id = ?")
            .bind(calendar_id)
            .bind(origin_event_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Drop every row whose blocker lives on `calendar_id`. Returns the number
    /// of rows removed.
    pub async fn delete_for_calendar(&self, calendar_id: &str) -> CalblockResult<u64> {
        let result = sqlx::query("DELETE FROM blocker_events WHERE calendar_id = ?")
            .bind(calendar_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn record_from_row(row: &SqliteRow) -> BlockerRecord {
    BlockerRecord {
        event_id: row.get::<Option<String>, _>("event_id").unwrap_or_default(),
        calendar_id: row.get::<Option<String>, _>("calendar_id").unwrap_or_default(),
        account_name: row.get::<Option<String>, _>("account_name").unwrap_or_default(),
        origin_event_id: row
            .get::<Option<String>, _>("origin_event_id")
            .unwrap_or_default(),
        // Rows written before v3 have no origin; they never match a source
        // calendar and are rewritten on the next pass.
        origin_calendar_id: row
            .get::<Option<String>, _>("origin_calendar_id")
            .unwrap_or_default(),
        last_updated: row.get::<Option<String>, _>("last_updated").unwrap_or_default(),
        response_status: row.get("response_status"),
    }
}
