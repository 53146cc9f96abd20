//! The `calendars` table: which calendars are tracked and where they live.

use sqlx::Row;
use sqlx::sqlite::SqlitePool;

use crate::calendar::{CalendarRef, ProviderType};
use crate::error::{CalblockError, CalblockResult};

/// A registered calendar with the number of blockers the ledger holds on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSummary {
    pub calendar: CalendarRef,
    pub blocker_count: i64,
}

#[derive(Clone)]
pub struct Registry {
    pool: SqlitePool,
}

impl Registry {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Registry { pool }
    }

    /// Register a calendar. Fails if `(account_name, calendar_id)` is taken.
    pub async fn add(&self, calendar: &CalendarRef) -> CalblockResult<()> {
        if self
            .get(&calendar.account_name, &calendar.calendar_id)
            .await?
            .is_some()
        {
            return Err(CalblockError::ConfigInvalid(format!(
                "calendar {} is already registered",
                calendar
            )));
        }

        // Ledger rows and blockers are keyed by calendar_id alone
        let owner: Option<String> =
            sqlx::query_scalar("SELECT account_name FROM calendars WHERE calendar_id = ?")
                .bind(&calendar.calendar_id)
                .fetch_optional(&self.pool)
                .await?;
        if let Some(owner) = owner {
            return Err(CalblockError::ConfigInvalid(format!(
                "calendar {} is already registered under account {}",
                calendar.calendar_id, owner
            )));
        }

        sqlx::query(
            "INSERT INTO calendars (account_name, calendar_id, provider_type, provider_config)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&calendar.account_name)
        .bind(&calendar.calendar_id)
        .bind(calendar.provider_type.as_str())
        .bind(&calendar.provider_config)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(
        &self,
        account_name: &str,
        calendar_id: &str,
    ) -> CalblockResult<Option<CalendarRef>> {
        let row = sqlx::query(
            "SELECT account_name, calendar_id, provider_type, provider_config
             FROM calendars WHERE account_name = ? AND calendar_id = ?",
        )
        .bind(account_name)
        .bind(calendar_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            calendar_from_parts(
                r.get("account_name"),
                r.get("calendar_id"),
                r.get("provider_type"),
                r.get("provider_config"),
            )
        })
        .transpose()
    }

    /// Every tracked calendar, ordered by account then calendar.
    pub async fn list(&self) -> CalblockResult<Vec<CalendarRef>> {
        let rows = sqlx::query(
            "SELECT account_name, calendar_id, provider_type, provider_config
             FROM calendars ORDER BY account_name, calendar_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                calendar_from_parts(
                    r.get("account_name"),
                    r.get("calendar_id"),
                    r.get("provider_type"),
                    r.get("provider_config"),
                )
            })
            .collect()
    }

    pub async fn list_with_counts(&self) -> CalblockResult<Vec<CalendarSummary>> {
        let rows = sqlx::query(
            "SELECT c.account_name, c.calendar_id, c.provider_type, c.provider_config,
                    COUNT(b.event_id) AS blocker_count
             FROM calendars c
             LEFT JOIN blocker_events b ON b.calendar_id = c.calendar_id
             GROUP BY c.account_name, c.calendar_id
             ORDER BY c.account_name, c.calendar_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(CalendarSummary {
                    calendar: calendar_from_parts(
                        r.get("account_name"),
                        r.get("calendar_id"),
                        r.get("provider_type"),
                        r.get("provider_config"),
                    )?,
                    blocker_count: r.get("blocker_count"),
                })
            })
            .collect()
    }

    /// Returns whether a row was removed.
    pub async fn remove(&self, account_name: &str, calendar_id: &str) -> CalblockResult<bool> {
        let result = sqlx::query("DELETE FROM calendars WHERE account_name = ? AND calendar_id = ?")
            .bind(account_name)
            .bind(calendar_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn calendar_from_parts(
    account_name: String,
    calendar_id: String,
    provider_type: String,
    provider_config: Option<String>,
) -> CalblockResult<CalendarRef> {
    Ok(CalendarRef {
        account_name,
        calendar_id,
        provider_type: provider_type.parse::<ProviderType>()?,
        provider_config: provider_config.filter(|s| !s.is_empty()),
    })
}
