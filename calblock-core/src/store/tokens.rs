//! Per-account credentials, stored as JSON in the `tokens` table.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;

use crate::error::CalblockResult;

#[derive(Clone)]
pub struct TokenStore {
    pool: SqlitePool,
}

impl TokenStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        TokenStore { pool }
    }

    pub async fn load<T: DeserializeOwned>(&self, account_name: &str) -> CalblockResult<Option<T>> {
        let row = sqlx::query("SELECT token FROM tokens WHERE account_name = ?")
            .bind(account_name)
            .fetch_optional(&self.pool)
            .await?;

        let Some(token) = row.and_then(|r| r.get::<Option<String>, _>("token")) else {
            return Ok(None);
        };

        Ok(Some(serde_json::from_str(&token)?))
    }

    pub async fn save<T: Serialize>(&self, account_name: &str, token: &T) -> CalblockResult<()> {
        let json = serde_json::to_string(token)?;

        sqlx::query(
            "INSERT INTO tokens (account_name, token) VALUES (?, ?)
             ON CONFLICT (account_name) DO UPDATE SET token = excluded.token",
        )
        .bind(account_name)
        .bind(json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove(&self, account_name: &str) -> CalblockResult<()> {
        sqlx::query("DELETE FROM tokens WHERE account_name = ?")
            .bind(account_name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
