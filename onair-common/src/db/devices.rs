//! Registered push-notification tokens

use crate::api::DeviceInfo;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Longest token accepted from clients
const MAX_TOKEN_LEN: usize = 512;

/// Token registry backed by the `devices` table
#[derive(Clone)]
pub struct DeviceStore {
    pool: SqlitePool,
}

impl DeviceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a token; re-registering updates platform and timestamp
    pub async fn register(&self, token: &str, platform: Option<&str>) -> Result<DeviceInfo> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::InvalidInput("token must not be empty".to_string()));
        }
        if token.len() > MAX_TOKEN_LEN {
            return Err(Error::InvalidInput(format!(
                "token longer than {} bytes",
                MAX_TOKEN_LEN
            )));
        }

        let registered_at = Utc::now();
        sqlx::query(
            "INSERT INTO devices (token, platform, registered_at) VALUES (?, ?, ?)
             ON CONFLICT(token) DO UPDATE SET platform = excluded.platform,
                                              registered_at = excluded.registered_at",
        )
        .bind(token)
        .bind(platform)
        .bind(registered_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(DeviceInfo {
            token: token.to_string(),
            platform: platform.map(str::to_string),
            registered_at,
        })
    }

    /// Remove a token; `NotFound` if it was never registered
    pub async fn unregister(&self, token: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM devices WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("device token {}", token)));
        }
        Ok(())
    }

    /// All registered devices, oldest first
    pub async fn list(&self) -> Result<Vec<DeviceInfo>> {
        let rows: Vec<(String, Option<String>, String)> = sqlx::query_as(
            "SELECT token, platform, registered_at FROM devices ORDER BY registered_at, token",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(token, platform, registered_at)| {
                let registered_at = DateTime::parse_from_rfc3339(&registered_at)
                    .map_err(|e| Error::Internal(format!("bad registered_at for {}: {}", token, e)))?
                    .with_timezone(&Utc);
                Ok(DeviceInfo {
                    token,
                    platform,
                    registered_at,
                })
            })
            .collect()
    }

    /// Token set used for notification dispatch
    pub async fn tokens(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT token FROM devices ORDER BY token")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(token,)| token).collect())
    }
}
