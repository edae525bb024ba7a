use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;

const GLOBAL_DOWNLOADS: &str = "global_downloads";

/// A Telegram account as reported by an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramUser {
    pub id: u64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl TelegramUser {
    pub fn record_id(&self) -> String {
        record_id(self.id)
    }

    pub fn display_name(&self) -> String {
        let name = [Some(self.first_name.as_str()), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            "Unknown".to_string()
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    pub telegram_id: i64,
    pub display_name: String,
    pub username: Option<String>,
    pub download_count: i64,
    pub first_seen: DateTime<Utc>,
    pub last_download: DateTime<Utc>,
}

fn record_id(telegram_id: u64) -> String {
    format!("tg_{telegram_id}")
}

/// Download counters and Telegram user records.
///
/// Backed by Postgres when a pool is available, otherwise kept in memory for
/// the lifetime of the process. Callers treat every write as best effort.
#[derive(Clone)]
pub struct DownloadStats {
    pool: Option<PgPool>,
    global: Arc<AtomicU64>,
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl DownloadStats {
    pub fn new(pool: Option<PgPool>) -> Self {
        Self {
            pool,
            global: Arc::new(AtomicU64::new(0)),
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Insert the user on first contact, refresh name and activity afterwards.
    pub async fn save_telegram_user(&self, user: &TelegramUser) -> Result<()> {
        let id = user.record_id();
        let display_name = user.display_name();

        if let Some(pool) = &self.pool {
            sqlx::query(
                r#"
                INSERT INTO telegram_users (id, telegram_id, display_name, username)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id) DO UPDATE
                SET display_name = EXCLUDED.display_name,
                    username = EXCLUDED.username,
                    last_download = NOW()
                "#,
            )
            .bind(&id)
            .bind(user.id as i64)
            .bind(&display_name)
            .bind(&user.username)
            .execute(pool)
            .await?;
            return Ok(());
        }

        let now = Utc::now();
        let mut users = self.users.write().await;
        users
            .entry(id.clone())
            .and_modify(|record| {
                record.display_name = display_name.clone();
                record.username = user.username.clone();
                record.last_download = now;
            })
            .or_insert_with(|| UserRecord {
                id,
                telegram_id: user.id as i64,
                display_name,
                username: user.username.clone(),
                download_count: 0,
                first_seen: now,
                last_download: now,
            });
        Ok(())
    }

    pub async fn increment_telegram_downloads(&self, telegram_id: u64) -> Result<()> {
        let id = record_id(telegram_id);

        if let Some(pool) = &self.pool {
            sqlx::query(
                "UPDATE telegram_users SET download_count = download_count + 1, last_download = NOW() WHERE id = $1",
            )
            .bind(&id)
            .execute(pool)
            .await?;
            return Ok(());
        }

        if let Some(record) = self.users.write().await.get_mut(&id) {
            record.download_count += 1;
            record.last_download = Utc::now();
        }
        Ok(())
    }

    pub async fn get_telegram_user(&self, telegram_id: u64) -> Result<Option<UserRecord>> {
        let id = record_id(telegram_id);

        if let Some(pool) = &self.pool {
            let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM telegram_users WHERE id = $1")
                .bind(&id)
                .fetch_optional(pool)
                .await?;
            return Ok(record);
        }

        Ok(self.users.read().await.get(&id).cloned())
    }

    /// Bump the global counter and return the new total.
    pub async fn increment_global_downloads(&self) -> Result<u64> {
        if let Some(pool) = &self.pool {
            let value: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO counters (name, value) VALUES ($1, 1)
                ON CONFLICT (name) DO UPDATE SET value = counters.value + 1
                RETURNING value
                "#,
            )
            .bind(GLOBAL_DOWNLOADS)
            .fetch_one(pool)
            .await?;
            return Ok(value.max(0) as u64);
        }

        Ok(self.global.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub async fn global_download_count(&self) -> Result<u64> {
        if let Some(pool) = &self.pool {
            let value: Option<i64> = sqlx::query_scalar("SELECT value FROM counters WHERE name = $1")
                .bind(GLOBAL_DOWNLOADS)
                .fetch_optional(pool)
                .await?;
            return Ok(value.unwrap_or(0).max(0) as u64);
        }

        Ok(self.global.load(Ordering::SeqCst))
    }
}

impl std::fmt::Debug for DownloadStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadStats")
            .field("persistent", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}
