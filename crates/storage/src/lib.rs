use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{ChatId, PreferenceId, Sender, UserId},
    protocol::{ChatRecord, PreferenceRecord},
};

/// Document store for chat records and preference documents.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn insert_chat(
        &self,
        user_id: &UserId,
        message: &str,
        sender: Sender,
    ) -> Result<ChatRecord> {
        let row = sqlx::query(
            "INSERT INTO chats (user_id, message, sender, created_at) VALUES (?, ?, ?, ?)
             RETURNING id, user_id, message, sender, created_at",
        )
        .bind(user_id.as_str())
        .bind(message)
        .bind(sender.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("failed to insert chat record")?;
        chat_from_row(&row)
    }

    /// Chat history for one user, oldest first.
    pub async fn list_chats(&self, user_id: &UserId) -> Result<Vec<ChatRecord>> {
        let rows = sqlx::query(
            "SELECT id, user_id, message, sender, created_at
             FROM chats
             WHERE user_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(chat_from_row).collect()
    }

    pub async fn insert_preferences(
        &self,
        user_id: &UserId,
        preferences: &serde_json::Value,
    ) -> Result<PreferenceRecord> {
        let document =
            serde_json::to_string(preferences).context("failed to encode preference document")?;
        let row = sqlx::query(
            "INSERT INTO preferences (user_id, preferences, created_at) VALUES (?, ?, ?)
             RETURNING id, user_id, preferences, created_at",
        )
        .bind(user_id.as_str())
        .bind(document)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("failed to insert preference document")?;
        preference_from_row(&row)
    }

    /// Stored preference documents for one user, newest first.
    pub async fn list_preferences(&self, user_id: &UserId) -> Result<Vec<PreferenceRecord>> {
        let rows = sqlx::query(
            "SELECT id, user_id, preferences, created_at
             FROM preferences
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(preference_from_row).collect()
    }

    pub async fn latest_preferences(&self, user_id: &UserId) -> Result<Option<PreferenceRecord>> {
        let row = sqlx::query(
            "SELECT id, user_id, preferences, created_at
             FROM preferences
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(preference_from_row).transpose()
    }
}

fn chat_from_row(row: &SqliteRow) -> Result<ChatRecord> {
    let sender = row.get::<String, _>(3);
    Ok(ChatRecord {
        id: ChatId(row.get::<i64, _>(0)),
        user_id: UserId(row.get::<String, _>(1)),
        message: row.get::<String, _>(2),
        sender: Sender::from_str(&sender).context("malformed chat row")?,
        created_at: row.get::<DateTime<Utc>, _>(4),
    })
}

fn preference_from_row(row: &SqliteRow) -> Result<PreferenceRecord> {
    let document = row.get::<String, _>(2);
    Ok(PreferenceRecord {
        id: PreferenceId(row.get::<i64, _>(0)),
        user_id: UserId(row.get::<String, _>(1)),
        preferences: serde_json::from_str(&document)
            .context("stored preference document is not valid JSON")?,
        created_at: row.get::<DateTime<Utc>, _>(3),
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() || path == ":memory:" {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
