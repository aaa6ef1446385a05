//! `meta` table: archive-wide key/value settings

use hoard_common::Result;
use sqlx::SqliteConnection;

/// Slot size the archive's file tree was laid out with
pub const FILES_SLOT_SIZE: &str = "files_slot_size";

pub async fn get(conn: &mut SqliteConnection, key: &str) -> Result<Option<String>> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM meta WHERE key = ?1")
        .bind(key)
        .fetch_optional(conn)
        .await?;

    Ok(value)
}

/// Store `value` only if `key` has no value yet, returning whatever is stored
/// afterwards
pub async fn get_or_insert(conn: &mut SqliteConnection, key: &str, value: &str) -> Result<String> {
    sqlx::query("INSERT INTO meta (key, value) VALUES (?1, ?2) ON CONFLICT (key) DO NOTHING")
        .bind(key)
        .bind(value)
        .execute(&mut *conn)
        .await?;

    let stored = sqlx::query_scalar::<_, String>("SELECT value FROM meta WHERE key = ?1")
        .bind(key)
        .fetch_one(conn)
        .await?;

    Ok(stored)
}
