//! `file` table

use crate::models::File;
use hoard_common::{HoardError, Result};
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, remote_id, remote_order, hash, mime, ext, file_present, thumb_present";

/// Insert `file` and write the assigned id back into it
pub async fn insert(conn: &mut SqliteConnection, file: &mut File) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO file (remote_id, remote_order, hash, mime, ext, file_present, thumb_present)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING id
        "#,
    )
    .bind(file.remote_id)
    .bind(file.remote_order)
    .bind(&file.hash)
    .bind(&file.mime)
    .bind(&file.ext)
    .bind(file.file_present)
    .bind(file.thumb_present)
    .fetch_one(conn)
    .await?;

    file.id = Some(id);
    Ok(id)
}

/// Persist every column of an already inserted file
pub async fn update(conn: &mut SqliteConnection, file: &File) -> Result<()> {
    let id = file.id.ok_or(HoardError::UnassignedId)?;

    sqlx::query(
        r#"
        UPDATE file
        SET remote_id = ?1, remote_order = ?2, hash = ?3, mime = ?4, ext = ?5,
            file_present = ?6, thumb_present = ?7
        WHERE id = ?8
        "#,
    )
    .bind(file.remote_id)
    .bind(file.remote_order)
    .bind(&file.hash)
    .bind(&file.mime)
    .bind(&file.ext)
    .bind(file.file_present)
    .bind(file.thumb_present)
    .bind(id)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<File>> {
    let file = sqlx::query_as::<_, File>(&format!("SELECT {COLUMNS} FROM file WHERE id = ?1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(file)
}

/// Files attached to a post, in post order
pub async fn for_post(conn: &mut SqliteConnection, remote_id: i64) -> Result<Vec<File>> {
    let files = sqlx::query_as::<_, File>(&format!(
        "SELECT {COLUMNS} FROM file WHERE remote_id = ?1 ORDER BY remote_order, id"
    ))
    .bind(remote_id)
    .fetch_all(conn)
    .await?;

    Ok(files)
}

pub async fn get_for_post_order(
    conn: &mut SqliteConnection,
    remote_id: i64,
    order: i64,
) -> Result<Option<File>> {
    let file = sqlx::query_as::<_, File>(&format!(
        "SELECT {COLUMNS} FROM file WHERE remote_id = ?1 AND remote_order = ?2 ORDER BY id LIMIT 1"
    ))
    .bind(remote_id)
    .bind(order)
    .fetch_optional(conn)
    .await?;

    Ok(file)
}
