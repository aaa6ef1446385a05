//! `remote_post` and `related` tables

use crate::models::{NewPost, RemotePost};
use chrono::Utc;
use hoard_common::{HoardError, Result};
use sqlx::SqliteConnection;

const COLUMNS: &str =
    "id, source_id, original_id, url, title, comment, metadata, post_time, created_at";

pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<RemotePost>> {
    let post = sqlx::query_as::<_, RemotePost>(&format!(
        "SELECT {COLUMNS} FROM remote_post WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(post)
}

pub async fn get_by_original_id(
    conn: &mut SqliteConnection,
    source_id: i64,
    original_id: &str,
) -> Result<Option<RemotePost>> {
    let post = sqlx::query_as::<_, RemotePost>(&format!(
        "SELECT {COLUMNS} FROM remote_post WHERE source_id = ?1 AND original_id = ?2"
    ))
    .bind(source_id)
    .bind(original_id)
    .fetch_optional(conn)
    .await?;

    Ok(post)
}

pub async fn insert(
    conn: &mut SqliteConnection,
    source_id: i64,
    post: &NewPost,
) -> Result<RemotePost> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO remote_post
            (source_id, original_id, url, title, comment, metadata, post_time, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        RETURNING id
        "#,
    )
    .bind(source_id)
    .bind(&post.original_id)
    .bind(&post.url)
    .bind(&post.title)
    .bind(&post.comment)
    .bind(post.metadata.to_json())
    .bind(post.post_time)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    get(conn, id)
        .await?
        .ok_or_else(|| HoardError::not_found("remote_post", id.to_string()))
}

/// Overwrite the adapter-supplied fields of an existing post
pub async fn update(conn: &mut SqliteConnection, id: i64, post: &NewPost) -> Result<RemotePost> {
    sqlx::query(
        r#"
        UPDATE remote_post
        SET url = ?1, title = ?2, comment = ?3, metadata = ?4, post_time = ?5
        WHERE id = ?6
        "#,
    )
    .bind(&post.url)
    .bind(&post.title)
    .bind(&post.comment)
    .bind(post.metadata.to_json())
    .bind(post.post_time)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    get(conn, id)
        .await?
        .ok_or_else(|| HoardError::not_found("remote_post", id.to_string()))
}

/// Attach a related URL to a post; adding the same URL twice is a no-op
pub async fn add_related(conn: &mut SqliteConnection, remote_id: i64, url: &str) -> Result<()> {
    sqlx::query("INSERT INTO related (remote_id, url) VALUES (?1, ?2) ON CONFLICT DO NOTHING")
        .bind(remote_id)
        .bind(url)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn related_urls(conn: &mut SqliteConnection, remote_id: i64) -> Result<Vec<String>> {
    let urls = sqlx::query_scalar::<_, String>(
        "SELECT url FROM related WHERE remote_id = ?1 ORDER BY id",
    )
    .bind(remote_id)
    .fetch_all(conn)
    .await?;

    Ok(urls)
}
