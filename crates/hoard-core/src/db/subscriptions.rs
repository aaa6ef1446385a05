//! `subscription` table

use crate::models::Subscription;
use hoard_common::{HoardError, Result};
use sqlx::SqliteConnection;

const COLUMNS: &str = "id, source_id, name, repr, options, state";

pub async fn insert(
    conn: &mut SqliteConnection,
    source_id: i64,
    name: &str,
    repr: &str,
    options: &str,
    state: &str,
) -> Result<Subscription> {
    let subscription = sqlx::query_as::<_, Subscription>(&format!(
        r#"
        INSERT INTO subscription (source_id, name, repr, options, state)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(source_id)
    .bind(name)
    .bind(repr)
    .bind(options)
    .bind(state)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => HoardError::Validation(
            format!("a subscription named '{}' already exists for this source", name),
        ),
        other => other.into(),
    })?;

    Ok(subscription)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Subscription>> {
    let subscription = sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {COLUMNS} FROM subscription WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(subscription)
}

pub async fn get_by_name(
    conn: &mut SqliteConnection,
    source_id: i64,
    name: &str,
) -> Result<Option<Subscription>> {
    let subscription = sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {COLUMNS} FROM subscription WHERE source_id = ?1 AND name = ?2"
    ))
    .bind(source_id)
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(subscription)
}

pub async fn by_source(conn: &mut SqliteConnection, source_id: i64) -> Result<Vec<Subscription>> {
    let subscriptions = sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {COLUMNS} FROM subscription WHERE source_id = ?1 ORDER BY name"
    ))
    .bind(source_id)
    .fetch_all(conn)
    .await?;

    Ok(subscriptions)
}

/// Subscriptions of a source whose options normalize to `repr`
pub async fn find_by_repr(
    conn: &mut SqliteConnection,
    source_id: i64,
    repr: &str,
) -> Result<Vec<Subscription>> {
    let subscriptions = sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {COLUMNS} FROM subscription WHERE source_id = ?1 AND repr = ?2 ORDER BY id"
    ))
    .bind(source_id)
    .bind(repr)
    .fetch_all(conn)
    .await?;

    Ok(subscriptions)
}

pub async fn update_state(conn: &mut SqliteConnection, id: i64, state: &str) -> Result<()> {
    let result = sqlx::query("UPDATE subscription SET state = ?1 WHERE id = ?2")
        .bind(state)
        .bind(id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(HoardError::not_found("subscription", id.to_string()));
    }

    Ok(())
}
