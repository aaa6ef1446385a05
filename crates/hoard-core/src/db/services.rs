//! `service` table

use crate::models::Service;
use hoard_common::{Dynamic, HoardError, Result};
use sqlx::SqliteConnection;
use tracing::info;

pub async fn get_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<Service>> {
    let service = sqlx::query_as::<_, Service>(
        "SELECT id, name, version, config FROM service WHERE name = ?1",
    )
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(service)
}

/// Return the service called `name`, inserting it at version 0 if absent
///
/// Concurrent callers racing on the same name converge on a single row.
pub async fn get_or_create(conn: &mut SqliteConnection, name: &str) -> Result<Service> {
    let result = sqlx::query(
        r#"
        INSERT INTO service (name, version, config)
        VALUES (?1, 0, '{}')
        ON CONFLICT (name) DO NOTHING
        "#,
    )
    .bind(name)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        info!(service = name, "Registered new service");
    }

    get_by_name(conn, name)
        .await?
        .ok_or_else(|| HoardError::not_found("service", name))
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Service>> {
    let services = sqlx::query_as::<_, Service>(
        "SELECT id, name, version, config FROM service ORDER BY name",
    )
    .fetch_all(conn)
    .await?;

    Ok(services)
}

pub async fn set_version(conn: &mut SqliteConnection, id: i64, version: i64) -> Result<()> {
    sqlx::query("UPDATE service SET version = ?1 WHERE id = ?2")
        .bind(version)
        .bind(id)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn set_config(conn: &mut SqliteConnection, id: i64, config: &Dynamic) -> Result<()> {
    sqlx::query("UPDATE service SET config = ?1 WHERE id = ?2")
        .bind(config.to_json())
        .bind(id)
        .execute(conn)
        .await?;

    Ok(())
}
