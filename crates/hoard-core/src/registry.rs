//! Service registry
//!
//! A service is the persistent identity of a source adapter: the row its
//! posts, files and subscriptions hang off, plus its stored configuration and
//! the adapter version whose migrations last ran.

use crate::db::{services, Session};
use crate::models::Service;
use hoard_common::{HoardError, Result};
use tracing::instrument;

/// Get or create the service called `name`
///
/// An existing service is returned unchanged. A new one is created at
/// version 0 with an empty configuration and flushed, so its id is usable
/// straight away. Nothing is committed.
///
/// Names are matched exactly. A blank name, or one with leading or trailing
/// whitespace, is rejected with [`HoardError::Validation`] rather than
/// trimmed, so `" pixiv"` never aliases `"pixiv"`.
#[instrument(skip(session))]
pub async fn register_service(session: &mut Session, name: &str) -> Result<Service> {
    validate_name(name)?;
    services::get_or_create(session.conn().await?, name).await
}

/// Look up a service without creating it
pub async fn get_service(session: &mut Session, name: &str) -> Result<Option<Service>> {
    services::get_by_name(session.conn().await?, name).await
}

pub async fn list_services(session: &mut Session) -> Result<Vec<Service>> {
    services::list(session.conn().await?).await
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(HoardError::Validation("Service name is required".to_string()));
    }

    if name.trim() != name {
        return Err(HoardError::Validation(format!(
            "Service name cannot have surrounding whitespace: '{}'",
            name
        )));
    }

    Ok(())
}
