//! The core as seen by one source adapter

use super::form::Form;
use crate::db::{files, posts, services, subscriptions, Session};
use crate::hoard::Hoard;
use crate::models::{File, NewPost, RemotePost, Service, Subscription};
use crate::net;
use crate::storage::{StorageManager, Transfer};
use hoard_common::{Dynamic, HoardError, Result};
use std::path::Path;
use tempfile::TempPath;
use tracing::{debug, info, instrument};

/// Outcome of merging new parameters into a source's stored configuration
#[derive(Debug, Clone, PartialEq)]
pub enum Configured {
    /// Every required value is present
    Complete(Dynamic),
    /// Values still needed, as a form to show the user
    Incomplete(Form),
}

/// Services an adapter works with, bound to its [`Service`] record
///
/// Everything that touches the database takes the caller's [`Session`], so an
/// adapter's writes land in whatever unit of work the caller is running.
#[derive(Debug, Clone)]
pub struct PluginCore {
    hoard: Hoard,
    source: Service,
}

impl PluginCore {
    pub fn new(hoard: Hoard, source: Service) -> Self {
        Self { hoard, source }
    }

    pub fn source(&self) -> &Service {
        &self.source
    }

    pub fn hoard(&self) -> &Hoard {
        &self.hoard
    }

    pub fn storage(&self) -> &StorageManager {
        self.hoard.storage()
    }

    pub fn http(&self) -> &reqwest::Client {
        self.hoard.http()
    }

    /// The source's stored configuration
    pub fn config(&self) -> Result<Dynamic> {
        self.source.config()
    }

    pub async fn save_config(&mut self, session: &mut Session, config: &Dynamic) -> Result<()> {
        services::set_config(session.conn().await?, self.source.id, config).await?;
        self.source.config = config.to_json();
        debug!(service = %self.source.name, "Saved configuration");
        Ok(())
    }

    pub async fn set_version(&mut self, session: &mut Session, version: i64) -> Result<()> {
        services::set_version(session.conn().await?, self.source.id, version).await?;
        info!(
            service = %self.source.name,
            from = self.source.version,
            to = version,
            "Updated service version"
        );
        self.source.version = version;
        Ok(())
    }

    /// Merge `parameters` into the stored configuration and check it against
    /// `form`
    ///
    /// The merged configuration is saved whenever parameters were given, so
    /// values collected in one round survive until the rest arrive.
    pub async fn configure(
        &mut self,
        session: &mut Session,
        form: &Form,
        parameters: Option<&Dynamic>,
    ) -> Result<Configured> {
        let mut config = self.config()?;

        if let Some(parameters) = parameters {
            config.merge(parameters);
            self.save_config(session, &config).await?;
        }

        if form.is_satisfied_by(&config) {
            Ok(Configured::Complete(config))
        } else {
            Ok(Configured::Incomplete(form.missing(&config)))
        }
    }

    pub async fn find_post(
        &self,
        session: &mut Session,
        original_id: &str,
    ) -> Result<Option<RemotePost>> {
        posts::get_by_original_id(session.conn().await?, self.source.id, original_id).await
    }

    /// Insert the post, or update the stored one with the same original id
    #[instrument(skip(self, session, post), fields(service = %self.source.name, original_id = ?post.original_id))]
    pub async fn upsert_post(&self, session: &mut Session, post: NewPost) -> Result<RemotePost> {
        let conn = session.conn().await?;

        let existing = match post.original_id.as_deref() {
            Some(original_id) => {
                posts::get_by_original_id(&mut *conn, self.source.id, original_id).await?
            },
            None => None,
        };

        match existing {
            Some(existing) => posts::update(conn, existing.id, &post).await,
            None => {
                let created = posts::insert(conn, self.source.id, &post).await?;
                debug!(post_id = created.id, "Recorded new post");
                Ok(created)
            },
        }
    }

    pub async fn add_related(
        &self,
        session: &mut Session,
        post: &RemotePost,
        url: &str,
    ) -> Result<()> {
        posts::add_related(session.conn().await?, post.id, url).await
    }

    pub async fn related_urls(&self, session: &mut Session, post: &RemotePost) -> Result<Vec<String>> {
        posts::related_urls(session.conn().await?, post.id).await
    }

    pub async fn files(&self, session: &mut Session, post: &RemotePost) -> Result<Vec<File>> {
        files::for_post(session.conn().await?, post.id).await
    }

    /// Import content for position `order` of `post`
    ///
    /// The file row is created if needed and flushed so it has an id before
    /// anything is written to disk. Its flags and classification are saved
    /// even when one artifact fails, in which case the import error is
    /// returned afterwards.
    #[instrument(skip(self, session, post, original, thumbnail), fields(service = %self.source.name, post_id = post.id))]
    pub async fn store_file(
        &self,
        session: &mut Session,
        post: &RemotePost,
        order: i64,
        original: Option<&Path>,
        thumbnail: Option<&Path>,
        transfer: Transfer,
    ) -> Result<File> {
        let conn = session.conn().await?;

        let mut file = match files::get_for_post_order(&mut *conn, post.id, order).await? {
            Some(file) => file,
            None => {
                let mut file = File::for_post(post.id, order);
                files::insert(&mut *conn, &mut file).await?;
                file
            },
        };

        let outcome = self
            .storage()
            .import_file(&mut file, original, thumbnail, transfer)
            .await;

        files::update(session.conn().await?, &file).await?;
        outcome?;

        Ok(file)
    }

    /// Stream `url` into a temporary file for a later [`Transfer::Move`]
    pub async fn download(&self, url: &str) -> Result<TempPath> {
        net::download_to_temp(self.http(), url).await
    }

    pub async fn subscriptions(&self, session: &mut Session) -> Result<Vec<Subscription>> {
        subscriptions::by_source(session.conn().await?, self.source.id).await
    }

    pub async fn subscription(&self, session: &mut Session, name: &str) -> Result<Subscription> {
        subscriptions::get_by_name(session.conn().await?, self.source.id, name)
            .await?
            .ok_or_else(|| HoardError::not_found("subscription", name))
    }

    /// Existing subscriptions equivalent to `repr`; duplicates are not
    /// prevented, callers decide what to do with them
    pub async fn find_subscriptions(
        &self,
        session: &mut Session,
        repr: &str,
    ) -> Result<Vec<Subscription>> {
        subscriptions::find_by_repr(session.conn().await?, self.source.id, repr).await
    }
}
