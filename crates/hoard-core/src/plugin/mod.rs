//! Source adapter contract
//!
//! Every adapter implements [`Plugin`] plus exactly one of two capability
//! traits:
//!
//! - [`SearchPlugin`] for sources that can be searched and subscribed to
//! - [`ReverseSearchPlugin`] for sources that find posts matching a given
//!   image; these have no subscriptions, so the trait has no way to ask for one
//!
//! Configuration and versioning go through the static [`PluginFactory`] side,
//! driven by [`load_plugin`]. Hosts that hold adapters of both kinds in one
//! collection use [`AnyPlugin`].

mod dispatch;
pub mod form;
mod host;
mod loader;

pub use dispatch::AnyPlugin;
pub use form::{FieldKind, Form, FormField};
pub use host::{Configured, PluginCore};
pub use loader::load_plugin;

use crate::db::Session;
use crate::models::{RemotePost, Subscription};
use crate::subscription::{Contract, PostIterator, SearchIterator};
use async_trait::async_trait;
use hoard_common::{Dynamic, HoardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use url::Url;

/// What a URL points at on a source
#[derive(Debug, Clone, PartialEq)]
pub enum UrlTarget {
    /// A single post, by the source's own id
    Post(String),
    /// A set of posts, as options for [`SearchPlugin::search`]
    Search(Dynamic),
}

/// Which post [`Plugin::download`] should fetch
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadTarget {
    /// By the source's id
    Id(String),
    /// Refresh a stored post in place, using its known original id
    Existing(RemotePost),
}

impl DownloadTarget {
    /// The source's id for the post
    pub fn original_id(&self) -> Result<&str> {
        match self {
            DownloadTarget::Id(id) => Ok(id),
            DownloadTarget::Existing(post) => post.original_id.as_deref().ok_or_else(|| {
                HoardError::InvalidPost(format!("post {} has no original id", post.id))
            }),
        }
    }
}

/// Description of what a search would return
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDetails {
    pub hint: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub related_urls: BTreeSet<String>,
}

/// Result of the two-phase configuration handshake
#[derive(Debug)]
pub enum PluginInit<P> {
    Ready(P),
    /// More input is needed, e.g. tokens from an OAuth flow
    NeedsInput(Form),
}

impl<P> PluginInit<P> {
    pub fn is_ready(&self) -> bool {
        matches!(self, PluginInit::Ready(_))
    }

    pub fn ready(self) -> Option<P> {
        match self {
            PluginInit::Ready(plugin) => Some(plugin),
            PluginInit::NeedsInput(_) => None,
        }
    }
}

/// Static side of an adapter: identity, version and configuration
#[async_trait]
pub trait PluginFactory: Sized + Send + Sync {
    /// Service name the adapter registers under
    const NAME: &'static str;
    /// Current adapter version; stored services below it get [`update`](Self::update)d
    const VERSION: i64;

    /// Everything the adapter can be configured with
    fn config_form() -> Form;

    /// Build the adapter from its stored configuration plus `parameters`,
    /// or describe what is still missing
    async fn init(
        core: PluginCore,
        session: &mut Session,
        parameters: Option<Dynamic>,
    ) -> Result<PluginInit<Self>>;

    /// Migrate data stored by an older version
    async fn update(_core: &mut PluginCore, _session: &mut Session) -> Result<()> {
        Ok(())
    }
}

/// Operations every adapter supports
#[async_trait]
pub trait Plugin: Send + Sync {
    fn core(&self) -> &PluginCore;

    fn name(&self) -> &str {
        &self.core().source().name
    }

    /// Classify a URL as a post, a search, or neither
    fn parse_url(&self, _url: &str) -> Option<UrlTarget> {
        None
    }

    /// Create or refresh a post with all its files
    ///
    /// Files and thumbnails not yet present are imported; with `preview`
    /// only thumbnails are.
    async fn download(
        &self,
        session: &mut Session,
        target: DownloadTarget,
        preview: bool,
    ) -> Result<RemotePost>;

    /// The form(s) used to build search options
    fn search_form(&self) -> Option<Form> {
        None
    }

    async fn get_search_details(&self, _options: &Dynamic) -> Result<Option<SearchDetails>> {
        Ok(None)
    }
}

/// An adapter whose searches can be kept as subscriptions
#[async_trait]
pub trait SearchPlugin: Plugin {
    /// A fresh instance of the adapter's fetch logic
    fn iterator(&self) -> Box<dyn PostIterator>;

    /// Short normalized form of `options`, used to spot duplicate
    /// subscriptions
    fn subscription_repr(&self, options: &Dynamic) -> Result<String>;

    /// A one-shot search
    fn search(&self, options: Dynamic) -> SearchIterator {
        SearchIterator::ephemeral(self.core().clone(), self.iterator(), options)
    }

    /// Store a new subscription for `options` without fetching anything
    ///
    /// The iterator's `init` runs first, so the stored options and state are
    /// the ones it settled on.
    async fn subscribe(
        &self,
        session: &mut Session,
        name: &str,
        options: Dynamic,
    ) -> Result<SearchIterator> {
        let mut iterator = self.search(options);
        iterator.init().await?;
        let repr = self.subscription_repr(iterator.options())?;
        iterator.bind(session, name, &repr).await?;
        Ok(iterator)
    }

    /// Resume a stored subscription
    fn get_iterator(&self, subscription: Subscription) -> Result<SearchIterator> {
        SearchIterator::resume(self.core().clone(), self.iterator(), subscription)
    }
}

/// What to look for in a reverse search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReverseQuery {
    Url(Url),
    Path(PathBuf),
}

impl ReverseQuery {
    /// Accepts `{"url": "https://..."}` or `{"path": "/home/..."}`
    pub fn from_options(options: &Dynamic) -> Result<Self> {
        match (options.get_str("url"), options.get_str("path")) {
            (Some(url), None) => Url::parse(url)
                .map(ReverseQuery::Url)
                .map_err(|e| HoardError::Validation(format!("invalid url '{}': {}", url, e))),
            (None, Some(path)) => Ok(ReverseQuery::Path(PathBuf::from(path))),
            _ => Err(HoardError::Validation(
                "reverse search options need exactly one of 'url' or 'path'".to_string(),
            )),
        }
    }

    pub fn to_options(&self) -> Dynamic {
        let mut map = serde_json::Map::new();
        match self {
            ReverseQuery::Url(url) => {
                map.insert("url".into(), url.as_str().into());
            },
            ReverseQuery::Path(path) => {
                map.insert("path".into(), path.to_string_lossy().into_owned().into());
            },
        }
        Dynamic::from(map)
    }
}

/// An adapter that finds posts matching existing content
///
/// Searches are one-shot; every post they return carries at least one
/// imported thumbnail and one related URL.
pub trait ReverseSearchPlugin: Plugin {
    fn iterator(&self) -> Box<dyn PostIterator>;

    fn search(&self, query: &ReverseQuery) -> SearchIterator {
        SearchIterator::ephemeral(self.core().clone(), self.iterator(), query.to_options())
            .with_contract(Contract::ReverseSearch)
    }
}
