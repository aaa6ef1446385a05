use super::{
    DownloadTarget, Plugin, ReverseQuery, ReverseSearchPlugin, SearchDetails, SearchPlugin,
    UrlTarget,
};
use crate::db::Session;
use crate::models::{RemotePost, Subscription};
use crate::subscription::SearchIterator;
use hoard_common::{Dynamic, HoardError, Result};
use std::sync::Arc;
use tracing::warn;

/// An adapter of either kind
///
/// Subscription operations on a reverse-search adapter fail with
/// [`HoardError::Unsupported`] before anything else is looked at.
#[derive(Clone)]
pub enum AnyPlugin {
    Search(Arc<dyn SearchPlugin>),
    ReverseSearch(Arc<dyn ReverseSearchPlugin>),
}

impl AnyPlugin {
    pub fn name(&self) -> &str {
        match self {
            AnyPlugin::Search(plugin) => plugin.name(),
            AnyPlugin::ReverseSearch(plugin) => plugin.name(),
        }
    }

    pub fn supports_subscriptions(&self) -> bool {
        matches!(self, AnyPlugin::Search(_))
    }

    pub fn parse_url(&self, url: &str) -> Option<UrlTarget> {
        match self {
            AnyPlugin::Search(plugin) => plugin.parse_url(url),
            AnyPlugin::ReverseSearch(plugin) => plugin.parse_url(url),
        }
    }

    pub async fn download(
        &self,
        session: &mut Session,
        target: DownloadTarget,
        preview: bool,
    ) -> Result<RemotePost> {
        match self {
            AnyPlugin::Search(plugin) => plugin.download(session, target, preview).await,
            AnyPlugin::ReverseSearch(plugin) => plugin.download(session, target, preview).await,
        }
    }

    pub async fn get_search_details(&self, options: &Dynamic) -> Result<Option<SearchDetails>> {
        match self {
            AnyPlugin::Search(plugin) => plugin.get_search_details(options).await,
            AnyPlugin::ReverseSearch(plugin) => plugin.get_search_details(options).await,
        }
    }

    /// A one-shot search; reverse-search adapters only accept `url` or
    /// `path` options
    pub fn search(&self, options: Dynamic) -> Result<SearchIterator> {
        match self {
            AnyPlugin::Search(plugin) => Ok(plugin.search(options)),
            AnyPlugin::ReverseSearch(plugin) => {
                let query = ReverseQuery::from_options(&options)?;
                Ok(plugin.search(&query))
            },
        }
    }

    pub fn subscription_repr(&self, options: &Dynamic) -> Result<String> {
        match self {
            AnyPlugin::Search(plugin) => plugin.subscription_repr(options),
            AnyPlugin::ReverseSearch(plugin) => {
                Err(unsupported(plugin.as_ref(), "subscription_repr"))
            },
        }
    }

    pub async fn subscribe(
        &self,
        session: &mut Session,
        name: &str,
        options: Dynamic,
    ) -> Result<SearchIterator> {
        match self {
            AnyPlugin::Search(plugin) => plugin.subscribe(session, name, options).await,
            AnyPlugin::ReverseSearch(plugin) => Err(unsupported(plugin.as_ref(), "subscribe")),
        }
    }

    pub fn get_iterator(&self, subscription: Subscription) -> Result<SearchIterator> {
        match self {
            AnyPlugin::Search(plugin) => plugin.get_iterator(subscription),
            AnyPlugin::ReverseSearch(plugin) => Err(unsupported(plugin.as_ref(), "get_iterator")),
        }
    }
}

fn unsupported(plugin: &dyn ReverseSearchPlugin, operation: &'static str) -> HoardError {
    warn!(plugin = plugin.name(), operation, "Unsupported operation on reverse search plugin");
    HoardError::unsupported(plugin.name(), operation)
}

impl std::fmt::Debug for AnyPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnyPlugin::Search(plugin) => f.debug_tuple("Search").field(&plugin.name()).finish(),
            AnyPlugin::ReverseSearch(plugin) => {
                f.debug_tuple("ReverseSearch").field(&plugin.name()).finish()
            },
        }
    }
}

impl<P: SearchPlugin + 'static> From<Arc<P>> for AnyPlugin {
    fn from(plugin: Arc<P>) -> Self {
        AnyPlugin::Search(plugin)
    }
}
