//! Resumable search iteration
//!
//! An adapter supplies a [`PostIterator`]: the code that talks to the source
//! and records what it finds. The core wraps it in a [`SearchIterator`] that
//! owns the search `options` and the adapter's checkpoint `state`, and
//! decides when the checkpoint moves.
//!
//! The adapter only ever sees a working copy of `state`. That copy replaces
//! the real one (and, for subscriptions, is written to the database) only
//! after `fetch` returns `Ok`. A fetch that fails part way leaves `state`
//! exactly as it was; the posts and files it recorded before failing stay in
//! the caller's session.

use crate::db::{files, posts, subscriptions, Session};
use crate::models::{RemotePost, Subscription};
use crate::plugin::PluginCore;
use async_trait::async_trait;
use hoard_common::{Dynamic, HoardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument, warn};

/// Which side of the checkpoint to fetch from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchDirection {
    /// Posts preceding the oldest one already seen
    Older,
    /// Posts more recent than the checkpoint
    #[default]
    Newer,
}

impl fmt::Display for FetchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchDirection::Older => write!(f, "older"),
            FetchDirection::Newer => write!(f, "newer"),
        }
    }
}

/// What an adapter's fetch gets to work with
pub struct FetchContext<'a> {
    pub session: &'a mut Session,
    pub core: &'a PluginCore,
    pub options: &'a Dynamic,
    /// Working copy of the checkpoint
    pub state: &'a mut Dynamic,
    /// Import thumbnails only
    pub preview: bool,
}

/// The source-specific half of a search
#[async_trait]
pub trait PostIterator: Send + Sync {
    /// One-time setup for a new subscription, before its options and state
    /// are stored. Never called when resuming.
    async fn init(
        &self,
        _core: &PluginCore,
        _options: &mut Dynamic,
        _state: &mut Dynamic,
    ) -> Result<()> {
        Ok(())
    }

    /// Record at least `n` posts from `direction` when that many exist
    ///
    /// Posts must come in the same order on every call. Each returned post
    /// must already be stored through `ctx.core`, with its thumbnail
    /// imported. The checkpoint is advanced by updating `ctx.state`.
    async fn fetch(
        &self,
        ctx: &mut FetchContext<'_>,
        direction: FetchDirection,
        n: usize,
    ) -> Result<Vec<RemotePost>>;
}

/// Extra guarantees checked on every fetched batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Contract {
    Search,
    /// Every post needs a present thumbnail and a related URL
    ReverseSearch,
}

/// A search bound either to fresh options or to a stored subscription
pub struct SearchIterator {
    core: PluginCore,
    source: Box<dyn PostIterator>,
    options: Dynamic,
    state: Dynamic,
    subscription: Option<Subscription>,
    preview: bool,
    contract: Contract,
}

impl SearchIterator {
    /// A one-shot search starting from an empty checkpoint
    pub fn ephemeral(core: PluginCore, source: Box<dyn PostIterator>, options: Dynamic) -> Self {
        Self {
            core,
            source,
            options,
            state: Dynamic::new(),
            subscription: None,
            preview: false,
            contract: Contract::Search,
        }
    }

    /// Continue a stored subscription from its checkpoint
    pub fn resume(
        core: PluginCore,
        source: Box<dyn PostIterator>,
        subscription: Subscription,
    ) -> Result<Self> {
        if subscription.source_id != core.source().id {
            return Err(HoardError::Validation(format!(
                "subscription '{}' belongs to service {}, not '{}'",
                subscription.name,
                subscription.source_id,
                core.source().name
            )));
        }

        Ok(Self {
            options: subscription.options()?,
            state: subscription.state()?,
            core,
            source,
            subscription: Some(subscription),
            preview: false,
            contract: Contract::Search,
        })
    }

    pub(crate) fn with_contract(mut self, contract: Contract) -> Self {
        self.contract = contract;
        self
    }

    /// Only import thumbnails during fetches
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn options(&self) -> &Dynamic {
        &self.options
    }

    pub fn state(&self) -> &Dynamic {
        &self.state
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    pub fn core(&self) -> &PluginCore {
        &self.core
    }

    /// Run the adapter's one-time setup
    pub(crate) async fn init(&mut self) -> Result<()> {
        self.source
            .init(&self.core, &mut self.options, &mut self.state)
            .await
    }

    /// Store this search as a subscription called `name` and bind to it
    pub(crate) async fn bind(&mut self, session: &mut Session, name: &str, repr: &str) -> Result<()> {
        if self.subscription.is_some() {
            return Err(HoardError::Validation(format!(
                "search is already bound to a subscription; cannot rebind as '{}'",
                name
            )));
        }

        let subscription = subscriptions::insert(
            session.conn().await?,
            self.core.source().id,
            name,
            repr,
            &self.options.to_json(),
            &self.state.to_json(),
        )
        .await?;

        info!(
            service = %self.core.source().name,
            subscription = %subscription.name,
            repr = %subscription.repr,
            "Created subscription"
        );

        self.subscription = Some(subscription);
        Ok(())
    }

    /// Fetch at least `n` posts from `direction`
    ///
    /// On success the checkpoint advances and, for a subscription, the new
    /// state is written through `session`. On failure the checkpoint is left
    /// untouched.
    #[instrument(
        skip(self, session),
        fields(
            service = %self.core.source().name,
            subscription = self.subscription.as_ref().map(|s| s.name.as_str()),
        )
    )]
    pub async fn fetch(
        &mut self,
        session: &mut Session,
        direction: FetchDirection,
        n: usize,
    ) -> Result<Vec<RemotePost>> {
        let mut working = self.state.clone();

        let fetched = {
            let mut ctx = FetchContext {
                session: &mut *session,
                core: &self.core,
                options: &self.options,
                state: &mut working,
                preview: self.preview,
            };
            self.source.fetch(&mut ctx, direction, n).await
        };

        let posts = match fetched {
            Ok(posts) => posts,
            Err(e) => {
                warn!(error = %e, "Fetch failed, checkpoint unchanged");
                return Err(e);
            },
        };

        if self.contract == Contract::ReverseSearch {
            for post in &posts {
                check_reverse_result(session, post).await?;
            }
        }

        if working != self.state {
            if let Some(subscription) = self.subscription.as_mut() {
                let state = working.to_json();
                subscriptions::update_state(session.conn().await?, subscription.id, &state)
                    .await?;
                subscription.state = state;
            }
            self.state = working;
        }

        info!(count = posts.len(), "Fetched posts");
        Ok(posts)
    }
}

impl fmt::Debug for SearchIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchIterator")
            .field("service", &self.core.source().name)
            .field("options", &self.options)
            .field("state", &self.state)
            .field("subscription", &self.subscription.as_ref().map(|s| &s.name))
            .field("preview", &self.preview)
            .finish()
    }
}

async fn check_reverse_result(session: &mut Session, post: &RemotePost) -> Result<()> {
    let conn = session.conn().await?;

    let has_thumbnail = files::for_post(&mut *conn, post.id)
        .await?
        .iter()
        .any(|f| f.thumb_present);
    if !has_thumbnail {
        return Err(HoardError::InvalidPost(format!(
            "reverse search result {} has no thumbnail",
            post.id
        )));
    }

    if posts::related_urls(conn, post.id).await?.is_empty() {
        return Err(HoardError::InvalidPost(format!(
            "reverse search result {} has no related url",
            post.id
        )));
    }

    Ok(())
}
