//! Shared fixtures for hoard-core integration tests
//!
//! - [`TestArchive`]: a fresh archive on in-memory SQLite with its file tree
//!   in a temp directory
//! - [`Timeline`]: a scripted upstream with failure injection
//! - [`TimelinePlugin`]: a searchable adapter over a timeline
//! - [`LensPlugin`]: a reverse-search adapter over the same timeline
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestArchive, Timeline, TimelinePlugin};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let archive = TestArchive::new().await;
//!     let timeline = Timeline::with_posts(5);
//!     let plugin = TimelinePlugin::load(&archive, timeline).await;
//! }
//! ```

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use hoard_common::{Dynamic, HoardError, Result};
use hoard_core::config::Config;
use hoard_core::db::{Database, Session};
use hoard_core::plugin::{
    Configured, DownloadTarget, FieldKind, Form, FormField, Plugin, PluginCore, PluginFactory,
    PluginInit, ReverseSearchPlugin, SearchDetails, SearchPlugin, UrlTarget,
};
use hoard_core::subscription::FetchContext;
use hoard_core::{FetchDirection, Hoard, NewPost, PostIterator, RemotePost, Transfer};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::{TempDir, TempPath};

pub const TIMELINE: &str = "timeline";
pub const LENS: &str = "lens";

/// PNG magic followed by padding, enough for content sniffing
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

// ============================================================================
// Archive fixture
// ============================================================================

pub struct TestArchive {
    pub hoard: Hoard,
    pub dir: TempDir,
}

impl TestArchive {
    pub async fn new() -> Self {
        Self::with_slot_size(1000).await
    }

    pub async fn with_slot_size(slot_size: i64) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = Config::new(dir.path().join("archive")).with_files_slot_size(slot_size);
        let database = Database::in_memory().await.expect("Failed to open database");
        let hoard = Hoard::with_database(config, database)
            .await
            .expect("Failed to open archive");

        Self { hoard, dir }
    }

    pub fn session(&self) -> Session {
        self.hoard.session()
    }

    /// Write a scratch file outside the archive tree
    pub fn write_source(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.dir.path().join("incoming").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn files_root(&self) -> PathBuf {
        self.hoard.config().files_path()
    }

    pub fn thumbs_root(&self) -> PathBuf {
        self.hoard.config().thumbs_path()
    }
}

// ============================================================================
// Scripted upstream
// ============================================================================

#[derive(Debug, Clone)]
pub struct UpstreamPost {
    pub id: u64,
    pub title: String,
    pub has_original: bool,
}

pub fn post_url(id: u64) -> String {
    format!("https://timeline.test/post/{}", id)
}

#[derive(Debug, Default)]
pub struct Timeline {
    posts: Mutex<Vec<UpstreamPost>>,
    fail_after: Mutex<Option<usize>>,
    pub requests: AtomicUsize,
    pub inits: AtomicUsize,
}

impl Timeline {
    /// Posts 1..=count, each with an original
    pub fn with_posts(count: u64) -> Arc<Self> {
        let timeline = Self::default();
        for id in 1..=count {
            timeline.publish(id, &format!("post {}", id));
        }
        Arc::new(timeline)
    }

    pub fn publish(&self, id: u64, title: &str) {
        let mut posts = self.posts.lock().unwrap();
        posts.push(UpstreamPost {
            id,
            title: title.to_string(),
            has_original: true,
        });
        posts.sort_by_key(|p| p.id);
    }

    /// Make the next fetch fail after storing `processed` posts
    pub fn fail_after(&self, processed: usize) {
        *self.fail_after.lock().unwrap() = Some(processed);
    }

    pub fn get(&self, id: u64) -> Option<UpstreamPost> {
        self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned()
    }

    fn snapshot(&self) -> Vec<UpstreamPost> {
        self.posts.lock().unwrap().clone()
    }

    fn take_failure(&self) -> Option<usize> {
        self.fail_after.lock().unwrap().take()
    }
}

fn temp_with(suffix: &str, content: &[u8]) -> Result<TempPath> {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
    file.write_all(content)?;
    Ok(file.into_temp_path())
}

/// Record an upstream post the way an adapter would
pub async fn store_post(
    core: &PluginCore,
    session: &mut Session,
    post: &UpstreamPost,
    preview: bool,
    with_related: bool,
) -> Result<RemotePost> {
    let remote = core
        .upsert_post(
            session,
            NewPost::new(post.id.to_string())
                .url(post_url(post.id))
                .title(post.title.clone()),
        )
        .await?;

    let thumbnail = temp_with(".jpg", format!("thumb-{}", post.id).as_bytes())?;
    let original = if post.has_original && !preview {
        Some(temp_with(".png", PNG_BYTES)?)
    } else {
        None
    };

    core.store_file(
        session,
        &remote,
        0,
        original.as_deref(),
        Some(&*thumbnail),
        Transfer::Move,
    )
    .await?;

    if with_related {
        core.add_related(session, &remote, &post_url(post.id)).await?;
    }

    Ok(remote)
}

// ============================================================================
// Search adapter
// ============================================================================

pub struct TimelineIterator {
    timeline: Arc<Timeline>,
}

impl TimelineIterator {
    pub fn new(timeline: Arc<Timeline>) -> Self {
        Self { timeline }
    }
}

#[async_trait]
impl PostIterator for TimelineIterator {
    async fn init(
        &self,
        _core: &PluginCore,
        options: &mut Dynamic,
        _state: &mut Dynamic,
    ) -> Result<()> {
        self.timeline.inits.fetch_add(1, Ordering::SeqCst);
        if let Some(user) = options.get_str("user").map(str::to_string) {
            options.set("user_id", format!("uid-{}", user))?;
        }
        Ok(())
    }

    async fn fetch(
        &self,
        ctx: &mut FetchContext<'_>,
        direction: FetchDirection,
        n: usize,
    ) -> Result<Vec<RemotePost>> {
        self.timeline.requests.fetch_add(1, Ordering::SeqCst);

        let newest: Option<u64> = ctx.state.get("newest")?;
        let oldest: Option<u64> = ctx.state.get("oldest")?;
        let snapshot = self.timeline.snapshot();

        let batch: Vec<UpstreamPost> = match (direction, newest, oldest) {
            (FetchDirection::Newer, None, _) => {
                let skip = snapshot.len().saturating_sub(n);
                snapshot.into_iter().skip(skip).collect()
            },
            (FetchDirection::Newer, Some(newest), _) => snapshot
                .into_iter()
                .filter(|p| p.id > newest)
                .take(n)
                .collect(),
            (FetchDirection::Older, _, None) => Vec::new(),
            (FetchDirection::Older, _, Some(oldest)) => snapshot
                .into_iter()
                .rev()
                .filter(|p| p.id < oldest)
                .take(n)
                .collect(),
        };

        let fail_after = self.timeline.take_failure();
        let mut stored = Vec::with_capacity(batch.len());

        for (index, post) in batch.iter().enumerate() {
            if fail_after == Some(index) {
                return Err(HoardError::fetch(TIMELINE, "connection reset"));
            }

            stored.push(store_post(ctx.core, ctx.session, post, ctx.preview, true).await?);

            let newest = ctx.state.get::<u64>("newest")?.map_or(post.id, |h| h.max(post.id));
            let oldest = ctx.state.get::<u64>("oldest")?.map_or(post.id, |t| t.min(post.id));
            ctx.state.set("newest", newest)?;
            ctx.state.set("oldest", oldest)?;
        }

        if fail_after.is_some() {
            return Err(HoardError::fetch(TIMELINE, "malformed page"));
        }

        Ok(stored)
    }
}

pub struct TimelinePlugin {
    core: PluginCore,
    timeline: Arc<Timeline>,
}

impl TimelinePlugin {
    /// Register the service and bind an adapter to `timeline`
    pub async fn load(archive: &TestArchive, timeline: Arc<Timeline>) -> Self {
        let mut session = archive.session();
        let core = archive.hoard.plugin_core(&mut session, TIMELINE).await.unwrap();
        session.commit().await.unwrap();
        Self { core, timeline }
    }
}

#[async_trait]
impl PluginFactory for TimelinePlugin {
    const NAME: &'static str = TIMELINE;
    const VERSION: i64 = 2;

    fn config_form() -> Form {
        Form::new("Timeline")
            .field(FormField::new("api_key", "API key", FieldKind::Password).required())
            .field(FormField::new("page_size", "Page size", FieldKind::Number))
    }

    async fn init(
        mut core: PluginCore,
        session: &mut Session,
        parameters: Option<Dynamic>,
    ) -> Result<PluginInit<Self>> {
        match core
            .configure(session, &Self::config_form(), parameters.as_ref())
            .await?
        {
            Configured::Complete(_) => Ok(PluginInit::Ready(Self {
                core,
                timeline: Arc::new(Timeline::default()),
            })),
            Configured::Incomplete(form) => Ok(PluginInit::NeedsInput(form)),
        }
    }

    async fn update(core: &mut PluginCore, session: &mut Session) -> Result<()> {
        let mut config = core.config()?;
        let mut migrations: Vec<i64> = config.get("migrations")?.unwrap_or_default();
        migrations.push(core.source().version);
        config.set("migrations", migrations)?;
        core.save_config(session, &config).await
    }
}

#[async_trait]
impl Plugin for TimelinePlugin {
    fn core(&self) -> &PluginCore {
        &self.core
    }

    fn parse_url(&self, url: &str) -> Option<UrlTarget> {
        let rest = url.strip_prefix("https://timeline.test/")?;
        if let Some(id) = rest.strip_prefix("post/") {
            return Some(UrlTarget::Post(id.to_string()));
        }
        let user = rest.strip_prefix("user/")?;
        let mut options = Dynamic::new();
        options.set("user", user).ok()?;
        Some(UrlTarget::Search(options))
    }

    async fn download(
        &self,
        session: &mut Session,
        target: DownloadTarget,
        preview: bool,
    ) -> Result<RemotePost> {
        let original_id = target.original_id()?;
        let post = original_id
            .parse::<u64>()
            .ok()
            .and_then(|id| self.timeline.get(id))
            .ok_or_else(|| HoardError::fetch(TIMELINE, format!("no post {}", original_id)))?;

        store_post(&self.core, session, &post, preview, true).await
    }

    fn search_form(&self) -> Option<Form> {
        Some(Form::new("Search").field(FormField::new("user", "User", FieldKind::Text).required()))
    }

    async fn get_search_details(&self, options: &Dynamic) -> Result<Option<SearchDetails>> {
        Ok(options.get_str("user").map(|user| SearchDetails {
            hint: Some(user.to_string()),
            title: Some(format!("{}'s timeline", user)),
            related_urls: [format!("https://timeline.test/user/{}", user)].into_iter().collect(),
            ..SearchDetails::default()
        }))
    }
}

impl SearchPlugin for TimelinePlugin {
    fn iterator(&self) -> Box<dyn PostIterator> {
        Box::new(TimelineIterator::new(Arc::clone(&self.timeline)))
    }

    fn subscription_repr(&self, options: &Dynamic) -> Result<String> {
        Ok(match options.get_str("user_id") {
            Some(user_id) => format!("user:{}", user_id),
            None => "all".to_string(),
        })
    }
}

// ============================================================================
// Reverse search adapter
// ============================================================================

/// Returns every timeline post whose title contains the queried file stem
pub struct LensIterator {
    timeline: Arc<Timeline>,
    with_related: bool,
}

#[async_trait]
impl PostIterator for LensIterator {
    async fn fetch(
        &self,
        ctx: &mut FetchContext<'_>,
        _direction: FetchDirection,
        n: usize,
    ) -> Result<Vec<RemotePost>> {
        if ctx.state.get::<bool>("done")?.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let needle = match (ctx.options.get_str("url"), ctx.options.get_str("path")) {
            (Some(url), _) => url.rsplit('/').next().unwrap_or_default().to_string(),
            (_, Some(path)) => std::path::Path::new(path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ => return Err(HoardError::fetch(LENS, "no query")),
        };

        let mut stored = Vec::new();
        for post in self
            .timeline
            .snapshot()
            .iter()
            .filter(|p| p.title.contains(&needle))
            .take(n)
        {
            stored.push(store_post(ctx.core, ctx.session, post, true, self.with_related).await?);
        }

        ctx.state.set("done", true)?;
        Ok(stored)
    }
}

pub struct LensPlugin {
    core: PluginCore,
    timeline: Arc<Timeline>,
    with_related: bool,
}

impl LensPlugin {
    pub async fn load(archive: &TestArchive, timeline: Arc<Timeline>) -> Self {
        let mut session = archive.session();
        let core = archive.hoard.plugin_core(&mut session, LENS).await.unwrap();
        session.commit().await.unwrap();
        Self {
            core,
            timeline,
            with_related: true,
        }
    }

    /// An adapter that forgets to record related URLs
    pub fn without_related(mut self) -> Self {
        self.with_related = false;
        self
    }
}

#[async_trait]
impl Plugin for LensPlugin {
    fn core(&self) -> &PluginCore {
        &self.core
    }

    async fn download(
        &self,
        session: &mut Session,
        target: DownloadTarget,
        preview: bool,
    ) -> Result<RemotePost> {
        let original_id = target.original_id()?;
        let post = original_id
            .parse::<u64>()
            .ok()
            .and_then(|id| self.timeline.get(id))
            .ok_or_else(|| HoardError::fetch(LENS, format!("no post {}", original_id)))?;

        store_post(&self.core, session, &post, preview, true).await
    }
}

impl ReverseSearchPlugin for LensPlugin {
    fn iterator(&self) -> Box<dyn PostIterator> {
        Box::new(LensIterator {
            timeline: Arc::clone(&self.timeline),
            with_related: self.with_related,
        })
    }
}
