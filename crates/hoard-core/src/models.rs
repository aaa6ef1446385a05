//! Persisted records
//!
//! Rows map one-to-one onto the tables in `migrations/`. Adapter-owned
//! documents (`config`, `metadata`, `options`, `state`) are stored as JSON
//! text and exposed through [`Dynamic`] accessors.

use chrono::{DateTime, Utc};
use hoard_common::{Dynamic, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered source adapter's persistent identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub id: i64,
    /// Unique key; used as the lookup for get-or-create
    pub name: String,
    /// Last adapter version whose migrations ran; 0 for a new service
    pub version: i64,
    pub config: String,
}

impl Service {
    pub fn config(&self) -> Result<Dynamic> {
        Dynamic::from_json(&self.config)
    }
}

/// A stored media item
///
/// `id` is `None` until the row has been flushed; importing requires it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct File {
    pub id: Option<i64>,
    pub remote_id: Option<i64>,
    pub remote_order: i64,
    pub hash: Option<String>,
    pub mime: Option<String>,
    pub ext: Option<String>,
    pub file_present: bool,
    pub thumb_present: bool,
}

impl File {
    /// An unflushed file attached to position `order` of a post
    pub fn for_post(remote_id: i64, order: i64) -> Self {
        Self {
            remote_id: Some(remote_id),
            remote_order: order,
            ..Self::default()
        }
    }
}

/// A post as seen on a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RemotePost {
    pub id: i64,
    pub source_id: i64,
    /// The source's own identifier, unique per source
    pub original_id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub metadata: String,
    pub post_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RemotePost {
    pub fn metadata(&self) -> Result<Dynamic> {
        Dynamic::from_json(&self.metadata)
    }
}

/// Fields an adapter supplies when recording a post
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPost {
    pub original_id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub metadata: Dynamic,
    pub post_time: Option<DateTime<Utc>>,
}

impl NewPost {
    pub fn new(original_id: impl Into<String>) -> Self {
        Self {
            original_id: Some(original_id.into()),
            ..Self::default()
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn metadata(mut self, metadata: Dynamic) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn post_time(mut self, post_time: DateTime<Utc>) -> Self {
        self.post_time = Some(post_time);
        self
    }
}

/// A persisted, named, resumable search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub source_id: i64,
    pub name: String,
    /// Normalized rendering of the options, for spotting duplicates
    pub repr: String,
    pub options: String,
    /// Adapter-owned checkpoint
    pub state: String,
}

impl Subscription {
    pub fn options(&self) -> Result<Dynamic> {
        Dynamic::from_json(&self.options)
    }

    pub fn state(&self) -> Result<Dynamic> {
        Dynamic::from_json(&self.state)
    }
}
