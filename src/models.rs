use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Number of pins returned when the caller does not ask for a page size.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Link or image preview carried by a pinned message. Only lives inside a [`Pin`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    pub from_url: Option<String>,
    pub image_url: Option<String>,
    pub original_url: Option<String>,
    pub text: Option<String>,
}

/// A pinned Slack message as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pin {
    #[serde(skip_serializing, default)]
    #[schema(skip)]
    pub key: String,
    pub text: String,
    pub author_id: String,
    pub pinner_id: String,
    pub channel_id: String,
    pub pinned_ts: i64,
    pub created_ts: i64,
    /// Slack's message id within the channel, kept verbatim.
    pub ts: String,
    pub attachments: Vec<Attachment>,
}

/// Field set for a pin that has not been keyed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPin {
    pub text: String,
    pub author_id: String,
    pub pinner_id: String,
    pub channel_id: String,
    pub pinned_ts: i64,
    pub created_ts: i64,
    pub ts: String,
    pub attachments: Vec<Attachment>,
}

impl NewPin {
    pub fn key(&self) -> String {
        build_key(&self.channel_id, &self.ts)
    }

    pub fn into_pin(self) -> Pin {
        Pin {
            key: self.key(),
            text: self.text,
            author_id: self.author_id,
            pinner_id: self.pinner_id,
            channel_id: self.channel_id,
            pinned_ts: self.pinned_ts,
            created_ts: self.created_ts,
            ts: self.ts,
            attachments: self.attachments,
        }
    }
}

/// `channel_id + "_" + ts`. Replays of the same message map to the same key.
pub fn build_key(channel_id: &str, ts: &str) -> String {
    format!("{channel_id}_{ts}")
}

/// Newest-first pin listing, optionally restricted to one author.
/// Holds no cursor, so the same query can be executed again from the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinQuery {
    pub author_id: Option<String>,
    pub limit: usize,
}

impl PinQuery {
    pub fn all() -> Self {
        Self { author_id: None, limit: DEFAULT_PAGE_SIZE }
    }

    pub fn by_author(author_id: impl Into<String>) -> Self {
        Self { author_id: Some(author_id.into()), limit: DEFAULT_PAGE_SIZE }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn matches(&self, pin: &Pin) -> bool {
        self.author_id.as_deref().map_or(true, |a| pin.author_id == a)
    }
}

impl Default for PinQuery {
    fn default() -> Self { Self::all() }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PinList {
    pub pins: Vec<Pin>,
}

/// `{"data": {...}}` envelope used by the JSON API.
#[derive(Debug, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}
