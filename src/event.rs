//! Slack `pin_added` event decoding.
//!
//! The webhook body is walked by explicit paths so a malformed event fails with
//! the exact missing or mistyped field instead of somewhere deep in field access.
//! Nothing is written unless every required field decoded.

use serde_json::{Map, Value};
use tracing::{error, info};

use crate::models::{Attachment, NewPin};
use crate::repo::{PinRepo, RepoError};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("missing field `{path}`")]
    MissingField { path: String },
    #[error("field `{path}` is not {expected}")]
    InvalidField { path: String, expected: &'static str },
}

impl EventError {
    pub fn path(&self) -> &str {
        match self {
            EventError::MissingField { path } | EventError::InvalidField { path, .. } => path,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("malformed event: {0}")]
    Malformed(#[from] EventError),
    #[error(transparent)]
    Store(#[from] RepoError),
}

/// Maps one raw attachment into an [`Attachment`]. Keys that are absent, null
/// or not strings come out as `None`; no URL validation happens here.
pub fn map_attachment(raw: &Map<String, Value>) -> Attachment {
    let field = |name: &str| raw.get(name).and_then(Value::as_str).map(str::to_owned);
    Attachment {
        from_url: field("from_url"),
        image_url: field("image_url"),
        original_url: field("original_url"),
        text: field("text"),
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Result<&'a Value, EventError> {
    let pointer = format!("/{}", path.replace('.', "/"));
    match root.pointer(&pointer) {
        Some(Value::Null) | None => Err(EventError::MissingField { path: path.to_owned() }),
        Some(v) => Ok(v),
    }
}

fn string_at(root: &Value, path: &str) -> Result<String, EventError> {
    lookup(root, path)?
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| EventError::InvalidField { path: path.to_owned(), expected: "a string" })
}

fn int_at(root: &Value, path: &str) -> Result<i64, EventError> {
    lookup(root, path)?
        .as_i64()
        .ok_or_else(|| EventError::InvalidField { path: path.to_owned(), expected: "an integer" })
}

fn attachments_at(root: &Value, path: &str) -> Result<Vec<Attachment>, EventError> {
    let items = match lookup(root, path) {
        Err(EventError::MissingField { .. }) => return Ok(Vec::new()),
        Err(e) => return Err(e),
        Ok(v) => v
            .as_array()
            .ok_or_else(|| EventError::InvalidField { path: path.to_owned(), expected: "an array" })?,
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_object()
                .map(map_attachment)
                .ok_or_else(|| EventError::InvalidField { path: format!("{path}[{i}]"), expected: "an object" })
        })
        .collect()
}

/// Decodes a full `event_callback` body into the pin it describes.
pub fn parse_pin_event(body: &Value) -> Result<NewPin, EventError> {
    Ok(NewPin {
        text: string_at(body, "event.item.message.text")?,
        author_id: string_at(body, "event.item.message.user")?,
        ts: string_at(body, "event.item.message.ts")?,
        attachments: attachments_at(body, "event.item.message.attachments")?,
        created_ts: int_at(body, "event.item.created")?,
        pinner_id: string_at(body, "event.pinned_info.pinned_by")?,
        channel_id: string_at(body, "event.pinned_info.channel")?,
        pinned_ts: int_at(body, "event.pinned_info.pinned_ts")?,
    })
}

/// Decodes the event and stores its pin, returning the pin key.
///
/// Replaying an event for a message that is already stored keeps the stored
/// pin untouched, even if the replayed fields differ.
pub async fn ingest_pin_event<R: PinRepo + ?Sized>(repo: &R, body: &Value) -> Result<String, IngestError> {
    let new = parse_pin_event(body).map_err(|e| {
        error!(path = e.path(), "rejecting malformed pin event: {e}");
        e
    })?;
    let attachments = new.attachments.len();
    let key = repo.create_pin(new).await?;
    info!(%key, attachments, "pin stored");
    Ok(key)
}
