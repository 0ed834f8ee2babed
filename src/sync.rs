//! The sync coordinator. A sync call is a full replace, not a diff: the
//! client is the source of truth for its own bookmark tree, so the prior
//! set is discarded and rebuilt from the submission inside one
//! transaction. The operation is idempotent and an empty list legitimately
//! clears everything.

use serde::Serialize;
use serde_json::Value;

use crate::db::Database;
use crate::error::SyncError;
use crate::model::BookmarkItem;

#[derive(Debug, Serialize)]
pub struct SyncAck {
    pub user_id: i64,
    /// Rows stored after within-batch dedup on url.
    pub synced: u64,
}

/// Validates the raw `{ userId, bookmarks }` body and reconciles the
/// submitted set against the store. Validation failures return
/// `InvalidPayload` before any store mutation; store failures roll the
/// replace back entirely, so the caller may safely retry with the same
/// payload.
pub async fn sync(db: &Database, payload: &Value) -> Result<SyncAck, SyncError> {
    let user_id = parse_user_id(payload)?;
    let items = parse_items(payload)?;

    // no upstream auth layer here, so reject unknown users before mutating
    let known = db
        .user_exists(user_id)
        .await
        .map_err(SyncError::StoreFailure)?;
    if !known {
        return Err(SyncError::InvalidPayload(format!("unknown userId {user_id}")));
    }

    let synced = db
        .replace_bookmarks(user_id, &items)
        .await
        .map_err(SyncError::StoreFailure)?;

    tracing::info!(user_id, submitted = items.len(), synced, "bookmarks replaced");
    Ok(SyncAck { user_id, synced })
}

fn parse_user_id(payload: &Value) -> Result<i64, SyncError> {
    match payload.get("userId") {
        Some(value) => match value.as_i64() {
            Some(id) if id > 0 => Ok(id),
            _ => Err(SyncError::InvalidPayload(
                "userId must be a positive integer".to_string(),
            )),
        },
        None => Err(SyncError::InvalidPayload("missing userId".to_string())),
    }
}

fn parse_items(payload: &Value) -> Result<Vec<BookmarkItem>, SyncError> {
    let entries = match payload.get("bookmarks") {
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(SyncError::InvalidPayload(
                "bookmarks must be a list".to_string(),
            ));
        }
        None => return Err(SyncError::InvalidPayload("missing bookmarks".to_string())),
    };

    entries.iter().enumerate().map(parse_item).collect()
}

fn parse_item((index, entry): (usize, &Value)) -> Result<BookmarkItem, SyncError> {
    let title = entry.get("title").and_then(Value::as_str).unwrap_or("");
    let url = entry.get("url").and_then(Value::as_str).unwrap_or("");

    if title.is_empty() || url.is_empty() {
        return Err(SyncError::InvalidPayload(format!(
            "bookmarks[{index}] must have a non-empty title and url"
        )));
    }

    Ok(BookmarkItem {
        title: title.to_string(),
        url: url.to_string(),
    })
}
