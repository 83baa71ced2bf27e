// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Entity sync handlers.
//!
//! Each entity kind has one handler that turns a queued operation into
//! exactly one remote write. Remote rows carry the payload fields plus the
//! local record `id` and the configured `user_id`.

use serde::Serialize;

use outbox_core::entity::{Calculation, ChecklistProgress, Favorite, SavedSearch};
use outbox_core::protocol::{RemoteRequest, Row};
use outbox_core::{EntityData, EntityKind, QueueItem, SyncAction};

use super::remote::{Remote, RemoteError, RemoteResult};

/// The local record a successful write satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub kind: EntityKind,
    pub id: String,
}

/// Maps one entity kind's operations onto its remote table.
pub trait EntityHandler {
    type Payload: Serialize;

    const KIND: EntityKind;

    /// Remote write for a create.
    fn create(&self, row: Row) -> RemoteRequest;

    /// Remote write for an update.
    fn update(&self, row: Row) -> RemoteRequest;

    /// Columns identifying the remote row(s) a delete removes.
    fn delete_filter(&self) -> &'static [&'static str];

    /// Builds the single remote write for one queued operation.
    fn request(
        &self,
        action: SyncAction,
        user_id: &str,
        record_id: &str,
        payload: &Self::Payload,
    ) -> RemoteResult<RemoteRequest> {
        let row = to_row(user_id, record_id, payload)?;
        Ok(match action {
            SyncAction::Create => self.create(row),
            SyncAction::Update => self.update(row),
            SyncAction::Delete => {
                RemoteRequest::delete(Self::KIND.table(), select(&row, self.delete_filter()))
            }
        })
    }
}

fn to_row<P: Serialize>(user_id: &str, record_id: &str, payload: &P) -> RemoteResult<Row> {
    let value =
        serde_json::to_value(payload).map_err(|e| RemoteError::InvalidRequest(e.to_string()))?;
    let serde_json::Value::Object(mut row) = value else {
        return Err(RemoteError::InvalidRequest(
            "payload is not a JSON object".to_string(),
        ));
    };
    row.insert("id".to_string(), record_id.into());
    row.insert("user_id".to_string(), user_id.into());
    Ok(row)
}

fn select(row: &Row, columns: &[&str]) -> Row {
    columns
        .iter()
        .filter_map(|c| row.get(*c).map(|v| (c.to_string(), v.clone())))
        .collect()
}

pub struct CalculationHandler;

impl EntityHandler for CalculationHandler {
    type Payload = Calculation;
    const KIND: EntityKind = EntityKind::Calculation;

    fn create(&self, row: Row) -> RemoteRequest {
        RemoteRequest::insert(Self::KIND.table(), row)
    }

    fn update(&self, row: Row) -> RemoteRequest {
        RemoteRequest::upsert(Self::KIND.table(), row, &["id"])
    }

    fn delete_filter(&self) -> &'static [&'static str] {
        &["id", "user_id"]
    }
}

/// Checklist progress has one remote row per (user, checklist), so create
/// and update are the same upsert.
pub struct ChecklistHandler;

impl ChecklistHandler {
    const CONFLICT: &'static [&'static str] = &["user_id", "checklist_id"];
}

impl EntityHandler for ChecklistHandler {
    type Payload = ChecklistProgress;
    const KIND: EntityKind = EntityKind::Checklist;

    fn create(&self, row: Row) -> RemoteRequest {
        RemoteRequest::upsert(Self::KIND.table(), row, Self::CONFLICT)
    }

    fn update(&self, row: Row) -> RemoteRequest {
        RemoteRequest::upsert(Self::KIND.table(), row, Self::CONFLICT)
    }

    fn delete_filter(&self) -> &'static [&'static str] {
        Self::CONFLICT
    }
}

pub struct FavoriteHandler;

impl EntityHandler for FavoriteHandler {
    type Payload = Favorite;
    const KIND: EntityKind = EntityKind::Favorite;

    fn create(&self, row: Row) -> RemoteRequest {
        RemoteRequest::insert(Self::KIND.table(), row)
    }

    fn update(&self, row: Row) -> RemoteRequest {
        RemoteRequest::upsert(
            Self::KIND.table(),
            row,
            &["user_id", "item_type", "item_id"],
        )
    }

    fn delete_filter(&self) -> &'static [&'static str] {
        &["user_id", "item_type", "item_id"]
    }
}

pub struct SearchHandler;

impl EntityHandler for SearchHandler {
    type Payload = SavedSearch;
    const KIND: EntityKind = EntityKind::Search;

    fn create(&self, row: Row) -> RemoteRequest {
        RemoteRequest::insert(Self::KIND.table(), row)
    }

    fn update(&self, row: Row) -> RemoteRequest {
        RemoteRequest::upsert(Self::KIND.table(), row, &["id"])
    }

    fn delete_filter(&self) -> &'static [&'static str] {
        &["id", "user_id"]
    }
}

/// Routes queue items to the handler for their entity kind.
#[derive(Debug, Clone)]
pub struct Handlers {
    user_id: String,
}

impl Handlers {
    pub fn new(user_id: impl Into<String>) -> Self {
        Handlers {
            user_id: user_id.into(),
        }
    }

    /// The remote write for a queue item.
    pub fn request_for(&self, item: &QueueItem) -> RemoteResult<RemoteRequest> {
        let (action, user, id) = (item.action, self.user_id.as_str(), item.record_id.as_str());
        match &item.entity {
            EntityData::Calculation(p) => CalculationHandler.request(action, user, id, p),
            EntityData::Checklist(p) => ChecklistHandler.request(action, user, id, p),
            EntityData::Favorite(p) => FavoriteHandler.request(action, user, id, p),
            EntityData::Search(p) => SearchHandler.request(action, user, id, p),
        }
    }

    /// Applies one queue item remotely and reports the record it satisfied.
    pub async fn dispatch<R: Remote + ?Sized>(
        &self,
        remote: &R,
        item: &QueueItem,
    ) -> RemoteResult<RecordRef> {
        let request = self.request_for(item)?;
        tracing::debug!(
            item = %item.id,
            table = %request.table,
            op = request.op_name(),
            "dispatching"
        );
        remote.apply(request).await?;
        Ok(RecordRef {
            kind: item.kind(),
            id: item.record_id.clone(),
        })
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
