// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Entity kinds and their strongly-typed payloads.
//!
//! Every locally recorded user action targets one of four entity kinds. The
//! payload for each kind is a dedicated struct, and [`EntityData`] is the
//! tagged union the store, the queue and the sync handlers pass around.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The kinds of records that are recorded locally and forwarded to the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A saved trip cost calculation.
    Calculation,
    /// Progress through a pre-trip checklist.
    Checklist,
    /// A bookmarked item (campground, route, ...).
    Favorite,
    /// A saved search query.
    Search,
}

impl EntityKind {
    /// All kinds, in display order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Calculation,
        EntityKind::Checklist,
        EntityKind::Favorite,
        EntityKind::Search,
    ];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Calculation => "calculation",
            EntityKind::Checklist => "checklist",
            EntityKind::Favorite => "favorite",
            EntityKind::Search => "search",
        }
    }

    /// Name of the table holding records of this kind, locally and remotely.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Calculation => "calculations",
            EntityKind::Checklist => "checklist_progress",
            EntityKind::Favorite => "favorites",
            EntityKind::Search => "saved_searches",
        }
    }

    /// Prefix for generated record ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Calculation => "calc",
            EntityKind::Checklist => "check",
            EntityKind::Favorite => "fav",
            EntityKind::Search => "search",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "calculation" | "calc" => Ok(EntityKind::Calculation),
            "checklist" => Ok(EntityKind::Checklist),
            "favorite" | "fav" => Ok(EntityKind::Favorite),
            "search" => Ok(EntityKind::Search),
            _ => Err(Error::InvalidEntityKind(s.to_string())),
        }
    }
}

/// The operation a queue item asks the remote to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" => Ok(SyncAction::Create),
            "update" => Ok(SyncAction::Update),
            "delete" => Ok(SyncAction::Delete),
            _ => Err(Error::InvalidAction(s.to_string())),
        }
    }
}

/// A saved trip cost calculation: the named inputs and the computed results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub name: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, f64>,
    #[serde(default)]
    pub results: BTreeMap<String, f64>,
}

/// One line of a checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub done: bool,
}

/// Progress through one checklist. Keyed remotely by (user, checklist).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistProgress {
    pub checklist_id: String,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
    /// Completion percentage, 0..=100.
    #[serde(default)]
    pub progress: u8,
}

impl ChecklistProgress {
    /// Percentage of items marked done, rounded down. Empty checklists are 0.
    pub fn computed_progress(&self) -> u8 {
        if self.items.is_empty() {
            return 0;
        }
        let done = self.items.iter().filter(|i| i.done).count();
        u8::try_from(done * 100 / self.items.len()).unwrap_or(100)
    }
}

/// A bookmarked item together with a snapshot of its data at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub item_type: String,
    pub item_id: String,
    #[serde(default)]
    pub item_data: serde_json::Value,
}

/// A named search with its filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub name: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

/// Payload of a record or queue item, tagged by entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum EntityData {
    Calculation(Calculation),
    Checklist(ChecklistProgress),
    Favorite(Favorite),
    Search(SavedSearch),
}

impl EntityData {
    /// The kind of entity this payload belongs to.
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Calculation(_) => EntityKind::Calculation,
            EntityData::Checklist(_) => EntityKind::Checklist,
            EntityData::Favorite(_) => EntityKind::Favorite,
            EntityData::Search(_) => EntityKind::Search,
        }
    }

    /// Parses a bare payload (without the kind tag) for the given kind.
    pub fn from_json(kind: EntityKind, json: &str) -> Result<Self> {
        let invalid = |e: serde_json::Error| Error::InvalidPayload {
            kind: kind.to_string(),
            reason: e.to_string(),
        };
        Ok(match kind {
            EntityKind::Calculation => {
                EntityData::Calculation(serde_json::from_str(json).map_err(invalid)?)
            }
            EntityKind::Checklist => {
                EntityData::Checklist(serde_json::from_str(json).map_err(invalid)?)
            }
            EntityKind::Favorite => {
                EntityData::Favorite(serde_json::from_str(json).map_err(invalid)?)
            }
            EntityKind::Search => EntityData::Search(serde_json::from_str(json).map_err(invalid)?),
        })
    }

    /// Serializes the bare payload (without the kind tag).
    pub fn payload_json(&self) -> Result<String> {
        Ok(match self {
            EntityData::Calculation(c) => serde_json::to_string(c)?,
            EntityData::Checklist(c) => serde_json::to_string(c)?,
            EntityData::Favorite(f) => serde_json::to_string(f)?,
            EntityData::Search(s) => serde_json::to_string(s)?,
        })
    }

    /// Checks the payload for values the remote would never accept.
    pub fn validate(&self) -> Result<()> {
        let reason = match self {
            EntityData::Calculation(c) => {
                if c.name.trim().is_empty() {
                    Some("name cannot be empty".to_string())
                } else {
                    c.inputs
                        .iter()
                        .chain(c.results.iter())
                        .find(|(_, v)| !v.is_finite())
                        .map(|(k, _)| format!("'{k}' must be a finite number"))
                }
            }
            EntityData::Checklist(c) => {
                if c.checklist_id.trim().is_empty() {
                    Some("checklist_id cannot be empty".to_string())
                } else if c.progress > 100 {
                    Some(format!("progress must be at most 100, got {}", c.progress))
                } else {
                    None
                }
            }
            EntityData::Favorite(f) => {
                if f.item_type.trim().is_empty() {
                    Some("item_type cannot be empty".to_string())
                } else if f.item_id.trim().is_empty() {
                    Some("item_id cannot be empty".to_string())
                } else {
                    None
                }
            }
            EntityData::Search(s) => {
                if s.name.trim().is_empty() {
                    Some("name cannot be empty".to_string())
                } else {
                    None
                }
            }
        };

        match reason {
            Some(reason) => Err(Error::InvalidPayload {
                kind: self.kind().to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Short human-readable description for listings.
    pub fn summary(&self) -> String {
        match self {
            EntityData::Calculation(c) => c.name.clone(),
            EntityData::Checklist(c) => format!("{} ({}%)", c.checklist_id, c.progress),
            EntityData::Favorite(f) => format!("{}:{}", f.item_type, f.item_id),
            EntityData::Search(s) => {
                if s.query.is_empty() {
                    s.name.clone()
                } else {
                    format!("{} \"{}\"", s.name, s.query)
                }
            }
        }
    }
}

/// A locally persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Locally generated id, stable for the record's lifetime.
    pub id: String,
    pub data: EntityData,
    /// Time of the last local mutation.
    pub updated_at: DateTime<Utc>,
    /// True once the remote confirmed the most recent operation on this record.
    /// Only the sync processor sets this, via [`crate::Store::mark_synced`].
    pub synced: bool,
}

impl Record {
    /// A freshly mutated, not yet synced record.
    pub fn new(id: impl Into<String>, data: EntityData, updated_at: DateTime<Utc>) -> Self {
        Record {
            id: id.into(),
            data,
            updated_at,
            synced: false,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.data.kind()
    }
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
