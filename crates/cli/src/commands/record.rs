// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local writes: `new`, `edit` and `rm`.

use serde::Serialize;

use outbox_core::{EntityData, EntityKind};

use super::{open_local, read_payload};
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::sync::{Change, Remote, SyncService};

#[derive(Serialize)]
struct NewRecordJson<'a> {
    kind: EntityKind,
    id: &'a str,
    pending: usize,
}

pub fn new(kind: String, json: String, output: OutputFormat) -> Result<()> {
    let service = open_local()?;
    let kind: EntityKind = kind.parse()?;
    let id = create(&service, kind, &read_payload(json)?)?;

    match output {
        OutputFormat::Text => println!("Recorded {} {}", kind, id),
        OutputFormat::Json => {
            let out = NewRecordJson {
                kind,
                id: &id,
                pending: service.status()?.pending,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

pub fn edit(kind: String, id: String, json: String) -> Result<()> {
    let service = open_local()?;
    let kind: EntityKind = kind.parse()?;
    update(&service, kind, id.clone(), &read_payload(json)?)?;
    println!("Updated {} {}", kind, id);
    Ok(())
}

pub fn remove(kind: String, id: String) -> Result<()> {
    let service = open_local()?;
    let kind: EntityKind = kind.parse()?;
    service.record(Change::Delete {
        kind,
        id: id.clone(),
    })?;
    println!("Deleted {} {}", kind, id);
    Ok(())
}

pub(crate) fn create<R: Remote>(
    service: &SyncService<R>,
    kind: EntityKind,
    json: &str,
) -> Result<String> {
    let data = parse(kind, json)?;
    service.record(Change::Create(data))
}

pub(crate) fn update<R: Remote>(
    service: &SyncService<R>,
    kind: EntityKind,
    id: String,
    json: &str,
) -> Result<String> {
    let data = parse(kind, json)?;
    service.record(Change::Update { id, data })
}

/// Parses a payload, filling in derived fields.
fn parse(kind: EntityKind, json: &str) -> Result<EntityData> {
    let mut data = EntityData::from_json(kind, json.trim())?;
    // Progress follows the items when a checklist has any
    if let EntityData::Checklist(progress) = &mut data {
        if !progress.items.is_empty() {
            progress.progress = progress.computed_progress();
        }
    }
    Ok(data)
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
