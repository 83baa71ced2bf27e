// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only views of local state: `list` and `queue`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use outbox_core::{EntityKind, QueueItem, Record, SyncAction};

use super::open_local;
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::sync::{Remote, SyncService};

/// JSON representation of a record for list output.
#[derive(Serialize)]
struct RecordJson<'a> {
    kind: EntityKind,
    id: &'a str,
    synced: bool,
    updated_at: DateTime<Utc>,
    data: serde_json::Value,
}

/// JSON representation of a queue item.
#[derive(Serialize)]
struct QueueItemJson<'a> {
    id: &'a str,
    action: SyncAction,
    kind: EntityKind,
    record_id: &'a str,
    enqueued_at: DateTime<Utc>,
    retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    not_before: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<&'a str>,
}

pub fn run(kind: Option<String>, unsynced: bool, output: OutputFormat) -> Result<()> {
    let service = open_local()?;
    let kind = kind.map(|k| k.parse::<EntityKind>()).transpose()?;
    let records = collect(&service, kind, unsynced)?;
    print!("{}", render_records(&records, output)?);
    Ok(())
}

pub fn queue(output: OutputFormat) -> Result<()> {
    let service = open_local()?;
    let items = service.queue_items()?;
    print!("{}", render_queue(&items, output)?);
    Ok(())
}

/// Records of one kind, or of every kind in display order.
pub(crate) fn collect<R: Remote>(
    service: &SyncService<R>,
    kind: Option<EntityKind>,
    unsynced: bool,
) -> Result<Vec<Record>> {
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => EntityKind::ALL.to_vec(),
    };
    let mut records = Vec::new();
    for kind in kinds {
        records.extend(
            service
                .records(kind)?
                .into_iter()
                .filter(|r| !unsynced || !r.synced),
        );
    }
    Ok(records)
}

pub(crate) fn render_records(records: &[Record], output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Text => {
            if records.is_empty() {
                return Ok("No records\n".to_string());
            }
            let mut out = String::new();
            for record in records {
                let marker = if record.synced { " " } else { "*" };
                out.push_str(&format!(
                    "{} {:<12} {:<24} {}\n",
                    marker,
                    record.kind().as_str(),
                    record.id,
                    record.data.summary()
                ));
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let json = records
                .iter()
                .map(record_json)
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("{}\n", serde_json::to_string_pretty(&json)?))
        }
    }
}

fn record_json(record: &Record) -> Result<RecordJson<'_>> {
    Ok(RecordJson {
        kind: record.kind(),
        id: &record.id,
        synced: record.synced,
        updated_at: record.updated_at,
        data: serde_json::from_str(&record.data.payload_json()?)?,
    })
}

pub(crate) fn render_queue(items: &[QueueItem], output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Text => {
            if items.is_empty() {
                return Ok("Queue is empty\n".to_string());
            }
            let mut out = String::new();
            for item in items {
                out.push_str(&format!(
                    "{}  {:<6} {:<12} {}",
                    item.id,
                    item.action.as_str(),
                    item.kind().as_str(),
                    item.record_id
                ));
                if item.retry_count > 0 {
                    out.push_str(&format!("  (retries: {})", item.retry_count));
                }
                if let Some(err) = &item.last_error {
                    out.push_str(&format!("  last error: {}", err));
                }
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let json: Vec<QueueItemJson> = items
                .iter()
                .map(|i| QueueItemJson {
                    id: &i.id,
                    action: i.action,
                    kind: i.kind(),
                    record_id: &i.record_id,
                    enqueued_at: i.enqueued_at,
                    retry_count: i.retry_count,
                    not_before: i.not_before,
                    last_error: i.last_error.as_deref(),
                })
                .collect();
            Ok(format!("{}\n", serde_json::to_string_pretty(&json)?))
        }
    }
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
