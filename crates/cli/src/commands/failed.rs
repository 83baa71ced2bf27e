// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The failed log: operations the processor gave up on.

use serde::Serialize;

use outbox_core::DeadLetter;

use super::open_local;
use crate::cli::OutputFormat;
use crate::error::Result;

#[derive(Serialize)]
struct CountJson {
    count: usize,
}

pub fn run(requeue: bool, clear: bool, output: OutputFormat) -> Result<()> {
    let service = open_local()?;

    if requeue {
        let count = service.requeue_failed()?;
        return print_count(count, "Requeued", output);
    }
    if clear {
        let count = service.clear_failed()?;
        return print_count(count, "Discarded", output);
    }

    print!("{}", render(&service.failed()?, output)?);
    Ok(())
}

fn print_count(count: usize, verb: &str, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Text => println!("{} {} failed operation(s)", verb, count),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&CountJson { count })?),
    }
    Ok(())
}

pub(crate) fn render(letters: &[DeadLetter], output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Text => {
            if letters.is_empty() {
                return Ok("No failed operations\n".to_string());
            }
            let mut out = String::new();
            for letter in letters {
                let item = &letter.item;
                out.push_str(&format!(
                    "{}  {} {} {}\n    {} ({})\n",
                    item.id,
                    item.action,
                    item.kind(),
                    item.record_id,
                    letter.reason,
                    letter.dropped_at.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(letters)?)),
    }
}

#[cfg(test)]
#[path = "failed_tests.rs"]
mod tests;
