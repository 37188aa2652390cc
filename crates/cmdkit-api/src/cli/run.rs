//! `cmdkit run`: load a command document, run it, persist the result.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use cmdkit_core::command::{RunReport, run_command};
use cmdkit_infra::document::load_command_document;
use cmdkit_types::codec::parse_literal;
use cmdkit_types::value::Value;

use crate::state::AppState;

/// Run the command document at `file` under `session`.
///
/// Session and Application variables are saved even when the command fails
/// part-way, since the writes it made before failing stay in effect.
pub async fn run_file(
    state: &AppState,
    file: &Path,
    session: Option<String>,
    args: Vec<(String, String)>,
    cancel: CancellationToken,
    json: bool,
) -> Result<()> {
    let document = load_command_document(file).await?;
    let session = state.session_name(session);
    let store = state.load_store(&session).await?;
    let mut ctx = state.context(store, &session, cancel);

    let arguments = command_arguments(args);
    let outcome = run_command(&document, arguments, &mut ctx).await;

    let store = ctx.into_store();
    state.save_store(&store, &session).await?;
    let report = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, file, &session);
    }
    Ok(())
}

/// `--arg` pairs as command arguments, values decoded like JSON literals.
fn command_arguments(args: Vec<(String, String)>) -> IndexMap<String, Value> {
    args.into_iter()
        .map(|(key, raw)| {
            let value = parse_literal(&raw);
            (key, value)
        })
        .collect()
}

fn print_report(report: &RunReport, file: &Path, session: &str) {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let command = report
        .command
        .clone()
        .unwrap_or_else(|| file.display().to_string());
    table.add_row(vec![Cell::new("Command").fg(Color::White), Cell::new(command).fg(Color::Cyan)]);
    table.add_row(vec![Cell::new("Session").fg(Color::White), Cell::new(session)]);
    table.add_row(vec![Cell::new("Run").fg(Color::White), Cell::new(report.run_id).fg(Color::DarkGrey)]);
    table.add_row(vec![Cell::new("Executed").fg(Color::White), Cell::new(report.executed)]);
    table.add_row(vec![Cell::new("Skipped").fg(Color::White), Cell::new(report.skipped)]);
    table.add_row(vec![
        Cell::new("Duration").fg(Color::White),
        Cell::new(format!("{} ms", report.duration_ms)),
    ]);

    println!();
    println!("{table}");
    println!();
    if report.cancelled {
        println!("  {} Cancelled before completion", style("!").yellow().bold());
    } else {
        println!("  {} Command finished", style("✓").green().bold());
    }
    println!();
}
