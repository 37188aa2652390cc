//! Variable CLI commands: list, set.

use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use cmdkit_types::codec::parse_literal;
use cmdkit_types::variable::Scope;

use crate::state::AppState;

/// Longest value rendered in the table before it is cut.
const MAX_VALUE_WIDTH: usize = 60;

/// Scopes that are persisted and therefore listable.
const LISTABLE_SCOPES: [Scope; 3] = [Scope::Session, Scope::Application, Scope::BuiltIn];

fn parse_scope(raw: &str) -> Result<Scope> {
    Scope::from_str(raw).map_err(|e| anyhow!(e))
}

/// List persisted variables, narrowest scope first.
pub async fn list_vars(
    state: &AppState,
    scope: Option<String>,
    session: Option<String>,
    json: bool,
) -> Result<()> {
    let only = scope.as_deref().map(parse_scope).transpose()?;
    if only == Some(Scope::Command) {
        bail!("command variables exist only while a command runs");
    }

    let session = state.session_name(session);
    let store = state.load_store(&session).await?;
    let scopes: Vec<Scope> = LISTABLE_SCOPES
        .into_iter()
        .filter(|s| only.is_none_or(|only| only == *s))
        .collect();

    if json {
        let mut entries = Vec::new();
        for scope in &scopes {
            for variable in store.variables(*scope) {
                entries.push(serde_json::json!({
                    "scope": scope,
                    "key": variable.key,
                    "value": variable.value,
                    "source": variable.source,
                }));
            }
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let total: usize = scopes.iter().map(|s| store.len(*s)).sum();
    if total == 0 {
        println!();
        println!(
            "  {} No variables stored. Add one with: {}",
            style("i").blue().bold(),
            style("cmdkit set NAME VALUE").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Scope").fg(Color::White),
        Cell::new("Key").fg(Color::White),
        Cell::new("Value").fg(Color::White),
        Cell::new("Source").fg(Color::White),
    ]);

    for scope in &scopes {
        for variable in store.variables(*scope) {
            let rendered = variable.value.to_string();
            table.add_row(vec![
                Cell::new(scope),
                Cell::new(&variable.key).fg(Color::Cyan),
                Cell::new(truncate(&rendered, MAX_VALUE_WIDTH)),
                Cell::new(variable.source.as_deref().unwrap_or("-")).fg(Color::DarkGrey),
            ]);
        }
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} variable{} (session '{}')",
        style(total).bold(),
        if total == 1 { "" } else { "s" },
        session
    );
    println!();

    Ok(())
}

/// Write one variable through the engine's writer and persist it.
///
/// # Examples
///
/// ```bash
/// cmdkit set region eu --scope application
/// cmdkit set 'hosts[web]' '{"key": "web", "port": 8080}'
/// ```
pub async fn set_var(
    state: &AppState,
    path: &str,
    raw_value: &str,
    scope: &str,
    session: Option<String>,
    json: bool,
) -> Result<()> {
    let scope = parse_scope(scope)?;
    if scope == Scope::Command {
        bail!("command variables exist only while a command runs");
    }

    let session = state.session_name(session);
    let mut store = state.load_store(&session).await?;
    let value = parse_literal(raw_value);
    store.write(scope, &session, path, value, None)?;
    state.save_store(&store, &session).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"set": true, "path": path, "scope": scope, "session": session})
        );
    } else {
        println!(
            "  {} {} '{}' set",
            style("✓").green().bold(),
            scope,
            style(path).bold()
        );
    }
    Ok(())
}

/// Cut `text` to at most `max` characters, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdkit_types::value::Value;
    use tempfile::TempDir;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }

    #[test]
    fn test_parse_scope() {
        assert_eq!(parse_scope("Session").unwrap(), Scope::Session);
        assert_eq!(parse_scope("app").unwrap(), Scope::Application);
        assert!(parse_scope("global").is_err());
    }

    #[tokio::test]
    async fn test_set_var_persists_element_writes() {
        let tmp = TempDir::new().unwrap();
        let state = AppState::init(Some(tmp.path().to_path_buf())).await.unwrap();

        set_var(&state, "hosts[web]", r#"{"key": "web", "port": 8080}"#, "session", None, true)
            .await
            .unwrap();
        set_var(&state, "region", "eu", "application", None, true)
            .await
            .unwrap();

        let store = state.load_store("default").await.unwrap();
        assert_eq!(store.lookup("hosts[web].port").unwrap(), Value::Integer(8080));
        assert_eq!(store.lookup("region").unwrap(), Value::text("eu"));
    }

    #[tokio::test]
    async fn test_set_var_rejects_command_scope() {
        let tmp = TempDir::new().unwrap();
        let state = AppState::init(Some(tmp.path().to_path_buf())).await.unwrap();
        let err = set_var(&state, "x", "1", "command", None, true).await.unwrap_err();
        assert!(err.to_string().contains("only while a command runs"));
    }
}
