//! `cmdkit operations`: describe the operation catalogue.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use cmdkit_core::operation::OperationCatalogue;

/// Print every registered operation with its declared parameters.
pub fn list_operations(catalogue: &OperationCatalogue, json: bool) -> Result<()> {
    let operations: Vec<_> = catalogue
        .names()
        .into_iter()
        .filter_map(|name| catalogue.create(name))
        .collect();

    if json {
        let entries: Vec<_> = operations
            .iter()
            .map(|op| {
                let parameters: Vec<_> = op
                    .parameters()
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "name": p.spec.name,
                            "type": p.spec.type_label(),
                            "required": p.spec.required,
                            "default": p.spec.default,
                            "description": p.spec.description,
                        })
                    })
                    .collect();
                serde_json::json!({
                    "name": op.name(),
                    "aggregate": op.is_aggregate(),
                    "parameters": parameters,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Operation").fg(Color::White),
        Cell::new("Parameter").fg(Color::White),
        Cell::new("Type").fg(Color::White),
        Cell::new("Default").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);

    for op in &operations {
        let label = if op.is_aggregate() {
            format!("{} (+operations)", op.name())
        } else {
            op.name().to_string()
        };
        if op.parameters().is_empty() {
            table.add_row(vec![Cell::new(label).fg(Color::Cyan)]);
            continue;
        }
        for (i, parameter) in op.parameters().iter().enumerate() {
            let spec = &parameter.spec;
            let default = match &spec.default {
                Some(value) => value.to_string(),
                None if spec.required => "required".to_string(),
                None => "-".to_string(),
            };
            let name_cell = if i == 0 {
                Cell::new(&label).fg(Color::Cyan)
            } else {
                Cell::new("")
            };
            table.add_row(vec![
                name_cell,
                Cell::new(&spec.name),
                Cell::new(spec.type_label()),
                Cell::new(default).fg(Color::DarkGrey),
                Cell::new(&spec.description),
            ]);
        }
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} operation{}",
        style(operations.len()).bold(),
        if operations.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}
