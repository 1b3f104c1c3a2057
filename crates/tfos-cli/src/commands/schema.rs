//! Schema command - prints handler schemas.

use anyhow::{bail, Result};
use colored::Colorize;
use tfos_provider::schema::Elem;
use tfos_provider::{Attribute, Schema};

use super::{offline_provider, OutputFormat};

/// One summary line per attribute, nested blocks indented below their
/// parent.
pub fn describe_schema(schema: &Schema, indent: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for (name, attribute) in &schema.attributes {
        lines.push(format!(
            "{}{} ({})",
            "  ".repeat(indent),
            name,
            flags(attribute).join(", ")
        ));
        if let Some(Elem::Block(nested)) = &attribute.elem {
            lines.extend(describe_schema(nested, indent + 1));
        }
    }
    lines
}

fn flags(attribute: &Attribute) -> Vec<String> {
    let type_name = serde_json::to_value(attribute.value_type)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default();
    let mut flags = vec![match &attribute.elem {
        Some(Elem::Type(elem)) => format!("{} of {:?}", type_name, elem).to_lowercase(),
        _ => type_name,
    }];
    if attribute.required {
        flags.push("required".into());
    } else if attribute.optional {
        flags.push("optional".into());
    }
    if attribute.computed {
        flags.push("computed".into());
    }
    if attribute.force_new {
        flags.push("forces replacement".into());
    }
    if let Some(default) = &attribute.default {
        flags.push(format!("default {}", default));
    }
    if let Some(max) = attribute.max_items {
        flags.push(format!("max {}", max));
    }
    flags
}

pub async fn cmd_schema(type_name: Option<String>, format: OutputFormat) -> Result<()> {
    let provider = offline_provider("");
    let schema = provider.schema();

    let Some(type_name) = type_name else {
        if format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&schema)?);
        } else {
            println!("{}", "Resources".bold());
            for name in schema.resources.keys() {
                println!("  {}", name.cyan());
            }
            println!("{}", "Data Sources".bold());
            for name in schema.data_sources.keys() {
                println!("  {}", name.cyan());
            }
        }
        return Ok(());
    };

    let mut found = false;
    for (kind, schemas) in [
        ("resource", &schema.resources),
        ("data source", &schema.data_sources),
    ] {
        let Some(object_schema) = schemas.get(&type_name) else {
            continue;
        };
        found = true;
        if format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(object_schema)?);
        } else {
            println!("{} {}", kind.bold(), type_name.cyan());
            for line in describe_schema(object_schema, 1) {
                println!("{}", line);
            }
        }
    }
    if !found {
        bail!("Unknown resource or data source type: {}", type_name);
    }
    Ok(())
}
