//! Resource commands - plan, create, read, update, delete and import.
//!
//! Configurations are attribute documents; states are the JSON documents
//! these commands print and optionally write with `--out`.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::Path;
use tfos_provider::{PlanAction, PlannedChange, Provider, ProviderError, ResourceState};
use tracing::Instrument;

use super::{print_state, read_attributes, read_state, render_attributes, write_state, OutputFormat};

fn finish(
    type_name: &str,
    state: &ResourceState,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(path) = out {
        write_state(path, state)?;
    }
    print_state(type_name, state, format)
}

/// Plans the change from an optional prior state to a configuration.
pub async fn plan(
    provider: &Provider,
    type_name: &str,
    file: &Path,
    state: Option<&Path>,
    format: OutputFormat,
) -> Result<PlannedChange> {
    let config = read_attributes(file)?;
    let prior = state.map(read_state).transpose()?;
    let change = provider.plan_resource_change(type_name, prior.as_ref(), config)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&change)?);
        return Ok(change);
    }
    let action = match change.action {
        PlanAction::Create => "create".green(),
        PlanAction::Update => "update in-place".yellow(),
        PlanAction::Replace => "replace".red(),
        PlanAction::NoOp => "no changes".normal(),
    };
    println!("{} will {}", type_name.bold(), action);
    if !change.requires_replace.is_empty() {
        println!(
            "  {} {}",
            "forces replacement:".red(),
            change.requires_replace.join(", ")
        );
    }
    for line in render_attributes(&change.planned) {
        println!("  {}", line);
    }
    Ok(change)
}

pub async fn create(
    provider: &Provider,
    type_name: &str,
    file: &Path,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<ResourceState> {
    let config = read_attributes(file)?;
    let state = provider
        .create_resource(type_name, config)
        .instrument(tfos_observability::operation_span!(type_name, "create"))
        .await
        .with_context(|| format!("Failed to create {}", type_name))?;
    finish(type_name, &state, out, format)?;
    Ok(state)
}

/// Refreshes a state; `None` when the object is gone.
pub async fn read(
    provider: &Provider,
    type_name: &str,
    state_file: &Path,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<Option<ResourceState>> {
    let prior = read_state(state_file)?;
    let refreshed = provider
        .read_resource(type_name, &prior)
        .instrument(tfos_observability::operation_span!(type_name, "read", id = %prior.id))
        .await
        .with_context(|| format!("Failed to read {} {}", type_name, prior.id))?;

    match &refreshed {
        Some(state) => finish(type_name, state, out, format)?,
        None => println!(
            "{} {} no longer exists",
            type_name.bold(),
            prior.id.yellow()
        ),
    }
    Ok(refreshed)
}

pub async fn update(
    provider: &Provider,
    type_name: &str,
    state_file: &Path,
    file: &Path,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<Option<ResourceState>> {
    let prior = read_state(state_file)?;
    let config = read_attributes(file)?;
    let result = provider
        .update_resource(type_name, &prior, config)
        .instrument(tfos_observability::operation_span!(type_name, "update", id = %prior.id))
        .await;

    let updated = match result {
        Ok(updated) => updated,
        Err(ProviderError::RequiresReplacement(attributes)) => bail!(
            "{} {} cannot be updated in place ({} changed); delete and create it instead",
            type_name,
            prior.id,
            attributes.join(", ")
        ),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to update {} {}", type_name, prior.id))
        }
    };

    match &updated {
        Some(state) => finish(type_name, state, out, format)?,
        None => println!(
            "{} {} disappeared during update",
            type_name.bold(),
            prior.id.yellow()
        ),
    }
    Ok(updated)
}

pub async fn delete(provider: &Provider, type_name: &str, state_file: &Path) -> Result<()> {
    let state = read_state(state_file)?;
    provider
        .delete_resource(type_name, &state)
        .instrument(tfos_observability::operation_span!(type_name, "delete", id = %state.id))
        .await
        .with_context(|| format!("Failed to delete {} {}", type_name, state.id))?;
    println!("{} {} {}", type_name.bold(), state.id.cyan(), "deleted".green());
    Ok(())
}

pub async fn import(
    provider: &Provider,
    type_name: &str,
    id: &str,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<ResourceState> {
    let state = provider
        .import_resource(type_name, id)
        .instrument(tfos_observability::operation_span!(type_name, "import", id = %id))
        .await
        .with_context(|| format!("Failed to import {} {}", type_name, id))?;
    finish(type_name, &state, out, format)?;
    Ok(state)
}
