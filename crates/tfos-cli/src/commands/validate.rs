//! Validate command - checks provider settings and attribute documents
//! without contacting OpenStack.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tfos_provider::{Diagnostic, Severity};

use super::{offline_provider, read_attributes};
use crate::config::AppConfig;

/// What kind of object an attribute document configures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Resource,
    DataSource,
}

/// Diagnostics for the provider settings.
pub fn settings_diagnostics(config: &AppConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if let Err(e) = config.provider.validate() {
        diagnostics.push(Diagnostic::error(e.to_string()));
    }
    if config.provider.region.is_empty() {
        diagnostics.push(
            Diagnostic::warning("No default region; every object must set `region`")
                .at("region"),
        );
    }
    if config.provider.insecure {
        diagnostics.push(
            Diagnostic::warning("TLS certificate verification is disabled").at("insecure"),
        );
    }
    diagnostics
}

/// Diagnostics for one attribute document.
pub fn document_diagnostics(
    kind: ObjectKind,
    type_name: &str,
    file: &Path,
) -> Result<Vec<Diagnostic>> {
    let attributes = read_attributes(file)?;
    let provider = offline_provider("");
    let diagnostics = match kind {
        ObjectKind::Resource => provider.validate_resource_config(type_name, &attributes)?,
        ObjectKind::DataSource => provider.validate_data_source_config(type_name, &attributes)?,
    };
    Ok(diagnostics)
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        let label = match d.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warning => "WARN ".yellow().bold(),
        };
        match &d.attribute {
            Some(attribute) => println!("  {} {}: {}", label, attribute.cyan(), d.summary),
            None => println!("  {} {}", label, d.summary),
        }
    }
}

/// Returns whether everything validated without errors.
pub async fn cmd_validate(
    config: &AppConfig,
    config_path: &Path,
    document: Option<(ObjectKind, String, &Path)>,
) -> Result<bool> {
    println!(
        "Validating configuration: {}",
        config_path.display().to_string().cyan()
    );
    let mut diagnostics = settings_diagnostics(config);

    if let Some((kind, type_name, file)) = document {
        println!(
            "Validating {}: {}",
            file.display().to_string().cyan(),
            type_name
        );
        diagnostics.extend(document_diagnostics(kind, &type_name, file)?);
    }

    print_diagnostics(&diagnostics);

    println!();
    if diagnostics.iter().any(Diagnostic::is_error) {
        println!("{}", "Validation failed. Fix the errors above.".red().bold());
        Ok(false)
    } else if !diagnostics.is_empty() {
        println!(
            "{}",
            "Valid with warnings. Review the warnings above."
                .yellow()
                .bold()
        );
        Ok(true)
    } else {
        println!("{}", "Configuration is valid.".green().bold());
        Ok(true)
    }
}
