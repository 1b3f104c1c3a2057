//! Command implementations and shared document handling.

pub mod data;
pub mod resource;
pub mod schema;
pub mod validate;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tfos_client::{MockClientFactory, ServiceError};
use tfos_provider::{Attributes, Config, Provider, ResourceState};

pub use schema::cmd_schema;
pub use validate::{cmd_validate, ObjectKind};

/// Output format (text, json).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

/// A provider for commands that never reach a service (schema, validate,
/// plan). Any client request fails with a configuration error.
pub fn offline_provider(region: &str) -> Provider {
    let clients = MockClientFactory::failing(ServiceError::ConfigError(
        "this command does not contact OpenStack".into(),
    ));
    Provider::openstack(Config::new(region, Arc::new(clients)))
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// Parses an attribute document: a JSON object of attribute values.
pub fn parse_attributes(content: &str) -> Result<Attributes> {
    match serde_json::from_str::<Value>(content).context("Attribute document is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!(
            "Attribute document must be a JSON object, got {}",
            type_name(&other)
        ),
    }
}

/// Reads an attribute document from a file, or stdin for `-`.
pub fn read_attributes(path: &Path) -> Result<Attributes> {
    parse_attributes(&read_input(path)?)
        .with_context(|| format!("Invalid attribute document {}", path.display()))
}

/// Reads a state document written by an earlier command.
pub fn read_state(path: &Path) -> Result<ResourceState> {
    let content = read_input(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid state document {}", path.display()))
}

/// Writes a state document.
pub fn write_state(path: &Path, state: &ResourceState) -> Result<()> {
    let contents = serde_json::to_string_pretty(state)?;
    std::fs::write(path, contents + "\n")
        .with_context(|| format!("Failed to write state to {}", path.display()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Renders attributes as `key = value` lines, sorted by key.
pub fn render_attributes(attributes: &Attributes) -> Vec<String> {
    let mut keys: Vec<&String> = attributes.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|key| format!("{} = {}", key, attributes[key]))
        .collect()
}

/// Prints an object state.
pub fn print_state(type_name: &str, state: &ResourceState, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }
    println!("{} {}", type_name.bold(), state.id.cyan());
    for line in render_attributes(&state.attributes) {
        println!("  {}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(r#"{"name": "compute-0", "uuid": null}"#).unwrap();
        assert_eq!(attrs["name"], json!("compute-0"));

        let err = parse_attributes("[1, 2]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Attribute document must be a JSON object, got an array"
        );
        assert!(parse_attributes("{").is_err());
    }

    #[test]
    fn test_state_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let state = ResourceState {
            id: "rp-1".into(),
            attributes: parse_attributes(r#"{"name": "a", "generation": 3}"#).unwrap(),
        };

        write_state(&path, &state).unwrap();
        let loaded = read_state(&path).unwrap();
        assert_eq!(loaded.id, "rp-1");
        assert_eq!(loaded.attributes["generation"], json!(3));
    }

    #[test]
    fn test_missing_file_error_names_path() {
        let err = read_attributes(Path::new("/nonexistent/attrs.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/attrs.json"));
    }

    #[test]
    fn test_render_attributes_sorted() {
        let attrs = parse_attributes(r#"{"traits": ["A"], "region": "RegionOne"}"#).unwrap();
        assert_eq!(
            render_attributes(&attrs),
            vec![
                "region = \"RegionOne\"".to_string(),
                "traits = [\"A\"]".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_offline_provider_refuses_service_calls() {
        let provider = offline_provider("RegionOne");
        let err = provider
            .create_resource(
                "openstack_placement_resourceprovider_v1",
                parse_attributes(r#"{"name": "x"}"#).unwrap(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not contact OpenStack"));
    }
}
