//! tfos CLI
//!
//! Drives the OpenStack Placement and Key Manager handlers from the command
//! line, using JSON attribute documents for configurations and states.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod config;

use commands::{cmd_schema, cmd_validate, ObjectKind, OutputFormat};
use config::AppConfig;
use tfos_provider::{Config, Provider};

#[derive(Parser)]
#[command(name = "tfos")]
#[command(version)]
#[command(about = "Manage OpenStack Placement and Key Manager objects", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Default region, overriding the configuration file
    #[arg(long)]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show resource and data source schemas
    Schema {
        /// Type to describe; lists all types when omitted
        type_name: Option<String>,
    },

    /// Validate the configuration and, optionally, an attribute document
    Validate {
        /// Validate FILE as configuration of this resource type
        #[arg(long, conflicts_with = "data_source", requires = "file")]
        resource: Option<String>,

        /// Validate FILE as configuration of this data source type
        #[arg(long, requires = "file")]
        data_source: Option<String>,

        /// Attribute document (`-` for stdin)
        file: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },

    /// Manage resources
    Resource {
        #[command(subcommand)]
        action: ResourceCommands,
    },

    /// Read data sources
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
}

#[derive(Subcommand)]
enum ResourceCommands {
    /// Show what applying a configuration would do
    Plan {
        type_name: String,
        /// Attribute document (`-` for stdin)
        file: PathBuf,
        /// Current state, when the object exists
        #[arg(short, long)]
        state: Option<PathBuf>,
    },

    /// Create an object
    Create {
        type_name: String,
        /// Attribute document (`-` for stdin)
        file: PathBuf,
        /// Write the resulting state here
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Refresh a state
    Read {
        type_name: String,
        /// State document
        state: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Update an object in place
    Update {
        type_name: String,
        /// State document
        state: PathBuf,
        /// Attribute document (`-` for stdin)
        file: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Delete an object
    Delete {
        type_name: String,
        /// State document
        state: PathBuf,
    },

    /// Import an existing object by id
    Import {
        type_name: String,
        id: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Read a data source
    Read {
        type_name: String,
        /// Query attributes (`-` for stdin)
        file: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = AppConfig::load_or_default(&config_path)?;
    if let Some(region) = &cli.region {
        config.provider.region = region.clone();
    }

    tfos_observability::init_logging_with_config(config.logging.subscriber_config(cli.verbose));

    match cli.command {
        Commands::Schema { type_name } => cmd_schema(type_name, cli.format).await,
        Commands::Validate {
            resource,
            data_source,
            file,
        } => {
            let document = match (resource, data_source, file.as_deref()) {
                (Some(type_name), None, Some(file)) => Some((ObjectKind::Resource, type_name, file)),
                (None, Some(type_name), Some(file)) => {
                    Some((ObjectKind::DataSource, type_name, file))
                }
                (None, None, None) => None,
                _ => bail!("A document requires --resource or --data-source"),
            };
            if !cmd_validate(&config, &config_path, document).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Config { show_secrets } => cmd_config(config, show_secrets, cli.format),
        Commands::Resource { action } => {
            let provider = live_provider(&config)?;
            cmd_resource(&provider, action, cli.format).await
        }
        Commands::Data { action } => {
            let provider = live_provider(&config)?;
            match action {
                DataCommands::Read {
                    type_name,
                    file,
                    out,
                } => {
                    commands::data::read(&provider, &type_name, &file, out.as_deref(), cli.format)
                        .await?;
                }
            }
            Ok(())
        }
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("org", "openstack", "tfos") {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("tfos.yaml")
    }
}

fn live_provider(config: &AppConfig) -> Result<Provider> {
    if config.provider.insecure {
        tracing::warn!("TLS certificate verification is disabled");
    }
    let runtime = Config::from_settings(&config.provider)?;
    Ok(Provider::openstack(runtime))
}

async fn cmd_resource(
    provider: &Provider,
    action: ResourceCommands,
    format: OutputFormat,
) -> Result<()> {
    use commands::resource;

    match action {
        ResourceCommands::Plan {
            type_name,
            file,
            state,
        } => {
            resource::plan(provider, &type_name, &file, state.as_deref(), format).await?;
        }
        ResourceCommands::Create {
            type_name,
            file,
            out,
        } => {
            resource::create(provider, &type_name, &file, out.as_deref(), format).await?;
        }
        ResourceCommands::Read {
            type_name,
            state,
            out,
        } => {
            resource::read(provider, &type_name, &state, out.as_deref(), format).await?;
        }
        ResourceCommands::Update {
            type_name,
            state,
            file,
            out,
        } => {
            resource::update(provider, &type_name, &state, &file, out.as_deref(), format).await?;
        }
        ResourceCommands::Delete { type_name, state } => {
            resource::delete(provider, &type_name, &state).await?;
        }
        ResourceCommands::Import {
            type_name,
            id,
            out,
        } => {
            resource::import(provider, &type_name, &id, out.as_deref(), format).await?;
        }
    }
    Ok(())
}

fn cmd_config(config: AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let display_config = if show_secrets {
        config
    } else {
        config.redact_secrets()
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&display_config)?);
    } else {
        let provider = &display_config.provider;
        println!("{}", "Current Configuration".bold());
        println!("─────────────────────────");
        println!("Auth URL: {}", provider.auth_url);
        println!("Region: {}", provider.region);
        println!("Interface: {}", provider.endpoint_type);
        if !provider.username.is_empty() {
            println!("User: {}@{}", provider.username, provider.user_domain_name);
        }
        if !provider.project_name.is_empty() {
            println!(
                "Project: {}@{}",
                provider.project_name, provider.project_domain_name
            );
        }
        if !provider.endpoint_overrides.is_empty() {
            println!("\nEndpoint overrides:");
            let mut overrides: Vec<_> = provider.endpoint_overrides.iter().collect();
            overrides.sort();
            for (service, url) in overrides {
                println!("  - {}: {}", service.cyan(), url);
            }
        }
        println!(
            "\nLogging: {} ({})",
            display_config.logging.level,
            if display_config.logging.json_format {
                "json"
            } else {
                "text"
            }
        );
    }

    Ok(())
}
