//! crudgen - scaffold admin CRUD modules from a SELECT statement

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use crudgen::app::{load_static_schema, scaffold_service, Backends};
use crudgen::shared::{CrudgenConfig, GeneratorMetrics, ObservabilitySystem, PerfTimer};
use crudgen::{ErrorResponse, GenerationResponse, ScaffoldRequest};
use tracing::{error, info};

/// Default configuration file name
const DEFAULT_CONFIG_FILE: &str = "crudgen.toml";

#[derive(Parser, Debug)]
#[command(name = "crudgen")]
#[command(author, version, about = "Admin CRUD module scaffolding from SQL", long_about = None)]
struct Cli {
    /// Path to config file (default: crudgen.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Read column metadata from a JSON file instead of MySQL
    #[arg(long, global = true, value_name = "PATH")]
    schema_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SqlInput {
    /// SELECT statement describing the module
    #[arg(long, conflicts_with = "sql_file", required_unless_present = "sql_file")]
    sql: Option<String>,

    /// Read the statement from a file
    #[arg(long, value_name = "PATH")]
    sql_file: Option<PathBuf>,
}

impl SqlInput {
    fn read(&self) -> anyhow::Result<String> {
        match (&self.sql, &self.sql_file) {
            (Some(sql), _) => Ok(sql.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display())),
            (None, None) => anyhow::bail!("either --sql or --sql-file is required"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a statement and print the enriched field list
    Parse {
        #[command(flatten)]
        input: SqlInput,
    },

    /// Generate views, controller, service, models and routes
    Generate {
        #[command(flatten)]
        input: SqlInput,

        /// Module name (default: the main table)
        #[arg(short, long)]
        module: Option<String>,

        /// Primary key column (default: the schema primary key, then `id`)
        #[arg(long)]
        primary_key: Option<String>,

        /// Path of the parent menu entry
        #[arg(long)]
        menu_path: Option<String>,

        /// Overwrite an existing module
        #[arg(long)]
        force_override: bool,

        /// Do not insert menu and permission rows
        #[arg(long)]
        no_permissions: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = CrudgenConfig::load_from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    ObservabilitySystem::init(&config.observability)?;

    let backends = match &cli.schema_file {
        Some(path) => Backends::offline(load_static_schema(path)?),
        None => Backends::connect(&config).await?,
    };
    let service = scaffold_service(&config, &backends);

    let (envelope, success) = match cli.command {
        Command::Parse { input } => {
            let sql = input.read()?;
            let timer = PerfTimer::new("crudgen_operation_duration_seconds")
                .with_label("operation", "parse");
            let result = service.parser().parse(&sql).await;
            info!("parsed in {:?}", timer.finish());

            match result {
                Ok(parsed) => (serde_json::to_value(&parsed)?, true),
                Err(err) => {
                    error!(code = err.code.id(), track = %err.track, "parse failed: {err}");
                    (serde_json::to_value(ErrorResponse::from(&err))?, false)
                }
            }
        }
        Command::Generate {
            input,
            module,
            primary_key,
            menu_path,
            force_override,
            no_permissions,
        } => {
            let request = ScaffoldRequest {
                sql: input.read()?,
                module,
                primary_key,
                menu_path,
                force_override,
                skip_permissions: no_permissions,
            };

            let started = Instant::now();
            let result = service.scaffold(&request).await;
            GeneratorMetrics::operation_duration("generate", started.elapsed());

            match result {
                Ok(report) => {
                    GeneratorMetrics::module_generated(&report.module, report.files.len());
                    (serde_json::to_value(GenerationResponse::ok(report))?, true)
                }
                Err(err) => {
                    GeneratorMetrics::generation_failed(err.code.id());
                    error!(code = err.code.id(), track = %err.track, "generation failed: {err}");
                    (serde_json::to_value(ErrorResponse::from(&err))?, false)
                }
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if let Some(connection) = &backends.connection {
        connection.close().await;
    }

    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
