//! nano-hydrate CLI - inspect eager-load plans and hydrate result sets
//!
//! Usage:
//!   nano-hydrate plan --schema <schema.toml> --root <entity>
//!   nano-hydrate hydrate --schema <schema.toml> --root <entity> [--rows <rows.json>]
//!   nano-hydrate validate --schema <schema.toml>
//!
//! Examples:
//!   nano-hydrate plan --schema config/schema.toml --root user
//!   psql -c "..." --json | nano-hydrate hydrate --root user --pretty
//!   nano-hydrate validate --schema config/schema.toml

use clap::{Parser, Subcommand};
use nano_orm::config::Settings;
use nano_orm::error::HydrationResult;
use nano_orm::logging::init_logging;
use nano_orm::mapper::Mapper;
use nano_orm::metadata::{MetadataProvider, MetadataRegistry};
use nano_orm::plan::EagerPlan;
use nano_orm::row::RowSet;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "nano-hydrate")]
#[command(about = "Hydrate flattened ORM result sets into entity graphs")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (defaults to NANO_CONFIG, ./nano.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the iteration positions and column aliases for a root entity
    Plan {
        /// Path to the schema file (falls back to [schema].path in the config)
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Root entity name
        #[arg(short, long)]
        root: String,
    },

    /// Hydrate a JSON array of flattened rows
    Hydrate {
        /// Path to the schema file (falls back to [schema].path in the config)
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Root entity name
        #[arg(short, long)]
        root: String,

        /// JSON rows file (reads stdin if omitted)
        #[arg(long)]
        rows: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        /// Treat missing columns as NULL instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Load and validate a schema file
    Validate {
        /// Path to the schema file (falls back to [schema].path in the config)
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match load_settings(cli.config.as_ref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Plan { schema, root } => cmd_plan(&settings, schema, &root),
        Commands::Hydrate {
            schema,
            root,
            rows,
            pretty,
            lenient,
        } => cmd_hydrate(&settings, schema, &root, rows, pretty, lenient),
        Commands::Validate { schema } => cmd_validate(&settings, schema),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn load_settings(path: Option<&PathBuf>) -> Result<Settings, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(p) => Settings::from_file(p)?,
        None => Settings::load()?,
    })
}

fn load_registry(
    settings: &Settings,
    schema: Option<PathBuf>,
) -> Result<MetadataRegistry, Box<dyn std::error::Error>> {
    let path = match schema {
        Some(p) => p,
        None => settings
            .schema_path()?
            .ok_or("no schema given: pass --schema or set [schema].path in the config")?,
    };
    info!(schema = %path.display(), "loading schema");
    Ok(MetadataRegistry::from_file(&path)?)
}

fn cmd_plan(settings: &Settings, schema: Option<PathBuf>, root: &str) -> CliResult {
    let registry = load_registry(settings, schema)?;
    let plan = EagerPlan::build(&registry, root)?;

    println!("-- Eager-load plan for '{}'", root);
    print!("{}", plan);
    println!();
    println!("-- Columns");
    for column in plan.column_aliases() {
        println!("{}.{} AS {}", column.table, column.column, column.alias);
    }
    Ok(())
}

fn cmd_hydrate(
    settings: &Settings,
    schema: Option<PathBuf>,
    root: &str,
    rows: Option<PathBuf>,
    pretty: bool,
    lenient: bool,
) -> CliResult {
    let registry = load_registry(settings, schema)?;

    let mut options = settings.mapper_options();
    if lenient {
        options.strict_columns = false;
    }
    let mapper = Mapper::for_root(&registry, root)?.with_options(options);

    let rows = match rows {
        Some(path) => RowSet::from_json_reader(File::open(&path)?)?,
        None => RowSet::from_json_reader(io::stdin().lock())?,
    };
    info!(rows = rows.len(), root, "hydrating");

    let entities = mapper.map_to_entities(rows.rows())?;
    let output = if pretty {
        serde_json::to_string_pretty(&entities)?
    } else {
        serde_json::to_string(&entities)?
    };
    println!("{}", output);
    Ok(())
}

fn cmd_validate(settings: &Settings, schema: Option<PathBuf>) -> CliResult {
    let registry = load_registry(settings, schema)?;
    let summaries = schema_summaries(&registry)?;

    println!("✓ Schema is valid");
    for summary in summaries {
        println!("{}", summary);
    }
    Ok(())
}

/// One line per entity. Every entity must also produce a plan as root.
fn schema_summaries(registry: &MetadataRegistry) -> HydrationResult<Vec<String>> {
    let mut summaries = Vec::new();
    for name in registry.entity_names() {
        let entity = registry.entity(&name)?;
        let plan = EagerPlan::build(registry, &name)?;
        summaries.push(format!(
            "  {} ({} columns, {} relations, {} eager positions)",
            entity.name(),
            entity.columns().len(),
            entity.relations().len(),
            plan.len()
        ));
    }
    Ok(summaries)
}
