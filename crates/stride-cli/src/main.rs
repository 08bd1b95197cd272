mod catalog_cmds;
mod config;
mod macro_cmds;
mod plan_cmds;

use clap::{Parser, Subcommand};

use stride_core::plan::{PlanFormat, Weekday};
use stride_db::models::CatalogStatus;
use stride_db::{pool, queries};

use config::StrideConfig;

#[derive(Parser)]
#[command(name = "stride", about = "Training-plan compiler and catalog tool")]
struct Cli {
    /// Database URL (overrides STRIDE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a stride config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/stride")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the catalog database (requires config file or env vars)
    DbInit,
    /// Compile, check, and remap authored plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Inspect the built-in workout macro table
    Macros {
        #[command(subcommand)]
        command: MacroCommands,
    },
    /// Manage plans stored in the catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Compile a plan and print the normalized JSON
    Compile {
        /// Plan file (JSON or TOML), or `-` for stdin
        file: String,
        /// Source format (detected from the extension or content when omitted)
        #[arg(long)]
        format: Option<PlanFormat>,
        /// Write the compiled plan to this file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
    /// Compile a plan and print a short summary
    Check {
        /// Plan file (JSON or TOML), or `-` for stdin
        file: String,
        /// Source format (detected from the extension or content when omitted)
        #[arg(long)]
        format: Option<PlanFormat>,
    },
    /// Compile a plan, then move long sessions to preferred days
    Remap {
        /// Plan file (JSON or TOML), or `-` for stdin
        file: String,
        /// Source format (detected from the extension or content when omitted)
        #[arg(long)]
        format: Option<PlanFormat>,
        /// Day for each week's long run (e.g. Sunday, sun)
        #[arg(long)]
        long_run_day: Option<Weekday>,
        /// Day for each week's long ride (e.g. Saturday, sat)
        #[arg(long)]
        long_ride_day: Option<Weekday>,
        /// Drop strength sessions not tagged mandatory_strength
        #[arg(long)]
        no_strength: bool,
        /// Write the remapped plan to this file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MacroCommands {
    /// List all macros
    List {
        /// Show the expanded steps for each macro
        #[arg(long)]
        verbose: bool,
    },
    /// Print the steps a macro token expands to
    Expand {
        /// Macro token, with or without the leading `@`
        token: String,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// Compile a plan and store it in the catalog
    Publish {
        /// Plan file (JSON or TOML), or `-` for stdin
        file: String,
        /// Source format (detected from the extension or content when omitted)
        #[arg(long)]
        format: Option<PlanFormat>,
        /// Catalog tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Initial status: draft, published, or archived
        #[arg(long, default_value = "draft")]
        status: CatalogStatus,
    },
    /// List catalog plans
    List {
        /// Only show plans with this status
        #[arg(long)]
        status: Option<CatalogStatus>,
    },
    /// Show a catalog plan and its stored body
    Show {
        /// Catalog plan ID
        id: String,
    },
    /// Change the status of a catalog plan
    SetStatus {
        /// Catalog plan ID
        id: String,
        /// New status: draft, published, or archived
        status: CatalogStatus,
    },
}

/// Execute the `stride init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        ..config::ConfigFile::default()
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Next: run `stride db-init` to migrate the catalog database.");

    Ok(())
}

/// Execute the `stride db-init` command: migrate the catalog and report its contents.
///
/// The database itself must already exist.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = StrideConfig::resolve(cli_db_url)?;

    println!("Initializing stride catalog...");

    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let version = pool::run_migrations(&db_pool).await?;

    let counts = queries::catalog::count_by_status(&db_pool).await?;
    println!("Catalog ready (schema version {version}). Plans by status:");
    for (status, count) in &counts {
        println!("  {status:<10} {count}");
    }

    db_pool.close().await;

    println!("stride db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Plan { command } => {
            let resolved = StrideConfig::resolve(cli.database_url.as_deref())?;
            plan_cmds::run_plan_command(command, &resolved)?;
        }
        Commands::Macros { command } => {
            macro_cmds::run_macro_command(command)?;
        }
        Commands::Catalog { command } => {
            let resolved = StrideConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = catalog_cmds::run_catalog_command(command, &db_pool, &resolved).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
