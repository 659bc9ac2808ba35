mod commands;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::Result;
use orgtree_core::{
    Directory, DirectoryGateway, GatewayClosure, InMemoryDirectory, OperationContext,
    OrgtreeConfig, PersonnelId, config,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "orgtree")]
#[command(about = "Inspect reporting hierarchies in the organizational directory")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Serve lookups from a JSON snapshot instead of the directory service
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Personnel id to act as
    #[arg(long = "as", value_name = "PERSONNEL_ID")]
    as_user: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the acting user's team
    Team,
    /// List subordinate positions of a position
    Subordinates {
        /// Root position id
        position: String,

        /// Return vacant positions instead of looking through them
        #[arg(long)]
        no_fallback: bool,
    },
    /// Show a personnel record with its department
    User {
        /// Personnel id
        id: String,
    },
    /// Show the department headed by a user (the acting user by default)
    ManagedDepartment {
        /// Personnel id
        id: Option<String>,
    },
    /// Check whether the acting user manages all given departments
    CanManage {
        /// Department ids
        #[arg(required = true)]
        departments: Vec<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Save current configuration to file
    Save {
        /// Path to save configuration
        #[arg(default_value = "orgtree.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .rgb_colors(miette::RgbColors::Preferred)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    let cli = Cli::parse();

    // Initialize tracing
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if cli.debug {
        EnvFilter::new("orgtree_core=debug,orgtree_cli=debug")
    } else {
        EnvFilter::new("orgtree_core=info,orgtree_cli=info,warn")
    };

    // Logs go to stderr so JSON output stays pipeable
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
        .compact()
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        info!("Loading config from: {:?}", config_path);
        config::load_config(config_path).await?
    } else {
        info!("Loading config from standard locations");
        config::load_config_from_standard_locations().await?
    };

    if let Commands::Config { cmd } = &cli.command {
        match cmd {
            ConfigCommands::Show => commands::config::show(&config).await?,
            ConfigCommands::Save { path } => commands::config::save(&config, path).await?,
        }
        return Ok(());
    }

    let directory = open_directory(&cli, &config).await?;
    let context = operation_context(&directory, cli.as_user.as_deref()).await?;

    match &cli.command {
        Commands::Team => commands::directory::team(&directory, &context).await?,
        Commands::Subordinates {
            position,
            no_fallback,
        } => commands::directory::subordinates(&directory, position, !*no_fallback).await?,
        Commands::User { id } => commands::directory::user(&directory, &context, id).await?,
        Commands::ManagedDepartment { id } => {
            commands::directory::managed_department(&directory, &context, id.as_deref()).await?
        }
        Commands::CanManage { departments } => {
            commands::directory::can_manage(&directory, &context, departments).await?
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

async fn open_directory(cli: &Cli, config: &OrgtreeConfig) -> Result<Directory> {
    let Some(snapshot) = &cli.snapshot else {
        info!("Using directory service at {}", config.service.url);
        return Ok(Directory::from_config(config)?);
    };

    info!("Loading snapshot from: {:?}", snapshot);
    let gateway: Arc<dyn DirectoryGateway> = Arc::new(
        InMemoryDirectory::from_path(snapshot)
            .await
            .map_err(miette::Report::new)?,
    );
    let closure = Arc::new(GatewayClosure::new(gateway.clone()));
    Ok(Directory::new(gateway, closure, config))
}

async fn operation_context(
    directory: &Directory,
    as_user: Option<&str>,
) -> Result<OperationContext> {
    let Some(id) = as_user else {
        return Ok(OperationContext::anonymous());
    };

    let user = directory
        .user_by_id(&OperationContext::anonymous(), &PersonnelId::new(id))
        .await?;
    tracing::debug!(user_id = %user.id, "acting as user");
    Ok(OperationContext::new(user))
}
