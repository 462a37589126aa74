mod banner;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use migserve_common::LocationField;
use migserve_config::{AppConfig, ConfigLoader};
use migserve_db::{MigrationOutcome, MigrationStore};
use migserve_remote::RemoteSource;
use migserve_server::ListingServer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, prelude::*};

#[derive(Parser)]
#[command(
    name = "migserve",
    version,
    about = "Migration listing service and runner",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Serve options used when no subcommand is given
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Serve the migration listing over HTTP (default)
    Serve(ServeArgs),
    /// Apply migrations to a SQLite database
    Migrate(MigrateArgs),
    /// Print the listing served at a URL
    List {
        #[arg(long)]
        url: String,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Path to a YAML or TOML config file
    #[arg(long, env = "MIGSERVE_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// JSON key for each record's location: `file` or `url`
    #[arg(long)]
    location_field: Option<LocationField>,
    #[arg(long)]
    status_code: Option<u16>,
    /// Log every incoming request
    #[arg(long)]
    log_requests: bool,
}

#[derive(Args)]
#[command(group(ArgGroup::new("source").required(true).args(["dir", "remote", "sql_file"])))]
struct MigrateArgs {
    /// Path to a YAML or TOML config file
    #[arg(long, env = "MIGSERVE_CONFIG")]
    config: Option<PathBuf>,
    /// SQLite database file
    #[arg(long)]
    db: Option<PathBuf>,
    /// Directory (or single .sql file) of migrations
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Listing URL of a migration listing service
    #[arg(long)]
    remote: Option<String>,
    /// Id to record for --sql-file
    #[arg(long, requires = "sql_file")]
    id: Option<String>,
    #[arg(long, requires = "id")]
    sql_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(e) = run(cli.into_command()).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(format!(
        "warn,migserve={level},migserve_server={level},migserve_config={level},migserve_db={level},migserve_remote={level},tower_http={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Serve(args) => serve(args).await,
        Command::Migrate(args) => migrate(args).await,
        Command::List { url } => list(&url).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let loader = match path {
        Some(p) => ConfigLoader::new().with_file(p),
        None => ConfigLoader::new(),
    };
    loader.load().context("failed to load configuration")
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(field) = args.location_field {
        config.server.location_field = field;
    }
    if let Some(code) = args.status_code {
        config.server.status_code = code;
    }
    if args.log_requests {
        config.server.log_requests = true;
    }
    config.validate().context("invalid configuration")?;

    let bound = ListingServer::new(config.server)
        .bind()
        .await
        .context("failed to start listing service")?;
    banner::print_startup(&bound.local_addr());

    bound.serve_with_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn migrate(args: MigrateArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let db_path = args
        .db
        .or(config.database.path)
        .unwrap_or_else(|| ConfigLoader::default_config_dir().join("migrations.db"));
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let store = MigrationStore::open(&db_path)?;

    let applied_new = if let Some(dir) = args.dir {
        store.apply_dir(&dir)?
    } else if let Some(url) = args.remote {
        RemoteSource::new().migrate(&store, &url).await?
    } else if let (Some(id), Some(sql_file)) = (args.id, args.sql_file) {
        let script = std::fs::read_to_string(&sql_file)
            .with_context(|| format!("failed to read {}", sql_file.display()))?;
        store.apply_content(&id, &script)? == MigrationOutcome::Executed
    } else {
        anyhow::bail!("no migration source given");
    };

    if applied_new {
        println!("Migrations applied to {}.", db_path.display());
    } else {
        println!("No new migrations to apply.");
    }
    info!("{} migrations recorded", store.applied()?.len());
    Ok(())
}

async fn list(url: &str) -> Result<()> {
    let listing = RemoteSource::new().fetch_listing(url).await?;
    for m in &listing {
        println!("{}  {:<20}  {}", m.id, m.name.as_deref().unwrap_or("-"), m.url);
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
