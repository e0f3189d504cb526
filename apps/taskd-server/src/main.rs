use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs, DatabaseConfig, ServerConfig};

use api_ingress::{ApiIngress, ApiIngressConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tasks::domain::repo::TaskRepository;
use tasks::{InMemoryTaskRepository, SqlRepoOptions, SqlTaskRepository, TaskService, TasksConfig};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create database directory '{}'", dir.display()))?;
        }
    }

    // Rebuild DSN with absolute path and normalized slashes
    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Taskd Server - task record-management RPC service
#[derive(Parser)]
#[command(name = "taskd-server")]
#[command(about = "Taskd Server - task record-management RPC service")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use the in-memory task store instead of the database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI args passed down to config/app
    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    runtime::logging::init_logging_from_config(&config.logging, Path::new(&config.server.home_dir));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Taskd Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(&config, &args),
    }
}

fn ingress_config(server: &ServerConfig) -> ApiIngressConfig {
    ApiIngressConfig {
        bind_addr: format!("{}:{}", server.host, server.port),
        cors_enabled: server.cors_enabled,
        request_timeout_sec: server.request_timeout_sec,
        service_name: server.service_name.clone(),
    }
}

fn sql_options(db: &DatabaseConfig) -> SqlRepoOptions {
    let defaults = SqlRepoOptions::default();
    SqlRepoOptions {
        max_conns: db.max_conns.unwrap_or(defaults.max_conns),
        busy_timeout: db
            .busy_timeout_ms
            .map(|ms| Duration::from_millis(u64::from(ms)))
            .unwrap_or(defaults.busy_timeout),
        acquire_timeout: db
            .acquire_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.acquire_timeout),
    }
}

async fn open_repository(config: &AppConfig, args: &CliArgs) -> Result<Arc<dyn TaskRepository>> {
    let db_config = match (&config.database, args.mock) {
        (_, true) => {
            tracing::info!("--mock set, using the in-memory task store");
            return Ok(Arc::new(InMemoryTaskRepository::new()));
        }
        (None, false) => {
            tracing::warn!("No database configuration found, using the in-memory task store");
            return Ok(Arc::new(InMemoryTaskRepository::new()));
        }
        (Some(db), false) => db,
    };

    // Base dir for resolving relative sqlite paths (already absolute & created)
    let base_dir = PathBuf::from(&config.server.home_dir);
    let dsn = absolutize_sqlite_dsn(db_config.url.trim(), &base_dir, true)?;

    tracing::info!(dsn = %dsn, "Connecting to database");
    let repo = SqlTaskRepository::connect(&dsn, &sql_options(db_config))
        .await
        .with_context(|| format!("Failed to open task store at {dsn}"))?;
    Ok(Arc::new(repo))
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    api_ingress::recovery::install_panic_hook();

    let tasks_config: TasksConfig = config.module_config("tasks")?;
    tasks_config.validate()?;
    let repo = open_repository(&config, &args).await?;
    let service = Arc::new(TaskService::new(repo, tasks_config));

    let ingress = ApiIngress::new(ingress_config(&config.server));
    let call_timeout = ingress.config().request_timeout();
    let router = ingress.build_router(tasks::router(service, call_timeout));

    let listener = ingress.bind().await?;
    let shutdown = async {
        if let Err(e) = api_ingress::shutdown::wait_for_shutdown().await {
            tracing::warn!(error = %e, "signal handlers unavailable, falling back to Ctrl-C");
            let _ = tokio::signal::ctrl_c().await;
        }
        tracing::info!("HTTP server shutting down gracefully");
    };

    ingress.serve(listener, router, shutdown).await
}

fn check_config(config: &AppConfig, args: &CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    // AppConfig::load_* already normalized & created home_dir
    let tasks_config: TasksConfig = config.module_config("tasks")?;
    tasks_config.validate()?;

    let bind_addr = ingress_config(&config.server).bind_addr;
    bind_addr
        .parse::<std::net::SocketAddr>()
        .with_context(|| format!("Invalid bind address '{bind_addr}'"))?;

    if let Some(db) = config.database.as_ref().filter(|_| !args.mock) {
        absolutize_sqlite_dsn(db.url.trim(), Path::new(&config.server.home_dir), false)?;
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
