//! Lakehouse CLI - terminal front end for the Lakehouse dashboard.

use clap::{Parser, Subcommand, ValueEnum};
use lakehouse_session::{AppContext, ClientConfig, FileQuery, StatsKind};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

/// Lakehouse - document catalog dashboard
#[derive(Parser, Debug)]
#[command(name = "lakehouse")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (defaults to `<config_dir>/lakehouse/config.json`)
    #[arg(long, env = "LAKEHOUSE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Base URL of the Lakehouse API
    #[arg(long, env = "LAKEHOUSE_API_URL", global = true)]
    api_url: Option<String>,

    /// Where the session credential is stored
    #[arg(long, env = "LAKEHOUSE_SESSION_FILE", global = true)]
    session_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and persist the session
    Login {
        /// Account name
        username: String,
        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account (does not sign in)
    Register {
        /// Account name
        username: String,
        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the current session
    Whoami,

    /// Show which screen a path resolves to
    Route {
        /// Navigation path, e.g. `/`, `/login`, `/files`
        path: String,
    },

    /// Dashboard metric cards
    Metrics,

    /// List catalog files
    Files {
        /// Page size
        #[arg(long, default_value_t = 50)]
        limit: u32,
        /// Rows to skip
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// Restrict to one file format
        #[arg(long)]
        format: Option<String>,
        /// Substring of the object name
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one catalog entry
    File {
        /// Catalog id
        id: i64,
    },

    /// Delete a catalog entry and its object
    Delete {
        /// Catalog id
        id: i64,
    },

    /// Upload a document
    Upload {
        /// Local file
        path: PathBuf,
    },

    /// Search extracted document text
    Search {
        /// Search terms
        query: String,
        /// Maximum results
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Storage or processing statistics
    Stats {
        /// Which panel
        #[arg(value_enum)]
        kind: StatsArg,
    },

    /// Check API health
    Health,

    /// Change the signed-in user's password
    ChangePassword {
        /// Current password (prompted when omitted)
        #[arg(long)]
        old: Option<String>,
        /// New password (prompted when omitted)
        #[arg(long)]
        new: Option<String>,
    },

    /// Show or update the stored configuration
    Config {
        /// Persist a new API base URL
        #[arg(long)]
        set_api_url: Option<String>,
        /// Persist a new request timeout in seconds
        #[arg(long)]
        set_timeout: Option<u64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatsArg {
    Storage,
    Processing,
}

impl From<StatsArg> for StatsKind {
    fn from(arg: StatsArg) -> Self {
        match arg {
            StatsArg::Storage => StatsKind::Storage,
            StatsArg::Processing => StatsKind::Processing,
        }
    }
}

fn init_logging(verbose: u8, json: bool) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let registry = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| format!("lakehouse={log_level}").into()),
    );

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> ClientConfig {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    };
    if let Some(url) = &cli.api_url {
        config.api_url.clone_from(url);
    }
    if let Some(path) = &cli.session_file {
        config.session_file = Some(path.clone());
    }
    if let Some(secs) = cli.timeout {
        config.request_timeout_secs = secs;
    }
    config
}

async fn run(cli: Cli) -> commands::Result<()> {
    // Edits the file as stored, without command-line overrides.
    if let Commands::Config {
        set_api_url,
        set_timeout,
    } = &cli.command
    {
        let path = cli
            .config
            .clone()
            .or_else(ClientConfig::config_path)
            .ok_or_else(|| commands::CliError::Config("no config directory".to_string()))?;
        commands::config(&path, set_api_url.clone(), *set_timeout)?;
        return Ok(());
    }

    let config = load_config(&cli);
    let ctx = AppContext::from_config(&config)?;

    // Resolve the persisted session before anything routes or sends.
    let status = ctx.session.resolve_startup();
    tracing::debug!(?status, api_url = %config.api_url, "Session resolved");

    match cli.command {
        Commands::Login { username, password } => {
            commands::login(&ctx, &username, password).await
        }
        Commands::Register { username, password } => {
            commands::register(&ctx, &username, password).await
        }
        Commands::Logout => {
            commands::logout(&ctx);
            Ok(())
        }
        Commands::Whoami => {
            commands::whoami(&ctx);
            Ok(())
        }
        Commands::Route { path } => {
            commands::route(&ctx, &path);
            Ok(())
        }
        Commands::Metrics => commands::metrics(&ctx).await,
        Commands::Files {
            limit,
            offset,
            format,
            search,
        } => {
            let query = FileQuery {
                limit,
                offset,
                format,
                search,
            };
            commands::files(&ctx, &query).await
        }
        Commands::File { id } => commands::file(&ctx, id).await,
        Commands::Delete { id } => commands::delete(&ctx, id).await,
        Commands::Upload { path } => commands::upload(&ctx, &path).await,
        Commands::Search { query, limit } => commands::search(&ctx, &query, limit).await,
        Commands::Stats { kind } => commands::stats(&ctx, kind.into()).await,
        Commands::Health => commands::health(&ctx).await,
        Commands::ChangePassword { old, new } => commands::change_password(&ctx, old, new).await,
        Commands::Config { .. } => Ok(()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
