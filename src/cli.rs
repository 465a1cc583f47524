//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::adapters::catalog_import::import_cryptocurrencies;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::open_store;
use crate::domain::error::PortfolioError;
use crate::domain::user::{self, Role};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_LOG_FILTER: &str = "cointrack=info,tower_http=info";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";

#[derive(Parser, Debug)]
#[command(name = "cointrack", about = "Cryptocurrency portfolio tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web API server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the database tables if they do not exist
    InitDb {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create a superuser account; the password is read from stdin
    CreateSuperuser {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Import cryptocurrencies from a JSON object of symbol to name
    ImportCryptocurrencies {
        #[arg(short, long)]
        config: PathBuf,
        json_file: PathBuf,
    },
    /// Wait until the database accepts connections
    WaitForDb {
        #[arg(short, long)]
        config: PathBuf,
        /// Give up after this many attempts (unlimited by default)
        #[arg(long)]
        max_attempts: Option<u32>,
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::InitDb { config } => run_init_db(&config),
        Command::CreateSuperuser {
            config,
            email,
            name,
        } => run_create_superuser(&config, &email, &name),
        Command::ImportCryptocurrencies { config, json_file } => {
            run_import(&config, &json_file)
        }
        Command::WaitForDb {
            config,
            max_attempts,
            interval_ms,
        } => run_wait_for_db(&config, max_attempts, Duration::from_millis(interval_ms)),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| fail(&err))
}

fn fail(err: &PortfolioError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

/// `RUST_LOG` wins over `[log] filter`.
pub fn init_tracing(config: &dyn ConfigPort) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            config
                .get_string("log", "filter")
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        )
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .ok();
}

fn setup(config_path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    let config = load_config(config_path)?;
    init_tracing(&config);
    Ok(config)
}

fn run_init_db(config_path: &Path) -> ExitCode {
    let config = match setup(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let result = open_store(&config).and_then(|store| store.initialize_schema());
    match result {
        Ok(()) => {
            eprintln!("Database ready");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_create_superuser(config_path: &Path, email: &str, name: &str) -> ExitCode {
    let config = match setup(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    eprintln!("Enter password:");
    let password = match io::stdin().lock().lines().next() {
        Some(Ok(line)) => line.trim_end_matches(['\r', '\n']).to_string(),
        Some(Err(e)) => return fail(&PortfolioError::Io(e)),
        None => String::new(),
    };

    let result = open_store(&config).and_then(|store| {
        store.initialize_schema()?;
        user::register(store.as_ref(), email, &password, name, Role::Superuser)
    });
    match result {
        Ok(created) => {
            println!("Superuser {} created", created.email);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_import(config_path: &Path, json_file: &Path) -> ExitCode {
    let config = match setup(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let result = open_store(&config).and_then(|store| {
        store.initialize_schema()?;
        import_cryptocurrencies(store.as_ref(), json_file)
    });
    match result {
        Ok(imported) => {
            println!("Imported {imported} Coins");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_wait_for_db(config_path: &Path, max_attempts: Option<u32>, interval: Duration) -> ExitCode {
    let config = match setup(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    eprintln!("Waiting for database...");
    match wait_for(|| store.ping(), max_attempts, interval) {
        Ok(attempts) => {
            tracing::info!(attempts, "database available");
            eprintln!("Database available!");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Calls `probe` until it succeeds, sleeping `interval` between failures.
/// Returns the number of attempts made.
pub fn wait_for(
    mut probe: impl FnMut() -> Result<(), PortfolioError>,
    max_attempts: Option<u32>,
    interval: Duration,
) -> Result<u32, PortfolioError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match probe() {
            Ok(()) => return Ok(attempt),
            Err(e) if max_attempts.is_some_and(|max| attempt >= max) => return Err(e),
            Err(e) => {
                tracing::debug!(attempt, error = %e, "database not ready");
                eprintln!("Database unavailable, waiting {} ms...", interval.as_millis());
                thread::sleep(interval);
            }
        }
    }
}

fn run_serve(config_path: &Path) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};
        use crate::domain::page::PaginationSettings;
        use std::net::SocketAddr;

        let config = match setup(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };

        let listen = config
            .get_string("web", "listen")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let addr: SocketAddr = match listen.parse() {
            Ok(a) => a,
            Err(e) => {
                return fail(&PortfolioError::ConfigInvalid {
                    section: "web".into(),
                    key: "listen".into(),
                    reason: format!("{e}"),
                });
            }
        };

        let state = match open_store(&config).and_then(|store| {
            store.initialize_schema()?;
            Ok(AppState {
                store,
                pagination: PaginationSettings::from_config(&config)?,
            })
        }) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };
        let router = build_router(state);

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => return fail(&PortfolioError::Io(e)),
        };
        let served = runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(%addr, "listening");
            eprintln!("Starting web server on {addr}");
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::info!("shutting down");
                })
                .await
        });
        match served {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&PortfolioError::Io(e)),
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}
