//! OpsDeck operator console
//!
//! Drives the dashboard backends through the shared credential session,
//! so a session stored by `opsdeck login` is reused (and refreshed) by
//! every later command.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use cli::{Cli, Collection, Command, TokenStore};
use opsdeck_client::{ClientRegistry, EntityClient};
use opsdeck_core::{
    ClientConfig, Entity, EventBus, EventReceiver, LoginRequest, RegisterRequest, SessionEvent, TokenRepository,
};
use opsdeck_storage::{default_database_path, Database, KeychainTokenRepository, SqliteTokenRepository};

/// Log file prefix inside the logs directory
const LOG_PREFIX: &str = "opsdeck";

fn logs_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("opsdeck")
        .join("logs")
}

fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn")
            .add_directive("opsdeck_core=info".parse().unwrap())
            .add_directive("opsdeck_client=info".parse().unwrap())
            .add_directive("opsdeck_storage=info".parse().unwrap())
            .add_directive("opsdeck=info".parse().unwrap())
    });

    // Console layer: compact, on stderr so command output stays clean
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .compact()
        .with_target(false);

    let logs_dir = logs_dir();
    let file_appender = std::fs::create_dir_all(&logs_dir)
        .ok()
        .and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_PREFIX)
                .filename_suffix("log")
                .build(&logs_dir)
                .ok()
        });

    match file_appender {
        Some(appender) => {
            let (non_blocking_file, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .init();
            warn!("File logging disabled: cannot write to {}", logs_dir.display());
            None
        }
    }
}

fn open_storage(cli: &Cli) -> Result<Arc<dyn TokenRepository>> {
    match cli.token_store {
        TokenStore::Sqlite => {
            let path = match &cli.database {
                Some(path) => path.clone(),
                None => default_database_path().context("No user data directory available")?,
            };
            let db = Database::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Arc::new(SqliteTokenRepository::new(Arc::new(
                parking_lot::Mutex::new(db),
            ))))
        }
        TokenStore::Keychain => Ok(Arc::new(KeychainTokenRepository::new()?)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn list<E: Entity + Serialize>(client: EntityClient<E>, offset: u32, limit: u32) -> Result<()> {
    print_json(&client.list(offset, limit).await?)
}

async fn search<E: Entity + Serialize>(client: EntityClient<E>, query: &str, limit: u32) -> Result<()> {
    print_json(&client.search(query, limit).await?)
}

async fn get<E: Entity + Serialize>(client: EntityClient<E>, id: u64) -> Result<()> {
    print_json(&client.get_by_id(id).await?)
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::from_env()?;
    let storage = open_storage(&cli)?;

    let events = EventBus::new();
    let mut receiver = events.subscribe();
    let registry = ClientRegistry::builder(config, storage).events(events).build()?;

    let result = execute(&registry, cli.command).await;

    if sign_in_required(&mut receiver) {
        eprintln!("Session expired. Run `opsdeck login` to sign in again.");
    }

    result
}

/// Drain queued session events, reporting whether a sign-in was requested.
///
/// Events are published before the failing call returns, so everything is
/// already queued once the command has finished.
fn sign_in_required(receiver: &mut EventReceiver) -> bool {
    let mut required = false;
    while let Some(event) = receiver.try_recv() {
        required |= event == SessionEvent::SignInRequired;
    }
    required
}

async fn execute(registry: &ClientRegistry, command: Command) -> Result<()> {
    match command {
        Command::Register {
            email,
            username,
            password,
        } => {
            let response = registry
                .auth()?
                .register(&RegisterRequest {
                    email,
                    username,
                    password,
                })
                .await?;
            println!("{}", response.message);
            print_json(&response.user)?;
        }
        Command::Login { email, password } => {
            let identity = registry
                .auth()?
                .login(&LoginRequest { email, password })
                .await?;
            match identity {
                Some(profile) => println!("Signed in as {}", profile.username),
                None => println!("Signed in (profile unavailable)"),
            }
        }
        Command::Profile => {
            print_json(&registry.auth()?.load_profile().await?)?;
        }
        Command::Logout => {
            registry.auth()?.logout().await;
            println!("Signed out");
        }
        Command::Status => {
            if registry.session().is_authenticated() {
                println!("Signed in");
            } else {
                println!("Signed out");
            }
        }
        Command::List {
            collection,
            offset,
            limit,
        } => match collection {
            Collection::Users => list(registry.users()?, offset, limit).await?,
            Collection::Products => list(registry.products()?, offset, limit).await?,
            Collection::Tasks => list(registry.tasks()?, offset, limit).await?,
            Collection::Media => list(registry.media()?, offset, limit).await?,
        },
        Command::Search {
            collection,
            query,
            limit,
        } => match collection {
            Collection::Users => search(registry.users()?, &query, limit).await?,
            Collection::Products => search(registry.products()?, &query, limit).await?,
            Collection::Tasks => search(registry.tasks()?, &query, limit).await?,
            Collection::Media => search(registry.media()?, &query, limit).await?,
        },
        Command::Get { collection, id } => match collection {
            Collection::Users => get(registry.users()?, id).await?,
            Collection::Products => get(registry.products()?, id).await?,
            Collection::Tasks => get(registry.tasks()?, id).await?,
            Collection::Media => get(registry.media()?, id).await?,
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let guard = init_tracing();

    info!("[Console] OpsDeck console v{}", env!("CARGO_PKG_VERSION"));

    let result = run(cli).await;

    // Flush the file layer before exiting
    drop(guard);

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
