// ABOUTME: Entry point for the deckstore binary.
// ABOUTME: Parses CLI arguments, initializes tracing, and runs one driver operation.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use deckstore_store::{BackendKind, DeckstoreConfig, Driver};

#[derive(Parser, Debug)]
#[command(name = "deckstore", version, about = "Local flashcard deck library")]
struct Cli {
    /// Storage backend to use; overrides DECKSTORE_BACKEND.
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    /// One SQLite database file.
    Sqlite,
    /// One plain file per deck under a directory.
    Tree,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Sqlite => BackendKind::Sqlite,
            BackendArg::Tree => BackendKind::Tree,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pull every deck listed in the remote manifest.
    Sync {
        /// Manifest location relative to the library root; defaults to DECKSTORE_MANIFEST.
        location: Option<String>,
    },
    /// List deck groups, base group first.
    Groups,
    /// List decks in a group (the base group when omitted).
    Files { group: Option<String> },
    /// Print the text of a deck.
    Read { path: String },
    /// Store a deck read from FILE, or from stdin.
    Write {
        path: String,
        #[arg(long = "from")]
        from: Option<PathBuf>,
    },
    /// Remove a deck. Missing decks are not an error.
    Delete { path: String },
    /// Move records stored under legacy keys to their canonical keys.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deckstore=info,deckstore_store=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = DeckstoreConfig::from_env().context("loading configuration")?;
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }

    let driver = Driver::from_config(&config).context("building driver")?;
    driver.init().await.with_context(|| {
        format!("opening {} backend under {}", driver.backend(), config.home.display())
    })?;

    tracing::debug!("deckstore using {} backend", driver.backend());

    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Command::Sync { location } => {
            let location = location.unwrap_or_else(|| config.manifest.clone());
            let report = driver.sync_from_manifest(&location).await?;
            writeln!(stdout, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        Command::Groups => {
            for group in driver.list_groups().await? {
                writeln!(stdout, "{}", group)?;
            }
        }
        Command::Files { group } => {
            for entry in driver.list_files(group.as_deref()).await? {
                writeln!(stdout, "{}\t{}", entry.path, entry.display)?;
            }
        }
        Command::Read { path } => {
            let text = driver.read_file(&path).await?;
            stdout.write_all(text.as_bytes())?;
        }
        Command::Write { path, from } => {
            let text = match from {
                Some(file) => std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            driver.write_file(&path, &text).await?;
        }
        Command::Delete { path } => {
            driver.delete_file(&path).await?;
        }
        Command::Migrate => {
            let report = driver.migrate_legacy_keys().await?;
            writeln!(stdout, "{}", serde_json::to_string_pretty(&report)?)?;
        }
    }

    Ok(())
}
