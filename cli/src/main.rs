//! `v1`: command-line client for the V1 Services record store

mod commands;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use config::Settings;
use config::crypto::TokenCipher;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use v1_store::{Collections, ContentsClient, FileSessionStore, RecordService, Role, Session};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Owner of the backing repository
    #[arg(long, env = "V1_OWNER")]
    owner: Option<String>,

    /// Name of the backing repository
    #[arg(long, env = "V1_REPO")]
    repo: Option<String>,

    /// Contents API root (GitHub Enterprise, proxies)
    #[arg(long, env = "V1_API_URL")]
    api_url: Option<String>,

    /// Bearer token; overrides the one saved by `setup`
    #[arg(long, env = "V1_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Re-run a mutation this many times if its write is rejected for a stale version tag
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the bearer token and repository settings
    Setup {
        /// Token with contents read/write access
        token: String,
    },
    /// Create empty users and requests collections if missing
    Init,
    /// Create an account
    Register {
        email: String,
        password: String,
        #[arg(long, default_value = "client")]
        role: Role,
    },
    /// Sign in and remember the user
    Login { email: String, password: String },
    /// Forget the signed-in user and the saved token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Submit a new service request (clients)
    Submit {
        service: String,
        period: String,
        #[arg(default_value = "")]
        description: String,
    },
    /// List requests visible to the signed-in user
    Requests,
    /// Change a request's status (auditors, admins)
    UpdateStatus {
        tracking_id: String,
        status: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Assign an auditor to a request (admins)
    Assign {
        tracking_id: String,
        auditor: String,
    },
    /// List all accounts (admins)
    Users,
}

fn setup_tracing(log_level: &str) -> anyhow::Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Settings file values with command-line / environment overrides applied
fn resolve_settings(args: &Args) -> Settings {
    let mut settings = Settings::load();
    if let Some(owner) = &args.owner {
        settings.owner = Some(owner.clone());
    }
    if let Some(repo) = &args.repo {
        settings.repo = repo.clone();
    }
    if let Some(url) = &args.api_url {
        settings.api_base_url = url.clone();
    }
    settings
}

fn connect(
    settings: &Settings,
    session: &Session<FileSessionStore>,
    token: Option<String>,
) -> anyhow::Result<RecordService> {
    let token = token
        .or_else(|| session.token())
        .ok_or_else(|| anyhow!("No token configured: run `v1 setup <token>` or set V1_TOKEN"))?;

    let client = ContentsClient::from_settings(settings, token).map_err(anyhow::Error::msg)?;
    let collections = Collections::from_settings(Arc::new(client), settings);
    Ok(RecordService::new(collections))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_env_file();
    let args = Args::parse();
    setup_tracing(&args.log_level)?;

    config::PathManager::ensure_dirs_exist().context("Failed to create data directories")?;
    let settings = resolve_settings(&args);
    let cipher = TokenCipher::for_this_machine().map_err(anyhow::Error::msg)?;
    let session = Session::new(FileSessionStore::open_default()?, cipher);

    match args.command {
        Command::Setup { token } => commands::setup(&settings, &session, &token),
        Command::Logout => commands::logout(&session),
        Command::Whoami => commands::whoami(&session),
        command => {
            let service = connect(&settings, &session, args.token)?;
            commands::run(command, &service, &session, args.retries).await
        }
    }
}
