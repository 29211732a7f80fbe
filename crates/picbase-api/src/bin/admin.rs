//! picbase-admin: maintenance commands for a picbase installation.
//!
//! Reads the same environment (and `.env`) as the server.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};

use picbase_api::ServerConfig;
use picbase_core::{
    validate_signup, AnnotationContext, NewUser, SessionRepository, SignupInput, UserRepository,
};
use picbase_crypto::hash_password_with;
use picbase_db::{Database, FilesystemBackend};
use picbase_inference::build_annotator;

#[derive(Parser)]
#[command(name = "picbase-admin")]
#[command(author, version, about = "Administration tool for picbase")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database file if needed and apply migrations
    InitDb,

    /// Delete the database file and recreate it empty (destructive)
    ResetDb {
        /// Confirm that all accounts and entries will be lost
        #[arg(long)]
        yes: bool,

        /// Also delete stored image files
        #[arg(long)]
        assets: bool,
    },

    /// Create an account without going through the HTTP API
    CreateUser {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        full_name: String,

        /// Account password
        #[arg(short, long, env = "PICBASE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Deactivate an account and end its sessions
    Deactivate { username: String },

    /// Reactivate a deactivated account
    Activate { username: String },

    /// Remove expired and ended sessions
    PurgeSessions,

    /// Report the configured AI provider and check it is reachable
    CheckAi {
        /// Also annotate this image and print the suggestion
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    match cli.command {
        Commands::InitDb => {
            let db = open(&config).await?;
            let users = db.users.count().await?;
            println!(
                "Database ready at {} ({} user(s))",
                config.database_url, users
            );
            db.pool.close().await;
        }
        Commands::ResetDb { yes, assets } => {
            if !yes {
                bail!("reset-db deletes every account and entry; pass --yes to confirm");
            }
            cmd_reset_db(&config, assets).await?;
        }
        Commands::CreateUser {
            username,
            email,
            full_name,
            password,
        } => {
            let db = open(&config).await?;
            validate_signup(&SignupInput {
                username: &username,
                email: &email,
                full_name: &full_name,
                password: &password,
                confirm_password: None,
            })?;
            let password_hash = hash_password_with(&password, &config.password_params)?;
            let user = db
                .users
                .insert(NewUser {
                    username,
                    email,
                    full_name,
                    password_hash,
                })
                .await?;
            println!("Created user {} ({})", user.username, user.id);
            println!("{} user(s) registered", db.users.count().await?);
        }
        Commands::Deactivate { username } => {
            let db = open(&config).await?;
            let user = find_user(&db, &username).await?;
            db.users.set_active(user.id, false).await?;
            let ended = db.sessions.deactivate_all_for_user(user.id).await?;
            println!("Deactivated {} and ended {} session(s)", username, ended);
        }
        Commands::Activate { username } => {
            let db = open(&config).await?;
            let user = find_user(&db, &username).await?;
            db.users.set_active(user.id, true).await?;
            println!("Activated {}", username);
        }
        Commands::PurgeSessions => {
            let db = open(&config).await?;
            let removed = db.sessions.purge_expired().await?;
            println!("Removed {} session(s)", removed);
        }
        Commands::CheckAi { image } => cmd_check_ai(&config, image.as_deref()).await?,
    }

    Ok(())
}

async fn open(config: &ServerConfig) -> anyhow::Result<Database> {
    let storage = FilesystemBackend::new(&config.asset_storage_path);
    let db = Database::connect(&config.database_url, Arc::new(storage))
        .await
        .with_context(|| format!("connecting to {}", config.database_url))?;
    db.migrate().await.context("applying migrations")?;
    Ok(db)
}

async fn find_user(db: &Database, username: &str) -> anyhow::Result<picbase_core::User> {
    db.users
        .find_credentials(username)
        .await?
        .map(|c| c.user)
        .ok_or_else(|| anyhow!("No user named '{}'", username))
}

/// Filesystem path of a SQLite URL such as `sqlite://picbase.db?mode=rwc`.
fn sqlite_file_path(url: &str) -> anyhow::Result<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .ok_or_else(|| anyhow!("Not a SQLite URL: {}", url))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        bail!("{} is not a database file", url);
    }
    Ok(PathBuf::from(path))
}

async fn remove_if_exists(path: &Path) -> anyhow::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}

async fn cmd_reset_db(config: &ServerConfig, assets: bool) -> anyhow::Result<()> {
    let path = sqlite_file_path(&config.database_url)?;
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let file = PathBuf::from(file);
        if remove_if_exists(&file).await? {
            println!("Removed {}", file.display());
        }
    }

    if assets {
        let dir = config.asset_storage_path.join("assets");
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => println!("Removed {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("removing {}", dir.display())),
        }
    }

    let db = open(config).await?;
    db.pool.close().await;
    println!("Database recreated at {}", config.database_url);
    Ok(())
}

async fn cmd_check_ai(config: &ServerConfig, image: Option<&Path>) -> anyhow::Result<()> {
    println!("Provider: {}", config.ai.resolved_provider());
    let Some(annotator) = build_annotator(&config.ai)? else {
        println!("AI features are disabled");
        return Ok(());
    };
    println!("Model: {}", annotator.model_name());

    let reachable = annotator.health_check().await.unwrap_or(false);
    println!("Reachable: {}", reachable);
    if !reachable {
        bail!("{} is not reachable", annotator.provider());
    }

    if let Some(path) = image {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let format = picbase_core::validate_upload(name, &data, config.max_upload_bytes)?;
        let suggestion = annotator
            .annotate(&data, format.mime_type(), &AnnotationContext::default())
            .await?;
        println!("{}", serde_json::to_string_pretty(&suggestion)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path("sqlite://picbase.db").unwrap(),
            PathBuf::from("picbase.db")
        );
        assert_eq!(
            sqlite_file_path("sqlite:data/pb.db?mode=rwc").unwrap(),
            PathBuf::from("data/pb.db")
        );
        assert_eq!(
            sqlite_file_path("sqlite:///var/lib/picbase.db").unwrap(),
            PathBuf::from("/var/lib/picbase.db")
        );
        assert!(sqlite_file_path("sqlite::memory:").is_err());
        assert!(sqlite_file_path("postgres://localhost/db").is_err());
    }

    #[test]
    fn test_cli_parses_reset() {
        let cli = Cli::try_parse_from(["picbase-admin", "reset-db", "--yes"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::ResetDb {
                yes: true,
                assets: false
            }
        ));
    }
}
