use std::error::Error;
use std::fs::File;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use portico::api::client::ApiClient;
use portico::auth::interceptor::SessionListener;
use portico::auth::service::AuthService;
use portico::auth::storage::FileStorage;
use portico::auth::token_store::TokenStore;
use portico::auth::types::{Credentials, RegisterRequest};
use portico::core::config;

#[derive(Parser)]
#[command(name = "portico", about = "Command-line client for a Portico backend")]
struct Args {
    /// Override the API base URL
    #[arg(short, long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session tokens
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account (a session starts when the server auto-logs-in)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// End the session: best-effort server call, always clears local tokens
    Logout,
    /// Show the currently authenticated user
    Whoami,
    /// Show whether a session is stored locally
    Status,
}

/// Prints a notice when the interceptor tears the session down.
struct StderrNotice;

#[async_trait]
impl SessionListener for StderrNotice {
    async fn on_session_expired(&self) {
        eprintln!("session expired, please log in again");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to portico.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("portico.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    log::info!("Portico starting up");

    let loaded = config::load_config()?;
    let resolved = config::resolve(&loaded, args.base_url.as_deref());

    // Composition root: everything is constructed here and passed down by
    // reference; no singletons.
    let storage = Arc::new(FileStorage::new(FileStorage::default_path()?));
    let tokens = TokenStore::new(storage);
    let client = ApiClient::new(&resolved, tokens.clone(), Some(Arc::new(StderrNotice)))?;
    let auth = AuthService::new(client, tokens.clone(), resolved.endpoints.clone());

    match args.command {
        Command::Login { email, password } => {
            let session = auth.login(&Credentials { email, password }).await?;
            println!("logged in as {}", session.user.email);
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let account = auth
                .register(&RegisterRequest {
                    name,
                    email,
                    password,
                })
                .await?;
            match account.tokens {
                Some(_) => println!("registered and logged in as {}", account.user.email),
                None => println!(
                    "registered {}, log in to start a session",
                    account.user.email
                ),
            }
        }
        Command::Logout => {
            auth.logout().await;
            println!("logged out");
        }
        Command::Whoami => {
            let user = auth.current_user().await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Status => {
            if auth.is_authenticated() {
                println!("session tokens present (expired: {})", tokens.is_expired());
            } else {
                println!("no session");
            }
        }
    }

    Ok(())
}
