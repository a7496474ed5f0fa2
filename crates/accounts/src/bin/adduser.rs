//! Provision a user into the credential store
//!
//! Usage: adduser <username> <password>

use accounts::{AccountError, CredentialStore, DEFAULT_DATABASE_URL};
use clap::Parser;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "adduser", about = "Add a user to the file share")]
struct Args {
    /// Login name
    username: String,
    /// Password for the new user
    password: String,
    /// SQLite database holding the users table
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let store = match CredentialStore::open(&args.database).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open {}: {}", args.database, e);
            return ExitCode::FAILURE;
        }
    };

    match store.add_user(&args.username, &args.password).await {
        Ok(()) => {
            println!("User '{}' added.", args.username);
            ExitCode::SUCCESS
        }
        Err(AccountError::AlreadyExists(name)) => {
            println!("User '{}' already exists.", name);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Failed to add user: {}", e);
            ExitCode::FAILURE
        }
    }
}
