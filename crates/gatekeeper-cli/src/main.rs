//! Gatekeeper CLI - operator tooling
//!
//! Usage:
//!   gatekeeper hash-password <password>
//!   gatekeeper issue-token --user-id 1 --username alice --role admin
//!   gatekeeper verify-token <token>
//!   gatekeeper check-config [--config gatekeeper.toml]
//!
//! Token commands read the secret and issuer from the same environment
//! variables as the server.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gatekeeper_api::auth::{Argon2Hasher, CredentialHasher, TokenCodec};
use gatekeeper_core::{AppConfig, Environment, Role};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(about = "Gatekeeper authentication service tooling")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an Argon2id hash suitable for the users table
    HashPassword {
        /// Plaintext password
        password: String,
    },
    /// Issue a signed token
    IssueToken {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        username: String,
        /// admin or user
        #[arg(long, default_value = "user")]
        role: String,
        /// Use the short production lifetime
        #[arg(long)]
        production: bool,
    },
    /// Validate a token and print its claims
    VerifyToken {
        token: String,
    },
    /// Load and validate a configuration
    CheckConfig {
        /// TOML file; environment variables are applied on top
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::HashPassword { password } => {
            let hash = Argon2Hasher::default()
                .hash(&password)
                .context("failed to hash password")?;
            println!("{hash}");
        }
        Commands::IssueToken {
            user_id,
            username,
            role,
            production,
        } => {
            let Some(role) = Role::parse(&role) else {
                bail!("unknown role '{role}', expected admin or user");
            };
            let environment = if production {
                Environment::Production
            } else {
                Environment::Development
            };

            let config = AppConfig::from_env()?;
            if config.auth.uses_default_secret() {
                tracing::warn!("signing with the default secret; set JWT_SECRET");
            }

            let token = TokenCodec::new(&config.auth)
                .issue(user_id, &username, role, environment)
                .context("failed to issue token")?;
            println!("{token}");
        }
        Commands::VerifyToken { token } => {
            let config = AppConfig::from_env()?;
            match TokenCodec::new(&config.auth).validate(token.trim()) {
                Ok(claims) => println!("{}", serde_json::to_string_pretty(&claims)?),
                Err(e) => bail!("token rejected: {}", e.kind()),
            }
        }
        Commands::CheckConfig { config } => {
            let config = match config {
                Some(path) => AppConfig::from_file(path)?.with_env_override()?,
                None => AppConfig::from_env()?,
            };
            config.validate()?;

            println!("configuration OK");
            println!("  environment: {}", config.auth.environment);
            println!("  listen:      {}:{}", config.server.host, config.server.port);
            println!(
                "  store:       {}",
                if config.database.url.is_some() {
                    "postgres"
                } else {
                    "in-memory"
                }
            );
        }
    }

    Ok(())
}
