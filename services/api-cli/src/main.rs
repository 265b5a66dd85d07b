//! api-cli
//!
//! Runs one authenticated API call from the shell:
//! 1. Loads config (`--config`, CONFIG_PATH, or `api-cli.toml`)
//! 2. Opens the file-backed credential store
//! 3. Executes the command through `AuthClient`, which refreshes an expired
//!    credential and replays the call transparently
//! 4. Prints the JSON response body to stdout

mod config;
mod error;

use std::sync::Arc;

use anyhow::{Context, Result};
use auth_client::{AuthClient, Method, RequestDescription};
use clap::{Parser, Subcommand};
use common::Secret;
use credential_store::{CredentialStore, FileBackend};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::CliError;

/// Serializes tests that mutate environment variables.
#[cfg(test)]
static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[derive(Parser)]
#[command(name = "api-cli")]
#[command(about = "Authenticated API calls with transparent credential refresh")]
#[command(version)]
struct Cli {
    /// Config file (default: api-cli.toml)
    #[arg(long, global = true, env = "CONFIG_PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the issued credential pair
    Login {
        email: String,
        #[arg(env = "API_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Invalidate the session and remove stored credentials
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Send one request, e.g. `request POST /orders '{"productId": 7}'`
    Request {
        #[arg(value_parser = parse_method)]
        method: Method,
        path: String,
        /// JSON body
        #[arg(value_parser = parse_body)]
        body: Option<serde_json::Value>,
    },
}

fn parse_method(raw: &str) -> error::Result<Method> {
    match raw.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        _ => Err(CliError::InvalidMethod(raw.to_string())),
    }
}

fn parse_body(raw: &str) -> error::Result<serde_json::Value> {
    serde_json::from_str(raw).map_err(|e| CliError::InvalidBody(e.to_string()))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render response")?;
    println!("{rendered}");
    Ok(())
}

async fn run(client: &AuthClient, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let password = Secret::from(password);
            let signed_in = client
                .login(&email, password.expose())
                .await
                .context("login failed")?;
            if !signed_in.authenticated {
                anyhow::bail!("login succeeded but no credential was issued");
            }
            info!(email = %email, "logged in");
            print_json(&signed_in.user.unwrap_or(serde_json::Value::Null))
        }
        Command::Logout => {
            client.logout().await;
            info!("logged out");
            Ok(())
        }
        Command::Whoami => {
            let user = client.current_user().await.context("whoami failed")?;
            print_json(&user)
        }
        Command::Request { method, path, body } => {
            let mut request = RequestDescription::new(method.clone(), path.clone());
            if let Some(body) = body {
                request = request.with_body(body);
            }
            let response = client
                .request(request)
                .await
                .with_context(|| format!("{method} {path} failed"))?;
            match response.json::<serde_json::Value>() {
                Ok(value) => print_json(&value),
                Err(_) => {
                    println!("{}", response.text());
                    Ok(())
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.client.base_url,
        credentials = %config.credentials.path.display(),
        timeout_secs = config.client.timeout_secs,
        "configuration loaded"
    );

    let store = CredentialStore::open(FileBackend::new(config.credentials.path.clone()))
        .with_context(|| {
            format!(
                "failed to open credential store at {}",
                config.credentials.path.display()
            )
        })?;

    let client = AuthClient::new(config.client, Arc::new(store), || {
        warn!("session ended and credentials were cleared, run `api-cli login` again");
    });

    run(&client, cli.command).await
}
