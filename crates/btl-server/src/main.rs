//! `btld` - the btl service daemon and link tool.
//!
//! `btld serve` runs the HTTP service. `btld link issue` and
//! `btld link verify` mint and check capability links with the configured
//! secret, and `btld secret generate` prints a fresh one.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use url::Url;

use btl_config::Config;
use btl_crypto::LinkSecret;
use btl_links::{CapabilityLink, InvalidReason, LinkStatus};
use btl_server::{Server, bridge};

/// btl daemon - key store, validated generation and capability links.
#[derive(Parser)]
#[command(name = "btld")]
#[command(author, version, about = "btl daemon - key store, validated generation and capability links")]
struct Cli {
    /// Config file (default: ./btl.toml, then ~/.btl/config.toml).
    #[arg(short, long, global = true, env = "BTL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default).
    Serve {
        /// Override `server.listen_addr`.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Issue or verify capability links.
    Link {
        #[command(subcommand)]
        command: LinkCommand,
    },
    /// Link secret utilities.
    Secret {
        #[command(subcommand)]
        command: SecretCommand,
    },
}

#[derive(Subcommand)]
enum LinkCommand {
    /// Issue a link for a resource.
    Issue {
        /// Resource the link grants access to.
        resource: String,
        /// Lifetime in seconds (default: `links.default_ttl_secs`).
        #[arg(long)]
        ttl: Option<u64>,
        /// Print a full URL on this base instead of a bare query.
        #[arg(long)]
        base_url: Option<Url>,
    },
    /// Verify a link given as a query string or a URL.
    Verify {
        /// `id=..&exp=..&nonce=..&sig=..`, with or without `?`, or a URL.
        link: String,
    },
}

#[derive(Subcommand)]
enum SecretCommand {
    /// Print a fresh random secret, hex-encoded.
    Generate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Secret generation needs no config.
    if let Some(Command::Secret {
        command: SecretCommand::Generate,
    }) = &cli.command
    {
        println!("{}", LinkSecret::generate_hex());
        return Ok(());
    }

    let resolved = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let config = resolved.config;

    let mut log_config = bridge::to_log_config(&config.logging);
    if cli.verbose {
        log_config.level = "debug".to_string();
    }
    if let Err(e) = btl_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
    match &resolved.loaded_file {
        Some(path) => info!(path = %path.display(), "loaded config file"),
        None => info!("no config file found; using defaults and environment"),
    }

    match cli.command.unwrap_or(Command::Serve { listen: None }) {
        Command::Serve { listen } => serve(&config, listen).await,
        Command::Link { command } => run_link(&config, command),
        Command::Secret { .. } => Ok(()),
    }
}

async fn serve(config: &Config, listen: Option<SocketAddr>) -> Result<()> {
    let mut server = Server::new(config)?;
    if let Some(addr) = listen {
        server = server.listen_on(addr);
    }
    println!(
        "{}",
        format!("btld listening on {}", server.listen_addr())
            .cyan()
            .bold()
    );
    server.run().await?;
    println!("{}", "btld stopped".green().bold());
    Ok(())
}

fn run_link(config: &Config, command: LinkCommand) -> Result<()> {
    let Some(secret) = bridge::link_secret(&config.links)? else {
        bail!(
            "no link secret configured; set links.secret or BTL_LINK_SECRET \
             (generate one with `btld secret generate`)"
        );
    };

    match command {
        LinkCommand::Issue {
            resource,
            ttl,
            base_url,
        } => {
            let ttl_secs = ttl.unwrap_or(config.links.default_ttl_secs);
            let ttl_secs = i64::try_from(ttl_secs).context("ttl is too large")?;
            let link = btl_links::issue(&resource, &secret, Duration::seconds(ttl_secs))?;
            match base_url {
                Some(base) => println!("{}", link.to_url(&base)),
                None => println!("?{}", link.to_query()),
            }
            if let Some(expires) = link.expires_at() {
                eprintln!(
                    "{}",
                    format!("expires {}", expires.to_rfc3339()).dimmed()
                );
            }
            Ok(())
        },
        LinkCommand::Verify { link } => {
            let status = verify_input(&link, &secret, Utc::now());
            match status {
                LinkStatus::Valid => {
                    println!("{}", "valid".green().bold());
                    Ok(())
                },
                LinkStatus::Invalid(reason) => {
                    println!("{} ({})", "invalid".red().bold(), reason.code());
                    bail!("link rejected: {reason}")
                },
            }
        },
    }
}

/// Decode a link from a URL or a bare query string.
fn parse_link(input: &str) -> Result<CapabilityLink, InvalidReason> {
    let input = input.trim();
    match Url::parse(input) {
        Ok(url) => CapabilityLink::from_url(&url),
        Err(_) => CapabilityLink::from_query(input),
    }
}

fn verify_input(input: &str, secret: &LinkSecret, now: DateTime<Utc>) -> LinkStatus {
    match parse_link(input) {
        Ok(link) => btl_links::verify_at(&link, secret, now),
        Err(reason) => LinkStatus::Invalid(reason),
    }
}
