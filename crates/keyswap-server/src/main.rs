//! Keyswap server binary.
//!
//! # Usage
//!
//! ```bash
//! # Start with a user directory
//! KEYSWAP_TOKEN_SECRET=... keyswap-server --bind 0.0.0.0:8080 --user alice --user bob
//!
//! # Print a bearer token for a directory user and exit
//! KEYSWAP_TOKEN_SECRET=... keyswap-server --user alice --issue-token alice
//! ```

use std::time::Duration;

use clap::Parser;
use keyswap_core::{
    Credential, DepositPolicy, ExchangeConfig, HmacTokenResolver, StoreConfig, UserId,
};
use keyswap_server::{Server, ServerError, ServerRuntimeConfig, SystemEnv};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Shortest accepted token signing secret, in bytes.
const MIN_SECRET_LEN: usize = 16;

/// Keyswap rendezvous server
#[derive(Parser, Debug)]
#[command(name = "keyswap-server")]
#[command(about = "Relays ephemeral public keys between two parties")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Secret used to sign and verify bearer tokens
    #[arg(long, env = "KEYSWAP_TOKEN_SECRET", hide_env_values = true)]
    token_secret: String,

    /// User permitted to exchange keys (repeatable)
    #[arg(short, long = "user", env = "KEYSWAP_USERS", value_delimiter = ',')]
    users: Vec<String>,

    /// Minimum seconds between retrievals by the same user
    #[arg(long, default_value = "5")]
    cooldown_secs: u64,

    /// Seconds a deposit waits for its recipient before it is dropped
    #[arg(long, default_value = "300")]
    deposit_ttl_secs: u64,

    /// Maximum number of pending deposits
    #[arg(long, default_value = "10000")]
    store_capacity: usize,

    /// Seconds between sweeps of expired state
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    sweep_interval_secs: u64,

    /// Accept deposits without a credential
    #[arg(long)]
    open_deposits: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print a bearer token for this user and exit
    #[arg(long, value_name = "USER")]
    issue_token: Option<String>,

    /// Lifetime of issued tokens in seconds
    #[arg(long, default_value = "86400")]
    token_ttl_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let resolver = resolver(&args)?;

    if let Some(user) = &args.issue_token {
        let user = UserId::new(user.as_str()).map_err(|e| ServerError::Config(e.to_string()))?;
        let token = resolver
            .issue(&user, Duration::from_secs(args.token_ttl_secs))
            .map_err(|e| ServerError::Config(e.to_string()))?;

        print_token(&token);
        return Ok(());
    }

    tracing::info!("Keyswap server starting");
    tracing::info!("Binding to {}", args.bind);

    let deposit_policy = if args.open_deposits {
        tracing::warn!("Accepting unauthenticated deposits");
        DepositPolicy::Open
    } else {
        DepositPolicy::Authenticated
    };

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        sweep_interval: Duration::from_secs(args.sweep_interval_secs),
        exchange: ExchangeConfig {
            cooldown: Duration::from_secs(args.cooldown_secs),
            store: StoreConfig {
                capacity: args.store_capacity,
                ttl: Duration::from_secs(args.deposit_ttl_secs),
                ..StoreConfig::default()
            },
            deposit_policy,
        },
    };

    let server = Server::bind(config, resolver).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}

fn resolver(args: &Args) -> Result<HmacTokenResolver<SystemEnv>, ServerError> {
    if args.token_secret.len() < MIN_SECRET_LEN {
        return Err(ServerError::Config(format!(
            "token secret must be at least {MIN_SECRET_LEN} bytes"
        )));
    }

    let users = args
        .users
        .iter()
        .map(|id| UserId::new(id.as_str()).map_err(|e| ServerError::Config(format!("{id:?}: {e}"))))
        .collect::<Result<Vec<_>, _>>()?;

    if users.is_empty() {
        tracing::warn!("User directory is empty, every credential will be rejected");
    }

    tracing::debug!(users = users.len(), "User directory loaded");

    Ok(HmacTokenResolver::new(SystemEnv::new(), args.token_secret.as_bytes(), users))
}

#[allow(clippy::print_stdout)]
fn print_token(token: &Credential) {
    println!("{}", token.as_str());
}
