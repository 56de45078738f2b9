//! Fetch the authenticated account and its open trades
//!
//! Credentials come from the environment (or a `.env` file):
//! `LOCALBITCOINS_API_KEY`, `LOCALBITCOINS_API_SECRET`, and optionally
//! `LOCALBITCOINS_API_BASE_URL`.
//!
//! ```text
//! RUST_LOG=debug cargo run --example myself
//! ```

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use localbitcoins_client::{HttpVerb, LbcClient, LbcError, Params};

fn setup_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_logging();

    let client = LbcClient::from_env().context("Failed to create LocalBitcoins client")?;

    let me = client
        .api("myself", Params::new(), HttpVerb::Get)
        .await
        .context("Failed to fetch account")?;
    info!("Logged in as {}", me["data"]["username"]);

    match client.api("dashboard", Params::new(), HttpVerb::Get).await {
        Ok(dashboard) => {
            let count = dashboard["data"]["contact_count"].as_u64().unwrap_or(0);
            info!("Open trades: {}", count);
        }
        Err(LbcError::Api(payload)) => error!("Dashboard rejected: {}", payload),
        Err(e) => return Err(e).context("Failed to fetch dashboard"),
    }

    Ok(())
}
