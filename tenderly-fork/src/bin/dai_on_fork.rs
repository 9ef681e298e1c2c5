//! Provisions a Tenderly fork, funds its first account and optionally moves DAI between the
//! fork's accounts.
//!
//! Configuration is read from the environment, seeded from a `.env` file when present:
//!
//! ```sh
//! TENDERLY_USER=me TENDERLY_PROJECT=sandbox TENDERLY_ACCESS_KEY=... cargo run --bin dai-on-fork
//! ```

use ethers_core::utils::format_ether;
use tenderly_fork::{Config, ForkSession, TokenScenario};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    info!(target: "tenderly", user = %config.user, project = %config.project, "starting");

    let mut session = ForkSession::provision(&config).await?;
    info!(target: "tenderly", fork = %session.fork(), endpoint = session.endpoint(), "fork ready");

    let roles = session.fund(config.funding).await?;
    let balance = session.balance_of(roles.minter).await?;
    info!(target: "tenderly", minter = ?roles.minter, balance = %format_ether(balance), "funded");

    if config.token_scenario {
        let receipts = TokenScenario::dai()?.run(&mut session).await?;
        info!(
            target: "tenderly",
            mint = ?receipts.mint.transaction_hash,
            approve = ?receipts.approve.transaction_hash,
            transfer = ?receipts.transfer.transaction_hash,
            "token scenario complete"
        );
    }

    if config.delete_on_exit {
        if let Err(err) = session.teardown().await {
            warn!(target: "tenderly", %err, "fork teardown task did not complete");
        }
    } else {
        info!(target: "tenderly", fork = %session.fork(), "leaving fork running");
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
