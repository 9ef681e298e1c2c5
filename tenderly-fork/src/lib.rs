#![cfg_attr(docsrs, feature(doc_cfg))]
//! # tenderly-fork
//!
//! Provisions an ephemeral Tenderly fork, connects a JSON-RPC client to it, funds one of its
//! unlocked accounts and optionally scripts token transactions against it.
//!
//! ```no_run
//! use tenderly_fork::{Config, ForkSession};
//!
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let mut session = ForkSession::provision(&config).await?;
//! let roles = session.fund(config.funding).await?;
//! println!("{:?} funded on {}", roles.minter, session.endpoint());
//!
//! // best effort, failures are only logged
//! session.teardown().await?;
//! # Ok(())
//! # }
//! ```

pub use tenderly_api as api;
pub use tenderly_providers as providers;

pub mod config;
pub mod error;
pub mod session;
pub mod token;

pub use config::{Config, ConfigError};
pub use error::{ForkError, ProvisioningError, Result, TransactionError};
pub use session::{create_fork, ForkSession, Role, Roles, SessionState};
pub use token::{TokenReceipts, TokenScenario, DAI};
