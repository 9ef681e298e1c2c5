use crate::{errors::TenderlyError, Client, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Identifier of a simulation fork, as returned by the provisioning call
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForkId(String);

impl ForkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ForkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ForkId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ForkId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Chain parameters overridden on the fork
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Activation timestamp of the Shanghai upgrade
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shanghai_time: Option<u64>,
}

/// Body of a fork creation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkRequest {
    pub network_id: String,
    pub chain_config: ChainConfig,
}

impl ForkRequest {
    pub const MAINNET: &'static str = "1";
    pub const DEFAULT_CHAIN_ID: u64 = 11;
    pub const DEFAULT_SHANGHAI_TIME: u64 = 1_677_557_088;

    /// Fork of `network_id` with the default chain id and Shanghai activation time
    pub fn new(network_id: impl Into<String>) -> Self {
        Self {
            network_id: network_id.into(),
            chain_config: ChainConfig {
                chain_id: Self::DEFAULT_CHAIN_ID,
                shanghai_time: Some(Self::DEFAULT_SHANGHAI_TIME),
            },
        }
    }

    #[must_use]
    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_config.chain_id = chain_id;
        self
    }

    #[must_use]
    pub fn shanghai_time(mut self, shanghai_time: Option<u64>) -> Self {
        self.chain_config.shanghai_time = shanghai_time;
        self
    }
}

impl Default for ForkRequest {
    fn default() -> Self {
        Self::new(Self::MAINNET)
    }
}

/// Fork creation response. Only the fields needed to address the fork are decoded.
#[derive(Clone, Debug, Deserialize)]
pub struct CreateForkResponse {
    #[serde(default)]
    pub simulation_fork: Option<SimulationFork>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SimulationFork {
    #[serde(default)]
    pub id: Option<ForkId>,
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl CreateForkResponse {
    /// Extracts the fork id, rejecting responses where it is absent or empty
    pub fn fork_id(self) -> Result<ForkId> {
        self.simulation_fork
            .and_then(|fork| fork.id)
            .filter(|id| !id.as_str().is_empty())
            .ok_or(TenderlyError::MissingForkId)
    }
}

impl Client {
    /// Creates a new fork of `request.network_id` and returns its id.
    ///
    /// No retry is attempted, a rejected or malformed response is returned as an error.
    pub async fn create_fork(&self, request: &ForkRequest) -> Result<ForkId> {
        let url = self.forks_url()?;
        let started = Instant::now();
        let response: CreateForkResponse = self.post_json(url, request).await?;
        let fork = response.fork_id()?;
        info!(
            target: "tenderly::fork",
            %fork,
            network_id = %request.network_id,
            elapsed = ?started.elapsed(),
            "created fork"
        );
        Ok(fork)
    }

    /// Deletes the fork and waits for the API to acknowledge it.
    pub async fn delete_fork(&self, fork: &ForkId) -> Result<()> {
        let url = self.fork_url(fork)?;
        self.delete(url).await?;
        debug!(target: "tenderly::fork", %fork, "deleted fork");
        Ok(())
    }

    /// Deletes the fork on a detached task.
    ///
    /// The caller is never blocked and never sees an error: the outcome is only logged. The
    /// returned handle may be awaited to give the request a chance to finish before shutdown.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_delete_fork(&self, fork: ForkId) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            match client.delete_fork(&fork).await {
                Ok(()) => info!(target: "tenderly::fork", %fork, "fork torn down"),
                Err(err) => warn!(target: "tenderly::fork", %fork, %err, "failed to tear down fork"),
            }
        })
    }
}
