//! Run configuration, read once from the process environment.

use ethers_core::{types::U256, utils::parse_ether};
use std::{fmt, time::Duration};
use tenderly_api::{errors::TenderlyError, Client, ForkId, ForkRequest, DEFAULT_API_URL};
use tenderly_providers::DEFAULT_RPC_URL;
use url::Url;

pub const TENDERLY_USER: &str = "TENDERLY_USER";
pub const TENDERLY_PROJECT: &str = "TENDERLY_PROJECT";
pub const TENDERLY_ACCESS_KEY: &str = "TENDERLY_ACCESS_KEY";
pub const TENDERLY_API_URL: &str = "TENDERLY_API_URL";
pub const TENDERLY_RPC_URL: &str = "TENDERLY_RPC_URL";
pub const TENDERLY_NETWORK_ID: &str = "TENDERLY_NETWORK_ID";
pub const TENDERLY_CHAIN_ID: &str = "TENDERLY_CHAIN_ID";
pub const TENDERLY_SHANGHAI_TIME: &str = "TENDERLY_SHANGHAI_TIME";
pub const TENDERLY_FORK_ID: &str = "TENDERLY_FORK_ID";
pub const TENDERLY_PROVISION_TIMEOUT: &str = "TENDERLY_PROVISION_TIMEOUT";
pub const FORK_FUNDING_ETHER: &str = "FORK_FUNDING_ETHER";
pub const FORK_TOKEN_SCENARIO: &str = "FORK_TOKEN_SCENARIO";
pub const FORK_DELETE_ON_EXIT: &str = "FORK_DELETE_ON_EXIT";

const DEFAULT_PROVISION_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_FUNDING_ETHER: &str = "10";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{0}`")]
    MissingVar(&'static str),
    #[error("invalid value {value:?} for `{var}`: {reason}")]
    InvalidVar { var: &'static str, value: String, reason: String },
    #[error("invalid API client configuration: {0}")]
    Client(#[from] TenderlyError),
}

/// Everything a run needs, validated before the first network call
#[derive(Clone)]
pub struct Config {
    pub user: String,
    pub project: String,
    pub access_key: String,
    pub api_url: Url,
    pub rpc_url: Url,
    pub fork: ForkRequest,
    /// Reuse this fork instead of creating a new one
    pub fork_id: Option<ForkId>,
    pub provision_timeout: Duration,
    /// Amount of wei given to the minter
    pub funding: U256,
    pub token_scenario: bool,
    pub delete_on_exit: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("user", &self.user)
            .field("project", &self.project)
            .field("access_key", &"<redacted>")
            .field("api_url", &self.api_url.as_str())
            .field("rpc_url", &self.rpc_url.as_str())
            .field("fork", &self.fork)
            .field("fork_id", &self.fork_id)
            .field("provision_timeout", &self.provision_timeout)
            .field("funding", &self.funding)
            .field("token_scenario", &self.token_scenario)
            .field("delete_on_exit", &self.delete_on_exit)
            .finish()
    }
}

impl Config {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of a variable if set.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |var: &'static str| get(var).ok_or(ConfigError::MissingVar(var));

        let user = required(TENDERLY_USER)?;
        let project = required(TENDERLY_PROJECT)?;
        let access_key = required(TENDERLY_ACCESS_KEY)?;

        let api_url = parse_url(TENDERLY_API_URL, get(TENDERLY_API_URL), DEFAULT_API_URL)?;
        let rpc_url = parse_url(TENDERLY_RPC_URL, get(TENDERLY_RPC_URL), DEFAULT_RPC_URL)?;

        let mut fork = ForkRequest::new(
            get(TENDERLY_NETWORK_ID).unwrap_or_else(|| ForkRequest::MAINNET.to_string()),
        );
        if let Some(chain_id) = get(TENDERLY_CHAIN_ID) {
            fork = fork.chain_id(parse_int(TENDERLY_CHAIN_ID, chain_id)?);
        }
        if let Some(shanghai_time) = get(TENDERLY_SHANGHAI_TIME) {
            fork = fork.shanghai_time(Some(parse_int(TENDERLY_SHANGHAI_TIME, shanghai_time)?));
        }

        let provision_timeout = match get(TENDERLY_PROVISION_TIMEOUT) {
            Some(secs) => Duration::from_secs(parse_int(TENDERLY_PROVISION_TIMEOUT, secs)?),
            None => DEFAULT_PROVISION_TIMEOUT,
        };

        let funding = get(FORK_FUNDING_ETHER).unwrap_or_else(|| DEFAULT_FUNDING_ETHER.to_string());
        let funding = parse_ether(&funding).map_err(|err| ConfigError::InvalidVar {
            var: FORK_FUNDING_ETHER,
            value: funding.clone(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            user,
            project,
            access_key,
            api_url,
            rpc_url,
            fork,
            fork_id: get(TENDERLY_FORK_ID).map(ForkId::from),
            provision_timeout,
            funding,
            token_scenario: parse_flag(FORK_TOKEN_SCENARIO, get(FORK_TOKEN_SCENARIO))?,
            delete_on_exit: parse_flag(FORK_DELETE_ON_EXIT, get(FORK_DELETE_ON_EXIT))?,
        })
    }

    /// Builds the management API client for the configured project
    pub fn api_client(&self) -> Result<Client, ConfigError> {
        Ok(Client::builder()
            .with_api_url(self.api_url.clone())?
            .with_user(&self.user)
            .with_project(&self.project)
            .with_access_key(&self.access_key)
            .build()?)
    }
}

fn parse_url(var: &'static str, value: Option<String>, default: &str) -> Result<Url, ConfigError> {
    let value = value.unwrap_or_else(|| default.to_string());
    let url = Url::parse(&value).map_err(|err| ConfigError::InvalidVar {
        var,
        value: value.clone(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidVar {
            var,
            value,
            reason: "expected an http(s) url".to_string(),
        })
    }
    Ok(url)
}

fn parse_int(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse().map_err(|err: std::num::ParseIntError| ConfigError::InvalidVar {
        var,
        value,
        reason: err.to_string(),
    })
}

fn parse_flag(var: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else { return Ok(false) };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidVar { var, value, reason: "expected a boolean".to_string() }),
    }
}
