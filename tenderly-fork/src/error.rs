use crate::config::ConfigError;
use ethers_core::types::TxHash;
use ethers_providers::{JsonRpcError, MiddlewareError};
use std::{error::Error, time::Duration};
use tenderly_api::errors::TenderlyError;
use thiserror::Error;

pub type Result<T, E = ForkError> = std::result::Result<T, E>;

/// Top-level error of a fork session
#[derive(Debug, Error)]
pub enum ForkError {
    /// Missing or invalid configuration
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The fork could not be created or is not usable
    #[error("fork provisioning failed: {0}")]
    Provisioning(#[from] ProvisioningError),

    /// The management API or the fork's RPC endpoint could not be reached, or answered with
    /// something that is not a valid response
    #[error("connectivity error: {0}")]
    Connectivity(#[source] Box<dyn Error + Send + Sync>),

    /// The fork answered with a JSON-RPC error, e.g. a privileged method it does not support
    #[error("fork rejected the call: {0}")]
    Rpc(JsonRpcError),

    /// A submitted transaction did not succeed
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// A previous step of the session failed, nothing else is attempted
    #[error("the fork session already failed, no further steps are attempted")]
    SessionFailed,
}

impl ForkError {
    /// Classifies an error of any middleware stack: JSON-RPC error responses become
    /// [`ForkError::Rpc`], everything else is a transport problem.
    pub fn from_middleware<E>(err: E) -> Self
    where
        E: MiddlewareError + 'static,
    {
        match MiddlewareError::as_error_response(&err) {
            Some(response) => ForkError::Rpc(response.clone()),
            None => ForkError::Connectivity(Box::new(err)),
        }
    }

    /// Classifies a management API error
    pub fn from_api(err: TenderlyError) -> Self {
        if err.is_transport() {
            ForkError::Connectivity(Box::new(err))
        } else {
            ProvisioningError::Api(err).into()
        }
    }
}

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error(transparent)]
    Api(#[from] TenderlyError),
    #[error("no fork was created within {0:?}")]
    Timeout(Duration),
    #[error("the fork exposes {found} accounts, at least {required} are needed")]
    InsufficientAccounts { found: usize, required: usize },
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction {0:?} reverted")]
    Reverted(TxHash),
    #[error("transaction {hash:?} has no receipt after {attempts} attempts")]
    NotMined { hash: TxHash, attempts: usize },
    #[error("failed to submit transaction: {0}")]
    Submission(#[source] Box<ForkError>),
    #[error("failed to encode call: {0}")]
    Encoding(#[from] ethers_core::abi::Error),
    #[error("failed to parse contract interface: {0}")]
    Interface(#[from] ethers_core::abi::ParseError),
}

impl TransactionError {
    pub(crate) fn submission<E>(err: E) -> Self
    where
        E: MiddlewareError + 'static,
    {
        TransactionError::Submission(Box::new(ForkError::from_middleware(err)))
    }
}
