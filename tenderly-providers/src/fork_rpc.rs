use async_trait::async_trait;
use ethers_core::types::{Address, H256, U256};
use ethers_providers::{JsonRpcError, Middleware, MiddlewareError, ProviderError, RpcError};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use std::fmt::Debug;

/// Middleware adding the privileged methods that only Tenderly forks accept
#[derive(Clone, Debug)]
pub struct ForkRpcMiddleware<M>(M);

/// ForkRpcMiddleware Errors
#[derive(Error, Debug)]
pub enum ForkRpcMiddlewareError<M: Middleware> {
    /// Internal Middleware error
    #[error("{0}")]
    MiddlewareError(M::Error),

    /// Internal Provider error
    #[error("{0}")]
    ProviderError(ProviderError),
}

#[async_trait]
impl<M: Middleware> Middleware for ForkRpcMiddleware<M> {
    type Error = ForkRpcMiddlewareError<M>;
    type Provider = M::Provider;
    type Inner = M;

    fn inner(&self) -> &M {
        &self.0
    }
}

impl<M: Middleware> MiddlewareError for ForkRpcMiddlewareError<M> {
    type Inner = M::Error;

    fn from_err(src: M::Error) -> ForkRpcMiddlewareError<M> {
        ForkRpcMiddlewareError::MiddlewareError(src)
    }

    fn as_inner(&self) -> Option<&Self::Inner> {
        match self {
            ForkRpcMiddlewareError::MiddlewareError(e) => Some(e),
            _ => None,
        }
    }

    fn as_provider_error(&self) -> Option<&ProviderError> {
        match self {
            ForkRpcMiddlewareError::MiddlewareError(e) => e.as_provider_error(),
            ForkRpcMiddlewareError::ProviderError(e) => Some(e),
        }
    }

    fn as_error_response(&self) -> Option<&JsonRpcError> {
        match self {
            ForkRpcMiddlewareError::MiddlewareError(e) => MiddlewareError::as_error_response(e),
            ForkRpcMiddlewareError::ProviderError(e) => RpcError::as_error_response(e),
        }
    }

    fn as_serde_error(&self) -> Option<&serde_json::Error> {
        match self {
            ForkRpcMiddlewareError::MiddlewareError(e) => MiddlewareError::as_serde_error(e),
            ForkRpcMiddlewareError::ProviderError(e) => RpcError::as_serde_error(e),
        }
    }
}

impl<M> From<ProviderError> for ForkRpcMiddlewareError<M>
where
    M: Middleware,
{
    fn from(src: ProviderError) -> Self {
        Self::ProviderError(src)
    }
}

impl<M: Middleware> ForkRpcMiddleware<M> {
    /// Instantiate a new `ForkRpcMiddleware`
    pub fn new(inner: M) -> Self {
        Self(inner)
    }

    /// Overrides the native balance of `address` with `amount` wei.
    ///
    /// The amount is sent as a hex quantity, e.g. 10 ether becomes `0x8ac7230489e80000`.
    pub async fn set_balance(
        &self,
        address: Address,
        amount: U256,
    ) -> Result<(), ForkRpcMiddlewareError<M>> {
        self.set_balances(&[address], amount).await
    }

    /// Overrides the native balance of every address in `addresses` with `amount` wei
    pub async fn set_balances(
        &self,
        addresses: &[Address],
        amount: U256,
    ) -> Result<(), ForkRpcMiddlewareError<M>> {
        debug!(target: "tenderly::rpc", ?addresses, %amount, "tenderly_setBalance");
        self.provider()
            .request::<_, Value>("tenderly_setBalance", (addresses, amount))
            .await
            .map_err(ForkRpcMiddlewareError::ProviderError)?;
        Ok(())
    }

    /// Writes `value` to storage `slot` of `contract`, bypassing any access control the
    /// contract implements
    pub async fn set_storage_at(
        &self,
        contract: Address,
        slot: H256,
        value: H256,
    ) -> Result<(), ForkRpcMiddlewareError<M>> {
        debug!(target: "tenderly::rpc", ?contract, ?slot, ?value, "tenderly_setStorageAt");
        self.provider()
            .request::<_, Value>("tenderly_setStorageAt", (contract, slot, value))
            .await
            .map_err(ForkRpcMiddlewareError::ProviderError)?;
        Ok(())
    }
}
