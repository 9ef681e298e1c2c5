//! The fork session controller.
//!
//! A session drives one ephemeral fork through
//! `Unstarted → ForkCreated → Connected → AccountsListed → BalanceSet → Torndown`. Any failing
//! step moves it to [`SessionState::Failed`], after which every further step is refused.
//!
//! A fork created by the session is *not* deleted when a later step fails; call
//! [`ForkSession::teardown`] explicitly.

use crate::{
    config::Config,
    error::{ForkError, ProvisioningError, Result, TransactionError},
};
use ethers_core::types::{Address, Bytes, TransactionReceipt, TransactionRequest, H256, U256, U64};
use ethers_providers::{Http, Middleware, Provider};
use std::{fmt, time::Duration};
use tenderly_api::{Client, ForkId, ForkRequest};
use tenderly_providers::{fork_rpc_url, ForkRpcMiddleware};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Gas limit attached to submitted transactions
pub const DEFAULT_GAS_LIMIT: u64 = 800_000;

const DEFAULT_RECEIPT_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_RECEIPT_ATTEMPTS: usize = 30;

/// Progress of a [`ForkSession`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unstarted,
    ForkCreated,
    Connected,
    AccountsListed,
    BalanceSet,
    Minted,
    Approved,
    Transferred,
    Torndown,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Role an account plays in a scripted scenario, by position in the fork's account list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Minter,
    Owner,
    Spender,
    Receiver,
}

/// Accounts bound to their roles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roles {
    pub minter: Address,
    pub owner: Address,
    pub spender: Address,
    pub receiver: Address,
}

impl Roles {
    pub const COUNT: usize = 4;

    /// Binds the first four accounts to minter, owner, spender and receiver.
    ///
    /// Fails if fewer than four accounts are available.
    pub fn from_accounts(accounts: &[Address]) -> Result<Self, ProvisioningError> {
        match *accounts {
            [minter, owner, spender, receiver, ..] => Ok(Self { minter, owner, spender, receiver }),
            _ => Err(ProvisioningError::InsufficientAccounts {
                found: accounts.len(),
                required: Self::COUNT,
            }),
        }
    }

    pub fn get(&self, role: Role) -> Address {
        match role {
            Role::Minter => self.minter,
            Role::Owner => self.owner,
            Role::Spender => self.spender,
            Role::Receiver => self.receiver,
        }
    }
}

/// Creates a fork, giving up once `timeout` has elapsed.
///
/// An unreachable API is a [`ForkError::Connectivity`], a rejected request, a malformed answer or
/// an expired timeout is a [`ForkError::Provisioning`].
pub async fn create_fork(api: &Client, request: &ForkRequest, timeout: Duration) -> Result<ForkId> {
    match tokio::time::timeout(timeout, api.create_fork(request)).await {
        Ok(res) => res.map_err(ForkError::from_api),
        Err(_) => {
            warn!(target: "tenderly::session", ?timeout, "fork creation timed out");
            Err(ProvisioningError::Timeout(timeout).into())
        }
    }
}

/// One ephemeral fork and the RPC client bound to it
pub struct ForkSession<M> {
    api: Client,
    fork: ForkId,
    endpoint: String,
    client: ForkRpcMiddleware<M>,
    state: SessionState,
    accounts: Vec<Address>,
    gas_limit: u64,
    receipt_interval: Duration,
    receipt_attempts: usize,
}

impl<M> fmt::Debug for ForkSession<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForkSession")
            .field("fork", &self.fork)
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("accounts", &self.accounts)
            .finish()
    }
}

impl ForkSession<Provider<Http>> {
    /// Creates a fork as configured, or reuses `config.fork_id`, and connects to it
    pub async fn provision(config: &Config) -> Result<Self> {
        let api = config.api_client()?;
        let fork = match &config.fork_id {
            Some(fork) => {
                info!(target: "tenderly::session", %fork, "reusing existing fork");
                fork.clone()
            }
            None => create_fork(&api, &config.fork, config.provision_timeout).await?,
        };
        debug!(target: "tenderly::session", %fork, "Unstarted -> ForkCreated");
        Self::connect(api, fork, &config.rpc_url)
    }

    /// Binds an HTTP provider to the fork's endpoint. No request is sent.
    pub fn connect(api: Client, fork: ForkId, rpc_base: &Url) -> Result<Self> {
        let endpoint = fork_rpc_url(rpc_base, fork.as_str());
        let provider = Provider::<Http>::try_from(endpoint.as_str())
            .map_err(|err| ForkError::Connectivity(Box::new(err)))?;
        Ok(Self::with_provider(api, fork, rpc_base, provider))
    }
}

impl<M> ForkSession<M>
where
    M: Middleware + 'static,
{
    /// Wraps an existing middleware stack pointed at the fork
    pub fn with_provider(api: Client, fork: ForkId, rpc_base: &Url, provider: M) -> Self {
        let endpoint = fork_rpc_url(rpc_base, fork.as_str());
        info!(target: "tenderly::session", %fork, %endpoint, "connected to fork");
        Self {
            api,
            fork,
            endpoint,
            client: ForkRpcMiddleware::new(provider),
            state: SessionState::Connected,
            accounts: Vec::new(),
            gas_limit: DEFAULT_GAS_LIMIT,
            receipt_interval: DEFAULT_RECEIPT_INTERVAL,
            receipt_attempts: DEFAULT_RECEIPT_ATTEMPTS,
        }
    }

    /// Sets the gas limit of submitted transactions
    #[must_use]
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Sets how often and how many times a receipt is polled for
    #[must_use]
    pub fn receipt_polling(mut self, interval: Duration, attempts: usize) -> Self {
        self.receipt_interval = interval;
        self.receipt_attempts = attempts.max(1);
        self
    }

    pub fn fork(&self) -> &ForkId {
        &self.fork
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn client(&self) -> &ForkRpcMiddleware<M> {
        &self.client
    }

    /// Accounts returned by the last [`ForkSession::list_accounts`] call
    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    /// Fetches the accounts the fork exposes, in the order the backend returns them
    pub async fn list_accounts(&mut self) -> Result<Vec<Address>> {
        self.ensure_live()?;
        let accounts = match self.client.get_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => return self.fail(ForkError::from_middleware(err)),
        };
        debug!(target: "tenderly::session", count = accounts.len(), "listed accounts");
        self.accounts = accounts.clone();
        self.advance(SessionState::AccountsListed);
        Ok(accounts)
    }

    /// Binds the listed accounts to their roles
    pub fn roles(&mut self) -> Result<Roles> {
        self.ensure_live()?;
        match Roles::from_accounts(&self.accounts) {
            Ok(roles) => Ok(roles),
            Err(err) => self.fail(err.into()),
        }
    }

    /// Overrides the native balance of `address`
    pub async fn set_balance(&mut self, address: Address, amount: U256) -> Result<()> {
        self.ensure_live()?;
        if let Err(err) = self.client.set_balance(address, amount).await {
            return self.fail(ForkError::from_middleware(err))
        }
        info!(target: "tenderly::session", ?address, %amount, "balance set");
        self.advance(SessionState::BalanceSet);
        Ok(())
    }

    /// Reads the native balance of `address` at the latest block
    pub async fn balance_of(&self, address: Address) -> Result<U256> {
        self.ensure_live()?;
        self.client.get_balance(address, None).await.map_err(ForkError::from_middleware)
    }

    /// Writes a raw storage slot of `contract`
    pub async fn set_storage_at(
        &mut self,
        contract: Address,
        slot: H256,
        value: H256,
    ) -> Result<()> {
        self.ensure_live()?;
        if let Err(err) = self.client.set_storage_at(contract, slot, value).await {
            return self.fail(ForkError::from_middleware(err))
        }
        debug!(target: "tenderly::session", ?contract, ?slot, "storage overridden");
        Ok(())
    }

    /// Lists the accounts, binds their roles and funds the minter with `amount` wei
    pub async fn fund(&mut self, amount: U256) -> Result<Roles> {
        self.list_accounts().await?;
        let roles = self.roles()?;
        info!(
            target: "tenderly::session",
            minter = ?roles.minter,
            owner = ?roles.owner,
            spender = ?roles.spender,
            receiver = ?roles.receiver,
            "assigned roles"
        );
        self.set_balance(roles.minter, amount).await?;
        Ok(roles)
    }

    /// Sends `call` to `contract` from the unlocked account bound to `signer` and waits for its
    /// receipt.
    pub async fn submit(
        &mut self,
        signer: Role,
        contract: Address,
        call: Bytes,
    ) -> Result<TransactionReceipt> {
        let from = self.roles()?.get(signer);
        match self.send(from, contract, call).await {
            Ok(receipt) => Ok(receipt),
            Err(err) => self.fail(err.into()),
        }
    }

    async fn send(
        &self,
        from: Address,
        contract: Address,
        call: Bytes,
    ) -> Result<TransactionReceipt, TransactionError> {
        let tx = TransactionRequest::new().from(from).to(contract).data(call).gas(self.gas_limit);
        let hash = *self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(TransactionError::submission)?;
        debug!(target: "tenderly::session", ?hash, ?from, ?contract, "transaction sent");

        for attempt in 1..=self.receipt_attempts {
            let receipt = self
                .client
                .get_transaction_receipt(hash)
                .await
                .map_err(TransactionError::submission)?;
            if let Some(receipt) = receipt {
                if receipt.status == Some(U64::zero()) {
                    return Err(TransactionError::Reverted(hash))
                }
                debug!(
                    target: "tenderly::session",
                    ?hash,
                    block = ?receipt.block_number,
                    "transaction mined"
                );
                return Ok(receipt)
            }
            if attempt < self.receipt_attempts {
                tokio::time::sleep(self.receipt_interval).await;
            }
        }
        Err(TransactionError::NotMined { hash, attempts: self.receipt_attempts })
    }

    /// Deletes the fork on a detached task and ends the session.
    ///
    /// The returned handle never resolves to an error; await it to let the request finish before
    /// shutting down.
    pub fn teardown(mut self) -> JoinHandle<()> {
        self.advance(SessionState::Torndown);
        self.api.spawn_delete_fork(self.fork)
    }

    pub(crate) fn advance(&mut self, next: SessionState) {
        debug!(target: "tenderly::session", "{} -> {}", self.state, next);
        self.state = next;
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.state == SessionState::Failed {
            return Err(ForkError::SessionFailed)
        }
        Ok(())
    }

    fn fail<T>(&mut self, err: ForkError) -> Result<T> {
        warn!(
            target: "tenderly::session",
            fork = %self.fork,
            state = %self.state,
            %err,
            "session failed, the fork is left running"
        );
        self.state = SessionState::Failed;
        Err(err)
    }
}
