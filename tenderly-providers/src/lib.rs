#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Privileged JSON-RPC for Tenderly forks
//!
//! A fork exposes the standard Ethereum JSON-RPC interface plus a handful of vendor methods that
//! mutate state directly (balances, storage) without going through consensus. This crate wraps
//! them in [`ForkRpcMiddleware`] so they compose with any other `ethers` middleware.
//!
//! ```no_run
//! use ethers_core::{types::Address, utils::parse_ether};
//! use ethers_providers::{Http, Middleware, Provider};
//! use tenderly_providers::{fork_rpc_url, ForkRpcMiddleware};
//! use url::Url;
//!
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! let base = Url::parse("https://rpc.tenderly.co")?;
//! let provider = Provider::<Http>::try_from(fork_rpc_url(&base, "abc-123"))?;
//! let client = ForkRpcMiddleware::new(provider);
//!
//! let accounts = client.get_accounts().await?;
//! client.set_balance(accounts[0], parse_ether(10)?).await?;
//! # Ok(())
//! # }
//! ```

mod fork_rpc;
pub use fork_rpc::{ForkRpcMiddleware, ForkRpcMiddlewareError};

use ethers_core::{
    types::{Address, H256, U256},
    utils::keccak256,
};
use url::Url;

/// RPC gateway used when none is configured
pub const DEFAULT_RPC_URL: &str = "https://rpc.tenderly.co";

/// Returns the JSON-RPC endpoint of a fork: `<rpc_base>/fork/<fork_id>`
pub fn fork_rpc_url(rpc_base: &Url, fork_id: &str) -> String {
    format!("{}/fork/{fork_id}", rpc_base.as_str().trim_end_matches('/'))
}

/// Storage slot of `mapping(address => _)` entry `key` for a mapping declared at `slot`:
/// `keccak256(pad32(key) ++ pad32(slot))`
pub fn mapping_slot(key: Address, slot: U256) -> H256 {
    let mut preimage = [0u8; 64];
    preimage[12..32].copy_from_slice(key.as_bytes());
    slot.to_big_endian(&mut preimage[32..]);
    H256::from(keccak256(preimage))
}
