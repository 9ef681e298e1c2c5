//! Scripted DAI transfers on a fork.
//!
//! The minter is made a ward of DAI by overwriting its `wards` entry, then mints to the owner,
//! the owner approves the spender and the spender moves the tokens to the receiver.

use crate::{
    error::{Result, TransactionError},
    session::{ForkSession, Role, SessionState},
};
use ethers_core::{
    abi::{parse_abi, Abi, Tokenize},
    types::{Address, Bytes, TransactionReceipt, H160, H256, U256},
    utils::WEI_IN_ETHER,
};
use ethers_providers::Middleware;
use tenderly_providers::mapping_slot;
use tracing::info;

/// DAI on mainnet, `0x6B175474E89094C44Da98b954EedeAC495271d0F`
pub const DAI: Address = H160([
    0x6b, 0x17, 0x54, 0x74, 0xe8, 0x90, 0x94, 0xc4, 0x4d, 0xa9, 0x8b, 0x95, 0x4e, 0xed, 0xea, 0xc4,
    0x95, 0x27, 0x1d, 0x0f,
]);

const DAI_ABI: &[&str] = &[
    "function mint(address usr, uint256 wad)",
    "function approve(address usr, uint256 wad) returns (bool)",
    "function transferFrom(address src, address dst, uint256 wad) returns (bool)",
];

/// Receipts of the three scripted transactions
#[derive(Clone, Debug)]
pub struct TokenReceipts {
    pub mint: TransactionReceipt,
    pub approve: TransactionReceipt,
    pub transfer: TransactionReceipt,
}

#[derive(Clone, Debug)]
pub struct TokenScenario {
    token: Address,
    /// Slot of the `wards` mapping
    wards_slot: U256,
    amount: U256,
    abi: Abi,
}

impl TokenScenario {
    /// Moves 1 DAI through mint, approve and transferFrom
    pub fn dai() -> Result<Self> {
        let abi = parse_abi(DAI_ABI).map_err(TransactionError::from)?;
        Ok(Self { token: DAI, wards_slot: U256::zero(), amount: WEI_IN_ETHER, abi })
    }

    #[must_use]
    pub fn amount(mut self, amount: U256) -> Self {
        self.amount = amount;
        self
    }

    pub fn token(&self) -> Address {
        self.token
    }

    /// Storage slot holding `wards[account]`
    pub fn ward_slot(&self, account: Address) -> H256 {
        mapping_slot(account, self.wards_slot)
    }

    pub fn encode_mint(&self, to: Address) -> Result<Bytes> {
        self.encode("mint", (to, self.amount))
    }

    pub fn encode_approve(&self, spender: Address) -> Result<Bytes> {
        self.encode("approve", (spender, self.amount))
    }

    pub fn encode_transfer_from(&self, from: Address, to: Address) -> Result<Bytes> {
        self.encode("transferFrom", (from, to, self.amount))
    }

    fn encode<T: Tokenize>(&self, name: &str, args: T) -> Result<Bytes> {
        let function = self.abi.function(name).map_err(TransactionError::from)?;
        let data = function.encode_input(&args.into_tokens()).map_err(TransactionError::from)?;
        Ok(data.into())
    }

    /// Runs the scenario against a funded session.
    pub async fn run<M>(&self, session: &mut ForkSession<M>) -> Result<TokenReceipts>
    where
        M: Middleware + 'static,
    {
        let roles = session.roles()?;

        session
            .set_storage_at(self.token, self.ward_slot(roles.minter), H256::from_low_u64_be(1))
            .await?;
        info!(target: "tenderly::session", minter = ?roles.minter, "minter granted ward");

        let mint = session.submit(Role::Minter, self.token, self.encode_mint(roles.owner)?).await?;
        session.advance(SessionState::Minted);

        let approve =
            session.submit(Role::Owner, self.token, self.encode_approve(roles.spender)?).await?;
        session.advance(SessionState::Approved);

        let transfer = session
            .submit(
                Role::Spender,
                self.token,
                self.encode_transfer_from(roles.owner, roles.receiver)?,
            )
            .await?;
        session.advance(SessionState::Transferred);

        info!(
            target: "tenderly::session",
            amount = %self.amount,
            tx = ?transfer.transaction_hash,
            "transferred tokens from owner to receiver"
        );
        Ok(TokenReceipts { mint, approve, transfer })
    }
}
