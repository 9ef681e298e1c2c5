use crate::*;
use ethers_core::{
    types::{TransactionReceipt, H256, U256, U64},
    utils::parse_ether,
};
use std::time::Duration;
use tenderly_fork::{
    providers::mapping_slot, ForkError, SessionState, TokenScenario, TransactionError, DAI,
};

fn receipt(hash: H256, status: u64) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        block_number: Some(U64::from(16_700_001)),
        status: Some(U64::from(status)),
        ..Default::default()
    }
}

/// Queues the answers to one `submit`: gas price, transaction hash, receipt
fn push_transaction(mock: &MockProvider, hash: H256, status: u64) {
    // responses are popped LIFO
    mock.push(receipt(hash, status)).unwrap();
    mock.push(hash).unwrap();
    mock.push(U256::from(1_000_000_000u64)).unwrap();
}

/// Queues the answers to `fund`: accounts, then the balance override
fn push_funding(mock: &MockProvider) {
    mock.push(true).unwrap();
    mock.push::<Vec<Address>, _>(accounts()).unwrap();
}

#[tokio::test]
async fn moves_dai_from_owner_to_receiver() {
    let server = Server::new_async().await;
    let (session, mock) = mocked_session(&server);
    let mut session = session.receipt_polling(Duration::from_millis(1), 3);
    let hashes = [1u64, 2, 3].map(H256::from_low_u64_be);

    push_transaction(&mock, hashes[2], 1);
    push_transaction(&mock, hashes[1], 1);
    push_transaction(&mock, hashes[0], 1);
    mock.push(true).unwrap();
    push_funding(&mock);

    let roles = session.fund(parse_ether(10).unwrap()).await.unwrap();
    let receipts = TokenScenario::dai().unwrap().run(&mut session).await.unwrap();

    assert_eq!(receipts.mint.transaction_hash, hashes[0]);
    assert_eq!(receipts.approve.transaction_hash, hashes[1]);
    assert_eq!(receipts.transfer.transaction_hash, hashes[2]);
    assert_eq!(session.state(), SessionState::Transferred);

    mock.assert_request("eth_accounts", ()).unwrap();
    mock.assert_request("tenderly_setBalance", (vec![roles.minter], parse_ether(10).unwrap()))
        .unwrap();
    let dai: Address = "0x6B175474E89094C44Da98b954EedeAC495271d0F".parse().unwrap();
    assert_eq!(DAI, dai);
    mock.assert_request(
        "tenderly_setStorageAt",
        (dai, mapping_slot(roles.minter, U256::zero()), H256::from_low_u64_be(1)),
    )
    .unwrap();
}

#[tokio::test]
async fn reverted_mint_fails_session() {
    let server = Server::new_async().await;
    let (session, mock) = mocked_session(&server);
    let mut session = session.receipt_polling(Duration::from_millis(1), 3);
    let hash = H256::from_low_u64_be(0xbad);

    push_transaction(&mock, hash, 0);
    mock.push(true).unwrap();
    push_funding(&mock);

    session.fund(parse_ether(10).unwrap()).await.unwrap();
    let err = TokenScenario::dai().unwrap().run(&mut session).await.unwrap_err();

    assert!(matches!(err, ForkError::Transaction(TransactionError::Reverted(h)) if h == hash));
    assert_eq!(session.state(), SessionState::Failed);

    let err = TokenScenario::dai().unwrap().run(&mut session).await.unwrap_err();
    assert!(matches!(err, ForkError::SessionFailed));
}

#[tokio::test]
async fn gives_up_on_missing_receipt() {
    let server = Server::new_async().await;
    let (session, mock) = mocked_session(&server);
    let mut session = session.receipt_polling(Duration::from_millis(1), 2);
    let hash = H256::from_low_u64_be(0x10);

    // two polls without a receipt
    mock.push(serde_json::Value::Null).unwrap();
    mock.push(serde_json::Value::Null).unwrap();
    mock.push(hash).unwrap();
    mock.push(U256::from(1_000_000_000u64)).unwrap();
    push_funding(&mock);

    let roles = session.fund(parse_ether(10).unwrap()).await.unwrap();
    let call = TokenScenario::dai().unwrap().encode_mint(roles.owner).unwrap();
    let err = session.submit(tenderly_fork::Role::Minter, DAI, call).await.unwrap_err();

    assert!(matches!(
        err,
        ForkError::Transaction(TransactionError::NotMined { hash: h, attempts: 2 }) if h == hash
    ));
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn submit_requires_role_assignment() {
    let server = Server::new_async().await;
    let (mut session, mock) = mocked_session(&server);

    let call = TokenScenario::dai().unwrap().encode_mint(accounts()[1]).unwrap();
    let err = session.submit(tenderly_fork::Role::Minter, DAI, call).await.unwrap_err();

    assert!(matches!(
        err,
        ForkError::Provisioning(tenderly_fork::ProvisioningError::InsufficientAccounts {
            found: 0,
            ..
        })
    ));
    // nothing was sent
    assert!(mock.assert_request("eth_sendTransaction", ()).is_err());
}
