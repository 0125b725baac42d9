mod common;

use std::sync::Arc;
use std::time::Duration;

use airdrop_tui::constants::{AIRDROP_LAMPORTS, TRANSFER_LAMPORTS};
use airdrop_tui::error::{ClientError, TransferError};
use airdrop_tui::keys::Keypair;
use airdrop_tui::models::Lamports;
use airdrop_tui::network::ClientSettings;
use airdrop_tui::transfer::TransferOrchestrator;

use common::{client_over, fast_settings, MemoryLedger};

#[tokio::test]
async fn test_airdrop_then_transfer_moves_funds() {
    let ledger = Arc::new(MemoryLedger::default().with_pending_polls(2));
    let client = client_over(ledger.clone(), fast_settings());
    let orchestrator = TransferOrchestrator::new(client.clone());

    let account = Keypair::generate();
    let wallet = Keypair::generate().public_key();
    let source = account.public_key();

    assert_eq!(client.get_balance(&source).await.unwrap(), Lamports::ZERO);
    client.airdrop(&source).await.unwrap();
    assert_eq!(client.get_balance(&source).await.unwrap(), Lamports(AIRDROP_LAMPORTS));

    let outcome = orchestrator
        .transfer(&account, &wallet, Lamports(TRANSFER_LAMPORTS))
        .await
        .unwrap();

    assert!(outcome.receipt.confirmed);
    assert_eq!(outcome.balance, Some(Lamports::ZERO));
    assert_eq!(ledger.balance(&wallet), Lamports(TRANSFER_LAMPORTS));
    assert_eq!(ledger.balance(&source), Lamports::ZERO);
    assert!(!orchestrator.is_in_flight());
}

#[tokio::test]
async fn test_transfer_refreshes_balance_once() {
    let ledger = Arc::new(MemoryLedger::default());
    let client = client_over(ledger.clone(), fast_settings());
    let orchestrator = TransferOrchestrator::new(client.clone());

    let account = Keypair::generate();
    let source = account.public_key();
    client.airdrop(&source).await.unwrap();

    let before = ledger.balance_calls(&source);
    orchestrator
        .transfer(&account, &Keypair::generate().public_key(), Lamports(TRANSFER_LAMPORTS))
        .await
        .unwrap();
    assert_eq!(ledger.balance_calls(&source), before + 1);
}

#[tokio::test]
async fn test_unfunded_transfer_is_insufficient_balance() {
    let ledger = Arc::new(MemoryLedger::default());
    let client = client_over(ledger.clone(), fast_settings());
    let orchestrator = TransferOrchestrator::new(client);

    let account = Keypair::generate();
    let wallet = Keypair::generate().public_key();

    let err = orchestrator
        .transfer(&account, &wallet, Lamports(TRANSFER_LAMPORTS))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::InsufficientBalance(_)));
    assert_eq!(ledger.sent(), 0);
    assert_eq!(ledger.balance(&wallet), Lamports::ZERO);
    // The flag is released so the user can retry
    assert!(!orchestrator.is_in_flight());
}

#[tokio::test]
async fn test_failed_on_chain_status_is_insufficient_balance() {
    let ledger = Arc::new(MemoryLedger::default().with_pending_polls(1));
    let client = client_over(ledger.clone(), fast_settings());
    let orchestrator = TransferOrchestrator::new(client.clone());

    let account = Keypair::generate();
    let wallet = Keypair::generate().public_key();
    let source = account.public_key();
    client.airdrop(&source).await.unwrap();

    // Preflight passes; the landed transaction reports an error
    ledger.fail_next_transaction("InstructionError(0, Custom(1))");
    let err = orchestrator
        .transfer(&account, &wallet, Lamports(TRANSFER_LAMPORTS))
        .await
        .unwrap_err();

    match err {
        TransferError::InsufficientBalance(reason) => assert!(reason.contains("Custom(1)")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(ledger.sent(), 1);
    assert_eq!(ledger.balance(&wallet), Lamports::ZERO);
    assert_eq!(ledger.balance(&source), Lamports(AIRDROP_LAMPORTS));
    assert!(!orchestrator.is_in_flight());

    // A retry goes through once the ledger behaves
    orchestrator
        .transfer(&account, &wallet, Lamports(TRANSFER_LAMPORTS))
        .await
        .unwrap();
    assert_eq!(ledger.balance(&wallet), Lamports(TRANSFER_LAMPORTS));
}

#[tokio::test]
async fn test_concurrent_transfer_refused() {
    let ledger = Arc::new(MemoryLedger::default().with_pending_polls(3));
    let client = client_over(ledger.clone(), fast_settings());
    let orchestrator = TransferOrchestrator::new(client.clone());

    let account = Keypair::generate();
    let wallet = Keypair::generate().public_key();
    client.airdrop(&account.public_key()).await.unwrap();

    let (first, second) = tokio::join!(
        orchestrator.transfer(&account, &wallet, Lamports(TRANSFER_LAMPORTS)),
        orchestrator.transfer(&account, &wallet, Lamports(TRANSFER_LAMPORTS)),
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(TransferError::InFlight)));
    assert_eq!(ledger.sent(), 1);
    assert_eq!(ledger.balance(&wallet), Lamports(TRANSFER_LAMPORTS));
}

#[tokio::test]
async fn test_airdrop_waits_for_confirmation() {
    let ledger = Arc::new(MemoryLedger::default().with_pending_polls(3));
    let client = client_over(ledger.clone(), fast_settings());

    let address = Keypair::generate().public_key();
    client.airdrop(&address).await.unwrap();

    // Three processed answers, then the confirming one
    assert_eq!(ledger.status_polls(), 4);
}

#[tokio::test]
async fn test_confirmation_times_out() {
    let ledger = Arc::new(MemoryLedger::default().never_confirming());
    let settings = ClientSettings {
        confirm_timeout: Duration::from_millis(50),
        ..fast_settings()
    };
    let client = client_over(ledger, settings);

    let err = client.airdrop(&Keypair::generate().public_key()).await.unwrap_err();
    assert!(matches!(err, ClientError::ConfirmTimeout(_)));
}

#[tokio::test]
async fn test_expired_blockhash_fails_transfer() {
    let ledger = Arc::new(MemoryLedger::default().with_pending_polls(5).with_validity(0));
    let client = client_over(ledger.clone(), fast_settings());
    let orchestrator = TransferOrchestrator::new(client.clone());

    let account = Keypair::generate();
    // Funding sidesteps confirmation so only the transfer sees the expiry
    let source = account.public_key();
    let _ = client.request_airdrop(&source, Lamports(AIRDROP_LAMPORTS)).await.unwrap();

    let err = orchestrator
        .transfer(&account, &Keypair::generate().public_key(), Lamports(TRANSFER_LAMPORTS))
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::Network(ClientError::BlockhashExpired(_))));
}
