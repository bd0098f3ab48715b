//! Dispense decision procedure against an in-memory chain

mod common;

use common::*;
use gas_common::types::Wei;
use gas_station::{DispenseResult, FunderIdentity, Rejection, StationError};
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn test_sent_then_already_funded() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, ONE_ETHER);
    let dispenser = dispenser(&chain);

    match dispenser.dispense(TARGET).await {
        DispenseResult::Sent { amount, tx_hash } => {
            assert_eq!(amount, GAS_AMOUNT);
            assert_eq!(amount.to_ether_string(), "0.00001");
            assert_eq!(tx_hash.0, [1u8; 32]);
        }
        other => panic!("expected Sent, got {:?}", other),
    }

    let transfers = chain.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].0, addr(FUNDER_ADDRESS));
    assert_eq!(transfers[0].1, addr(TARGET));
    assert_eq!(transfers[0].2, GAS_AMOUNT);

    // The transfer lands
    chain.set_balance(TARGET, GAS_AMOUNT);

    match dispenser.dispense(TARGET).await {
        DispenseResult::Rejected(Rejection::AlreadyFunded { balance }) => {
            assert_eq!(balance, GAS_AMOUNT);
            assert_eq!(balance.to_ether_string(), "0.00001");
        }
        other => panic!("expected AlreadyFunded, got {:?}", other),
    }
    assert_eq!(chain.transfers().len(), 1);
}

#[tokio::test]
async fn test_already_funded_never_transfers() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, ONE_ETHER);
    let dispenser = dispenser(&chain);

    for balance in [GAS_AMOUNT, Wei(GAS_AMOUNT.0 + 1), ONE_ETHER, Wei(u128::MAX)] {
        chain.set_balance(TARGET, balance);
        let calls_before = chain.balance_calls();

        match dispenser.dispense(TARGET).await {
            DispenseResult::Rejected(Rejection::AlreadyFunded { balance: observed }) => {
                assert_eq!(observed, balance)
            }
            other => panic!("expected AlreadyFunded for {:?}, got {:?}", balance, other),
        }
        // Only the target balance is read
        assert_eq!(chain.balance_calls(), calls_before + 1);
    }

    assert!(chain.transfers().is_empty());
}

#[tokio::test]
async fn test_invalid_addresses_make_no_network_calls() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, ONE_ETHER);
    let dispenser = dispenser(&chain);

    let long = format!("0x{}", "a".repeat(41));
    let inputs = [
        "not-an-address",
        "",
        "0x",
        "0x1234",
        "000000000000000000000000000000000000dEaD",
        " 0x000000000000000000000000000000000000dEaD",
        "0xg00000000000000000000000000000000000dEaD",
        long.as_str(),
        "0x0000000000000000000000000000000000000000",
    ];

    for input in inputs {
        match dispenser.dispense(input).await {
            DispenseResult::Rejected(Rejection::InvalidAddress(_)) => {}
            other => panic!("expected InvalidAddress for {:?}, got {:?}", input, other),
        }
    }

    assert_eq!(chain.balance_calls(), 0);
    assert!(chain.transfers().is_empty());
}

#[tokio::test]
async fn test_funder_address_is_rejected() {
    let chain = MockChain::new();
    let dispenser = dispenser(&chain);

    // Lowercase form of the funder address
    let funder = FUNDER_ADDRESS.to_lowercase();
    assert!(matches!(
        dispenser.dispense(&funder).await,
        DispenseResult::Rejected(Rejection::InvalidAddress(_))
    ));
    assert_eq!(chain.balance_calls(), 0);
}

#[tokio::test]
async fn test_funder_insufficient_balance() {
    let chain = MockChain::new();
    let dispenser = dispenser(&chain);

    for funder_balance in [Wei::ZERO, Wei(1), GAS_AMOUNT] {
        chain.set_balance(FUNDER_ADDRESS, funder_balance);

        for target_balance in [Wei::ZERO, Wei(GAS_AMOUNT.0 - 1)] {
            chain.set_balance(TARGET, target_balance);
            match dispenser.dispense(TARGET).await {
                DispenseResult::Failed(StationError::InsufficientFunderBalance { balance }) => {
                    assert_eq!(balance, funder_balance)
                }
                other => panic!("expected InsufficientFunderBalance, got {:?}", other),
            }
        }
    }

    assert!(chain.transfers().is_empty());
}

#[tokio::test]
async fn test_funder_just_above_amount_sends() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, Wei(GAS_AMOUNT.0 + 1));
    let dispenser = dispenser(&chain);

    assert!(matches!(dispenser.dispense(TARGET).await, DispenseResult::Sent { .. }));
}

#[tokio::test]
async fn test_unconfigured_funder() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, ONE_ETHER);
    let dispenser = dispenser_with(&chain, FunderIdentity::from_secret(None), Duration::from_secs(120));

    assert!(matches!(
        dispenser.dispense(TARGET).await,
        DispenseResult::Failed(StationError::NotConfigured(_))
    ));
    assert!(matches!(dispenser.status().await, Err(StationError::NotConfigured(_))));
    assert_eq!(chain.balance_calls(), 0);
}

#[tokio::test]
async fn test_unconfigured_funder_checked_before_address() {
    let chain = MockChain::new();
    let dispenser = dispenser_with(&chain, FunderIdentity::from_secret(None), Duration::from_secs(120));

    for input in ["not-an-address", "", "0x0000000000000000000000000000000000000000", TARGET] {
        match dispenser.dispense(input).await {
            DispenseResult::Failed(StationError::NotConfigured(_)) => {}
            other => panic!("expected NotConfigured for {:?}, got {:?}", input, other),
        }
    }
    assert_eq!(chain.balance_calls(), 0);
}

#[tokio::test]
async fn test_network_failure_is_not_zero_balance() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, ONE_ETHER);
    chain.fail_balance.store(true, Ordering::SeqCst);
    let dispenser = dispenser(&chain);

    assert!(matches!(
        dispenser.dispense(TARGET).await,
        DispenseResult::Failed(StationError::Network(_))
    ));
    assert!(matches!(dispenser.status().await, Err(StationError::Network(_))));
    assert!(chain.transfers().is_empty());
}

#[tokio::test]
async fn test_failed_submission_can_be_retried() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, ONE_ETHER);
    chain.fail_submit.store(true, Ordering::SeqCst);
    let dispenser = dispenser(&chain);

    assert!(matches!(
        dispenser.dispense(TARGET).await,
        DispenseResult::Failed(StationError::Network(_))
    ));

    // Nothing was broadcast, so the target is not held as pending
    chain.fail_submit.store(false, Ordering::SeqCst);
    assert!(matches!(dispenser.dispense(TARGET).await, DispenseResult::Sent { .. }));
}

#[tokio::test]
async fn test_idempotent_when_balance_updates() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, ONE_ETHER);
    chain.credit_on_transfer.store(true, Ordering::SeqCst);
    let dispenser = dispenser(&chain);

    assert!(matches!(dispenser.dispense(TARGET).await, DispenseResult::Sent { .. }));
    assert_eq!(chain.balance_of(TARGET), GAS_AMOUNT);
    assert_eq!(chain.balance_of(FUNDER_ADDRESS), Wei(ONE_ETHER.0 - GAS_AMOUNT.0));

    assert!(matches!(
        dispenser.dispense(TARGET).await,
        DispenseResult::Rejected(Rejection::AlreadyFunded { balance }) if balance == GAS_AMOUNT
    ));
    assert_eq!(chain.transfers().len(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_transfer_once() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, ONE_ETHER);
    // Target balance stays zero: the transfer has not landed yet
    let dispenser = dispenser(&chain);

    let (a, b) = tokio::join!(dispenser.dispense(TARGET), dispenser.dispense(TARGET));

    let sent = [&a, &b]
        .iter()
        .filter(|r| matches!(r, DispenseResult::Sent { .. }))
        .count();
    let rejected = [&a, &b]
        .iter()
        .filter(|r| matches!(r, DispenseResult::Rejected(Rejection::AlreadyFunded { balance }) if *balance == Wei::ZERO))
        .count();

    assert_eq!(sent, 1);
    assert_eq!(rejected, 1);
    assert_eq!(chain.transfers().len(), 1);
}

#[tokio::test]
async fn test_pending_guard_expires() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, ONE_ETHER);
    let dispenser = dispenser_with(&chain, configured_identity(), Duration::from_millis(50));

    assert!(matches!(dispenser.dispense(TARGET).await, DispenseResult::Sent { .. }));
    assert!(matches!(
        dispenser.dispense(TARGET).await,
        DispenseResult::Rejected(Rejection::AlreadyFunded { .. })
    ));

    // Transfer never landed; once the guard expires the target may be funded again
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(matches!(dispenser.dispense(TARGET).await, DispenseResult::Sent { .. }));
    assert_eq!(chain.transfers().len(), 2);
}

#[tokio::test]
async fn test_different_targets_are_independent() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, ONE_ETHER);
    let dispenser = dispenser(&chain);

    let other = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    assert!(matches!(dispenser.dispense(TARGET).await, DispenseResult::Sent { .. }));
    assert!(matches!(dispenser.dispense(other).await, DispenseResult::Sent { .. }));
    assert_eq!(chain.transfers().len(), 2);
}

#[tokio::test]
async fn test_status_reports_funder() {
    let chain = MockChain::new();
    chain.set_balance(FUNDER_ADDRESS, ONE_ETHER);
    let dispenser = dispenser(&chain);

    let status = dispenser.status().await.unwrap();
    assert_eq!(status.address.to_string(), FUNDER_ADDRESS);
    assert_eq!(status.balance, ONE_ETHER);
    assert_eq!(chain.balance_calls(), 1);
}
