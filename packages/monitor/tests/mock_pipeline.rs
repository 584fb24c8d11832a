//! Mock Pipeline Integration Tests
//!
//! Drives the monitor with a mocked transaction event (no RPC needed).
//! Verifies log retrieval calls, threshold decisions and the emission cap.

use alloy::primitives::{Address, TxHash, U256};
use mockall::mock;

use txnscope_monitor::event::{TransferEvent, ERC20_TRANSFER_EVENT, TETHER_ADDRESS, TETHER_DECIMALS};
use txnscope_monitor::finding::{
    format_address, Finding, FindingSeverity, FindingSource, FindingType,
};
use txnscope_monitor::monitor::{TransferMonitor, MAX_FINDINGS};
use txnscope_monitor::transaction::{FilterError, TransactionEvent};

mock! {
    pub TxEvent {}

    impl TransactionEvent for TxEvent {
        fn hash(&self) -> TxHash;
        fn chain_id(&self) -> u64;
        fn filter_log(
            &self,
            event_signature: &str,
            contract: Address,
        ) -> Result<Vec<TransferEvent>, FilterError>;
    }
}

// `handle_transaction` requires `Debug` for trace logging
impl std::fmt::Debug for MockTxEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTxEvent").finish_non_exhaustive()
    }
}

const CHAIN_ID: u64 = 1;

fn tx_hash() -> TxHash {
    TxHash::left_padding_from(&[0x12, 0x34])
}

fn transfer(from: Address, to: Address, raw_value: u64) -> TransferEvent {
    TransferEvent {
        from,
        to,
        value: U256::from(raw_value),
    }
}

/// Mock transaction whose Tether transfer logs are `events`; expects exactly one lookup
fn mock_tx(events: Vec<TransferEvent>) -> MockTxEvent {
    let mut tx = MockTxEvent::new();
    tx.expect_hash().return_const(tx_hash());
    tx.expect_chain_id().return_const(CHAIN_ID);
    tx.expect_filter_log()
        .withf(|signature, contract| {
            signature == ERC20_TRANSFER_EVENT && *contract == TETHER_ADDRESS
        })
        .times(1)
        .returning(move |_, _| Ok(events.clone()));
    tx
}

// ==================== Basic Tests ====================

#[test]
fn test_returns_empty_findings_without_tether_transfers() {
    let monitor = TransferMonitor::new();
    let tx = mock_tx(vec![]);

    let findings = monitor.handle_transaction(&tx).unwrap();

    assert_eq!(findings, Vec::<Finding>::new());
}

#[test]
fn test_returns_finding_for_transfer_over_10000() {
    let monitor = TransferMonitor::new();
    let from = Address::repeat_byte(0xab);
    let to = Address::repeat_byte(0xde);
    let value = 20_000_000_000u64;
    let tx = mock_tx(vec![transfer(from, to, value)]);

    let findings = monitor.handle_transaction(&tx).unwrap();

    let normalized = value / 10u64.pow(TETHER_DECIMALS as u32);
    let expected = Finding {
        name: "High Tether Transfer".to_string(),
        description: format!("High amount of USDT transferred: {normalized}"),
        alert_id: "FORTA-1".to_string(),
        severity: FindingSeverity::Low,
        finding_type: FindingType::Info,
        metadata: [
            ("to".to_string(), format_address(to)),
            ("from".to_string(), format_address(from)),
        ]
        .into_iter()
        .collect(),
        source: FindingSource::transaction(tx_hash(), CHAIN_ID),
    };
    assert_eq!(findings, vec![expected]);
    assert_eq!(findings[0].description, "High amount of USDT transferred: 20000");
}

#[test]
fn test_transfer_equal_to_threshold_is_not_reported() {
    let monitor = TransferMonitor::new();
    let tx = mock_tx(vec![transfer(Address::ZERO, Address::ZERO, 10_000_000_000)]);

    assert!(monitor.handle_transaction(&tx).unwrap().is_empty());
    assert_eq!(monitor.emitted(), 0);
}

#[test]
fn test_mixed_batch_reports_only_qualifying_transfers() {
    let monitor = TransferMonitor::new();
    let tx = mock_tx(vec![
        transfer(Address::repeat_byte(1), Address::repeat_byte(2), 5_000_000),
        transfer(Address::repeat_byte(3), Address::repeat_byte(4), 50_000_000_000),
        transfer(Address::repeat_byte(5), Address::repeat_byte(6), 10_000_000_000),
        transfer(Address::repeat_byte(7), Address::repeat_byte(8), 12_345_678_901),
    ]);

    let findings = monitor.handle_transaction(&tx).unwrap();

    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].description, "High amount of USDT transferred: 50000");
    assert_eq!(findings[0].metadata["from"], format_address(Address::repeat_byte(3)));
    assert_eq!(findings[1].description, "High amount of USDT transferred: 12345");
    assert_eq!(findings[1].metadata["to"], format_address(Address::repeat_byte(8)));
    assert_eq!(monitor.emitted(), 2);
}

// ==================== Emission Cap Tests ====================

#[test]
fn test_sixth_invocation_skips_log_retrieval() {
    let monitor = TransferMonitor::new();
    for _ in 0..MAX_FINDINGS {
        let tx = mock_tx(vec![transfer(Address::ZERO, Address::ZERO, 20_000_000_000)]);
        assert_eq!(monitor.handle_transaction(&tx).unwrap().len(), 1);
    }

    let mut exhausted = MockTxEvent::new();
    exhausted.expect_filter_log().never();
    exhausted.expect_hash().never();

    assert!(monitor.handle_transaction(&exhausted).unwrap().is_empty());
    assert_eq!(monitor.emitted(), MAX_FINDINGS);
}

#[test]
fn test_cap_is_not_rechecked_within_a_transaction() {
    let monitor = TransferMonitor::new();
    let events = vec![transfer(Address::ZERO, Address::ZERO, 20_000_000_000); 8];
    let tx = mock_tx(events);

    let findings = monitor.handle_transaction(&tx).unwrap();

    assert_eq!(findings.len(), 8);
    assert_eq!(monitor.emitted(), 8);
    assert!(monitor.is_exhausted());
}

// ==================== Error Propagation Tests ====================

#[test]
fn test_log_retrieval_failure_propagates() {
    let monitor = TransferMonitor::new();
    let mut tx = MockTxEvent::new();
    tx.expect_filter_log()
        .times(1)
        .returning(|signature, _| Err(FilterError::UnsupportedEvent(signature.to_string())));

    let result = monitor.handle_transaction(&tx);

    assert!(result.is_err());
    assert_eq!(monitor.emitted(), 0);
}

#[test]
fn test_failed_transaction_does_not_affect_next() {
    let monitor = TransferMonitor::new();

    let mut failing = MockTxEvent::new();
    failing
        .expect_filter_log()
        .returning(|_, _| Err(FilterError::UnsupportedEvent("event Foo()".to_string())));
    assert!(monitor.handle_transaction(&failing).is_err());

    let tx = mock_tx(vec![transfer(Address::ZERO, Address::ZERO, 20_000_000_000)]);
    assert_eq!(monitor.handle_transaction(&tx).unwrap().len(), 1);
}

// ==================== Wire Format Tests ====================

#[test]
fn test_published_finding_json() {
    let monitor = TransferMonitor::new();
    let from = Address::repeat_byte(0x11);
    let to = Address::repeat_byte(0x22);
    let tx = mock_tx(vec![transfer(from, to, 20_000_000_000)]);

    let finding = monitor.handle_transaction(&tx).unwrap().remove(0);
    let value: serde_json::Value = serde_json::from_str(&finding.to_json().unwrap()).unwrap();

    assert_eq!(value["name"], "High Tether Transfer");
    assert_eq!(value["alertId"], "FORTA-1");
    assert_eq!(value["severity"], "Low");
    assert_eq!(value["type"], "Info");
    assert_eq!(value["source"]["chains"][0]["chainId"], CHAIN_ID);
    assert_eq!(value["source"]["transactions"][0]["hash"], format!("{:#x}", tx_hash()));
}
