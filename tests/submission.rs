mod common;

use common::*;
use ledger_client::ledger::{
    LedgerEndpoint, MethodSignature, RecordedResponse, StorageValue, TransactionReference,
};
use ledger_client::tx::{CommonParams, TransactionBuilder};
use ledger_client::{AccountProvisioner, ClientError, JarInstaller};

#[tokio::test]
async fn test_nonces_strictly_increase() {
    let h = harness(100_000_000).await;
    let payer = h.origin.payer();

    for expected in 0..5u64 {
        assert_eq!(h.ledger.nonce(&h.origin.reference()).await.unwrap(), expected);
        h.submitter
            .method_call(
                &payer,
                h.origin.runtime_jar,
                MethodSignature::receive(),
                h.origin.reference(),
                vec![StorageValue::BigInteger(1)],
            )
            .await
            .unwrap();
    }

    assert_eq!(h.ledger.nonce(&h.origin.reference()).await.unwrap(), 5);
    assert_eq!(h.submitter.nonces().current(h.origin.reference()).await.unwrap(), 5);
}

#[tokio::test]
async fn test_stale_nonce_is_rejected_and_not_consumed() {
    let h = harness(100_000_000).await;

    let request = TransactionBuilder::new()
        .build_method_call(
            CommonParams {
                caller: h.origin.reference(),
                nonce: 7,
                chain_id: CHAIN_ID.to_string(),
                gas_limit: 10_000,
                gas_price: 2,
                classpath: h.origin.runtime_jar,
            },
            MethodSignature::receive(),
            h.origin.reference(),
            vec![StorageValue::BigInteger(1)],
        )
        .unwrap();

    let err = h.submitter.submit(request, &h.origin.signer).await.unwrap_err();
    assert!(matches!(&err, ClientError::RejectedByEndpoint(m) if m.contains("nonce")));
    assert!(!err.consumes_nonce());
    assert_eq!(h.ledger.nonce(&h.origin.reference()).await.unwrap(), 0);

    // The regular path still uses nonce zero
    h.submitter
        .method_call(
            &h.origin.payer(),
            h.origin.runtime_jar,
            MethodSignature::receive(),
            h.origin.reference(),
            vec![StorageValue::BigInteger(1)],
        )
        .await
        .unwrap();
    assert_eq!(h.ledger.nonce(&h.origin.reference()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_local_nonce_ahead_of_ledger_recovers() {
    let h = harness(100_000_000).await;
    let payer = h.origin.payer();
    h.submitter.nonces().track(h.origin.reference(), 3);

    async fn receive(h: &Harness, payer: &ledger_client::Payer) -> Result<(), ClientError> {
        h.submitter
            .method_call(
                payer,
                h.origin.runtime_jar,
                MethodSignature::receive(),
                h.origin.reference(),
                vec![StorageValue::BigInteger(1)],
            )
            .await
            .map(|_| ())
    }

    let err = receive(&h, &payer).await.unwrap_err();
    assert!(matches!(err, ClientError::RejectedByEndpoint(_)));
    assert_eq!(h.submitter.nonces().current(h.origin.reference()).await.unwrap(), 0);

    receive(&h, &payer).await.unwrap();
    assert_eq!(h.ledger.nonce(&h.origin.reference()).await.unwrap(), 1);
    assert_eq!(h.submitter.nonces().current(h.origin.reference()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_failed_investment_consumes_one_nonce() {
    let h = harness(100_000_000).await;
    let origin = h.origin.payer();

    let jar = JarInstaller::new(h.submitter.clone())
        .install_jars(&origin, vec![b"ponzi classes".to_vec()])
        .await
        .unwrap()[0];
    let ponzi = h
        .submitter
        .constructor_call(&origin, jar, ponzi_constructor(), vec![])
        .await
        .unwrap();

    let provisioner = AccountProvisioner::new(h.bootstrapper.keys().clone(), h.submitter.clone());
    let investors = provisioner
        .create_accounts(&origin, &[1_000_000, 1_000_000, 1_000_000])
        .await
        .unwrap();

    for (index, amount) in [1_200u128, 1_500].into_iter().enumerate() {
        let investor = investors.account(index).unwrap().payer(provisioner.keys()).unwrap();
        h.submitter
            .method_call(&investor, jar, invest(), ponzi, vec![StorageValue::BigInteger(amount)])
            .await
            .unwrap();
    }

    let third = investors.account(2).unwrap();
    let payer = third.payer(provisioner.keys()).unwrap();
    let before = h.ledger.nonce(&third.reference).await.unwrap();

    let err = h
        .submitter
        .method_call(&payer, jar, invest(), ponzi, vec![StorageValue::BigInteger(900)])
        .await
        .unwrap_err();

    let reference = match err {
        ClientError::ExecutionFailed { reference, message } => {
            assert!(message.contains("at least 1650"), "{}", message);
            reference
        }
        other => panic!("expected an execution failure, got {:?}", other),
    };
    assert_eq!(h.ledger.nonce(&third.reference).await.unwrap(), before + 1);
    assert_eq!(
        h.submitter.nonces().current(third.reference).await.unwrap(),
        before + 1
    );
    assert!(matches!(
        h.ledger.response(&reference).await.unwrap(),
        Some(RecordedResponse::Failed { .. })
    ));

    let current = h
        .submitter
        .view_call(h.origin.reference(), jar, current_investment(), ponzi, vec![])
        .await
        .unwrap();
    assert_eq!(current, Some(StorageValue::BigInteger(1_500)));
}

#[tokio::test]
async fn test_lost_response_is_reconciled() {
    let h = harness(100_000_000).await;
    let payer = h.origin.payer();

    h.ledger.drop_next_response();
    h.submitter
        .method_call(
            &payer,
            h.origin.runtime_jar,
            MethodSignature::receive(),
            h.origin.reference(),
            vec![StorageValue::BigInteger(1)],
        )
        .await
        .unwrap();

    // Included exactly once
    assert_eq!(h.ledger.nonce(&h.origin.reference()).await.unwrap(), 1);
    assert_eq!(h.ledger.recorded_transactions().await, 2);
    assert_eq!(h.submitter.nonces().current(h.origin.reference()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_offline_endpoint_then_recovery() {
    let h = harness(100_000_000).await;
    let payer = h.origin.payer();

    // Seed the tracker before going offline
    assert_eq!(h.submitter.nonces().current(h.origin.reference()).await.unwrap(), 0);
    h.ledger.set_available(false);

    let err = h
        .submitter
        .method_call(
            &payer,
            h.origin.runtime_jar,
            MethodSignature::receive(),
            h.origin.reference(),
            vec![StorageValue::BigInteger(1)],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::EndpointUnavailable(_)));
    assert!(err.is_retryable());

    h.ledger.set_available(true);
    h.submitter
        .method_call(
            &payer,
            h.origin.runtime_jar,
            MethodSignature::receive(),
            h.origin.reference(),
            vec![StorageValue::BigInteger(1)],
        )
        .await
        .unwrap();
    assert_eq!(h.ledger.nonce(&h.origin.reference()).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_leave_no_gaps() {
    let h = harness(100_000_000).await;
    let payer = h.origin.payer();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let submitter = h.submitter.clone();
            let payer = payer.clone();
            let receiver = h.origin.reference();
            let classpath = h.origin.runtime_jar;
            tokio::spawn(async move {
                submitter
                    .method_call(
                        &payer,
                        classpath,
                        MethodSignature::receive(),
                        receiver,
                        vec![StorageValue::BigInteger(1)],
                    )
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    assert_eq!(h.ledger.nonce(&h.origin.reference()).await.unwrap(), 16);
    assert_eq!(h.ledger.recorded_transactions().await, 17);
}

#[tokio::test]
async fn test_rising_gas_price_is_followed() {
    let h = harness(100_000_000).await;
    let payer = h.origin.payer();
    let mut last = 0;

    for price in [1u64, 5, 40, 300] {
        h.ledger.set_gas_price(price).await;
        let safe = h.submitter.gas().safe_gas_price().await.unwrap();
        assert!(safe >= price && safe >= last);
        last = safe;

        h.submitter
            .method_call(
                &payer,
                h.origin.runtime_jar,
                MethodSignature::receive(),
                h.origin.reference(),
                vec![StorageValue::BigInteger(1)],
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_malformed_request_never_reaches_the_ledger() {
    let h = harness(100_000_000).await;

    let err = h
        .submitter
        .method_call(
            &h.origin.payer(),
            h.origin.runtime_jar,
            MethodSignature::receive(),
            h.origin.reference(),
            vec![StorageValue::String("ten".into())],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::MalformedRequest(_)));
    assert_eq!(h.ledger.recorded_transactions().await, 1);
    assert_eq!(h.submitter.nonces().current(h.origin.reference()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_jar_with_unknown_dependency_is_rejected() {
    let h = harness(100_000_000).await;

    let err = h
        .submitter
        .jar_store(
            &h.origin.payer(),
            h.origin.runtime_jar,
            vec![1, 2, 3],
            vec![TransactionReference::from_bytes([9; 32])],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::RejectedByEndpoint(_)));
    assert_eq!(h.ledger.nonce(&h.origin.reference()).await.unwrap(), 0);
}
