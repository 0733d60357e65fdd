#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]
//! JsonRpcWallet against a canned JSON-RPC endpoint

mod support;

use assert_matches::assert_matches;
use covera_core::effects::{ChainSpec, Confirmation, TransactionRequest, WalletEffects};
use covera_core::errors::WalletError;
use covera_core::identifiers::{Address, TxRef};
use covera_core::types::Wei;
use covera_http::{JsonRpcWallet, RpcWalletConfig};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use support::{rpc_failure, rpc_result, CannedServer, Recorded};

fn wallet(server: &CannedServer) -> JsonRpcWallet {
    let mut config = RpcWalletConfig::new(server.url());
    config.receipt_poll_interval = Duration::from_millis(5);
    JsonRpcWallet::new(config).unwrap()
}

fn method(request: &Recorded) -> String {
    request.json()["method"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn accounts_are_normalised() {
    let server = CannedServer::start(|request| {
        rpc_result(request, json!(["0xABCDEF0000000000000000000000000000000001"]))
    })
    .await;

    let accounts = wallet(&server).request_accounts().await.unwrap();
    assert_eq!(
        accounts,
        vec![Address::new("0xabcdef0000000000000000000000000000000001")]
    );
    let request = &server.requests()[0];
    assert_eq!(method(request), "eth_requestAccounts");
    assert_eq!(request.json()["jsonrpc"], "2.0");
}

#[tokio::test]
async fn user_rejection_code() {
    let server =
        CannedServer::start(|request| rpc_failure(request, 4001, "User rejected the request"))
            .await;
    assert_eq!(
        wallet(&server).accounts().await.unwrap_err(),
        WalletError::UserRejected
    );
}

#[tokio::test]
async fn network_already_selected() {
    let server = CannedServer::start(|request| rpc_result(request, json!("0x4cef52"))).await;
    wallet(&server)
        .ensure_network(&ChainSpec::default())
        .await
        .unwrap();
    let methods: Vec<_> = server.requests().iter().map(method).collect();
    assert_eq!(methods, vec!["eth_chainId"]);
}

#[tokio::test]
async fn unknown_chain_is_added_then_selected() {
    let switches = Arc::new(AtomicUsize::new(0));
    let seen = switches.clone();
    let server = CannedServer::start(move |request| match method(request).as_str() {
        "eth_chainId" => rpc_result(request, json!("0x1")),
        "wallet_switchEthereumChain" => {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                rpc_failure(request, 4902, "Unrecognized chain ID")
            } else {
                rpc_result(request, json!(null))
            }
        }
        _ => rpc_result(request, json!(null)),
    })
    .await;

    wallet(&server)
        .ensure_network(&ChainSpec::default())
        .await
        .unwrap();

    let requests = server.requests();
    let methods: Vec<_> = requests.iter().map(method).collect();
    assert_eq!(
        methods,
        vec![
            "eth_chainId",
            "wallet_switchEthereumChain",
            "wallet_addEthereumChain",
            "wallet_switchEthereumChain",
        ]
    );
    let added = &requests[2].json()["params"][0];
    assert_eq!(added["chainId"], "0x4cef52");
    assert_eq!(added["chainName"], "Arc Testnet");
    assert_eq!(added["nativeCurrency"]["decimals"], 18);
    assert_eq!(added["rpcUrls"][0], "https://rpc.testnet.arc.network");
}

#[tokio::test]
async fn send_and_confirm() {
    let receipt_polls = Arc::new(AtomicUsize::new(0));
    let polls = receipt_polls.clone();
    let server = CannedServer::start(move |request| match method(request).as_str() {
        "eth_getBalance" => rpc_result(request, json!("0xde0b6b3a7640000")),
        "eth_sendTransaction" => rpc_result(request, json!("0xhash")),
        "eth_getTransactionReceipt" => {
            if polls.fetch_add(1, Ordering::SeqCst) < 2 {
                rpc_result(request, json!(null))
            } else {
                rpc_result(request, json!({ "status": "0x1", "blockNumber": "0x10" }))
            }
        }
        _ => rpc_failure(request, -32601, "method not found"),
    })
    .await;
    let provider = wallet(&server);
    let from = Address::new("0xaa");

    assert_eq!(
        provider.get_balance(&from).await.unwrap(),
        Wei(1_000_000_000_000_000_000)
    );

    let tx = provider
        .send_transaction(&TransactionRequest {
            from: from.clone(),
            to: Address::new("0xae4b"),
            value: Wei(100_000_000_000_000),
            gas_limit: 120_000,
            data: Some("0x3a4b66f1".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(tx, TxRef::new("0xhash"));

    let confirmation = provider.wait_for_confirmation(&tx).await.unwrap();
    assert_eq!(confirmation, Confirmation::Confirmed { block_number: 16 });
    assert_eq!(receipt_polls.load(Ordering::SeqCst), 3);

    let sent = &server.requests()[1].json()["params"][0];
    assert_eq!(sent["value"], "0x5af3107a4000");
    assert_eq!(sent["gas"], "0x1d4c0");
    assert_eq!(sent["data"], "0x3a4b66f1");
}

#[tokio::test]
async fn personal_sign_hex_encodes_message() {
    let server = CannedServer::start(|request| rpc_result(request, json!("0xsigned"))).await;
    let signature = wallet(&server)
        .sign_message(&Address::new("0xaa"), b"hi")
        .await
        .unwrap();
    assert_eq!(signature, "0xsigned");
    let params = &server.requests()[0].json()["params"];
    assert_eq!(params[0], "0x6869");
    assert_eq!(params[1], "0xaa");
}

#[tokio::test]
async fn unreachable_provider() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = JsonRpcWallet::new(RpcWalletConfig::new(format!("http://{addr}"))).unwrap();
    assert_matches!(
        provider.request_accounts().await,
        Err(WalletError::Unavailable)
    );
}
