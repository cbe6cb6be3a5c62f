mod common;

use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, U256};
use serde_json::{json, Value};
use tiny_http::{Response, Server};

use wave_portal_adapters::abi::{encode_get_all_waves, encode_get_total_waves, new_wave_topic};
use wave_portal_adapters::{Eip1193Adapter, PortalConfig, RuntimeProfile, WaveContractAdapter};
use wave_portal_core::{
    ErrorKind, PendingWave, PortError, RawWave, WalletPort, WaveContractPort, WavePortal,
};

use common::{other_address, owner_address};

type Calls = Arc<Mutex<Vec<(String, Value)>>>;

/// JSON-RPC server answering each call with `handler(method, params)`.
/// The handler returns either `{"result": ..}` or `{"error": ..}`.
fn spawn_rpc_server<F>(handler: F) -> (String, Calls)
where
    F: Fn(&str, &Value) -> Value + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("start server");
    let url = format!("http://{}", server.server_addr());
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);

    thread::spawn(move || loop {
        let mut req = match server.recv() {
            Ok(r) => r,
            Err(_) => break,
        };
        let mut body = String::new();
        let _ = req.as_reader().read_to_string(&mut body);
        let request: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        let method = request["method"].as_str().unwrap_or_default().to_owned();
        let params = request["params"].clone();
        let mut reply = handler(&method, &params);
        reply["jsonrpc"] = json!("2.0");
        reply["id"] = request["id"].clone();
        if let Ok(mut g) = seen.lock() {
            g.push((method, params));
        }
        let _ = req.respond(Response::from_string(reply.to_string()));
    });

    (url, calls)
}

fn config_for(url: &str) -> PortalConfig {
    PortalConfig {
        rpc_endpoint: Some(url.to_owned()),
        wallet_endpoint: Some(url.to_owned()),
        poll_interval_ms: 10,
        confirmation_timeout_ms: 2_000,
        request_timeout_ms: 2_000,
        ..PortalConfig::default()
    }
}

fn methods(calls: &Calls) -> Vec<String> {
    calls
        .lock()
        .expect("calls lock")
        .iter()
        .map(|(m, _)| m.clone())
        .collect()
}

fn hex(bytes: &[u8]) -> String {
    alloy::primitives::Bytes::copy_from_slice(bytes).to_string()
}

fn encoded_waves(waves: &[(Address, &str, u64)]) -> String {
    let tuples = waves
        .iter()
        .map(|(addr, msg, ts)| {
            DynSolValue::Tuple(vec![
                DynSolValue::Address(*addr),
                DynSolValue::String((*msg).to_owned()),
                DynSolValue::Uint(U256::from(*ts), 256),
            ])
        })
        .collect();
    hex(&DynSolValue::Tuple(vec![DynSolValue::Array(tuples)]).abi_encode_params())
}

#[test]
fn wallet_proxy_reads_and_requests_accounts() {
    let (url, calls) = spawn_rpc_server(|method, _| match method {
        "eth_accounts" | "eth_requestAccounts" => {
            json!({"result": ["0x1000000000000000000000000000000000000001"]})
        }
        _ => json!({"error": {"code": -32601, "message": "method not found"}}),
    });
    let wallet = Eip1193Adapter::with_config(config_for(&url));

    assert!(wallet.has_provider());
    assert_eq!(wallet.authorized_accounts().expect("accounts"), vec![owner_address()]);
    assert_eq!(wallet.request_accounts().expect("request"), vec![owner_address()]);
    assert_eq!(wallet.prompt_count().expect("prompts"), 1);
    assert_eq!(methods(&calls), vec!["eth_accounts", "eth_requestAccounts"]);
}

#[test]
fn wallet_rejection_surfaces_as_permission_denied() {
    let (url, _calls) = spawn_rpc_server(|method, _| match method {
        "eth_requestAccounts" => {
            json!({"error": {"code": 4001, "message": "User rejected the request."}})
        }
        "eth_accounts" => json!({"result": []}),
        _ => json!({"error": {"code": -32601, "message": "method not found"}}),
    });
    let config = config_for(&url);
    let portal = WavePortal::new(
        Eip1193Adapter::with_config(config.clone()),
        WaveContractAdapter::with_config(config.clone()),
        config.portal_options(),
    );

    let err = portal.request_connection().expect_err("rejected");
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(portal.account().expect("account"), None);
}

#[test]
fn contract_reads_go_through_eth_call() {
    let all_waves = hex(&encode_get_all_waves());
    let total = hex(&encode_get_total_waves());
    let waves = encoded_waves(&[(other_address(), "hello", 10), (owner_address(), "gm", 20)]);
    let count = hex(&DynSolValue::Uint(U256::from(2u64), 256).abi_encode());

    let (url, calls) = spawn_rpc_server(move |method, params| {
        let data = params[0]["data"].as_str().unwrap_or_default();
        match method {
            "eth_call" if data == all_waves => json!({"result": waves}),
            "eth_call" if data == total => json!({"result": count}),
            _ => json!({"error": {"code": -32601, "message": "method not found"}}),
        }
    });
    let config = config_for(&url);
    let contract = WaveContractAdapter::with_config(config.clone());

    let read = contract.read_all_waves().expect("read");
    assert_eq!(
        read,
        vec![
            RawWave::new(other_address(), 10, "hello"),
            RawWave::new(owner_address(), 20, "gm"),
        ]
    );
    assert_eq!(contract.total_waves().expect("total"), 2);

    let recorded = calls.lock().expect("calls lock");
    assert_eq!(recorded[0].1[1], json!("latest"));
    assert_eq!(
        recorded[0].1[0]["to"].as_str().map(str::to_ascii_lowercase),
        Some(config.contract_address.to_string().to_ascii_lowercase())
    );
}

#[test]
fn send_attaches_gas_limit_and_waits_for_receipt() {
    let tx_hash = B256::repeat_byte(0xaa);
    let (url, calls) = spawn_rpc_server(move |method, _| match method {
        "eth_sendTransaction" => json!({"result": tx_hash.to_string()}),
        "eth_getTransactionReceipt" => json!({"result": {
            "transactionHash": tx_hash.to_string(),
            "status": "0x1",
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
        }}),
        _ => json!({"error": {"code": -32601, "message": "method not found"}}),
    });
    let contract = WaveContractAdapter::with_config(config_for(&url));

    let pending = contract
        .send_wave(owner_address(), "gm", Some(300_000))
        .expect("send");
    assert_eq!(pending.tx_hash, tx_hash);
    let receipt = contract.wait_for_confirmation(&pending).expect("receipt");
    assert_eq!(receipt.block_number, Some(16));
    assert_eq!(receipt.gas_used, Some(21_000));

    let recorded = calls.lock().expect("calls lock");
    let tx = &recorded[0].1[0];
    assert_eq!(tx["gas"], json!("0x493e0"));
    assert_eq!(
        tx["from"].as_str().map(str::to_ascii_lowercase),
        Some(owner_address().to_string().to_ascii_lowercase())
    );
}

#[test]
fn reverted_receipt_is_reported() {
    let (url, _calls) = spawn_rpc_server(|method, _| match method {
        "eth_getTransactionReceipt" => json!({"result": {"status": "0x0", "blockNumber": "0x3"}}),
        _ => json!({"error": {"code": -32601, "message": "method not found"}}),
    });
    let contract = WaveContractAdapter::with_config(config_for(&url));
    let pending = PendingWave {
        tx_hash: B256::repeat_byte(0xbb),
        from: owner_address(),
        message: "gm".to_owned(),
    };

    let err = contract.wait_for_confirmation(&pending).expect_err("reverted");
    assert!(matches!(err, PortError::Reverted(_)));
}

#[test]
fn log_poller_delivers_new_waves_until_unsubscribed() {
    let heads = Arc::new(AtomicU64::new(5));
    let log_data = hex(
        &DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(1_000u64), 256),
            DynSolValue::String("hi".to_owned()),
        ])
        .abi_encode_params(),
    );
    let sender_topic = B256::left_padding_from(other_address().as_slice());

    let server_heads = Arc::clone(&heads);
    let (url, calls) = spawn_rpc_server(move |method, _| match method {
        "eth_blockNumber" => {
            let head = server_heads.swap(6, Ordering::SeqCst);
            json!({"result": format!("{head:#x}")})
        }
        "eth_getLogs" => json!({"result": [{
            "topics": [new_wave_topic().to_string(), sender_topic.to_string()],
            "data": log_data,
            "transactionHash": B256::repeat_byte(0x77).to_string(),
            "logIndex": "0x2",
        }]}),
        _ => json!({"error": {"code": -32601, "message": "method not found"}}),
    });
    let contract = WaveContractAdapter::with_config(config_for(&url));

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let id = contract
        .subscribe_new_wave(Arc::new(move |wave: RawWave| {
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(wave);
            }
        }))
        .expect("subscribe");

    let wave = rx.recv_timeout(Duration::from_secs(5)).expect("live wave");
    assert_eq!(
        wave,
        RawWave::new(other_address(), 1_000, "hi").with_origin(B256::repeat_byte(0x77), 2)
    );

    contract.unsubscribe_new_wave(id).expect("unsubscribe");
    assert_eq!(contract.listener_count().expect("listeners"), 0);

    let filters: Vec<Value> = calls
        .lock()
        .expect("calls lock")
        .iter()
        .filter(|(m, _)| m == "eth_getLogs")
        .map(|(_, p)| p[0].clone())
        .collect();
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0]["fromBlock"], json!("0x6"));
    assert_eq!(filters[0]["topics"][0], json!(new_wave_topic().to_string()));
}

#[test]
fn production_profile_without_endpoints_is_disabled() {
    let config = PortalConfig {
        runtime_profile: RuntimeProfile::Production,
        ..PortalConfig::default()
    };
    let wallet = Eip1193Adapter::with_config(config.clone());
    let contract = WaveContractAdapter::with_config(config);

    assert!(!wallet.has_provider());
    assert!(matches!(
        contract.read_all_waves(),
        Err(PortError::Policy(_))
    ));
    assert!(matches!(
        contract.debug_read_count(),
        Err(PortError::NotImplemented(_))
    ));
}

#[test]
fn node_without_wallet_endpoint_has_no_provider() {
    let (url, calls) = spawn_rpc_server(|_, _| json!({"result": []}));
    let config = PortalConfig {
        wallet_endpoint: None,
        ..config_for(&url)
    };
    assert!(config.validate().is_err());

    let portal = WavePortal::new(
        Eip1193Adapter::with_config(config.clone()),
        WaveContractAdapter::with_config(config.clone()),
        config.portal_options(),
    );
    assert!(!portal.wallet().has_provider());
    assert_eq!(
        portal.request_connection().expect_err("no provider").kind(),
        ErrorKind::ProviderAbsent
    );
    assert_eq!(portal.account().expect("account"), None);
    assert!(methods(&calls).is_empty());
}
