use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use alloy::primitives::{keccak256, Address, Bytes, B256};
use serde_json::Value;

use wave_portal_core::{
    PendingWave, PortError, RawWave, SubscriptionId, WaveContractPort, WaveHandler, WaveReceipt,
};

use crate::abi::{
    decode_all_waves, decode_new_wave_log, decode_total_waves, encode_get_all_waves,
    encode_get_total_waves, encode_wave, new_wave_topic,
};
use crate::rpc::{parse_quantity, quantity, JsonRpcClient};
use crate::PortalConfig;

/// Shortest message the deployed contract accepts.
const MIN_MESSAGE_LEN: usize = 1;

#[derive(Debug, Clone)]
pub struct WaveContractAdapter {
    address: Address,
    mode: ContractMode,
    listeners: Arc<Mutex<ListenerRegistry>>,
}

#[derive(Debug, Clone)]
enum ContractMode {
    Disabled(String),
    Deterministic(Arc<Mutex<DeterministicChain>>),
    Rpc(RpcRuntime),
}

#[derive(Debug, Clone)]
struct RpcRuntime {
    node: JsonRpcClient,
    wallet: Option<JsonRpcClient>,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

/// In-process stand-in for a node running the WavePortal contract.
#[derive(Debug)]
struct DeterministicChain {
    waves: Vec<RawWave>,
    pending: HashMap<B256, RawWave>,
    block: u64,
    clock: u64,
    nonce: u64,
    reads: u64,
    fail_reads: bool,
    fail_next_confirmation: bool,
}

impl Default for DeterministicChain {
    fn default() -> Self {
        Self {
            waves: Vec::new(),
            pending: HashMap::new(),
            block: 0,
            clock: 1_700_000_000,
            nonce: 0,
            reads: 0,
            fail_reads: false,
            fail_next_confirmation: false,
        }
    }
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    handlers: HashMap<u64, WaveHandler>,
    poller_stop: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("next_id", &self.next_id)
            .field("handlers", &self.handlers.len())
            .field("polling", &self.poller_stop.is_some())
            .finish()
    }
}

impl Default for WaveContractAdapter {
    fn default() -> Self {
        Self::with_config(PortalConfig::default())
    }
}

impl WaveContractAdapter {
    pub fn with_config(config: PortalConfig) -> Self {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let mode = match config.rpc_endpoint.as_deref() {
            Some(url) => {
                let wallet = config
                    .wallet_endpoint
                    .as_deref()
                    .map(|w| JsonRpcClient::new(w, timeout))
                    .transpose();
                match (JsonRpcClient::new(url, timeout), wallet) {
                    (Ok(node), Ok(wallet)) => ContractMode::Rpc(RpcRuntime {
                        node,
                        wallet,
                        poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
                        confirmation_timeout: Duration::from_millis(
                            config.confirmation_timeout_ms,
                        ),
                    }),
                    (Err(e), _) | (_, Err(e)) => {
                        ContractMode::Disabled(format!("failed to initialize rpc client: {e}"))
                    }
                }
            }
            None if config.strict_runtime_required() => ContractMode::Disabled(
                "rpc endpoint not configured in production runtime profile".to_owned(),
            ),
            None => ContractMode::Deterministic(Arc::new(Mutex::new(DeterministicChain::default()))),
        };

        Self {
            address: config.contract_address,
            mode,
            listeners: Arc::new(Mutex::new(ListenerRegistry::default())),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ContractMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn chain(&self) -> Result<MutexGuard<'_, DeterministicChain>, PortError> {
        match &self.mode {
            ContractMode::Deterministic(chain) => chain
                .lock()
                .map_err(|e| PortError::Transport(format!("chain lock poisoned: {e}"))),
            _ => Err(PortError::NotImplemented(
                "deterministic contract runtime not enabled",
            )),
        }
    }

    /// Replace the on-chain history without emitting events.
    pub fn debug_seed_waves(&self, waves: Vec<RawWave>) -> Result<(), PortError> {
        self.chain()?.waves = waves;
        Ok(())
    }

    /// Record a wave from some other user and emit `NewWave` for it.
    /// Each call is its own transaction, so identical waves stay distinct.
    pub fn debug_external_wave(&self, wave: RawWave) -> Result<(), PortError> {
        let logged = {
            let mut g = self.chain()?;
            g.block = g.block.saturating_add(1);
            g.nonce = g.nonce.saturating_add(1);
            let tx_hash = keccak256([g.block.to_be_bytes(), g.nonce.to_be_bytes()].concat());
            g.waves.push(RawWave { origin: None, ..wave.clone() });
            match wave.origin {
                Some(_) => wave,
                None => wave.with_origin(tx_hash, 0),
            }
        };
        dispatch(&self.listeners, &logged);
        Ok(())
    }

    /// Emit `NewWave` without touching history, as a node does when a log
    /// reaches the listener before a read sees the new state.
    pub fn debug_emit_only(&self, wave: RawWave) -> Result<(), PortError> {
        self.check_mode()?;
        dispatch(&self.listeners, &wave);
        Ok(())
    }

    pub fn debug_fail_reads(&self, fail: bool) -> Result<(), PortError> {
        self.chain()?.fail_reads = fail;
        Ok(())
    }

    pub fn debug_fail_next_confirmation(&self) -> Result<(), PortError> {
        self.chain()?.fail_next_confirmation = true;
        Ok(())
    }

    /// Number of `getAllWaves()` reads served.
    pub fn debug_read_count(&self) -> Result<u64, PortError> {
        Ok(self.chain()?.reads)
    }

    pub fn listener_count(&self) -> Result<usize, PortError> {
        Ok(lock_listeners(&self.listeners)?.handlers.len())
    }

    fn eth_call(&self, runtime: &RpcRuntime, data: Bytes) -> Result<Bytes, PortError> {
        let call = serde_json::json!({
            "to": self.address.to_string(),
            "data": data.to_string(),
        });
        let result = runtime
            .node
            .call("eth_call", serde_json::json!([call, "latest"]))?;
        let raw = result
            .as_str()
            .ok_or_else(|| PortError::Transport("eth_call must return hex data".to_owned()))?;
        raw.parse()
            .map_err(|e| PortError::Validation(format!("invalid eth_call data: {e}")))
    }

    fn start_poller(&self, runtime: &RpcRuntime) -> Result<Arc<AtomicBool>, PortError> {
        let head = parse_quantity(&runtime.node.call("eth_blockNumber", serde_json::json!([]))?)?;
        let stop = Arc::new(AtomicBool::new(false));
        let poller = LogPoller {
            node: runtime.node.clone(),
            address: self.address,
            interval: runtime.poll_interval,
            next_block: head.saturating_add(1),
            stop: Arc::clone(&stop),
            listeners: Arc::clone(&self.listeners),
        };
        thread::Builder::new()
            .name("wave-log-poller".to_owned())
            .spawn(move || poller.run())
            .map_err(|e| PortError::Transport(format!("failed to spawn log poller: {e}")))?;
        tracing::debug!(from_block = head + 1, "started NewWave log poller");
        Ok(stop)
    }
}

impl WaveContractPort for WaveContractAdapter {
    fn read_all_waves(&self) -> Result<Vec<RawWave>, PortError> {
        self.check_mode()?;
        if let ContractMode::Rpc(runtime) = &self.mode {
            let data = self.eth_call(runtime, encode_get_all_waves())?;
            return decode_all_waves(&data);
        }

        let mut g = self.chain()?;
        g.reads = g.reads.saturating_add(1);
        if g.fail_reads {
            return Err(PortError::Transport("node unavailable".to_owned()));
        }
        Ok(g.waves.clone())
    }

    fn total_waves(&self) -> Result<u64, PortError> {
        self.check_mode()?;
        if let ContractMode::Rpc(runtime) = &self.mode {
            let data = self.eth_call(runtime, encode_get_total_waves())?;
            return decode_total_waves(&data);
        }
        Ok(self.chain()?.waves.len() as u64)
    }

    fn send_wave(
        &self,
        from: Address,
        message: &str,
        gas_limit: Option<u64>,
    ) -> Result<PendingWave, PortError> {
        self.check_mode()?;
        if let ContractMode::Rpc(runtime) = &self.mode {
            let wallet = runtime
                .wallet
                .as_ref()
                .ok_or_else(|| PortError::Policy("wallet endpoint not configured".to_owned()))?;
            let mut tx = serde_json::json!({
                "from": from.to_string(),
                "to": self.address.to_string(),
                "data": encode_wave(message).to_string(),
            });
            if let Some(limit) = gas_limit {
                tx["gas"] = Value::String(quantity(limit));
            }
            let result = wallet.call("eth_sendTransaction", serde_json::json!([tx]))?;
            let hash = result.as_str().ok_or_else(|| {
                PortError::Transport("eth_sendTransaction must return hash".to_owned())
            })?;
            let tx_hash: B256 = hash
                .parse()
                .map_err(|e| PortError::Validation(format!("invalid tx hash: {e}")))?;
            return Ok(PendingWave {
                tx_hash,
                from,
                message: message.to_owned(),
            });
        }

        if message.chars().count() < MIN_MESSAGE_LEN {
            return Err(PortError::Reverted(
                "execution reverted: message too short".to_owned(),
            ));
        }
        let mut g = self.chain()?;
        g.nonce = g.nonce.saturating_add(1);
        let mut seed = Vec::with_capacity(28 + message.len());
        seed.extend_from_slice(from.as_slice());
        seed.extend_from_slice(&g.nonce.to_be_bytes());
        seed.extend_from_slice(message.as_bytes());
        let tx_hash = keccak256(seed);
        g.pending
            .insert(tx_hash, RawWave::new(from, 0, message.to_owned()));
        Ok(PendingWave {
            tx_hash,
            from,
            message: message.to_owned(),
        })
    }

    fn wait_for_confirmation(&self, pending: &PendingWave) -> Result<WaveReceipt, PortError> {
        self.check_mode()?;
        if let ContractMode::Rpc(runtime) = &self.mode {
            return wait_for_receipt(runtime, pending.tx_hash);
        }

        let (wave, block) = {
            let mut g = self.chain()?;
            let mut wave = g.pending.remove(&pending.tx_hash).ok_or_else(|| {
                PortError::NotFound(format!("pending transaction {}", pending.tx_hash))
            })?;
            if g.fail_next_confirmation {
                g.fail_next_confirmation = false;
                return Err(PortError::Transport(
                    "connection lost while waiting for confirmation".to_owned(),
                ));
            }
            g.block = g.block.saturating_add(1);
            g.clock = g.clock.saturating_add(12);
            wave.timestamp = g.clock;
            g.waves.push(wave.clone());
            (wave.with_origin(pending.tx_hash, 0), g.block)
        };
        dispatch(&self.listeners, &wave);
        Ok(WaveReceipt {
            tx_hash: pending.tx_hash,
            block_number: Some(block),
            gas_used: None,
        })
    }

    fn subscribe_new_wave(&self, handler: WaveHandler) -> Result<SubscriptionId, PortError> {
        self.check_mode()?;
        let mut registry = lock_listeners(&self.listeners)?;
        if let ContractMode::Rpc(runtime) = &self.mode {
            if registry.poller_stop.is_none() {
                registry.poller_stop = Some(self.start_poller(runtime)?);
            }
        }
        registry.next_id = registry.next_id.saturating_add(1);
        let id = registry.next_id;
        registry.handlers.insert(id, handler);
        Ok(SubscriptionId(id))
    }

    fn unsubscribe_new_wave(&self, id: SubscriptionId) -> Result<(), PortError> {
        let mut registry = lock_listeners(&self.listeners)?;
        if registry.handlers.remove(&id.0).is_none() {
            return Err(PortError::NotFound(format!("subscription {}", id.0)));
        }
        if registry.handlers.is_empty() {
            if let Some(stop) = registry.poller_stop.take() {
                stop.store(true, Ordering::Release);
                tracing::debug!("stopping NewWave log poller");
            }
        }
        Ok(())
    }
}

fn wait_for_receipt(runtime: &RpcRuntime, tx_hash: B256) -> Result<WaveReceipt, PortError> {
    let deadline = Instant::now() + runtime.confirmation_timeout;
    loop {
        let receipt = runtime
            .node
            .call("eth_getTransactionReceipt", serde_json::json!([tx_hash.to_string()]))?;
        if !receipt.is_null() {
            let status = receipt
                .get("status")
                .map(parse_quantity)
                .transpose()?
                .unwrap_or(1);
            if status == 0 {
                return Err(PortError::Reverted(format!(
                    "wave transaction {tx_hash} reverted"
                )));
            }
            return Ok(WaveReceipt {
                tx_hash,
                block_number: receipt.get("blockNumber").map(parse_quantity).transpose()?,
                gas_used: receipt.get("gasUsed").map(parse_quantity).transpose()?,
            });
        }
        if Instant::now() >= deadline {
            return Err(PortError::Transport(format!(
                "timed out waiting for confirmation of {tx_hash}"
            )));
        }
        thread::sleep(runtime.poll_interval);
    }
}

struct LogPoller {
    node: JsonRpcClient,
    address: Address,
    interval: Duration,
    next_block: u64,
    stop: Arc<AtomicBool>,
    listeners: Arc<Mutex<ListenerRegistry>>,
}

impl LogPoller {
    fn run(mut self) {
        while !self.stop.load(Ordering::Acquire) {
            thread::sleep(self.interval);
            if self.stop.load(Ordering::Acquire) {
                break;
            }
            if let Err(e) = self.poll_once() {
                tracing::warn!(error = %e, "NewWave log poll failed");
            }
        }
    }

    fn poll_once(&mut self) -> Result<(), PortError> {
        let head = parse_quantity(&self.node.call("eth_blockNumber", serde_json::json!([]))?)?;
        if head < self.next_block {
            return Ok(());
        }
        let filter = serde_json::json!([{
            "address": self.address.to_string(),
            "topics": [new_wave_topic().to_string()],
            "fromBlock": quantity(self.next_block),
            "toBlock": quantity(head),
        }]);
        let logs = self.node.call("eth_getLogs", filter)?;
        let logs = logs
            .as_array()
            .ok_or_else(|| PortError::Transport("eth_getLogs: array expected".to_owned()))?;
        for log in logs {
            match decode_log(log) {
                Ok(wave) => dispatch(&self.listeners, &wave),
                Err(e) => tracing::warn!(error = %e, "skipping undecodable NewWave log"),
            }
        }
        self.next_block = head.saturating_add(1);
        Ok(())
    }
}

fn decode_log(log: &Value) -> Result<RawWave, PortError> {
    let topics = log
        .get("topics")
        .and_then(Value::as_array)
        .ok_or_else(|| PortError::Validation("log missing topics".to_owned()))?
        .iter()
        .map(|t| {
            t.as_str()
                .ok_or_else(|| PortError::Validation("topic must be hex string".to_owned()))?
                .parse::<B256>()
                .map_err(|e| PortError::Validation(format!("invalid topic: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let data: Bytes = log
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| PortError::Validation("log missing data".to_owned()))?
        .parse()
        .map_err(|e| PortError::Validation(format!("invalid log data: {e}")))?;
    let wave = decode_new_wave_log(&topics, &data)?;

    // pending logs carry null here
    let tx_hash = log
        .get("transactionHash")
        .and_then(Value::as_str)
        .map(|h| {
            h.parse::<B256>()
                .map_err(|e| PortError::Validation(format!("invalid log transaction hash: {e}")))
        })
        .transpose()?;
    let log_index = log
        .get("logIndex")
        .filter(|v| !v.is_null())
        .map(parse_quantity)
        .transpose()?;
    Ok(match (tx_hash, log_index) {
        (Some(tx_hash), Some(log_index)) => wave.with_origin(tx_hash, log_index),
        _ => wave,
    })
}

fn lock_listeners(
    listeners: &Mutex<ListenerRegistry>,
) -> Result<MutexGuard<'_, ListenerRegistry>, PortError> {
    listeners
        .lock()
        .map_err(|e| PortError::Transport(format!("listener lock poisoned: {e}")))
}

/// Deliver one wave to every current listener, outside the registry lock.
fn dispatch(listeners: &Mutex<ListenerRegistry>, wave: &RawWave) {
    let handlers: Vec<WaveHandler> = match listeners.lock() {
        Ok(g) => g.handlers.values().cloned().collect(),
        Err(_) => return,
    };
    for handler in handlers {
        handler(wave.clone());
    }
}
