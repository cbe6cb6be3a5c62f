use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Seconds since the unix epoch, as stored by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimestampSecs(pub u64);

/// Where a `NewWave` log was emitted. Unique per emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogOrigin {
    pub tx_hash: B256,
    pub log_index: u64,
}

/// A wave exactly as the contract reports it, either from `getAllWaves()`
/// or from a `NewWave` log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWave {
    pub sender: Address,
    pub timestamp: u64,
    pub message: String,
    /// Set for waves that arrived as logs; `getAllWaves()` carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<LogOrigin>,
}

impl RawWave {
    pub fn new(sender: Address, timestamp: u64, message: impl Into<String>) -> Self {
        Self {
            sender,
            timestamp,
            message: message.into(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, tx_hash: B256, log_index: u64) -> Self {
        self.origin = Some(LogOrigin { tx_hash, log_index });
        self
    }
}

/// Content identity of a wave, independent of its position in any list.
///
/// Derived from `keccak256(abi.encode(sender, timestamp, message))` so the
/// same on-chain wave gets the same key whether it arrived through a full
/// fetch or through a live notification. Identical waves mined in the same
/// block share a key; the ledger tells those apart by [`LogOrigin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveKey(pub B256);

impl WaveKey {
    pub fn of(sender: Address, timestamp: u64, message: &str) -> Self {
        let encoded = DynSolValue::Tuple(vec![
            DynSolValue::Address(sender),
            DynSolValue::Uint(U256::from(timestamp), 256),
            DynSolValue::String(message.to_owned()),
        ])
        .abi_encode();
        Self(keccak256(encoded))
    }
}

/// Display record for one wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveRecord {
    pub address: Address,
    pub timestamp: TimestampSecs,
    pub message: String,
    pub key: WaveKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<LogOrigin>,
}

impl From<RawWave> for WaveRecord {
    fn from(raw: RawWave) -> Self {
        let key = WaveKey::of(raw.sender, raw.timestamp, &raw.message);
        Self {
            address: raw.sender,
            timestamp: TimestampSecs(raw.timestamp),
            message: raw.message,
            key,
            origin: raw.origin,
        }
    }
}

/// A wave transaction accepted into the pending pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWave {
    pub tx_hash: B256,
    pub from: Address,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}
