//! WavePortal contract bindings and interface descriptor checks.

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};

use wave_portal_core::{PortError, RawWave};

sol! {
    #[derive(Debug)]
    struct Wave {
        address waver;
        string message;
        uint256 timestamp;
    }

    #[derive(Debug)]
    interface IWavePortal {
        event NewWave(address indexed from, uint256 timestamp, string message);

        function wave(string _message) external;
        function getAllWaves() external view returns (Wave[] memory);
        function getTotalWaves() external view returns (uint256);
    }
}

/// JSON ABI of the deployed WavePortal contract.
pub const WAVE_PORTAL_ABI: &str = r#"[
  {"inputs":[],"stateMutability":"payable","type":"constructor"},
  {"anonymous":false,"inputs":[
    {"indexed":true,"internalType":"address","name":"from","type":"address"},
    {"indexed":false,"internalType":"uint256","name":"timestamp","type":"uint256"},
    {"indexed":false,"internalType":"string","name":"message","type":"string"}
  ],"name":"NewWave","type":"event"},
  {"inputs":[],"name":"getAllWaves","outputs":[
    {"components":[
      {"internalType":"address","name":"waver","type":"address"},
      {"internalType":"string","name":"message","type":"string"},
      {"internalType":"uint256","name":"timestamp","type":"uint256"}
    ],"internalType":"struct WavePortal.Wave[]","name":"","type":"tuple[]"}
  ],"stateMutability":"view","type":"function"},
  {"inputs":[],"name":"getTotalWaves","outputs":[
    {"internalType":"uint256","name":"","type":"uint256"}
  ],"stateMutability":"view","type":"function"},
  {"inputs":[{"internalType":"string","name":"_message","type":"string"}],
   "name":"wave","outputs":[],"stateMutability":"nonpayable","type":"function"}
]"#;

/// Parse an interface descriptor and make sure it declares everything the
/// portal calls, with matching selectors.
pub fn check_descriptor(abi_json: &str) -> Result<JsonAbi, PortError> {
    let abi: JsonAbi = serde_json::from_str(abi_json)
        .map_err(|e| PortError::Validation(format!("invalid abi json: {e}")))?;

    require_function(&abi, "wave", IWavePortal::waveCall::SELECTOR)?;
    require_function(&abi, "getAllWaves", IWavePortal::getAllWavesCall::SELECTOR)?;
    require_function(&abi, "getTotalWaves", IWavePortal::getTotalWavesCall::SELECTOR)?;

    let events = abi
        .event("NewWave")
        .ok_or_else(|| PortError::Validation("event not found: NewWave".to_owned()))?;
    if !events
        .iter()
        .any(|e| e.selector() == IWavePortal::NewWave::SIGNATURE_HASH)
    {
        return Err(PortError::Validation(format!(
            "event signature not found: {}",
            IWavePortal::NewWave::SIGNATURE
        )));
    }
    Ok(abi)
}

fn require_function(abi: &JsonAbi, name: &str, selector: [u8; 4]) -> Result<(), PortError> {
    let candidates = abi
        .function(name)
        .ok_or_else(|| PortError::Validation(format!("method not found: {name}")))?;
    if candidates.iter().any(|f| f.selector().0 == selector) {
        return Ok(());
    }
    Err(PortError::Validation(format!(
        "method signature mismatch: {name}"
    )))
}

pub fn encode_wave(message: &str) -> Bytes {
    IWavePortal::waveCall {
        _message: message.to_owned(),
    }
    .abi_encode()
    .into()
}

pub fn encode_get_all_waves() -> Bytes {
    IWavePortal::getAllWavesCall {}.abi_encode().into()
}

pub fn encode_get_total_waves() -> Bytes {
    IWavePortal::getTotalWavesCall {}.abi_encode().into()
}

pub fn decode_all_waves(data: &[u8]) -> Result<Vec<RawWave>, PortError> {
    let decoded = IWavePortal::getAllWavesCall::abi_decode_returns(data, true)
        .map_err(|e| PortError::Validation(format!("getAllWaves decode failed: {e}")))?;
    decoded
        ._0
        .into_iter()
        .map(|w| Ok(RawWave::new(w.waver, timestamp_secs(w.timestamp)?, w.message)))
        .collect()
}

pub fn decode_total_waves(data: &[u8]) -> Result<u64, PortError> {
    let decoded = IWavePortal::getTotalWavesCall::abi_decode_returns(data, true)
        .map_err(|e| PortError::Validation(format!("getTotalWaves decode failed: {e}")))?;
    u64::try_from(decoded._0)
        .map_err(|e| PortError::Validation(format!("wave count out of range: {e}")))
}

/// topic0 of `NewWave(address,uint256,string)`.
pub fn new_wave_topic() -> B256 {
    IWavePortal::NewWave::SIGNATURE_HASH
}

pub fn decode_new_wave_log(topics: &[B256], data: &[u8]) -> Result<RawWave, PortError> {
    let event = IWavePortal::NewWave::decode_raw_log(topics.iter().copied(), data, true)
        .map_err(|e| PortError::Validation(format!("NewWave decode failed: {e}")))?;
    Ok(RawWave::new(
        event.from,
        timestamp_secs(event.timestamp)?,
        event.message,
    ))
}

fn timestamp_secs(value: U256) -> Result<u64, PortError> {
    u64::try_from(value).map_err(|e| PortError::Validation(format!("timestamp out of range: {e}")))
}
