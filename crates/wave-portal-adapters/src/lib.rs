pub mod abi;
pub mod config;
pub mod contract;
pub mod eip1193;
pub mod rpc;

pub use abi::{check_descriptor, WAVE_PORTAL_ABI};
pub use config::{default_explorer_for_chain, ConfigError, PortalConfig, RuntimeProfile};
pub use contract::WaveContractAdapter;
pub use eip1193::Eip1193Adapter;
pub use rpc::JsonRpcClient;
