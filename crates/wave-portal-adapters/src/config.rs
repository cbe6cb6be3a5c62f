use alloy::primitives::{Address, B256};
use thiserror::Error;

use wave_portal_core::{PortError, PortalOptions};

use crate::abi::{check_descriptor, WAVE_PORTAL_ABI};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeProfile {
    /// Missing endpoints fall back to the deterministic in-process runtime.
    #[default]
    Development,
    /// Missing endpoints disable the adapter.
    Production,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid contract interface descriptor: {0}")]
    Descriptor(#[from] PortError),
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub runtime_profile: RuntimeProfile,
    pub contract_address: Address,
    /// JSON ABI of the contract.
    pub contract_abi: String,
    /// Node endpoint for reads, receipts and logs.
    pub rpc_endpoint: Option<String>,
    /// EIP-1193 JSON-RPC endpoint that owns the user's accounts.
    pub wallet_endpoint: Option<String>,
    pub chain_id: u64,
    pub explorer_base_url: String,
    pub gas_limit: Option<u64>,
    pub poll_interval_ms: u64,
    pub confirmation_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        let chain_id = 31_337;
        Self {
            runtime_profile: RuntimeProfile::Development,
            contract_address: Address::new([
                0x5f, 0xbd, 0xb2, 0x31, 0x56, 0x78, 0xaf, 0xec, 0xb3, 0x67, 0xf0, 0x32, 0xd9,
                0x3f, 0x64, 0x2f, 0x64, 0x18, 0x0a, 0xa3,
            ]),
            contract_abi: WAVE_PORTAL_ABI.to_owned(),
            rpc_endpoint: None,
            wallet_endpoint: None,
            chain_id,
            explorer_base_url: default_explorer_for_chain(chain_id).to_owned(),
            gas_limit: Some(300_000),
            poll_interval_ms: 1_000,
            confirmation_timeout_ms: 120_000,
            request_timeout_ms: 15_000,
        }
    }
}

impl PortalConfig {
    /// Build from `WAVE_PORTAL_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(profile) = env_var("WAVE_PORTAL_PROFILE") {
            config.runtime_profile = match profile.to_ascii_lowercase().as_str() {
                "development" | "dev" => RuntimeProfile::Development,
                "production" | "prod" => RuntimeProfile::Production,
                other => {
                    return Err(ConfigError::Invalid {
                        key: "WAVE_PORTAL_PROFILE",
                        reason: format!("unknown profile {other}"),
                    })
                }
            };
        }
        if let Some(address) = env_var("WAVE_PORTAL_CONTRACT") {
            config.contract_address = address.parse().map_err(|e| ConfigError::Invalid {
                key: "WAVE_PORTAL_CONTRACT",
                reason: format!("{e}"),
            })?;
        }
        if let Some(path) = env_var("WAVE_PORTAL_ABI_PATH") {
            config.contract_abi =
                std::fs::read_to_string(&path).map_err(|source| ConfigError::Io { path, source })?;
        }
        config.rpc_endpoint = env_var("WAVE_PORTAL_RPC_URL");
        config.wallet_endpoint = env_var("WAVE_PORTAL_WALLET_URL");
        if let Some(chain_id) = env_var("WAVE_PORTAL_CHAIN_ID") {
            config.chain_id = parse_u64("WAVE_PORTAL_CHAIN_ID", &chain_id)?;
            config.explorer_base_url = default_explorer_for_chain(config.chain_id).to_owned();
        }
        if let Some(url) = env_var("WAVE_PORTAL_EXPLORER_URL") {
            config.explorer_base_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(gas) = env_var("WAVE_PORTAL_GAS_LIMIT") {
            config.gas_limit = match parse_u64("WAVE_PORTAL_GAS_LIMIT", &gas)? {
                0 => None,
                limit => Some(limit),
            };
        }
        if let Some(ms) = env_var("WAVE_PORTAL_POLL_MS") {
            config.poll_interval_ms = parse_u64("WAVE_PORTAL_POLL_MS", &ms)?;
        }
        if let Some(ms) = env_var("WAVE_PORTAL_CONFIRMATION_TIMEOUT_MS") {
            config.confirmation_timeout_ms =
                parse_u64("WAVE_PORTAL_CONFIRMATION_TIMEOUT_MS", &ms)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_descriptor(&self.contract_abi)?;
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "poll_interval_ms",
                reason: "must be positive".to_owned(),
            });
        }
        if self.rpc_endpoint.is_some() && self.wallet_endpoint.is_none() {
            return Err(ConfigError::Invalid {
                key: "wallet_endpoint",
                reason: "required when an rpc endpoint is configured".to_owned(),
            });
        }
        if self.strict_runtime_required() && self.rpc_endpoint.is_none() {
            return Err(ConfigError::Invalid {
                key: "rpc_endpoint",
                reason: "required in production runtime profile".to_owned(),
            });
        }
        Ok(())
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    pub fn portal_options(&self) -> PortalOptions {
        PortalOptions {
            gas_limit: self.gas_limit,
        }
    }

    pub fn explorer_address_url(&self, address: &Address) -> String {
        format!("{}/address/{}", self.explorer_base_url, address)
    }

    pub fn explorer_tx_url(&self, tx_hash: &B256) -> String {
        format!("{}/tx/{}", self.explorer_base_url, tx_hash)
    }
}

/// Block explorer for well-known chain ids; etherscan otherwise.
pub fn default_explorer_for_chain(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "https://etherscan.io",
        4 => "https://rinkeby.etherscan.io",
        10 => "https://optimistic.etherscan.io",
        56 => "https://bscscan.com",
        100 => "https://gnosisscan.io",
        137 => "https://polygonscan.com",
        8453 => "https://basescan.org",
        17000 => "https://holesky.etherscan.io",
        42161 => "https://arbiscan.io",
        84532 => "https://sepolia.basescan.org",
        11155111 => "https://sepolia.etherscan.io",
        _ => "https://etherscan.io",
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_u64(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("{raw}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PortalConfig::default().validate().expect("default config");
    }

    #[test]
    fn production_requires_rpc_endpoint() {
        let config = PortalConfig {
            runtime_profile: RuntimeProfile::Production,
            ..PortalConfig::default()
        };
        let err = config.validate().expect_err("must fail");
        assert!(err.to_string().contains("rpc_endpoint"));
    }

    #[test]
    fn rpc_endpoint_requires_wallet_endpoint() {
        let config = PortalConfig {
            rpc_endpoint: Some("http://127.0.0.1:8545".to_owned()),
            ..PortalConfig::default()
        };
        let err = config.validate().expect_err("must fail");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "wallet_endpoint",
                ..
            }
        ));

        let paired = PortalConfig {
            wallet_endpoint: Some("http://127.0.0.1:1248".to_owned()),
            ..config
        };
        paired.validate().expect("paired endpoints");
    }

    #[test]
    fn explorer_links_use_base_url() {
        let config = PortalConfig {
            explorer_base_url: default_explorer_for_chain(11155111).to_owned(),
            ..PortalConfig::default()
        };
        let address = Address::repeat_byte(0xab);
        assert_eq!(
            config.explorer_address_url(&address),
            format!("https://sepolia.etherscan.io/address/{address}")
        );
    }

    #[test]
    fn unknown_chain_falls_back_to_etherscan() {
        assert_eq!(default_explorer_for_chain(424242), "https://etherscan.io");
    }
}
