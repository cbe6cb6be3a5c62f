use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::Address;
use serde_json::Value;

use wave_portal_core::{PortError, WalletPort};

use crate::rpc::JsonRpcClient;
use crate::PortalConfig;

#[derive(Debug, Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Absent(String),
    Deterministic,
    Proxy(JsonRpcClient),
}

#[derive(Debug, Clone)]
struct ProviderState {
    /// Accounts the wallet would hand out on a permission prompt.
    available: Vec<Address>,
    /// Accounts already authorized for this origin.
    authorized: Vec<Address>,
    reject_requests: bool,
    prompt_count: u64,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            available: vec![Address::new([
                0x10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01,
            ])],
            authorized: Vec::new(),
            reject_requests: false,
            prompt_count: 0,
        }
    }
}

impl Default for Eip1193Adapter {
    fn default() -> Self {
        Self::with_config(PortalConfig::default())
    }
}

impl Eip1193Adapter {
    pub fn with_config(config: PortalConfig) -> Self {
        let mode = if let Some(ref url) = config.wallet_endpoint {
            let timeout = Duration::from_millis(config.request_timeout_ms);
            match JsonRpcClient::new(url.clone(), timeout) {
                Ok(client) => ProviderMode::Proxy(client),
                Err(e) => {
                    tracing::warn!(error = %e, "wallet endpoint unusable");
                    ProviderMode::Absent(format!("failed to initialize wallet endpoint: {e}"))
                }
            }
        } else if config.strict_runtime_required() {
            ProviderMode::Absent(
                "wallet endpoint not configured in production runtime profile".to_owned(),
            )
        } else if config.rpc_endpoint.is_some() {
            // in-process accounts cannot sign for a real node
            ProviderMode::Absent("wallet endpoint not configured for rpc endpoint".to_owned())
        } else {
            ProviderMode::Deterministic
        };

        Self {
            mode,
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    /// An adapter reporting that no wallet is installed.
    pub fn absent() -> Self {
        Self {
            mode: ProviderMode::Absent("no wallet provider installed".to_owned()),
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Absent(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProviderState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))
    }

    /// Pretend the user authorized these accounts in an earlier session.
    pub fn debug_authorize(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        let mut g = self.lock()?;
        g.available = accounts.clone();
        g.authorized = accounts;
        Ok(())
    }

    pub fn debug_set_available(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        self.lock()?.available = accounts;
        Ok(())
    }

    pub fn debug_reject_requests(&self, reject: bool) -> Result<(), PortError> {
        self.lock()?.reject_requests = reject;
        Ok(())
    }

    /// Number of permission prompts shown so far.
    pub fn prompt_count(&self) -> Result<u64, PortError> {
        Ok(self.lock()?.prompt_count)
    }
}

impl WalletPort for Eip1193Adapter {
    fn has_provider(&self) -> bool {
        !matches!(self.mode, ProviderMode::Absent(_))
    }

    fn authorized_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        if let ProviderMode::Proxy(client) = &self.mode {
            let result = client.call("eth_accounts", serde_json::json!([]))?;
            let accounts = parse_accounts("eth_accounts", &result)?;
            self.lock()?.authorized = accounts.clone();
            return Ok(accounts);
        }
        Ok(self.lock()?.authorized.clone())
    }

    fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        if let ProviderMode::Proxy(client) = &self.mode {
            let result = client.call("eth_requestAccounts", serde_json::json!([]))?;
            let accounts = parse_accounts("eth_requestAccounts", &result)?;
            let mut g = self.lock()?;
            g.prompt_count = g.prompt_count.saturating_add(1);
            g.authorized = accounts.clone();
            return Ok(accounts);
        }

        let mut g = self.lock()?;
        g.prompt_count = g.prompt_count.saturating_add(1);
        if g.reject_requests {
            return Err(PortError::Rejected("User rejected the request.".to_owned()));
        }
        g.authorized = g.available.clone();
        Ok(g.authorized.clone())
    }
}

fn parse_accounts(method: &str, result: &Value) -> Result<Vec<Address>, PortError> {
    let arr = result
        .as_array()
        .ok_or_else(|| PortError::Transport(format!("{method}: array expected")))?;
    let mut accounts = Vec::with_capacity(arr.len());
    for item in arr {
        let raw = item
            .as_str()
            .ok_or_else(|| PortError::Transport(format!("{method}: string expected")))?;
        let parsed: Address = raw
            .parse()
            .map_err(|e| PortError::Validation(format!("invalid account address: {e}")))?;
        accounts.push(parsed);
    }
    Ok(accounts)
}
