use std::sync::Arc;

use alloy::primitives::Address;
use thiserror::Error;

use crate::domain::{PendingWave, RawWave, WaveReceipt};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("transaction reverted: {0}")]
    Reverted(String),
}

/// Callback invoked for every `NewWave` notification.
pub type WaveHandler = Arc<dyn Fn(RawWave) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Wallet provider capabilities (EIP-1193 subset).
pub trait WalletPort {
    fn has_provider(&self) -> bool;
    /// Accounts already authorized for this origin. Never prompts.
    fn authorized_accounts(&self) -> Result<Vec<Address>, PortError>;
    /// Prompts the user to authorize an account; may be rejected.
    fn request_accounts(&self) -> Result<Vec<Address>, PortError>;
}

/// WavePortal contract capabilities.
pub trait WaveContractPort {
    fn read_all_waves(&self) -> Result<Vec<RawWave>, PortError>;
    fn total_waves(&self) -> Result<u64, PortError>;
    fn send_wave(
        &self,
        from: Address,
        message: &str,
        gas_limit: Option<u64>,
    ) -> Result<PendingWave, PortError>;
    /// Blocks until the transaction is mined. A reverted transaction is an error.
    fn wait_for_confirmation(&self, pending: &PendingWave) -> Result<WaveReceipt, PortError>;
    fn subscribe_new_wave(&self, handler: WaveHandler) -> Result<SubscriptionId, PortError>;
    fn unsubscribe_new_wave(&self, id: SubscriptionId) -> Result<(), PortError>;
}
