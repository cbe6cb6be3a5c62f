pub mod domain;
pub mod error;
pub mod ledger;
pub mod portal;
pub mod ports;
pub mod state_machine;
pub mod subscription;

pub use domain::{
    LogOrigin, PendingWave, RawWave, TimestampSecs, WaveKey, WaveReceipt, WaveRecord,
};
pub use error::{ErrorKind, PortalError};
pub use ledger::WaveLedger;
pub use portal::{Notice, PortalOptions, PortalSnapshot, WavePortal};
pub use ports::{PortError, SubscriptionId, WalletPort, WaveContractPort, WaveHandler};
pub use state_machine::{
    submission_transition, StateTransition, SubmissionAction, SubmissionStatus, TransitionError,
};
pub use subscription::WaveSubscription;
