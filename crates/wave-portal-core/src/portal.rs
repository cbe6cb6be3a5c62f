use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::{Address, B256};

use crate::domain::{RawWave, WaveReceipt, WaveRecord};
use crate::error::PortalError;
use crate::ledger::WaveLedger;
use crate::ports::{PortError, WalletPort, WaveContractPort};
use crate::state_machine::{
    submission_transition, StateTransition, SubmissionAction, SubmissionStatus,
};
use crate::subscription::WaveSubscription;

#[derive(Debug, Clone, Default)]
pub struct PortalOptions {
    /// Gas ceiling attached to every wave transaction.
    pub gas_limit: Option<u64>,
}

/// Blocking user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    InstallWallet,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::InstallWallet => "Get MetaMask! No wallet provider was detected.",
        }
    }
}

/// Everything the presentation layer needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct PortalSnapshot {
    pub account: Option<Address>,
    /// Newest first.
    pub waves: Vec<WaveRecord>,
    pub submission: SubmissionStatus,
    pub in_flight: bool,
    pub draft: String,
    pub notice: Option<Notice>,
    pub loading_waves: bool,
    pub subscribed: bool,
    pub last_tx_hash: Option<B256>,
    /// A submission is waiting on the wallet or on confirmation.
    pub submitting: bool,
}

#[derive(Debug, Default)]
struct PortalState {
    account: Option<Address>,
    ledger: WaveLedger,
    submission: SubmissionStatus,
    transitions: Vec<StateTransition>,
    draft: String,
    notice: Option<Notice>,
    loading_waves: bool,
    last_tx_hash: Option<B256>,
    /// Held by exactly one `submit_wave` call from its first check until
    /// its submission is back to `Idle`.
    slot_claimed: bool,
}

impl PortalState {
    fn apply(&mut self, action: SubmissionAction) -> Result<(), PortalError> {
        let (next, transition) = submission_transition(self.submission, action)?;
        tracing::debug!(
            from = ?transition.from,
            to = ?transition.to,
            reason = transition.reason,
            "submission transition"
        );
        self.submission = next;
        self.transitions.push(transition);
        Ok(())
    }
}

/// The wave portal component: connection, ledger and submission workflow
/// over a wallet provider and the WavePortal contract.
pub struct WavePortal<W, C>
where
    W: WalletPort,
    C: WaveContractPort + Send + Sync + 'static,
{
    wallet: W,
    contract: Arc<C>,
    options: PortalOptions,
    state: Arc<Mutex<PortalState>>,
    subscription: Mutex<Option<WaveSubscription<C>>>,
}

impl<W, C> WavePortal<W, C>
where
    W: WalletPort,
    C: WaveContractPort + Send + Sync + 'static,
{
    pub fn new(wallet: W, contract: C, options: PortalOptions) -> Self {
        Self {
            wallet,
            contract: Arc::new(contract),
            options,
            state: Arc::new(Mutex::new(PortalState::default())),
            subscription: Mutex::new(None),
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    /// Install the live listener and pick up a prior authorization.
    pub fn mount(&self) -> Result<Option<Address>, PortalError> {
        if self.wallet.has_provider() {
            if let Err(e) = self.subscribe() {
                tracing::warn!(error = %e, "live wave subscription unavailable");
            }
        }
        self.check_existing_connection()
    }

    /// Detach the live listener. In-flight reads and writes are not cancelled.
    pub fn unmount(&self) -> Result<(), PortalError> {
        let subscription = self.lock_subscription()?.take();
        if let Some(mut subscription) = subscription {
            subscription.cancel()?;
        }
        Ok(())
    }

    fn subscribe(&self) -> Result<(), PortalError> {
        let mut slot = self.lock_subscription()?;
        if slot.is_some() {
            return Ok(());
        }
        let state = Arc::clone(&self.state);
        let subscription = WaveSubscription::attach(Arc::clone(&self.contract), move |raw| {
            on_live_wave(&state, raw);
        })?;
        *slot = Some(subscription);
        Ok(())
    }

    pub fn check_existing_connection(&self) -> Result<Option<Address>, PortalError> {
        if !self.wallet.has_provider() {
            tracing::debug!("no wallet provider; skipping authorized account lookup");
            return Err(PortalError::ProviderAbsent);
        }
        let accounts = self.wallet.authorized_accounts().map_err(|e| {
            tracing::warn!(error = %e, "authorized account lookup failed");
            PortalError::from(e)
        })?;
        let Some(account) = accounts.first().copied() else {
            tracing::debug!("no authorized account found");
            return Ok(None);
        };
        tracing::info!(%account, "found authorized account");
        self.adopt_account(account)?;
        Ok(Some(account))
    }

    pub fn request_connection(&self) -> Result<Address, PortalError> {
        if !self.wallet.has_provider() {
            tracing::warn!("connect requested without a wallet provider");
            self.lock_state()?.notice = Some(Notice::InstallWallet);
            return Err(PortalError::ProviderAbsent);
        }
        let accounts = self.wallet.request_accounts().map_err(|e| {
            tracing::warn!(error = %e, "account request failed");
            match e {
                PortError::Rejected(reason) => PortalError::PermissionDenied(reason),
                other => PortalError::Remote(other),
            }
        })?;
        let account = accounts.first().copied().ok_or_else(|| {
            tracing::warn!("wallet returned no accounts");
            PortalError::PermissionDenied("wallet returned no accounts".to_owned())
        })?;
        tracing::info!(%account, "connected");
        self.adopt_account(account)?;
        Ok(account)
    }

    fn adopt_account(&self, account: Address) -> Result<(), PortalError> {
        self.lock_state()?.account = Some(account);
        if let Err(e) = self.fetch_all_waves() {
            tracing::warn!(error = %e, "initial wave fetch failed");
        }
        Ok(())
    }

    /// Replace the local collection with the contract's full history.
    /// Returns the number of waves read.
    pub fn fetch_all_waves(&self) -> Result<usize, PortalError> {
        if !self.wallet.has_provider() {
            tracing::debug!("no wallet provider; skipping wave fetch");
            return Err(PortalError::ProviderAbsent);
        }
        self.lock_state()?.loading_waves = true;
        let fetched = self.contract.read_all_waves();
        let mut state = self.lock_state()?;
        state.loading_waves = false;
        let raw = fetched.map_err(|e| {
            tracing::warn!(error = %e, "wave fetch failed");
            PortalError::from(e)
        })?;
        let count = raw.len();
        state
            .ledger
            .replace_all(raw.into_iter().map(WaveRecord::from).collect());
        tracing::debug!(fetched = count, shown = state.ledger.len(), "waves refreshed");
        Ok(count)
    }

    pub fn total_waves(&self) -> Result<u64, PortalError> {
        if !self.wallet.has_provider() {
            return Err(PortalError::ProviderAbsent);
        }
        Ok(self.contract.total_waves()?)
    }

    /// Send a wave and block until it is confirmed.
    ///
    /// The in-flight flag is raised once the transaction hash comes back and
    /// is always lowered again, whether the wave confirms or fails.
    pub fn submit_wave(&self, message: &str) -> Result<WaveReceipt, PortalError> {
        if !self.wallet.has_provider() {
            tracing::debug!("no wallet provider; skipping wave");
            return Err(PortalError::ProviderAbsent);
        }
        let account = {
            let mut state = self.lock_state()?;
            if state.slot_claimed {
                return Err(PortalError::SubmissionInProgress);
            }
            submission_transition(state.submission, SubmissionAction::Send)?;
            let account = state.account.ok_or(PortalError::NotConnected)?;
            state.slot_claimed = true;
            account
        };

        let pending = match self
            .contract
            .send_wave(account, message, self.options.gas_limit)
        {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "wave send failed");
                self.settle_failure()?;
                return Err(e.into());
            }
        };
        {
            let mut state = self.lock_state()?;
            if let Err(e) = state.apply(SubmissionAction::Send) {
                state.slot_claimed = false;
                return Err(e);
            }
            state.last_tx_hash = Some(pending.tx_hash);
        }
        tracing::info!(tx = %pending.tx_hash, "wave pending");

        let receipt = match self.contract.wait_for_confirmation(&pending) {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(tx = %pending.tx_hash, error = %e, "wave confirmation failed");
                self.settle_failure()?;
                return Err(e.into());
            }
        };
        {
            let mut state = self.lock_state()?;
            let settled = state
                .apply(SubmissionAction::Confirm)
                .and_then(|()| state.apply(SubmissionAction::Reset));
            state.slot_claimed = false;
            settled?;
            state.draft.clear();
        }
        tracing::info!(tx = %receipt.tx_hash, block = ?receipt.block_number, "wave confirmed");

        if let Err(e) = self.fetch_all_waves() {
            tracing::warn!(error = %e, "post-confirmation wave fetch failed");
        }
        Ok(receipt)
    }

    pub fn submit_draft(&self) -> Result<WaveReceipt, PortalError> {
        let draft = self.lock_state()?.draft.clone();
        self.submit_wave(&draft)
    }

    /// Only called by the `submit_wave` holding the slot.
    fn settle_failure(&self) -> Result<(), PortalError> {
        let mut state = self.lock_state()?;
        let settled = state
            .apply(SubmissionAction::Fail)
            .and_then(|()| state.apply(SubmissionAction::Reset));
        state.slot_claimed = false;
        settled
    }

    /// Update the draft. Ignored while a wave is being sent or is in flight.
    pub fn set_draft(&self, text: impl Into<String>) -> Result<bool, PortalError> {
        let mut state = self.lock_state()?;
        if state.slot_claimed || state.submission.in_flight() {
            return Ok(false);
        }
        state.draft = text.into();
        Ok(true)
    }

    pub fn dismiss_notice(&self) -> Result<(), PortalError> {
        self.lock_state()?.notice = None;
        Ok(())
    }

    pub fn account(&self) -> Result<Option<Address>, PortalError> {
        Ok(self.lock_state()?.account)
    }

    pub fn transitions(&self) -> Result<Vec<StateTransition>, PortalError> {
        Ok(self.lock_state()?.transitions.clone())
    }

    pub fn snapshot(&self) -> Result<PortalSnapshot, PortalError> {
        let subscribed = self
            .lock_subscription()?
            .as_ref()
            .is_some_and(WaveSubscription::is_active);
        let state = self.lock_state()?;
        Ok(PortalSnapshot {
            account: state.account,
            waves: state.ledger.newest_first(),
            submission: state.submission,
            in_flight: state.submission.in_flight(),
            draft: state.draft.clone(),
            notice: state.notice,
            loading_waves: state.loading_waves,
            subscribed,
            last_tx_hash: state.last_tx_hash,
            submitting: state.slot_claimed,
        })
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, PortalState>, PortalError> {
        self.state
            .lock()
            .map_err(|e| PortalError::State(format!("portal state lock poisoned: {e}")))
    }

    fn lock_subscription(
        &self,
    ) -> Result<MutexGuard<'_, Option<WaveSubscription<C>>>, PortalError> {
        self.subscription
            .lock()
            .map_err(|e| PortalError::State(format!("subscription lock poisoned: {e}")))
    }
}

fn on_live_wave(state: &Mutex<PortalState>, raw: RawWave) {
    let record = WaveRecord::from(raw);
    let Ok(mut state) = state.lock() else {
        tracing::warn!("dropping live wave: portal state lock poisoned");
        return;
    };
    let sender = record.address;
    if state.ledger.append_live(record) {
        tracing::debug!(%sender, "live wave appended");
    } else {
        tracing::debug!(%sender, "live wave already known");
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::domain::PendingWave;
    use crate::error::ErrorKind;
    use crate::ports::{SubscriptionId, WaveHandler};

    struct NoWallet;

    impl WalletPort for NoWallet {
        fn has_provider(&self) -> bool {
            false
        }

        fn authorized_accounts(&self) -> Result<Vec<Address>, PortError> {
            Ok(Vec::new())
        }

        fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
            Ok(Vec::new())
        }
    }

    struct EmptyContract;

    impl WaveContractPort for EmptyContract {
        fn read_all_waves(&self) -> Result<Vec<RawWave>, PortError> {
            Ok(Vec::new())
        }

        fn total_waves(&self) -> Result<u64, PortError> {
            Ok(0)
        }

        fn send_wave(
            &self,
            _from: Address,
            _message: &str,
            _gas_limit: Option<u64>,
        ) -> Result<PendingWave, PortError> {
            Err(PortError::NotImplemented("send"))
        }

        fn wait_for_confirmation(&self, _pending: &PendingWave) -> Result<WaveReceipt, PortError> {
            Err(PortError::NotImplemented("confirm"))
        }

        fn subscribe_new_wave(&self, _handler: WaveHandler) -> Result<SubscriptionId, PortError> {
            Ok(SubscriptionId(1))
        }

        fn unsubscribe_new_wave(&self, _id: SubscriptionId) -> Result<(), PortError> {
            Ok(())
        }
    }

    #[test]
    fn poisoned_state_lock_surfaces_as_state_error() {
        let portal = WavePortal::new(NoWallet, EmptyContract, PortalOptions::default());
        let state = Arc::clone(&portal.state);
        let _ = thread::spawn(move || {
            let _guard = state.lock();
            panic!("poison portal state");
        })
        .join();

        let err = portal.snapshot().expect_err("poisoned");
        assert_eq!(err.kind(), ErrorKind::State);
        let err = portal.set_draft("gm").expect_err("poisoned");
        assert!(matches!(err, PortalError::State(_)));
    }
}
