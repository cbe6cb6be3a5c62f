use std::sync::{Arc, RwLock};

use crate::domain::RawWave;
use crate::ports::{PortError, SubscriptionId, WaveContractPort, WaveHandler};

/// A `NewWave` listener that is detached when cancelled or dropped.
///
/// The handler runs under a shared read guard and `cancel` takes the write
/// guard, so once `cancel` returns no handler is running and none will run
/// again, even if the contract keeps delivering events.
pub struct WaveSubscription<C: WaveContractPort> {
    contract: Arc<C>,
    id: Option<SubscriptionId>,
    active: Arc<RwLock<bool>>,
}

impl<C: WaveContractPort> WaveSubscription<C> {
    pub fn attach<F>(contract: Arc<C>, on_wave: F) -> Result<Self, PortError>
    where
        F: Fn(RawWave) + Send + Sync + 'static,
    {
        let active = Arc::new(RwLock::new(true));
        let gate = Arc::clone(&active);
        let handler: WaveHandler = Arc::new(move |wave| {
            let Ok(open) = gate.read() else {
                return;
            };
            if *open {
                on_wave(wave);
            }
        });
        let id = contract.subscribe_new_wave(handler)?;
        tracing::debug!(subscription = id.0, "attached NewWave listener");
        Ok(Self {
            contract,
            id: Some(id),
            active,
        })
    }

    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    pub fn cancel(&mut self) -> Result<(), PortError> {
        match self.active.write() {
            Ok(mut open) => *open = false,
            Err(poisoned) => *poisoned.into_inner() = false,
        }
        if let Some(id) = self.id.take() {
            self.contract.unsubscribe_new_wave(id)?;
            tracing::debug!(subscription = id.0, "detached NewWave listener");
        }
        Ok(())
    }
}

impl<C: WaveContractPort> Drop for WaveSubscription<C> {
    fn drop(&mut self) {
        if let Err(e) = self.cancel() {
            tracing::warn!(error = %e, "failed to detach NewWave listener");
        }
    }
}
