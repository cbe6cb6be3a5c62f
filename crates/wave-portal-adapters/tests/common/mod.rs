#![allow(dead_code)]

use alloy::primitives::Address;

use wave_portal_adapters::{Eip1193Adapter, PortalConfig, WaveContractAdapter};
use wave_portal_core::{RawWave, WavePortal};

pub type TestPortal = WavePortal<Eip1193Adapter, WaveContractAdapter>;

pub fn new_portal() -> TestPortal {
    let config = PortalConfig::default();
    WavePortal::new(
        Eip1193Adapter::with_config(config.clone()),
        WaveContractAdapter::with_config(config.clone()),
        config.portal_options(),
    )
}

/// Portal whose wallet already authorized `owner_address()`.
pub fn authorized_portal() -> TestPortal {
    let portal = new_portal();
    portal
        .wallet()
        .debug_authorize(vec![owner_address()])
        .expect("authorize owner");
    portal
}

pub fn portal_without_wallet() -> TestPortal {
    WavePortal::new(
        Eip1193Adapter::absent(),
        WaveContractAdapter::default(),
        PortalConfig::default().portal_options(),
    )
}

pub fn owner_address() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid owner address")
}

pub fn other_address() -> Address {
    "0x0000000000000000000000000000000000000abc"
        .parse()
        .expect("valid waver address")
}

pub fn seed_waves() -> Vec<RawWave> {
    vec![
        RawWave::new(other_address(), 100, "first"),
        RawWave::new(owner_address(), 300, "third"),
        RawWave::new(other_address(), 200, "second"),
    ]
}
