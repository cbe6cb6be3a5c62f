//! Wave Portal: a desktop client for the WavePortal contract

use eframe::egui;
use eyre::WrapErr;

use wave_portal_adapters::PortalConfig;

mod app;
mod background;
mod ui;

fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = PortalConfig::from_env().wrap_err("invalid WAVE_PORTAL_* configuration")?;
    tracing::info!(
        profile = ?config.runtime_profile,
        contract = %config.contract_address,
        chain_id = config.chain_id,
        rpc = config.rpc_endpoint.as_deref().unwrap_or("in-process"),
        "Starting Wave Portal"
    );

    let runtime = background::BackgroundRuntime::new(2)
        .wrap_err("failed to start background runtime")?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Wave Portal")
            .with_inner_size([720.0, 640.0])
            .with_min_inner_size([480.0, 360.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Wave Portal",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::App::new(cc, config, runtime)))),
    )
    .map_err(|e| eyre::eyre!("ui terminated: {e}"))
}
