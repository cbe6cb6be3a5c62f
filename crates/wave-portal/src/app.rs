//! Main application state and update loop

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::Address;
use eframe::egui;

use wave_portal_adapters::{Eip1193Adapter, PortalConfig, WaveContractAdapter};
use wave_portal_core::{
    ErrorKind, Notice, PortalError, PortalSnapshot, WavePortal, WaveReceipt, WaveRecord,
};

use crate::background::BackgroundRuntime;
use crate::ui;

type Portal = WavePortal<Eip1193Adapter, WaveContractAdapter>;

/// Result of a background portal call
enum ActionResult {
    Mounted(Result<Option<Address>, PortalError>),
    Connected(Result<Address, PortalError>),
    Refreshed(Result<usize, PortalError>),
    Waved(Result<WaveReceipt, PortalError>),
}

/// Last outcome shown under the wave form
enum Status {
    Info(String),
    Error(String),
}

pub struct App {
    portal: Arc<Portal>,
    config: PortalConfig,
    runtime: BackgroundRuntime,
    /// Async result receiver
    action_result: Arc<Mutex<Option<ActionResult>>>,
    /// Label of the background call in progress
    busy: Option<&'static str>,
    snapshot: PortalSnapshot,
    draft: String,
    status: Option<Status>,
}

impl App {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: PortalConfig,
        runtime: BackgroundRuntime,
    ) -> Self {
        let portal = WavePortal::new(
            Eip1193Adapter::with_config(config.clone()),
            WaveContractAdapter::with_config(config.clone()),
            config.portal_options(),
        );
        let mut app = Self {
            portal: Arc::new(portal),
            config,
            runtime,
            action_result: Arc::new(Mutex::new(None)),
            busy: None,
            snapshot: PortalSnapshot::default(),
            draft: String::new(),
            status: None,
        };
        app.spawn("Checking wallet…", None, |portal| {
            ActionResult::Mounted(portal.mount())
        });
        app
    }

    /// Run a blocking portal call off the UI thread.
    fn spawn<F>(&mut self, label: &'static str, ctx: Option<&egui::Context>, call: F)
    where
        F: FnOnce(&Portal) -> ActionResult + Send + 'static,
    {
        if self.busy.is_some() {
            return;
        }
        self.busy = Some(label);
        let portal = Arc::clone(&self.portal);
        let result = Arc::clone(&self.action_result);
        let ctx = ctx.cloned();
        self.runtime.spawn_blocking(move || {
            let outcome = call(&portal);
            if let Ok(mut guard) = result.lock() {
                *guard = Some(outcome);
            }
            if let Some(ctx) = ctx {
                ctx.request_repaint();
            }
        });
    }

    fn check_action_result(&mut self) {
        let result = match self.action_result.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let Some(result) = result else {
            return;
        };
        self.busy = None;

        match result {
            ActionResult::Mounted(Ok(_)) => {}
            // Absence is shown through the connect button, not as an error.
            ActionResult::Mounted(Err(e)) if e.kind() == ErrorKind::ProviderAbsent => {}
            ActionResult::Mounted(Err(e)) => self.status = Some(Status::Error(e.to_string())),
            ActionResult::Connected(Ok(account)) => {
                let short = ui::short_address(&account);
                self.status = Some(Status::Info(format!("Connected {short}")));
            }
            ActionResult::Connected(Err(e)) => match e.kind() {
                ErrorKind::ProviderAbsent => {}
                ErrorKind::PermissionDenied => {
                    self.status = Some(Status::Error("Wallet connection was declined".to_owned()));
                }
                _ => self.status = Some(Status::Error(e.to_string())),
            },
            ActionResult::Refreshed(Ok(count)) => {
                tracing::debug!(count, "refreshed from ui");
            }
            ActionResult::Refreshed(Err(e)) => self.status = Some(Status::Error(e.to_string())),
            ActionResult::Waved(Ok(receipt)) => {
                let block = receipt
                    .block_number
                    .map(|b| format!(" in block {b}"))
                    .unwrap_or_default();
                self.status = Some(Status::Info(format!("Wave confirmed{block}")));
            }
            ActionResult::Waved(Err(e)) => {
                self.status = Some(Status::Error(format!("Wave failed: {e}")));
            }
        }
    }

    fn refresh_snapshot(&mut self) {
        match self.portal.snapshot() {
            Ok(snapshot) => {
                self.draft.clone_from(&snapshot.draft);
                self.snapshot = snapshot;
            }
            Err(e) => tracing::warn!(error = %e, "snapshot unavailable"),
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        self.check_action_result();
        self.refresh_snapshot();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.heading(egui::RichText::new("👋 Wave Portal").size(22.0).color(ui::ACCENT));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    self.render_account(ui, ctx);
                });
            });
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(10.0);
                self.render_wave_form(ui, ctx);
                self.render_waves(ui, ctx);
                ui.add_space(20.0);
            });
        });

        self.render_notice(ctx);

        // Live waves land on a background thread.
        if self.snapshot.subscribed || self.busy.is_some() {
            ctx.request_repaint_after(Duration::from_millis(self.config.poll_interval_ms));
        }
    }
}

impl App {
    fn render_account(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        match self.snapshot.account {
            Some(account) => {
                ui::address_link(ui, &account, &self.config.explorer_address_url(&account));
                ui.label("Connected:");
            }
            None => {
                let enabled = self.busy.is_none();
                if ui::primary_button_enabled(ui, "Connect Wallet", enabled).clicked() {
                    self.status = None;
                    self.spawn("Connecting…", Some(ctx), |portal| {
                        ActionResult::Connected(portal.request_connection())
                    });
                }
            }
        }
    }

    fn render_wave_form(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui::styled_heading(ui, "Hey there!");
        ui.label("Connect your wallet, write a message and wave at me.");
        ui.add_space(8.0);

        let connected = self.snapshot.account.is_some();
        let in_flight = self.snapshot.in_flight;

        ui::card(ui, |ui| {
            let edit = egui::TextEdit::multiline(&mut self.draft)
                .hint_text("Write your message here…")
                .desired_rows(3)
                .desired_width(f32::INFINITY);
            let response = ui.add_enabled(!in_flight, edit);
            if response.changed() {
                match self.portal.set_draft(self.draft.clone()) {
                    Ok(true) => {}
                    Ok(false) => self.draft.clone_from(&self.snapshot.draft),
                    Err(e) => tracing::warn!(error = %e, "draft update failed"),
                }
            }

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                let can_wave = connected && !in_flight && self.busy.is_none();
                if ui::primary_button_enabled(ui, "Wave at Me", can_wave).clicked() {
                    self.status = None;
                    self.spawn("Mining…", Some(ctx), |portal| {
                        ActionResult::Waved(portal.submit_draft())
                    });
                }
                let can_refresh = connected && self.busy.is_none();
                if ui.add_enabled(can_refresh, egui::Button::new("⟳ Refresh")).clicked() {
                    self.spawn("Loading waves…", Some(ctx), |portal| {
                        ActionResult::Refreshed(portal.fetch_all_waves())
                    });
                }
                if in_flight {
                    ui::loading_spinner(ui, "Waiting for confirmation…");
                } else if let Some(label) = self.busy {
                    ui::loading_spinner(ui, label);
                }
            });

            if let Some(tx_hash) = self.snapshot.last_tx_hash {
                ui.horizontal(|ui| {
                    ui.label("Last transaction:");
                    ui::tx_link(ui, &tx_hash, &self.config.explorer_tx_url(&tx_hash));
                });
            }
            match &self.status {
                Some(Status::Info(message)) => ui::success_message(ui, message),
                Some(Status::Error(message)) => ui::error_message(ui, message),
                None => {}
            }
        });
    }

    fn render_waves(&mut self, ui: &mut egui::Ui, _ctx: &egui::Context) {
        ui::section_header(ui, &format!("Waves ({})", self.snapshot.waves.len()));
        if self.snapshot.loading_waves {
            ui::loading_spinner(ui, "Loading waves…");
        }
        if self.snapshot.account.is_none() {
            ui.label(egui::RichText::new("Connect a wallet to see who waved.").weak());
            return;
        }
        if self.snapshot.waves.is_empty() && !self.snapshot.loading_waves {
            ui.label(egui::RichText::new("No waves yet. Be the first!").weak());
            return;
        }
        for wave in &self.snapshot.waves {
            self.render_wave(ui, wave);
            ui.add_space(6.0);
        }
    }

    fn render_wave(&self, ui: &mut egui::Ui, wave: &WaveRecord) {
        ui::card(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Address:").strong());
                let url = self.config.explorer_address_url(&wave.address);
                ui::address_link(ui, &wave.address, &url);
            });
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Time:").strong());
                ui.label(ui::format_timestamp(wave.timestamp.0));
            });
            ui.horizontal_wrapped(|ui| {
                ui.label(egui::RichText::new("Message:").strong());
                ui.label(wave.message.as_str());
            });
        });
    }

    fn render_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.snapshot.notice else {
            return;
        };
        let mut open = true;
        let mut dismissed = false;
        egui::Window::new("Wallet required")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .open(&mut open)
            .show(ctx, |ui| {
                ui.label(notice.message());
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if notice == Notice::InstallWallet && ui.button("Get MetaMask").clicked() {
                        ui::open_url_new_tab("https://metamask.io/download/");
                    }
                    if ui.button("Dismiss").clicked() {
                        dismissed = true;
                    }
                });
            });
        if !open || dismissed {
            if let Err(e) = self.portal.dismiss_notice() {
                tracing::warn!(error = %e, "failed to dismiss notice");
            }
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Err(e) = self.portal.unmount() {
            tracing::warn!(error = %e, "failed to detach live wave listener");
        }
        // `runtime` drops next and abandons any call still waiting on the node.
    }
}
