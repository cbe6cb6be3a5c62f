//! UI helper components

use alloy::primitives::{Address, B256};
use eframe::egui;

pub const ACCENT: egui::Color32 = egui::Color32::from_rgb(0, 212, 170);

/// Open URL in the system browser
pub fn open_url_new_tab(url: &str) {
    if let Err(e) = open::that(url) {
        tracing::warn!(%url, error = %e, "failed to open browser");
    }
}

pub fn copy_to_clipboard(text: &str) {
    if let Ok(mut clipboard) = arboard::Clipboard::new() {
        let _ = clipboard.set_text(text);
    }
}

/// `0x1234…abcd`
pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

/// Render an address as a link to the block explorer, with a copy button
pub fn address_link(ui: &mut egui::Ui, address: &Address, explorer_url: &str) -> egui::Response {
    ui.horizontal(|ui| {
        let response = ui
            .link(
                egui::RichText::new(short_address(address))
                    .monospace()
                    .color(ui.visuals().hyperlink_color),
            )
            .on_hover_text(format!("{address}\nOpen in block explorer"));
        if response.clicked() {
            open_url_new_tab(explorer_url);
        }
        if ui
            .small_button("📋")
            .on_hover_text("Copy to clipboard")
            .clicked()
        {
            copy_to_clipboard(&address.to_string());
        }
        response
    })
    .inner
}

pub fn tx_link(ui: &mut egui::Ui, tx_hash: &B256, explorer_url: &str) {
    let full = tx_hash.to_string();
    let label = format!("{}…{}", &full[..10], &full[full.len() - 8..]);
    if ui
        .link(egui::RichText::new(label).monospace())
        .on_hover_text("Open transaction in block explorer")
        .clicked()
    {
        open_url_new_tab(explorer_url);
    }
}

/// Seconds since the epoch as a UTC date
pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("{secs} (out of range)"))
}

/// Styled heading with accent color
pub fn styled_heading(ui: &mut egui::Ui, text: &str) {
    ui.heading(egui::RichText::new(text).color(ACCENT));
}

/// Section header with separator
pub fn section_header(ui: &mut egui::Ui, text: &str) {
    ui.add_space(10.0);
    ui.label(egui::RichText::new(text).strong().size(14.0));
    ui.separator();
}

pub fn loading_spinner(ui: &mut egui::Ui, label: &str) {
    ui.horizontal(|ui| {
        ui.spinner();
        ui.label(label);
    });
}

pub fn error_message(ui: &mut egui::Ui, message: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new("❌").size(16.0));
        ui.label(egui::RichText::new(message).color(egui::Color32::from_rgb(220, 80, 80)));
    });
}

pub fn success_message(ui: &mut egui::Ui, message: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new("✅").size(16.0));
        ui.label(egui::RichText::new(message).color(egui::Color32::from_rgb(80, 200, 120)));
    });
}

/// Primary action button - teal/accent colored, prominent
pub fn primary_button_enabled(ui: &mut egui::Ui, text: &str, enabled: bool) -> egui::Response {
    let btn = egui::Button::new(egui::RichText::new(text).size(14.0).color(egui::Color32::WHITE))
        .min_size(egui::vec2(130.0, 34.0))
        .fill(egui::Color32::from_rgb(0, 180, 150));
    ui.add_enabled(enabled, btn)
}

/// Render content in a subtle card/frame
pub fn card(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(ui.visuals().faint_bg_color)
        .rounding(6.0)
        .inner_margin(12.0)
        .show(ui, add_contents);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_address_keeps_prefix_and_suffix() {
        let address = Address::repeat_byte(0xab);
        let short = short_address(&address);
        assert!(short.starts_with("0x"));
        assert!(short.ends_with(&address.to_string()[38..]));
        assert_eq!(short.chars().count(), 11);
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn unrepresentable_timestamp_is_shown_raw() {
        assert!(format_timestamp(u64::MAX).contains("out of range"));
    }
}
