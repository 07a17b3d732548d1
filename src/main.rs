use std::sync::Arc;

use eframe::egui;
use prop_analytics::config::AppConfig;
use prop_analytics::service::HttpService;
use prop_analytics::storage::SlotStore;
use prop_analytics::ui::{self, AnalyticsApp};

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load();
    log::info!("using analytics service at {}", config.api_base_url);

    let service = match HttpService::new(&config.api_base_url, config.timeout()) {
        Ok(service) => service,
        Err(e) => {
            log::error!("cannot create HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let storage_path = config.storage_path();
    let store = SlotStore::open(&storage_path)
        .or_else(|e| {
            log::warn!(
                "cannot open {}: {}; recent queries will not persist",
                storage_path.display(),
                e
            );
            SlotStore::in_memory()
        });
    let store = match store {
        Ok(store) => store,
        Err(e) => {
            log::error!("cannot open client storage: {}", e);
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1440.0, 900.0])
            .with_min_inner_size([1100.0, 700.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Real Estate Analytics",
        options,
        Box::new(move |cc| {
            let mut fonts = egui::FontDefinitions::default();

            if let Ok(segoe_data) = std::fs::read("C:\\Windows\\Fonts\\segoeui.ttf") {
                fonts.font_data.insert(
                    "SegoeUI".to_owned(),
                    egui::FontData::from_owned(segoe_data).into(),
                );
                if let Some(family) = fonts.families.get_mut(&egui::FontFamily::Proportional) {
                    family.insert(0, "SegoeUI".to_owned());
                }
            }

            cc.egui_ctx.set_fonts(fonts);
            ui::set_custom_style(&cc.egui_ctx);
            Ok(Box::new(AnalyticsApp::new(config, Arc::new(service), store)))
        }),
    )
}
