#![cfg_attr(windows, windows_subsystem = "windows")]

use resmon::app::{native_options, WidgetApp, TITLE};
use resmon::sampler::{detect_gpu, Sampler, SysinfoHost, GPU_INIT_TIMEOUT, GPU_QUERY_TIMEOUT};
use resmon::settings::SettingsStore;

// ===================== Entry =====================
fn main() -> eframe::Result<()> {
    resmon::init_logging();

    let store = SettingsStore::default_location().unwrap_or_else(|e| {
        log::warn!("{e}; keeping settings in the working directory");
        SettingsStore::new("resmon-settings.json")
    });
    let settings = store.load();
    log::info!("settings: {:?} (from {:?})", settings, store.path());

    let sampler = Sampler::new(SysinfoHost::new(), detect_gpu(GPU_INIT_TIMEOUT, GPU_QUERY_TIMEOUT));
    let options = native_options(&settings);
    eframe::run_native(
        TITLE,
        options,
        Box::new(move |cc| Ok(Box::new(WidgetApp::new(cc, settings, store, sampler)))),
    )
}
