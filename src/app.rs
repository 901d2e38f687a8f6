use eframe::egui;
use egui::{Align2, Color32, FontId, PointerButton, Pos2, Sense, ViewportCommand};
use std::time::Duration;

use crate::autostart;
use crate::metric::Metric;
use crate::monitor::Monitor;
use crate::present::{DisplayState, Presenter};
use crate::sampler::{Sampler, SysinfoHost};
use crate::schedule::SystemClock;
use crate::settings::{ColorMode, Settings, SettingsStore, INTERVAL_CHOICES};

pub const TITLE: &str = "Resource Monitor";
const CORNER_RADIUS: f32 = 15.0;
const IDLE_REPAINT: Duration = Duration::from_millis(500);
const ERROR_RED: Color32 = Color32::from_rgb(220, 30, 30);

// ===================== Viewport =====================
pub fn native_options(settings: &Settings) -> eframe::NativeOptions {
    let (x, y) = settings.window_position;
    eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(TITLE)
            .with_inner_size([settings.width as f32, settings.height as f32])
            .with_position([x as f32, y as f32])
            .with_decorations(false)
            .with_transparent(true)
            .with_always_on_top()
            .with_resizable(false)
            .with_taskbar(false),
        ..Default::default()
    }
}

fn alpha(opacity: u8) -> u8 {
    ((u16::from(opacity.min(100)) * 255 + 50) / 100) as u8
}

/// Validates and saves; returns the message to show when saving failed.
fn persist(store: &SettingsStore, settings: &mut Settings) -> Option<String> {
    settings.validate();
    match store.save(settings) {
        Ok(()) => None,
        Err(e) => {
            log::error!("{e}");
            Some(e.to_string())
        }
    }
}

/// Corner dot shown while the last save failed.
fn save_marker(rect: egui::Rect, font_size: f32) -> (Pos2, f32) {
    let radius = (font_size / 5.0).clamp(3.0, 8.0);
    let inset = radius + CORNER_RADIUS / 3.0;
    (Pos2::new(rect.right() - inset, rect.top() + inset), radius)
}

// ===================== App model =====================
pub struct WidgetApp {
    settings: Settings,
    store: SettingsStore,
    monitor: Monitor<SystemClock, SysinfoHost>,
    dark_mode: bool,
    save_error: Option<String>,
    autostart_error: Option<String>,
}

impl WidgetApp {
    pub fn new(cc: &eframe::CreationContext<'_>, mut settings: Settings, store: SettingsStore, sampler: Sampler<SysinfoHost>) -> Self {
        let visuals = cc.egui_ctx.style().visuals.clone();
        let presenter = Presenter::new(visuals.text_color());
        let monitor = Monitor::new(SystemClock, sampler, presenter);

        let mut autostart_error = None;
        let mut resync = false;
        match autostart::is_enabled() {
            Ok(registered) if registered != settings.autostart_enabled => {
                log::info!("autostart flag out of sync with registry, using registry value ({registered})");
                settings.autostart_enabled = registered;
                resync = true;
            }
            Ok(_) => {}
            Err(e) => {
                log::debug!("autostart state unknown: {e}");
                autostart_error = Some(e.to_string());
            }
        }

        let mut app = Self { settings, store, monitor, dark_mode: visuals.dark_mode, save_error: None, autostart_error };
        if resync {
            app.commit();
        }
        app
    }

    fn commit(&mut self) {
        self.save_error = persist(&self.store, &mut self.settings);
    }

    fn follow_theme(&mut self, ctx: &egui::Context) {
        let visuals = ctx.style().visuals.clone();
        if visuals.dark_mode != self.dark_mode {
            self.dark_mode = visuals.dark_mode;
            self.monitor.set_system_color(visuals.text_color(), &self.settings);
        }
    }

    fn track_position(&mut self, ctx: &egui::Context) {
        let (outer, dragging) = ctx.input(|i| (i.viewport().outer_rect, i.pointer.any_down()));
        let Some(outer) = outer else { return };
        if dragging {
            return;
        }
        let pos = (outer.min.x.round() as i32, outer.min.y.round() as i32);
        if pos != self.settings.window_position {
            self.settings.window_position = pos;
            self.commit();
        }
    }

    fn shutdown(&mut self, ctx: &egui::Context) {
        self.monitor.stop();
        self.track_position(ctx);
        self.commit();
    }

    fn draw_lines(&self, ui: &egui::Ui, rect: egui::Rect, state: &DisplayState) {
        let n = state.lines.len();
        if n == 0 {
            return;
        }
        let width_per_metric = rect.width() / n as f32;
        let font = FontId::proportional(self.settings.font_size as f32);
        let text_alpha = f32::from(self.settings.text_opacity) / 100.0;
        for (i, line) in state.lines.iter().enumerate() {
            let center = Pos2::new(rect.left() + width_per_metric * (i as f32 + 0.5), rect.center().y);
            ui.painter().text(center, Align2::CENTER_CENTER, line.text(), font.clone(), line.color.gamma_multiply(text_alpha));
        }
    }

    fn hover_details(&self, ui: &mut egui::Ui) {
        if let Some(e) = &self.save_error {
            ui.colored_label(ERROR_RED, format!("Settings not saved: {e}"));
        }
        let Some(reading) = self.monitor.last_reading() else {
            ui.label("Waiting for first sample");
            return;
        };
        if let Some(t) = reading.gpu_temp_celsius {
            ui.label(format!("GPU temperature: {t:.0}°C"));
        }
        let age = self.monitor.now().saturating_duration_since(reading.timestamp);
        ui.label(format!("Updated {}s ago", age.as_secs()));
    }

    fn context_menu(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;
        let mut resample = false;
        let mut resize = false;

        for metric in Metric::ALL {
            let label = if self.settings.enabled_metrics.contains(metric) { "Hide" } else { "Show" };
            if ui.button(format!("{label} {metric}")).clicked() {
                self.settings.enabled_metrics.toggle(metric);
                changed = true;
                resample = true;
                ui.close_menu();
            }
        }
        ui.separator();

        ui.menu_button("Update Interval", |ui| {
            for secs in INTERVAL_CHOICES {
                if ui.radio(self.settings.update_interval_seconds == secs, format!("{secs} sec")).clicked() {
                    self.settings.update_interval_seconds = secs;
                    changed = true;
                    ui.close_menu();
                }
            }
        });

        ui.menu_button("Font Size", |ui| {
            changed |= ui.add(egui::DragValue::new(&mut self.settings.font_size).clamp_range(8..=96).suffix(" px")).changed();
        });

        ui.menu_button("Size Settings", |ui| {
            ui.horizontal(|ui| {
                ui.label("Width");
                resize |= ui.add(egui::DragValue::new(&mut self.settings.width).clamp_range(1..=4000)).changed();
            });
            ui.horizontal(|ui| {
                ui.label("Height");
                resize |= ui.add(egui::DragValue::new(&mut self.settings.height).clamp_range(1..=2000)).changed();
            });
        });

        ui.menu_button("Color Mode", |ui| {
            for (mode, name) in [(ColorMode::System, "System"), (ColorMode::Dynamic, "Colored")] {
                if ui.radio_value(&mut self.settings.color_mode, mode, name).changed() {
                    changed = true;
                    ui.close_menu();
                }
            }
        });

        ui.menu_button("Transparency Settings", |ui| {
            ui.label("Background opacity");
            changed |= ui.add(egui::Slider::new(&mut self.settings.bg_opacity, 0..=100)).changed();
            ui.label("Text opacity");
            changed |= ui.add(egui::Slider::new(&mut self.settings.text_opacity, 0..=100)).changed();
        });
        ui.separator();

        let toggle = if self.settings.autostart_enabled { "Disable Autostart" } else { "Enable Autostart" };
        if ui.button(toggle).clicked() {
            let want = !self.settings.autostart_enabled;
            match autostart::set(want) {
                Ok(()) => {
                    self.settings.autostart_enabled = want;
                    self.autostart_error = None;
                    changed = true;
                }
                Err(e) => {
                    log::error!("autostart: {e}");
                    self.autostart_error = Some(e.to_string());
                }
            }
            ui.close_menu();
        }
        if let Some(e) = &self.autostart_error {
            ui.colored_label(ERROR_RED, format!("Autostart: {e}"));
        }
        if let Some(e) = &self.save_error {
            ui.colored_label(ERROR_RED, format!("Settings not saved: {e}"));
        }

        if ui.button("Quit").clicked() {
            ui.ctx().send_viewport_cmd(ViewportCommand::Close);
        }

        if resize {
            ui.ctx().send_viewport_cmd(ViewportCommand::InnerSize(egui::vec2(self.settings.width as f32, self.settings.height as f32)));
            changed = true;
        }
        if changed {
            self.commit();
            if resample {
                self.monitor.tick_now(&self.settings);
            } else {
                self.monitor.refresh(&self.settings);
            }
        }
    }
}

impl eframe::App for WidgetApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            self.shutdown(ctx);
            return;
        }
        self.follow_theme(ctx);
        self.monitor.pump(&self.settings);
        ctx.request_repaint_after(self.monitor.until_next_tick().unwrap_or(IDLE_REPAINT).min(IDLE_REPAINT));

        let bg = Color32::from_white_alpha(alpha(self.settings.bg_opacity));
        let panel = egui::Frame::none().fill(bg).rounding(CORNER_RADIUS);
        egui::CentralPanel::default().frame(panel).show(ctx, |ui| {
            let rect = ui.max_rect();
            let response = ui.interact(rect, ui.id().with("widget"), Sense::click_and_drag());
            if response.drag_started_by(PointerButton::Primary) {
                ctx.send_viewport_cmd(ViewportCommand::StartDrag);
            }
            let state = self.monitor.display().clone();
            self.draw_lines(ui, rect, &state);
            if self.save_error.is_some() {
                let (center, radius) = save_marker(rect, self.settings.font_size as f32);
                ui.painter().circle_filled(center, radius, ERROR_RED);
            }
            let response = response.on_hover_ui(|ui| self.hover_details(ui));
            response.context_menu(|ui| self.context_menu(ui));
        });

        self.track_position(ctx);
    }
}
