use egui::Color32;

use crate::metric::{Metric, Reading};
use crate::settings::{ColorMode, Settings};

pub const PLACEHOLDER: &str = "N/A";

// ===================== Dynamic color bands =====================
/// A band covers `[from, next band's from)`; the last band is closed at 100.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorBand {
    pub from: f64,
    pub color: Color32,
}

pub const GREEN: Color32 = Color32::from_rgb(0, 200, 0);
pub const YELLOW: Color32 = Color32::from_rgb(230, 200, 0);
pub const RED: Color32 = Color32::from_rgb(220, 30, 30);

pub const DYNAMIC_BANDS: [ColorBand; 3] = [
    ColorBand { from: 0.0, color: GREEN },
    ColorBand { from: 50.0, color: YELLOW },
    ColorBand { from: 80.0, color: RED },
];

/// Colour of the band containing `percent`. Out-of-range values snap to the first or last band.
pub fn band_color(percent: f64) -> Color32 {
    DYNAMIC_BANDS
        .iter()
        .rev()
        .find(|b| percent >= b.from)
        .unwrap_or(&DYNAMIC_BANDS[0])
        .color
}

// ===================== Display state =====================
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayLine {
    pub label: &'static str,
    pub value_text: String,
    pub color: Color32,
}

impl DisplayLine {
    pub fn text(&self) -> String {
        format!("{}: {}", self.label, self.value_text)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayState {
    pub lines: Vec<DisplayLine>,
}

/// Maps readings to display lines. The only input besides the reading and
/// settings is the theme text colour captured by the shell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Presenter {
    system_color: Color32,
}

impl Presenter {
    pub fn new(system_color: Color32) -> Self {
        Self { system_color }
    }

    pub fn system_color(&self) -> Color32 {
        self.system_color
    }

    pub fn set_system_color(&mut self, color: Color32) {
        self.system_color = color;
    }

    pub fn present(&self, reading: &Reading, settings: &Settings) -> DisplayState {
        let lines = settings
            .enabled_metrics
            .iter()
            .map(|metric| self.line(metric, reading.percent(metric), settings.color_mode))
            .collect();
        DisplayState { lines }
    }

    fn line(&self, metric: Metric, percent: Option<f64>, mode: ColorMode) -> DisplayLine {
        match percent {
            Some(p) => DisplayLine {
                label: metric.label(),
                value_text: format!("{}%", p.round() as i64),
                color: match mode {
                    ColorMode::System => self.system_color,
                    ColorMode::Dynamic => band_color(p),
                },
            },
            None => DisplayLine { label: metric.label(), value_text: PLACEHOLDER.to_string(), color: self.system_color },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricSet;
    use std::time::Instant;

    const THEME: Color32 = Color32::from_rgb(140, 140, 140);

    fn reading(cpu: Option<f64>, ram: Option<f64>, gpu: Option<f64>) -> Reading {
        Reading { cpu_percent: cpu, ram_percent: ram, gpu_percent: gpu, gpu_temp_celsius: None, timestamp: Instant::now() }
    }

    fn dynamic(metrics: &[Metric]) -> Settings {
        Settings {
            enabled_metrics: MetricSet::from_ordered(metrics.iter().copied()),
            update_interval_seconds: 1,
            color_mode: ColorMode::Dynamic,
            ..Settings::default()
        }
    }

    #[test]
    fn every_percentage_has_exactly_one_band() {
        for tenth in 0..=1000 {
            let p = tenth as f64 / 10.0;
            let hits = DYNAMIC_BANDS
                .iter()
                .enumerate()
                .filter(|(i, b)| {
                    let upper = DYNAMIC_BANDS.get(i + 1).map(|n| n.from).unwrap_or(f64::INFINITY);
                    p >= b.from && p < upper
                })
                .count();
            assert_eq!(hits, 1, "p = {p}");
        }
    }

    #[test]
    fn boundaries_belong_to_upper_band() {
        assert_eq!(band_color(0.0), GREEN);
        assert_eq!(band_color(49.99), GREEN);
        assert_eq!(band_color(50.0), YELLOW);
        assert_eq!(band_color(79.99), YELLOW);
        assert_eq!(band_color(80.0), RED);
        assert_eq!(band_color(100.0), RED);
    }

    #[test]
    fn out_of_range_snaps_to_edge_bands() {
        assert_eq!(band_color(-3.0), GREEN);
        assert_eq!(band_color(140.0), RED);
    }

    #[test]
    fn cpu_ram_dynamic_scenario() {
        let p = Presenter::new(THEME);
        let out = p.present(&reading(Some(73.0), Some(40.0), None), &dynamic(&[Metric::Cpu, Metric::Ram]));
        let got: Vec<_> = out.lines.iter().map(|l| (l.label, l.value_text.as_str(), l.color)).collect();
        assert_eq!(got, vec![("CPU", "73%", YELLOW), ("RAM", "40%", GREEN)]);
    }

    #[test]
    fn absent_metrics_render_placeholder_in_theme_color() {
        let p = Presenter::new(THEME);
        let settings = dynamic(&[Metric::Cpu, Metric::Gpu, Metric::Ram]);
        let out = p.present(&reading(Some(91.0), None, None), &settings);
        assert_eq!(out.lines.len(), 3);
        assert_eq!(out.lines[0].value_text, "91%");
        assert_eq!(out.lines[0].color, RED);
        for line in &out.lines[1..] {
            assert_eq!(line.value_text, PLACEHOLDER);
            assert_eq!(line.color, THEME);
        }
    }

    #[test]
    fn line_count_follows_enabled_set() {
        let p = Presenter::new(THEME);
        let r = reading(None, None, None);
        for n in 0..=3 {
            let s = dynamic(&Metric::ALL[..n]);
            assert_eq!(p.present(&r, &s).lines.len(), n);
        }
    }

    #[test]
    fn system_mode_uses_theme_color() {
        let p = Presenter::new(THEME);
        let s = Settings { color_mode: ColorMode::System, ..Settings::default() };
        let out = p.present(&reading(Some(99.0), Some(10.0), Some(60.0)), &s);
        assert!(out.lines.iter().all(|l| l.color == THEME));
        assert_eq!(out.lines.iter().map(|l| l.text()).collect::<Vec<_>>(), ["CPU: 99%", "GPU: 60%", "RAM: 10%"]);
    }

    #[test]
    fn values_round_to_nearest_integer() {
        let p = Presenter::new(THEME);
        let out = p.present(&reading(Some(42.5), Some(0.4), None), &dynamic(&[Metric::Cpu, Metric::Ram]));
        assert_eq!(out.lines[0].value_text, "43%");
        assert_eq!(out.lines[1].value_text, "0%");
    }

    #[test]
    fn present_is_idempotent() {
        let p = Presenter::new(THEME);
        let r = reading(Some(12.0), None, Some(88.0));
        let s = dynamic(&[Metric::Gpu, Metric::Cpu, Metric::Ram]);
        assert_eq!(p.present(&r, &s), p.present(&r, &s));
    }
}
