use egui::Color32;
use std::time::Duration;

use crate::metric::Reading;
use crate::present::{DisplayState, Presenter};
use crate::sampler::{HostProbe, Sampler};
use crate::schedule::{Clock, Ticker};
use crate::settings::Settings;

/// Owns the sample → present cycle. Settings stay with the caller and are
/// passed in on every call.
pub struct Monitor<C: Clock, H: HostProbe> {
    clock: C,
    ticker: Ticker,
    sampler: Sampler<H>,
    presenter: Presenter,
    last_reading: Option<Reading>,
    display: DisplayState,
    ticks: u64,
}

impl<C: Clock, H: HostProbe> Monitor<C, H> {
    /// The first tick is due immediately.
    pub fn new(clock: C, sampler: Sampler<H>, presenter: Presenter) -> Self {
        let ticker = Ticker::starting_at(clock.now());
        Self { clock, ticker, sampler, presenter, last_reading: None, display: DisplayState::default(), ticks: 0 }
    }

    /// Runs a tick if one is due. Returns whether it did.
    pub fn pump(&mut self, settings: &Settings) -> bool {
        let now = self.clock.now();
        if !self.ticker.poll(now, settings.update_interval()) {
            return false;
        }
        self.run_tick(settings);
        true
    }

    /// Ticks right away and restarts the cadence from now.
    pub fn tick_now(&mut self, settings: &Settings) {
        if self.ticker.is_stopped() {
            return;
        }
        self.ticker.reschedule_from(self.clock.now(), settings.update_interval());
        self.run_tick(settings);
    }

    fn run_tick(&mut self, settings: &Settings) {
        let reading = self.sampler.sample(&settings.enabled_metrics, self.clock.now());
        self.display = self.presenter.present(&reading, settings);
        self.last_reading = Some(reading);
        self.ticks += 1;
        log::trace!("tick {}: {:?}", self.ticks, self.display);
    }

    /// Re-presents the last reading, e.g. after a colour mode change.
    pub fn refresh(&mut self, settings: &Settings) {
        if let Some(reading) = &self.last_reading {
            self.display = self.presenter.present(reading, settings);
        }
    }

    pub fn set_system_color(&mut self, color: Color32, settings: &Settings) {
        if self.presenter.system_color() != color {
            self.presenter.set_system_color(color);
            self.refresh(settings);
        }
    }

    /// No sampler call happens after this returns.
    pub fn stop(&mut self) {
        if !self.ticker.is_stopped() {
            log::info!("monitor stopped after {} ticks", self.ticks);
        }
        self.ticker.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.ticker.is_stopped()
    }

    pub fn until_next_tick(&self) -> Option<Duration> {
        self.ticker.until_next(self.clock.now())
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn last_reading(&self) -> Option<&Reading> {
        self.last_reading.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn now(&self) -> std::time::Instant {
        self.clock.now()
    }
}
