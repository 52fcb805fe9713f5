use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::chart::{HoverPanel, Scene, Viewport};
use crate::config::ANIMATION_MS_PER_SAMPLE;
use crate::types::{MarketField, OddsSample};
use crate::view::hydration::Deferred;
use crate::view::timer::{AutoReset, Expired};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetailTab {
    #[default]
    Story,
    Odds,
    Stats,
}

impl DetailTab {
    pub const ALL: [DetailTab; 3] = [DetailTab::Story, DetailTab::Odds, DetailTab::Stats];

    pub fn title(self) -> &'static str {
        match self {
            DetailTab::Story => "Story",
            DetailTab::Odds => "Odds",
            DetailTab::Stats => "Stats",
        }
    }

    pub fn next(self) -> Self {
        match self {
            DetailTab::Story => DetailTab::Odds,
            DetailTab::Odds => DetailTab::Stats,
            DetailTab::Stats => DetailTab::Story,
        }
    }
}

/// Per-contest screen: chart for the selected market, hover cursor and a
/// playback animation that resets itself after one pass over the series.
pub struct DetailView {
    contest_id: String,
    series: Vec<OddsSample>,
    field: MarketField,
    tab: DetailTab,
    viewport: Viewport,
    scene: Scene,
    hovered: Option<usize>,
    playback: AutoReset,
    playing_since: Option<Instant>,
    /// Kick-off time in the viewer's zone, known only after mount.
    pub start_label: Deferred<String>,
}

impl DetailView {
    pub fn new(
        contest_id: impl Into<String>,
        series: Vec<OddsSample>,
        viewport: Viewport,
        expired_tx: mpsc::Sender<Expired>,
    ) -> Self {
        let field = MarketField::PRIMARY;
        let scene = Scene::build(&series, field, &viewport);
        Self {
            contest_id: contest_id.into(),
            series,
            field,
            tab: DetailTab::default(),
            viewport,
            scene,
            hovered: None,
            playback: AutoReset::new(expired_tx),
            playing_since: None,
            start_label: Deferred::Pending,
        }
    }

    pub fn contest_id(&self) -> &str {
        &self.contest_id
    }

    pub fn series(&self) -> &[OddsSample] {
        &self.series
    }

    pub fn field(&self) -> MarketField {
        self.field
    }

    pub fn tab(&self) -> DetailTab {
        self.tab
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn select_tab(&mut self, tab: DetailTab) {
        self.tab = tab;
    }

    pub fn next_tab(&mut self) {
        self.tab = self.tab.next();
    }

    pub fn select_field(&mut self, field: MarketField) {
        if field != self.field {
            self.field = field;
            self.rebuild();
        }
    }

    /// Replace the series, e.g. after a refetch. Hover is cleared since
    /// indices no longer refer to the same samples.
    pub fn set_series(&mut self, series: Vec<OddsSample>) {
        self.series = series;
        self.hovered = None;
        self.rebuild();
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        self.scene = Scene::build(&self.series, self.field, &self.viewport);
    }

    // -----------------------------------------------------------------------
    // Hover
    // -----------------------------------------------------------------------

    /// `x`/`y` in inner-plot coordinates.
    pub fn hover_at(&mut self, x: f64, y: f64) -> Option<usize> {
        self.hovered = self.scene.hit_test(x, y);
        self.hovered
    }

    pub fn hover_nearest(&mut self, x: f64) -> Option<usize> {
        self.hovered = self.scene.nearest_by_x(x);
        self.hovered
    }

    /// Move the cursor by `step` samples, clamping at the ends.
    pub fn hover_step(&mut self, step: isize) -> Option<usize> {
        let len = self.series.len();
        if len == 0 {
            return None;
        }
        let next = match self.hovered {
            Some(i) => i.saturating_add_signed(step).min(len - 1),
            None if step < 0 => len - 1,
            None => 0,
        };
        self.hovered = Some(next);
        self.hovered
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn hover_panel(&self) -> Option<HoverPanel> {
        self.hovered.and_then(|i| self.scene.hover(i))
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    pub fn playback_duration(&self) -> Duration {
        Duration::from_millis(ANIMATION_MS_PER_SAMPLE * self.series.len() as u64)
    }

    /// Start (or restart) playback. Requires a tokio runtime.
    pub fn play(&mut self, now: Instant) {
        self.playback.arm(self.playback_duration());
        self.playing_since = Some(now);
    }

    pub fn stop(&mut self) {
        self.playback.cancel();
        self.playing_since = None;
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    /// Handle a timer message. Stale messages from an earlier play are ignored.
    pub fn on_expired(&mut self, expired: Expired) -> bool {
        if self.playback.accept(expired) {
            self.playing_since = None;
            true
        } else {
            false
        }
    }

    /// Number of leading samples to draw. The whole series when idle.
    pub fn revealed(&self, now: Instant) -> usize {
        let len = self.series.len();
        match self.playing_since {
            Some(since) => {
                let elapsed = now.saturating_duration_since(since).as_millis() as u64;
                ((elapsed / ANIMATION_MS_PER_SAMPLE) as usize + 1).min(len)
            }
            None => len,
        }
    }
}
