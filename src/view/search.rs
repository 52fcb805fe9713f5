use std::time::{Duration, Instant};

use crate::config::SEARCH_DEBOUNCE_MS;
use crate::filter::{filter_contests, FilterSpec};
use crate::types::{Contest, MarketField, MovementBucket};

/// Search screen state. Selector changes apply at once; free-text edits are
/// debounced so a burst of keystrokes triggers one recompute.
#[derive(Debug)]
pub struct SearchView {
    spec: FilterSpec,
    debounce: Duration,
    edited_at: Option<Instant>,
    results: Vec<Contest>,
    dirty: bool,
}

impl Default for SearchView {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchView {
    pub fn new() -> Self {
        Self::with_debounce(Duration::from_millis(SEARCH_DEBOUNCE_MS))
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            spec: FilterSpec::all(),
            debounce,
            edited_at: None,
            results: Vec::new(),
            dirty: true,
        }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn results(&self) -> &[Contest] {
        &self.results
    }

    pub fn set_league(&mut self, league: Option<String>) {
        self.spec.league = league;
        self.dirty = true;
    }

    pub fn set_bet_type(&mut self, bet_type: Option<MarketField>) {
        self.spec.bet_type = bet_type;
        self.dirty = true;
    }

    pub fn set_movement(&mut self, movement: Option<MovementBucket>) {
        self.spec.movement = movement;
        self.dirty = true;
    }

    pub fn push_char(&mut self, c: char, now: Instant) {
        self.spec.search_text.push(c);
        self.edited_at = Some(now);
    }

    pub fn pop_char(&mut self, now: Instant) {
        if self.spec.search_text.pop().is_some() {
            self.edited_at = Some(now);
        }
    }

    pub fn set_search_text(&mut self, text: impl Into<String>, now: Instant) {
        self.spec.search_text = text.into();
        self.edited_at = Some(now);
    }

    /// True while a text edit is waiting out the debounce window.
    pub fn is_settling(&self, now: Instant) -> bool {
        self.edited_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.debounce)
    }

    /// Recompute results if a selector changed or the debounce window elapsed.
    /// Returns true when the result list was rebuilt.
    pub fn refresh<F>(&mut self, catalog: &[Contest], now: Instant, movement_of: F) -> bool
    where
        F: Fn(&Contest, MarketField) -> MovementBucket,
    {
        if self.is_settling(now) {
            return false;
        }
        if self.edited_at.take().is_some() {
            self.dirty = true;
        }
        if !self.dirty {
            return false;
        }
        self.results = filter_contests(catalog, &self.spec, movement_of);
        self.dirty = false;
        true
    }

    /// Catalog contents changed underneath; recompute on the next refresh.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::contest;

    fn catalog() -> Vec<Contest> {
        vec![
            contest("1", "Celtics", "Knicks", "NBA"),
            contest("2", "Lakers", "Warriors", "NBA"),
        ]
    }

    fn low(_: &Contest, _: MarketField) -> MovementBucket {
        MovementBucket::Low
    }

    #[test]
    fn first_refresh_shows_everything() {
        let mut view = SearchView::new();
        assert!(view.refresh(&catalog(), Instant::now(), low));
        assert_eq!(view.results().len(), 2);
        assert!(!view.refresh(&catalog(), Instant::now(), low), "nothing changed");
    }

    #[test]
    fn typing_is_debounced() {
        let mut view = SearchView::with_debounce(Duration::from_millis(250));
        let t0 = Instant::now();
        view.refresh(&catalog(), t0, low);

        for (i, c) in "lak".chars().enumerate() {
            view.push_char(c, t0 + Duration::from_millis(50 * i as u64));
        }
        let last_key = t0 + Duration::from_millis(100);
        assert!(!view.refresh(&catalog(), last_key + Duration::from_millis(200), low));
        assert_eq!(view.results().len(), 2);

        assert!(view.refresh(&catalog(), last_key + Duration::from_millis(250), low));
        let ids: Vec<_> = view.results().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[test]
    fn selector_changes_apply_immediately() {
        let mut view = SearchView::new();
        let now = Instant::now();
        view.refresh(&catalog(), now, low);

        view.set_movement(Some(MovementBucket::High));
        assert!(view.refresh(&catalog(), now, low));
        assert!(view.results().is_empty());

        view.set_movement(None);
        view.set_league(Some("nfl".into()));
        assert!(view.refresh(&catalog(), now, low));
        assert!(view.results().is_empty());
    }

    #[test]
    fn backspace_on_empty_text_is_not_an_edit() {
        let mut view = SearchView::new();
        let now = Instant::now();
        view.pop_char(now);
        assert!(!view.is_settling(now));
    }
}
