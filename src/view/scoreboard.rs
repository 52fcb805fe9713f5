use crate::state::{Favorites, PrefStore};
use crate::types::{Contest, MarketField, OddsSample};

pub const SPORTS: [&str; 4] = ["NBA", "NFL", "MLB", "NHL"];

/// Scoreboard screen: one sport at a time, quoting one market per row.
pub struct ScoreboardView<S: PrefStore> {
    sport: usize,
    bet_type: MarketField,
    favorites: Favorites<S>,
    show_only_favorites: bool,
}

impl<S: PrefStore> ScoreboardView<S> {
    pub fn new(prefs: S) -> Self {
        Self {
            sport: 0,
            bet_type: MarketField::PRIMARY,
            favorites: Favorites::new(prefs),
            show_only_favorites: false,
        }
    }

    pub fn sport(&self) -> &'static str {
        SPORTS[self.sport]
    }

    /// Unknown sports are ignored.
    pub fn select_sport(&mut self, sport: &str) -> bool {
        match SPORTS.iter().position(|s| s.eq_ignore_ascii_case(sport)) {
            Some(i) => {
                self.sport = i;
                true
            }
            None => false,
        }
    }

    pub fn next_sport(&mut self) {
        self.sport = (self.sport + 1) % SPORTS.len();
    }

    pub fn bet_type(&self) -> MarketField {
        self.bet_type
    }

    pub fn select_bet_type(&mut self, field: MarketField) {
        self.bet_type = field;
    }

    pub fn cycle_bet_type(&mut self) {
        let i = MarketField::ALL.iter().position(|f| *f == self.bet_type).unwrap_or(0);
        self.bet_type = MarketField::ALL[(i + 1) % MarketField::ALL.len()];
    }

    pub fn favorites(&self) -> &Favorites<S> {
        &self.favorites
    }

    pub fn is_favorite(&self, contest_id: &str) -> bool {
        self.favorites.contains(contest_id)
    }

    pub fn toggle_favorite(&self, contest_id: &str) -> bool {
        self.favorites.toggle(contest_id)
    }

    pub fn show_only_favorites(&self) -> bool {
        self.show_only_favorites
    }

    pub fn toggle_show_only_favorites(&mut self) {
        self.show_only_favorites = !self.show_only_favorites;
    }

    /// Contests for the selected sport, narrowed to favorites when that toggle is on.
    pub fn visible<'a>(&self, catalog: &'a [Contest]) -> Vec<&'a Contest> {
        catalog
            .iter()
            .filter(|c| c.in_league(self.sport()))
            .filter(|c| !self.show_only_favorites || self.favorites.contains(&c.id))
            .collect()
    }

    /// Latest quote in the selected market, or a dash when there is none.
    pub fn quote(&self, latest: Option<&OddsSample>) -> String {
        latest
            .map(|s| self.bet_type.format_value(s.value(self.bet_type)))
            .unwrap_or_else(|| "-".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryPrefs;
    use crate::testutil::{contest, series_from};

    fn catalog() -> Vec<Contest> {
        vec![
            contest("1", "Celtics", "Knicks", "NBA"),
            contest("2", "Lakers", "Warriors", "NBA"),
            contest("3", "Chiefs", "Bills", "NFL"),
        ]
    }

    fn ids(contests: Vec<&Contest>) -> Vec<&str> {
        contests.into_iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn visible_follows_sport() {
        let mut view = ScoreboardView::new(MemoryPrefs::new());
        let catalog = catalog();
        assert_eq!(ids(view.visible(&catalog)), vec!["1", "2"]);

        view.next_sport();
        assert_eq!(view.sport(), "NFL");
        assert_eq!(ids(view.visible(&catalog)), vec!["3"]);

        assert!(!view.select_sport("cricket"));
        assert_eq!(view.sport(), "NFL");
        assert!(view.select_sport("nba"));
    }

    #[test]
    fn favorites_only_filter() {
        let mut view = ScoreboardView::new(MemoryPrefs::new());
        let catalog = catalog();
        assert!(view.toggle_favorite("2"));
        view.toggle_show_only_favorites();
        assert_eq!(ids(view.visible(&catalog)), vec!["2"]);

        assert!(!view.toggle_favorite("2"));
        assert!(view.visible(&catalog).is_empty());
    }

    #[test]
    fn quote_uses_selected_market() {
        let mut view = ScoreboardView::new(MemoryPrefs::new());
        let series = series_from(&[(10, -5.5)]);
        assert_eq!(view.quote(series.last()), "-5.5");

        view.cycle_bet_type();
        assert_eq!(view.bet_type(), MarketField::Moneyline);
        assert_eq!(view.quote(series.last()), "-180");

        view.select_bet_type(MarketField::Total);
        assert_eq!(view.quote(series.last()), "224.5");
        assert_eq!(view.quote(None), "-");
    }
}
