//! Search filtering over a contest catalog. Conjunctive, stable, stateless.

use serde::{Deserialize, Serialize};

use crate::detector::MovementModel;
use crate::error::Result;
use crate::state::TimeSeriesStore;
use crate::types::{Contest, ContestQuery, MarketField, MovementBucket};

/// `None` on any selector means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub league: Option<String>,
    /// Market whose movement the `movement` selector is compared against.
    /// Does not exclude contests on its own: every contest quotes all markets.
    pub bet_type: Option<MarketField>,
    pub movement: Option<MovementBucket>,
    pub search_text: String,
}

impl FilterSpec {
    pub fn all() -> Self {
        Self::default()
    }

    /// Build from wire strings where `"all"` (any case) or empty means unconstrained.
    pub fn from_params(
        league: Option<&str>,
        bet_type: Option<&str>,
        movement: Option<&str>,
        search_text: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            league: selected(league).map(str::to_string),
            bet_type: selected(bet_type).map(str::parse::<MarketField>).transpose()?,
            movement: selected(movement).map(str::parse::<MovementBucket>).transpose()?,
            search_text: search_text.unwrap_or_default().to_string(),
        })
    }

    pub fn is_unconstrained(&self) -> bool {
        self.league.is_none() && self.movement.is_none() && self.search_text.trim().is_empty()
    }

    pub fn matches<F>(&self, contest: &Contest, movement_of: &F) -> bool
    where
        F: Fn(&Contest, MarketField) -> MovementBucket,
    {
        let league_ok = self
            .league
            .as_deref()
            .map_or(true, |l| contest.in_league(l));

        let movement_ok = self.movement.map_or(true, |wanted| {
            movement_of(contest, self.bet_type.unwrap_or(MarketField::PRIMARY)) == wanted
        });

        let needle = self.search_text.trim().to_lowercase();
        let search_ok = needle.is_empty()
            || contest.home.to_lowercase().contains(&needle)
            || contest.away.to_lowercase().contains(&needle);

        league_ok && movement_ok && search_ok
    }
}

fn selected(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
}

/// Contests satisfying every active predicate, in input order.
pub fn filter_contests<F>(contests: &[Contest], spec: &FilterSpec, movement_of: F) -> Vec<Contest>
where
    F: Fn(&Contest, MarketField) -> MovementBucket,
{
    contests
        .iter()
        .filter(|c| spec.matches(c, &movement_of))
        .cloned()
        .collect()
}

/// Filter the store's whole catalog, classifying movement from each contest's
/// current series.
pub fn search(store: &dyn TimeSeriesStore, model: &MovementModel, spec: &FilterSpec) -> Vec<Contest> {
    let catalog = store.list_contests(&ContestQuery::default());
    filter_contests(&catalog, spec, |contest, field| {
        let series = store.get_series(&contest.id, None).unwrap_or_default();
        model.classify(&series, field).bucket
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStore;
    use crate::testutil::{contest, series_from};

    fn catalog() -> Vec<Contest> {
        vec![
            contest("1", "Celtics", "Knicks", "NBA"),
            contest("2", "Lakers", "Warriors", "NBA"),
            contest("3", "Chiefs", "Bills", "NFL"),
        ]
    }

    fn movement(c: &Contest, field: MarketField) -> MovementBucket {
        match (c.id.as_str(), field) {
            ("1", MarketField::Spread) => MovementBucket::High,
            ("2", _) => MovementBucket::Medium,
            _ => MovementBucket::Low,
        }
    }

    fn ids(contests: &[Contest]) -> Vec<&str> {
        contests.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn search_text_matches_either_team_case_insensitively() {
        let spec = FilterSpec::from_params(Some("all"), Some("all"), Some("all"), Some("lak")).unwrap();
        let catalog = catalog();
        assert_eq!(ids(&filter_contests(&catalog[..2], &spec, movement)), vec!["2"]);

        let spec = FilterSpec { search_text: "  BILL ".into(), ..FilterSpec::all() };
        assert_eq!(ids(&filter_contests(&catalog, &spec, movement)), vec!["3"]);
    }

    #[test]
    fn unconstrained_spec_is_identity() {
        let spec = FilterSpec::from_params(Some("all"), Some("ALL"), Some("all"), Some("")).unwrap();
        assert!(spec.is_unconstrained());
        assert_eq!(filter_contests(&catalog(), &spec, movement), catalog());
    }

    #[test]
    fn filtering_is_idempotent() {
        let specs = [
            FilterSpec { league: Some("nba".into()), ..FilterSpec::all() },
            FilterSpec { movement: Some(MovementBucket::Low), ..FilterSpec::all() },
            FilterSpec { search_text: "s".into(), ..FilterSpec::all() },
        ];
        for spec in specs {
            let once = filter_contests(&catalog(), &spec, movement);
            let twice = filter_contests(&once, &spec, movement);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn predicates_are_conjunctive_and_order_preserving() {
        let spec = FilterSpec { league: Some("Nba".into()), ..FilterSpec::all() };
        assert_eq!(ids(&filter_contests(&catalog(), &spec, movement)), vec!["1", "2"]);

        let spec = FilterSpec {
            league: Some("nba".into()),
            movement: Some(MovementBucket::High),
            ..FilterSpec::all()
        };
        assert_eq!(ids(&filter_contests(&catalog(), &spec, movement)), vec!["1"]);
    }

    #[test]
    fn bet_type_selects_the_market_for_movement() {
        let spec = FilterSpec {
            bet_type: Some(MarketField::Total),
            movement: Some(MovementBucket::High),
            ..FilterSpec::all()
        };
        assert!(filter_contests(&catalog(), &spec, movement).is_empty());

        let spec = FilterSpec { bet_type: Some(MarketField::Total), ..FilterSpec::all() };
        assert_eq!(filter_contests(&catalog(), &spec, movement).len(), 3);
    }

    #[test]
    fn league_and_search_fold_case_alike() {
        let catalog = vec![
            contest("1", "Atlético", "Sevilla", "LIGA ÉLITE"),
            contest("2", "Celtics", "Knicks", "NBA"),
        ];
        let by_league = FilterSpec { league: Some("liga élite".into()), ..FilterSpec::all() };
        assert_eq!(ids(&filter_contests(&catalog, &by_league, movement)), vec!["1"]);

        let by_name = FilterSpec { search_text: "ATLÉTICO".into(), ..FilterSpec::all() };
        assert_eq!(ids(&filter_contests(&catalog, &by_name, movement)), vec!["1"]);
    }

    #[test]
    fn no_match_and_empty_catalog_are_valid() {
        let spec = FilterSpec { search_text: "zzz".into(), ..FilterSpec::all() };
        assert!(filter_contests(&catalog(), &spec, movement).is_empty());
        assert!(filter_contests(&[], &FilterSpec::all(), movement).is_empty());
    }

    #[test]
    fn bad_selector_values_are_rejected() {
        assert!(FilterSpec::from_params(None, Some("prop"), None, None).is_err());
        assert!(FilterSpec::from_params(None, None, Some("huge"), None).is_err());
    }

    #[test]
    fn search_uses_current_series_movement() {
        let store = MemoryStore::new();
        for c in catalog() {
            store.add_contest(c);
        }
        for s in series_from(&[(10, -5.5), (11, -5.0), (12, -6.0)]) {
            store.append_sample("1", s).unwrap();
        }
        let spec = FilterSpec { movement: Some(MovementBucket::High), ..FilterSpec::all() };
        let found = search(store.as_ref(), &MovementModel::default(), &spec);
        assert_eq!(ids(&found), vec!["1"]);

        // Contests without observations classify as low.
        let spec = FilterSpec { movement: Some(MovementBucket::Low), ..FilterSpec::all() };
        assert_eq!(ids(&search(store.as_ref(), &MovementModel::default(), &spec)), vec!["2", "3"]);
    }
}
