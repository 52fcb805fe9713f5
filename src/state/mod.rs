pub mod prefs;
pub mod series_store;

pub use prefs::{Favorites, MemoryPrefs, PrefStore};
pub use series_store::{MemoryStore, TimeSeriesStore};
