pub mod detail;
pub mod hydration;
pub mod scoreboard;
pub mod search;
pub mod timer;

pub use detail::{DetailTab, DetailView};
pub use hydration::Deferred;
pub use scoreboard::ScoreboardView;
pub use search::SearchView;
pub use timer::{AutoReset, Expired};
