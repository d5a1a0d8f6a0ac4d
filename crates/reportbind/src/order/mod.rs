//! Ordering: persisted preferences, their JSON store, and the layout engine.

pub mod layout;
pub mod preferences;
pub mod store;

pub use layout::{find_member_order_index, sort_team_entries, TeamLayout};
pub use preferences::OrderPreferences;
pub use store::OrderStore;
