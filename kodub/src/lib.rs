pub use api::*;
pub use client::*;
pub use error::*;

mod api;
mod client;
mod error;

/// The game version sent with every request.
///
/// The leaderboard service partitions its data by game version, so this has
/// to match the version of the game whose records should be looked up.
pub const DEFAULT_GAME_VERSION: &str = "0.5.1";
