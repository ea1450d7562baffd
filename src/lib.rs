//! Looks up a player's records on every track of the leaderboard service,
//! and derives statistics like ranks, percentiles and world record gaps.

pub mod api;
pub mod config;
pub mod constants;
pub mod controller;
pub mod event;
pub mod format;
pub mod identity;
pub mod stats;
pub mod tracks;
