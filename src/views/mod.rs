//! Read-only projections over fixtures, predictions and users. Nothing in here writes, except
//! the leaderboard snapshot helpers, which only touch the snapshot table.

pub mod group_standings;
pub mod leaderboard;
pub mod prediction_matrix;
