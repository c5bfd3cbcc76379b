use crate::models::epoch_timestamp;
use crate::models::leaderboard_snapshots::{insert_bulk, LeaderboardSnapshot, NewLeaderboardSnapshot};
use crate::models::users::User;
use crate::PredictionError;
use diesel::SqliteConnection;
use itertools::Itertools;
use log::info;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    /// 1-based position; tied totals still get distinct ranks
    pub rank: i32,
    pub user_id: String,
    pub display_name: String,
    pub total_points: i32,
}

/// Every user by total points, highest first. Equal totals keep the display-name order
/// [User::all] returns.
pub fn leaderboard(conn: &mut SqliteConnection) -> Result<Vec<LeaderboardRow>, PredictionError> {
    Ok(User::all(conn)?
        .into_iter()
        .sorted_by_key(|u| -u.total_points())
        .enumerate()
        .map(|(i, u)| LeaderboardRow {
            rank: i as i32 + 1,
            total_points: u.total_points(),
            user_id: u.id,
            display_name: u.display_name,
        })
        .collect())
}

pub fn take_snapshot(
    stage_id: Option<i32>,
    conn: &mut SqliteConnection,
) -> Result<usize, PredictionError> {
    take_snapshot_at(stage_id, epoch_timestamp(), conn)
}

/// Persists the current leaderboard as one snapshot stamped `taken_at`.
pub fn take_snapshot_at(
    stage_id: Option<i32>,
    taken_at: i64,
    conn: &mut SqliteConnection,
) -> Result<usize, PredictionError> {
    conn.immediate_transaction(|c| {
        let rows = leaderboard(c)?
            .into_iter()
            .map(|r| NewLeaderboardSnapshot {
                taken_at,
                stage_id,
                user_id: r.user_id,
                rank: r.rank,
                total_points: r.total_points,
            })
            .collect::<Vec<_>>();
        let n = if rows.is_empty() {
            0
        } else {
            insert_bulk(&rows, c)?
        };
        info!("Saved leaderboard snapshot of {n} users at {taken_at}");
        Ok(n)
    })
}

pub fn latest_snapshot(conn: &mut SqliteConnection) -> Result<Vec<LeaderboardSnapshot>, PredictionError> {
    Ok(LeaderboardSnapshot::latest(conn)?)
}

pub fn clear_snapshots(conn: &mut SqliteConnection) -> Result<usize, PredictionError> {
    let n = LeaderboardSnapshot::clear_all(conn)?;
    info!("Cleared {n} leaderboard snapshot rows");
    Ok(n)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardMovement {
    pub row: LeaderboardRow,
    pub previous_rank: Option<i32>,
}

impl LeaderboardMovement {
    /// positive when the user climbed since the snapshot; None for users it didn't include
    pub fn places_moved(&self) -> Option<i32> {
        self.previous_rank.map(|prev| prev - self.row.rank)
    }
}

/// the current leaderboard compared against [latest_snapshot]
pub fn leaderboard_with_movement(
    conn: &mut SqliteConnection,
) -> Result<Vec<LeaderboardMovement>, PredictionError> {
    let previous: HashMap<String, i32> = latest_snapshot(conn)?
        .into_iter()
        .map(|s| (s.user_id, s.rank))
        .collect();
    Ok(leaderboard(conn)?
        .into_iter()
        .map(|row| LeaderboardMovement {
            previous_rank: previous.get(&row.user_id).copied(),
            row,
        })
        .collect())
}
