use crate::schema::leaderboard_snapshots;
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::SqliteConnection;
use serde::Serialize;

#[derive(Queryable, Identifiable, Debug, Serialize, Clone)]
pub struct LeaderboardSnapshot {
    pub id: i32,
    pub taken_at: i64,
    pub stage_id: Option<i32>,
    pub user_id: String,
    pub rank: i32,
    pub total_points: i32,
}

impl LeaderboardSnapshot {
    /// all rows of the most recent snapshot, by rank
    pub fn latest(conn: &mut SqliteConnection) -> Result<Vec<Self>, diesel::result::Error> {
        let newest: Option<i64> = leaderboard_snapshots::table
            .select(max(leaderboard_snapshots::taken_at))
            .first(conn)?;
        match newest {
            None => Ok(vec![]),
            Some(t) => leaderboard_snapshots::table
                .filter(leaderboard_snapshots::taken_at.eq(t))
                .order(leaderboard_snapshots::rank.asc())
                .load(conn),
        }
    }

    pub fn clear_all(conn: &mut SqliteConnection) -> Result<usize, diesel::result::Error> {
        diesel::delete(leaderboard_snapshots::table).execute(conn)
    }
}

#[derive(Insertable)]
#[diesel(table_name=leaderboard_snapshots)]
pub struct NewLeaderboardSnapshot {
    pub taken_at: i64,
    pub stage_id: Option<i32>,
    pub user_id: String,
    pub rank: i32,
    pub total_points: i32,
}

pub fn insert_bulk(
    rows: &Vec<NewLeaderboardSnapshot>,
    conn: &mut SqliteConnection,
) -> Result<usize, diesel::result::Error> {
    diesel::insert_into(leaderboard_snapshots::table)
        .values(rows)
        .execute(conn)
}
