use crate::models::fixtures::{Fixture, FixtureFilter, FixtureStatus};
use crate::models::teams::Team;
use crate::PredictionError;
use diesel::SqliteConnection;
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;

const WIN_POINTS: i32 = 3;
const DRAW_POINTS: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingRow {
    pub team_id: i32,
    pub team_name: String,
    pub played: i32,
    pub won: i32,
    pub drawn: i32,
    pub lost: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub points: i32,
}

impl StandingRow {
    fn new(team: &Team) -> Self {
        Self {
            team_id: team.id,
            team_name: team.name.clone(),
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
        }
    }

    pub fn goal_difference(&self) -> i32 {
        self.goals_for - self.goals_against
    }

    fn record(&mut self, scored: i32, conceded: i32) {
        self.played += 1;
        self.goals_for += scored;
        self.goals_against += conceded;
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => {
                self.won += 1;
                self.points += WIN_POINTS;
            }
            std::cmp::Ordering::Equal => {
                self.drawn += 1;
                self.points += DRAW_POINTS;
            }
            std::cmp::Ordering::Less => {
                self.lost += 1;
            }
        }
    }
}

/// The table for one group, replayed from every finished fixture between two of its teams.
///
/// Sorted by points, goal difference, then goals for. Anything still level stays in team id
/// order.
pub fn group_standings(
    group_label: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<StandingRow>, PredictionError> {
    let teams = Team::in_group(group_label, conn)?;
    let mut rows: HashMap<i32, StandingRow> =
        teams.iter().map(|t| (t.id, StandingRow::new(t))).collect();

    let finished = Fixture::list(
        &FixtureFilter {
            status: Some(FixtureStatus::Finished),
            ..Default::default()
        },
        conn,
    )?;
    for fixture in finished {
        let (Some(home), Some(away)) = (fixture.home_team_id, fixture.away_team_id) else {
            continue;
        };
        if !(rows.contains_key(&home) && rows.contains_key(&away)) {
            continue;
        }
        let Some((hs, aws)) = fixture.final_score() else {
            continue;
        };
        if let Some(r) = rows.get_mut(&home) {
            r.record(hs, aws);
        }
        if let Some(r) = rows.get_mut(&away) {
            r.record(aws, hs);
        }
    }

    Ok(rows
        .into_values()
        .sorted_by_cached_key(|r| (-r.points, -r.goal_difference(), -r.goals_for, r.team_id))
        .collect())
}
