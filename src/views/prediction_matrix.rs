use crate::models::fixtures::{Fixture, FixtureFilter, FixtureStatus};
use crate::models::predictions::Prediction;
use crate::models::users::User;
use crate::scoring::{CORRECT_OUTCOME_POINTS, EXACT_SCORE_POINTS};
use crate::PredictionError;
use diesel::SqliteConnection;
use serde::Serialize;
use std::collections::HashMap;

/// how a cell should be shaded; derived from points alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellBand {
    Exact,
    Outcome,
    Wrong,
    /// predicted, not scored yet
    Pending,
    /// no prediction
    Absent,
}

impl CellBand {
    pub fn for_prediction(prediction: Option<&Prediction>) -> Self {
        match prediction.map(|p| p.points_earned()) {
            None => Self::Absent,
            Some(None) => Self::Pending,
            Some(Some(p)) if p >= EXACT_SCORE_POINTS => Self::Exact,
            Some(Some(p)) if p >= CORRECT_OUTCOME_POINTS => Self::Outcome,
            Some(Some(_)) => Self::Wrong,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MatrixFilter {
    pub stage_id: Option<i32>,
    pub finished_only: bool,
}

pub struct MatrixCell<'a> {
    pub prediction: Option<&'a Prediction>,
    pub band: CellBand,
}

/// Every selected fixture against every user.
pub struct PredictionMatrix {
    /// kickoff order
    pub fixtures: Vec<Fixture>,
    /// display name order
    pub users: Vec<User>,
    cells: HashMap<(i32, String), Prediction>,
}

impl PredictionMatrix {
    pub fn build(filter: &MatrixFilter, conn: &mut SqliteConnection) -> Result<Self, PredictionError> {
        let fixtures = Fixture::list(
            &FixtureFilter {
                stage_id: filter.stage_id,
                status: filter.finished_only.then_some(FixtureStatus::Finished),
            },
            conn,
        )?;
        let users = User::all(conn)?;
        let ids = fixtures.iter().map(|f| f.id).collect::<Vec<_>>();
        let cells = Prediction::for_fixtures(&ids, conn)?
            .into_iter()
            .map(|p| ((p.fixture_id, p.user_id.clone()), p))
            .collect();
        Ok(Self {
            fixtures,
            users,
            cells,
        })
    }

    pub fn cell(&self, fixture_id: i32, user_id: &str) -> MatrixCell<'_> {
        let prediction = self.cells.get(&(fixture_id, user_id.to_string()));
        MatrixCell {
            prediction,
            band: CellBand::for_prediction(prediction),
        }
    }

    /// one row per fixture, one cell per user in [PredictionMatrix::users] order
    pub fn rows(&self) -> impl Iterator<Item = (&Fixture, Vec<MatrixCell<'_>>)> + '_ {
        self.fixtures.iter().map(move |f| {
            let cells = self.users.iter().map(|u| self.cell(f.id, &u.id)).collect();
            (f, cells)
        })
    }
}
