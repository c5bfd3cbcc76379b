//! The stage completion gate: new predictions for one designated stage are only accepted
//! until that stage's first fixture kicks off.

use crate::models::fixtures::Fixture;
use crate::models::predictions::Prediction;
use crate::models::stages::{Stage, StageKind};
use crate::schema::fixtures;
use crate::utils::timestamp_to_datetime;
use crate::PredictionError;
use chrono::{DateTime, Utc};
use diesel::dsl::{count_star, min};
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityGate {
    gated: StageKind,
}

/// progress through the gated stage, for banners
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateStatus {
    pub completed: i64,
    pub total: i64,
    /// kickoff of the earliest fixture in the stage; None if the stage has no fixtures yet
    pub deadline: Option<DateTime<Utc>>,
    /// whether new predictions for the stage are still accepted
    pub open: bool,
}

impl EligibilityGate {
    pub fn new(gated: StageKind) -> Self {
        Self { gated }
    }

    pub fn status(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        conn: &mut SqliteConnection,
    ) -> Result<GateStatus, PredictionError> {
        let stage = Stage::get_by_kind(self.gated, conn)?
            .ok_or_else(|| PredictionError::not_found("Stage", self.gated.slug()))?;
        let (total, first_kickoff): (i64, Option<i64>) = fixtures::table
            .filter(fixtures::stage_id.eq(stage.id))
            .select((count_star(), min(fixtures::scheduled_at)))
            .first(conn)?;
        let completed = Prediction::count_for_user_in_stage(user_id, stage.id, conn)?;
        let deadline = first_kickoff.map(timestamp_to_datetime);
        Ok(GateStatus {
            completed,
            total,
            deadline,
            open: deadline.map_or(true, |d| now < d),
        })
    }

    /// Ok if a new prediction for `fixture` may be accepted as far as the gate is concerned.
    /// Fixtures outside the gated stage always pass.
    pub fn check(
        &self,
        fixture: &Fixture,
        user_id: &str,
        now: DateTime<Utc>,
        conn: &mut SqliteConnection,
    ) -> Result<(), PredictionError> {
        if fixture.stage(conn)?.kind()? != self.gated {
            return Ok(());
        }
        let status = self.status(user_id, now, conn)?;
        if status.open {
            Ok(())
        } else {
            debug!(
                "Gate for {} denied {user_id} on fixture {} ({}/{})",
                self.gated.slug(),
                fixture.id,
                status.completed,
                status.total
            );
            Err(PredictionError::EligibilityDenied {
                completed: status.completed,
                total: status.total,
            })
        }
    }
}
