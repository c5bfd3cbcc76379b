use crate::schema::stages;
use crate::PredictionError;
use diesel::prelude::*;
use diesel::SqliteConnection;
use enum_iterator::{all, Sequence};
use serde::Serialize;

/// The phases of the competition. Stages are seeded by migration and looked up by slug.
#[derive(serde::Serialize, serde::Deserialize, Eq, PartialEq, Debug, Clone, Copy, Hash, Sequence)]
pub enum StageKind {
    Group,
    RoundOf32,
    RoundOf16,
    QuarterFinal,
    SemiFinal,
    ThirdPlace,
    Final,
}

impl StageKind {
    pub fn slug(&self) -> &'static str {
        match self {
            StageKind::Group => "group",
            StageKind::RoundOf32 => "round_of_32",
            StageKind::RoundOf16 => "round_of_16",
            StageKind::QuarterFinal => "quarter_final",
            StageKind::SemiFinal => "semi_final",
            StageKind::ThirdPlace => "third_place",
            StageKind::Final => "final",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        all::<StageKind>().find(|k| k.slug() == slug)
    }
}

#[derive(Queryable, Identifiable, Debug, Serialize, Clone)]
pub struct Stage {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub sort_order: i32,
    /// informational only, scoring doesn't apply it
    pub points_multiplier: f64,
}

impl Stage {
    pub fn kind(&self) -> Result<StageKind, PredictionError> {
        StageKind::from_slug(&self.slug).ok_or_else(|| {
            PredictionError::InvalidInput(format!("Unknown stage reference {}", self.slug))
        })
    }

    pub fn get_by_id(
        id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Self>, diesel::result::Error> {
        stages::table.find(id).first(conn).optional()
    }

    pub fn get_by_kind(
        kind: StageKind,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Self>, diesel::result::Error> {
        stages::table
            .filter(stages::slug.eq(kind.slug()))
            .first(conn)
            .optional()
    }

    pub fn all(conn: &mut SqliteConnection) -> Result<Vec<Self>, diesel::result::Error> {
        stages::table.order(stages::sort_order.asc()).load(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::{Stage, StageKind};
    use crate::test_utils::setup_db;
    use enum_iterator::all;

    #[test]
    fn test_slugs_round_trip() {
        for kind in all::<StageKind>() {
            assert_eq!(Some(kind), StageKind::from_slug(kind.slug()));
        }
        assert_eq!(None, StageKind::from_slug("Group"));
    }

    #[test]
    fn test_every_kind_is_seeded() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let stages = Stage::all(&mut db)?;
        assert_eq!(all::<StageKind>().count(), stages.len());
        for (stage, kind) in stages.iter().zip(all::<StageKind>()) {
            assert_eq!(kind, stage.kind()?);
        }
        Ok(())
    }
}
