use bb8::RunError;
use diesel::result::DatabaseErrorKind;
use diesel::ConnectionError;
use thiserror::Error;

pub mod admin;
pub mod config;
pub mod db;
pub mod eligibility;
pub mod locking;
pub mod models;
pub mod results;
pub mod schema;
pub mod scoring;
pub mod submissions;
pub mod utils;
pub mod views;

#[cfg(test)]
mod test_utils;

/// Every way an engine operation can fail.
///
/// Everything except [PredictionError::ContractViolation] and [PredictionError::DatabaseError]
/// is an expected, recoverable condition that callers turn into a user-facing message.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Fixture {0} is not open for predictions")]
    FixtureNotOpen(i32),

    #[error("Prediction is locked")]
    Locked,

    #[error("Stage deadline has passed ({completed}/{total} predictions completed)")]
    EligibilityDenied { completed: i64, total: i64 },

    #[error("Fixture {0} has no final result yet")]
    NotReady(i32),

    #[error("{0} is not allowed to do that")]
    Unauthorized(String),

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Database error: {0}")]
    DatabaseError(diesel::result::Error),
}

impl PredictionError {
    pub fn not_found<S: ToString>(what: &'static str, id: S) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }

    /// false for failures that mean something is broken rather than that the request was bad
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::ContractViolation(_) | Self::DatabaseError(_))
    }
}

impl From<diesel::result::Error> for PredictionError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::Conflict(info.message().to_string())
            }
            other => Self::DatabaseError(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum PredictionLeagueError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("Connection error: {0}")]
    ConnectionError(#[from] ConnectionError),

    #[error("{0}")]
    Bb8Error(#[from] RunError<ConnectionError>),

    #[error("Error running migrations: {0}")]
    MigrationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    PredictionError(#[from] PredictionError),
}

#[cfg(test)]
mod tests {
    use super::PredictionError;
    use diesel::result::{DatabaseErrorKind, Error};

    #[test]
    fn test_broken_state_is_not_expected() {
        assert!(!PredictionError::ContractViolation("scored twice".to_string()).is_expected());
        assert!(!PredictionError::from(Error::NotFound).is_expected());
        assert!(!PredictionError::from(Error::RollbackTransaction).is_expected());
    }

    #[test]
    fn test_refusals_are_expected() {
        let refusals = [
            PredictionError::not_found("Fixture", 7),
            PredictionError::InvalidInput("score".to_string()),
            PredictionError::FixtureNotOpen(7),
            PredictionError::Locked,
            PredictionError::EligibilityDenied {
                completed: 1,
                total: 3,
            },
            PredictionError::NotReady(7),
            PredictionError::Unauthorized("mallory".to_string()),
            PredictionError::Conflict("email".to_string()),
        ];
        for e in refusals {
            assert!(e.is_expected(), "{e} should be expected");
        }
    }

    #[test]
    fn test_unique_violation_is_a_conflict() {
        let e = PredictionError::from(Error::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("UNIQUE constraint failed: users.email".to_string()),
        ));
        assert!(matches!(e, PredictionError::Conflict(ref m) if m.contains("users.email")));
        assert!(e.is_expected());
    }
}
