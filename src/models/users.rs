use crate::models::epoch_timestamp;
use crate::schema::{predictions, users};
use crate::{save_fn, PredictionError};
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::info;
use serde::Serialize;

/// What the identity provider tells us about whoever is making a request
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Queryable, Identifiable, Debug, Serialize, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    total_points: i32,
    pub created_at: i64,
}

impl User {
    pub fn get_by_id(id: &str, conn: &mut SqliteConnection) -> Result<Option<Self>, diesel::result::Error> {
        users::table.find(id).first(conn).optional()
    }

    pub fn get(id: &str, conn: &mut SqliteConnection) -> Result<Self, PredictionError> {
        Self::get_by_id(id, conn)?.ok_or_else(|| PredictionError::not_found("User", id))
    }

    /// ordered by display name, then id
    pub fn all(conn: &mut SqliteConnection) -> Result<Vec<Self>, diesel::result::Error> {
        users::table
            .order((users::display_name.asc(), users::id.asc()))
            .load(conn)
    }

    pub fn total_points(&self) -> i32 {
        self.total_points
    }

    /// Creates the user on first sight, otherwise refreshes the profile fields.
    /// Never touches total_points.
    pub fn sync_identity(
        identity: &Identity,
        conn: &mut SqliteConnection,
    ) -> Result<Self, PredictionError> {
        conn.transaction(|c| {
            match Self::get_by_id(&identity.id, c)? {
                Some(_) => {
                    diesel::update(users::table.find(&identity.id))
                        .set((
                            users::email.eq(&identity.email),
                            users::display_name.eq(&identity.display_name),
                        ))
                        .execute(c)?;
                }
                None => {
                    info!("Creating user {} ({})", identity.id, identity.email);
                    NewUser::new(&identity.id, &identity.email, &identity.display_name).save(c)?;
                }
            }
            Self::get(&identity.id, c)
        })
    }

    /// The only way total_points changes outside of a full reset: a relative update in SQL,
    /// so concurrent adjustments compose instead of overwriting each other.
    pub fn adjust_total(
        user_id: &str,
        delta: i32,
        conn: &mut SqliteConnection,
    ) -> Result<(), PredictionError> {
        let updated = diesel::update(users::table.find(user_id))
            .set(users::total_points.eq(users::total_points + delta))
            .execute(conn)?;
        if updated == 0 {
            return Err(PredictionError::not_found("User", user_id));
        }
        Ok(())
    }

    /// zeroes everyone. only for the bulk reset, where nothing else is left to disagree with
    pub(crate) fn reset_all_totals(conn: &mut SqliteConnection) -> Result<usize, diesel::result::Error> {
        diesel::update(users::table)
            .set(users::total_points.eq(0))
            .execute(conn)
    }

    /// what total_points should be, recomputed from scored predictions
    pub fn points_from_predictions(&self, conn: &mut SqliteConnection) -> Result<i64, diesel::result::Error> {
        let s: Option<i64> = predictions::table
            .filter(predictions::user_id.eq(&self.id))
            .select(sum(predictions::points_earned))
            .first(conn)?;
        Ok(s.unwrap_or(0))
    }
}

#[derive(Insertable)]
#[diesel(table_name=users)]
pub struct NewUser {
    id: String,
    email: String,
    display_name: String,
    total_points: i32,
    created_at: i64,
}

impl NewUser {
    pub fn new<S: Into<String>>(id: S, email: S, display_name: S) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: display_name.into(),
            total_points: 0,
            created_at: epoch_timestamp(),
        }
    }

    save_fn!(users::table, User);
}

#[cfg(test)]
mod tests {
    use super::{Identity, User};
    use crate::test_utils::{new_user, setup_db};
    use crate::PredictionError;

    #[test]
    fn test_sync_identity_creates_then_updates() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let ident = Identity {
            id: "auth0|abc".to_string(),
            email: "a@example.com".to_string(),
            display_name: "Ann".to_string(),
        };
        let created = User::sync_identity(&ident, &mut db)?;
        assert_eq!(0, created.total_points());

        User::adjust_total(&created.id, 4, &mut db)?;
        let renamed = Identity {
            display_name: "Annie".to_string(),
            ..ident
        };
        let updated = User::sync_identity(&renamed, &mut db)?;
        assert_eq!("Annie", updated.display_name);
        assert_eq!(4, updated.total_points());
        Ok(())
    }

    #[test]
    fn test_sync_identity_email_taken() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        // new_user registers u1@example.com
        new_user("u1", &mut db)?;
        let other = new_user("u2", &mut db)?;

        let newcomer = Identity {
            id: "auth0|new".to_string(),
            email: "u1@example.com".to_string(),
            display_name: "Impostor".to_string(),
        };
        assert!(matches!(
            User::sync_identity(&newcomer, &mut db),
            Err(PredictionError::Conflict(_))
        ));
        assert!(User::get_by_id("auth0|new", &mut db)?.is_none());

        let moved = Identity {
            id: other.id.clone(),
            email: "u1@example.com".to_string(),
            display_name: other.display_name.clone(),
        };
        assert!(matches!(
            User::sync_identity(&moved, &mut db),
            Err(PredictionError::Conflict(_))
        ));
        assert_eq!("u2@example.com", User::get(&other.id, &mut db)?.email);
        Ok(())
    }

    #[test]
    fn test_adjust_total_is_relative() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        let u = new_user("u1", &mut db)?;
        User::adjust_total(&u.id, 5, &mut db)?;
        User::adjust_total(&u.id, 3, &mut db)?;
        User::adjust_total(&u.id, -2, &mut db)?;
        assert_eq!(6, User::get(&u.id, &mut db)?.total_points());
        Ok(())
    }

    #[test]
    fn test_adjust_total_missing_user() -> anyhow::Result<()> {
        let mut db = setup_db()?;
        assert!(matches!(
            User::adjust_total("nobody", 1, &mut db),
            Err(PredictionError::NotFound { .. })
        ));
        Ok(())
    }
}
