use crate::save_fn;
use crate::schema::teams;
use diesel::prelude::*;
use diesel::SqliteConnection;
use serde::Serialize;

#[derive(Queryable, Identifiable, Debug, Serialize, Clone)]
pub struct Team {
    pub id: i32,
    pub name: String,
    pub group_label: Option<String>,
}

impl Team {
    pub fn get_by_id(id: i32, conn: &mut SqliteConnection) -> Result<Option<Self>, diesel::result::Error> {
        teams::table.find(id).first(conn).optional()
    }

    pub fn get_by_name(
        name: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Option<Self>, diesel::result::Error> {
        teams::table
            .filter(teams::name.eq(name))
            .first(conn)
            .optional()
    }

    /// ordered by id
    pub fn in_group(
        group_label: &str,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Self>, diesel::result::Error> {
        teams::table
            .filter(teams::group_label.eq(group_label))
            .order(teams::id.asc())
            .load(conn)
    }
}

#[derive(Insertable)]
#[diesel(table_name=teams)]
pub struct NewTeam {
    name: String,
    group_label: Option<String>,
}

impl NewTeam {
    pub fn new<S: Into<String>>(name: S, group_label: Option<S>) -> Self {
        Self {
            name: name.into(),
            group_label: group_label.map(Into::into),
        }
    }

    save_fn!(teams::table, Team);
}
