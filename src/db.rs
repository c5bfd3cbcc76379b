use crate::config::CONFIG;
use crate::PredictionLeagueError;
use bb8::{ManageConnection, Pool};
use diesel::connection::SimpleConnection;
use diesel::{Connection, ConnectionError, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

// cascade deletes depend on foreign_keys, and it's off by default in sqlite
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

pub fn establish(url: &str) -> Result<SqliteConnection, ConnectionError> {
    let mut conn = SqliteConnection::establish(url)?;
    conn.batch_execute(CONNECTION_PRAGMAS)
        .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
    Ok(conn)
}

/// for scripts: a single connection to whatever DATABASE_URL points at
pub fn raw_diesel_cxn_from_env() -> Result<SqliteConnection, ConnectionError> {
    establish(&CONFIG.database_url)
}

pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), PredictionLeagueError> {
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| PredictionLeagueError::MigrationError(e.to_string()))
}

pub struct DieselConnectionManager {
    url: String,
}

impl DieselConnectionManager {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self { url: url.into() }
    }

    pub fn new_from_env() -> Self {
        Self::new(CONFIG.database_url.clone())
    }
}

#[async_trait::async_trait]
impl ManageConnection for DieselConnectionManager {
    type Connection = SqliteConnection;
    type Error = ConnectionError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        establish(&self.url)
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.batch_execute("SELECT 1")
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

pub async fn diesel_pool(
    manager: DieselConnectionManager,
) -> Result<Pool<DieselConnectionManager>, ConnectionError> {
    Pool::builder().max_size(12).build(manager).await
}
