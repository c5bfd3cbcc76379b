pub mod fixtures;
pub mod leaderboard_snapshots;
pub mod predictions;
pub mod stages;
pub mod teams;
pub mod users;

pub(crate) fn epoch_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// creates a function named `save()` that takes a &mut SqliteConnection
#[macro_export]
macro_rules! save_fn {
    ($table:expr, $output:ty) => {
        pub fn save(&self, cxn: &mut diesel::SqliteConnection) -> diesel::QueryResult<$output> {
            use diesel::RunQueryDsl;
            diesel::insert_into($table).values(self).get_result(cxn)
        }
    };
}

#[macro_export]
macro_rules! update_fn {
    () => {
        pub fn update(&self, conn: &mut diesel::SqliteConnection) -> diesel::QueryResult<usize> {
            diesel::update(self).set(self).execute(conn)
        }
    };
}

#[macro_export]
macro_rules! delete_fn {
    ($table:expr) => {
        pub fn delete(self, conn: &mut diesel::SqliteConnection) -> diesel::QueryResult<usize> {
            diesel::delete($table.find(self.id)).execute(conn)
        }
    };
}
