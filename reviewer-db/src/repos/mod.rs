//! Repository layer for database operations

pub mod pull_requests;
pub mod statistics;
pub mod teams;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::TempDir;

    use crate::Database;

    pub async fn setup_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();
        (db, temp_dir)
    }
}
