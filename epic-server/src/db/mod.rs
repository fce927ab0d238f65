//! Database access layer for epic-server
//!
//! One module per resource. Functions take the shared pool and return
//! `sqlx::Result`; `None` means the row does not exist.

pub mod agencies;
pub mod answers;
pub mod areas;
pub mod groups;
pub mod programs;
pub mod questions;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixture helpers shared by the unit tests of this crate

    use sqlx::SqlitePool;

    /// In-memory database with one area, two groups and three programs:
    /// `Alpha` (id 1) and `Beta` (id 2) in group `Coast` (id 1),
    /// `Gamma` (id 3) in group `River` (id 2).
    pub async fn seeded_pool() -> SqlitePool {
        let pool = epic_common::db::init_memory_database()
            .await
            .expect("Failed to create in-memory database");

        for statement in [
            "INSERT INTO areas (id, name) VALUES (1, 'Water')",
            "INSERT INTO program_groups (id, name, area_id) VALUES (1, 'Coast', 1)",
            "INSERT INTO program_groups (id, name, area_id) VALUES (2, 'River', 1)",
            "INSERT INTO programs (id, name, group_id) VALUES (1, 'Alpha', 1)",
            "INSERT INTO programs (id, name, group_id) VALUES (2, 'Beta', 1)",
            "INSERT INTO programs (id, name, group_id) VALUES (3, 'Gamma', 2)",
        ] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .expect("Fixture insert failed");
        }

        pool
    }
}
