//! SQLite-backed test database with the organization tables.
//!
//! Requires the `test-helpers` feature, which compiles in the SQLite driver:
//!
//! ```toml
//! [dev-dependencies]
//! orgward = { version = "0.1", features = ["test-helpers"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use orgward::testing::TestDb;
//!
//! #[tokio::test]
//! async fn test_with_database() {
//!     let db = TestDb::with_org_tables().await.expect("test database");
//!     let store = db.org_store();
//! }
//! ```

use crate::organizations::SeaOrmOrgStore;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};

/// An in-memory SQLite database.
///
/// The pool holds a single connection, so every query sees the same
/// in-memory database.
pub struct TestDb {
    pub connection: DatabaseConnection,
}

impl TestDb {
    /// Empty database.
    pub async fn new() -> Result<Self, DbErr> {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let connection = Database::connect(options).await?;

        connection
            .execute_unprepared("PRAGMA foreign_keys = ON;")
            .await?;

        Ok(Self { connection })
    }

    /// Database with the organization tables created.
    pub async fn with_org_tables() -> crate::Result<Self> {
        let db = Self::new().await?;
        db.org_store().create_tables().await?;
        Ok(db)
    }

    /// Get a clone of the database connection.
    pub fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    pub fn org_store(&self) -> SeaOrmOrgStore {
        SeaOrmOrgStore::new(self.connection.clone())
    }

    /// Execute raw SQL statements, e.g. to seed fixtures.
    pub async fn seed(&self, statements: &[&str]) -> Result<(), DbErr> {
        for statement in statements {
            self.connection.execute_unprepared(statement).await?;
        }
        Ok(())
    }
}
