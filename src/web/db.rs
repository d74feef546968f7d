pub mod models;
pub mod schema;
mod store;

pub use store::PgStore;

use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DbError};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

use crate::store::StoreError;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn connect(database_url: &str, pool_size: u32) -> Result<PgPool, StoreError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(pool_size)
        .build(manager)
        .map_err(|e| StoreError::Backend(format!("could not build connection pool: {e}")))
}

/// Applies pending migrations and returns the versions that ran.
pub fn run_migrations(pool: &PgPool) -> Result<Vec<String>, StoreError> {
    let mut conn = pool.get().map_err(|e| StoreError::Backend(format!("could not get connection: {e}")))?;
    let versions: Vec<String> = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Backend(format!("failed to run migrations: {e}")))?
        .into_iter()
        .map(|v| v.to_string())
        .collect();

    if versions.is_empty() {
        info!("database is up to date");
    } else {
        info!(applied = versions.len(), ?versions, "applied migrations");
    }
    Ok(versions)
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => StoreError::NotFound("record"),
            DbError::DatabaseError(kind, info) => {
                let constraint = info.constraint_name().unwrap_or("unnamed").to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => StoreError::UniqueViolation(constraint),
                    DatabaseErrorKind::ForeignKeyViolation => StoreError::ForeignKeyViolation(constraint),
                    _ => StoreError::Backend(info.message().to_string()),
                }
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}
