pub mod memory;
pub mod migrate;
pub mod posts;
pub mod tags;
pub mod users;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::deadpool::{Object, Pool as DeadPool};
use diesel_async::AsyncPgConnection;

use crate::error::ServiceError;

pub use memory::MemoryStore;
pub use posts::PostService;
pub use tags::{RenameOutcome, TagService};
pub use users::UserService;

pub type Pool = DeadPool<AsyncPgConnection>;

/// Marker for store handles that can sit in router state.
pub trait Svc: Clone + Send + Sync + 'static {}

/// Everything the routes need from a store.
pub trait BlogStore: UserService + PostService + TagService {}

impl<T> BlogStore for T where T: UserService + PostService + TagService {}

diesel::sql_function!(fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text);

/// Postgres-backed store. Each operation checks out one pooled connection and
/// runs its writes in a single transaction.
#[derive(Clone)]
pub struct PgStore {
    db: Pool,
}

impl Svc for PgStore {}

impl PgStore {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }

    async fn conn(&self) -> Result<Object<AsyncPgConnection>, ServiceError> {
        self.db
            .get()
            .await
            .map_err(|e| ServiceError::Pool(e.to_string()))
    }
}

/// Reports a unique-index violation as `duplicate()`, which is what the
/// lookup before the write would have said had it not lost a race.
fn on_unique_violation(
    err: DieselError,
    duplicate: impl FnOnce() -> ServiceError,
) -> ServiceError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => duplicate(),
        other => other.into(),
    }
}
