use crate::storage::MediaStorage;
use sea_orm::DatabaseConnection;

/// Shared per-process state: one connection pool and the media disk handle.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: MediaStorage,
}
