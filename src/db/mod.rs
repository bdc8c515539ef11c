//! Persistence layer: the `links` entity, schema bootstrap and the service
//! functions the HTTP handlers call.

pub mod entities;
pub mod services;

use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use tracing::info;

use crate::db::entities::link;

const LINKS_OWNER_INDEX: &str = "idx_links_user_id_created_at";

/// Opens the shared database handle. Called once at startup; the handle is
/// cloned into the application state for every request.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(10).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    info!(backend = ?db.get_database_backend(), "Database successfully connected.");
    Ok(db)
}

/// Creates the `links` table and its owner index when missing.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut create_table = schema.create_table_from_entity(link::Entity);
    create_table.if_not_exists();
    db.execute(backend.build(&create_table)).await?;

    let create_index = Index::create()
        .name(LINKS_OWNER_INDEX)
        .table(link::Entity)
        .col(link::Column::UserId)
        .col(link::Column::CreatedAt)
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&create_index)).await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_db() -> DatabaseConnection {
    // A single pooled connection keeps the in-memory database alive.
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("in-memory sqlite");
    ensure_schema(&db).await.expect("schema");
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let db = test_db().await;
        ensure_schema(&db).await.unwrap();
        ensure_schema(&db).await.unwrap();
    }
}
