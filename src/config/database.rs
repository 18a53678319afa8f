//! Database configuration module for WasteLink.
//!
//! This module handles the `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated with `Schema::create_table_from_entity`, so the schema always
//! matches the entity definitions without hand-written SQL.

use crate::entities::{
    Admin, AuditLog, Identity, Notification, Partner, PartnerDocument, PickupSchedule,
    RewardCampaign, RewardRule, RewardTransaction, Voucher, VoucherRedemption, WasteRequest,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/wastelink.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    ensure_sqlite_parent_dir(&database_url)?;
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates the directory holding a file-backed `SQLite` database.
fn ensure_sqlite_parent_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or(rest);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

async fn create_table_for<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates every marketplace table that does not exist yet.
///
/// Parent tables are created before the tables that reference them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table_for(db, &schema, Identity).await?;
    create_table_for(db, &schema, Admin).await?;
    create_table_for(db, &schema, Partner).await?;
    create_table_for(db, &schema, PartnerDocument).await?;
    create_table_for(db, &schema, WasteRequest).await?;
    create_table_for(db, &schema, PickupSchedule).await?;
    create_table_for(db, &schema, RewardRule).await?;
    create_table_for(db, &schema, RewardCampaign).await?;
    create_table_for(db, &schema, RewardTransaction).await?;
    create_table_for(db, &schema, Voucher).await?;
    create_table_for(db, &schema, VoucherRedemption).await?;
    create_table_for(db, &schema, Notification).await?;
    create_table_for(db, &schema, AuditLog).await?;

    info!("Database tables ensured");
    Ok(())
}
