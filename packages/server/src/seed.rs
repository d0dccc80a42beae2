use sea_orm::sea_query::{Index, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::config::AdminSeedConfig;
use crate::entity::{admin, listing};
use crate::utils::hash;

/// Create the configured administrator unless an account with that username exists.
///
/// An existing account keeps its password; rotate it in the database.
pub async fn seed_admin(db: &DatabaseConnection, config: &AdminSeedConfig) -> Result<(), DbErr> {
    let username = config.username.trim();
    if username.is_empty() || config.password.is_empty() {
        warn!("Admin seed credentials are empty, skipping admin seeding");
        return Ok(());
    }

    let password = hash::hash_password(&config.password)
        .map_err(|e| DbErr::Custom(format!("Password hash error: {e}")))?;

    let model = admin::ActiveModel {
        username: Set(username.to_string()),
        password: Set(password),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = admin::Entity::insert(model)
        .on_conflict(
            OnConflict::column(admin::Column::Username)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) => info!(username, "Seeded admin account"),
        Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e),
    }

    Ok(())
}

/// Ensure the directory filter indexes exist.
///
/// Schema sync only creates the unique index on `slug`.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let indexes = [
        ("idx_umkm_category", listing::Column::Category),
        ("idx_umkm_status", listing::Column::Status),
    ];

    for (name, column) in indexes {
        let stmt = Index::create()
            .if_not_exists()
            .name(name)
            .table(listing::Entity)
            .col(column)
            .to_string(PostgresQueryBuilder);

        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {name} exists"),
            Err(e) => warn!("Failed to create index {name}: {e}"),
        }
    }

    Ok(())
}
