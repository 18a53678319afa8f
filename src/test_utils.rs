//! Shared test utilities for `WasteLink`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        partner::{self, PartnerProfile},
        waste_request::{self, NewWasteRequest},
    },
    entities,
    errors::Result,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a pending test partner.
///
/// # Defaults
/// * name: derived from the email
/// * `service_areas`: `["Downtown"]`
/// * `supported_waste_types`: plastic, glass, paper
pub async fn create_test_partner(
    db: &DatabaseConnection,
    email: &str,
) -> Result<entities::partner::Model> {
    let name = email.split('@').next().unwrap_or(email).to_string();
    partner::create_partner(
        db,
        email,
        PartnerProfile {
            name,
            phone: Some("555-0100".to_string()),
            service_areas: vec!["Downtown".to_string()],
            supported_waste_types: vec![
                "plastic".to_string(),
                "glass".to_string(),
                "paper".to_string(),
            ],
        },
    )
    .await
}

/// Creates a test partner and approves it.
pub async fn create_approved_partner(
    db: &DatabaseConnection,
    email: &str,
) -> Result<entities::partner::Model> {
    let created = create_test_partner(db, email).await?;
    partner::approve_partner(db, created.id).await
}

/// Submits an unassigned request located downtown.
pub async fn create_test_request(
    db: &DatabaseConnection,
    waste_type: &str,
    quantity: &str,
) -> Result<entities::waste_request::Model> {
    waste_request::submit_request(
        db,
        NewWasteRequest {
            waste_type: waste_type.to_string(),
            confidence: 88.0,
            quantity: quantity.to_string(),
            location: "1 Market St, Downtown".to_string(),
            submitted_by: Some("tester".to_string()),
            assign_to: None,
        },
    )
    .await
}

/// In-memory request model in the `assigned` state, for pure-function tests.
#[must_use]
pub fn sample_request(id: i64, waste_type: &str, quantity: &str) -> entities::waste_request::Model {
    let now = Utc::now();
    entities::waste_request::Model {
        id,
        waste_type: waste_type.to_string(),
        confidence: 90.0,
        quantity: quantity.to_string(),
        location: "Downtown".to_string(),
        status: entities::RequestStatus::Assigned,
        assigned_partner_id: None,
        recommended_partner_id: None,
        submitted_by: None,
        created_at: now,
        updated_at: now,
        completed_at: None,
    }
}
