//! Waste request business logic - submission, partner recommendation,
//! assignment and status changes.
//!
//! Status changes are validated by `core::lifecycle`. Assignment checks that the
//! partner exists, is approved and is enabled before anything is written.

use crate::{
    core::{lifecycle, notification, partner as partner_core, pickup},
    entities::{
        Partner, RequestStatus, VerificationStatus, WasteRequest, partner, waste_request,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{debug, info};

/// Fields supplied when a request is filed.
#[derive(Debug, Clone)]
pub struct NewWasteRequest {
    pub waste_type: String,
    /// Classifier confidence, 0-100
    pub confidence: f64,
    pub quantity: String,
    pub location: String,
    pub submitted_by: Option<String>,
    /// Assign straight away instead of leaving it for an admin
    pub assign_to: Option<i64>,
}

fn validate_new_request(request: &NewWasteRequest) -> Result<()> {
    if request.waste_type.trim().is_empty() {
        return Err(Error::Validation {
            message: "Waste type cannot be empty".to_string(),
        });
    }
    if request.location.trim().is_empty() {
        return Err(Error::Validation {
            message: "Location cannot be empty".to_string(),
        });
    }
    if !request.confidence.is_finite() || !(0.0..=100.0).contains(&request.confidence) {
        return Err(Error::Validation {
            message: format!(
                "Confidence must be between 0 and 100, got {}",
                request.confidence
            ),
        });
    }
    Ok(())
}

fn serves_location(candidate: &partner::Model, location: &str) -> bool {
    let location = location.to_lowercase();
    candidate.service_areas.is_empty()
        || candidate
            .service_areas
            .0
            .iter()
            .any(|area| location.contains(&area.to_lowercase()))
}

/// Picks the best partner for a waste type and location.
///
/// Candidates are approved, enabled partners that accept the waste type and
/// serve the location (a partner without service areas serves everywhere).
/// Partners with an active subscription come first, then the one with the
/// fewest open assignments, then the lowest id.
#[must_use]
pub fn rank_partners<'a>(
    partners: &'a [partner::Model],
    open_assignments: &HashMap<i64, usize>,
    waste_type: &str,
    location: &str,
) -> Option<&'a partner::Model> {
    partners
        .iter()
        .filter(|p| p.verification_status == VerificationStatus::Approved && !p.is_disabled)
        .filter(|p| p.supported_waste_types.contains_ignore_case(waste_type.trim()))
        .filter(|p| serves_location(p, location))
        .min_by_key(|p| {
            (
                !p.has_active_subscription(),
                open_assignments.get(&p.id).copied().unwrap_or(0),
                p.id,
            )
        })
}

async fn open_assignment_counts<C>(db: &C) -> Result<HashMap<i64, usize>>
where
    C: ConnectionTrait,
{
    let open = WasteRequest::find()
        .filter(waste_request::Column::Status.ne(RequestStatus::Completed))
        .filter(waste_request::Column::AssignedPartnerId.is_not_null())
        .all(db)
        .await?;

    let mut counts = HashMap::new();
    for request in open {
        if let Some(partner_id) = request.assigned_partner_id {
            *counts.entry(partner_id).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Recommends a partner for a waste type and location, if any qualifies.
pub async fn recommend_partner<C>(
    db: &C,
    waste_type: &str,
    location: &str,
) -> Result<Option<partner::Model>>
where
    C: ConnectionTrait,
{
    let partners = Partner::find()
        .filter(partner::Column::VerificationStatus.eq(VerificationStatus::Approved))
        .filter(partner::Column::IsDisabled.eq(false))
        .all(db)
        .await?;
    let open = open_assignment_counts(db).await?;

    let recommended = rank_partners(&partners, &open, waste_type, location).cloned();
    debug!(
        "Recommendation for {} at '{}': {:?}",
        waste_type,
        location,
        recommended.as_ref().map(|p| p.id)
    );
    Ok(recommended)
}

async fn require_assignable_partner<C>(db: &C, partner_id: i64) -> Result<partner::Model>
where
    C: ConnectionTrait,
{
    let candidate = partner_core::require_partner(db, partner_id).await?;
    if candidate.verification_status != VerificationStatus::Approved {
        return Err(Error::Validation {
            message: format!(
                "Partner {} is {} and cannot take pickups",
                partner_id, candidate.verification_status
            ),
        });
    }
    if candidate.is_disabled {
        return Err(Error::AccountDisabled);
    }
    Ok(candidate)
}

/// Files a new waste request in the `assigned` state.
///
/// The recommended partner is computed and stored at submission time.
pub async fn submit_request(
    db: &DatabaseConnection,
    request: NewWasteRequest,
) -> Result<waste_request::Model> {
    validate_new_request(&request)?;

    let txn = db.begin().await?;

    let recommended = recommend_partner(&txn, &request.waste_type, &request.location).await?;
    if let Some(partner_id) = request.assign_to {
        require_assignable_partner(&txn, partner_id).await?;
    }

    let now = Utc::now();
    let created = waste_request::ActiveModel {
        waste_type: Set(request.waste_type.trim().to_lowercase()),
        confidence: Set(request.confidence),
        quantity: Set(request.quantity.trim().to_string()),
        location: Set(request.location.trim().to_string()),
        status: Set(RequestStatus::Assigned),
        assigned_partner_id: Set(request.assign_to),
        recommended_partner_id: Set(recommended.map(|p| p.id)),
        submitted_by: Set(request.submitted_by),
        created_at: Set(now),
        updated_at: Set(now),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if let Some(partner_id) = created.assigned_partner_id {
        notify_assignment(&txn, partner_id, &created).await?;
    }

    txn.commit().await?;
    info!(
        "Waste request {} submitted ({} {})",
        created.id, created.quantity, created.waste_type
    );
    Ok(created)
}

async fn notify_assignment<C>(db: &C, partner_id: i64, request: &waste_request::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    notification::create_notification(
        db,
        Some(partner_id),
        "New pickup assigned",
        &format!(
            "Request #{}: {} of {} at {}",
            request.id, request.quantity, request.waste_type, request.location
        ),
    )
    .await?;
    Ok(())
}

/// Retrieves a request by id.
pub async fn get_request_by_id(
    db: &DatabaseConnection,
    request_id: i64,
) -> Result<Option<waste_request::Model>> {
    WasteRequest::find_by_id(request_id)
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_request<C>(db: &C, request_id: i64) -> Result<waste_request::Model>
where
    C: ConnectionTrait,
{
    WasteRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or(Error::RequestNotFound { id: request_id })
}

/// Retrieves every request, newest first.
pub async fn list_requests(db: &DatabaseConnection) -> Result<Vec<waste_request::Model>> {
    WasteRequest::find()
        .order_by_desc(waste_request::Column::CreatedAt)
        .order_by_desc(waste_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves requests in one status, newest first.
pub async fn list_by_status(
    db: &DatabaseConnection,
    status: RequestStatus,
) -> Result<Vec<waste_request::Model>> {
    WasteRequest::find()
        .filter(waste_request::Column::Status.eq(status))
        .order_by_desc(waste_request::Column::CreatedAt)
        .order_by_desc(waste_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves requests assigned to a partner, newest first.
pub async fn list_for_partner(
    db: &DatabaseConnection,
    partner_id: i64,
) -> Result<Vec<waste_request::Model>> {
    WasteRequest::find()
        .filter(waste_request::Column::AssignedPartnerId.eq(partner_id))
        .order_by_desc(waste_request::Column::CreatedAt)
        .order_by_desc(waste_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Assigns (or reassigns) a partner to a request.
///
/// Reassignment is only possible before work starts and resets the status
/// to `assigned`. Upcoming pickups move to the new partner, and both the new
/// and the previous partner are notified.
pub async fn assign_partner(
    db: &DatabaseConnection,
    request_id: i64,
    partner_id: i64,
) -> Result<waste_request::Model> {
    let txn = db.begin().await?;

    let existing = require_request(&txn, request_id).await?;
    if !lifecycle::can_reassign(existing.status) {
        return Err(Error::InvalidTransition {
            entity: "waste request assignment",
            from: existing.status.to_string(),
            to: RequestStatus::Assigned.to_string(),
        });
    }
    require_assignable_partner(&txn, partner_id).await?;

    let now = Utc::now();
    let previous = existing.assigned_partner_id.filter(|id| *id != partner_id);
    let mut active: waste_request::ActiveModel = existing.into();
    active.assigned_partner_id = Set(Some(partner_id));
    active.status = Set(RequestStatus::Assigned);
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    notify_assignment(&txn, partner_id, &updated).await?;

    if let Some(previous) = previous {
        let moved = pickup::transfer_schedules(&txn, request_id, partner_id, now).await?;
        notification::create_notification(
            &txn,
            Some(previous),
            "Pickup reassigned",
            &format!(
                "Request #{} at {} was handed to another partner",
                updated.id, updated.location
            ),
        )
        .await?;
        info!(
            "Request {} moved from partner {} to {} with {} upcoming pickups",
            request_id, previous, partner_id, moved
        );
    }

    txn.commit().await?;
    info!("Request {} assigned to partner {}", request_id, partner_id);
    Ok(updated)
}

/// Moves a request to `status`, enforcing the lifecycle.
///
/// Completing a request stamps `completed_at`.
pub async fn update_status(
    db: &DatabaseConnection,
    request_id: i64,
    status: RequestStatus,
) -> Result<waste_request::Model> {
    let existing = require_request(db, request_id).await?;
    lifecycle::validate_request_transition(
        existing.status,
        status,
        existing.assigned_partner_id.is_some(),
    )?;

    if existing.status == status {
        return Ok(existing);
    }

    let now = Utc::now();
    let from = existing.status;
    let mut active: waste_request::ActiveModel = existing.into();
    active.status = Set(status);
    active.updated_at = Set(now);
    if status == RequestStatus::Completed {
        active.completed_at = Set(Some(now));
    }

    let updated = active.update(db).await?;
    info!("Request {} moved {} -> {}", request_id, from, status);
    Ok(updated)
}
