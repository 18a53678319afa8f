//! Partner business logic - profiles, verification, documents and subscriptions.
//!
//! Verification and subscription changes go through `core::lifecycle` so an
//! admin cannot, for instance, approve a partner that was already rejected.
//! Every verification decision also notifies the partner in the same database
//! transaction.

use crate::{
    config::marketplace::SubscriptionPlan,
    core::{
        lifecycle::{self, VerificationTrigger},
        notification,
    },
    entities::{
        Partner, PartnerDocument, StringList, SubscriptionStatus, VerificationStatus, partner,
        partner_document,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Profile fields captured at sign-up.
#[derive(Debug, Clone, Default)]
pub struct PartnerProfile {
    pub name: String,
    pub phone: Option<String>,
    pub service_areas: Vec<String>,
    pub supported_waste_types: Vec<String>,
}

/// Partial update; only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct PartnerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub service_areas: Option<Vec<String>>,
    pub supported_waste_types: Option<Vec<String>>,
}

fn clean_list(values: Vec<String>) -> StringList {
    StringList(
        values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect(),
    )
}

/// Normalizes an email for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks the profile fields that `create_partner` would refuse.
pub fn validate_profile(profile: &PartnerProfile) -> Result<()> {
    if profile.name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Partner name cannot be empty".to_string(),
        });
    }
    Ok(())
}

/// Creates a partner profile with `pending` verification and zero points.
pub async fn create_partner<C>(
    db: &C,
    email: &str,
    profile: PartnerProfile,
) -> Result<partner::Model>
where
    C: ConnectionTrait,
{
    validate_profile(&profile)?;

    let now = Utc::now();
    let model = partner::ActiveModel {
        name: Set(profile.name.trim().to_string()),
        email: Set(normalize_email(email)),
        phone: Set(profile.phone),
        verification_status: Set(VerificationStatus::Pending),
        rejection_reason: Set(None),
        subscription_plan: Set(None),
        subscription_status: Set(None),
        subscription_start: Set(None),
        subscription_expiry: Set(None),
        subscription_amount: Set(None),
        reward_points: Set(0),
        service_areas: Set(clean_list(profile.service_areas)),
        supported_waste_types: Set(clean_list(profile.supported_waste_types)),
        is_disabled: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!("Created partner {} <{}>", created.id, created.email);
    Ok(created)
}

/// Retrieves every partner, ordered by name.
pub async fn list_partners(db: &DatabaseConnection) -> Result<Vec<partner::Model>> {
    Partner::find()
        .order_by_asc(partner::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves partners in one verification state, ordered by sign-up time.
pub async fn list_partners_by_status(
    db: &DatabaseConnection,
    status: VerificationStatus,
) -> Result<Vec<partner::Model>> {
    Partner::find()
        .filter(partner::Column::VerificationStatus.eq(status))
        .order_by_asc(partner::Column::CreatedAt)
        .order_by_asc(partner::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a partner by id.
pub async fn get_partner_by_id<C>(db: &C, partner_id: i64) -> Result<Option<partner::Model>>
where
    C: ConnectionTrait,
{
    Partner::find_by_id(partner_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a partner by sign-in email (case-insensitive).
pub async fn get_partner_by_email<C>(db: &C, email: &str) -> Result<Option<partner::Model>>
where
    C: ConnectionTrait,
{
    Partner::find()
        .filter(partner::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_partner_by_id`] but treats a missing partner as an error.
pub async fn require_partner<C>(db: &C, partner_id: i64) -> Result<partner::Model>
where
    C: ConnectionTrait,
{
    get_partner_by_id(db, partner_id)
        .await?
        .ok_or_else(|| Error::PartnerNotFound {
            id: partner_id.to_string(),
        })
}

/// Applies a partial profile update. Last write wins.
pub async fn update_partner(
    db: &DatabaseConnection,
    partner_id: i64,
    update: PartnerUpdate,
) -> Result<partner::Model> {
    let existing = require_partner(db, partner_id).await?;
    let mut active: partner::ActiveModel = existing.into();

    if let Some(name) = update.name {
        if name.trim().is_empty() {
            return Err(Error::Validation {
                message: "Partner name cannot be empty".to_string(),
            });
        }
        active.name = Set(name.trim().to_string());
    }
    if let Some(phone) = update.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(areas) = update.service_areas {
        active.service_areas = Set(clean_list(areas));
    }
    if let Some(types) = update.supported_waste_types {
        active.supported_waste_types = Set(clean_list(types));
    }
    active.updated_at = Set(Utc::now());

    active.update(db).await.map_err(Into::into)
}

async fn set_verification<C>(
    db: &C,
    existing: partner::Model,
    to: VerificationStatus,
    trigger: VerificationTrigger,
    reason: Option<String>,
) -> Result<partner::Model>
where
    C: ConnectionTrait,
{
    lifecycle::validate_verification_transition(existing.verification_status, to, trigger)?;

    let mut active: partner::ActiveModel = existing.into();
    active.verification_status = Set(to);
    active.rejection_reason = Set(reason);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Approves a pending partner and notifies them.
pub async fn approve_partner(db: &DatabaseConnection, partner_id: i64) -> Result<partner::Model> {
    let txn = db.begin().await?;

    let existing = require_partner(&txn, partner_id).await?;
    let updated = set_verification(
        &txn,
        existing,
        VerificationStatus::Approved,
        VerificationTrigger::AdminReview,
        None,
    )
    .await?;

    notification::create_notification(
        &txn,
        Some(partner_id),
        "Account approved",
        "Your documents were verified. You can now receive pickup assignments.",
    )
    .await?;

    txn.commit().await?;
    info!("Approved partner {}", partner_id);
    Ok(updated)
}

/// Rejects a pending partner with a reason and notifies them.
pub async fn reject_partner(
    db: &DatabaseConnection,
    partner_id: i64,
    reason: &str,
) -> Result<partner::Model> {
    if reason.trim().is_empty() {
        return Err(Error::Validation {
            message: "A rejection reason is required".to_string(),
        });
    }

    let txn = db.begin().await?;

    let existing = require_partner(&txn, partner_id).await?;
    let updated = set_verification(
        &txn,
        existing,
        VerificationStatus::Rejected,
        VerificationTrigger::AdminReview,
        Some(reason.trim().to_string()),
    )
    .await?;

    notification::create_notification(
        &txn,
        Some(partner_id),
        "Account rejected",
        &format!("Your verification was rejected: {}", reason.trim()),
    )
    .await?;

    txn.commit().await?;
    info!("Rejected partner {}: {}", partner_id, reason);
    Ok(updated)
}

/// Enables or disables a partner account.
pub async fn set_partner_disabled(
    db: &DatabaseConnection,
    partner_id: i64,
    disabled: bool,
) -> Result<partner::Model> {
    let existing = require_partner(db, partner_id).await?;
    let mut active: partner::ActiveModel = existing.into();
    active.is_disabled = Set(disabled);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!("Partner {} disabled = {}", partner_id, disabled);
    Ok(updated)
}

/// Stores an uploaded document.
///
/// A rejected partner who uploads a document goes back to `pending` review.
pub async fn add_document(
    db: &DatabaseConnection,
    partner_id: i64,
    doc_type: &str,
    url: &str,
) -> Result<partner_document::Model> {
    if doc_type.trim().is_empty() || url.trim().is_empty() {
        return Err(Error::Validation {
            message: "Document type and url are required".to_string(),
        });
    }

    let txn = db.begin().await?;

    let existing = require_partner(&txn, partner_id).await?;
    if existing.verification_status == VerificationStatus::Rejected {
        set_verification(
            &txn,
            existing,
            VerificationStatus::Pending,
            VerificationTrigger::DocumentResubmission,
            None,
        )
        .await?;
        info!("Partner {} resubmitted documents, back to pending", partner_id);
    }

    let document = partner_document::ActiveModel {
        partner_id: Set(partner_id),
        doc_type: Set(doc_type.trim().to_string()),
        url: Set(url.trim().to_string()),
        uploaded_at: Set(Utc::now()),
        verified: Set(false),
        verified_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(document)
}

/// Marks a document as verified by an admin.
pub async fn verify_document(
    db: &DatabaseConnection,
    document_id: i64,
) -> Result<partner_document::Model> {
    let document = PartnerDocument::find_by_id(document_id)
        .one(db)
        .await?
        .ok_or(Error::DocumentNotFound { id: document_id })?;

    if document.verified {
        return Ok(document);
    }

    let mut active: partner_document::ActiveModel = document.into();
    active.verified = Set(true);
    active.verified_at = Set(Some(Utc::now()));
    active.update(db).await.map_err(Into::into)
}

/// Lists a partner's documents in upload order.
pub async fn list_documents(
    db: &DatabaseConnection,
    partner_id: i64,
) -> Result<Vec<partner_document::Model>> {
    PartnerDocument::find()
        .filter(partner_document::Column::PartnerId.eq(partner_id))
        .order_by_asc(partner_document::Column::UploadedAt)
        .order_by_asc(partner_document::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Starts (or renews) a subscription on `plan`, running `plan.duration_days` from `now`.
///
/// Only approved partners can subscribe.
pub async fn activate_subscription(
    db: &DatabaseConnection,
    partner_id: i64,
    plan: &SubscriptionPlan,
    now: DateTime<Utc>,
) -> Result<partner::Model> {
    let existing = require_partner(db, partner_id).await?;

    if existing.verification_status != VerificationStatus::Approved {
        return Err(Error::Validation {
            message: format!(
                "Partner {} must be approved before subscribing (currently {})",
                partner_id, existing.verification_status
            ),
        });
    }
    lifecycle::validate_subscription_transition(
        existing.subscription_status,
        SubscriptionStatus::Active,
    )?;
    let expiry = TimeDelta::try_days(plan.duration_days)
        .and_then(|period| now.checked_add_signed(period))
        .ok_or_else(|| Error::Validation {
            message: format!(
                "Plan '{}' runs {} days, which is out of range",
                plan.id, plan.duration_days
            ),
        })?;

    let mut active: partner::ActiveModel = existing.into();
    active.subscription_plan = Set(Some(plan.id.clone()));
    active.subscription_status = Set(Some(SubscriptionStatus::Active));
    active.subscription_start = Set(Some(now));
    active.subscription_expiry = Set(Some(expiry));
    active.subscription_amount = Set(Some(plan.price));
    active.updated_at = Set(now);

    let updated = active.update(db).await?;
    info!("Partner {} subscribed to plan '{}'", partner_id, plan.id);
    Ok(updated)
}

/// Cancels an active subscription.
pub async fn cancel_subscription(
    db: &DatabaseConnection,
    partner_id: i64,
) -> Result<partner::Model> {
    let existing = require_partner(db, partner_id).await?;
    lifecycle::validate_subscription_transition(
        existing.subscription_status,
        SubscriptionStatus::Cancelled,
    )?;

    let mut active: partner::ActiveModel = existing.into();
    active.subscription_status = Set(Some(SubscriptionStatus::Cancelled));
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!("Partner {} cancelled subscription", partner_id);
    Ok(updated)
}

/// Marks every active subscription whose expiry has passed as expired.
///
/// Returns the number of partners updated.
pub async fn expire_subscriptions(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<u64> {
    let result = Partner::update_many()
        .col_expr(
            partner::Column::SubscriptionStatus,
            Expr::value(SubscriptionStatus::Expired),
        )
        .col_expr(partner::Column::UpdatedAt, Expr::value(now))
        .filter(partner::Column::SubscriptionStatus.eq(SubscriptionStatus::Active))
        .filter(partner::Column::SubscriptionExpiry.lt(now))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!("Expired {} subscriptions", result.rows_affected);
    }
    Ok(result.rows_affected)
}
