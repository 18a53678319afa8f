//! Pickup scheduling for assigned requests.

use crate::{
    core::notification,
    entities::{PickupSchedule, RequestStatus, WasteRequest, pickup_schedule},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

/// Books a collection slot with the request's assigned partner and notifies them.
pub async fn schedule_pickup(
    db: &DatabaseConnection,
    request_id: i64,
    scheduled_for: DateTime<Utc>,
    notes: Option<String>,
) -> Result<pickup_schedule::Model> {
    let txn = db.begin().await?;

    let request = WasteRequest::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or(Error::RequestNotFound { id: request_id })?;

    let partner_id = request.assigned_partner_id.ok_or_else(|| Error::Validation {
        message: format!("Request {request_id} has no assigned partner to schedule"),
    })?;
    if request.status == RequestStatus::Completed {
        return Err(Error::Validation {
            message: format!("Request {request_id} is already completed"),
        });
    }

    let schedule = pickup_schedule::ActiveModel {
        waste_request_id: Set(request_id),
        partner_id: Set(partner_id),
        scheduled_for: Set(scheduled_for),
        notes: Set(notes.filter(|n| !n.trim().is_empty())),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    notification::create_notification(
        &txn,
        Some(partner_id),
        "Pickup scheduled",
        &format!(
            "Request #{} at {} is scheduled for {}",
            request_id,
            request.location,
            scheduled_for.format("%Y-%m-%d %H:%M UTC")
        ),
    )
    .await?;

    txn.commit().await?;
    info!(
        "Scheduled pickup {} for request {} on {}",
        schedule.id, request_id, scheduled_for
    );
    Ok(schedule)
}

/// Hands a request's pickups at or after `from` to `partner_id`.
///
/// Past pickups keep the partner that was booked at the time.
pub(crate) async fn transfer_schedules<C>(
    db: &C,
    request_id: i64,
    partner_id: i64,
    from: DateTime<Utc>,
) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = PickupSchedule::update_many()
        .col_expr(pickup_schedule::Column::PartnerId, Expr::value(partner_id))
        .filter(pickup_schedule::Column::WasteRequestId.eq(request_id))
        .filter(pickup_schedule::Column::ScheduledFor.gte(from))
        .filter(pickup_schedule::Column::PartnerId.ne(partner_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// A partner's schedule, soonest first.
pub async fn list_for_partner(
    db: &DatabaseConnection,
    partner_id: i64,
) -> Result<Vec<pickup_schedule::Model>> {
    PickupSchedule::find()
        .filter(pickup_schedule::Column::PartnerId.eq(partner_id))
        .order_by_asc(pickup_schedule::Column::ScheduledFor)
        .order_by_asc(pickup_schedule::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every pickup at or after `now`, soonest first.
pub async fn upcoming(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<Vec<pickup_schedule::Model>> {
    PickupSchedule::find()
        .filter(pickup_schedule::Column::ScheduledFor.gte(now))
        .order_by_asc(pickup_schedule::Column::ScheduledFor)
        .order_by_asc(pickup_schedule::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{
            notification::unread_count,
            waste_request::{assign_partner, update_status},
        },
        test_utils::*,
    };
    use chrono::Duration;

    #[tokio::test]
    async fn test_schedule_requires_partner() -> Result<()> {
        let db = setup_test_db().await?;
        let request = create_test_request(&db, "plastic", "4 kg").await?;

        let result = schedule_pickup(&db, request.id, Utc::now(), None).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let missing = schedule_pickup(&db, 99, Utc::now(), None).await;
        assert!(matches!(missing.unwrap_err(), Error::RequestNotFound { id: 99 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_schedule_and_list() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_approved_partner(&db, "sched@example.com").await?;
        let now = Utc::now();

        let first = create_test_request(&db, "plastic", "4 kg").await?;
        let second = create_test_request(&db, "glass", "2 kg").await?;
        assign_partner(&db, first.id, partner.id).await?;
        assign_partner(&db, second.id, partner.id).await?;
        let before = unread_count(&db, partner.id).await?;

        schedule_pickup(&db, first.id, now + Duration::days(2), Some("Gate B".to_string())).await?;
        schedule_pickup(&db, second.id, now + Duration::days(1), Some("  ".to_string())).await?;
        schedule_pickup(&db, second.id, now - Duration::days(1), None).await?;

        assert_eq!(unread_count(&db, partner.id).await?, before + 3);

        let schedule = list_for_partner(&db, partner.id).await?;
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[0].waste_request_id, second.id);

        let soon = upcoming(&db, now).await?;
        assert_eq!(soon.len(), 2);
        assert_eq!(soon[0].waste_request_id, second.id);
        assert!(soon[0].notes.is_none());
        assert_eq!(soon[1].notes.as_deref(), Some("Gate B"));
        Ok(())
    }

    #[tokio::test]
    async fn test_completed_request_cannot_be_scheduled() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_approved_partner(&db, "done@example.com").await?;
        let request = create_test_request(&db, "paper", "1 kg").await?;
        assign_partner(&db, request.id, partner.id).await?;
        for status in [
            RequestStatus::Accepted,
            RequestStatus::InProgress,
            RequestStatus::Completed,
        ] {
            update_status(&db, request.id, status).await?;
        }

        let result = schedule_pickup(&db, request.id, Utc::now(), None).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }
}
