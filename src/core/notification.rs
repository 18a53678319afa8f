//! Partner notifications.

use crate::{
    entities::{Notification, notification},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use tracing::debug;

/// Stores a notification for one partner, or for everyone when `partner_id` is `None`.
pub async fn create_notification<C>(
    db: &C,
    partner_id: Option<i64>,
    title: &str,
    message: &str,
) -> Result<notification::Model>
where
    C: ConnectionTrait,
{
    if title.trim().is_empty() {
        return Err(Error::Validation {
            message: "Notification title cannot be empty".to_string(),
        });
    }

    let model = notification::ActiveModel {
        partner_id: Set(partner_id),
        title: Set(title.trim().to_string()),
        message: Set(message.to_string()),
        is_read: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    debug!("Notification {} created for {:?}", created.id, partner_id);
    Ok(created)
}

fn visible_to(partner_id: i64) -> Condition {
    Condition::any()
        .add(notification::Column::PartnerId.eq(partner_id))
        .add(notification::Column::PartnerId.is_null())
}

/// Notifications addressed to a partner plus broadcasts, newest first.
pub async fn list_for_partner(
    db: &DatabaseConnection,
    partner_id: i64,
) -> Result<Vec<notification::Model>> {
    Notification::find()
        .filter(visible_to(partner_id))
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn require_notification(
    db: &DatabaseConnection,
    notification_id: i64,
) -> Result<notification::Model> {
    Notification::find_by_id(notification_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::Validation {
            message: format!("Notification {notification_id} not found"),
        })
}

/// Marks a notification as read.
pub async fn mark_read(db: &DatabaseConnection, notification_id: i64) -> Result<notification::Model> {
    let existing = require_notification(db, notification_id).await?;
    set_read(db, existing).await
}

/// Marks one of the partner's own notifications as read.
///
/// Broadcasts and other partners' notifications are refused.
pub async fn mark_read_for_partner(
    db: &DatabaseConnection,
    partner_id: i64,
    notification_id: i64,
) -> Result<notification::Model> {
    let existing = require_notification(db, notification_id).await?;
    if existing.partner_id != Some(partner_id) {
        return Err(Error::PermissionDenied {
            message: format!("Notification {notification_id} does not belong to partner {partner_id}"),
        });
    }
    set_read(db, existing).await
}

async fn set_read(
    db: &DatabaseConnection,
    existing: notification::Model,
) -> Result<notification::Model> {
    if existing.is_read {
        return Ok(existing);
    }
    let mut active: notification::ActiveModel = existing.into();
    active.is_read = Set(true);
    active.update(db).await.map_err(Into::into)
}

/// Number of unread notifications visible to a partner.
pub async fn unread_count(db: &DatabaseConnection, partner_id: i64) -> Result<u64> {
    Notification::find()
        .filter(visible_to(partner_id))
        .filter(notification::Column::IsRead.eq(false))
        .count(db)
        .await
        .map_err(Into::into)
}
