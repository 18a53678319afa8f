//! Audit log - append-only record of administrative actions.
//!
//! Recording is best-effort: a failed write is logged and swallowed so that the
//! admin action that triggered it still succeeds.

use crate::{
    entities::{AuditLog, audit_log},
    errors::Result,
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use tracing::{debug, warn};

/// Records an admin action, returning the stored row when the write succeeded.
pub async fn record<C>(
    db: &C,
    actor: &str,
    action: &str,
    target_type: &str,
    target_id: Option<String>,
    details: serde_json::Value,
) -> Option<audit_log::Model>
where
    C: ConnectionTrait,
{
    let entry = audit_log::ActiveModel {
        actor: Set(actor.to_string()),
        action: Set(action.to_string()),
        target_type: Set(target_type.to_string()),
        target_id: Set(target_id),
        details: Set(details),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    match entry.insert(db).await {
        Ok(model) => {
            debug!("Audit: {} {} {}", model.actor, model.action, model.target_type);
            Some(model)
        }
        Err(e) => {
            warn!("Failed to write audit log for '{}' by {}: {}", action, actor, e);
            None
        }
    }
}

/// Returns the most recent audit entries, newest first.
pub async fn list_recent(db: &DatabaseConnection, limit: u64) -> Result<Vec<audit_log::Model>> {
    AuditLog::find()
        .order_by_desc(audit_log::Column::CreatedAt)
        .order_by_desc(audit_log::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns every entry touching one record.
pub async fn list_for_target(
    db: &DatabaseConnection,
    target_type: &str,
    target_id: &str,
) -> Result<Vec<audit_log::Model>> {
    AuditLog::find()
        .filter(audit_log::Column::TargetType.eq(target_type))
        .filter(audit_log::Column::TargetId.eq(target_id))
        .order_by_asc(audit_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use sea_orm::Database;
    use serde_json::json;

    #[tokio::test]
    async fn test_record_and_list() -> Result<()> {
        let db = setup_test_db().await?;

        let first = record(&db, "admin@x", "partner.approve", "partners", Some("1".to_string()), json!({})).await;
        assert!(first.is_some());
        record(&db, "admin@x", "voucher.create", "vouchers", Some("4".to_string()), json!({"code": "ABC"})).await;

        let recent = list_recent(&db, 10).await?;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "voucher.create");
        assert_eq!(recent[0].details["code"], "ABC");

        let for_partner = list_for_target(&db, "partners", "1").await?;
        assert_eq!(for_partner.len(), 1);
        assert_eq!(for_partner[0].actor, "admin@x");

        Ok(())
    }

    #[tokio::test]
    async fn test_record_failure_is_swallowed() -> Result<()> {
        // No tables exist, so the insert fails
        let db = Database::connect("sqlite::memory:").await?;
        let result = record(&db, "admin", "noop", "partners", None, json!(null)).await;
        assert!(result.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_recent_respects_limit() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(list_recent(&db, 5).await?.is_empty());

        for i in 0..8 {
            record(&db, "admin", "partner.approve", "partners", Some(i.to_string()), json!({})).await;
        }
        let entries = list_recent(&db, 5).await?;
        assert_eq!(entries.len(), 5);
        Ok(())
    }
}
