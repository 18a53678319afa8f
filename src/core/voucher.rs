//! Voucher business logic - creation, assignment and redemption.
//!
//! Redemption runs in one database transaction. The redemption counter is
//! bumped with an UPDATE guarded by `current_redemptions < max_redemptions`, so
//! two partners racing for the last slot cannot both get it.

use crate::{
    core::{partner as partner_core, reward},
    entities::{
        IdList, RewardKind, Voucher, VoucherRedemption, VoucherStatus, reward_transaction,
        voucher, voucher_redemption,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info};

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Length of generated voucher codes
pub const CODE_LENGTH: usize = 8;

/// Random uppercase alphanumeric voucher code.
#[must_use]
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| char::from(CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())]))
        .collect()
}

/// Fields for a new voucher.
#[derive(Debug, Clone)]
pub struct NewVoucher {
    /// Generated when `None`
    pub code: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub points_required: i64,
    pub expiry_date: DateTime<Utc>,
    pub max_redemptions: i32,
    /// Partners allowed to redeem; empty means everyone
    pub assigned_partners: Vec<i64>,
}

/// Everything written by a successful redemption.
#[derive(Debug, Clone)]
pub struct Redemption {
    /// Voucher state after the redemption
    pub voucher: voucher::Model,
    pub redemption: voucher_redemption::Model,
    /// The `redeemed` ledger row
    pub transaction: reward_transaction::Model,
}

/// Creates an available voucher.
pub async fn create_voucher(db: &DatabaseConnection, new: NewVoucher) -> Result<voucher::Model> {
    if new.title.trim().is_empty() {
        return Err(Error::Validation {
            message: "Voucher title cannot be empty".to_string(),
        });
    }
    if new.points_required < 0 {
        return Err(Error::InvalidPoints {
            points: new.points_required,
        });
    }
    if new.max_redemptions < 1 {
        return Err(Error::Validation {
            message: format!(
                "max_redemptions must be at least 1, got {}",
                new.max_redemptions
            ),
        });
    }

    let code = match new.code {
        Some(code) if !code.trim().is_empty() => code.trim().to_uppercase(),
        _ => generate_code(),
    };

    let created = voucher::ActiveModel {
        code: Set(code),
        title: Set(new.title.trim().to_string()),
        description: Set(new.description),
        points_required: Set(new.points_required),
        expiry_date: Set(new.expiry_date),
        status: Set(VoucherStatus::Available),
        max_redemptions: Set(new.max_redemptions),
        current_redemptions: Set(0),
        assigned_partners: Set(IdList(new.assigned_partners)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        "Created voucher {} '{}' ({} points, {} slots)",
        created.code, created.title, created.points_required, created.max_redemptions
    );
    Ok(created)
}

/// Every voucher, newest first.
pub async fn list_vouchers(db: &DatabaseConnection) -> Result<Vec<voucher::Model>> {
    Voucher::find()
        .order_by_desc(voucher::Column::CreatedAt)
        .order_by_desc(voucher::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Vouchers a partner could redeem right now, by points required.
pub async fn list_available_for(
    db: &DatabaseConnection,
    partner_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<voucher::Model>> {
    let vouchers = Voucher::find()
        .filter(voucher::Column::Status.eq(VoucherStatus::Available))
        .filter(voucher::Column::ExpiryDate.gte(now))
        .order_by_asc(voucher::Column::PointsRequired)
        .order_by_asc(voucher::Column::Id)
        .all(db)
        .await?;
    Ok(vouchers
        .into_iter()
        .filter(|v| v.assigned_partners.is_empty() || v.assigned_partners.contains(partner_id))
        .collect())
}

/// Finds a voucher by id.
pub async fn get_voucher_by_id(
    db: &DatabaseConnection,
    voucher_id: i64,
) -> Result<Option<voucher::Model>> {
    Voucher::find_by_id(voucher_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a voucher by its code (case-insensitive).
pub async fn get_voucher_by_code(
    db: &DatabaseConnection,
    code: &str,
) -> Result<Option<voucher::Model>> {
    Voucher::find()
        .filter(voucher::Column::Code.eq(code.trim().to_uppercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_voucher<C>(db: &C, voucher_id: i64) -> Result<voucher::Model>
where
    C: ConnectionTrait,
{
    Voucher::find_by_id(voucher_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::VoucherNotFound {
            id: voucher_id.to_string(),
        })
}

/// Adds a partner to the voucher's allow-list.
pub async fn assign_voucher(
    db: &DatabaseConnection,
    voucher_id: i64,
    partner_id: i64,
) -> Result<voucher::Model> {
    let existing = require_voucher(db, voucher_id).await?;
    partner_core::require_partner(db, partner_id).await?;

    if existing.assigned_partners.contains(partner_id) {
        return Ok(existing);
    }

    let mut partners = existing.assigned_partners.0.clone();
    partners.push(partner_id);

    let mut active: voucher::ActiveModel = existing.into();
    active.assigned_partners = Set(IdList(partners));
    let updated = active.update(db).await?;
    info!("Voucher {} assigned to partner {}", updated.code, partner_id);
    Ok(updated)
}

/// Withdraws a voucher so it can no longer be redeemed.
pub async fn deactivate_voucher(db: &DatabaseConnection, voucher_id: i64) -> Result<voucher::Model> {
    let existing = require_voucher(db, voucher_id).await?;
    let mut active: voucher::ActiveModel = existing.into();
    active.status = Set(VoucherStatus::Inactive);
    let updated = active.update(db).await?;
    info!("Voucher {} deactivated", updated.code);
    Ok(updated)
}

/// Redemptions of one voucher, oldest first.
pub async fn redeemed_by(
    db: &DatabaseConnection,
    voucher_id: i64,
) -> Result<Vec<voucher_redemption::Model>> {
    VoucherRedemption::find()
        .filter(voucher_redemption::Column::VoucherId.eq(voucher_id))
        .order_by_asc(voucher_redemption::Column::RedeemedAt)
        .order_by_asc(voucher_redemption::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Redeems a voucher for a partner.
///
/// Checks, in order: the voucher exists, is available, has not expired, is
/// assigned to the partner (when it has an allow-list), has not been redeemed
/// by the partner before, and the ledger balance covers its price. Then the
/// guarded counter increment claims a slot, the points are debited and the
/// redemption is recorded. Nothing is written unless every step succeeds.
pub async fn redeem_voucher(
    db: &DatabaseConnection,
    voucher_id: i64,
    partner_id: i64,
    now: DateTime<Utc>,
) -> Result<Redemption> {
    let txn = db.begin().await?;

    let found = require_voucher(&txn, voucher_id).await?;
    partner_core::require_partner(&txn, partner_id).await?;

    if found.status != VoucherStatus::Available {
        return Err(Error::VoucherUnavailable {
            code: found.code,
            status: found.status.to_string(),
        });
    }
    if found.expiry_date < now {
        return Err(Error::VoucherExpired { code: found.code });
    }
    if !found.assigned_partners.is_empty() && !found.assigned_partners.contains(partner_id) {
        return Err(Error::VoucherNotAssigned {
            code: found.code,
            partner_id,
        });
    }

    let previous = VoucherRedemption::find()
        .filter(voucher_redemption::Column::VoucherId.eq(voucher_id))
        .filter(voucher_redemption::Column::PartnerId.eq(partner_id))
        .count(&txn)
        .await?;
    if previous > 0 {
        return Err(Error::AlreadyRedeemed {
            code: found.code,
            partner_id,
        });
    }

    let balance = reward::get_balance(&txn, partner_id).await?;
    if balance < found.points_required {
        return Err(Error::InsufficientPoints {
            current: balance,
            required: found.points_required,
        });
    }

    let claimed = Voucher::update_many()
        .col_expr(
            voucher::Column::CurrentRedemptions,
            Expr::col(voucher::Column::CurrentRedemptions).add(1),
        )
        .filter(voucher::Column::Id.eq(voucher_id))
        .filter(voucher::Column::Status.eq(VoucherStatus::Available))
        .filter(
            Expr::col(voucher::Column::CurrentRedemptions)
                .lt(Expr::col(voucher::Column::MaxRedemptions)),
        )
        .exec(&txn)
        .await?;
    if claimed.rows_affected == 0 {
        return Err(Error::VoucherExhausted { code: found.code });
    }

    let transaction = reward::append_ledger(
        &txn,
        partner_id,
        RewardKind::Redeemed,
        found.points_required,
        format!("Redeemed voucher {} ({})", found.code, found.title),
        None,
        Some(voucher_id),
    )
    .await?;
    reward::adjust_cached_points(&txn, partner_id, -found.points_required).await?;

    let redemption = voucher_redemption::ActiveModel {
        voucher_id: Set(voucher_id),
        partner_id: Set(partner_id),
        reward_transaction_id: Set(transaction.id),
        redeemed_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    Voucher::update_many()
        .col_expr(voucher::Column::Status, Expr::value(VoucherStatus::Redeemed))
        .filter(voucher::Column::Id.eq(voucher_id))
        .filter(
            Expr::col(voucher::Column::CurrentRedemptions)
                .gte(Expr::col(voucher::Column::MaxRedemptions)),
        )
        .exec(&txn)
        .await?;

    let voucher = require_voucher(&txn, voucher_id).await?;
    txn.commit().await?;

    debug!(
        "Voucher {} now at {}/{}",
        voucher.code, voucher.current_redemptions, voucher.max_redemptions
    );
    info!(
        "Partner {} redeemed voucher {} for {} points",
        partner_id, voucher.code, found.points_required
    );
    Ok(Redemption {
        voucher,
        redemption,
        transaction,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::reward::{get_balance, issue_points, list_ledger},
        test_utils::*,
    };
    use chrono::Duration;

    fn new_voucher(points_required: i64, max_redemptions: i32) -> NewVoucher {
        NewVoucher {
            code: None,
            title: "Coffee".to_string(),
            description: Some("One free coffee".to_string()),
            points_required,
            expiry_date: Utc::now() + Duration::days(30),
            max_redemptions,
            assigned_partners: Vec::new(),
        }
    }

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[tokio::test]
    async fn test_create_voucher_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_voucher(&db, new_voucher(-1, 1)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidPoints { points: -1 }));

        let result = create_voucher(&db, new_voucher(10, 0)).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let mut explicit = new_voucher(10, 1);
        explicit.code = Some("spring24".to_string());
        let created = create_voucher(&db, explicit.clone()).await?;
        assert_eq!(created.code, "SPRING24");
        assert_eq!(created.status, VoucherStatus::Available);

        let found = get_voucher_by_code(&db, "Spring24").await?.unwrap();
        assert_eq!(found.id, created.id);

        // Codes are unique
        let duplicate = create_voucher(&db, explicit).await;
        assert!(matches!(duplicate.unwrap_err(), Error::AlreadyExists(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_debits_points_and_records() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_approved_partner(&db, "redeem@example.com").await?;
        issue_points(&db, partner.id, 100, "seed").await?;
        let voucher = create_voucher(&db, new_voucher(60, 2)).await?;

        let result = redeem_voucher(&db, voucher.id, partner.id, Utc::now()).await?;
        assert_eq!(result.voucher.current_redemptions, 1);
        assert_eq!(result.voucher.status, VoucherStatus::Available);
        assert_eq!(result.transaction.kind, RewardKind::Redeemed);
        assert_eq!(result.transaction.points, 60);
        assert_eq!(result.redemption.reward_transaction_id, result.transaction.id);

        assert_eq!(get_balance(&db, partner.id).await?, 40);
        let cached = partner_core::require_partner(&db, partner.id).await?;
        assert_eq!(cached.reward_points, 40);

        // Same partner cannot redeem twice
        let again = redeem_voucher(&db, voucher.id, partner.id, Utc::now()).await;
        assert!(matches!(again.unwrap_err(), Error::AlreadyRedeemed { .. }));

        let redemptions = redeemed_by(&db, voucher.id).await?;
        assert_eq!(redemptions.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_insufficient_points_leaves_state_untouched() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_approved_partner(&db, "poor@example.com").await?;
        issue_points(&db, partner.id, 10, "seed").await?;
        let voucher = create_voucher(&db, new_voucher(50, 1)).await?;

        let result = redeem_voucher(&db, voucher.id, partner.id, Utc::now()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientPoints {
                current: 10,
                required: 50
            }
        ));

        let unchanged = get_voucher_by_id(&db, voucher.id).await?.unwrap();
        assert_eq!(unchanged.current_redemptions, 0);
        assert_eq!(get_balance(&db, partner.id).await?, 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_last_slot_flips_status() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_approved_partner(&db, "first@example.com").await?;
        let second = create_approved_partner(&db, "second@example.com").await?;
        issue_points(&db, first.id, 20, "seed").await?;
        issue_points(&db, second.id, 20, "seed").await?;
        let voucher = create_voucher(&db, new_voucher(5, 1)).await?;

        let result = redeem_voucher(&db, voucher.id, first.id, Utc::now()).await?;
        assert_eq!(result.voucher.status, VoucherStatus::Redeemed);
        assert_eq!(result.voucher.remaining_redemptions(), 0);

        let late = redeem_voucher(&db, voucher.id, second.id, Utc::now()).await;
        assert!(matches!(late.unwrap_err(), Error::VoucherUnavailable { .. }));
        assert_eq!(get_balance(&db, second.id).await?, 20);
        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_check_order() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_approved_partner(&db, "order@example.com").await?;
        let outsider = create_approved_partner(&db, "outsider@example.com").await?;

        let missing = redeem_voucher(&db, 404, partner.id, Utc::now()).await;
        assert!(matches!(missing.unwrap_err(), Error::VoucherNotFound { .. }));

        // Expired beats insufficient points
        let mut expired = new_voucher(500, 1);
        expired.expiry_date = Utc::now() - Duration::days(1);
        let expired = create_voucher(&db, expired).await?;
        let result = redeem_voucher(&db, expired.id, partner.id, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), Error::VoucherExpired { .. }));

        // Inactive beats expired
        deactivate_voucher(&db, expired.id).await?;
        let result = redeem_voucher(&db, expired.id, partner.id, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), Error::VoucherUnavailable { .. }));

        // Allow-list
        let mut restricted = new_voucher(0, 5);
        restricted.assigned_partners = vec![partner.id];
        let restricted = create_voucher(&db, restricted).await?;
        let result = redeem_voucher(&db, restricted.id, outsider.id, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), Error::VoucherNotAssigned { .. }));

        assign_voucher(&db, restricted.id, outsider.id).await?;
        let redeemed = redeem_voucher(&db, restricted.id, outsider.id, Utc::now()).await?;
        assert_eq!(redeemed.voucher.current_redemptions, 1);

        let available = list_available_for(&db, partner.id, Utc::now()).await?;
        assert_eq!(available.len(), 1);
        assert_eq!(list_vouchers(&db).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_sequential_redemptions_never_exceed_max() -> Result<()> {
        let db = setup_test_db().await?;
        let voucher = create_voucher(&db, new_voucher(1, 3)).await?;

        let mut successes = 0;
        for i in 0..6 {
            let partner = create_approved_partner(&db, &format!("p{i}@example.com")).await?;
            issue_points(&db, partner.id, 5, "seed").await?;
            if redeem_voucher(&db, voucher.id, partner.id, Utc::now())
                .await
                .is_ok()
            {
                successes += 1;
            }
        }

        assert_eq!(successes, 3);
        let final_state = get_voucher_by_id(&db, voucher.id).await?.unwrap();
        assert_eq!(final_state.current_redemptions, 3);
        assert_eq!(final_state.status, VoucherStatus::Redeemed);
        Ok(())
    }

    #[tokio::test]
    async fn test_counter_guard_refuses_stale_snapshot() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_approved_partner(&db, "late@example.com").await?;
        issue_points(&db, partner.id, 50, "seed").await?;
        let voucher = create_voucher(&db, new_voucher(10, 2)).await?;

        // Another redeemer filled the last slot but the status flip has not landed
        Voucher::update_many()
            .col_expr(voucher::Column::CurrentRedemptions, Expr::value(2))
            .filter(voucher::Column::Id.eq(voucher.id))
            .exec(&db)
            .await?;

        let result = redeem_voucher(&db, voucher.id, partner.id, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), Error::VoucherExhausted { .. }));

        assert_eq!(list_ledger(&db, partner.id).await?.len(), 1);
        assert_eq!(get_balance(&db, partner.id).await?, 50);
        assert!(redeemed_by(&db, voucher.id).await?.is_empty());
        let unchanged = get_voucher_by_id(&db, voucher.id).await?.unwrap();
        assert_eq!(unchanged.current_redemptions, 2);
        assert_eq!(unchanged.status, VoucherStatus::Available);
        Ok(())
    }
}
