//! Reward points - the formula, the ledger, rules and campaigns.
//!
//! The ledger in `reward_transactions` is the source of truth for a partner's
//! balance. `partners.reward_points` is a cache that every ledger write updates
//! in the same database transaction with an atomic increment.

use crate::{
    config::marketplace::RewardRuleConfig,
    core::{metrics::parse_quantity_kg, partner as partner_core},
    entities::{
        Partner, RequestStatus, RewardCampaign, RewardKind, RewardRule, RewardTransaction,
        StringList, WasteRequest, partner, reward_campaign, reward_rule, reward_transaction,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info, warn};

/// Largest amount a single ledger row may carry.
pub const MAX_POINTS_PER_ENTRY: i64 = 1_000_000_000;

/// Points for `quantity_kg` of `waste_type` at `points_per_kg`, boosted by
/// every campaign that applies at `now`.
#[must_use]
pub fn calculate_reward(
    points_per_kg: f64,
    quantity_kg: f64,
    waste_type: &str,
    campaigns: &[reward_campaign::Model],
    now: DateTime<Utc>,
) -> f64 {
    let multiplier: f64 = campaigns
        .iter()
        .filter(|c| c.applies_to(waste_type, now))
        .map(|c| c.multiplier)
        .product();
    points_per_kg * quantity_kg * multiplier
}

/// Rounds a computed reward to whole ledger points.
///
/// Returns `None` when the reward is not finite or its magnitude exceeds
/// [`MAX_POINTS_PER_ENTRY`].
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn to_ledger_points(reward: f64) -> Option<i64> {
    let rounded = reward.round();
    (rounded.is_finite() && rounded.abs() <= MAX_POINTS_PER_ENTRY as f64)
        .then_some(rounded as i64)
}

/// Sums signed ledger points, failing instead of wrapping.
#[must_use]
pub fn ledger_total(rows: &[reward_transaction::Model]) -> Option<i64> {
    rows.iter()
        .try_fold(0_i64, |total, row| total.checked_add(row.signed_points()))
}

/// Checks that crediting `points` keeps the partner's balance representable.
async fn ensure_credit_fits<C>(db: &C, partner_id: i64, points: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    get_balance(db, partner_id)
        .await?
        .checked_add(points)
        .map(|_| ())
        .ok_or_else(|| Error::PointsOverflow {
            context: format!("crediting {points} points to partner {partner_id}"),
        })
}

/// Appends one ledger row. `points` is the magnitude; `kind` carries the sign.
pub(crate) async fn append_ledger<C>(
    db: &C,
    partner_id: i64,
    kind: RewardKind,
    points: i64,
    description: String,
    waste_request_id: Option<i64>,
    voucher_id: Option<i64>,
) -> Result<reward_transaction::Model>
where
    C: ConnectionTrait,
{
    let row = reward_transaction::ActiveModel {
        partner_id: Set(partner_id),
        kind: Set(kind),
        points: Set(points),
        description: Set(description),
        waste_request_id: Set(waste_request_id),
        voucher_id: Set(voucher_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!("Ledger row {}: {} {} for partner {}", row.id, kind, points, partner_id);
    Ok(row)
}

/// Adds `delta` to the cached balance with a single `UPDATE ... SET x = x + delta`.
pub(crate) async fn adjust_cached_points<C>(db: &C, partner_id: i64, delta: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    Partner::update_many()
        .col_expr(
            partner::Column::RewardPoints,
            Expr::col(partner::Column::RewardPoints).add(delta),
        )
        .col_expr(partner::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(partner::Column::Id.eq(partner_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Awards points for a completed pickup.
///
/// The request must be completed with an assigned partner, have an active rule
/// for its waste type and a parseable quantity, and not have been rewarded yet.
/// The ledger row and the cached balance are written in one transaction.
pub async fn award_points_for_request(
    db: &DatabaseConnection,
    request_id: i64,
    now: DateTime<Utc>,
) -> Result<reward_transaction::Model> {
    let txn = db.begin().await?;

    let request = WasteRequest::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or(Error::RequestNotFound { id: request_id })?;

    if request.status != RequestStatus::Completed {
        return Err(Error::Validation {
            message: format!(
                "Request {} is {} and cannot be rewarded until completed",
                request_id, request.status
            ),
        });
    }
    let partner_id = request.assigned_partner_id.ok_or_else(|| Error::Validation {
        message: format!("Request {request_id} has no assigned partner"),
    })?;

    let rule = RewardRule::find()
        .filter(reward_rule::Column::WasteType.eq(request.waste_type.to_lowercase()))
        .filter(reward_rule::Column::IsActive.eq(true))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::RewardRuleNotFound {
            waste_type: request.waste_type.clone(),
        })?;

    let quantity_kg =
        parse_quantity_kg(&request.quantity).ok_or_else(|| Error::InvalidQuantity {
            quantity: request.quantity.clone(),
        })?;

    let already = RewardTransaction::find()
        .filter(reward_transaction::Column::WasteRequestId.eq(request_id))
        .filter(reward_transaction::Column::Kind.eq(RewardKind::Earned))
        .count(&txn)
        .await?;
    if already > 0 {
        return Err(Error::AlreadyRewarded { request_id });
    }

    let campaigns = load_active_campaigns(&txn, now).await?;
    let reward = calculate_reward(
        rule.points_per_kg,
        quantity_kg,
        &request.waste_type,
        &campaigns,
        now,
    );
    let points = to_ledger_points(reward).ok_or_else(|| Error::PointsOverflow {
        context: format!("reward of {reward} for request {request_id}"),
    })?;
    if points <= 0 {
        return Err(Error::InvalidPoints { points });
    }
    ensure_credit_fits(&txn, partner_id, points).await?;

    let row = append_ledger(
        &txn,
        partner_id,
        RewardKind::Earned,
        points,
        format!(
            "Pickup #{}: {} of {}",
            request.id, request.quantity, request.waste_type
        ),
        Some(request.id),
        None,
    )
    .await?;
    adjust_cached_points(&txn, partner_id, points).await?;

    txn.commit().await?;
    info!(
        "Awarded {} points to partner {} for request {}",
        points, partner_id, request_id
    );
    Ok(row)
}

/// Credits points manually.
pub async fn issue_points(
    db: &DatabaseConnection,
    partner_id: i64,
    points: i64,
    description: &str,
) -> Result<reward_transaction::Model> {
    if points <= 0 || points > MAX_POINTS_PER_ENTRY {
        return Err(Error::InvalidPoints { points });
    }

    let txn = db.begin().await?;
    partner_core::require_partner(&txn, partner_id).await?;
    ensure_credit_fits(&txn, partner_id, points).await?;

    let description = if description.trim().is_empty() {
        "Manual credit".to_string()
    } else {
        description.trim().to_string()
    };
    let row = append_ledger(
        &txn,
        partner_id,
        RewardKind::Earned,
        points,
        description,
        None,
        None,
    )
    .await?;
    adjust_cached_points(&txn, partner_id, points).await?;

    txn.commit().await?;
    info!("Issued {} points to partner {}", points, partner_id);
    Ok(row)
}

/// Balance computed from the ledger.
pub async fn get_balance<C>(db: &C, partner_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let rows = RewardTransaction::find()
        .filter(reward_transaction::Column::PartnerId.eq(partner_id))
        .all(db)
        .await?;
    ledger_total(&rows).ok_or_else(|| Error::PointsOverflow {
        context: format!("ledger balance of partner {partner_id}"),
    })
}

/// A partner's ledger, newest first.
pub async fn list_ledger(
    db: &DatabaseConnection,
    partner_id: i64,
) -> Result<Vec<reward_transaction::Model>> {
    RewardTransaction::find()
        .filter(reward_transaction::Column::PartnerId.eq(partner_id))
        .order_by_desc(reward_transaction::Column::CreatedAt)
        .order_by_desc(reward_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Rewrites the cached balance from the ledger and returns the drift that was
/// corrected (ledger minus cache).
pub async fn reconcile_reward_points(db: &DatabaseConnection, partner_id: i64) -> Result<i64> {
    let txn = db.begin().await?;

    let existing = partner_core::require_partner(&txn, partner_id).await?;
    let ledger = get_balance(&txn, partner_id).await?;
    let drift = ledger
        .checked_sub(existing.reward_points)
        .ok_or_else(|| Error::PointsOverflow {
            context: format!("cached points of partner {partner_id}"),
        })?;

    if drift != 0 {
        warn!(
            "Partner {} cached points {} differ from ledger {}",
            partner_id, existing.reward_points, ledger
        );
        let mut active: partner::ActiveModel = existing.into();
        active.reward_points = Set(ledger);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
    }

    txn.commit().await?;
    Ok(drift)
}

fn validate_rate(waste_type: &str, points_per_kg: f64) -> Result<()> {
    if waste_type.trim().is_empty() {
        return Err(Error::Validation {
            message: "Waste type cannot be empty".to_string(),
        });
    }
    if !points_per_kg.is_finite() || points_per_kg < 0.0 {
        return Err(Error::Validation {
            message: format!("Invalid points_per_kg {points_per_kg} for '{waste_type}'"),
        });
    }
    Ok(())
}

async fn upsert_rule<C>(db: &C, waste_type: &str, points_per_kg: f64) -> Result<reward_rule::Model>
where
    C: ConnectionTrait,
{
    let key = waste_type.trim().to_lowercase();
    let existing = RewardRule::find()
        .filter(reward_rule::Column::WasteType.eq(key.as_str()))
        .one(db)
        .await?;

    let now = Utc::now();
    let rule = match existing {
        Some(rule) => {
            let mut active: reward_rule::ActiveModel = rule.into();
            active.points_per_kg = Set(points_per_kg);
            active.is_active = Set(true);
            active.updated_at = Set(now);
            active.update(db).await?
        }
        None => {
            reward_rule::ActiveModel {
                waste_type: Set(key),
                points_per_kg: Set(points_per_kg),
                is_active: Set(true),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };
    Ok(rule)
}

/// Upserts the configured reward rules. Returns how many were written.
pub async fn seed_reward_rules(db: &DatabaseConnection, rules: &[RewardRuleConfig]) -> Result<usize> {
    for rule in rules {
        validate_rate(&rule.waste_type, rule.points_per_kg)?;
    }

    let txn = db.begin().await?;
    for rule in rules {
        upsert_rule(&txn, &rule.waste_type, rule.points_per_kg).await?;
    }
    txn.commit().await?;

    info!("Seeded {} reward rules", rules.len());
    Ok(rules.len())
}

/// Creates or updates the rate for one waste type.
pub async fn set_reward_rule(
    db: &DatabaseConnection,
    waste_type: &str,
    points_per_kg: f64,
) -> Result<reward_rule::Model> {
    validate_rate(waste_type, points_per_kg)?;
    let rule = upsert_rule(db, waste_type, points_per_kg).await?;
    info!("Reward rule '{}' set to {} points/kg", rule.waste_type, points_per_kg);
    Ok(rule)
}

/// All reward rules, ordered by waste type.
pub async fn list_reward_rules(db: &DatabaseConnection) -> Result<Vec<reward_rule::Model>> {
    RewardRule::find()
        .order_by_asc(reward_rule::Column::WasteType)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fields for a new campaign.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub name: String,
    pub multiplier: f64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Empty boosts every waste type
    pub target_waste_types: Vec<String>,
}

/// Creates an active campaign.
pub async fn create_campaign(
    db: &DatabaseConnection,
    campaign: NewCampaign,
) -> Result<reward_campaign::Model> {
    if campaign.name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Campaign name cannot be empty".to_string(),
        });
    }
    if !campaign.multiplier.is_finite() || campaign.multiplier <= 0.0 {
        return Err(Error::Validation {
            message: format!("Multiplier must be positive, got {}", campaign.multiplier),
        });
    }
    if campaign.ends_at <= campaign.starts_at {
        return Err(Error::Validation {
            message: "Campaign must end after it starts".to_string(),
        });
    }

    let targets = campaign
        .target_waste_types
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>();

    let created = reward_campaign::ActiveModel {
        name: Set(campaign.name.trim().to_string()),
        multiplier: Set(campaign.multiplier),
        starts_at: Set(campaign.starts_at),
        ends_at: Set(campaign.ends_at),
        target_waste_types: Set(StringList(targets)),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created campaign '{}' x{}", created.name, created.multiplier);
    Ok(created)
}

/// Every campaign, newest start first.
pub async fn list_campaigns(db: &DatabaseConnection) -> Result<Vec<reward_campaign::Model>> {
    RewardCampaign::find()
        .order_by_desc(reward_campaign::Column::StartsAt)
        .order_by_desc(reward_campaign::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn load_active_campaigns<C>(db: &C, now: DateTime<Utc>) -> Result<Vec<reward_campaign::Model>>
where
    C: ConnectionTrait,
{
    let campaigns = RewardCampaign::find()
        .filter(reward_campaign::Column::IsActive.eq(true))
        .order_by_asc(reward_campaign::Column::Id)
        .all(db)
        .await?;
    Ok(campaigns
        .into_iter()
        .filter(|c| c.starts_at <= now && now <= c.ends_at)
        .collect())
}

/// Campaigns running at `now`.
pub async fn active_campaigns(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<Vec<reward_campaign::Model>> {
    load_active_campaigns(db, now).await
}

/// Switches a campaign off.
pub async fn deactivate_campaign(
    db: &DatabaseConnection,
    campaign_id: i64,
) -> Result<reward_campaign::Model> {
    let existing = RewardCampaign::find_by_id(campaign_id)
        .one(db)
        .await?
        .ok_or(Error::CampaignNotFound { id: campaign_id })?;

    let mut active: reward_campaign::ActiveModel = existing.into();
    active.is_active = Set(false);
    let updated = active.update(db).await?;
    info!("Deactivated campaign {}", campaign_id);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]
    use super::*;
    use crate::{core::waste_request::update_status, test_utils::*};
    use chrono::Duration;

    fn campaign(id: i64, multiplier: f64, targets: &[&str], now: DateTime<Utc>) -> reward_campaign::Model {
        reward_campaign::Model {
            id,
            name: format!("Campaign {id}"),
            multiplier,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(1),
            target_waste_types: StringList(targets.iter().map(ToString::to_string).collect()),
            is_active: true,
        }
    }

    #[test]
    fn test_calculate_reward_without_campaigns() {
        let now = Utc::now();
        assert_eq!(calculate_reward(10.0, 2.5, "plastic", &[], now), 25.0);
    }

    #[test]
    fn test_calculate_reward_multiplies_applicable_campaigns() {
        let now = Utc::now();
        let mut expired = campaign(3, 10.0, &[], now);
        expired.ends_at = now - Duration::hours(1);
        let mut inactive = campaign(4, 10.0, &[], now);
        inactive.is_active = false;

        let campaigns = vec![
            campaign(1, 2.0, &[], now),
            campaign(2, 1.5, &["Plastic"], now),
            campaign(5, 3.0, &["glass"], now),
            expired,
            inactive,
        ];

        assert_eq!(calculate_reward(10.0, 2.0, "plastic", &campaigns, now), 60.0);
        assert_eq!(calculate_reward(10.0, 2.0, "glass", &campaigns, now), 120.0);
        assert_eq!(calculate_reward(10.0, 2.0, "paper", &campaigns, now), 40.0);
    }

    #[test]
    fn test_to_ledger_points_rounds() {
        assert_eq!(to_ledger_points(12.4), Some(12));
        assert_eq!(to_ledger_points(12.5), Some(13));
    }

    #[test]
    fn test_to_ledger_points_refuses_huge_rewards() {
        assert_eq!(to_ledger_points(1e9), Some(MAX_POINTS_PER_ENTRY));
        assert_eq!(to_ledger_points(1e9 + 1.0), None);
        assert_eq!(to_ledger_points(1e300), None);
        assert_eq!(to_ledger_points(f64::INFINITY), None);
        assert_eq!(to_ledger_points(f64::NAN), None);
    }

    async fn completed_request(
        db: &DatabaseConnection,
        partner_id: i64,
        waste_type: &str,
        quantity: &str,
    ) -> Result<i64> {
        let request = create_test_request(db, waste_type, quantity).await?;
        crate::core::waste_request::assign_partner(db, request.id, partner_id).await?;
        update_status(db, request.id, RequestStatus::Accepted).await?;
        update_status(db, request.id, RequestStatus::InProgress).await?;
        update_status(db, request.id, RequestStatus::Completed).await?;
        Ok(request.id)
    }

    #[tokio::test]
    async fn test_award_points_for_completed_request() -> Result<()> {
        let db = setup_test_db().await?;
        set_reward_rule(&db, "Plastic", 10.0).await?;
        let partner = create_approved_partner(&db, "earn@example.com").await?;
        let request_id = completed_request(&db, partner.id, "plastic", "12.5 kg").await?;

        let row = award_points_for_request(&db, request_id, Utc::now()).await?;
        assert_eq!(row.points, 125);
        assert_eq!(row.kind, RewardKind::Earned);
        assert_eq!(row.waste_request_id, Some(request_id));

        assert_eq!(get_balance(&db, partner.id).await?, 125);
        let cached = partner_core::require_partner(&db, partner.id).await?;
        assert_eq!(cached.reward_points, 125);

        // A second award for the same request is refused
        let again = award_points_for_request(&db, request_id, Utc::now()).await;
        assert!(matches!(again.unwrap_err(), Error::AlreadyRewarded { .. }));
        assert_eq!(get_balance(&db, partner.id).await?, 125);
        Ok(())
    }

    #[tokio::test]
    async fn test_award_applies_campaign() -> Result<()> {
        let db = setup_test_db().await?;
        set_reward_rule(&db, "glass", 4.0).await?;
        let now = Utc::now();
        create_campaign(
            &db,
            NewCampaign {
                name: "Glass week".to_string(),
                multiplier: 2.0,
                starts_at: now - Duration::days(1),
                ends_at: now + Duration::days(6),
                target_waste_types: vec!["GLASS".to_string()],
            },
        )
        .await?;
        let partner = create_approved_partner(&db, "glass@example.com").await?;
        let request_id = completed_request(&db, partner.id, "glass", "5kg").await?;

        let row = award_points_for_request(&db, request_id, now).await?;
        assert_eq!(row.points, 40);
        Ok(())
    }

    #[tokio::test]
    async fn test_award_preconditions() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_approved_partner(&db, "pre@example.com").await?;

        // Not completed
        let open = create_test_request(&db, "plastic", "3 kg").await?;
        let result = award_points_for_request(&db, open.id, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        // No rule for the type
        let request_id = completed_request(&db, partner.id, "paper", "3 kg").await?;
        let result = award_points_for_request(&db, request_id, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), Error::RewardRuleNotFound { .. }));

        // Quantity without a number
        set_reward_rule(&db, "glass", 5.0).await?;
        let request_id = completed_request(&db, partner.id, "glass", "a few bags").await?;
        let result = award_points_for_request(&db, request_id, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidQuantity { .. }));

        assert_eq!(get_balance(&db, partner.id).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_issue_points_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_test_partner(&db, "bonus@example.com").await?;

        let result = issue_points(&db, partner.id, 0, "nothing").await;
        assert!(matches!(result.unwrap_err(), Error::InvalidPoints { points: 0 }));

        let missing = issue_points(&db, 999, 10, "ghost").await;
        assert!(matches!(missing.unwrap_err(), Error::PartnerNotFound { .. }));

        let row = issue_points(&db, partner.id, 30, "  ").await?;
        assert_eq!(row.description, "Manual credit");
        assert_eq!(list_ledger(&db, partner.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_issue_points_bounds() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_test_partner(&db, "whale@example.com").await?;

        let result = issue_points(&db, partner.id, i64::MAX, "too much").await;
        assert!(matches!(result.unwrap_err(), Error::InvalidPoints { .. }));
        assert!(list_ledger(&db, partner.id).await?.is_empty());

        issue_points(&db, partner.id, MAX_POINTS_PER_ENTRY, "max").await?;
        issue_points(&db, partner.id, 1, "one more").await?;
        assert_eq!(get_balance(&db, partner.id).await?, MAX_POINTS_PER_ENTRY + 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_overflowing_ledger_is_an_error() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_test_partner(&db, "corrupt@example.com").await?;

        // Rows written outside the capped entry points
        append_ledger(&db, partner.id, RewardKind::Earned, i64::MAX, "a".to_string(), None, None)
            .await?;
        append_ledger(&db, partner.id, RewardKind::Earned, 1, "b".to_string(), None, None)
            .await?;

        let balance = get_balance(&db, partner.id).await;
        assert!(matches!(balance.unwrap_err(), Error::PointsOverflow { .. }));
        let credit = issue_points(&db, partner.id, 5, "more").await;
        assert!(matches!(credit.unwrap_err(), Error::PointsOverflow { .. }));
        assert_eq!(list_ledger(&db, partner.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_award_refuses_out_of_range_reward() -> Result<()> {
        let db = setup_test_db().await?;
        set_reward_rule(&db, "metal", 1e300).await?;
        let partner = create_approved_partner(&db, "heavy@example.com").await?;
        let request_id = completed_request(&db, partner.id, "metal", "900 kg").await?;

        let result = award_points_for_request(&db, request_id, Utc::now()).await;
        assert!(matches!(result.unwrap_err(), Error::PointsOverflow { .. }));
        assert_eq!(get_balance(&db, partner.id).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_fixes_drift() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_test_partner(&db, "drift@example.com").await?;
        issue_points(&db, partner.id, 50, "welcome").await?;

        // Corrupt the cache behind the ledger's back
        adjust_cached_points(&db, partner.id, 7).await?;

        let drift = reconcile_reward_points(&db, partner.id).await?;
        assert_eq!(drift, -7);
        let fixed = partner_core::require_partner(&db, partner.id).await?;
        assert_eq!(fixed.reward_points, 50);

        assert_eq!(reconcile_reward_points(&db, partner.id).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_rules_upserts() -> Result<()> {
        let db = setup_test_db().await?;
        let rules = vec![
            RewardRuleConfig {
                waste_type: "Plastic".to_string(),
                points_per_kg: 10.0,
            },
            RewardRuleConfig {
                waste_type: "metal".to_string(),
                points_per_kg: 25.0,
            },
        ];
        assert_eq!(seed_reward_rules(&db, &rules).await?, 2);

        set_reward_rule(&db, "plastic", 12.0).await?;
        let listed = list_reward_rules(&db).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].waste_type, "metal");
        assert_eq!(listed[1].points_per_kg, 12.0);

        let result = set_reward_rule(&db, "paper", -1.0).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_campaign_validation_and_deactivation() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let base = NewCampaign {
            name: "Spring".to_string(),
            multiplier: 1.5,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(1),
            target_waste_types: Vec::new(),
        };

        let mut bad = base.clone();
        bad.multiplier = 0.0;
        assert!(create_campaign(&db, bad).await.is_err());

        let mut backwards = base.clone();
        backwards.ends_at = backwards.starts_at;
        assert!(create_campaign(&db, backwards).await.is_err());

        let created = create_campaign(&db, base).await?;
        assert_eq!(active_campaigns(&db, now).await?.len(), 1);
        assert!(active_campaigns(&db, now + Duration::days(3)).await?.is_empty());

        deactivate_campaign(&db, created.id).await?;
        assert!(active_campaigns(&db, now).await?.is_empty());
        assert_eq!(list_campaigns(&db).await?.len(), 1);

        let missing = deactivate_campaign(&db, 77).await;
        assert!(matches!(missing.unwrap_err(), Error::CampaignNotFound { id: 77 }));
        Ok(())
    }
}
