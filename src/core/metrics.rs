//! Dashboard metrics.
//!
//! Everything here is recomputed from scratch out of the current rows; nothing
//! is persisted. The pure functions take slices so they can be tested without a
//! database, and `compute_dashboard` is the thin loader around them.

use crate::{
    entities::{
        Partner, RequestStatus, RewardKind, RewardTransaction, VerificationStatus, WasteRequest,
        partner, reward_transaction, waste_request,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Kilograms of CO2 avoided per kilogram of waste collected.
pub const CO2_KG_PER_KG_WASTE: f64 = 2.5;

/// Largest quantity a single request may report.
pub const MAX_QUANTITY_KG: f64 = 1_000_000.0;

/// Reads the leading numeric token of a free-text quantity such as `"12.5 kg"`.
///
/// Leading whitespace is skipped, the number may carry one decimal point and
/// whatever follows it (the unit) is ignored. Returns `None` when the text does
/// not start with a number or the number exceeds [`MAX_QUANTITY_KG`].
#[must_use]
pub fn parse_quantity_kg(quantity: &str) -> Option<f64> {
    let trimmed = quantity.trim_start();
    let mut seen_dot = false;
    let mut end = 0;

    for (index, ch) in trimmed.char_indices() {
        if ch.is_ascii_digit() {
            end = index + 1;
        } else if ch == '.' && !seen_dot {
            seen_dot = true;
            end = index + 1;
        } else {
            break;
        }
    }

    trimmed[..end]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value <= MAX_QUANTITY_KG)
}

/// Environmental impact of completed pickups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImpactSummary {
    /// Number of completed requests considered
    pub completed_requests: usize,
    /// Sum of every parseable quantity
    pub total_quantity_kg: f64,
    /// `total_quantity_kg * CO2_KG_PER_KG_WASTE`
    pub co2_saved_kg: f64,
    /// Quantity per lowercased waste type
    pub waste_by_type: BTreeMap<String, f64>,
    /// Completed requests whose quantity could not be read; they count as zero
    pub unparsed_quantities: usize,
}

impl ImpactSummary {
    /// Builds the summary from a list of requests, skipping any that are not completed.
    #[must_use]
    pub fn from_completed(requests: &[waste_request::Model]) -> Self {
        let mut summary = Self::default();

        for request in requests
            .iter()
            .filter(|r| r.status == RequestStatus::Completed)
        {
            summary.completed_requests += 1;
            let Some(quantity) = parse_quantity_kg(&request.quantity) else {
                debug!(
                    "Request {} has unreadable quantity '{}'",
                    request.id, request.quantity
                );
                summary.unparsed_quantities += 1;
                continue;
            };

            summary.total_quantity_kg += quantity;
            *summary
                .waste_by_type
                .entry(request.waste_type.trim().to_lowercase())
                .or_insert(0.0) += quantity;
        }

        summary.co2_saved_kg = summary.total_quantity_kg * CO2_KG_PER_KG_WASTE;
        summary
    }
}

/// Request counts per lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub assigned: usize,
    pub accepted: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl StatusCounts {
    fn record(&mut self, status: RequestStatus) {
        match status {
            RequestStatus::Assigned => self.assigned += 1,
            RequestStatus::Accepted => self.accepted += 1,
            RequestStatus::InProgress => self.in_progress += 1,
            RequestStatus::Completed => self.completed += 1,
        }
    }
}

/// Everything the admin dashboard shows.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardMetrics {
    pub total_requests: usize,
    pub requests_by_status: StatusCounts,
    /// Completed share of all requests, 0 when there are none
    pub completion_rate_percent: f64,
    pub impact: ImpactSummary,
    pub partners_pending: usize,
    pub partners_approved: usize,
    pub partners_rejected: usize,
    pub active_subscriptions: usize,
    /// Sum of the amounts paid on active subscriptions
    pub subscription_revenue: f64,
    pub points_issued: i64,
    pub points_redeemed: i64,
    pub generated_at: DateTime<Utc>,
}

impl DashboardMetrics {
    /// Reduces in-memory rows into dashboard totals.
    ///
    /// Fails with `PointsOverflow` when the ledger totals do not fit an `i64`.
    pub fn compute(
        requests: &[waste_request::Model],
        partners: &[partner::Model],
        transactions: &[reward_transaction::Model],
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut requests_by_status = StatusCounts::default();
        for request in requests {
            requests_by_status.record(request.status);
        }

        #[allow(clippy::cast_precision_loss)] // Request counts are far below 2^52
        let completion_rate_percent = if requests.is_empty() {
            0.0
        } else {
            (requests_by_status.completed as f64 / requests.len() as f64) * 100.0
        };

        let count_status = |status: VerificationStatus| {
            partners
                .iter()
                .filter(|p| p.verification_status == status)
                .count()
        };

        let subscribed: Vec<&partner::Model> = partners
            .iter()
            .filter(|p| p.has_active_subscription())
            .collect();

        let (points_issued, points_redeemed) = transactions
            .iter()
            .try_fold((0_i64, 0_i64), |(issued, redeemed), tx| match tx.kind {
                RewardKind::Earned => Some((issued.checked_add(tx.points)?, redeemed)),
                RewardKind::Redeemed => Some((issued, redeemed.checked_add(tx.points)?)),
            })
            .ok_or_else(|| Error::PointsOverflow {
                context: "dashboard ledger totals".to_string(),
            })?;

        Ok(Self {
            total_requests: requests.len(),
            requests_by_status,
            completion_rate_percent,
            impact: ImpactSummary::from_completed(requests),
            partners_pending: count_status(VerificationStatus::Pending),
            partners_approved: count_status(VerificationStatus::Approved),
            partners_rejected: count_status(VerificationStatus::Rejected),
            active_subscriptions: subscribed.len(),
            subscription_revenue: subscribed
                .iter()
                .filter_map(|p| p.subscription_amount)
                .sum(),
            points_issued,
            points_redeemed,
            generated_at: now,
        })
    }
}

/// Loads every request, partner and ledger row and computes the dashboard.
pub async fn compute_dashboard(db: &DatabaseConnection) -> Result<DashboardMetrics> {
    let requests = WasteRequest::find().all(db).await?;
    let partners = Partner::find().all(db).await?;
    let transactions = RewardTransaction::find().all(db).await?;

    debug!(
        "Computing dashboard over {} requests, {} partners, {} ledger rows",
        requests.len(),
        partners.len(),
        transactions.len()
    );

    DashboardMetrics::compute(&requests, &partners, &transactions, Utc::now())
}

/// Completed work attributed to one partner.
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerPerformance {
    pub partner_id: i64,
    pub completed_requests: usize,
    pub quantity_kg: f64,
}

/// Groups completed requests by assigned partner, largest quantity first.
#[must_use]
pub fn partner_performance(requests: &[waste_request::Model]) -> Vec<PartnerPerformance> {
    let mut by_partner: HashMap<i64, PartnerPerformance> = HashMap::new();

    for request in requests
        .iter()
        .filter(|r| r.status == RequestStatus::Completed)
    {
        let Some(partner_id) = request.assigned_partner_id else {
            continue;
        };
        let entry = by_partner
            .entry(partner_id)
            .or_insert_with(|| PartnerPerformance {
                partner_id,
                completed_requests: 0,
                quantity_kg: 0.0,
            });
        entry.completed_requests += 1;
        entry.quantity_kg += parse_quantity_kg(&request.quantity).unwrap_or(0.0);
    }

    let mut performance: Vec<PartnerPerformance> = by_partner.into_values().collect();
    performance.sort_by(|a, b| {
        b.quantity_kg
            .total_cmp(&a.quantity_kg)
            .then(a.partner_id.cmp(&b.partner_id))
    });
    performance
}

/// Loads completed requests and ranks partners by collected quantity.
pub async fn load_partner_performance(db: &DatabaseConnection) -> Result<Vec<PartnerPerformance>> {
    let completed = WasteRequest::find()
        .filter(waste_request::Column::Status.eq(RequestStatus::Completed))
        .all(db)
        .await?;
    Ok(partner_performance(&completed))
}

/// Formats dashboard metrics into a multi-line summary for chat or logs.
#[must_use]
pub fn format_dashboard_summary(metrics: &DashboardMetrics) -> String {
    use std::fmt::Write;

    let mut summary = format!(
        "Requests: {} total | {} assigned | {} accepted | {} in progress | {} completed ({:.1}%)\n",
        metrics.total_requests,
        metrics.requests_by_status.assigned,
        metrics.requests_by_status.accepted,
        metrics.requests_by_status.in_progress,
        metrics.requests_by_status.completed,
        metrics.completion_rate_percent
    );

    // Writing to a String cannot fail
    let _ = writeln!(
        summary,
        "Collected: {:.1} kg | CO2 saved: {:.1} kg",
        metrics.impact.total_quantity_kg, metrics.impact.co2_saved_kg
    );
    for (waste_type, quantity) in &metrics.impact.waste_by_type {
        let _ = writeln!(summary, "  {waste_type}: {quantity:.1} kg");
    }
    if metrics.impact.unparsed_quantities > 0 {
        let _ = writeln!(
            summary,
            "  ({} completed requests with unreadable quantity)",
            metrics.impact.unparsed_quantities
        );
    }
    let _ = writeln!(
        summary,
        "Partners: {} pending | {} approved | {} rejected",
        metrics.partners_pending, metrics.partners_approved, metrics.partners_rejected
    );
    let _ = writeln!(
        summary,
        "Subscriptions: {} active | revenue {:.2}",
        metrics.active_subscriptions, metrics.subscription_revenue
    );
    let _ = write!(
        summary,
        "Points: {} issued | {} redeemed",
        metrics.points_issued, metrics.points_redeemed
    );

    summary
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::{StringList, SubscriptionStatus};
    use crate::test_utils::sample_request;

    fn completed(id: i64, waste_type: &str, quantity: &str, partner: Option<i64>) -> waste_request::Model {
        let mut request = sample_request(id, waste_type, quantity);
        request.status = RequestStatus::Completed;
        request.assigned_partner_id = partner;
        request
    }

    fn sample_partner(id: i64, status: VerificationStatus) -> partner::Model {
        let now = Utc::now();
        partner::Model {
            id,
            name: format!("Partner {id}"),
            email: format!("p{id}@example.com"),
            phone: None,
            verification_status: status,
            rejection_reason: None,
            subscription_plan: None,
            subscription_status: None,
            subscription_start: None,
            subscription_expiry: None,
            subscription_amount: None,
            reward_points: 0,
            service_areas: StringList::default(),
            supported_waste_types: StringList::default(),
            is_disabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_parse_quantity_with_unit() {
        assert_eq!(parse_quantity_kg("12.5 kg"), Some(12.5));
        assert_eq!(parse_quantity_kg("  40kg"), Some(40.0));
        assert_eq!(parse_quantity_kg("7"), Some(7.0));
    }

    #[test]
    fn test_parse_quantity_stops_at_second_dot() {
        assert_eq!(parse_quantity_kg("1.2.3 kg"), Some(1.2));
    }

    #[test]
    fn test_parse_quantity_rejects_non_numeric_prefix() {
        assert_eq!(parse_quantity_kg("about 5 kg"), None);
        assert_eq!(parse_quantity_kg(""), None);
        assert_eq!(parse_quantity_kg("kg"), None);
        assert_eq!(parse_quantity_kg("."), None);
        assert_eq!(parse_quantity_kg("-3 kg"), None);
    }

    #[test]
    fn test_impact_summary_totals() {
        let requests = vec![
            completed(1, "Plastic", "10 kg", Some(1)),
            completed(2, "plastic", "5.5 kg", Some(1)),
            completed(3, "Glass", "4 kg", Some(2)),
            sample_request(4, "metal", "100 kg"), // not completed
        ];

        let summary = ImpactSummary::from_completed(&requests);
        assert_eq!(summary.completed_requests, 3);
        assert_eq!(summary.total_quantity_kg, 19.5);
        assert_eq!(summary.co2_saved_kg, 19.5 * 2.5);
        assert_eq!(summary.waste_by_type.get("plastic"), Some(&15.5));
        assert_eq!(summary.waste_by_type.get("glass"), Some(&4.0));
        assert!(!summary.waste_by_type.contains_key("metal"));
        assert_eq!(summary.unparsed_quantities, 0);
    }

    #[test]
    fn test_impact_summary_counts_unparsed_as_zero() {
        let requests = vec![
            completed(1, "paper", "a few bags", None),
            completed(2, "paper", "3 kg", None),
        ];
        let summary = ImpactSummary::from_completed(&requests);
        assert_eq!(summary.total_quantity_kg, 3.0);
        assert_eq!(summary.unparsed_quantities, 1);
        assert_eq!(summary.completed_requests, 2);
    }

    #[test]
    fn test_parse_quantity_rejects_absurd_amounts() {
        assert_eq!(parse_quantity_kg("1000000 kg"), Some(MAX_QUANTITY_KG));
        assert_eq!(parse_quantity_kg("1000001 kg"), None);
        assert_eq!(parse_quantity_kg(&"9".repeat(400)), None);
    }

    #[test]
    fn test_dashboard_compute() -> Result<()> {
        let requests = vec![
            completed(1, "plastic", "10 kg", Some(1)),
            sample_request(2, "glass", "2 kg"),
            sample_request(3, "glass", "2 kg"),
            completed(4, "glass", "6 kg", Some(2)),
        ];

        let mut subscribed = sample_partner(1, VerificationStatus::Approved);
        subscribed.subscription_status = Some(SubscriptionStatus::Active);
        subscribed.subscription_amount = Some(499.0);
        let mut lapsed = sample_partner(2, VerificationStatus::Approved);
        lapsed.subscription_status = Some(SubscriptionStatus::Expired);
        lapsed.subscription_amount = Some(999.0);
        let partners = vec![
            subscribed,
            lapsed,
            sample_partner(3, VerificationStatus::Pending),
            sample_partner(4, VerificationStatus::Rejected),
        ];

        let now = Utc::now();
        let ledger = |id, kind, points| reward_transaction::Model {
            id,
            partner_id: 1,
            kind,
            points,
            description: String::new(),
            waste_request_id: None,
            voucher_id: None,
            created_at: now,
        };
        let transactions = vec![
            ledger(1, RewardKind::Earned, 100),
            ledger(2, RewardKind::Earned, 50),
            ledger(3, RewardKind::Redeemed, 30),
        ];

        let metrics = DashboardMetrics::compute(&requests, &partners, &transactions, now)?;
        assert_eq!(metrics.total_requests, 4);
        assert_eq!(metrics.requests_by_status.completed, 2);
        assert_eq!(metrics.requests_by_status.assigned, 2);
        assert_eq!(metrics.completion_rate_percent, 50.0);
        assert_eq!(metrics.impact.total_quantity_kg, 16.0);
        assert_eq!(metrics.partners_approved, 2);
        assert_eq!(metrics.partners_pending, 1);
        assert_eq!(metrics.partners_rejected, 1);
        assert_eq!(metrics.active_subscriptions, 1);
        assert_eq!(metrics.subscription_revenue, 499.0);
        assert_eq!(metrics.points_issued, 150);
        assert_eq!(metrics.points_redeemed, 30);

        let overflowing = vec![
            ledger(4, RewardKind::Earned, i64::MAX),
            ledger(5, RewardKind::Earned, 1),
        ];
        let result = DashboardMetrics::compute(&[], &[], &overflowing, now);
        assert!(matches!(result, Err(Error::PointsOverflow { .. })));
        Ok(())
    }

    #[test]
    fn test_dashboard_empty() -> Result<()> {
        let metrics = DashboardMetrics::compute(&[], &[], &[], Utc::now())?;
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.completion_rate_percent, 0.0);
        assert_eq!(metrics.impact, ImpactSummary::default());
        Ok(())
    }

    #[test]
    fn test_partner_performance_ordering() {
        let requests = vec![
            completed(1, "plastic", "10 kg", Some(1)),
            completed(2, "plastic", "30 kg", Some(2)),
            completed(3, "plastic", "5 kg", Some(1)),
            completed(4, "plastic", "5 kg", None),
        ];
        let performance = partner_performance(&requests);
        assert_eq!(performance.len(), 2);
        assert_eq!(performance[0].partner_id, 2);
        assert_eq!(performance[0].quantity_kg, 30.0);
        assert_eq!(performance[1].partner_id, 1);
        assert_eq!(performance[1].completed_requests, 2);
    }

    #[test]
    fn test_format_dashboard_summary_mentions_unparsed() -> Result<()> {
        let requests = vec![completed(1, "paper", "lots", None)];
        let metrics = DashboardMetrics::compute(&requests, &[], &[], Utc::now())?;
        let summary = format_dashboard_summary(&metrics);
        assert!(summary.contains("1 completed requests with unreadable quantity"));
        assert!(summary.contains("Points: 0 issued"));
        Ok(())
    }

    #[tokio::test]
    async fn test_compute_dashboard_from_database() -> Result<()> {
        use crate::core::{reward, waste_request::{assign_partner, update_status}};
        use crate::test_utils::{create_approved_partner, create_test_request, setup_test_db};

        let db = setup_test_db().await?;
        let partner = create_approved_partner(&db, "dash@example.com").await?;
        let request = create_test_request(&db, "plastic", "8 kg").await?;
        create_test_request(&db, "glass", "2 kg").await?;
        assign_partner(&db, request.id, partner.id).await?;
        for status in [
            RequestStatus::Accepted,
            RequestStatus::InProgress,
            RequestStatus::Completed,
        ] {
            update_status(&db, request.id, status).await?;
        }
        reward::issue_points(&db, partner.id, 40, "bonus").await?;

        let metrics = compute_dashboard(&db).await?;
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.completion_rate_percent, 50.0);
        assert_eq!(metrics.impact.co2_saved_kg, 20.0);
        assert_eq!(metrics.partners_approved, 1);
        assert_eq!(metrics.points_issued, 40);

        let performance = load_partner_performance(&db).await?;
        assert_eq!(performance.len(), 1);
        assert_eq!(performance[0].partner_id, partner.id);
        Ok(())
    }
}
