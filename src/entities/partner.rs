//! Partner entity - A waste-collection business account in the marketplace.
//!
//! Partners are created at sign-up with `pending` verification, mutated by admin
//! verification and subscription actions, and never hard-deleted.

use super::lists::StringList;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Document verification state of a partner account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum VerificationStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl VerificationStatus {
    /// Stable lowercase name, identical to the stored value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a partner's paid subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SubscriptionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl SubscriptionStatus {
    /// Stable lowercase name, identical to the stored value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partner database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "partners")]
pub struct Model {
    /// Unique identifier for the partner
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business name
    pub name: String,
    /// Sign-in email, lowercased
    #[sea_orm(unique)]
    pub email: String,
    pub phone: Option<String>,
    /// Current verification state
    pub verification_status: VerificationStatus,
    /// Reason given by the admin on rejection
    pub rejection_reason: Option<String>,
    /// Subscription plan id from the marketplace config
    pub subscription_plan: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub subscription_start: Option<DateTimeUtc>,
    pub subscription_expiry: Option<DateTimeUtc>,
    /// Price paid for the current subscription
    pub subscription_amount: Option<f64>,
    /// Cached reward balance, kept in step with the ledger
    pub reward_points: i64,
    /// Areas the partner collects from
    #[sea_orm(column_type = "Json")]
    pub service_areas: StringList,
    /// Waste types the partner accepts
    #[sea_orm(column_type = "Json")]
    pub supported_waste_types: StringList,
    /// Disabled accounts cannot sign in or receive assignments
    pub is_disabled: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Returns true when the partner holds an active subscription.
    #[must_use]
    pub fn has_active_subscription(&self) -> bool {
        self.subscription_status == Some(SubscriptionStatus::Active)
    }
}

/// Defines relationships between Partner and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One partner has many uploaded documents
    #[sea_orm(has_many = "super::partner_document::Entity")]
    Documents,
    /// One partner has many reward ledger rows
    #[sea_orm(has_many = "super::reward_transaction::Entity")]
    RewardTransactions,
}

impl Related<super::partner_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl Related<super::reward_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RewardTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
