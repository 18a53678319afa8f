//! Reward transaction entity - Append-only points ledger.
//!
//! `points` is always stored as a non-negative magnitude; the sign comes from
//! `kind` (earned credits, redeemed debits). A partner's balance is the sum of
//! the signed points over all of their rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RewardKind {
    #[sea_orm(string_value = "earned")]
    Earned,
    #[sea_orm(string_value = "redeemed")]
    Redeemed,
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Earned => f.write_str("earned"),
            Self::Redeemed => f.write_str("redeemed"),
        }
    }
}

/// Reward transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub partner_id: i64,
    pub kind: RewardKind,
    /// Magnitude of the movement, never negative
    pub points: i64,
    pub description: String,
    /// Completed request that earned these points
    pub waste_request_id: Option<i64>,
    /// Voucher these points were spent on
    pub voucher_id: Option<i64>,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Points with the sign implied by `kind`
    #[must_use]
    pub const fn signed_points(&self) -> i64 {
        match self.kind {
            RewardKind::Earned => self.points,
            RewardKind::Redeemed => -self.points,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::partner::Entity",
        from = "Column::PartnerId",
        to = "super::partner::Column::Id"
    )]
    Partner,
}

impl Related<super::partner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Partner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
