//! Voucher entity - A reward-point-redeemable benefit with expiry and a
//! redemption cap. Individual redemptions live in `voucher_redemptions`.

use super::lists::IdList;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum VoucherStatus {
    #[sea_orm(string_value = "available")]
    #[default]
    Available,
    /// Every redemption slot has been used
    #[sea_orm(string_value = "redeemed")]
    Redeemed,
    /// Withdrawn by an admin
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

impl VoucherStatus {
    /// Stable lowercase name, identical to the stored value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Redeemed => "redeemed",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voucher database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Code partners quote when redeeming
    #[sea_orm(unique)]
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    /// Points debited per redemption
    pub points_required: i64,
    pub expiry_date: DateTimeUtc,
    pub status: VoucherStatus,
    pub max_redemptions: i32,
    pub current_redemptions: i32,
    /// Partners allowed to redeem; empty means everyone
    #[sea_orm(column_type = "Json")]
    pub assigned_partners: IdList,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Redemption slots left before the cap is reached
    #[must_use]
    pub const fn remaining_redemptions(&self) -> i32 {
        self.max_redemptions.saturating_sub(self.current_redemptions)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::voucher_redemption::Entity")]
    Redemptions,
}

impl Related<super::voucher_redemption::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Redemptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
