//! Reward campaign entity - A time-bounded multiplier on earned points.

use super::lists::StringList;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_campaigns")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    /// Factor applied to earned points, > 0
    pub multiplier: f64,
    pub starts_at: DateTimeUtc,
    pub ends_at: DateTimeUtc,
    /// Waste types the campaign boosts; empty boosts every type
    #[sea_orm(column_type = "Json")]
    pub target_waste_types: StringList,
    pub is_active: bool,
}

impl Model {
    /// True when the campaign boosts `waste_type` at instant `now`.
    #[must_use]
    pub fn applies_to(&self, waste_type: &str, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at <= now
            && now <= self.ends_at
            && (self.target_waste_types.is_empty()
                || self.target_waste_types.contains_ignore_case(waste_type))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
