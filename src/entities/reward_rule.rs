//! Reward rule entity - Points-per-kilogram rate for one waste type.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_rules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Lowercased waste type
    #[sea_orm(unique)]
    pub waste_type: String,
    pub points_per_kg: f64,
    pub is_active: bool,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
