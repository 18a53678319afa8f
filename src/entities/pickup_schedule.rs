//! Pickup schedule entity - A planned collection slot for an assigned request.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pickup_schedules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub waste_request_id: i64,
    pub partner_id: i64,
    pub scheduled_for: DateTimeUtc,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::waste_request::Entity",
        from = "Column::WasteRequestId",
        to = "super::waste_request::Column::Id"
    )]
    WasteRequest,
    #[sea_orm(
        belongs_to = "super::partner::Entity",
        from = "Column::PartnerId",
        to = "super::partner::Column::Id"
    )]
    Partner,
}

impl ActiveModelBehavior for ActiveModel {}
