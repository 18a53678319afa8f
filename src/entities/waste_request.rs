//! Waste request entity - A pickup job submitted by or on behalf of a partner.
//!
//! The `quantity` column is free text (e.g. `"12.5 kg"`); numeric aggregation
//! parses its leading token, see `core::metrics::parse_quantity_kg`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pickup lifecycle. Transitions are validated in `core::lifecycle`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RequestStatus {
    #[sea_orm(string_value = "assigned")]
    #[default]
    Assigned,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl RequestStatus {
    /// Stable lowercase name, identical to the stored value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Parses a status name, accepting the display forms admins type
    /// ("In Progress", "in-progress", "in_progress").
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "assigned" => Some(Self::Assigned),
            "accepted" => Some(Self::Accepted),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Waste request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "waste_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Classified waste type (e.g. "plastic")
    pub waste_type: String,
    /// Classifier confidence, 0-100
    pub confidence: f64,
    /// Free-text quantity, number followed by a unit
    pub quantity: String,
    /// Pickup address
    pub location: String,
    pub status: RequestStatus,
    /// Partner doing the pickup, if any
    pub assigned_partner_id: Option<i64>,
    /// Partner suggested at submission time
    pub recommended_partner_id: Option<i64>,
    /// Who filed the request
    pub submitted_by: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request may be assigned to one partner
    #[sea_orm(
        belongs_to = "super::partner::Entity",
        from = "Column::AssignedPartnerId",
        to = "super::partner::Column::Id"
    )]
    AssignedPartner,
}

impl Related<super::partner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssignedPartner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
