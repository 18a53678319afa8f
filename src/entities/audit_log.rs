//! Audit log entity - Append-only record of administrative actions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Who performed the action (admin email or Discord id)
    pub actor: String,
    /// Verb, e.g. `"partner.approve"`
    pub action: String,
    /// Collection the action touched
    pub target_type: String,
    pub target_id: Option<String>,
    /// Free-form context
    pub details: Json,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
