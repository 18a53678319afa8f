//! Partner document entity - Verification paperwork uploaded by a partner.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Partner document database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "partner_documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning partner
    pub partner_id: i64,
    /// Kind of document (e.g. "business_license", "tax_certificate")
    pub doc_type: String,
    /// Where the file is stored
    pub url: String,
    pub uploaded_at: DateTimeUtc,
    /// Set by an admin after review
    pub verified: bool,
    pub verified_at: Option<DateTimeUtc>,
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
