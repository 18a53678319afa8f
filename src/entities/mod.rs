//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the marketplace collections and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod admin;
pub mod audit_log;
pub mod identity;
pub mod lists;
pub mod notification;
pub mod partner;
pub mod partner_document;
pub mod pickup_schedule;
pub mod reward_campaign;
pub mod reward_rule;
pub mod reward_transaction;
pub mod voucher;
pub mod voucher_redemption;
pub mod waste_request;

// Re-export specific types to avoid conflicts
pub use admin::{Column as AdminColumn, Entity as Admin, Model as AdminModel};
pub use audit_log::{Column as AuditLogColumn, Entity as AuditLog, Model as AuditLogModel};
pub use identity::{Column as IdentityColumn, Entity as Identity, Model as IdentityModel};
pub use lists::{IdList, StringList};
pub use notification::{
    Column as NotificationColumn, Entity as Notification, Model as NotificationModel,
};
pub use partner::{
    Column as PartnerColumn, Entity as Partner, Model as PartnerModel, SubscriptionStatus,
    VerificationStatus,
};
pub use partner_document::{
    Column as PartnerDocumentColumn, Entity as PartnerDocument, Model as PartnerDocumentModel,
};
pub use pickup_schedule::{
    Column as PickupScheduleColumn, Entity as PickupSchedule, Model as PickupScheduleModel,
};
pub use reward_campaign::{
    Column as RewardCampaignColumn, Entity as RewardCampaign, Model as RewardCampaignModel,
};
pub use reward_rule::{Column as RewardRuleColumn, Entity as RewardRule, Model as RewardRuleModel};
pub use reward_transaction::{
    Column as RewardTransactionColumn, Entity as RewardTransaction,
    Model as RewardTransactionModel, RewardKind,
};
pub use voucher::{Column as VoucherColumn, Entity as Voucher, Model as VoucherModel, VoucherStatus};
pub use voucher_redemption::{
    Column as VoucherRedemptionColumn, Entity as VoucherRedemption,
    Model as VoucherRedemptionModel,
};
pub use waste_request::{
    Column as WasteRequestColumn, Entity as WasteRequest, Model as WasteRequestModel,
    RequestStatus,
};
