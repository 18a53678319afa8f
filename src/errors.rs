//! Unified error type for WasteLink.
//!
//! Every fallible operation in the crate returns [`Result`]. Database errors are
//! folded into the same taxonomy so callers see `NetworkUnavailable` or
//! `AlreadyExists` instead of raw driver messages.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// All errors surfaced by the marketplace.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file or environment problem
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Input rejected before touching the database
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable description
        message: String,
    },

    /// Generic database failure
    #[error("Database error: {0}")]
    Database(String),

    /// The database could not be reached
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// A unique constraint was violated
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Partner not found: {id}")]
    PartnerNotFound { id: String },

    #[error("Waste request not found: {id}")]
    RequestNotFound { id: i64 },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: i64 },

    #[error("Voucher not found: {id}")]
    VoucherNotFound { id: String },

    #[error("Campaign not found: {id}")]
    CampaignNotFound { id: i64 },

    #[error("No active reward rule for waste type '{waste_type}'")]
    RewardRuleNotFound { waste_type: String },

    #[error("Unknown subscription plan '{plan_id}'")]
    PlanNotFound { plan_id: String },

    /// A status change that the lifecycle rules forbid
    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        /// Which state machine rejected the move
        entity: &'static str,
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    #[error("Quantity '{quantity}' has no leading numeric value")]
    InvalidQuantity { quantity: String },

    #[error("Invalid points amount: {points}")]
    InvalidPoints { points: i64 },

    #[error("Points out of range: {context}")]
    PointsOverflow { context: String },

    #[error("Insufficient points: balance {current}, required {required}")]
    InsufficientPoints { current: i64, required: i64 },

    #[error("Waste request {request_id} has already been rewarded")]
    AlreadyRewarded { request_id: i64 },

    #[error("Voucher '{code}' has expired")]
    VoucherExpired { code: String },

    #[error("Voucher '{code}' is not available (status: {status})")]
    VoucherUnavailable { code: String, status: String },

    #[error("Voucher '{code}' has no redemptions left")]
    VoucherExhausted { code: String },

    #[error("Voucher '{code}' is not assigned to partner {partner_id}")]
    VoucherNotAssigned { code: String, partner_id: i64 },

    #[error("Partner {partner_id} already redeemed voucher '{code}'")]
    AlreadyRedeemed { code: String, partner_id: i64 },

    #[error("Email already registered: {email}")]
    EmailAlreadyRegistered { email: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Too many failed sign-in attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },

    #[error("No profile found for {email}")]
    ProfileNotFound { email: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Session is missing or expired")]
    Unauthenticated,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("Integer conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),

    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),
}

impl From<DbErr> for Error {
    fn from(value: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(message)) = value.sql_err() {
            return Self::AlreadyExists(message);
        }
        match value {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => {
                Self::NetworkUnavailable(value.to_string())
            }
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
