//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Partner self-service: registration, sessions, documents and notifications
pub mod account;

/// Dashboard and audit log commands
pub mod dashboard;

/// General utility commands
pub mod general;

/// Partner verification and subscription commands
pub mod partner;

/// Waste request commands
pub mod request;

/// Reward point, rule and campaign commands
pub mod reward;

/// Voucher commands
pub mod voucher;

// Export commands
pub use account::*;
pub use dashboard::*;
pub use general::*;
pub use partner::*;
pub use request::*;
pub use reward::*;
pub use voucher::*;

use crate::{
    bot::BotData,
    errors::{Error, Result},
};
use chrono::{DateTime, TimeDelta, Utc};

/// Audit actor name for the invoking Discord user.
pub(crate) fn actor(ctx: poise::Context<'_, BotData, Error>) -> String {
    format!("discord:{}", ctx.author().id)
}

/// Splits a comma-separated option into trimmed, non-empty entries.
pub(crate) fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn shift_forward(
    now: DateTime<Utc>,
    amount: i64,
    unit: &str,
    to_delta: fn(i64) -> Option<TimeDelta>,
) -> Result<DateTime<Utc>> {
    if amount <= 0 {
        return Err(Error::Validation {
            message: format!("Number of {unit} must be positive, got {amount}"),
        });
    }
    to_delta(amount)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| Error::Validation {
            message: format!("{amount} {unit} from now is out of range"),
        })
}

/// `now` plus a positive number of days typed by an admin.
pub(crate) fn days_from(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    shift_forward(now, days, "days", TimeDelta::try_days)
}

/// `now` plus a positive number of hours typed by an admin.
pub(crate) fn hours_from(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    shift_forward(now, hours, "hours", TimeDelta::try_hours)
}
