//! Marketplace configuration loading from config.toml
//!
//! The TOML file seeds reward rules, lists the subscription plans admins can
//! sell, tunes sign-in throttling, and names the admin accounts to bootstrap.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketplaceConfig {
    /// Points-per-kilogram rates to seed
    #[serde(default)]
    pub reward_rules: Vec<RewardRuleConfig>,
    /// Plans available to partners
    #[serde(default)]
    pub subscription_plans: Vec<SubscriptionPlan>,
    /// Sign-in throttling
    #[serde(default)]
    pub auth: AuthConfig,
    /// Admin accounts created on startup when missing
    #[serde(default)]
    pub admins: Vec<AdminConfig>,
}

impl MarketplaceConfig {
    /// Looks up a subscription plan by id (case-insensitive).
    #[must_use]
    pub fn plan(&self, plan_id: &str) -> Option<&SubscriptionPlan> {
        self.subscription_plans
            .iter()
            .find(|plan| plan.id.eq_ignore_ascii_case(plan_id))
    }
}

/// Reward rate for a single waste type
#[derive(Debug, Deserialize, Clone)]
pub struct RewardRuleConfig {
    /// Waste type, matched case-insensitively
    pub waste_type: String,
    /// Points awarded per kilogram collected
    pub points_per_kg: f64,
}

/// A subscription plan partners can be enrolled in
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SubscriptionPlan {
    /// Stable identifier stored on the partner
    pub id: String,
    /// Display name
    pub name: String,
    /// Price charged per period
    pub price: f64,
    /// Length of one period in days
    pub duration_days: i64,
}

/// Sign-in throttling settings
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct AuthConfig {
    /// Consecutive failures allowed before an email is locked out
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    /// How long a lockout lasts
    #[serde(default = "default_lockout_minutes")]
    pub lockout_minutes: i64,
}

const fn default_max_failed_attempts() -> u32 {
    5
}

const fn default_lockout_minutes() -> i64 {
    15
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: default_max_failed_attempts(),
            lockout_minutes: default_lockout_minutes(),
        }
    }
}

/// Admin account to bootstrap
#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    pub email: String,
    pub display_name: String,
}

/// Loads marketplace configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A reward rate is negative or a plan has a non-positive duration
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MarketplaceConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<MarketplaceConfig> {
    let config: MarketplaceConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if let Some(rule) = config
        .reward_rules
        .iter()
        .find(|rule| !rule.points_per_kg.is_finite() || rule.points_per_kg < 0.0)
    {
        return Err(Error::Config {
            message: format!(
                "Reward rule for '{}' has invalid points_per_kg {}",
                rule.waste_type, rule.points_per_kg
            ),
        });
    }

    if let Some(plan) = config
        .subscription_plans
        .iter()
        .find(|plan| plan.duration_days <= 0 || plan.price < 0.0)
    {
        return Err(Error::Config {
            message: format!("Subscription plan '{}' is invalid", plan.id),
        });
    }

    Ok(config)
}

/// Loads configuration from `WASTELINK_CONFIG`, or ./config.toml by default
pub fn load_default_config() -> Result<MarketplaceConfig> {
    let path = std::env::var("WASTELINK_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_marketplace_config() {
        let toml_str = r#"
            [[reward_rules]]
            waste_type = "plastic"
            points_per_kg = 10.0

            [[reward_rules]]
            waste_type = "e-waste"
            points_per_kg = 25.0

            [[subscription_plans]]
            id = "basic"
            name = "Basic"
            price = 499.0
            duration_days = 30

            [auth]
            max_failed_attempts = 3

            [[admins]]
            email = "ops@wastelink.test"
            display_name = "Ops"
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.reward_rules.len(), 2);
        assert_eq!(config.reward_rules[1].points_per_kg, 25.0);
        assert_eq!(config.plan("BASIC").unwrap().duration_days, 30);
        assert_eq!(config.auth.max_failed_attempts, 3);
        assert_eq!(config.auth.lockout_minutes, 15);
        assert_eq!(config.admins[0].display_name, "Ops");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert!(config.reward_rules.is_empty());
        assert_eq!(config.auth, AuthConfig::default());
    }

    #[test]
    fn test_negative_rate_rejected() {
        let toml_str = r#"
            [[reward_rules]]
            waste_type = "glass"
            points_per_kg = -1.0
        "#;
        assert!(matches!(
            parse_config(toml_str).unwrap_err(),
            Error::Config { message: _ }
        ));
    }

    #[test]
    fn test_zero_duration_plan_rejected() {
        let toml_str = r#"
            [[subscription_plans]]
            id = "broken"
            name = "Broken"
            price = 10.0
            duration_days = 0
        "#;
        assert!(parse_config(toml_str).is_err());
    }
}
