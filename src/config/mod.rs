/// Admin Discord account configuration from environment variables
pub mod admins;

/// Database configuration and connection management
pub mod database;

/// Marketplace configuration loading from config.toml
pub mod marketplace;
