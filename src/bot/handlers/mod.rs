//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions such as autocomplete,
//! button clicks, and other non-command interactions.

/// Autocomplete handlers for waste types and subscription plans
pub mod autocomplete;
