//! Admin account configuration loaded from environment variables.
//!
//! Only Discord users listed in `ADMIN_DISCORD_IDS` may run bot commands.
//! The list is comma-separated; whitespace and empty entries are ignored.

use std::collections::HashSet;

/// Parses a comma-separated list of Discord user ids.
#[must_use]
pub fn parse_admin_ids(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Reads the admin id set from `ADMIN_DISCORD_IDS`.
///
/// Returns an empty set when the variable is missing, which locks every command.
#[must_use]
pub fn get_admin_discord_ids() -> HashSet<String> {
    std::env::var("ADMIN_DISCORD_IDS")
        .map(|raw| parse_admin_ids(&raw))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids_trims_and_skips_empty() {
        let ids = parse_admin_ids(" 123, 456 ,,789 ");
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("123"));
        assert!(ids.contains("456"));
        assert!(ids.contains("789"));
    }

    #[test]
    fn test_parse_admin_ids_empty() {
        assert!(parse_admin_ids("").is_empty());
        assert!(parse_admin_ids(" , ").is_empty());
    }
}
