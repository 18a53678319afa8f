//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggests waste types from the stored reward rules and subscription plans
//! from the marketplace configuration.

use crate::{bot::BotData, core::reward, errors::Error};

/// Discord's cap on autocomplete suggestions
const MAX_SUGGESTIONS: usize = 25;

fn matching(candidates: impl IntoIterator<Item = String>, partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    let mut matches: Vec<String> = candidates
        .into_iter()
        .filter(|c| c.to_lowercase().contains(&partial_lower))
        .take(MAX_SUGGESTIONS)
        .collect();
    matches.sort();
    matches
}

/// Provides autocomplete suggestions for waste types.
///
/// Waste types come from the active reward rules, so only rewardable types are
/// suggested. Free text is still accepted by the commands.
pub async fn autocomplete_waste_type(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let db = &ctx.data().database;

    let Ok(rules) = reward::list_reward_rules(db).await else {
        return Vec::new();
    };

    matching(
        rules
            .into_iter()
            .filter(|rule| rule.is_active)
            .map(|rule| rule.waste_type),
        partial,
    )
}

/// Provides autocomplete suggestions for subscription plan ids.
#[allow(clippy::unused_async)] // poise awaits every autocomplete callback
pub async fn autocomplete_plan(ctx: poise::Context<'_, BotData, Error>, partial: &str) -> Vec<String> {
    matching(
        ctx.data()
            .config
            .subscription_plans
            .iter()
            .map(|plan| plan.id.clone()),
        partial,
    )
}
