//! Reward Discord commands - awarding points, balances, rules and campaigns.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{actor, days_from, split_list},
            handlers::autocomplete,
        },
        core::{
            audit,
            changes::{ChangeEvent, Collection},
            partner,
            reward::{self, NewCampaign},
        },
        errors::{Error, Result},
    };
    use chrono::Utc;
    use serde_json::json;
    use std::fmt::Write;

    /// Ledger rows shown by `/points`
    const RECENT_LEDGER_ROWS: usize = 10;

    /// Rewards a completed request, or credits points to a partner by hand.
    ///
    /// Give `request_id` to reward a completed pickup, or `partner_id` and
    /// `points` for a manual credit.
    #[poise::command(slash_command, prefix_command)]
    pub async fn award_points(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Completed request to reward"] request_id: Option<i64>,
        #[description = "Partner to credit manually"] partner_id: Option<i64>,
        #[description = "Points for a manual credit"] points: Option<i64>,
        #[description = "Reason for a manual credit"] reason: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();

        let row = match (request_id, partner_id, points) {
            (Some(request_id), _, _) => {
                reward::award_points_for_request(&data.database, request_id, Utc::now()).await?
            }
            (None, Some(partner_id), Some(points)) => {
                reward::issue_points(
                    &data.database,
                    partner_id,
                    points,
                    reason.as_deref().unwrap_or_default(),
                )
                .await?
            }
            _ => {
                ctx.say("❌ Give either `request_id`, or both `partner_id` and `points`.")
                    .await?;
                return Ok(());
            }
        };

        audit::record(
            &data.database,
            &actor(ctx),
            "award_points",
            "partner",
            Some(row.partner_id.to_string()),
            json!({
                "points": row.points,
                "waste_request_id": row.waste_request_id,
                "description": row.description,
            }),
        )
        .await;
        data.notify(ChangeEvent::created(Collection::RewardTransactions, row.id));
        data.notify(ChangeEvent::updated(Collection::Partners, row.partner_id));

        let balance = reward::get_balance(&data.database, row.partner_id).await?;
        ctx.say(format!(
            "🎉 Awarded **{}** points to partner {} ({}). Balance: {} points.",
            row.points, row.partner_id, row.description, balance
        ))
        .await?;
        Ok(())
    }

    /// Shows a partner's balance and recent ledger.
    #[poise::command(slash_command, prefix_command)]
    pub async fn points(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Partner id"] partner_id: i64,
        #[description = "Rewrite the cached balance from the ledger"] reconcile: Option<bool>,
    ) -> Result<()> {
        let data = ctx.data();
        let p = partner::require_partner(&data.database, partner_id).await?;

        let mut response = String::new();
        if reconcile.unwrap_or(false) {
            let drift = reward::reconcile_reward_points(&data.database, partner_id).await?;
            if drift != 0 {
                audit::record(
                    &data.database,
                    &actor(ctx),
                    "reconcile_points",
                    "partner",
                    Some(partner_id.to_string()),
                    json!({ "drift": drift }),
                )
                .await;
                data.notify(ChangeEvent::updated(Collection::Partners, partner_id));
            }
            writeln!(response, "🔧 Reconciled, corrected drift of {drift} points.")?;
        }

        let balance = reward::get_balance(&data.database, partner_id).await?;
        let ledger = reward::list_ledger(&data.database, partner_id).await?;

        writeln!(response, "**{}** has **{}** points.", p.name, balance)?;
        if ledger.is_empty() {
            writeln!(response, "No ledger entries yet.")?;
        } else {
            writeln!(response, "Recent activity:")?;
            for row in ledger.iter().take(RECENT_LEDGER_ROWS) {
                writeln!(
                    response,
                    "• {} {:+} - {}",
                    row.created_at.format("%Y-%m-%d"),
                    row.signed_points(),
                    row.description
                )?;
            }
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Sets the points-per-kilogram rate for a waste type.
    #[poise::command(slash_command, prefix_command)]
    pub async fn set_reward_rule(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Waste type"]
        #[autocomplete = "autocomplete::autocomplete_waste_type"]
        waste_type: String,
        #[description = "Points per kilogram"] points_per_kg: f64,
    ) -> Result<()> {
        let data = ctx.data();
        let rule = reward::set_reward_rule(&data.database, &waste_type, points_per_kg).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "set_reward_rule",
            "reward_rule",
            Some(rule.waste_type.clone()),
            json!({ "points_per_kg": points_per_kg }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::RewardRules, rule.id));

        ctx.say(format!(
            "✅ **{}** now earns {} points per kg.",
            rule.waste_type, rule.points_per_kg
        ))
        .await?;
        Ok(())
    }

    /// Starts a points multiplier campaign from now.
    #[poise::command(slash_command, prefix_command)]
    pub async fn add_campaign(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Campaign name"] name: String,
        #[description = "Points multiplier, e.g. 1.5"] multiplier: f64,
        #[description = "How many days it runs"] days: i64,
        #[description = "Comma-separated waste types (default: all)"] waste_types: Option<String>,
    ) -> Result<()> {
        let now = Utc::now();
        let ends_at = days_from(now, days)?;

        let data = ctx.data();
        let campaign = reward::create_campaign(
            &data.database,
            NewCampaign {
                name,
                multiplier,
                starts_at: now,
                ends_at,
                target_waste_types: split_list(waste_types.as_deref()),
            },
        )
        .await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "add_campaign",
            "reward_campaign",
            Some(campaign.id.to_string()),
            json!({ "multiplier": campaign.multiplier, "days": days }),
        )
        .await;
        data.notify(ChangeEvent::created(Collection::RewardCampaigns, campaign.id));

        let targets = if campaign.target_waste_types.is_empty() {
            "all waste types".to_string()
        } else {
            campaign.target_waste_types.0.join(", ")
        };
        ctx.say(format!(
            "📣 **{}** x{} on {} until {}.",
            campaign.name,
            campaign.multiplier,
            targets,
            campaign.ends_at.format("%Y-%m-%d")
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
