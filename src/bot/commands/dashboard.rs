//! Reporting Discord commands - the marketplace dashboard and audit log.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        cache,
        core::{audit, metrics},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Default number of audit entries shown
    const DEFAULT_AUDIT_LIMIT: u64 = 15;
    /// Partners listed in the leaderboard field
    const TOP_PARTNERS: usize = 5;

    /// Shows marketplace metrics.
    #[poise::command(slash_command, prefix_command)]
    pub async fn dashboard(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Recompute instead of using the cached numbers"] refresh: Option<bool>,
    ) -> Result<()> {
        let data = ctx.data();

        let snapshot = if refresh.unwrap_or(false) {
            cache::refresh_dashboard_cache(&data.database, &data.dashboard).await?
        } else {
            cache::cached_dashboard(&data.database, &data.dashboard).await?
        };
        let performance = metrics::load_partner_performance(&data.database).await?;

        let mut leaderboard = String::new();
        for entry in performance.iter().take(TOP_PARTNERS) {
            writeln!(
                leaderboard,
                "Partner {} - {} pickups, {:.1} kg",
                entry.partner_id, entry.completed_requests, entry.quantity_kg
            )?;
        }
        if leaderboard.is_empty() {
            leaderboard.push_str("No completed pickups yet");
        }

        let embed = serenity::CreateEmbed::default()
            .title("♻️ WasteLink Dashboard")
            .description(metrics::format_dashboard_summary(&snapshot))
            .field("Top partners", leaderboard, false)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Generated {}",
                snapshot.generated_at.format("%Y-%m-%d %H:%M UTC")
            )))
            .color(0x002E_7D32_u32);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows the most recent admin actions.
    #[poise::command(slash_command, prefix_command)]
    pub async fn audit_log(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How many entries (default: 15)"] limit: Option<u64>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let entries = audit::list_recent(db, limit.unwrap_or(DEFAULT_AUDIT_LIMIT)).await?;

        if entries.is_empty() {
            ctx.say("The audit log is empty.").await?;
            return Ok(());
        }

        let mut response = String::from("**Audit log**\n");
        for entry in &entries {
            writeln!(
                response,
                "• {} {} `{}` {} {}",
                entry.created_at.format("%Y-%m-%d %H:%M"),
                entry.actor,
                entry.action,
                entry.target_type,
                entry.target_id.as_deref().unwrap_or("-")
            )?;
        }

        ctx.say(response).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
