//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    ///
    /// This is a simple health check command that doesn't require any database operations.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**WasteLink Help**\n\n\
        **Your account** (open to everyone, replies are private)\n\
        • `/register_partner <email> <password> <name>` - Signs up as a partner.\n\
        • `/sign_in <email> <password>` / `/sign_out <token>` / `/whoami <token>` - Sessions.\n\
        • `/upload_document <token> <type> <url>` - Submits a verification document.\n\
        • `/notifications <token>` / `/read_notification <token> <id>` - Your inbox.\n\n\
        Everything below is limited to marketplace admins.\n\n\
        **Partners**\n\
        • `/partners [status]` - Lists partners, optionally by verification status.\n\
        • `/partner <id>` - Shows a partner's profile, documents and points.\n\
        • `/update_partner <id> ...` / `/disable_partner <id> [disabled]` - Edits an account.\n\
        • `/approve_partner <id>` / `/reject_partner <id> <reason>` - Reviews a pending partner.\n\
        • `/verify_document <document_id>` - Marks an uploaded document as verified.\n\
        • `/subscribe_partner <id> <plan>` / `/cancel_subscription <id>` - Manages subscriptions.\n\n\
        **Pickups**\n\
        • `/submit_request <type> <quantity> <location>` - Files a pickup request.\n\
        • `/recommend <type> <location>` - Suggests the best partner.\n\
        • `/assign_request <request_id> <partner_id>` - Assigns a partner.\n\
        • `/set_request_status <request_id> <status>` - Moves a request forward.\n\
        • `/requests [status] [partner_id]` - Lists requests.\n\n\
        **Rewards**\n\
        • `/award_points` - Rewards a completed request or credits points manually.\n\
        • `/points <partner_id>` - Shows a partner's balance and recent ledger.\n\
        • `/set_reward_rule <type> <points_per_kg>` - Sets a reward rate.\n\
        • `/add_campaign <name> <multiplier> <days>` - Starts a points campaign.\n\
        • `/create_voucher`, `/redeem_voucher`, `/vouchers` - Manages vouchers.\n\
        • `/assign_voucher <code> <partner_id>` / `/deactivate_voucher <code>` - Restricts or withdraws one.\n\n\
        **Reporting**\n\
        • `/dashboard [refresh]` - Shows marketplace metrics.\n\
        • `/audit_log [limit]` - Shows recent admin actions.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
