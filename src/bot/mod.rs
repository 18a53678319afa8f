//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for WasteLink admins, including
//! all slash commands, autocomplete handlers, and bot context management.

/// Discord command implementations (partners, requests, rewards, vouchers, dashboard)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;

use crate::{
    cache::{self, DashboardCache},
    config::marketplace::MarketplaceConfig,
    core::{
        auth::AuthGateway,
        changes::{ChangeEvent, ChangeFeed},
    },
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::{collections::HashSet, sync::Arc};
use tracing::{error, info, warn};

/// Shared data available to all bot commands.
/// This structure holds the database connection and the rest of the global
/// state that commands need to access.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Reward rules, plans and auth settings from `config.toml`
    pub config: Arc<MarketplaceConfig>,
    /// Partner registration, sign-in and sessions
    pub auth: Arc<AuthGateway>,
    /// Change notifications for listeners such as the dashboard cache
    pub changes: ChangeFeed,
    /// Last computed dashboard
    pub dashboard: DashboardCache,
    /// Discord user ids allowed to run admin commands
    pub admin_ids: HashSet<String>,
}

impl BotData {
    /// Creates a new `BotData` instance.
    /// This is typically called during bot initialization to set up the
    /// shared context for all commands.
    #[must_use]
    pub fn new(
        database: DatabaseConnection,
        config: Arc<MarketplaceConfig>,
        auth: Arc<AuthGateway>,
        admin_ids: HashSet<String>,
    ) -> Self {
        Self {
            database,
            config,
            auth,
            changes: ChangeFeed::default(),
            dashboard: cache::new_dashboard_cache(),
            admin_ids,
        }
    }

    /// Publishes a change notice after a successful write.
    pub fn notify(&self, event: ChangeEvent) {
        let listeners = self.changes.publish(event);
        tracing::trace!("{:?} delivered to {} listeners", event, listeners);
    }

    /// True when `user_id` is a configured admin.
    #[must_use]
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.contains(user_id)
    }
}

/// Poise context used by every command.
pub type Context<'a> = poise::Context<'a, BotData, Error>;

/// Commands anyone may run. Partner actions among them check a session token.
const PUBLIC_COMMANDS: [&str; 9] = [
    "ping",
    "help",
    "register_partner",
    "sign_in",
    "sign_out",
    "whoami",
    "upload_document",
    "notifications",
    "read_notification",
];

async fn admin_check(ctx: Context<'_>) -> Result<bool> {
    if PUBLIC_COMMANDS.contains(&ctx.command().name.as_str()) {
        return Ok(true);
    }

    let author = ctx.author().id.to_string();
    if ctx.data().is_admin(&author) {
        return Ok(true);
    }

    warn!(
        "User {} tried admin command `{}`",
        author,
        ctx.command().name
    );
    ctx.say("❌ This command is restricted to marketplace admins.")
        .await?;
    Ok(false)
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("❌ {error}")).await {
                error!("Failed to send error message: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// All registered slash commands.
#[must_use]
pub fn all_commands() -> Vec<poise::Command<BotData, Error>> {
    vec![
        commands::ping(),
        commands::help(),
        commands::register_partner(),
        commands::sign_in(),
        commands::sign_out(),
        commands::whoami(),
        commands::upload_document(),
        commands::notifications(),
        commands::read_notification(),
        commands::partners(),
        commands::partner(),
        commands::update_partner(),
        commands::disable_partner(),
        commands::approve_partner(),
        commands::reject_partner(),
        commands::verify_document(),
        commands::subscribe_partner(),
        commands::cancel_subscription(),
        commands::submit_request(),
        commands::assign_request(),
        commands::set_request_status(),
        commands::requests(),
        commands::recommend(),
        commands::award_points(),
        commands::points(),
        commands::add_campaign(),
        commands::set_reward_rule(),
        commands::create_voucher(),
        commands::redeem_voucher(),
        commands::assign_voucher(),
        commands::deactivate_voucher(),
        commands::vouchers(),
        commands::dashboard(),
        commands::audit_log(),
    ]
}

/// Builds the poise framework and runs the Discord client until it stops.
pub async fn run_bot(token: String, data: BotData) -> Result<()> {
    let dashboard_task = cache::spawn_dashboard_listener(
        data.database.clone(),
        &data.changes,
        Arc::clone(&data.dashboard),
    );

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            command_check: Some(|ctx| Box::pin(admin_check(ctx))),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    let result = client.start().await;
    dashboard_task.abort();
    result.inspect_err(|e| error!("Client error: {:?}", e))?;
    Ok(())
}

pub use commands::*;
pub use handlers::*;
