use dotenvy::dotenv;
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wastelink::{
    bot::{self, BotData},
    config::{admins, database, marketplace},
    core::{auth::AuthGateway, partner, reward},
    errors::{Error, Result},
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the real environment
    dotenv().ok();

    // 3. Marketplace configuration
    let config = marketplace::load_default_config()
        .inspect_err(|e| error!("Failed to load marketplace configuration: {}", e))?;
    info!(
        "Loaded {} reward rules and {} subscription plans",
        config.reward_rules.len(),
        config.subscription_plans.len()
    );

    // 4. Database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    reward::seed_reward_rules(&db, &config.reward_rules).await?;
    let expired = partner::expire_subscriptions(&db, chrono::Utc::now()).await?;
    if expired > 0 {
        info!("Expired {} lapsed subscriptions", expired);
    }

    // 5. Auth and admin accounts
    let auth = Arc::new(AuthGateway::new(db.clone(), config.auth));
    match env::var("ADMIN_BOOTSTRAP_PASSWORD") {
        Ok(password) => {
            for admin in &config.admins {
                auth.bootstrap_admin(&admin.email, &password, &admin.display_name)
                    .await
                    .inspect_err(|e| error!("Failed to bootstrap admin {}: {}", admin.email, e))?;
            }
        }
        Err(_) if !config.admins.is_empty() => {
            warn!("ADMIN_BOOTSTRAP_PASSWORD is not set, skipping admin bootstrap");
        }
        Err(_) => {}
    }

    let admin_ids = admins::get_admin_discord_ids();
    if admin_ids.is_empty() {
        warn!("ADMIN_DISCORD_IDS is empty, every admin command will be refused");
    }

    // 6. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;

    let data = BotData::new(db, Arc::new(config), auth, admin_ids);
    bot::run_bot(token, data).await
}
