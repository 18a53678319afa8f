//! Partner self-service Discord commands - registration, sessions, documents and notifications.
//!
//! These are open to everyone. Partner-only actions take the bearer token
//! handed out by `/sign_in`, and every reply is ephemeral so credentials and
//! tokens never show up in the channel.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{actor, split_list},
        },
        core::{
            audit,
            auth::Role,
            changes::{ChangeEvent, Collection},
            notification,
            partner::{self, PartnerProfile},
        },
        errors::{Error, Result},
    };
    use serde_json::json;
    use std::fmt::Write;

    /// Notifications shown by `/notifications`
    const RECENT_NOTIFICATIONS: usize = 10;

    async fn reply_private(ctx: poise::Context<'_, BotData, Error>, text: String) -> Result<()> {
        ctx.send(poise::CreateReply::default().content(text).ephemeral(true))
            .await?;
        Ok(())
    }

    /// Resolves a session token to the partner it belongs to.
    async fn session_partner(ctx: poise::Context<'_, BotData, Error>, token: &str) -> Result<i64> {
        match ctx.data().auth.session(token.trim()).await?.role {
            Role::Partner { partner_id } => Ok(partner_id),
            Role::Admin { .. } => Err(Error::PermissionDenied {
                message: "Admin sessions have no partner profile".to_string(),
            }),
        }
    }

    /// Registers as a partner. The account starts pending admin review.
    #[poise::command(slash_command, prefix_command)]
    pub async fn register_partner(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sign-in email"] email: String,
        #[description = "Password (at least 6 characters)"] password: String,
        #[description = "Business name"] name: String,
        #[description = "Comma-separated service areas"] service_areas: Option<String>,
        #[description = "Comma-separated waste types you collect"] waste_types: Option<String>,
        #[description = "Contact phone"] phone: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let created = data
            .auth
            .sign_up(
                &email,
                &password,
                PartnerProfile {
                    name,
                    phone,
                    service_areas: split_list(service_areas.as_deref()),
                    supported_waste_types: split_list(waste_types.as_deref()),
                },
            )
            .await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "register_partner",
            "partner",
            Some(created.id.to_string()),
            json!({ "email": created.email }),
        )
        .await;
        data.notify(ChangeEvent::created(Collection::Partners, created.id));

        reply_private(
            ctx,
            format!(
                "✅ Registered **{}** as partner #{}. Upload your documents with `/upload_document` after signing in; an admin will review them.",
                created.name, created.id
            ),
        )
        .await
    }

    /// Signs in and returns a session token.
    #[poise::command(slash_command, prefix_command)]
    pub async fn sign_in(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Sign-in email"] email: String,
        #[description = "Password"] password: String,
        #[description = "Sign in with the admin role"] admin: Option<bool>,
    ) -> Result<()> {
        let auth = &ctx.data().auth;
        let session = if admin.unwrap_or(false) {
            auth.admin_sign_in(&email, &password).await?
        } else {
            auth.sign_in(&email, &password).await?
        };

        reply_private(
            ctx,
            format!(
                "🔑 Signed in as {}. Your session token:\n`{}`",
                session.email, session.token
            ),
        )
        .await
    }

    /// Ends a session.
    #[poise::command(slash_command, prefix_command)]
    pub async fn sign_out(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Session token"] token: String,
    ) -> Result<()> {
        ctx.data().auth.sign_out(token.trim()).await?;
        reply_private(ctx, "👋 Signed out.".to_string()).await
    }

    /// Shows who a session token belongs to.
    #[poise::command(slash_command, prefix_command)]
    pub async fn whoami(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Session token"] token: String,
    ) -> Result<()> {
        let session = ctx.data().auth.session(token.trim()).await?;
        let role = match session.role {
            Role::Partner { partner_id } => format!("partner #{partner_id}"),
            Role::Admin { admin_id } => format!("admin #{admin_id}"),
        };
        reply_private(
            ctx,
            format!(
                "{} signed in as {} since {}",
                session.email,
                role,
                session.issued_at.format("%Y-%m-%d %H:%M UTC")
            ),
        )
        .await
    }

    /// Uploads a verification document for review.
    #[poise::command(slash_command, prefix_command)]
    pub async fn upload_document(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Session token"] token: String,
        #[description = "Document type, e.g. business_license"] doc_type: String,
        #[description = "Link to the uploaded file"] url: String,
    ) -> Result<()> {
        let partner_id = session_partner(ctx, &token).await?;
        let data = ctx.data();
        let document = partner::add_document(&data.database, partner_id, &doc_type, &url).await?;
        data.notify(ChangeEvent::updated(Collection::Partners, partner_id));

        reply_private(
            ctx,
            format!(
                "📄 Document #{} ({}) uploaded and waiting for review.",
                document.id, document.doc_type
            ),
        )
        .await
    }

    /// Lists your latest notifications.
    #[poise::command(slash_command, prefix_command)]
    pub async fn notifications(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Session token"] token: String,
    ) -> Result<()> {
        let partner_id = session_partner(ctx, &token).await?;
        let db = &ctx.data().database;
        let listed = notification::list_for_partner(db, partner_id).await?;
        let unread = notification::unread_count(db, partner_id).await?;

        if listed.is_empty() {
            return reply_private(ctx, "No notifications yet.".to_string()).await;
        }

        let mut response = format!("**Notifications** ({unread} unread)\n");
        for note in listed.iter().take(RECENT_NOTIFICATIONS) {
            let mark = if note.is_read { "  " } else { "🔵" };
            writeln!(
                response,
                "{mark} #{} {} - {}",
                note.id, note.title, note.message
            )?;
        }
        reply_private(ctx, response).await
    }

    /// Marks one of your notifications as read.
    #[poise::command(slash_command, prefix_command)]
    pub async fn read_notification(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Session token"] token: String,
        #[description = "Notification id"] notification_id: i64,
    ) -> Result<()> {
        let partner_id = session_partner(ctx, &token).await?;
        let data = ctx.data();
        let note =
            notification::mark_read_for_partner(&data.database, partner_id, notification_id).await?;
        data.notify(ChangeEvent::updated(Collection::Notifications, note.id));

        reply_private(ctx, format!("✅ Marked #{} as read.", note.id)).await
    }
}

// Re-export all commands
pub use inner::*;
