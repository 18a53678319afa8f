//! Partner Discord commands - listing, verification review and subscriptions.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{actor, split_list},
            handlers::autocomplete,
        },
        core::{
            audit,
            changes::{ChangeEvent, Collection},
            partner::{self, PartnerUpdate},
            reward,
        },
        entities::VerificationStatus,
        errors::{Error, Result},
    };
    use chrono::Utc;
    use serde_json::json;
    use std::fmt::Write;

    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum VerificationChoice {
        Pending,
        Approved,
        Rejected,
    }

    impl From<VerificationChoice> for VerificationStatus {
        fn from(choice: VerificationChoice) -> Self {
            match choice {
                VerificationChoice::Pending => Self::Pending,
                VerificationChoice::Approved => Self::Approved,
                VerificationChoice::Rejected => Self::Rejected,
            }
        }
    }

    /// Lists partners, optionally filtered by verification status.
    #[poise::command(slash_command, prefix_command)]
    pub async fn partners(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only show partners in this state"] status: Option<VerificationChoice>,
    ) -> Result<()> {
        let db = &ctx.data().database;

        let partners = match status {
            Some(choice) => partner::list_partners_by_status(db, choice.into()).await?,
            None => partner::list_partners(db).await?,
        };

        if partners.is_empty() {
            ctx.say("No partners found.").await?;
            return Ok(());
        }

        let mut response = format!("**Partners ({})**\n", partners.len());
        for p in &partners {
            let subscription = if p.has_active_subscription() {
                format!(" | plan {}", p.subscription_plan.as_deref().unwrap_or("?"))
            } else {
                String::new()
            };
            let disabled = if p.is_disabled { " | disabled" } else { "" };
            writeln!(
                response,
                "• #{} **{}** <{}> - {} | {} pts{}{}",
                p.id, p.name, p.email, p.verification_status, p.reward_points, subscription, disabled
            )?;
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Shows one partner's profile, documents and balance.
    #[poise::command(slash_command, prefix_command)]
    pub async fn partner(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Partner id"] partner_id: i64,
    ) -> Result<()> {
        let db = &ctx.data().database;

        let Some(p) = partner::get_partner_by_id(db, partner_id).await? else {
            ctx.say(format!("❌ Partner {partner_id} not found.")).await?;
            return Ok(());
        };
        let documents = partner::list_documents(db, partner_id).await?;
        let balance = reward::get_balance(db, partner_id).await?;

        let mut response = format!("**{}** (#{})\n", p.name, p.id);
        writeln!(response, "Email: {}", p.email)?;
        if let Some(phone) = &p.phone {
            writeln!(response, "Phone: {phone}")?;
        }
        writeln!(response, "Verification: {}", p.verification_status)?;
        if let Some(reason) = &p.rejection_reason {
            writeln!(response, "Rejection reason: {reason}")?;
        }
        match (&p.subscription_plan, p.subscription_status, p.subscription_expiry) {
            (Some(plan), Some(status), Some(expiry)) => writeln!(
                response,
                "Subscription: {} ({}) until {}",
                plan,
                status,
                expiry.format("%Y-%m-%d")
            )?,
            _ => writeln!(response, "Subscription: none")?,
        }
        writeln!(response, "Service areas: {}", p.service_areas.0.join(", "))?;
        writeln!(
            response,
            "Waste types: {}",
            p.supported_waste_types.0.join(", ")
        )?;
        writeln!(response, "Points: {balance} (cached {})", p.reward_points)?;

        if documents.is_empty() {
            writeln!(response, "Documents: none uploaded")?;
        } else {
            writeln!(response, "Documents:")?;
            for doc in &documents {
                let mark = if doc.verified { "✅" } else { "⏳" };
                writeln!(response, "  {mark} #{} {} - {}", doc.id, doc.doc_type, doc.url)?;
            }
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Approves a pending partner.
    #[poise::command(slash_command, prefix_command)]
    pub async fn approve_partner(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Partner id"] partner_id: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let updated = partner::approve_partner(&data.database, partner_id).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "approve_partner",
            "partner",
            Some(partner_id.to_string()),
            json!({ "email": updated.email }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::Partners, partner_id));

        ctx.say(format!("✅ Approved **{}** (#{}).", updated.name, updated.id))
            .await?;
        Ok(())
    }

    /// Rejects a pending partner with a reason.
    #[poise::command(slash_command, prefix_command)]
    pub async fn reject_partner(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Partner id"] partner_id: i64,
        #[description = "Why the partner was rejected"] reason: String,
    ) -> Result<()> {
        let data = ctx.data();
        let updated = partner::reject_partner(&data.database, partner_id, &reason).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "reject_partner",
            "partner",
            Some(partner_id.to_string()),
            json!({ "reason": reason }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::Partners, partner_id));

        ctx.say(format!("🚫 Rejected **{}** (#{}).", updated.name, updated.id))
            .await?;
        Ok(())
    }

    /// Marks an uploaded partner document as verified.
    #[poise::command(slash_command, prefix_command)]
    pub async fn verify_document(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Document id"] document_id: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let document = partner::verify_document(&data.database, document_id).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "verify_document",
            "partner_document",
            Some(document_id.to_string()),
            json!({ "partner_id": document.partner_id, "doc_type": document.doc_type }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::Partners, document.partner_id));

        ctx.say(format!(
            "✅ Document #{} ({}) verified for partner {}.",
            document.id, document.doc_type, document.partner_id
        ))
        .await?;
        Ok(())
    }

    /// Starts or renews a partner's subscription.
    #[poise::command(slash_command, prefix_command)]
    pub async fn subscribe_partner(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Partner id"] partner_id: i64,
        #[description = "Subscription plan"]
        #[autocomplete = "autocomplete::autocomplete_plan"]
        plan: String,
    ) -> Result<()> {
        let data = ctx.data();
        let selected = data
            .config
            .plan(&plan)
            .ok_or_else(|| Error::PlanNotFound {
                plan_id: plan.clone(),
            })?;

        let updated =
            partner::activate_subscription(&data.database, partner_id, selected, Utc::now())
                .await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "subscribe_partner",
            "partner",
            Some(partner_id.to_string()),
            json!({ "plan": selected.id, "price": selected.price }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::Partners, partner_id));

        let expiry = updated
            .subscription_expiry
            .map_or_else(|| "?".to_string(), |e| e.format("%Y-%m-%d").to_string());
        ctx.say(format!(
            "✅ **{}** is on plan **{}** until {}.",
            updated.name, selected.name, expiry
        ))
        .await?;
        Ok(())
    }

    /// Cancels a partner's active subscription.
    #[poise::command(slash_command, prefix_command)]
    pub async fn cancel_subscription(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Partner id"] partner_id: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let updated = partner::cancel_subscription(&data.database, partner_id).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "cancel_subscription",
            "partner",
            Some(partner_id.to_string()),
            json!({ "plan": updated.subscription_plan }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::Partners, partner_id));

        ctx.say(format!("Subscription cancelled for **{}**.", updated.name))
            .await?;
        Ok(())
    }

    /// Edits a partner's profile. Only the given fields change.
    #[poise::command(slash_command, prefix_command)]
    pub async fn update_partner(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Partner id"] partner_id: i64,
        #[description = "New business name"] name: Option<String>,
        #[description = "New contact phone"] phone: Option<String>,
        #[description = "Comma-separated service areas (replaces the list)"] service_areas: Option<
            String,
        >,
        #[description = "Comma-separated waste types (replaces the list)"] waste_types: Option<
            String,
        >,
    ) -> Result<()> {
        let update = PartnerUpdate {
            name,
            phone,
            service_areas: service_areas.as_deref().map(|raw| split_list(Some(raw))),
            supported_waste_types: waste_types.as_deref().map(|raw| split_list(Some(raw))),
        };

        let data = ctx.data();
        let updated = partner::update_partner(&data.database, partner_id, update).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "update_partner",
            "partner",
            Some(partner_id.to_string()),
            json!({
                "name": updated.name,
                "service_areas": updated.service_areas.0,
                "supported_waste_types": updated.supported_waste_types.0,
            }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::Partners, partner_id));

        ctx.say(format!("✅ Updated **{}** (#{}).", updated.name, updated.id))
            .await?;
        Ok(())
    }

    /// Disables or re-enables a partner account.
    #[poise::command(slash_command, prefix_command)]
    pub async fn disable_partner(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Partner id"] partner_id: i64,
        #[description = "Disable the account (false re-enables it, default: true)"]
        disabled: Option<bool>,
    ) -> Result<()> {
        let disabled = disabled.unwrap_or(true);
        let data = ctx.data();
        let updated = partner::set_partner_disabled(&data.database, partner_id, disabled).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            if disabled { "disable_partner" } else { "enable_partner" },
            "partner",
            Some(partner_id.to_string()),
            json!({ "disabled": disabled }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::Partners, partner_id));

        let state = if disabled { "disabled" } else { "enabled" };
        ctx.say(format!("**{}** (#{}) is now {}.", updated.name, updated.id, state))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
