//! Voucher Discord commands - creation, redemption and listing.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{actor, days_from, split_list},
        },
        core::{
            audit,
            changes::{ChangeEvent, Collection},
            voucher::{self, NewVoucher},
        },
        errors::{Error, Result},
    };
    use chrono::Utc;
    use serde_json::json;
    use std::fmt::Write;

    /// Creates a voucher partners can redeem with points.
    #[poise::command(slash_command, prefix_command)]
    pub async fn create_voucher(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Voucher title"] title: String,
        #[description = "Points needed to redeem"] points_required: i64,
        #[description = "Days until it expires"] days_valid: i64,
        #[description = "How many partners may redeem it (default: 1)"] max_redemptions: Option<
            i64,
        >,
        #[description = "Code (default: random)"] code: Option<String>,
        #[description = "Longer description"] description: Option<String>,
        #[description = "Comma-separated partner ids allowed to redeem (default: everyone)"]
        partner_ids: Option<String>,
    ) -> Result<()> {
        let mut assigned_partners = Vec::new();
        for raw in split_list(partner_ids.as_deref()) {
            let Ok(id) = raw.parse::<i64>() else {
                ctx.say(format!("❌ '{raw}' is not a partner id.")).await?;
                return Ok(());
            };
            assigned_partners.push(id);
        }

        let expiry_date = days_from(Utc::now(), days_valid)?;
        let max_redemptions = i32::try_from(max_redemptions.unwrap_or(1))?;

        let data = ctx.data();
        let created = voucher::create_voucher(
            &data.database,
            NewVoucher {
                code,
                title,
                description,
                points_required,
                expiry_date,
                max_redemptions,
                assigned_partners,
            },
        )
        .await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "create_voucher",
            "voucher",
            Some(created.id.to_string()),
            json!({ "code": created.code, "points_required": created.points_required }),
        )
        .await;
        data.notify(ChangeEvent::created(Collection::Vouchers, created.id));

        ctx.say(format!(
            "🎟️ Voucher **{}** ({}) for {} points, {} redemptions, expires {}.",
            created.code,
            created.title,
            created.points_required,
            created.max_redemptions,
            created.expiry_date.format("%Y-%m-%d")
        ))
        .await?;
        Ok(())
    }

    /// Redeems a voucher on behalf of a partner.
    #[poise::command(slash_command, prefix_command)]
    pub async fn redeem_voucher(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Voucher code"] code: String,
        #[description = "Partner id"] partner_id: i64,
    ) -> Result<()> {
        let data = ctx.data();

        let found = voucher::get_voucher_by_code(&data.database, &code)
            .await?
            .ok_or_else(|| Error::VoucherNotFound { id: code.clone() })?;
        let result =
            voucher::redeem_voucher(&data.database, found.id, partner_id, Utc::now()).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "redeem_voucher",
            "voucher",
            Some(found.id.to_string()),
            json!({ "partner_id": partner_id, "points": result.transaction.points }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::Vouchers, found.id));
        data.notify(ChangeEvent::created(
            Collection::RewardTransactions,
            result.transaction.id,
        ));
        data.notify(ChangeEvent::updated(Collection::Partners, partner_id));

        ctx.say(format!(
            "✅ Partner {} redeemed **{}** for {} points. {} redemptions left.",
            partner_id,
            result.voucher.code,
            result.transaction.points,
            result.voucher.remaining_redemptions()
        ))
        .await?;
        Ok(())
    }

    /// Lists vouchers, or the ones a partner can redeem now.
    #[poise::command(slash_command, prefix_command)]
    pub async fn vouchers(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only vouchers this partner can redeem now"] partner_id: Option<i64>,
    ) -> Result<()> {
        let db = &ctx.data().database;

        let listed = match partner_id {
            Some(id) => voucher::list_available_for(db, id, Utc::now()).await?,
            None => voucher::list_vouchers(db).await?,
        };

        if listed.is_empty() {
            ctx.say("No vouchers found.").await?;
            return Ok(());
        }

        let mut response = format!("**Vouchers ({})**\n", listed.len());
        for v in &listed {
            writeln!(
                response,
                "• `{}` {} - {} pts | {} | {}/{} used | expires {}",
                v.code,
                v.title,
                v.points_required,
                v.status,
                v.current_redemptions,
                v.max_redemptions,
                v.expiry_date.format("%Y-%m-%d")
            )?;
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Lets a partner redeem a voucher that is restricted to a list.
    #[poise::command(slash_command, prefix_command)]
    pub async fn assign_voucher(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Voucher code"] code: String,
        #[description = "Partner id"] partner_id: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let found = voucher::get_voucher_by_code(&data.database, &code)
            .await?
            .ok_or_else(|| Error::VoucherNotFound { id: code.clone() })?;
        let updated = voucher::assign_voucher(&data.database, found.id, partner_id).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "assign_voucher",
            "voucher",
            Some(found.id.to_string()),
            json!({ "partner_id": partner_id }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::Vouchers, found.id));

        ctx.say(format!(
            "✅ Partner {} can now redeem `{}` ({} partners assigned).",
            partner_id,
            updated.code,
            updated.assigned_partners.0.len()
        ))
        .await?;
        Ok(())
    }

    /// Withdraws a voucher so nobody can redeem it.
    #[poise::command(slash_command, prefix_command)]
    pub async fn deactivate_voucher(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Voucher code"] code: String,
    ) -> Result<()> {
        let data = ctx.data();
        let found = voucher::get_voucher_by_code(&data.database, &code)
            .await?
            .ok_or_else(|| Error::VoucherNotFound { id: code.clone() })?;
        let updated = voucher::deactivate_voucher(&data.database, found.id).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "deactivate_voucher",
            "voucher",
            Some(found.id.to_string()),
            json!({ "code": updated.code }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::Vouchers, found.id));

        ctx.say(format!("🚫 Voucher `{}` deactivated.", updated.code))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
