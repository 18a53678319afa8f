//! Waste request Discord commands - submission, recommendation, assignment and status.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{actor, hours_from},
            handlers::autocomplete,
        },
        core::{
            audit,
            changes::{ChangeEvent, Collection},
            pickup,
            waste_request::{self, NewWasteRequest},
        },
        entities::{RequestStatus, WasteRequestModel},
        errors::{Error, Result},
    };
    use chrono::Utc;
    use serde_json::json;
    use std::fmt::Write;

    /// Default classifier confidence for requests filed by hand
    const MANUAL_CONFIDENCE: f64 = 100.0;
    /// Longest list the bot prints
    const MAX_LISTED: usize = 25;

    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum StatusChoice {
        Assigned,
        Accepted,
        #[name = "In Progress"]
        InProgress,
        Completed,
    }

    impl From<StatusChoice> for RequestStatus {
        fn from(choice: StatusChoice) -> Self {
            match choice {
                StatusChoice::Assigned => Self::Assigned,
                StatusChoice::Accepted => Self::Accepted,
                StatusChoice::InProgress => Self::InProgress,
                StatusChoice::Completed => Self::Completed,
            }
        }
    }

    fn describe(request: &WasteRequestModel) -> String {
        let partner = request
            .assigned_partner_id
            .map_or_else(|| "unassigned".to_string(), |id| format!("partner {id}"));
        format!(
            "#{} {} of **{}** at {} - {} ({})",
            request.id, request.quantity, request.waste_type, request.location, request.status, partner
        )
    }

    /// Files a new waste pickup request.
    #[poise::command(slash_command, prefix_command)]
    pub async fn submit_request(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Waste type"]
        #[autocomplete = "autocomplete::autocomplete_waste_type"]
        waste_type: String,
        #[description = "Quantity, e.g. '12 kg'"] quantity: String,
        #[description = "Pickup address"] location: String,
        #[description = "Classifier confidence 0-100 (default: 100)"] confidence: Option<f64>,
        #[description = "Assign this partner straight away"] partner_id: Option<i64>,
    ) -> Result<()> {
        let data = ctx.data();
        let created = waste_request::submit_request(
            &data.database,
            NewWasteRequest {
                waste_type,
                confidence: confidence.unwrap_or(MANUAL_CONFIDENCE),
                quantity,
                location,
                submitted_by: Some(actor(ctx)),
                assign_to: partner_id,
            },
        )
        .await?;

        data.notify(ChangeEvent::created(Collection::WasteRequests, created.id));

        let mut response = format!("✅ Request filed: {}", describe(&created));
        if created.assigned_partner_id.is_none() {
            match created.recommended_partner_id {
                Some(id) => write!(response, "\nRecommended partner: {id}")?,
                None => write!(response, "\nNo partner currently serves this request.")?,
            }
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Suggests the best partner for a waste type and location.
    #[poise::command(slash_command, prefix_command)]
    pub async fn recommend(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Waste type"]
        #[autocomplete = "autocomplete::autocomplete_waste_type"]
        waste_type: String,
        #[description = "Pickup address"] location: String,
    ) -> Result<()> {
        let db = &ctx.data().database;

        match waste_request::recommend_partner(db, &waste_type, &location).await? {
            Some(p) => {
                ctx.say(format!(
                    "🤝 Recommended: **{}** (#{}){}",
                    p.name,
                    p.id,
                    if p.has_active_subscription() {
                        " - subscribed"
                    } else {
                        ""
                    }
                ))
                .await?;
            }
            None => {
                ctx.say(format!(
                    "No approved partner handles {waste_type} at {location}."
                ))
                .await?;
            }
        }
        Ok(())
    }

    /// Assigns (or reassigns) a partner to a request, optionally scheduling the pickup.
    #[poise::command(slash_command, prefix_command)]
    pub async fn assign_request(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Request id"] request_id: i64,
        #[description = "Partner id"] partner_id: i64,
        #[description = "Schedule the pickup this many hours from now"] pickup_in_hours: Option<
            i64,
        >,
        #[description = "Notes for the pickup crew"] notes: Option<String>,
    ) -> Result<()> {
        let pickup_at = pickup_in_hours
            .map(|hours| hours_from(Utc::now(), hours))
            .transpose()?;

        let data = ctx.data();
        let updated = waste_request::assign_partner(&data.database, request_id, partner_id).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "assign_request",
            "waste_request",
            Some(request_id.to_string()),
            json!({ "partner_id": partner_id }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::WasteRequests, request_id));

        let mut response = format!("✅ Assigned: {}", describe(&updated));

        if let Some(when) = pickup_at {
            let schedule = pickup::schedule_pickup(&data.database, request_id, when, notes).await?;
            data.notify(ChangeEvent::created(Collection::PickupSchedules, schedule.id));
            write!(
                response,
                "\n📅 Pickup scheduled for {}",
                schedule.scheduled_for.format("%Y-%m-%d %H:%M UTC")
            )?;
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Moves a request to its next status.
    #[poise::command(slash_command, prefix_command)]
    pub async fn set_request_status(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Request id"] request_id: i64,
        #[description = "New status"] status: StatusChoice,
    ) -> Result<()> {
        let data = ctx.data();
        let updated =
            waste_request::update_status(&data.database, request_id, status.into()).await?;

        audit::record(
            &data.database,
            &actor(ctx),
            "set_request_status",
            "waste_request",
            Some(request_id.to_string()),
            json!({ "status": updated.status.as_str() }),
        )
        .await;
        data.notify(ChangeEvent::updated(Collection::WasteRequests, request_id));

        let mut response = format!("✅ Updated: {}", describe(&updated));
        if updated.status == RequestStatus::Completed {
            write!(
                response,
                "\nUse `/award_points request_id:{request_id}` to reward the partner."
            )?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Lists requests, newest first.
    #[poise::command(slash_command, prefix_command)]
    pub async fn requests(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only show requests in this status"] status: Option<StatusChoice>,
        #[description = "Only show requests assigned to this partner"] partner_id: Option<i64>,
    ) -> Result<()> {
        let db = &ctx.data().database;

        let mut listed = match (status, partner_id) {
            (_, Some(id)) => waste_request::list_for_partner(db, id).await?,
            (Some(choice), None) => waste_request::list_by_status(db, choice.into()).await?,
            (None, None) => waste_request::list_requests(db).await?,
        };
        if let (Some(choice), Some(_)) = (status, partner_id) {
            let wanted = RequestStatus::from(choice);
            listed.retain(|r| r.status == wanted);
        }

        if listed.is_empty() {
            ctx.say("No requests found.").await?;
            return Ok(());
        }

        let mut response = format!("**Requests ({})**\n", listed.len());
        for request in listed.iter().take(MAX_LISTED) {
            writeln!(response, "• {}", describe(request))?;
        }
        if listed.len() > MAX_LISTED {
            writeln!(response, "…and {} more", listed.len() - MAX_LISTED)?;
        }

        ctx.say(response).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
