// Ambient command group - configure ambient events per channel

use chrono::{DateTime, Local, TimeZone, Utc};
use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::features::poster::{PostOutcome, Poster, SkipReason};
use crate::features::store::{
    has_json_extension, parse_import, to_pretty_json, ConfigStore, ImportError, StoreError,
};
use crate::models::channel::{ChannelConfig, ChannelSettings, DangerLevel};
use crate::utils::config::colors;
use crate::utils::formatters::{discord_timestamp, or_placeholder};
use crate::{Context, Error};

/// Manage ambient events for this channel
#[poise::command(
    slash_command,
    guild_only,
    subcommands("set", "enable", "disable", "show", "post_now", "export", "import")
)]
pub async fn ambient(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

fn config_embed(title: &str, config: &ChannelConfig, color: u32) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .field("Location", or_placeholder(&config.location, "Not set"), true)
        .field("Danger", config.danger.as_str(), true)
        .field("Enabled", if config.enabled { "Yes" } else { "No" }, true)
        .field("Lore", or_placeholder(&config.lore, "None"), false)
        .field("Criteria", or_placeholder(&config.criteria, "None"), false)
        .field("Last posted", discord_timestamp(config.last_posted_at.as_deref()), true)
        .field("Updated", discord_timestamp(config.updated_at.as_deref()), true)
        .color(color)
}

/// Set location, danger and lore for this channel
#[poise::command(slash_command, required_permissions = "MANAGE_CHANNELS")]
pub async fn set(
    ctx: Context<'_>,
    #[description = "Name of the in-world place"] location: String,
    #[description = "How dangerous the place is"] danger: DangerLevel,
    #[description = "Background description"] lore: String,
    #[description = "Extra rules for generated events"] criteria: String,
) -> Result<(), Error> {
    let channel_id = ctx.channel_id().to_string();
    let store = &ctx.data().store;

    let mut doc = store.load();
    let config = doc
        .apply_settings(
            &channel_id,
            ChannelSettings {
                location,
                danger,
                lore,
                criteria,
            },
            &Utc::now(),
        )
        .clone();
    store.save(&doc)?;

    info!("Updated ambient config for channel {}", channel_id);
    ctx.send(poise::CreateReply::default().embed(config_embed(
        "Ambient Configuration Updated",
        &config,
        colors::SUCCESS,
    )))
    .await?;

    Ok(())
}

async fn set_enabled(ctx: Context<'_>, enabled: bool) -> Result<(), Error> {
    let channel_id = ctx.channel_id().to_string();
    let store = &ctx.data().store;

    let mut doc = store.load();
    doc.set_enabled(&channel_id, enabled);
    store.save(&doc)?;

    let state = if enabled { "enabled" } else { "disabled" };
    info!("Ambient events {} for channel {}", state, channel_id);

    let embed = serenity::CreateEmbed::new()
        .title(format!("Ambient Events {}", if enabled { "Enabled" } else { "Disabled" }))
        .description(format!("Scheduled ambient events are now **{}** in <#{}>.", state, channel_id))
        .color(if enabled { colors::SUCCESS } else { colors::WARNING });
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Turn on scheduled ambient events for this channel
#[poise::command(slash_command, required_permissions = "MANAGE_CHANNELS")]
pub async fn enable(ctx: Context<'_>) -> Result<(), Error> {
    set_enabled(ctx, true).await
}

/// Turn off scheduled ambient events for this channel
#[poise::command(slash_command, required_permissions = "MANAGE_CHANNELS")]
pub async fn disable(ctx: Context<'_>) -> Result<(), Error> {
    set_enabled(ctx, false).await
}

/// Show this channel's ambient configuration
#[poise::command(slash_command)]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    let channel_id = ctx.channel_id().to_string();
    let doc = ctx.data().store.load();

    let embed = match doc.get(&channel_id) {
        Some(config) => config_embed("Ambient Configuration", config, colors::INFO),
        None => serenity::CreateEmbed::new()
            .title("Not Configured")
            .description("This channel has no ambient configuration. Use `/ambient set` first.")
            .color(colors::WARNING),
    };
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

fn skip_message(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Unreachable => "Nothing posted: I can't send messages in this channel.",
        SkipReason::NotConfigured => {
            "Nothing posted: this channel is not configured. Use `/ambient set` first."
        }
        SkipReason::Disabled => {
            "Nothing posted: ambient events are disabled here. Use `/ambient enable` first."
        }
    }
}

/// One manual post. Only a successful post is written back to the store.
/// Returns the reply for the invoking user.
async fn post_and_record<Tz: TimeZone>(
    store: &ConfigStore,
    poster: &Poster,
    channel_id: &str,
    now: &DateTime<Tz>,
) -> Result<String, StoreError> {
    let mut doc = store.load();
    let reply = match poster.post_channel(&mut doc, channel_id, now).await {
        Ok(PostOutcome::Posted(_)) => {
            store.save(&doc)?;
            "Posted.".to_string()
        }
        Ok(PostOutcome::Skipped(reason)) => skip_message(reason).to_string(),
        Err(e) => {
            error!("Manual post to channel {} failed: {}", channel_id, e);
            format!("Failed to post: {}", e)
        }
    };
    Ok(reply)
}

/// Generate and post an ambient event here right now
#[poise::command(slash_command, required_permissions = "MANAGE_CHANNELS")]
pub async fn post_now(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let channel_id = ctx.channel_id().to_string();
    let data = ctx.data();
    let poster = data.poster(ctx.serenity_context().http.clone());

    let reply = post_and_record(&data.store, &poster, &channel_id, &Local::now()).await?;

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;

    Ok(())
}

/// Download the whole ambient configuration as JSON
#[poise::command(slash_command, required_permissions = "MANAGE_CHANNELS")]
pub async fn export(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let doc = ctx.data().store.load();
    let json = to_pretty_json(&doc)?;
    let attachment = serenity::CreateAttachment::bytes(json.into_bytes(), "ambient-config.json");

    ctx.send(
        poise::CreateReply::default()
            .content(format!("Ambient configuration ({} channel(s)):", doc.channels.len()))
            .attachment(attachment)
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Replace the whole ambient configuration with an uploaded JSON file
#[poise::command(slash_command, required_permissions = "MANAGE_CHANNELS")]
pub async fn import(
    ctx: Context<'_>,
    #[description = "A file produced by /ambient export"] file: serenity::Attachment,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let parsed = if has_json_extension(&file.filename) {
        match file.download().await {
            Ok(bytes) => parse_import(&bytes),
            Err(e) => Err(ImportError::Download(e.to_string())),
        }
    } else {
        Err(ImportError::WrongExtension)
    };

    let reply = match parsed {
        Ok(doc) => {
            ctx.data().store.replace(&doc)?;
            info!("Imported ambient config with {} channel(s)", doc.channels.len());
            format!("Imported configuration for {} channel(s).", doc.channels.len())
        }
        Err(e) => format!("Import rejected: {}", e),
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;

    Ok(())
}
