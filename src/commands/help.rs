// Help command - show usage guide

use poise::serenity_prelude as serenity;
use crate::{Context, Error};
use crate::utils::config::colors;

/// Show help and usage guide
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let hours = ctx.data().schedule_period.as_secs() / 3600;

    let embed = serenity::CreateEmbed::new()
        .title("🌫️ Ambient Bot - Help")
        .description("Short generated world events, posted into your roleplay channels")
        .color(colors::PRIMARY)
        .field(
            "🗺️ Setup",
            "`/ambient set` - Location, danger, lore and extra rules for this channel\n\
            `/ambient enable` / `/ambient disable` - Toggle scheduled events",
            false,
        )
        .field(
            "👀 Inspect",
            "`/ambient show` - View this channel's configuration\n\
            `/ambient post_now` - Post one event right away",
            false,
        )
        .field(
            "💾 Backup",
            "`/ambient export` - Download the whole configuration\n\
            `/ambient import` - Replace it with an uploaded `.json` file",
            false,
        )
        .field(
            "☠️ Danger",
            "Higher danger makes ominous events more likely:\n\
            • Low: 8%\n\
            • Medium: 20%\n\
            • High: 40%",
            false,
        )
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Enabled channels get one event every {}h • Managing requires Manage Channels",
            hours
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}
