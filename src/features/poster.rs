// Per-channel post
// Shared by the scheduler and `/ambient post_now`: generate one ambient
// message for a channel, send it, and stamp `lastPostedAt` in the document.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use poise::serenity_prelude as serenity;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::llm::{GenerationError, TextGenerator};
use crate::features::ambient::{generate_ambient, AmbientContext};
use crate::models::channel::ConfigDocument;

/// Where ambient messages go
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Display name of the channel, if it exists and accepts text messages
    async fn resolve(&self, channel_id: &str) -> Option<String>;

    async fn send(&self, channel_id: &str, content: &str) -> Result<(), String>;
}

/// Posts through the Discord REST API
pub struct SerenityMessenger {
    http: Arc<serenity::Http>,
}

impl SerenityMessenger {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

fn parse_channel_id(channel_id: &str) -> Option<serenity::ChannelId> {
    channel_id
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(serenity::ChannelId::new)
}

#[async_trait]
impl Messenger for SerenityMessenger {
    async fn resolve(&self, channel_id: &str) -> Option<String> {
        let id = parse_channel_id(channel_id)?;
        match self.http.get_channel(id).await {
            Ok(serenity::Channel::Guild(channel)) => match channel.kind {
                serenity::ChannelType::Text
                | serenity::ChannelType::News
                | serenity::ChannelType::PublicThread
                | serenity::ChannelType::PrivateThread => Some(channel.name),
                _ => None,
            },
            Ok(_) => None,
            Err(e) => {
                debug!("Channel {} is not reachable: {:?}", channel_id, e);
                None
            }
        }
    }

    async fn send(&self, channel_id: &str, content: &str) -> Result<(), String> {
        let id = parse_channel_id(channel_id)
            .ok_or_else(|| format!("invalid channel id: {}", channel_id))?;
        id.say(&self.http, content)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("failed to send message: {0}")]
    Send(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Deleted, inaccessible, or not a text channel
    Unreachable,
    NotConfigured,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Posted(String),
    Skipped(SkipReason),
}

#[derive(Clone)]
pub struct Poster {
    generator: Arc<dyn TextGenerator>,
    messenger: Arc<dyn Messenger>,
}

impl Poster {
    pub fn new(generator: Arc<dyn TextGenerator>, messenger: Arc<dyn Messenger>) -> Self {
        Self { generator, messenger }
    }

    /// Post once to `channel_id`. The caller persists `doc`.
    pub async fn post_channel<Tz: TimeZone>(
        &self,
        doc: &mut ConfigDocument,
        channel_id: &str,
        now: &DateTime<Tz>,
    ) -> Result<PostOutcome, PostError> {
        let channel_name = match self.messenger.resolve(channel_id).await {
            Some(name) => name,
            None => return Ok(PostOutcome::Skipped(SkipReason::Unreachable)),
        };

        let ctx = match doc.get(channel_id) {
            None => return Ok(PostOutcome::Skipped(SkipReason::NotConfigured)),
            Some(config) if !config.enabled => {
                return Ok(PostOutcome::Skipped(SkipReason::Disabled))
            }
            Some(config) => AmbientContext::from_config(config, &channel_name),
        };

        let text = generate_ambient(self.generator.as_ref(), &ctx, now).await?;
        self.messenger
            .send(channel_id, &text)
            .await
            .map_err(PostError::Send)?;

        doc.mark_posted(channel_id, now);
        info!("Posted ambient event to #{} ({})", channel_name, channel_id);
        Ok(PostOutcome::Posted(text))
    }
}
