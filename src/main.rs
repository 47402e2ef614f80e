// Ambient Bot
// Posts short generated world events into configured Discord channels

mod api;
mod commands;
mod features;
mod models;
mod utils;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::llm::{OpenRouterClient, TextGenerator};
use crate::features::poster::{Poster, SerenityMessenger};
use crate::features::scheduler::{ScheduleTiming, Scheduler, SchedulerHandle};
use crate::features::store::ConfigStore;
use crate::utils::config::{Settings, INITIAL_DELAY};

/// User data shared across all commands
pub struct Data {
    pub store: Arc<ConfigStore>,
    pub generator: Arc<dyn TextGenerator>,
    pub schedule_period: Duration,
}

impl Data {
    /// Poster that sends through the given Discord HTTP client
    pub fn poster(&self, http: Arc<serenity::Http>) -> Poster {
        Poster::new(self.generator.clone(), Arc::new(SerenityMessenger::new(http)))
    }
}

// Manual Debug impl since the generator is a trait object
impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("store", &self.store.path())
            .field("generator", &"dyn TextGenerator")
            .field("schedule_period", &self.schedule_period)
            .finish()
    }
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Register all slash commands
fn get_commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        commands::ambient::ambient(),
        commands::help::help(),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "ambient_bot=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    info!("Starting Ambient Bot...");
    info!("Config document: {}", settings.config_path.display());

    // Build HTTP client for API calls
    let http_client = reqwest::Client::builder()
        .user_agent("Ambient-Bot/1.0")
        .build()
        .context("Failed to create HTTP client")?;

    let generator: Arc<dyn TextGenerator> = Arc::new(OpenRouterClient::new(
        http_client,
        &settings.api_url,
        &settings.api_key,
        &settings.model,
    ));
    let store = Arc::new(ConfigStore::new(settings.config_path.clone()));
    let timing = ScheduleTiming {
        initial_delay: INITIAL_DELAY,
        period: settings.interval,
    };

    // Owned here so the scheduler can be stopped on shutdown
    let scheduler: Arc<Mutex<Option<SchedulerHandle>>> = Arc::new(Mutex::new(None));
    let scheduler_slot = scheduler.clone();

    // Setup framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: get_commands(),
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Command /{} failed: {:?}", ctx.command().qualified_name, error);
                            let _ = ctx.say(format!("❌ Something went wrong: {}", error)).await;
                        }
                        poise::FrameworkError::MissingUserPermissions { ctx, .. } => {
                            let _ = ctx
                                .send(
                                    poise::CreateReply::default()
                                        .content("You need the Manage Channels permission to do that.")
                                        .ephemeral(true),
                                )
                                .await;
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            let _ = ctx.say("This command can only be used in a server.").await;
                        }
                        err => {
                            if let Err(e) = poise::builtins::on_error(err).await {
                                error!("Framework error: {:?}", e);
                            }
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready! Registering commands...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Commands registered successfully!");

                let data = Data {
                    store,
                    generator,
                    schedule_period: timing.period,
                };

                let mut slot = scheduler_slot.lock().await;
                if slot.is_none() {
                    *slot = Some(Scheduler::spawn(
                        data.store.clone(),
                        data.poster(ctx.http.clone()),
                        timing,
                    ));
                }

                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS;

    let mut client = serenity::ClientBuilder::new(&settings.discord_token, intents)
        .framework(framework)
        .await
        .context("Failed to create client")?;

    // Run with graceful shutdown
    let shard_manager = client.shard_manager.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to register Ctrl+C handler: {:?}", e);
            return;
        }
        info!("Shutting down...");
        shard_manager.shutdown_all().await;
    });

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    if let Some(handle) = scheduler.lock().await.take() {
        handle.stop().await;
    }

    info!("Goodbye!");
    Ok(())
}
