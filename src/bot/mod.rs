pub mod commands;
pub mod handlers;
pub mod interactions;
pub mod modules;

use crate::config::Config;
use crate::game::daily::DailyData;
use crate::scheduler::Scheduler;
use crate::session::Session;
use crate::utils::format::trim;
use anyhow::Result;
use modules::Module;
use poise::serenity_prelude as serenity;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type ApplicationContext<'a> = poise::ApplicationContext<'a, Data, Error>;

pub struct Data {
    pub pool: SqlitePool,
    pub config: Config,
    pub scheduler: Arc<Scheduler>,
    pub daily: RwLock<DailyData>,
    pub modules: RwLock<HashSet<Module>>,
    /// Last query submitted through `/dev sql`, prefilled into the next modal.
    pub sql_draft: Mutex<commands::dev::SqlModal>,
}

impl Data {
    pub fn new(config: Config, pool: SqlitePool, scheduler: Arc<Scheduler>) -> Result<Self> {
        let daily = DailyData::load(&config.data.daily_path)?;

        let mut loaded = HashSet::from([Module::Dev]);
        for name in &config.discord.extensions {
            match Module::parse(name) {
                Ok(module) => {
                    loaded.insert(module);
                }
                Err(e) => warn!("Skipping configured module: {}", e),
            }
        }

        Ok(Self {
            pool,
            config,
            scheduler,
            daily: RwLock::new(daily),
            modules: RwLock::new(loaded),
            sql_draft: Mutex::new(Default::default()),
        })
    }
}

pub async fn create_bot(config: Config, session: &Session) -> Result<serenity::Client> {
    let data = Data::new(config.clone(), session.pool.clone(), session.scheduler.clone())?;

    let intents = serenity::GatewayIntents::non_privileged();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            owners: config
                .discord
                .owners
                .iter()
                .map(|id| serenity::UserId::new(*id))
                .collect(),
            command_check: Some(|ctx| Box::pin(module_check(ctx))),
            pre_command: |ctx| Box::pin(log_invocation(ctx)),
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                let commands = &framework.options().commands;
                match data.config.discord.guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?
                    }
                    None => poise::builtins::register_globally(ctx, commands).await?,
                }
                info!("Registered {} commands", commands.len());

                if data.is_loaded(Module::Timers).await {
                    data.scheduler.start(ctx.http.clone()).await;
                }
                Ok(data)
            })
        })
        .build();

    let client = serenity::ClientBuilder::new(&config.discord.token, intents)
        .framework(framework)
        .await?;

    Ok(client)
}

/// Refuses commands whose module is currently unloaded.
async fn module_check(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(category) = ctx.command().category.as_deref() else {
        return Ok(true);
    };
    let Ok(module) = Module::parse(category) else {
        return Ok(true);
    };

    if ctx.data().is_loaded(module).await {
        Ok(true)
    } else {
        Err(format!("The `{}` module is not loaded.", module.name()).into())
    }
}

async fn log_invocation(ctx: Context<'_>) {
    // cache only, no REST lookups
    let cached = ctx.guild().map(|guild| {
        let channel = guild
            .channels
            .get(&ctx.channel_id())
            .map(|channel| channel.name.clone());
        (guild.name.clone(), channel)
    });
    let (guild, channel) = invocation_location(cached, ctx.channel_id());

    let args = match ctx {
        poise::Context::Application(app) => app
            .args
            .iter()
            .map(|option| format!("{}: {}", option.name, format_option(&option.value)))
            .collect::<Vec<_>>()
            .join(" "),
        poise::Context::Prefix(prefix) => prefix.args.to_string(),
    };

    info!(
        "[{}/#{}/{}]: /{} {}",
        ctx.author().name,
        channel,
        guild,
        ctx.command().qualified_name,
        args
    );
}

/// Guild and channel names for the log line, falling back to `DM` and the raw channel id.
fn invocation_location(
    cached: Option<(String, Option<String>)>,
    channel_id: serenity::ChannelId,
) -> (String, String) {
    match cached {
        Some((guild, channel)) => (guild, channel.unwrap_or_else(|| channel_id.to_string())),
        None => ("DM".to_string(), channel_id.to_string()),
    }
}

fn format_option(value: &serenity::ResolvedValue<'_>) -> String {
    match value {
        serenity::ResolvedValue::Boolean(b) => b.to_string(),
        serenity::ResolvedValue::Integer(i) => i.to_string(),
        serenity::ResolvedValue::Number(n) => n.to_string(),
        serenity::ResolvedValue::String(s) => s.to_string(),
        serenity::ResolvedValue::Attachment(attachment) => attachment.filename.clone(),
        serenity::ResolvedValue::User(user, _) => user.name.clone(),
        other => format!("{:?}", other),
    }
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                "Command `{}` failed: {:?}",
                ctx.command().qualified_name,
                error
            );
            let reply = poise::CreateReply::default()
                .content(trim(&error.to_string(), None, true, "…"))
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to report command error: {:?}", e);
            }
        }
        poise::FrameworkError::CommandCheckFailed {
            error: Some(error),
            ctx,
            ..
        } => {
            let reply = poise::CreateReply::default()
                .content(error.to_string())
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to report failed check: {:?}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_location_falls_back_to_ids() {
        let channel = serenity::ChannelId::new(42);

        assert_eq!(
            invocation_location(None, channel),
            ("DM".to_string(), "42".to_string())
        );
        assert_eq!(
            invocation_location(Some(("Teyvat".to_string(), None)), channel),
            ("Teyvat".to_string(), "42".to_string())
        );
        assert_eq!(
            invocation_location(
                Some(("Teyvat".to_string(), Some("general".to_string()))),
                channel
            ),
            ("Teyvat".to_string(), "general".to_string())
        );
    }
}
