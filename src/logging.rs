use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{EnvFilter, LevelFilter, Targets};
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_DIR: &str = "logs";
const KEPT_LOG_FILES: usize = 30;
const DEFAULT_FILTER: &str = "teyvat_helper=info,poise=info";

/// Flushes the log files when dropped, so it must live until `main` returns.
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// Logs to stdout (filtered by `RUST_LOG`) and to daily rotated files under `logs/`:
/// `teyvat-helper.*.log` for the bot itself and `discord.*.log` for the gateway libraries.
pub fn init() -> Result<LogGuards> {
    let dir = Path::new(LOG_DIR);
    let (bot_writer, bot_guard) = tracing_appender::non_blocking(appender(dir, "teyvat-helper")?);
    let (discord_writer, discord_guard) = tracing_appender::non_blocking(appender(dir, "discord")?);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(bot_writer)
                .with_ansi(false)
                .with_filter(bot_targets()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(discord_writer)
                .with_ansi(false)
                .with_filter(discord_targets()),
        )
        .init();

    Ok(LogGuards {
        _guards: vec![bot_guard, discord_guard],
    })
}

fn env_filter() -> EnvFilter {
    EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.into()))
}

fn bot_targets() -> Targets {
    Targets::new().with_target("teyvat_helper", LevelFilter::DEBUG)
}

fn discord_targets() -> Targets {
    Targets::new()
        .with_target("serenity", LevelFilter::INFO)
        .with_target("poise", LevelFilter::INFO)
}

fn appender(dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    Ok(RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(KEPT_LOG_FILES)
        .build(dir)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing::Level;

    #[test]
    fn files_split_bot_and_gateway_logs() {
        let bot = bot_targets();
        assert!(bot.would_enable("teyvat_helper::scheduler", &Level::DEBUG));
        assert!(!bot.would_enable("serenity::gateway", &Level::INFO));

        let discord = discord_targets();
        assert!(discord.would_enable("serenity::gateway", &Level::INFO));
        assert!(discord.would_enable("poise::dispatch", &Level::WARN));
        assert!(!discord.would_enable("serenity::gateway", &Level::DEBUG));
        assert!(!discord.would_enable("teyvat_helper", &Level::INFO));
    }

    #[test]
    fn appender_writes_into_log_dir() {
        let dir = std::env::temp_dir().join(format!("teyvat-helper-logs-{}", std::process::id()));
        let mut file = appender(&dir, "bot").unwrap();
        file.write_all(b"hello\n").unwrap();
        file.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|name| name.starts_with("bot.") && name.ends_with(".log")));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
