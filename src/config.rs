use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub database: DatabaseConfig,
    pub data: DataConfig,
    pub dev: DevConfig,
    /// Arguments passed to `ssh -NL` before the database is opened.
    pub ssh_tunnel: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub token: String,
    /// Guild to register commands in. Commands are registered globally when unset.
    pub guild_id: Option<u64>,
    pub owners: Vec<u64>,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub daily_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DevConfig {
    /// Interpreter used by `/dev eval`; the submitted code is appended as the last argument.
    pub eval_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord: DiscordConfig::default(),
            database: DatabaseConfig::default(),
            data: DataConfig::default(),
            dev: DevConfig::default(),
            ssh_tunnel: None,
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            guild_id: None,
            owners: Vec::new(),
            extensions: vec![
                "misc".to_string(),
                "timers".to_string(),
                "data".to_string(),
                "dev".to_string(),
            ],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:teyvat.db".to_string(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            daily_path: PathBuf::from("data/daily.json"),
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            eval_command: vec!["python3".to_string(), "-c".to_string()],
        }
    }
}

impl Config {
    /// Loads `config.toml` (or `CONFIG_PATH`) and applies environment overrides.
    ///
    /// A missing file is not an error; the defaults plus `DISCORD_TOKEN` are enough to run.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;

        if let Ok(token) = env::var("DISCORD_TOKEN") {
            config.discord.token = token;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database.url = url;
        }

        if config.discord.token.is_empty() {
            return Err(anyhow::anyhow!(
                "discord.token or the DISCORD_TOKEN environment variable is required"
            ));
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {:?}", path))?;
        Self::parse(&content).with_context(|| format!("failed to parse config at {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = Config::parse(
            r#"
            ssh_tunnel = ["5432:localhost:5432", "user@example.com"]

            [discord]
            token = "abc"
            guild_id = 864774293300838420
            owners = [455289384187592704]
            extensions = ["misc", "dev"]

            [database]
            url = "sqlite::memory:"

            [dev]
            eval_command = []
            "#,
        )
        .unwrap();

        assert_eq!(config.discord.token, "abc");
        assert_eq!(config.discord.guild_id, Some(864774293300838420));
        assert_eq!(config.discord.owners, vec![455289384187592704]);
        assert_eq!(config.discord.extensions, vec!["misc", "dev"]);
        assert_eq!(config.database.url, "sqlite::memory:");
        assert!(config.dev.eval_command.is_empty());
        assert_eq!(config.ssh_tunnel.unwrap().len(), 2);
        assert_eq!(config.data.daily_path, PathBuf::from("data/daily.json"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.discord.token.is_empty());
        assert_eq!(config.discord.extensions.len(), 4);
        assert_eq!(config.database.url, "sqlite:teyvat.db");
        assert!(config.ssh_tunnel.is_none());
        assert_eq!(config.dev.eval_command, vec!["python3", "-c"]);
    }

    #[test]
    fn rejects_malformed_config() {
        assert!(Config::parse("[discord]\ntoken = 5").is_err());
    }
}
