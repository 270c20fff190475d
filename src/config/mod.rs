//! Configuration module

use anyhow::Context;
use chrono::NaiveTime;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Admin password. Falls back to the `PASSWORD` environment variable.
    #[serde(default)]
    pub password: Option<String>,
    /// Routers usually serve a self-signed certificate
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            password: None,
            accept_invalid_certs: false,
        }
    }
}

impl RouterConfig {
    pub fn password(&self) -> anyhow::Result<&str> {
        self.password
            .as_deref()
            .context("Router password not set (router.password or PASSWORD)")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Time to turn Wi-Fi on (HH:MM, 24h, local time)
    #[serde(default = "default_on_time")]
    pub on_time: String,
    /// Time to turn Wi-Fi off (HH:MM, 24h, local time)
    #[serde(default = "default_off_time")]
    pub off_time: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Bring Wi-Fi into the scheduled state as soon as the scheduler starts
    #[serde(default = "default_true")]
    pub apply_on_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            on_time: default_on_time(),
            off_time: default_off_time(),
            check_interval_secs: default_check_interval(),
            apply_on_start: true,
        }
    }
}

impl ScheduleConfig {
    /// Parsed (on, off) times
    pub fn times(&self) -> anyhow::Result<(NaiveTime, NaiveTime)> {
        let on = parse_hhmm(&self.on_time).context("Invalid schedule.on_time")?;
        let off = parse_hhmm(&self.off_time).context("Invalid schedule.off_time")?;
        if on == off {
            anyhow::bail!("schedule.on_time and schedule.off_time are both {}", self.on_time);
        }
        Ok((on, off))
    }
}

fn parse_hhmm(value: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("expected HH:MM, got '{}'", value))
}

fn default_base_url() -> String {
    "https://myrouter.io".to_string()
}

fn default_on_time() -> String {
    "07:00".to_string()
}

fn default_off_time() -> String {
    "23:00".to_string()
}

fn default_check_interval() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load from `path` (or the optional `config/default`), then
    /// `ROUTERWIFI__*` environment variables.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::with_name(path.unwrap_or("config/default")).required(path.is_some()),
            )
            .add_source(config::Environment::with_prefix("ROUTERWIFI").separator("__"))
            .build()?;

        let config = Self::from_settings(settings, std::env::var("PASSWORD").ok())?;
        tracing::debug!("Configuration loaded for {}", config.router.base_url);
        Ok(config)
    }

    fn from_settings(
        settings: config::Config,
        password_env: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut config: Config = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        if config.router.password.as_deref().map_or(true, str::is_empty) {
            config.router.password = password_env.filter(|p| !p.is_empty());
        }

        config.schedule.times()?;
        if config.schedule.check_interval_secs == 0 {
            anyhow::bail!("schedule.check_interval_secs must be greater than zero");
        }

        Ok(config)
    }
}
