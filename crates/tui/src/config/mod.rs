use std::path::PathBuf;

use chrono_tz::Tz;
use clap::Parser;
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/kudi.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: String,
    /// Publishable key of the identity provider. Required.
    pub identity_key: String,
    pub user_id: String,
    pub session_token: Option<String>,
    /// Shell command printing a fresh session token on stdout.
    pub token_command: Option<String>,
    pub first_name: Option<String>,
    pub email: Option<String>,
    pub timezone: String,
    pub cache_dir: PathBuf,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:3000".to_string(),
            identity_key: String::new(),
            user_id: String::new(),
            session_token: None,
            token_command: None,
            first_name: None,
            email: None,
            timezone: "Africa/Lagos".to_string(),
            cache_dir: PathBuf::from(".kudi"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Fails when a setting the app cannot start without is blank.
    pub fn validate(&self) -> Result<()> {
        if self.identity_key.trim().is_empty() {
            return Err(AppError::MissingConfig("identity_key"));
        }
        if self.user_id.trim().is_empty() {
            return Err(AppError::MissingConfig("user_id"));
        }
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| AppError::Timezone(self.timezone.clone()))
    }
}

#[derive(Debug, Parser)]
#[command(name = "kudi", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override API base URL (e.g. http://127.0.0.1:3000).
    #[arg(long)]
    api_url: Option<String>,
    /// Override the signed-in user id.
    #[arg(long)]
    user_id: Option<String>,
    /// Override timezone (IANA name).
    #[arg(long)]
    timezone: Option<String>,
    /// Override cache and log directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

pub fn load() -> Result<AppConfig> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("KUDI"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    if let Some(user_id) = args.user_id {
        settings.user_id = user_id;
    }
    if let Some(timezone) = args.timezone {
        settings.timezone = timezone;
    }
    if let Some(cache_dir) = args.cache_dir {
        settings.cache_dir = cache_dir;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }

    settings.validate()?;
    Ok(settings)
}
