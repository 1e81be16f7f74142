//! Handles settings for the application. Configuration is read from
//! `config/settings.toml` (optional), then `GASTOS__*` environment variables,
//! then the plain variables the bot has always used (`TELEGRAM_BOT_TOKEN`,
//! `AUTHORIZED_USERS`, `DB_PATH`, ...), which win over everything else.

use std::path::PathBuf;

use chrono::NaiveTime;
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use sheets_sync::SheetsConfig;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
    pub timezone: String,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
    #[serde(default)]
    pub authorized_users: Vec<u64>,
    pub photos_dir: String,
    pub session_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Scheduler {
    pub run_at: String,
}

#[derive(Debug, Deserialize)]
pub struct Sheets {
    pub spreadsheet_id: Option<String>,
    pub worksheet: String,
    pub credentials_json: Option<String>,
    pub credentials_file: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub telegram: Telegram,
    pub scheduler: Scheduler,
    pub sheets: Sheets,
}

/// Plain environment variables mapped onto their settings key.
const ENV_OVERRIDES: [(&str, &str); 8] = [
    ("TELEGRAM_BOT_TOKEN", "telegram.token"),
    ("DB_PATH", "database.path"),
    ("PHOTOS_DIR", "telegram.photos_dir"),
    ("GOOGLE_SHEETS_ID", "sheets.spreadsheet_id"),
    ("GOOGLE_SHEETS_WORKSHEET", "sheets.worksheet"),
    ("GOOGLE_CREDENTIALS_JSON", "sheets.credentials_json"),
    ("GOOGLE_CREDENTIALS_FILE", "sheets.credentials_file"),
    ("TZ_NAME", "app.timezone"),
];

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("app.level", "info")?
            .set_default("app.timezone", "America/Lima")?
            .set_default("database.path", "data/gastos.db")?
            .set_default("telegram.token", "")?
            .set_default("telegram.photos_dir", "data/photos")?
            .set_default("telegram.session_timeout_secs", 900)?
            .set_default("scheduler.run_at", "08:00")?
            .set_default("sheets.worksheet", "Registro")?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("GASTOS")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("telegram.authorized_users"),
            );

        for (var, key) in ENV_OVERRIDES {
            if let Ok(value) = std::env::var(var)
                && !value.trim().is_empty()
            {
                builder = builder.set_override(key, value)?;
            }
        }
        if let Ok(raw) = std::env::var("AUTHORIZED_USERS") {
            let users = parse_user_list(&raw).map_err(ConfigError::Message)?;
            builder = builder.set_override("telegram.authorized_users", users)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.app
            .timezone
            .parse()
            .map_err(|_| ConfigError::Message(format!("unknown time zone {}", self.app.timezone)))
    }

    pub fn run_at(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.scheduler.run_at, "%H:%M").map_err(|err| {
            ConfigError::Message(format!(
                "invalid scheduler.run_at {:?}: {err}",
                self.scheduler.run_at
            ))
        })
    }

    pub fn sheets(&self) -> SheetsConfig {
        SheetsConfig {
            spreadsheet_id: self.sheets.spreadsheet_id.clone().unwrap_or_default(),
            worksheet: self.sheets.worksheet.clone(),
            credentials_json: self.sheets.credentials_json.clone(),
            credentials_file: self.sheets.credentials_file.as_ref().map(PathBuf::from),
        }
    }
}

/// Parses a comma separated list of Telegram user ids.
fn parse_user_list(raw: &str) -> Result<Vec<u64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| format!("invalid user id in AUTHORIZED_USERS: {part:?}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_authorized_users() {
        assert_eq!(parse_user_list("123, 456,").unwrap(), vec![123, 456]);
        assert_eq!(parse_user_list("").unwrap(), Vec::<u64>::new());
        assert!(parse_user_list("123,abc").is_err());
    }
}
