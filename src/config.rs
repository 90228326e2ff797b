use crate::components::reminders::{
    Anchor, DailyTrigger, NotificationCategory, ReminderSettings, WindowTrigger,
};
use crate::error::{config_error, env_error, BotResult, Error};
use crate::utils::time::{minutes, parse_time};
use crate::utils::timezone;
use chrono::Duration;
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::str::FromStr;
use tracing::warn;

/// Default activity text for the bot
pub const DEFAULT_ACTIVITY: &str = "Watching the calendar";

/// Path of the optional component toggle file
pub const COMPONENTS_FILE: &str = "config/components.toml";

/// Components known to the bot, all enabled unless turned off
pub const COMPONENT_NAMES: [&str; 3] = ["calendar_feed", "reminders", "interactions"];

/// Once a day, give or take a late start
const DAILY_SUMMARY_SUPPRESSION_HOURS: i64 = 20;

/// Main configuration structure for the bot
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// Discord channel ID to send notifications to
    pub calendar_channel_id: u64,
    /// iCalendar feed URL
    pub ics_url: String,
    /// Zone for zone-less feed timestamps and the recipient's initial zone
    pub default_timezone: Tz,
    pub cache_max_age_secs: u64,
    pub poll_interval_secs: u64,
    pub http_timeout_secs: u64,
    pub reminder_lead_minutes: u32,
    pub reminder_lag_minutes: u32,
    pub reminder_suppression_minutes: u32,
    pub completion_prompt_lead_minutes: u32,
    pub completion_prompt_lag_minutes: u32,
    pub completion_prompt_suppression_minutes: u32,
    /// `HH:MM` wall-clock time of the daily summary
    pub daily_summary_time: String,
    pub daily_summary_timezone: Tz,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
    /// Bot activity status text
    pub activity: String,
}

#[derive(Debug, Default, Deserialize)]
struct ComponentsFile {
    #[serde(default)]
    components: HashMap<String, bool>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> BotResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = Self::from_lookup(|key| env::var(key).ok())?;

        match fs::read_to_string(COMPONENTS_FILE) {
            Ok(content) => config.apply_components_toml(&content)?,
            Err(_) => warn!("{} not found, enabling all components", COMPONENTS_FILE),
        }

        Ok(config)
    }

    /// Build the configuration from any key-value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BotResult<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| env_error(key));

        let discord_token = required("DISCORD_TOKEN")?;
        let ics_url = required("ICS_URL")?;
        let calendar_channel_id = required("CALENDAR_CHANNEL_ID")?
            .trim()
            .parse::<u64>()
            .map_err(|_| invalid_value("CALENDAR_CHANNEL_ID"))?;

        let default_timezone =
            timezone::resolve(&lookup("DEFAULT_TIMEZONE").unwrap_or_else(|| "UTC".to_string()))?;
        let daily_summary_timezone = match lookup("DAILY_SUMMARY_TIMEZONE") {
            Some(name) => timezone::resolve(&name)?,
            None => default_timezone,
        };

        let daily_summary_time = lookup("DAILY_SUMMARY_TIME").unwrap_or_else(|| "07:00".to_string());
        if parse_time(&daily_summary_time).is_none() {
            return Err(invalid_value("DAILY_SUMMARY_TIME"));
        }

        let cache_max_age_secs = parse_or(&lookup, "CACHE_MAX_AGE_SECS", 60)?;
        let poll_interval_secs = parse_or(&lookup, "POLL_INTERVAL_SECS", 60)?;
        let http_timeout_secs = parse_or(&lookup, "HTTP_TIMEOUT_SECS", 10)?;
        if poll_interval_secs == 0 {
            return Err(config_error("POLL_INTERVAL_SECS must be greater than zero"));
        }
        if http_timeout_secs == 0 {
            return Err(config_error("HTTP_TIMEOUT_SECS must be greater than zero"));
        }

        let components = COMPONENT_NAMES
            .iter()
            .map(|name| (name.to_string(), true))
            .collect();

        Ok(Config {
            discord_token,
            calendar_channel_id,
            ics_url,
            default_timezone,
            cache_max_age_secs,
            poll_interval_secs,
            http_timeout_secs,
            reminder_lead_minutes: parse_or(&lookup, "REMINDER_LEAD_MINUTES", 15)?,
            reminder_lag_minutes: parse_or(&lookup, "REMINDER_LAG_MINUTES", 15)?,
            reminder_suppression_minutes: parse_or(&lookup, "REMINDER_SUPPRESSION_MINUTES", 60)?,
            completion_prompt_lead_minutes: parse_or(&lookup, "COMPLETION_PROMPT_LEAD_MINUTES", 0)?,
            completion_prompt_lag_minutes: parse_or(&lookup, "COMPLETION_PROMPT_LAG_MINUTES", 30)?,
            completion_prompt_suppression_minutes: parse_or(
                &lookup,
                "COMPLETION_PROMPT_SUPPRESSION_MINUTES",
                720,
            )?,
            daily_summary_time,
            daily_summary_timezone,
            components,
            activity: lookup("BOT_ACTIVITY").unwrap_or_else(|| DEFAULT_ACTIVITY.to_string()),
        })
    }

    /// Merge `[components]` toggles over the defaults
    pub fn apply_components_toml(&mut self, content: &str) -> BotResult<()> {
        let file: ComponentsFile = toml::from_str(content)?;
        for (name, enabled) in file.components {
            if !COMPONENT_NAMES.contains(&name.as_str()) {
                warn!("Ignoring unknown component '{}' in {}", name, COMPONENTS_FILE);
                continue;
            }
            self.components.insert(name, enabled);
        }
        Ok(())
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs)
    }

    /// Typed trigger settings for the reminder scheduler
    pub fn notification_settings(&self) -> BotResult<ReminderSettings> {
        let cache_max_age = i64::try_from(self.cache_max_age_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| invalid_value("CACHE_MAX_AGE_SECS"))?;

        Ok(ReminderSettings {
            poll_interval: std::time::Duration::from_secs(self.poll_interval_secs),
            cache_max_age,
            upcoming: WindowTrigger {
                category: NotificationCategory::Upcoming,
                anchor: Anchor::Start,
                lead: minutes(self.reminder_lead_minutes),
                lag: minutes(self.reminder_lag_minutes),
                suppression: minutes(self.reminder_suppression_minutes),
            },
            completion_prompt: WindowTrigger {
                category: NotificationCategory::CompletionPrompt,
                anchor: Anchor::End,
                lead: minutes(self.completion_prompt_lead_minutes),
                lag: minutes(self.completion_prompt_lag_minutes),
                suppression: minutes(self.completion_prompt_suppression_minutes),
            },
            daily: DailyTrigger {
                category: NotificationCategory::DailySummary,
                time: self.daily_summary_time.clone(),
                reference_zone: self.daily_summary_timezone,
                suppression: Duration::hours(DAILY_SUMMARY_SUPPRESSION_HOURS),
            },
        })
    }
}

fn invalid_value(var: &str) -> Error {
    Error::Environment(format!("Invalid value for {}", var))
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> BotResult<T> {
    match lookup(key) {
        Some(value) => value.trim().parse::<T>().map_err(|_| invalid_value(key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DISCORD_TOKEN", "token"),
        ("CALENDAR_CHANNEL_ID", "1234"),
        ("ICS_URL", "https://calendar.example/feed.ics"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.default_timezone, chrono_tz::UTC);
        assert_eq!(config.daily_summary_timezone, chrono_tz::UTC);
        assert_eq!(config.daily_summary_time, "07:00");
        assert_eq!(config.activity, DEFAULT_ACTIVITY);
        for name in COMPONENT_NAMES {
            assert!(config.is_component_enabled(name));
        }

        let settings = config.notification_settings().unwrap();
        assert_eq!(settings.cache_max_age, Duration::seconds(60));
        assert_eq!(settings.upcoming.lead, Duration::minutes(15));
        assert_eq!(settings.upcoming.suppression, Duration::minutes(60));
        assert_eq!(settings.completion_prompt.anchor, Anchor::End);
        assert_eq!(settings.completion_prompt.suppression, Duration::hours(12));
    }

    #[test]
    fn test_missing_required() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, Error::Environment(message) if message.contains("ICS_URL")));
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DEFAULT_TIMEZONE", "Mars/Olympus"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(Error::InvalidZone { .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("REMINDER_LEAD_MINUTES", "soon"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(Error::Environment(message)) if message.contains("REMINDER_LEAD_MINUTES")
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DAILY_SUMMARY_TIME", "25:00"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POLL_INTERVAL_SECS", "0"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_daily_zone_follows_default() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DEFAULT_TIMEZONE", "Europe/Helsinki"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.daily_summary_timezone, chrono_tz::Europe::Helsinki);

        pairs.push(("DAILY_SUMMARY_TIMEZONE", "America/New_York"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.daily_summary_timezone, chrono_tz::America::New_York);
        assert_eq!(config.default_timezone, chrono_tz::Europe::Helsinki);
    }

    #[test]
    fn test_components_toml() {
        let mut config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        config
            .apply_components_toml("[components]\nreminders = false\nweather = true\n")
            .unwrap();

        assert!(!config.is_component_enabled("reminders"));
        assert!(config.is_component_enabled("calendar_feed"));
        assert!(!config.is_component_enabled("weather"));
        assert!(config.apply_components_toml("[components").is_err());
    }
}
