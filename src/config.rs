use std::env;

use crate::engine::matching::DEFAULT_MAX_DISTANCE_KM;
use crate::error::AppError;
use crate::state::MatchSettings;

/// Radius the order assignment dialog searches by default.
pub const DEFAULT_ASSIGNMENT_RADIUS_KM: f64 = 15.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    /// `compact` (default) or `json`.
    pub log_format: String,
    pub event_buffer_size: usize,
    pub match_radius_km: f64,
    pub assignment_radius_km: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            match_radius_km: parse_or_default("MATCH_RADIUS_KM", DEFAULT_MAX_DISTANCE_KM)?,
            assignment_radius_km: parse_or_default(
                "ASSIGNMENT_RADIUS_KM",
                DEFAULT_ASSIGNMENT_RADIUS_KM,
            )?,
        };

        if !matches!(config.log_format.as_str(), "compact" | "json") {
            return Err(AppError::Internal(format!(
                "invalid LOG_FORMAT: {} (expected compact or json)",
                config.log_format
            )));
        }

        for (key, radius) in [
            ("MATCH_RADIUS_KM", config.match_radius_km),
            ("ASSIGNMENT_RADIUS_KM", config.assignment_radius_km),
        ] {
            if !radius.is_finite() || radius < 0.0 {
                return Err(AppError::Internal(format!(
                    "invalid {key}: must be a non-negative number"
                )));
            }
        }

        Ok(config)
    }

    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            default_radius_km: self.match_radius_km,
            assignment_radius_km: self.assignment_radius_km,
            ..MatchSettings::default()
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
