use crate::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_STATS_CACHE_HOURS: u64 = 6;
const DEFAULT_RECOMMENDATION_CACHE_MINUTES: u64 = 5;
const DEFAULT_LIVENESS_POLL_SECS: u64 = 10;
const DEFAULT_RECOMMEND_COUNT: usize = 5;

// Upper bounds keep every derived duration representable.
const MAX_STATS_CACHE_HOURS: u64 = 24 * 365;
const MAX_RECOMMENDATION_CACHE_MINUTES: u64 = 24 * 60;
const MAX_LIVENESS_POLL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit lockfile path; platform defaults are tried when unset
    pub lockfile: Option<PathBuf>,
    /// Remote champion statistics endpoint; bundled snapshot only when unset
    pub stats_url: Option<String>,
    pub stats_cache_hours: u64,
    pub recommendation_cache_minutes: u64,
    pub liveness_poll_secs: u64,
    pub recommend_count: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let recommend_count = parse_or(&lookup, "RECOMMEND_COUNT", DEFAULT_RECOMMEND_COUNT)?;
        if recommend_count == 0 {
            return Err(AppError::ConfigError(
                "RECOMMEND_COUNT must be at least 1".to_string(),
            ));
        }

        let stats_cache_hours = at_most(
            "STATS_CACHE_HOURS",
            parse_or(&lookup, "STATS_CACHE_HOURS", DEFAULT_STATS_CACHE_HOURS)?,
            MAX_STATS_CACHE_HOURS,
        )?;
        let recommendation_cache_minutes = at_most(
            "RECOMMENDATION_CACHE_MINUTES",
            parse_or(
                &lookup,
                "RECOMMENDATION_CACHE_MINUTES",
                DEFAULT_RECOMMENDATION_CACHE_MINUTES,
            )?,
            MAX_RECOMMENDATION_CACHE_MINUTES,
        )?;
        let liveness_poll_secs = at_most(
            "LIVENESS_POLL_SECS",
            parse_or(&lookup, "LIVENESS_POLL_SECS", DEFAULT_LIVENESS_POLL_SECS)?,
            MAX_LIVENESS_POLL_SECS,
        )?
        .max(1);

        Ok(Config {
            lockfile: non_empty("LEAGUE_LOCKFILE").map(PathBuf::from),
            stats_url: non_empty("STATS_URL"),
            stats_cache_hours,
            recommendation_cache_minutes,
            liveness_poll_secs,
            recommend_count,
        })
    }

    pub fn stats_max_age(&self) -> chrono::Duration {
        let hours = self.stats_cache_hours.min(MAX_STATS_CACHE_HOURS) as i64;
        chrono::Duration::try_hours(hours).unwrap_or(chrono::Duration::MAX)
    }

    pub fn recommendation_ttl(&self) -> Duration {
        let minutes = self.recommendation_cache_minutes.min(MAX_RECOMMENDATION_CACHE_MINUTES);
        Duration::from_secs(minutes.saturating_mul(60))
    }

    pub fn liveness_poll_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_poll_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
        _ => Ok(default),
    }
}

fn at_most(key: &str, value: u64, max: u64) -> Result<u64, AppError> {
    if value > max {
        return Err(AppError::ConfigError(format!(
            "{} must be at most {}, got {}",
            key, max, value
        )));
    }
    Ok(value)
}
