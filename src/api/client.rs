use crate::api::endpoints::USER_AGENT;
use crate::error::AppError;
use governor::{clock::DefaultClock, state::{InMemoryState, NotKeyed}, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::thread;
use std::time::Duration;

use super::models::ChampionDto;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 3;
const FETCHES_PER_MINUTE: u32 = 4;

/// Remote champion statistics source.
pub struct StatsClient {
    url: String,
    agent: ureq::Agent,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl StatsClient {
    pub fn new(url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build();
        let quota = Quota::per_minute(NonZeroU32::new(FETCHES_PER_MINUTE).unwrap_or(NonZeroU32::MIN));
        StatsClient {
            url: url.into(),
            agent,
            rate_limiter: RateLimiter::direct(quota),
        }
    }

    fn execute_request(&self) -> Result<String, AppError> {
        if self.rate_limiter.check().is_err() {
            return Err(AppError::RateLimited);
        }

        let mut retry_count = 0;
        loop {
            match self.agent.get(&self.url).call() {
                Ok(resp) => {
                    return resp
                        .into_string()
                        .map_err(|e| AppError::HttpError(e.to_string()));
                }
                Err(ureq::Error::Status(429, _)) | Err(ureq::Error::Status(503, _)) => {
                    if retry_count >= MAX_RETRIES {
                        return Err(AppError::RateLimited);
                    }
                    let wait_ms = 1000 * (retry_count + 1) as u64;
                    tracing::info!(wait_ms, "stats endpoint busy, retrying");
                    thread::sleep(Duration::from_millis(wait_ms));
                    retry_count += 1;
                }
                Err(e) => return Err(AppError::HttpError(e.to_string())),
            }
        }
    }

    pub fn fetch_champions(&self) -> Result<Vec<ChampionDto>, AppError> {
        let body = self.execute_request()?;
        let champions: Vec<ChampionDto> = serde_json::from_str(&body)?;
        tracing::info!(count = champions.len(), url = %self.url, "fetched champion stats");
        Ok(champions)
    }
}
