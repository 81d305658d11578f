use crate::api::client::StatsClient;
use crate::api::models::{ChampionDto, RoleStatsDto};
use crate::cache::JsonCache;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

pub type ChampionId = u32;

const BUNDLED_CHAMPIONS: &str = include_str!("../../data/champions.json");
const STATS_CACHE_KEY: &str = "champion_stats";
/// How long a fallback snapshot is served before the remote source is tried again.
const FALLBACK_RETRY_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Top,
    Jungle,
    Mid,
    Bottom,
    Support,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Top, Role::Jungle, Role::Mid, Role::Bottom, Role::Support];

    /// Maps any known synonym to a canonical role. Unknown input yields `None`.
    pub fn canonicalize(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TOP" => Some(Role::Top),
            "JUNGLE" | "JG" | "JUNG" => Some(Role::Jungle),
            "MID" | "MIDDLE" => Some(Role::Mid),
            "BOT" | "BOTTOM" | "ADC" | "CARRY" => Some(Role::Bottom),
            "SUPPORT" | "SUP" | "SUPP" | "UTILITY" => Some(Role::Support),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Role::Top => 0,
            Role::Jungle => 1,
            Role::Mid => 2,
            Role::Bottom => 3,
            Role::Support => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Top => "Top",
            Role::Jungle => "Jungle",
            Role::Mid => "Mid",
            Role::Bottom => "Bottom",
            Role::Support => "Support",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Top => "TOP",
            Role::Jungle => "JUNGLE",
            Role::Mid => "MID",
            Role::Bottom => "BOTTOM",
            Role::Support => "SUPPORT",
        };
        f.write_str(name)
    }
}

/// Coarse strength label, S strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    S,
    A,
    B,
    C,
    D,
}

impl Tier {
    pub fn from_label(label: &str) -> Option<Tier> {
        match label.trim().to_ascii_uppercase().as_str() {
            "S" => Some(Tier::S),
            "A" => Some(Tier::A),
            "B" => Some(Tier::B),
            "C" => Some(Tier::C),
            "D" => Some(Tier::D),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tier::S => "S",
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
            Tier::D => "D",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleStats {
    pub win_rate: f64,
    pub pick_rate: f64,
    /// Upstream desirability for the role, used as the baseline ranking signal
    pub score: f64,
}

impl RoleStats {
    /// Synthesized entry for roles the source has no data for.
    pub const NEUTRAL: RoleStats = RoleStats {
        win_rate: 0.50,
        pick_rate: 0.05,
        score: 0.0,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct Champion {
    pub id: ChampionId,
    pub name: String,
    pub title: String,
    pub win_rate: f64,
    pub pick_rate: f64,
    pub ban_rate: f64,
    pub tier: Option<Tier>,
    roles: [RoleStats; 5],
}

impl Champion {
    pub fn new(id: ChampionId, name: impl Into<String>) -> Self {
        Champion {
            id,
            name: name.into(),
            title: String::new(),
            win_rate: 0.5,
            pick_rate: 0.0,
            ban_rate: 0.0,
            tier: None,
            roles: [RoleStats::NEUTRAL; 5],
        }
    }

    pub fn with_tier(mut self, tier: Option<Tier>) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_ban_rate(mut self, ban_rate: f64) -> Self {
        self.ban_rate = clamp_rate(ban_rate);
        self
    }

    pub fn with_role(mut self, role: Role, stats: RoleStats) -> Self {
        self.roles[role.index()] = RoleStats {
            win_rate: clamp_rate(stats.win_rate),
            pick_rate: clamp_rate(stats.pick_rate),
            score: stats.score,
        };
        self
    }

    pub fn role(&self, role: Role) -> &RoleStats {
        &self.roles[role.index()]
    }
}

impl From<ChampionDto> for Champion {
    fn from(dto: ChampionDto) -> Self {
        let mut champion = Champion::new(dto.id, dto.name)
            .with_tier(dto.tier.as_deref().and_then(Tier::from_label))
            .with_ban_rate(dto.ban_rate);
        champion.title = dto.title;
        champion.win_rate = clamp_rate(dto.win_rate);
        champion.pick_rate = clamp_rate(dto.pick_rate);

        for (key, RoleStatsDto { win_rate, pick_rate, score }) in dto.roles {
            match Role::canonicalize(&key) {
                Some(role) => {
                    champion = champion.with_role(role, RoleStats { win_rate, pick_rate, score });
                }
                None => tracing::debug!(champion = %champion.name, role = %key, "dropping unknown role"),
            }
        }
        champion
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

pub fn champions_from_dtos(dtos: Vec<ChampionDto>) -> Vec<Champion> {
    dtos.into_iter().map(Champion::from).collect()
}

pub fn bundled_champions() -> Result<Vec<Champion>, AppError> {
    let dtos: Vec<ChampionDto> = serde_json::from_str(BUNDLED_CHAMPIONS)?;
    Ok(champions_from_dtos(dtos))
}

/// Supplies the full champion list; the returned snapshot is never mutated.
pub trait ChampionSource: Send + Sync {
    fn fetch_all(&self) -> Result<Arc<Vec<Champion>>, AppError>;
}

struct LoadedSnapshot {
    champions: Arc<Vec<Champion>>,
    expires_at: DateTime<Utc>,
}

/// Champion statistics backed by memory, a disk cache, an optional remote
/// endpoint and finally the bundled snapshot.
pub struct ChampionStore {
    client: Option<StatsClient>,
    cache: JsonCache,
    max_age: chrono::Duration,
    loaded: RwLock<Option<LoadedSnapshot>>,
}

impl ChampionStore {
    pub fn new(client: Option<StatsClient>, cache: JsonCache, max_age: chrono::Duration) -> Self {
        ChampionStore {
            client,
            cache,
            max_age,
            loaded: RwLock::new(None),
        }
    }

    pub fn clear_disk_cache(&self) {
        self.cache.remove(STATS_CACHE_KEY);
    }

    fn resolve(&self) -> Result<(Vec<Champion>, DateTime<Utc>), AppError> {
        let now = Utc::now();
        let retry_at = now + chrono::Duration::minutes(FALLBACK_RETRY_MINUTES);
        let fresh_until = now
            .checked_add_signed(self.max_age)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        if let Some(dtos) = self.cache.load_fresh::<Vec<ChampionDto>>(STATS_CACHE_KEY, self.max_age) {
            tracing::debug!(count = dtos.len(), "champion stats served from disk cache");
            return Ok((champions_from_dtos(dtos), fresh_until));
        }

        if let Some(client) = &self.client {
            match client.fetch_champions() {
                Ok(dtos) if !dtos.is_empty() => {
                    if let Err(e) = self.cache.save(STATS_CACHE_KEY, &dtos) {
                        tracing::warn!(error = %e, "failed to write champion stats cache");
                    }
                    return Ok((champions_from_dtos(dtos), fresh_until));
                }
                Ok(_) => tracing::warn!("remote champion stats were empty"),
                Err(e) => tracing::warn!(error = %e, "remote champion stats unavailable"),
            }
        }

        if let Some((cached_at, dtos)) = self.cache.load_any::<Vec<ChampionDto>>(STATS_CACHE_KEY) {
            if !dtos.is_empty() {
                tracing::info!(%cached_at, "using stale champion stats cache");
                return Ok((champions_from_dtos(dtos), retry_at));
            }
        }

        let champions = bundled_champions()?;
        tracing::info!(count = champions.len(), "using bundled champion snapshot");
        let expires_at = if self.client.is_some() { retry_at } else { fresh_until };
        Ok((champions, expires_at))
    }
}

impl ChampionSource for ChampionStore {
    fn fetch_all(&self) -> Result<Arc<Vec<Champion>>, AppError> {
        if let Some(snapshot) = self.loaded.read().as_ref() {
            if snapshot.expires_at > Utc::now() {
                return Ok(Arc::clone(&snapshot.champions));
            }
        }

        let mut loaded = self.loaded.write();
        // Another caller may have refreshed while we waited for the write lock.
        if let Some(snapshot) = loaded.as_ref() {
            if snapshot.expires_at > Utc::now() {
                return Ok(Arc::clone(&snapshot.champions));
            }
        }

        let (champions, expires_at) = self.resolve()?;
        if champions.is_empty() {
            return Err(AppError::NoChampionData);
        }
        let champions = Arc::new(champions);
        *loaded = Some(LoadedSnapshot {
            champions: Arc::clone(&champions),
            expires_at,
        });
        Ok(champions)
    }
}
