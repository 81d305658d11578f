use crate::analysis::champion_stats::{ChampionId, ChampionSource, ChampionStore, Role};
use crate::analysis::matchups::MatchupTable;
use crate::analysis::recommender::PickRecommender;
use crate::analysis::session::{self, Dispatch, RecommendationBatch, SessionEvent, SessionObserver, SessionTracker, TrackerState};
use crate::api::client::StatsClient;
use crate::api::lcu::{LcuClient, LcuObserver, Lockfile};
use crate::cache::JsonCache;
use crate::config::Config;
use crate::error::AppError;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Connection {
    observer: Arc<LcuObserver>,
    poll_stop: Arc<AtomicBool>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.observer.shutdown();
        self.poll_stop.store(true, Ordering::Relaxed);
    }
}

/// Everything the advisor owns for the lifetime of the process.
pub struct App {
    config: Config,
    store: Arc<ChampionStore>,
    matchups: Arc<MatchupTable>,
    tracker: Arc<SessionTracker>,
    events: Sender<SessionEvent>,
    connection: Option<Connection>,
}

impl App {
    pub fn new(config: Config, offline: bool, refresh: bool) -> Result<(Self, Receiver<SessionEvent>), AppError> {
        Self::with_cache(config, JsonCache::new(JsonCache::default_dir()), offline, refresh)
    }

    pub fn with_cache(
        config: Config,
        cache: JsonCache,
        offline: bool,
        refresh: bool,
    ) -> Result<(Self, Receiver<SessionEvent>), AppError> {
        let client = match (&config.stats_url, offline) {
            (Some(url), false) => Some(StatsClient::new(url.clone())),
            _ => None,
        };
        let store = Arc::new(ChampionStore::new(client, cache, config.stats_max_age()));
        if refresh {
            store.clear_disk_cache();
        }

        let mut matchups = MatchupTable::bundled()?;
        if let Ok(champions) = store.fetch_all() {
            matchups.learn_names(champions.iter());
        }
        let matchups = Arc::new(matchups);

        let engine = Arc::new(
            PickRecommender::new(store.clone(), matchups.clone()).with_memo(config.recommendation_ttl()),
        );

        let (events, receiver) = crossbeam_channel::unbounded();
        let tracker = Arc::new(SessionTracker::new(
            engine,
            config.recommend_count,
            events.clone(),
            Dispatch::Background,
        ));

        let app = App {
            config,
            store,
            matchups,
            tracker,
            events,
            connection: None,
        };
        Ok((app, receiver))
    }

    pub fn tracker(&self) -> Arc<SessionTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn warm_up(&self) -> Result<usize, AppError> {
        self.store.fetch_all().map(|champions| champions.len())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn tracking_state(&self) -> TrackerState {
        self.tracker.state()
    }

    pub fn champion_name(&self, id: ChampionId) -> String {
        self.matchups.name_of(id)
    }

    /// (Re)connects to the running client and starts session tracking.
    /// A failed attempt leaves any existing connection running.
    pub fn connect(&mut self) -> Result<u16, AppError> {
        let (path, lockfile) = Lockfile::discover(self.config.lockfile.as_deref())?;
        tracing::info!(path = %path.display(), port = lockfile.port, "connecting to League client");
        let observer = Arc::new(LcuObserver::new(LcuClient::new(&lockfile)?));

        // Stop the previous listener before the new one starts feeding the tracker.
        self.connection = None;
        session::attach(&self.tracker, observer.as_ref());

        let poll_stop = Arc::new(AtomicBool::new(false));
        let poll_observer: Arc<dyn SessionObserver> = observer.clone();
        session::spawn_liveness_poll(
            self.tracker(),
            poll_observer,
            self.config.liveness_poll_interval(),
            poll_stop.clone(),
        );

        self.connection = Some(Connection { observer, poll_stop });
        let _ = self
            .events
            .send(SessionEvent::Status(format!("Connected to League client on port {}", lockfile.port)));
        Ok(lockfile.port)
    }

    /// Manual override: explicit role (raw text) or the tracked one, optional opponent by name.
    pub fn recommend(&self, role: Option<&str>, versus: Option<&str>) -> Result<RecommendationBatch, String> {
        let role = match role {
            Some(raw) => Some(
                Role::canonicalize(raw).ok_or_else(|| {
                    let known: Vec<String> = Role::ALL.iter().map(|r| r.label().to_lowercase()).collect();
                    format!("Unknown role '{}'. Try one of: {}", raw, known.join(", "))
                })?,
            ),
            None => None,
        };
        let opponent = match versus {
            Some(name) => Some(
                self.matchups
                    .id_of(name)
                    .ok_or_else(|| format!("Unknown champion '{}'", name))?,
            ),
            None => None,
        };

        self.tracker
            .recommend_now(role, opponent)
            .ok_or_else(|| "No role assigned yet. Use: recommend <role>".to_string())
    }
}
