//! Champ select tracking.
//!
//! `SessionTracker` turns pushed session snapshots and a periodic liveness
//! check into recommendation requests. Its three fields (phase, last role,
//! last opponent) sit behind one mutex so a push update and a poll-triggered
//! reset never interleave. Engine calls happen outside the lock.

use super::champion_stats::{ChampionId, Role};
use super::recommender::{Recommend, Recommendation};
use crate::api::models::ChampSelectSession;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub type SessionSnapshot = ChampSelectSession;
pub type SnapshotCallback = Box<dyn Fn(SessionSnapshot) + Send + 'static>;

/// Live view of the user's pick session.
pub trait SessionObserver: Send + Sync {
    fn current_session(&self) -> Option<SessionSnapshot>;

    /// Delivers snapshots in arrival order, at least once each.
    fn subscribe(&self, callback: SnapshotCallback);

    fn is_session_active(&self) -> bool {
        self.current_session().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    Idle,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationKind {
    Initial,
    RoleChanged,
    CounterUpdate,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendationRequest {
    pub role: Role,
    pub opponent: Option<ChampionId>,
    pub kind: RecommendationKind,
    pub generation: u64,
}

/// Engine output tagged with what it was computed for.
#[derive(Debug, Clone)]
pub struct RecommendationBatch {
    pub role: Role,
    pub opponent: Option<ChampionId>,
    pub opponent_name: Option<String>,
    pub kind: RecommendationKind,
    pub generation: u64,
    pub recommendations: Vec<Recommendation>,
}

impl RecommendationBatch {
    /// True when a newer request was dispatched after this one.
    pub fn is_stale(&self, latest_generation: u64) -> bool {
        self.generation < latest_generation
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Status(String),
    Error(String),
    SessionStarted,
    RoleChanged { from: Option<Role>, to: Role },
    Recommendations(RecommendationBatch),
    SessionEnded,
}

/// How engine calls are run once a transition asks for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Background,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerState {
    pub phase: TrackerPhase,
    pub last_role: Option<Role>,
    pub last_opponent: Option<ChampionId>,
}

impl TrackerState {
    const IDLE: TrackerState = TrackerState {
        phase: TrackerPhase::Idle,
        last_role: None,
        last_opponent: None,
    };
}

struct Tracked {
    state: TrackerState,
    /// Bumped by every applied snapshot; lets a liveness check detect pushes that raced it.
    updates: u64,
}

pub struct SessionTracker {
    engine: Arc<dyn Recommend>,
    count: usize,
    events: Sender<SessionEvent>,
    dispatch: Dispatch,
    tracked: Mutex<Tracked>,
    generation: AtomicU64,
}

impl SessionTracker {
    pub fn new(
        engine: Arc<dyn Recommend>,
        count: usize,
        events: Sender<SessionEvent>,
        dispatch: Dispatch,
    ) -> Self {
        SessionTracker {
            engine,
            count,
            events,
            dispatch,
            tracked: Mutex::new(Tracked {
                state: TrackerState::IDLE,
                updates: 0,
            }),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> TrackerState {
        self.tracked.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.tracked.lock().state.phase == TrackerPhase::Active
    }

    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn emit(&self, event: SessionEvent) {
        // The receiver only goes away during shutdown.
        let _ = self.events.send(event);
    }

    fn request(&self, role: Role, opponent: Option<ChampionId>, kind: RecommendationKind) -> RecommendationRequest {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        RecommendationRequest {
            role,
            opponent,
            kind,
            generation,
        }
    }

    /// Applies one pushed snapshot and dispatches whatever it triggers.
    pub fn on_update(&self, snapshot: &SessionSnapshot) -> Vec<RecommendationRequest> {
        let requests = self.transition(snapshot);
        for request in &requests {
            self.dispatch_request(*request);
        }
        requests
    }

    fn transition(&self, snapshot: &SessionSnapshot) -> Vec<RecommendationRequest> {
        let mut tracked = self.tracked.lock();
        tracked.updates = tracked.updates.wrapping_add(1);
        let state = &mut tracked.state;
        let role = snapshot.assigned_role();
        let opponent = role.and_then(|r| snapshot.opposing_pick_in_role(r));
        let mut requests = Vec::new();

        if state.phase == TrackerPhase::Idle {
            *state = TrackerState {
                phase: TrackerPhase::Active,
                last_role: role,
                last_opponent: opponent,
            };
            tracing::info!(?role, ?opponent, "champ select started");
            self.emit(SessionEvent::SessionStarted);
            if let Some(role) = role {
                requests.push(self.request(role, opponent, RecommendationKind::Initial));
            }
            return requests;
        }

        let role_changed = role != state.last_role;
        let opponent_changed = opponent != state.last_opponent;

        if role_changed {
            let previous = state.last_role;
            state.last_role = role;
            if let Some(role) = role {
                tracing::info!(from = ?previous, to = %role, "assigned role changed");
                self.emit(SessionEvent::RoleChanged { from: previous, to: role });
                // A changed opponent gets its own request below.
                let carried = if opponent_changed { None } else { opponent };
                requests.push(self.request(role, carried, RecommendationKind::RoleChanged));
            }
        }

        if opponent_changed {
            state.last_opponent = opponent;
            if let (Some(role), Some(opponent)) = (role, opponent) {
                tracing::info!(%role, opponent, "opposing pick changed");
                requests.push(self.request(role, Some(opponent), RecommendationKind::CounterUpdate));
            }
        }

        requests
    }

    /// Resets to idle. Returns false if no session was active.
    pub fn end_session(&self) -> bool {
        self.reset(None)
    }

    /// One liveness check; ends the session if the observer no longer sees it.
    /// A snapshot applied while the observer was being asked keeps the session alive.
    pub fn poll_liveness(&self, observer: &dyn SessionObserver) -> bool {
        let seen = {
            let tracked = self.tracked.lock();
            if tracked.state.phase == TrackerPhase::Idle {
                return false;
            }
            tracked.updates
        };
        if observer.is_session_active() {
            return false;
        }
        self.reset(Some(seen))
    }

    fn reset(&self, seen_updates: Option<u64>) -> bool {
        let mut tracked = self.tracked.lock();
        if tracked.state.phase == TrackerPhase::Idle {
            return false;
        }
        if let Some(seen) = seen_updates {
            if tracked.updates != seen {
                tracing::debug!("session update arrived during liveness check, keeping session");
                return false;
            }
        }
        tracked.state = TrackerState::IDLE;
        tracing::info!("champ select ended");
        self.emit(SessionEvent::SessionEnded);
        true
    }

    /// Recommendations on demand. Tracking state is left untouched.
    pub fn recommend_now(&self, role: Option<Role>, opponent: Option<ChampionId>) -> Option<RecommendationBatch> {
        let role = role.or(self.state().last_role)?;
        let request = RecommendationRequest {
            role,
            opponent,
            kind: RecommendationKind::Manual,
            generation: self.latest_generation(),
        };
        Some(run_request(self.engine.as_ref(), self.count, request))
    }

    fn dispatch_request(&self, request: RecommendationRequest) {
        match self.dispatch {
            Dispatch::Inline => {
                let batch = run_request(self.engine.as_ref(), self.count, request);
                let _ = self.events.send(batch_event(batch));
            }
            Dispatch::Background => {
                let engine = Arc::clone(&self.engine);
                let events = self.events.clone();
                let count = self.count;
                thread::spawn(move || {
                    let batch = run_request(engine.as_ref(), count, request);
                    let _ = events.send(batch_event(batch));
                });
            }
        }
    }
}

fn batch_event(batch: RecommendationBatch) -> SessionEvent {
    if batch.recommendations.is_empty() {
        SessionEvent::Error(format!("No recommendations available for {}", batch.role))
    } else {
        SessionEvent::Recommendations(batch)
    }
}

fn run_request(engine: &dyn Recommend, count: usize, request: RecommendationRequest) -> RecommendationBatch {
    let recommendations = engine.recommend(request.role, count, request.opponent);
    RecommendationBatch {
        role: request.role,
        opponent: request.opponent,
        opponent_name: request.opponent.map(|id| engine.champion_name(id)),
        kind: request.kind,
        generation: request.generation,
        recommendations,
    }
}

/// Feeds observer pushes into the tracker.
pub fn attach(tracker: &Arc<SessionTracker>, observer: &dyn SessionObserver) {
    let tracker = Arc::clone(tracker);
    observer.subscribe(Box::new(move |snapshot| {
        tracker.on_update(&snapshot);
    }));
}

/// Periodically ends the tracked session once the observer stops seeing it.
pub fn spawn_liveness_poll(
    tracker: Arc<SessionTracker>,
    observer: Arc<dyn SessionObserver>,
    interval: Duration,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(interval);
            if stop.load(Ordering::Relaxed) {
                break;
            }
            tracker.poll_liveness(observer.as_ref());
        }
    })
}
