use super::champion_stats::{Champion, ChampionId, ChampionSource, Role, Tier};
use super::matchups::MatchupTable;
use crate::cache::MemoCache;
use std::sync::Arc;
use std::time::Duration;

// Win rate bands
const HIGH_WIN_RATE: f64 = 0.53;
const ABOVE_AVERAGE_WIN_RATE: f64 = 0.51;
const LOW_WIN_RATE: f64 = 0.47;
const HIGH_WIN_RATE_BONUS: f64 = 2.0;
const ABOVE_AVERAGE_BONUS: f64 = 1.0;

// Pick rate bands
const VERY_POPULAR: f64 = 0.15;
const POPULAR: f64 = 0.10;
const UNCOMMON: f64 = 0.03;
const RARE: f64 = 0.01;
const VERY_POPULAR_BONUS: f64 = 1.5;
const POPULAR_BONUS: f64 = 1.0;
const UNCOMMON_BONUS: f64 = 0.5;
const RARE_BONUS: f64 = 0.75;

// Ban rate bands
const HEAVILY_BANNED: f64 = 0.20;
const OFTEN_BANNED: f64 = 0.10;
const HEAVILY_BANNED_BONUS: f64 = 1.0;
const OFTEN_BANNED_BONUS: f64 = 0.5;

const SKILL_BONUS: f64 = 0.5;
const SYNERGY_BONUS: f64 = 1.0;

/// Must stay above every single stat bonus.
pub const COUNTER_BONUS: f64 = 5.0;
pub const COUNTERED_PENALTY: f64 = 3.0;

/// Champions whose results reward practice.
const HIGH_SKILL_CHAMPIONS: &[&str] = &[
    "Akali", "Azir", "Camille", "Draven", "Fiora", "Irelia", "Kalista", "Lee Sin", "Riven",
    "Vayne", "Yasuo", "Zed",
];

/// Roles each champion is noted as particularly strong in.
const ROLE_SYNERGY: &[(&str, &[Role])] = &[
    ("Malphite", &[Role::Top]),
    ("Darius", &[Role::Top]),
    ("Garen", &[Role::Top]),
    ("Amumu", &[Role::Jungle]),
    ("Lee Sin", &[Role::Jungle]),
    ("Vi", &[Role::Jungle]),
    ("Orianna", &[Role::Mid]),
    ("Syndra", &[Role::Mid]),
    ("Ahri", &[Role::Mid]),
    ("Jinx", &[Role::Bottom]),
    ("Caitlyn", &[Role::Bottom]),
    ("Thresh", &[Role::Support]),
    ("Leona", &[Role::Support]),
    ("Lulu", &[Role::Support]),
    ("Lux", &[Role::Mid, Role::Support]),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub champion: Champion,
    pub score: f64,
    /// In evaluation order, structural factors first
    pub reasons: Vec<String>,
    /// Opponent names this pick counters (only with an opponent given)
    pub strong_against: Vec<String>,
    /// Opponent names this pick is countered by (only with an opponent given)
    pub weak_against: Vec<String>,
}

/// Produces ranked, explained picks for a role.
pub trait Recommend: Send + Sync {
    fn recommend(&self, role: Role, count: usize, opponent: Option<ChampionId>) -> Vec<Recommendation>;

    fn champion_name(&self, id: ChampionId) -> String;
}

type MemoKey = (Role, Option<ChampionId>, usize);

pub struct PickRecommender {
    store: Arc<dyn ChampionSource>,
    matchups: Arc<MatchupTable>,
    memo: Option<MemoCache<MemoKey, Vec<Recommendation>>>,
}

impl PickRecommender {
    pub fn new(store: Arc<dyn ChampionSource>, matchups: Arc<MatchupTable>) -> Self {
        PickRecommender {
            store,
            matchups,
            memo: None,
        }
    }

    pub fn with_memo(mut self, ttl: Duration) -> Self {
        if !ttl.is_zero() {
            self.memo = Some(MemoCache::new(ttl));
        }
        self
    }

    /// Role score before matchup adjustments, with one reason per contributing factor.
    pub fn base_score(champion: &Champion, role: Role) -> (f64, Vec<String>) {
        let stats = champion.role(role);
        let mut score = stats.score;
        let mut reasons = Vec::new();

        if stats.win_rate >= HIGH_WIN_RATE {
            score += HIGH_WIN_RATE_BONUS;
            reasons.push(format!("High win rate ({:.1}%)", stats.win_rate * 100.0));
        } else if stats.win_rate >= ABOVE_AVERAGE_WIN_RATE {
            score += ABOVE_AVERAGE_BONUS;
            reasons.push(format!("Above average win rate ({:.1}%)", stats.win_rate * 100.0));
        } else if stats.win_rate < LOW_WIN_RATE {
            reasons.push(format!(
                "Challenging to master ({:.1}% win rate)",
                stats.win_rate * 100.0
            ));
        }

        if stats.pick_rate > VERY_POPULAR {
            score += VERY_POPULAR_BONUS;
            reasons.push(format!("Very popular pick ({:.1}% pick rate)", stats.pick_rate * 100.0));
        } else if stats.pick_rate > POPULAR {
            score += POPULAR_BONUS;
            reasons.push(format!("Popular pick ({:.1}% pick rate)", stats.pick_rate * 100.0));
        }
        // The two low bands stack.
        if stats.pick_rate < UNCOMMON {
            score += UNCOMMON_BONUS;
            reasons.push("Uncommon pick, may surprise opponents".to_string());
        }
        if stats.pick_rate < RARE {
            score += RARE_BONUS;
            reasons.push("Rare pick, opponents may be unfamiliar with it".to_string());
        }

        match champion.tier {
            Some(Tier::S) => {
                score += 2.0;
                reasons.push("S tier this patch".to_string());
            }
            Some(Tier::A) => {
                score += 1.5;
                reasons.push("A tier this patch".to_string());
            }
            Some(Tier::B) => {
                score += 0.5;
                reasons.push("B tier this patch".to_string());
            }
            Some(Tier::D) => {
                score -= 0.5;
                reasons.push("D tier this patch".to_string());
            }
            Some(Tier::C) | None => {}
        }

        if champion.ban_rate > HEAVILY_BANNED {
            score += HEAVILY_BANNED_BONUS;
            reasons.push("Frequently banned, very strong".to_string());
        } else if champion.ban_rate > OFTEN_BANNED {
            score += OFTEN_BANNED_BONUS;
            reasons.push("Often banned".to_string());
        }

        if is_high_skill(&champion.name) {
            if stats.win_rate > 0.5 {
                score += SKILL_BONUS;
                reasons.push("High skill champion, rewarding to master".to_string());
            } else {
                reasons.push("High skill champion".to_string());
            }
        }

        if synergy_roles(&champion.name).contains(&role) {
            score += SYNERGY_BONUS;
            reasons.push(format!("Particularly strong in {}", role.label()));
        }

        if reasons.is_empty() {
            reasons.push(format!("Decent overall performance in {}", role.label()));
        }

        (score, reasons)
    }

    fn apply_matchup(&self, rec: &mut Recommendation, opponent: ChampionId, opponent_name: &str) {
        let candidate = rec.champion.id;
        if self.matchups.beats(candidate, opponent) {
            rec.score += COUNTER_BONUS;
            rec.reasons.push(format!("Strong counter against {}", opponent_name));
            rec.strong_against.push(opponent_name.to_string());
        }
        if self.matchups.is_beaten_by(candidate, opponent) {
            rec.score -= COUNTERED_PENALTY;
            rec.reasons.push(format!("Be careful, countered by {}", opponent_name));
            rec.weak_against.push(opponent_name.to_string());
        }
    }

    fn compute(&self, role: Role, count: usize, opponent: Option<ChampionId>) -> Vec<Recommendation> {
        let champions = match self.store.fetch_all() {
            Ok(champions) => champions,
            Err(e) => {
                tracing::warn!(error = %e, %role, "no champion data, returning no recommendations");
                return Vec::new();
            }
        };

        let opponent_name = opponent.map(|id| self.resolve_name(&champions, id));

        let mut recommendations: Vec<Recommendation> = champions
            .iter()
            .filter(|c| Some(c.id) != opponent)
            .map(|champion| {
                let (score, reasons) = Self::base_score(champion, role);
                let mut rec = Recommendation {
                    champion: champion.clone(),
                    score,
                    reasons,
                    strong_against: Vec::new(),
                    weak_against: Vec::new(),
                };
                if let (Some(id), Some(name)) = (opponent, opponent_name.as_deref()) {
                    self.apply_matchup(&mut rec, id, name);
                }
                rec
            })
            .collect();

        // sort_by is stable, so ties keep snapshot order
        recommendations.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        recommendations.truncate(count);

        tracing::debug!(%role, ?opponent, returned = recommendations.len(), "computed recommendations");
        recommendations
    }

    fn resolve_name(&self, champions: &[Champion], id: ChampionId) -> String {
        champions
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| self.matchups.name_of(id))
    }
}

impl Recommend for PickRecommender {
    fn recommend(&self, role: Role, count: usize, opponent: Option<ChampionId>) -> Vec<Recommendation> {
        if count == 0 {
            return Vec::new();
        }
        let key = (role, opponent, count);
        if let Some(hit) = self.memo.as_ref().and_then(|memo| memo.get(&key)) {
            return hit;
        }

        let recommendations = self.compute(role, count, opponent);
        if let Some(memo) = &self.memo {
            if !recommendations.is_empty() {
                memo.insert(key, recommendations.clone());
            }
        }
        recommendations
    }

    fn champion_name(&self, id: ChampionId) -> String {
        match self.store.fetch_all() {
            Ok(champions) => self.resolve_name(&champions, id),
            Err(_) => self.matchups.name_of(id),
        }
    }
}

fn is_high_skill(name: &str) -> bool {
    HIGH_SKILL_CHAMPIONS.contains(&name)
}

fn synergy_roles(name: &str) -> &'static [Role] {
    ROLE_SYNERGY
        .iter()
        .find(|(champion, _)| *champion == name)
        .map(|(_, roles)| *roles)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::champion_stats::RoleStats;
    use crate::error::AppError;

    struct FixedSource(Arc<Vec<Champion>>);

    impl ChampionSource for FixedSource {
        fn fetch_all(&self) -> Result<Arc<Vec<Champion>>, AppError> {
            Ok(Arc::clone(&self.0))
        }
    }

    struct EmptySource;

    impl ChampionSource for EmptySource {
        fn fetch_all(&self) -> Result<Arc<Vec<Champion>>, AppError> {
            Err(AppError::NoChampionData)
        }
    }

    fn top(id: ChampionId, name: &str, score: f64, win_rate: f64, pick_rate: f64) -> Champion {
        Champion::new(id, name).with_role(
            Role::Top,
            RoleStats {
                win_rate,
                pick_rate,
                score,
            },
        )
    }

    fn engine(champions: Vec<Champion>, matchups: MatchupTable) -> PickRecommender {
        PickRecommender::new(Arc::new(FixedSource(Arc::new(champions))), Arc::new(matchups))
    }

    fn names(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.champion.name.as_str()).collect()
    }

    #[test]
    fn win_rate_bands() {
        let (high, reasons) = PickRecommender::base_score(&top(1, "A", 5.0, 0.55, 0.05), Role::Top);
        assert_eq!(high, 7.0);
        assert!(reasons[0].starts_with("High win rate"));

        let (above, reasons) = PickRecommender::base_score(&top(1, "A", 5.0, 0.52, 0.05), Role::Top);
        assert_eq!(above, 6.0);
        assert!(reasons[0].starts_with("Above average"));

        // Low win rate explains but does not penalize.
        let (low, reasons) = PickRecommender::base_score(&top(1, "A", 5.0, 0.45, 0.05), Role::Top);
        assert_eq!(low, 5.0);
        assert!(reasons[0].starts_with("Challenging to master"));
    }

    #[test]
    fn pick_rate_bands_and_stacked_rarity() {
        let (very, _) = PickRecommender::base_score(&top(1, "A", 5.0, 0.5, 0.20), Role::Top);
        assert_eq!(very, 6.5);
        let (popular, _) = PickRecommender::base_score(&top(1, "A", 5.0, 0.5, 0.12), Role::Top);
        assert_eq!(popular, 6.0);
        let (uncommon, reasons) = PickRecommender::base_score(&top(1, "A", 5.0, 0.5, 0.02), Role::Top);
        assert_eq!(uncommon, 5.5);
        assert_eq!(reasons.len(), 1);

        let (rare, reasons) = PickRecommender::base_score(&top(1, "A", 5.0, 0.5, 0.005), Role::Top);
        assert_eq!(rare, 6.25);
        assert_eq!(reasons.len(), 2);
        assert!(reasons[0].starts_with("Uncommon"));
        assert!(reasons[1].starts_with("Rare"));
    }

    #[test]
    fn tier_and_ban_rate_adjustments() {
        let base = || top(1, "A", 5.0, 0.5, 0.05);
        let score = |c: Champion| PickRecommender::base_score(&c, Role::Top).0;

        assert_eq!(score(base().with_tier(Some(Tier::S))), 7.0);
        assert_eq!(score(base().with_tier(Some(Tier::A))), 6.5);
        assert_eq!(score(base().with_tier(Some(Tier::B))), 5.5);
        assert_eq!(score(base().with_tier(Some(Tier::C))), 5.0);
        assert_eq!(score(base().with_tier(Some(Tier::D))), 4.5);
        assert_eq!(score(base().with_ban_rate(0.25)), 6.0);
        assert_eq!(score(base().with_ban_rate(0.15)), 5.5);
    }

    #[test]
    fn skill_and_synergy_membership() {
        let (score, reasons) = PickRecommender::base_score(&top(92, "Riven", 5.0, 0.51, 0.05), Role::Top);
        assert_eq!(score, 6.5);
        assert!(reasons.iter().any(|r| r == "High skill champion, rewarding to master"));

        let (score, reasons) = PickRecommender::base_score(&top(92, "Riven", 5.0, 0.49, 0.05), Role::Top);
        assert_eq!(score, 5.0);
        assert_eq!(reasons, vec!["High skill champion".to_string()]);

        let (score, reasons) = PickRecommender::base_score(&top(54, "Malphite", 5.0, 0.5, 0.05), Role::Top);
        assert_eq!(score, 6.0);
        assert_eq!(reasons, vec!["Particularly strong in Top".to_string()]);

        let (score, _) = PickRecommender::base_score(&top(54, "Malphite", 5.0, 0.5, 0.05), Role::Mid);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn every_candidate_has_a_reason() {
        let (_, reasons) = PickRecommender::base_score(&top(1, "Plain", 5.0, 0.5, 0.05), Role::Top);
        assert_eq!(reasons, vec!["Decent overall performance in Top".to_string()]);

        let recs = engine(crate::analysis::champion_stats::bundled_champions().unwrap(), MatchupTable::new())
            .recommend(Role::Support, 50, None);
        assert!(recs.iter().all(|r| !r.reasons.is_empty()));
    }

    #[test]
    fn results_are_truncated_and_sorted() {
        let champions = crate::analysis::champion_stats::bundled_champions().unwrap();
        for role in Role::ALL {
            let recs = engine(champions.clone(), MatchupTable::new()).recommend(role, 5, None);
            assert_eq!(recs.len(), 5);
            assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let champions = vec![
            top(1, "One", 5.0, 0.5, 0.05),
            top(2, "Two", 5.0, 0.5, 0.05),
            top(3, "Three", 5.0, 0.5, 0.05),
            top(4, "Four", 6.0, 0.5, 0.05),
        ];
        let engine = engine(champions, MatchupTable::new());
        let first = engine.recommend(Role::Top, 4, None);
        let second = engine.recommend(Role::Top, 4, None);
        assert_eq!(first, second);
        // Ties keep their original order.
        assert_eq!(names(&first), vec!["Four", "One", "Two", "Three"]);
    }

    #[test]
    fn zero_count_and_empty_store_yield_nothing() {
        let engine = engine(vec![top(1, "One", 5.0, 0.5, 0.05)], MatchupTable::new());
        assert!(engine.recommend(Role::Top, 0, None).is_empty());

        let unavailable = PickRecommender::new(Arc::new(EmptySource), Arc::new(MatchupTable::new()));
        assert!(unavailable.recommend(Role::Top, 5, None).is_empty());
        assert_eq!(unavailable.champion_name(7), "Champion 7");
    }

    #[test]
    fn counter_bonus_dominates_equal_base_scores() {
        let mut matchups = MatchupTable::new();
        matchups.set_name(900, "Opponent");
        matchups.record(2, 900);

        let engine = engine(
            vec![top(1, "Plain", 6.0, 0.5, 0.05), top(2, "Answer", 6.0, 0.5, 0.05)],
            matchups,
        );
        let recs = engine.recommend(Role::Top, 2, Some(900));
        assert_eq!(names(&recs), vec!["Answer", "Plain"]);
        assert!(recs[0].score > recs[1].score);
        assert_eq!(recs[0].strong_against, vec!["Opponent".to_string()]);
        assert!(recs[0].reasons.last().unwrap().contains("Strong counter against Opponent"));
    }

    #[test]
    fn countered_by_opponent_lowers_score() {
        let mut matchups = MatchupTable::new();
        matchups.record_countered_by(1, 900);

        let engine = engine(vec![top(1, "Victim", 6.0, 0.5, 0.05)], matchups);
        let alone = engine.recommend(Role::Top, 1, None);
        let versus = engine.recommend(Role::Top, 1, Some(900));
        assert!(versus[0].score < alone[0].score);
        assert_eq!(versus[0].weak_against, vec!["Champion 900".to_string()]);
        assert!(versus[0]
            .reasons
            .iter()
            .any(|r| r == "Be careful, countered by Champion 900"));
    }

    #[test]
    fn unrelated_opponent_changes_nothing() {
        let engine = engine(vec![top(1, "One", 6.0, 0.5, 0.05)], MatchupTable::new());
        let alone = engine.recommend(Role::Top, 1, None);
        let versus = engine.recommend(Role::Top, 1, Some(900));
        assert_eq!(alone[0].score, versus[0].score);
        assert_eq!(alone[0].reasons, versus[0].reasons);
    }

    #[test]
    fn opponent_is_never_recommended_against_itself() {
        let engine = engine(
            vec![top(1, "One", 9.0, 0.5, 0.05), top(2, "Two", 5.0, 0.5, 0.05)],
            MatchupTable::new(),
        );
        let recs = engine.recommend(Role::Top, 5, Some(1));
        assert_eq!(names(&recs), vec!["Two"]);
    }

    #[test]
    fn strong_stats_beat_surprise_value() {
        let x = top(10, "X", 8.0, 0.55, 0.12).with_tier(Some(Tier::A));
        let y = top(11, "Y", 8.0, 0.50, 0.02);
        let recs = engine(vec![y, x], MatchupTable::new()).recommend(Role::Top, 1, None);
        assert_eq!(names(&recs), vec!["X"]);
    }

    #[test]
    fn countered_pick_drops_below_comparable_alternative() {
        let x = top(10, "X", 8.0, 0.55, 0.12).with_tier(Some(Tier::A));
        let w = top(12, "W", 8.5, 0.55, 0.12).with_tier(Some(Tier::B));
        let mut matchups = MatchupTable::new();
        matchups.set_name(20, "Z");
        matchups.record_countered_by(10, 20);

        let engine = engine(vec![x, w], matchups);
        assert_eq!(names(&engine.recommend(Role::Top, 5, None)), vec!["X", "W"]);
        assert_eq!(names(&engine.recommend(Role::Top, 5, Some(20))), vec!["W", "X"]);
    }

    struct CountingSource {
        champions: Arc<Vec<Champion>>,
        fetches: std::sync::atomic::AtomicUsize,
    }

    impl ChampionSource for CountingSource {
        fn fetch_all(&self) -> Result<Arc<Vec<Champion>>, AppError> {
            self.fetches.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Arc::clone(&self.champions))
        }
    }

    #[test]
    fn memo_skips_recomputation_per_key() {
        let source = Arc::new(CountingSource {
            champions: Arc::new(vec![top(1, "One", 6.0, 0.5, 0.05)]),
            fetches: std::sync::atomic::AtomicUsize::new(0),
        });
        let engine = PickRecommender::new(source.clone(), Arc::new(MatchupTable::new()))
            .with_memo(Duration::from_secs(60));

        let first = engine.recommend(Role::Top, 1, None);
        assert_eq!(engine.recommend(Role::Top, 1, None), first);
        assert_eq!(source.fetches.load(std::sync::atomic::Ordering::SeqCst), 1);

        engine.recommend(Role::Top, 1, Some(900));
        assert_eq!(source.fetches.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
