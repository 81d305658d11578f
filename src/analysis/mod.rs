pub mod champion_stats;
pub mod matchups;
pub mod recommender;
pub mod session;
