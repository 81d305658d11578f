use super::champion_stats::{Champion, ChampionId};
use crate::api::models::MatchupDto;
use crate::error::AppError;
use std::collections::{HashMap, HashSet};

const BUNDLED_MATCHUPS: &str = include_str!("../../data/matchups.json");

#[derive(Debug, Clone, Default)]
struct Relation {
    counters: HashSet<ChampionId>,
    countered_by: HashSet<ChampionId>,
}

/// Known lane matchups. The data is sparse and not necessarily symmetric:
/// each direction is looked up on its own and nothing is inferred.
#[derive(Debug, Clone, Default)]
pub struct MatchupTable {
    relations: HashMap<ChampionId, Relation>,
    names: HashMap<ChampionId, String>,
    none: HashSet<ChampionId>,
}

impl MatchupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bundled() -> Result<Self, AppError> {
        let entries: Vec<MatchupDto> = serde_json::from_str(BUNDLED_MATCHUPS)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<MatchupDto>) -> Self {
        let mut table = MatchupTable::new();
        for entry in entries {
            table.names.insert(entry.id, entry.name);
            let relation = table.relations.entry(entry.id).or_default();
            relation.counters.extend(entry.counters);
            relation.countered_by.extend(entry.countered_by);
        }
        table
    }

    /// Adds display names for champions the table has no entry for.
    pub fn learn_names<'a>(&mut self, champions: impl IntoIterator<Item = &'a Champion>) {
        for champion in champions {
            self.names
                .entry(champion.id)
                .or_insert_with(|| champion.name.clone());
        }
    }

    #[cfg(test)]
    pub fn record(&mut self, champion: ChampionId, beats: ChampionId) {
        self.relations.entry(champion).or_default().counters.insert(beats);
    }

    #[cfg(test)]
    pub fn record_countered_by(&mut self, champion: ChampionId, by: ChampionId) {
        self.relations
            .entry(champion)
            .or_default()
            .countered_by
            .insert(by);
    }

    #[cfg(test)]
    pub fn set_name(&mut self, id: ChampionId, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    /// Champions `id` reliably beats.
    pub fn counters(&self, id: ChampionId) -> &HashSet<ChampionId> {
        self.relations.get(&id).map_or(&self.none, |r| &r.counters)
    }

    /// Champions that reliably beat `id`.
    pub fn countered_by(&self, id: ChampionId) -> &HashSet<ChampionId> {
        self.relations.get(&id).map_or(&self.none, |r| &r.countered_by)
    }

    pub fn beats(&self, champion: ChampionId, opponent: ChampionId) -> bool {
        self.counters(champion).contains(&opponent)
    }

    pub fn is_beaten_by(&self, champion: ChampionId, opponent: ChampionId) -> bool {
        self.countered_by(champion).contains(&opponent)
    }

    pub fn name_of(&self, id: ChampionId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Champion {}", id))
    }

    /// Case-insensitive lookup ignoring spaces and punctuation ("kha zix" finds Kha'Zix).
    pub fn id_of(&self, name: &str) -> Option<ChampionId> {
        let wanted = normalize(name);
        if wanted.is_empty() {
            return None;
        }
        self.names
            .iter()
            .find(|(_, known)| normalize(known) == wanted)
            .map(|(id, _)| *id)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MatchupTable {
        MatchupTable::from_entries(vec![
            MatchupDto {
                id: 54,
                name: "Malphite".to_string(),
                counters: vec![157, 92],
                countered_by: vec![],
            },
            MatchupDto {
                id: 157,
                name: "Yasuo".to_string(),
                counters: vec![],
                countered_by: vec![],
            },
            MatchupDto {
                id: 121,
                name: "Kha'Zix".to_string(),
                counters: vec![],
                countered_by: vec![64],
            },
        ])
    }

    #[test]
    fn relations_are_not_inferred_symmetrically() {
        let table = sample();
        assert!(table.beats(54, 157));
        assert!(!table.is_beaten_by(157, 54));
        assert!(table.countered_by(157).is_empty());
        assert!(table.is_beaten_by(121, 64));
        assert!(!table.beats(64, 121));
    }

    #[test]
    fn unknown_ids_yield_empty_sets_and_placeholder_names() {
        let table = sample();
        assert!(table.counters(9999).is_empty());
        assert!(table.countered_by(9999).is_empty());
        assert_eq!(table.name_of(9999), "Champion 9999");
        assert_eq!(table.name_of(54), "Malphite");
    }

    #[test]
    fn id_lookup_is_forgiving() {
        let table = sample();
        assert_eq!(table.id_of("malphite"), Some(54));
        assert_eq!(table.id_of("kha zix"), Some(121));
        assert_eq!(table.id_of("KhaZix"), Some(121));
        assert_eq!(table.id_of("Teemo"), None);
        assert_eq!(table.id_of("  "), None);
    }

    #[test]
    fn learns_names_without_overwriting() {
        let mut table = sample();
        let champions = vec![Champion::new(54, "Not Malphite"), Champion::new(17, "Teemo")];
        table.learn_names(&champions);
        assert_eq!(table.name_of(54), "Malphite");
        assert_eq!(table.name_of(17), "Teemo");
    }

    #[test]
    fn bundled_table_loads() {
        let table = MatchupTable::bundled().unwrap();
        assert_eq!(table.name_of(54), "Malphite");
        assert!(!table.counters(54).is_empty());
    }
}
