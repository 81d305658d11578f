use crate::analysis::champion_stats::{ChampionId, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Champion statistics payload (remote endpoint, disk cache, bundled snapshot)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionDto {
    pub id: ChampionId,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub pick_rate: f64,
    #[serde(default)]
    pub ban_rate: f64,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub roles: HashMap<String, RoleStatsDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStatsDto {
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub pick_rate: f64,
    #[serde(default)]
    pub score: f64,
}

// Bundled matchup table entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupDto {
    pub id: ChampionId,
    pub name: String,
    #[serde(default)]
    pub counters: Vec<ChampionId>,
    #[serde(default)]
    pub countered_by: Vec<ChampionId>,
}

// Local client champ select session (/lol-champ-select/v1/session)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampSelectSession {
    #[serde(default)]
    pub local_player_cell_id: i64,
    #[serde(default)]
    pub my_team: Vec<TeamMember>,
    #[serde(default)]
    pub their_team: Vec<TeamMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[serde(default)]
    pub cell_id: i64,
    #[serde(default)]
    pub champion_id: ChampionId,
    #[serde(default)]
    pub assigned_position: String, // top, jungle, middle, bottom, utility
}

impl ChampSelectSession {
    /// The local player's canonical role, if one has been assigned.
    pub fn assigned_role(&self) -> Option<Role> {
        self.my_team
            .iter()
            .find(|member| member.cell_id == self.local_player_cell_id)
            .and_then(|member| Role::canonicalize(&member.assigned_position))
    }

    /// The locked or displayed enemy champion sharing `role`, if any.
    pub fn opposing_pick_in_role(&self, role: Role) -> Option<ChampionId> {
        self.their_team
            .iter()
            .filter(|member| member.champion_id != 0)
            .find(|member| Role::canonicalize(&member.assigned_position) == Some(role))
            .map(|member| member.champion_id)
    }
}

// WAMP event frame: [8, "<topic>", { uri, eventType, data }]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = r#"{
        "localPlayerCellId": 2,
        "myTeam": [
            {"cellId": 0, "championId": 0, "assignedPosition": "top"},
            {"cellId": 2, "championId": 0, "assignedPosition": "middle"}
        ],
        "theirTeam": [
            {"cellId": 5, "championId": 64, "assignedPosition": "jungle"},
            {"cellId": 6, "championId": 0, "assignedPosition": "middle"},
            {"cellId": 7, "championId": 238, "assignedPosition": "middle"}
        ],
        "timer": {"phase": "BAN_PICK"}
    }"#;

    #[test]
    fn resolves_assigned_role_for_local_player() {
        let session: ChampSelectSession = serde_json::from_str(SESSION).unwrap();
        assert_eq!(session.assigned_role(), Some(Role::Mid));
    }

    #[test]
    fn opposing_pick_is_restricted_to_role_and_skips_empty_slots() {
        let session: ChampSelectSession = serde_json::from_str(SESSION).unwrap();
        assert_eq!(session.opposing_pick_in_role(Role::Mid), Some(238));
        assert_eq!(session.opposing_pick_in_role(Role::Jungle), Some(64));
        assert_eq!(session.opposing_pick_in_role(Role::Top), None);
    }

    #[test]
    fn blind_pick_has_no_role() {
        let session: ChampSelectSession = serde_json::from_str(
            r#"{"localPlayerCellId": 0, "myTeam": [{"cellId": 0, "assignedPosition": ""}]}"#,
        )
        .unwrap();
        assert_eq!(session.assigned_role(), None);
    }

    #[test]
    fn champion_dto_tolerates_missing_fields() {
        let dto: ChampionDto = serde_json::from_str(r#"{"id": 1, "name": "Annie"}"#).unwrap();
        assert!(dto.roles.is_empty());
        assert!(dto.tier.is_none());
    }
}
