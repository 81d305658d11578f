// Local client (LCU) endpoints

pub const LCU_HOST: &str = "127.0.0.1";
pub const LCU_USERNAME: &str = "riot";
pub const CHAMP_SELECT_SESSION: &str = "/lol-champ-select/v1/session";
pub const CHAMP_SELECT_EVENT: &str = "OnJsonApiEvent_lol-champ-select_v1_session";

// WAMP opcodes used on the client event socket
pub const WAMP_SUBSCRIBE: u8 = 5;
pub const WAMP_EVENT: u8 = 8;

pub const LOCKFILE_CANDIDATES: &[&str] = &[
    r"C:\Riot Games\League of Legends\lockfile",
    "/Applications/League of Legends.app/Contents/LoL/lockfile",
];

pub const USER_AGENT: &str = "league_draft/0.1.0";
