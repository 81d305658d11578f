use crate::analysis::session::{SessionObserver, SnapshotCallback};
use crate::api::endpoints::*;
use crate::api::models::{ApiEvent, ChampSelectSession};
use crate::error::AppError;
use base64::{engine::general_purpose, Engine as _};
use std::fs;
use std::io::ErrorKind;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tungstenite::client::IntoClientRequest;
use tungstenite::http::HeaderValue;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Connector, Message, WebSocket};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(2);
/// Bounds each blocking read so a stopped listener notices within this time.
const SOCKET_READ_TIMEOUT: Duration = Duration::from_secs(1);

type EventSocket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Contents of the client's `name:pid:port:password:protocol` lockfile.
#[derive(Debug, Clone, PartialEq)]
pub struct Lockfile {
    pub process: String,
    pub pid: u32,
    pub port: u16,
    pub password: String,
    pub protocol: String,
}

impl Lockfile {
    pub fn parse(content: &str) -> Result<Self, AppError> {
        let parts: Vec<&str> = content.trim().split(':').collect();
        if parts.len() < 5 {
            return Err(AppError::InvalidLockfile(format!(
                "expected 5 fields, found {}",
                parts.len()
            )));
        }
        let pid = parts[1]
            .parse()
            .map_err(|_| AppError::InvalidLockfile(format!("bad pid '{}'", parts[1])))?;
        let port = parts[2]
            .parse()
            .map_err(|_| AppError::InvalidLockfile(format!("bad port '{}'", parts[2])))?;

        Ok(Lockfile {
            process: parts[0].to_string(),
            pid,
            port,
            password: parts[3].to_string(),
            protocol: parts[4].to_string(),
        })
    }

    /// Reads the explicit path if given, otherwise the first platform default that exists.
    pub fn discover(explicit: Option<&Path>) -> Result<(PathBuf, Lockfile), AppError> {
        let candidates: Vec<PathBuf> = match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => LOCKFILE_CANDIDATES.iter().map(PathBuf::from).collect(),
        };

        for path in candidates {
            if let Ok(content) = fs::read_to_string(&path) {
                let lockfile = Lockfile::parse(&content)?;
                tracing::debug!(
                    path = %path.display(),
                    process = %lockfile.process,
                    pid = lockfile.pid,
                    protocol = %lockfile.protocol,
                    "found client lockfile"
                );
                return Ok((path, lockfile));
            }
        }
        Err(AppError::ClientNotRunning)
    }

    pub fn auth_header(&self) -> String {
        let token = general_purpose::STANDARD.encode(format!("{}:{}", LCU_USERNAME, self.password));
        format!("Basic {}", token)
    }
}

/// Authenticated REST and event-socket access to the local client.
pub struct LcuClient {
    agent: ureq::Agent,
    connector: native_tls::TlsConnector,
    port: u16,
    auth: String,
}

impl LcuClient {
    pub fn new(lockfile: &Lockfile) -> Result<Self, AppError> {
        // The client serves a self-signed certificate on localhost.
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| AppError::TlsError(e.to_string()))?;

        let agent = ureq::AgentBuilder::new()
            .tls_connector(Arc::new(connector.clone()))
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build();

        Ok(LcuClient {
            agent,
            connector,
            port: lockfile.port,
            auth: lockfile.auth_header(),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>, AppError> {
        let url = format!("https://{}:{}{}", LCU_HOST, self.port, path);
        match self.agent.get(&url).set("Authorization", &self.auth).call() {
            Ok(resp) => {
                let body = resp
                    .into_string()
                    .map_err(|e| AppError::HttpError(e.to_string()))?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(e) => Err(AppError::HttpError(e.to_string())),
        }
    }

    pub fn champ_select_session(&self) -> Result<Option<ChampSelectSession>, AppError> {
        self.get_json(CHAMP_SELECT_SESSION)
    }

    fn open_event_socket(&self) -> Result<EventSocket, AppError> {
        let mut request = format!("wss://{}:{}/", LCU_HOST, self.port)
            .into_client_request()
            .map_err(|e| AppError::WebSocketError(e.to_string()))?;
        let auth = HeaderValue::from_str(&self.auth)
            .map_err(|e| AppError::WebSocketError(e.to_string()))?;
        request.headers_mut().insert("Authorization", auth);

        let stream = TcpStream::connect((LCU_HOST, self.port))?;
        stream.set_read_timeout(Some(SOCKET_READ_TIMEOUT))?;
        let (mut socket, _) = tungstenite::client_tls_with_config(
            request,
            stream,
            None,
            Some(Connector::NativeTls(self.connector.clone())),
        )
        .map_err(|e| AppError::WebSocketError(e.to_string()))?;

        let subscribe = serde_json::json!([WAMP_SUBSCRIBE, CHAMP_SELECT_EVENT]).to_string();
        socket
            .send(Message::Text(subscribe))
            .map_err(|e| AppError::WebSocketError(e.to_string()))?;
        Ok(socket)
    }
}

/// Extracts a champ select session update from a raw event-socket frame.
/// Deletions and unrelated topics yield `None`.
pub fn parse_session_event(text: &str) -> Option<ChampSelectSession> {
    let frame: serde_json::Value = serde_json::from_str(text).ok()?;
    let parts = frame.as_array()?;
    if parts.len() < 3
        || parts[0].as_u64() != Some(WAMP_EVENT as u64)
        || parts[1].as_str() != Some(CHAMP_SELECT_EVENT)
    {
        return None;
    }

    let event: ApiEvent = serde_json::from_value(parts[2].clone()).ok()?;
    if event.event_type == "Delete" {
        return None;
    }
    match serde_json::from_value(event.data) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(uri = %event.uri, error = %e, "malformed champ select payload");
            None
        }
    }
}

/// Session observer backed by the running client.
pub struct LcuObserver {
    client: Arc<LcuClient>,
    stop: Arc<AtomicBool>,
}

impl LcuObserver {
    pub fn new(client: LcuClient) -> Self {
        LcuObserver {
            client: Arc::new(client),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for LcuObserver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl SessionObserver for LcuObserver {
    fn current_session(&self) -> Option<ChampSelectSession> {
        match self.client.champ_select_session() {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(error = %e, "session lookup failed");
                None
            }
        }
    }

    fn subscribe(&self, callback: SnapshotCallback) {
        let client = Arc::clone(&self.client);
        let stop = Arc::clone(&self.stop);

        thread::spawn(move || {
            if let Ok(Some(session)) = client.champ_select_session() {
                callback(session);
            }

            while !stop.load(Ordering::Relaxed) {
                match client.open_event_socket() {
                    Ok(mut socket) => {
                        tracing::info!(port = client.port(), "subscribed to champ select events");
                        pump_events(&mut socket, &callback, &stop);
                    }
                    Err(e) => tracing::warn!(error = %e, "event socket unavailable"),
                }
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                thread::sleep(RECONNECT_DELAY);
            }
            tracing::debug!("event listener stopped");
        });
    }
}

fn pump_events(socket: &mut EventSocket, callback: &SnapshotCallback, stop: &AtomicBool) {
    while !stop.load(Ordering::Relaxed) {
        match socket.read() {
            Ok(Message::Text(text)) => deliver_unless_stopped(&text, callback, stop),
            Ok(Message::Close(_)) => {
                tracing::info!("event socket closed by client");
                return;
            }
            Ok(_) => {}
            Err(e) if is_read_timeout(&e) => {}
            Err(e) => {
                tracing::warn!(error = %e, "event socket read failed");
                return;
            }
        }
    }
    tracing::debug!("closing event socket");
    let _ = socket.close(None);
}

/// Hands a frame to the tracker unless the listener has been shut down.
fn deliver_unless_stopped(text: &str, callback: &SnapshotCallback, stop: &AtomicBool) {
    if stop.load(Ordering::Relaxed) {
        return;
    }
    if let Some(session) = parse_session_event(text) {
        callback(session);
    }
}

fn is_read_timeout(error: &tungstenite::Error) -> bool {
    match error {
        tungstenite::Error::Io(e) => matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::champion_stats::Role;

    #[test]
    fn parses_lockfile() {
        let lockfile = Lockfile::parse("LeagueClient:12345:54321:s3cr3t:https\n").unwrap();
        assert_eq!(lockfile.process, "LeagueClient");
        assert_eq!(lockfile.pid, 12345);
        assert_eq!(lockfile.port, 54321);
        assert_eq!(lockfile.password, "s3cr3t");
        assert_eq!(lockfile.protocol, "https");
    }

    #[test]
    fn rejects_malformed_lockfile() {
        assert!(matches!(
            Lockfile::parse("LeagueClient:123"),
            Err(AppError::InvalidLockfile(_))
        ));
        assert!(matches!(
            Lockfile::parse("LeagueClient:123:notaport:pw:https"),
            Err(AppError::InvalidLockfile(_))
        ));
    }

    #[test]
    fn auth_header_is_basic_riot_credentials() {
        let lockfile = Lockfile::parse("LeagueClient:1:2:pw:https").unwrap();
        // base64("riot:pw")
        assert_eq!(lockfile.auth_header(), "Basic cmlvdDpwdw==");
    }

    #[test]
    fn discover_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockfile");
        fs::write(&path, "LeagueClient:1:4242:pw:https").unwrap();

        let (found, lockfile) = Lockfile::discover(Some(&path)).unwrap();
        assert_eq!(found, path);
        assert_eq!(lockfile.port, 4242);
    }

    #[test]
    fn discover_without_lockfile_reports_client_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("lockfile");
        assert!(matches!(
            Lockfile::discover(Some(&missing)),
            Err(AppError::ClientNotRunning)
        ));
    }

    #[test]
    fn parses_session_update_event() {
        let frame = r#"[8, "OnJsonApiEvent_lol-champ-select_v1_session", {
            "uri": "/lol-champ-select/v1/session",
            "eventType": "Update",
            "data": {
                "localPlayerCellId": 1,
                "myTeam": [{"cellId": 1, "championId": 0, "assignedPosition": "utility"}],
                "theirTeam": [{"cellId": 6, "championId": 412, "assignedPosition": "utility"}]
            }
        }]"#;
        let session = parse_session_event(frame).unwrap();
        assert_eq!(session.assigned_role(), Some(Role::Support));
        assert_eq!(session.opposing_pick_in_role(Role::Support), Some(412));
    }

    #[test]
    fn read_timeouts_are_not_disconnects() {
        let timed_out = tungstenite::Error::Io(std::io::Error::from(ErrorKind::WouldBlock));
        assert!(is_read_timeout(&timed_out));
        let timed_out = tungstenite::Error::Io(std::io::Error::from(ErrorKind::TimedOut));
        assert!(is_read_timeout(&timed_out));

        let reset = tungstenite::Error::Io(std::io::Error::from(ErrorKind::ConnectionReset));
        assert!(!is_read_timeout(&reset));
        assert!(!is_read_timeout(&tungstenite::Error::ConnectionClosed));
    }

    #[test]
    fn stopped_listener_delivers_nothing_more() {
        // Any frame the socket would yield after shutdown is dropped.
        let stop = AtomicBool::new(true);
        let delivered = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&delivered);
        let callback: SnapshotCallback = Box::new(move |_| flag.store(true, Ordering::SeqCst));
        deliver_unless_stopped(
            r#"[8, "OnJsonApiEvent_lol-champ-select_v1_session", {"uri": "/lol-champ-select/v1/session", "eventType": "Update", "data": {}}]"#,
            &callback,
            &stop,
        );
        assert!(!delivered.load(Ordering::SeqCst));

        stop.store(false, Ordering::SeqCst);
        deliver_unless_stopped(
            r#"[8, "OnJsonApiEvent_lol-champ-select_v1_session", {"uri": "/lol-champ-select/v1/session", "eventType": "Update", "data": {}}]"#,
            &callback,
            &stop,
        );
        assert!(delivered.load(Ordering::SeqCst));
    }

    #[test]
    fn ignores_deletes_and_other_topics() {
        let delete = r#"[8, "OnJsonApiEvent_lol-champ-select_v1_session", {"uri": "/lol-champ-select/v1/session", "eventType": "Delete", "data": null}]"#;
        assert!(parse_session_event(delete).is_none());

        let other = r#"[8, "OnJsonApiEvent_lol-gameflow_v1_gameflow-phase", {"uri": "/lol-gameflow/v1/gameflow-phase", "eventType": "Update", "data": "Lobby"}]"#;
        assert!(parse_session_event(other).is_none());

        assert!(parse_session_event("[0, \"welcome\"]").is_none());
        assert!(parse_session_event("not json").is_none());
    }
}
