use crate::app::App;
use crate::analysis::session::TrackerPhase;
use crate::display::output::{display_error, display_help, display_info, display_recommendations, display_success, IntroPicker};
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Recommend {
        role: Option<String>,
        versus: Option<String>,
    },
    Connect,
    Status,
    Help,
    Exit,
    Empty,
    Unknown(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> ShellCommand {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return ShellCommand::Empty;
        };

        match command.to_ascii_lowercase().as_str() {
            "recommend" | "rec" => {
                let rest: Vec<&str> = words.collect();
                let vs_at = rest
                    .iter()
                    .position(|w| w.eq_ignore_ascii_case("vs") || w.eq_ignore_ascii_case("versus"));
                let (role_words, versus_words) = match vs_at {
                    Some(idx) => (&rest[..idx], &rest[idx + 1..]),
                    None => (&rest[..], &[][..]),
                };
                let join = |words: &[&str]| Some(words.join(" ")).filter(|s| !s.is_empty());
                ShellCommand::Recommend {
                    role: join(role_words),
                    versus: join(versus_words),
                }
            }
            "connect" => ShellCommand::Connect,
            "status" => ShellCommand::Status,
            "help" | "?" => ShellCommand::Help,
            "exit" | "quit" => ShellCommand::Exit,
            other => ShellCommand::Unknown(other.to_string()),
        }
    }
}

/// Reads commands from stdin until exit or end of input.
pub fn run(app: &mut App) -> io::Result<()> {
    let stdin = io::stdin();
    let mut intro = IntroPicker::from_entropy();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }

        match ShellCommand::parse(&line) {
            ShellCommand::Recommend { role, versus } => {
                match app.recommend(role.as_deref(), versus.as_deref()) {
                    Ok(batch) => display_recommendations(&batch, &mut intro),
                    Err(message) => display_error(&message),
                }
            }
            ShellCommand::Connect => match app.connect() {
                Ok(port) => display_success(&format!("Listening for champion select on port {}", port)),
                Err(e) => display_error(&e.to_string()),
            },
            ShellCommand::Status => display_status(app),
            ShellCommand::Help => display_help(),
            ShellCommand::Exit => return Ok(()),
            ShellCommand::Empty => {}
            ShellCommand::Unknown(command) => {
                display_error(&format!("Unknown command '{}'. Type 'help' for commands.", command))
            }
        }
    }
}

fn display_status(app: &App) {
    let state = app.tracking_state();
    let connection = if app.is_connected() { "connected" } else { "not connected" };
    let phase = match state.phase {
        TrackerPhase::Idle => "waiting for champion select",
        TrackerPhase::Active => "in champion select",
    };
    let role = state
        .last_role
        .map(|r| r.to_string())
        .unwrap_or_else(|| "none".to_string());
    let opponent = state
        .last_opponent
        .map(|id| app.champion_name(id))
        .unwrap_or_else(|| "none".to_string());
    display_info(&format!(
        "Client {}, {}; role: {}; lane opponent: {}",
        connection, phase, role, opponent
    ));
}
