use crate::analysis::champion_stats::Role;
use crate::analysis::recommender::Recommendation;
use crate::analysis::session::{RecommendationBatch, RecommendationKind, SessionEvent, SessionTracker};
use colored::*;
use crossbeam_channel::Receiver;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tabled::{settings::Style, Table, Tabled};

const INTROS: &[&str] = &[
    "Here's what looks strong in {role} right now:",
    "Scouting report for {role}:",
    "Locking in for {role}? Consider these:",
    "The numbers like these picks for {role}:",
    "Top candidates for {role} this patch:",
];

#[derive(Tabled)]
struct PickRow {
    rank: String,
    champion: String,
    score: String,
    win_rate: String,
    pick_rate: String,
    tier: String,
}

/// Chooses the decorative line printed above each list.
pub struct IntroPicker {
    rng: StdRng,
}

impl IntroPicker {
    pub fn from_entropy() -> Self {
        IntroPicker {
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    pub fn seeded(seed: u64) -> Self {
        IntroPicker {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn pick(&mut self, role: Role) -> String {
        let template = INTROS.choose(&mut self.rng).copied().unwrap_or(INTROS[0]);
        template.replace("{role}", role.label())
    }
}

pub fn headline(batch: &RecommendationBatch) -> String {
    let versus = batch
        .opponent_name
        .as_ref()
        .map(|name| format!(" vs {}", name))
        .unwrap_or_default();
    match batch.kind {
        RecommendationKind::Initial => format!("🎯 Initial recommendations for your role: {}{}", batch.role, versus),
        RecommendationKind::RoleChanged => format!("🔁 Recommendations for your new role: {}{}", batch.role, versus),
        RecommendationKind::CounterUpdate => {
            format!("⚔️  Counter-pick recommendations updated: {}{}", batch.role, versus)
        }
        RecommendationKind::Manual => format!("📋 Recommendations for {}{}", batch.role, versus),
    }
}

pub fn display_recommendations(batch: &RecommendationBatch, intro: &mut IntroPicker) {
    println!("\n{}", headline(batch).bold().cyan());
    println!("{}", "=".repeat(60).cyan());

    if batch.recommendations.is_empty() {
        println!(
            "{}",
            "No recommendations available (champion data unavailable)".yellow()
        );
        return;
    }

    println!("{}\n", intro.pick(batch.role).italic());

    let rows: Vec<PickRow> = batch
        .recommendations
        .iter()
        .enumerate()
        .map(|(idx, rec)| {
            let stats = rec.champion.role(batch.role);
            PickRow {
                rank: format!("#{}", idx + 1),
                champion: rec.champion.name.clone(),
                score: format!("{:.2}", rec.score),
                win_rate: format!("{:.1}%", stats.win_rate * 100.0),
                pick_rate: format!("{:.1}%", stats.pick_rate * 100.0),
                tier: rec.champion.tier.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    println!("\n{}", "Why".bold().yellow());
    for (idx, rec) in batch.recommendations.iter().enumerate() {
        display_reasons(idx + 1, rec);
    }
    println!();
}

fn display_reasons(rank: usize, rec: &Recommendation) {
    let title = if rec.champion.title.is_empty() {
        String::new()
    } else {
        format!(", {}", rec.champion.title)
    };
    println!("  {} {}{}", format!("#{}", rank).bold(), rec.champion.name.bold(), title.dimmed());
    for reason in &rec.reasons {
        let line = if rec.weak_against.iter().any(|name| reason.ends_with(name.as_str())) {
            reason.red().to_string()
        } else if rec.strong_against.iter().any(|name| reason.ends_with(name.as_str())) {
            reason.green().to_string()
        } else {
            reason.normal().to_string()
        };
        println!("     • {}", line);
    }
}

pub fn display_event(event: &SessionEvent, intro: &mut IntroPicker) {
    match event {
        SessionEvent::Status(message) => display_info(message),
        SessionEvent::Error(message) => display_error(message),
        SessionEvent::SessionStarted => display_success("Champion select detected"),
        SessionEvent::RoleChanged { from, to } => {
            let from = from.map(|r| r.to_string()).unwrap_or_else(|| "none".to_string());
            display_info(&format!("Role changed: {} → {}", from, to));
        }
        SessionEvent::Recommendations(batch) => display_recommendations(batch, intro),
        SessionEvent::SessionEnded => display_info("Champion select ended"),
    }
}

/// Prints tracker events as they arrive, skipping lists a newer request has superseded.
pub fn spawn_event_printer(events: Receiver<SessionEvent>, tracker: Arc<SessionTracker>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut intro = IntroPicker::from_entropy();
        for event in events.iter() {
            if let SessionEvent::Recommendations(batch) = &event {
                if batch.is_stale(tracker.latest_generation()) {
                    tracing::debug!(generation = batch.generation, "dropping stale recommendations");
                    continue;
                }
            }
            display_event(&event, &mut intro);
        }
    })
}

pub fn display_help() {
    println!("\n{}", "Commands".bold().yellow());
    println!("  {}  recommendations for a role (defaults to your assigned role)", "recommend [role] [vs <champion>]".bold());
    println!("  {}                         reconnect to the League client", "connect".bold());
    println!("  {}                          show what is being tracked", "status".bold());
    println!("  {}                            this help", "help".bold());
    println!("  {}                       leave", "exit | quit".bold());
    println!("\n  Roles: top, jungle, mid|middle, bot|bottom|adc, support|sup\n");
}

pub fn display_error(error: &str) {
    eprintln!("{} {}", "❌ Error:".red().bold(), error);
}

pub fn display_info(message: &str) {
    println!("{} {}", "ℹ️".cyan(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}
