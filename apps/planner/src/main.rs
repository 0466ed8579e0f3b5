use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use client_core::{
    Answer, CoordinatorError, HttpGateway, Session, Speaker, SystemClock, Turn, TurnCoordinator,
    WizardStep,
};
use shared::domain::UserId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Plan a trip from the terminal")]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:3001")]
    server_url: String,
    #[arg(long, default_value = "12345")]
    user_id: String,
    /// Delay before the assistant acknowledges a new trip request.
    #[arg(long, default_value_t = 1000)]
    ack_delay_ms: u64,
    /// Give up on a backend call after this many seconds.
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    let args = Args::parse();

    let gateway = HttpGateway::new(
        &args.server_url,
        Duration::from_secs(args.request_timeout_secs),
    )?;
    println!("Planning with {}", gateway.base_url());
    let coordinator = TurnCoordinator::new_with_clock(
        UserId::new(args.user_id),
        Arc::new(gateway),
        Arc::new(SystemClock),
        Duration::from_millis(args.ack_delay_ms),
    );

    println!("Where would you like to go? (/new, /trips, /back, /cancel, /quit)");
    let mut view = TranscriptView::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if coordinator.tick().await {
                    view.render(&coordinator.snapshot().await);
                    prompt_wizard(&coordinator).await;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line == "/quit" {
                    break;
                }
                if let Err(err) = handle_line(&coordinator, line).await {
                    println!("! {err}");
                }
                view.render(&coordinator.snapshot().await);
                prompt_wizard(&coordinator).await;
            }
        }
    }
    Ok(())
}

async fn handle_line(coordinator: &TurnCoordinator, line: &str) -> Result<()> {
    match line {
        "/new" => {
            if coordinator.wizard_step().await.is_some() {
                coordinator.cancel_wizard().await?;
            }
            coordinator.start_new_trip().await?;
            println!("--- new trip ---");
        }
        "/trips" => print_itineraries(&coordinator.snapshot().await),
        "/back" => {
            coordinator.wizard_back().await?;
        }
        "/cancel" => coordinator.cancel_wizard().await?,
        _ => match coordinator.wizard_step().await {
            Some(step) => answer_step(coordinator, step, line).await?,
            None => coordinator.submit_message(line).await?,
        },
    }
    Ok(())
}

/// An empty line keeps the current answer; a number picks from the listed options.
async fn answer_step(coordinator: &TurnCoordinator, step: WizardStep, line: &str) -> Result<()> {
    if !line.is_empty() {
        let options = step.options();
        let raw = match line.parse::<usize>() {
            Ok(n) if step != WizardStep::ComfortRating && (1..=options.len()).contains(&n) => {
                options[n - 1].value
            }
            _ => line,
        };
        coordinator.answer(Answer::parse(step, raw)?).await?;
    }
    match coordinator.wizard_next().await {
        Err(CoordinatorError::StepIncomplete(_)) => {
            println!("! please choose one of the options");
            Ok(())
        }
        other => Ok(other?),
    }
}

async fn prompt_wizard(coordinator: &TurnCoordinator) {
    let Some(step) = coordinator.wizard_step().await else {
        return;
    };
    println!("\n[{}/5] {}", step.index() + 1, step.title());
    println!("    {}", step.subtitle());
    if step == WizardStep::ComfortRating {
        let current = coordinator
            .wizard_draft()
            .await
            .map(|draft| draft.comfort_rating.get())
            .unwrap_or_default();
        println!("    1 (Budget) .. 5 (Luxury), enter keeps {current}");
    } else {
        for (i, option) in step.options().iter().enumerate() {
            println!("    {}. {}", i + 1, option.label);
        }
    }
}

fn print_itineraries(session: &Session) {
    if session.itineraries().is_empty() {
        println!("No itineraries yet.");
        return;
    }
    for trip in session.itineraries() {
        let rating = trip.rating.map(|r| format!(" {r}/5")).unwrap_or_default();
        println!("* {} [{}] {} | {}{rating}", trip.title, trip.kind, trip.duration, trip.budget);
        if !trip.summary.is_empty() {
            println!("  {}", trip.summary);
        }
        for hotel in &trip.hotels {
            println!("  hotel: {} ({}) {}", hotel.name, hotel.location, hotel.price);
        }
        for activity in &trip.activities {
            println!("  activity: {} {}", activity.name, activity.price);
        }
    }
}

/// Prints transcript changes since the last render.
#[derive(Default)]
struct TranscriptView {
    shown: Vec<Turn>,
    itinerary_ids: Vec<String>,
}

impl TranscriptView {
    fn render(&mut self, session: &Session) {
        let transcript = session.transcript();
        if transcript.len() < self.shown.len() {
            self.shown.clear();
            self.itinerary_ids.clear();
        }
        for (i, turn) in transcript.iter().enumerate() {
            if self.shown.get(i) != Some(turn) {
                let who = match turn.speaker {
                    Speaker::User => "you",
                    Speaker::Assistant => "planner",
                };
                println!("{who}> {}", turn.text);
            }
        }
        self.shown = transcript.to_vec();

        let ids: Vec<String> = session.itineraries().iter().map(|t| t.id.clone()).collect();
        if ids != self.itinerary_ids {
            let titles: Vec<&str> = session
                .itineraries()
                .iter()
                .map(|t| t.title.as_str())
                .collect();
            println!("({} itineraries: {}; /trips for details)", ids.len(), titles.join(", "));
            self.itinerary_ids = ids;
        }
    }
}
