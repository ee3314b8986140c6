//! Kiosk Control - CLI client for the kiosk daemon
//!
//! Drives the same HTTP API the kiosk UI uses; handy for smoke tests
//! and support diagnostics on the machine itself.

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::DaemonClient;
use kiosk_common::outcome::AnalysisOutcome;

#[derive(Parser)]
#[command(name = "kioskctl")]
#[command(about = "AV kiosk assistant - daemon control client", long_about = None)]
#[command(version = kiosk_common::VERSION)]
struct Cli {
    /// Daemon address (defaults to $KIOSKD_URL, then localhost)
    #[arg(long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon health
    Status,

    /// Confirm a room and show its metadata
    Confirm {
        /// Room identifier, e.g. A-1750
        room: String,
    },

    /// Report a problem for a room
    Report {
        /// Room identifier, e.g. A-1750
        room: String,

        /// Problem description
        message: String,
    },

    /// List live session tickets
    Tickets,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = DaemonClient::new(cli.url);

    match cli.command {
        Commands::Status => {
            let health = client.health().await?;
            println!("kioskd v{}", health.version);
            println!("  uptime:        {}s", health.uptime_seconds);
            println!("  cached rooms:  {}", health.cached_rooms);
            println!("  live tickets:  {}", health.live_tickets);
            println!("  escalating:    {}", health.escalating);
            if let Some(room) = health.last_room {
                println!("  last room:     {}", room);
            }
        }
        Commands::Confirm { room } => {
            let confirmed = client.confirm_room(&room).await?;
            println!("Salle {} ({})", confirmed.room, confirmed.info.source);
            for device in confirmed.info.equipment_list() {
                println!("  - {} [{}] {}", device.name, device.kind, device.status);
            }
        }
        Commands::Report { room, message } => {
            let response = client.analyze(&room, &message).await?;
            print_outcome(&response.outcome);
        }
        Commands::Tickets => {
            let response = client.tickets().await?;
            if response.tickets.is_empty() {
                println!("Aucun ticket actif.");
            }
            for ticket in response.tickets {
                println!(
                    "{}  {}  {}  ({})",
                    ticket.number, ticket.room, ticket.status, ticket.created_at
                );
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: &AnalysisOutcome) {
    match outcome {
        AnalysisOutcome::Greeting { message } | AnalysisOutcome::OutOfScope { message } => {
            println!("{}", message)
        }
        AnalysisOutcome::Redirected { message, .. } => println!("{}", message),
        AnalysisOutcome::AutoResolved { message } => {
            println!("Résolu automatiquement : {}", message)
        }
        AnalysisOutcome::Escalated { ticket, reason, .. } => {
            println!("Ticket {} créé ({})", ticket.number, reason)
        }
        AnalysisOutcome::ExistingTicket { ticket } => {
            println!("Ticket {} déjà ouvert pour cette salle", ticket.number)
        }
        AnalysisOutcome::EscalationInProgress => {
            println!("Une escalade est déjà en cours, veuillez patienter.")
        }
    }
}
