//! Kube Credentials CLI: Talks to running issuance and verification
//! services.
//!
//! Subcommands: issue, verify, check, history, health, hash.

mod commands;

use clap::{Parser, Subcommand};

/// Kube Credentials: Credential issuance and verification.
#[derive(Parser, Debug)]
#[command(name = "kubecred", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Issue a credential.
    Issue(commands::issue::IssueArgs),
    /// Verify a credential.
    Verify(commands::verify::VerifyArgs),
    /// Ask the issuance service whether a hash was issued.
    Check(commands::check::CheckArgs),
    /// Show verification attempts for a hash.
    History(commands::history::HistoryArgs),
    /// Probe both services.
    Health(commands::health::HealthArgs),
    /// Compute a credential hash locally.
    Hash(commands::hash::HashArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Issue(args) => commands::issue::run(args).await,
        Commands::Verify(args) => commands::verify::run(args).await,
        Commands::Check(args) => commands::check::run(args).await,
        Commands::History(args) => commands::history::run(args).await,
        Commands::Health(args) => commands::health::run(args).await,
        Commands::Hash(args) => commands::hash::run(args),
    }
}
