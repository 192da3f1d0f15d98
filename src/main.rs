//! Command line front end for the skill-balancer engine
//!
//! Loads configuration, opens the ratings file and runs one engine
//! operation per invocation.

use anyhow::Result;
use clap::{Parser, Subcommand};
use skill_balancer::balance::MatchBalancer;
use skill_balancer::config::AppConfig;
use skill_balancer::events::TracingEventPublisher;
use skill_balancer::rating::InMemoryRatingStorage;
use skill_balancer::types::{BalancedMatch, MatchOutcome, PlayerHandicap};
use skill_balancer::utils::{display_rating, format_probability};
use skill_balancer::RatingEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Skill Balancer - skill ratings and handicap-aware team balancing
#[derive(Parser)]
#[command(
    name = "skill-balancer",
    version,
    about = "Skill ratings and handicap-aware team balancing for two-team matches",
    long_about = "Skill Balancer tracks a latent skill per player, learns from every match \
                 result with one gradient step, and splits a roster into the most even \
                 red/blue teams, adding handicaps to the weaker side when needed."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Ratings file override
    #[arg(long, value_name = "FILE", help = "Override the ratings file path")]
    ratings_path: Option<PathBuf>,

    /// Keep ratings in memory only
    #[arg(long, help = "Start from default ratings and never write the ratings file")]
    ephemeral: bool,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without touching ratings")]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Split players into the most even red and blue teams
    Balance {
        /// Players to split
        #[arg(required = true)]
        players: Vec<String>,
    },
    /// Record a finished match and update ratings
    Record {
        /// Red roster entries, `name` or `name:handicap`
        #[arg(long, num_args = 0.., value_name = "PLAYER")]
        red: Vec<PlayerHandicap>,
        /// Blue roster entries, `name` or `name:handicap`
        #[arg(long, num_args = 0.., value_name = "PLAYER")]
        blue: Vec<PlayerHandicap>,
        /// Winner: red, blue or tie
        #[arg(long)]
        winner: MatchOutcome,
    },
    /// Predict the red team's chance of winning
    Predict {
        #[arg(long, num_args = 0.., value_name = "PLAYER")]
        red: Vec<PlayerHandicap>,
        #[arg(long, num_args = 0.., value_name = "PLAYER")]
        blue: Vec<PlayerHandicap>,
    },
    /// Show ratings, strongest first
    Leaderboard {
        /// Only show the top N players
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one player's rating
    Show { player: String },
    /// Show the model parameters
    Params,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from file, environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if let Some(ratings_path) = &args.ratings_path {
        config.storage.ratings_path = ratings_path.clone();
    }

    skill_balancer::config::validate_config(&config)?;
    Ok(config)
}

fn print_team(label: &str, team: &[PlayerHandicap]) {
    let entries: Vec<String> = team.iter().map(|slot| slot.to_string()).collect();
    println!("{:<5} {}", label, entries.join(", "));
}

fn print_balanced(result: &BalancedMatch) {
    print_team("Red:", &result.red_team);
    print_team("Blue:", &result.blue_team);
    println!("Red wins: {}", format_probability(result.p_red_wins));
}

async fn run(engine: &RatingEngine, command: Command) -> Result<()> {
    match command {
        Command::Balance { players } => {
            let result = engine.balance(&players).await?;
            print_balanced(&result);
        }
        Command::Record { red, blue, winner } => {
            let report = engine.record_match(&red, &blue, winner).await?;
            println!("{} (match {})", report.outcome, report.match_id);
            println!("Loss: {:.3}", report.loss);
        }
        Command::Predict { red, blue } => {
            let p_red = engine.win_probability(&red, &blue).await?;
            println!("Red wins: {}", format_probability(p_red));
        }
        Command::Leaderboard { limit } => {
            let entries = engine.leaderboard().await;
            let shown = limit.unwrap_or(entries.len());
            for (rank, entry) in entries.iter().take(shown).enumerate() {
                println!("{:>3}. {:<20} {}", rank + 1, entry.player_id, entry.display_rating);
            }
        }
        Command::Show { player } => {
            let known = engine.has_player(&player).await;
            let skill = engine.get_skill(&player).await?;
            println!(
                "{}: {} (skill {:.4}){}",
                player,
                display_rating(skill),
                skill,
                if known { "" } else { " [new]" }
            );
        }
        Command::Params => {
            let params = engine.parameters().await;
            println!("alpha = {:.4}", params.alpha);
            println!("beta  = {:.4}", params.beta);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        info!("   Service: {}", config.service.name);
        info!("   Ratings: {}", config.storage.ratings_path.display());
        info!("   Max roster size: {}", config.balance.max_roster_size);
        return Ok(());
    }

    let Some(command) = args.command else {
        eprintln!("No command given, see --help");
        std::process::exit(2);
    };

    let engine = if args.ephemeral {
        info!("Ephemeral mode: ratings will not be saved");
        RatingEngine::open(
            Arc::new(InMemoryRatingStorage::new()),
            Arc::new(TracingEventPublisher),
            MatchBalancer::new(config.balance.max_roster_size),
        )
    } else {
        RatingEngine::from_config(&config)
    };
    if let Err(e) = run(&engine, command).await {
        error!("Command failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
