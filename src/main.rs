//! Casino Engine Binary
//!
//! `serve` runs the relay, `simulate` plays batches of rounds and prints the
//! return-to-player figures, `init-config` writes a sample TOML file.

use casino_engine::config::{generate_sample_config, ConfigLoader};
use casino_engine::games::GameType;
use casino_engine::relay::{EthersForwarder, Forwarder, RelayServer};
use casino_engine::simulation::{SimulationReport, Simulator};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "casino")]
#[command(about = "Casino outcome engine and meta-transaction relay", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the relay HTTP service
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Play a batch of rounds and report the payout statistics
    Simulate {
        /// Game to simulate; all four when omitted
        #[arg(long, value_enum)]
        game: Option<GameArg>,

        #[arg(long)]
        rounds: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a sample configuration file
    InitConfig {
        #[arg(default_value = "casino.toml")]
        path: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GameArg {
    Slots,
    Crash,
    Mines,
    Blackjack,
}

impl From<GameArg> for GameType {
    fn from(arg: GameArg) -> Self {
        match arg {
            GameArg::Slots => GameType::Slots,
            GameArg::Crash => GameType::Crash,
            GameArg::Mines => GameType::Mines,
            GameArg::Blackjack => GameType::Blackjack,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Batches settle thousands of rounds; keep per-round logs out of the way
    let default_filter = match args.command {
        Command::Simulate { .. } => "casino_engine=warn",
        _ => "casino_engine=info,tower_http=info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }

    match args.command {
        Command::Serve { port } => {
            let mut config = loader.load()?;
            if let Some(port) = port {
                config.relay.port = port;
            }
            let forwarder = EthersForwarder::connect(&config.relay).await?;
            info!(chain_id = ?forwarder.chain_id(), "relayer connected");
            RelayServer::new(config.relay, Arc::new(forwarder)).run().await?;
        }
        Command::Simulate {
            game,
            rounds,
            seed,
            json,
        } => {
            let config = loader.load()?;
            let mut settings = config.simulation.clone();
            if let Some(rounds) = rounds {
                settings.rounds = rounds;
            }
            if seed.is_some() {
                settings.seed = seed;
            }
            let simulator = Simulator::new(config).with_settings(settings);
            let reports = match game {
                Some(game) => vec![simulator.run(game.into())?],
                None => simulator.run_all()?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print_reports(&reports);
            }
        }
        Command::InitConfig { path } => {
            generate_sample_config(&path)?;
            println!("Sample configuration written to {}", path.display());
        }
    }

    Ok(())
}

fn print_reports(reports: &[SimulationReport]) {
    println!(
        "{:<10} {:>8} {:>8} {:>12} {:>12} {:>8} {:>8} {:>8}",
        "game", "rounds", "win %", "wagered", "paid", "rtp", "edge", "max x"
    );
    for r in reports {
        println!(
            "{:<10} {:>8} {:>7.2}% {:>12.2} {:>12.2} {:>8.4} {:>8.4} {:>8.2}",
            r.game.to_string(),
            r.games_played,
            r.win_rate * 100.0,
            r.total_bet,
            r.total_payout,
            r.rtp,
            r.house_edge,
            r.biggest_multiplier
        );
    }
}
