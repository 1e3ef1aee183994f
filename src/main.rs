use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use discipline_sim::batch::{run_batch, BatchConfig};
use discipline_sim::driver::{Playback, PlaybackControl, DEFAULT_SPEED};
use discipline_sim::export::export_history_csv;
use discipline_sim::server;
use discipline_sim::types::AppState;
use discipline_sim::{PerformanceSummary, SimulationConfig, SimulationEngine, SimulationSnapshot};

#[derive(Parser, Debug)]
#[command(name = "discipline-sim")]
#[command(about = "Simulate a trading account under a fixed risk-management policy")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Account and risk parameters shared by every command
#[derive(ClapArgs, Debug, Clone)]
struct SimArgs {
    /// Starting account balance
    #[arg(short = 'b', long, env = "SIM_INITIAL_BALANCE", default_value = "1000")]
    balance: f64,

    /// Percent of the current balance risked per trade
    #[arg(short = 'r', long, env = "SIM_RISK_PERCENTAGE", default_value = "2.0")]
    risk: f64,

    /// Reward-to-risk multiple of a winning trade
    #[arg(short = 'x', long, env = "SIM_RISK_REWARD", default_value = "2.0")]
    risk_reward: f64,

    /// Maximum trades taken per day
    #[arg(short = 't', long, env = "SIM_MAX_TRADES", default_value = "3")]
    max_trades: u32,

    /// Number of days to simulate
    #[arg(long, env = "SIM_DAYS", default_value = "365")]
    days: u32,

    /// Probability that a single trade wins
    #[arg(long, env = "SIM_WIN_PROBABILITY", default_value = "0.45")]
    win_probability: f64,

    /// Days between profit cash-outs
    #[arg(long, default_value = "30")]
    cash_out_interval: u32,

    /// Share of profit withdrawn at each cash-out
    #[arg(long, default_value = "0.5")]
    cash_out_fraction: f64,
}

impl SimArgs {
    fn to_config(&self) -> SimulationConfig {
        SimulationConfig::new(self.balance, self.risk, self.risk_reward, self.max_trades)
            .with_horizon_days(self.days)
            .with_win_probability(self.win_probability)
            .with_cash_out(self.cash_out_interval, self.cash_out_fraction)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a single simulation back day by day
    Run {
        #[command(flatten)]
        sim: SimArgs,

        /// Playback speed in days per second
        #[arg(short, long, default_value_t = DEFAULT_SPEED)]
        speed: f64,

        /// Skip pacing and run straight to the end
        #[arg(long)]
        instant: bool,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Write the daily history to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print every snapshot as a JSON line instead of a progress line
        #[arg(long)]
        json: bool,
    },

    /// Run many seeded simulations and summarise the outcome distribution
    Batch {
        #[command(flatten)]
        sim: SimArgs,

        /// Number of simulations
        #[arg(short = 'n', long, default_value = "10000")]
        runs: usize,

        /// Seed of the first run; run i uses seed + i
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Serve paced playback over WebSocket at /ws
    Serve {
        #[command(flatten)]
        sim: SimArgs,

        /// Port to run the web server on
        #[arg(short, long, env = "SIM_PORT", default_value = "3000")]
        port: u16,

        /// Default playback speed in days per second
        #[arg(short, long, default_value_t = DEFAULT_SPEED)]
        speed: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = if args.verbose { "discipline_sim=debug" } else { "discipline_sim=info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::Run { sim, speed, instant, seed, csv, json } => {
            run_single(sim.to_config(), speed, instant, seed, csv, json).await?;
        }
        Commands::Batch { sim, runs, seed, json } => {
            let config = sim.to_config();
            let batch = BatchConfig { runs, base_seed: seed };
            let summary = tokio::task::spawn_blocking(move || run_batch(&config, &batch))
                .await
                .context("Batch task panicked")??;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_config(&config);
                println!("{}", summary);
            }
        }
        Commands::Serve { sim, port, speed } => {
            let config = sim.to_config();
            config.validate()?;

            let state = Arc::new(AppState {
                default_config: config,
                default_speed: speed,
            });
            let app = server::router(state);

            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            info!("Server running at ws://{}/ws", addr);

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn run_single(
    config: SimulationConfig,
    speed: f64,
    instant: bool,
    seed: Option<u64>,
    csv: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut engine = match seed {
        Some(seed) => SimulationEngine::seeded(config, seed)?,
        None => SimulationEngine::start(config)?,
    };

    if !json {
        print_config(&config);
    }

    let last = if instant {
        for snapshot in engine.by_ref() {
            if json && !print_json_line(&snapshot) {
                break;
            }
        }
        engine.snapshot()
    } else {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(PlaybackControl::Stop).await;
            }
        });

        let end = Playback::new(engine, speed)
            .run(rx, |snapshot| {
                if json {
                    print_json_line(snapshot)
                } else {
                    print_progress(snapshot);
                    true
                }
            })
            .await?;

        if !end.completed {
            warn!("Playback stopped at day {}", end.last.day);
        }
        end.last
    };

    if let Some(path) = csv {
        export_history_csv(&last, &path)
            .with_context(|| format!("Failed to write history to {:?}", path))?;
        info!("History written to {:?}", path);
    }

    if !json {
        print_summary(&last);
    }

    Ok(())
}

fn print_json_line(snapshot: &SimulationSnapshot) -> bool {
    match serde_json::to_string(snapshot) {
        Ok(line) => {
            println!("{}", line);
            true
        }
        Err(e) => {
            error!("Failed to serialize snapshot: {}", e);
            false
        }
    }
}

fn print_config(config: &SimulationConfig) {
    println!("\n{}", "=".repeat(60));
    println!("RISK DISCIPLINE SIMULATION");
    println!("{}", "=".repeat(60));
    println!("Initial balance: ${:.2}", config.initial_balance);
    println!(
        "Risk per trade:  {:.2}% | R:R {:.2} | Max trades/day {}",
        config.risk_percentage_per_trade, config.risk_reward_ratio, config.max_trades_per_day
    );
    println!(
        "Win probability: {:.1}% | Horizon {} days",
        config.win_probability * 100.0,
        config.horizon_days
    );
    println!(
        "Cash-out:        {:.0}% of profit every {} days",
        config.cash_out_fraction * 100.0,
        config.cash_out_interval_days
    );
    println!("{}", "-".repeat(60));
}

fn print_progress(snapshot: &SimulationSnapshot) {
    let day = snapshot.day as usize;
    println!(
        "Day {:>4}/{}  balance ${:>12.2}  trades {:>2} (W{} L{})  drawdown {:>6.2}%",
        snapshot.day,
        snapshot.horizon_days,
        snapshot.final_balance,
        snapshot.trades_per_day.get(day).copied().unwrap_or(0),
        snapshot.wins_per_day.get(day).copied().unwrap_or(0),
        snapshot.losses_per_day.get(day).copied().unwrap_or(0),
        snapshot.max_drawdown * 100.0
    );
}

fn print_summary(snapshot: &SimulationSnapshot) {
    let summary = PerformanceSummary::from_snapshot(snapshot);

    println!("\n{}", "=".repeat(60));
    println!("{}", summary);
    println!("  Average win:        ${:.2}", snapshot.average_win);
    println!("  Average loss:       ${:.2}", snapshot.average_loss);
    println!("  Total cashed out:   ${:.2}", snapshot.total_cashed_out);

    if !snapshot.cash_out_history.is_empty() {
        println!("\n  Cash-outs:");
        for cash_out in snapshot.cash_out_history.iter() {
            println!("    Day {:>4}: ${:.2}", cash_out.day, cash_out.amount);
        }
    }

    if snapshot.is_complete() {
        let comparison = summary.comparison;
        println!("\n  Versus the market:");
        println!(
            "    Win rate {} the retail average",
            if comparison.beats_retail_win_rate { "above" } else { "below" }
        );
        match comparison.bank_rate_multiple {
            Some(multiple) => println!("    Return {:.1}x bank interest", multiple),
            None => println!("    Return below bank interest"),
        }
        println!(
            "    Win rate places the run in the top {}",
            if comparison.top_performer { "15%" } else { "50%" }
        );
    }
    println!("{}", "=".repeat(60));
}
