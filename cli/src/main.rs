use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vault_core::{AppointmentOverview, CycleAnalysis, ProviderRollup, VaultConfig};
use vault_insights::payload::parse_datetime;
use vault_insights::{aggregate_appointments_str, analyze_cycle_str};

#[derive(Parser, Debug)]
#[command(
    name = "vault-cli",
    about = "Summarize vault appointments and cycle predictions from JSON payloads."
)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bucket appointments into upcoming, past and per-provider rollups.
    Appointments {
        #[command(flatten)]
        common: CommonArgs,
        /// Only show the rollup for this provider (exact name).
        #[arg(long)]
        provider: Option<String>,
    },
    /// Predict the next period, ovulation and fertile windows.
    Cycle {
        #[command(flatten)]
        common: CommonArgs,
        /// Cycle length used when the payload has none.
        #[arg(long, env = "VAULT_CYCLE_LENGTH", default_value_t = vault_core::DEFAULT_CYCLE_LENGTH)]
        cycle_length: u32,
        /// Period length used when the payload has none.
        #[arg(long, env = "VAULT_PERIOD_LENGTH", default_value_t = vault_core::DEFAULT_PERIOD_LENGTH)]
        period_length: u32,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Path to the JSON payload.
    #[arg(short, long)]
    input: PathBuf,
    /// Evaluation time (RFC 3339 or YYYY-MM-DD); defaults to now.
    #[arg(long, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,
    /// Print the full result as pretty JSON.
    #[arg(long)]
    json: bool,
}

fn parse_now(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_datetime(raw).ok_or_else(|| format!("not a date or timestamp: {raw}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Appointments { common, provider } => {
            let data = read_input(&common.input)?;
            let now = common.now.unwrap_or_else(Utc::now);
            debug!(%now, "aggregating appointments");

            let overview = aggregate_appointments_str(&data, now)
                .with_context(|| format!("Could not aggregate {:?}", common.input))?;

            match provider {
                Some(name) => {
                    let rollup = overview
                        .provider(&name)
                        .with_context(|| format!("No appointments for provider {name:?}"))?;
                    if common.json {
                        println!("{}", serde_json::to_string_pretty(rollup)?);
                    } else {
                        println!("{}", render_rollup(&name, rollup));
                    }
                }
                None if common.json => {
                    println!("{}", serde_json::to_string_pretty(&overview)?);
                }
                None => print!("{}", render_overview(&overview)),
            }
        }
        Command::Cycle {
            common,
            cycle_length,
            period_length,
        } => {
            let data = read_input(&common.input)?;
            let now = common.now.unwrap_or_else(Utc::now);
            let config = VaultConfig {
                default_cycle_length: cycle_length,
                default_period_length: period_length,
            }
            .validated();
            debug!(?config, %now, "analyzing cycle");

            let analysis = analyze_cycle_str(&data, now, &config)
                .with_context(|| format!("Could not analyze {:?}", common.input))?;

            if common.json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print!("{}", render_analysis(&analysis));
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    info!(path = %path.display(), "reading payload");
    std::fs::read_to_string(path).with_context(|| format!("Could not read file {path:?}"))
}

fn render_overview(overview: &AppointmentOverview) -> String {
    let mut out = format!(
        "Upcoming appointments: {}\nPast appointments: {}\n",
        overview.upcoming.len(),
        overview.past.len()
    );

    if let Some(next) = overview.next_appointment() {
        out.push_str(&format!(
            "Next: {} with {}\n",
            next.appointment_date.format("%Y-%m-%d %H:%M"),
            next.provider_name
        ));
    }
    if let Some(last) = overview.most_recent_visit() {
        out.push_str(&format!(
            "Most recent: {} with {}\n",
            last.appointment_date.format("%Y-%m-%d %H:%M"),
            last.provider_name
        ));
    }

    out.push_str("Providers:\n");
    for (name, rollup) in &overview.by_provider {
        out.push_str(&format!("  {}\n", render_rollup(name, rollup)));
    }
    out
}

fn render_rollup(name: &str, rollup: &ProviderRollup) -> String {
    let last = rollup
        .last_visit
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".into());
    let next = rollup
        .next_visit
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".into());
    format!("{name}: {} visit(s), last {last}, next {next}", rollup.count)
}

fn render_analysis(analysis: &CycleAnalysis) -> String {
    let mut out = format!(
        "Cycle day: {} ({})\nNext period: {} (in {} days)\nOvulation window: {} to {}\nFertile window: {} to {}\nRegularity: {}\nCycle health: {}\n",
        analysis.current_cycle_day,
        analysis.phase,
        analysis.predicted_next_period,
        analysis.days_until_next_period,
        analysis.ovulation_window.start,
        analysis.ovulation_window.end,
        analysis.fertile_window.start,
        analysis.fertile_window.end,
        analysis.regularity,
        analysis.cycle_health,
    );
    for insight in &analysis.insights {
        out.push_str(&format!("* {insight}\n"));
    }
    for recommendation in &analysis.recommendations {
        out.push_str(&format!("> {recommendation}\n"));
    }
    out
}
