use clap::{Args, Parser, Subcommand};

use crate::api::{self, Components};
use crate::markers::MarkerTable;
use crate::types::{ApiResponse, DepthMode};

#[derive(Parser)]
#[command(name = "estudio", version, about = "Match studies from one detail page (JSON only)")]
pub struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build (or serve from cache) the study for a match id
    Study(StudyArgs),
    /// Fetch progression stats for one historical match id
    Stats(StatsArgs),
    /// Print the active section-marker table
    Markers,
}

#[derive(Args)]
struct StudyArgs {
    match_id: String,
    /// How much of the aggregation pipeline runs
    #[arg(long, value_enum, default_value_t = DepthMode::Completo)]
    mode: DepthMode,
    /// Discard any cached study for this key first
    #[arg(long)]
    refresh: bool,
}

#[derive(Args)]
struct StatsArgs {
    match_id: String,
}

pub async fn run() -> crate::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Markers => print_json(ApiResponse::ok(MarkerTable::default())),
        Command::Study(args) => {
            let components = Components::new()?;
            finish(
                api::study(&components, &args.match_id, args.mode, args.refresh)
                    .await
                    .map(|doc| (*doc).clone()),
            );
        }
        Command::Stats(args) => {
            let components = Components::new()?;
            finish(api::progression_stats(&components, &args.match_id).await);
        }
    }
    Ok(())
}

fn finish<T: serde::Serialize>(res: crate::Result<T>) {
    match res {
        Ok(v) => print_json(ApiResponse::ok(v)),
        Err(e) => print_json(ApiResponse::<()>::err(e.to_string())),
    }
}

fn print_json<T: serde::Serialize>(val: T) {
    // pretty JSON output
    println!("{}", serde_json::to_string_pretty(&val).unwrap());
}
