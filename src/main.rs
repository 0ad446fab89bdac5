use chrono_tz::Tz;
use clap::Parser;
use runlog2cdp::{convert, Config, DurationFormat};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "runlog2cdp")]
#[command(version, about = "Convert an ejudge run log into an ICPC Contest Package", long_about = None)]
struct Cli {
    /// Path to the ejudge run log XML
    input: PathBuf,
    /// Directory to write the package into; must be absent or empty
    output: PathBuf,
    /// Time zone of the run log's start_time
    #[arg(long, default_value = "Europe/Minsk")]
    timezone: Tz,
    /// Penalty minutes per rejected attempt
    #[arg(long, default_value_t = 20)]
    penalty_time: i64,
    /// How durations and contest times are written
    #[arg(long, value_enum, default_value_t = DurationFormat::Reltime)]
    duration_format: DurationFormat,
    /// Append a final state event marking the contest finalized
    #[arg(long)]
    finalize: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config {
        timezone: cli.timezone,
        penalty_time: cli.penalty_time,
        duration_format: cli.duration_format,
        finalize: cli.finalize,
    };

    match convert(&cli.input, &cli.output, &config) {
        Ok(package) => log::info!(
            "Created contest package for {:?} in {:?}",
            package.contest.name,
            cli.output
        ),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
