mod client;
mod reports;
mod scenarios;
mod ticker;
mod walk;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use scenarios::{ScenarioResult, get_scenario, list_scenarios, run_scenario};
use walk::{WalkPlan, run_walk, validate_minutes};

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RunMode {
    /// Scripted flow scenarios against in-memory storage (fast, offline)
    Scenarios,
    /// Plan and walk a real route from the route service
    Walk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "loopwalk", version)]
#[command(about = "LoopWalk trip planner - flow scenarios and simulated walks")]
struct Args {
    /// Run mode: scripted scenarios or a live walk
    #[arg(long, value_enum, default_value_t = RunMode::Scenarios)]
    mode: RunMode,

    /// Scenarios to run (comma-separated, `all` for every scenario)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    // Walk-specific options
    /// Base URL of the route service API
    #[arg(long, env = "LOOPWALK_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Walk to a named destination
    #[arg(long, conflicts_with = "minutes")]
    destination: Option<String>,

    /// Walk for a number of minutes (10-120 in steps of 5)
    #[arg(long)]
    minutes: Option<u32>,

    /// Starting point; defaults to the current location
    #[arg(long)]
    origin: Option<String>,

    /// Theme category (historic, movie, energy, food, custom) or preset id
    #[arg(long)]
    theme: Option<String>,

    /// Detail label for a theme category
    #[arg(long, requires = "theme")]
    detail: Option<String>,

    /// Free-text description of the walk you want
    #[arg(long)]
    prompt: Option<String>,

    /// Seconds between simulated navigation steps
    #[arg(long, default_value_t = 8)]
    tick_secs: u64,

    /// Stop navigating after this many ticks
    #[arg(long)]
    max_ticks: Option<usize>,
}

impl Args {
    fn walk_plan(&self) -> WalkPlan {
        WalkPlan {
            api_base_url: self.api_base_url.clone(),
            destination: self.destination.clone(),
            minutes: self.minutes,
            origin: self.origin.clone(),
            theme: self.theme.clone(),
            detail: self.detail.clone(),
            prompt: self.prompt.clone(),
            cadence: Duration::from_secs(self.tick_secs),
            max_ticks: self.max_ticks,
            verbose: self.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }
    if let Some(minutes) = args.minutes {
        validate_minutes(minutes)?;
    }

    announce_banner();

    match args.mode {
        RunMode::Scenarios => {
            let start_time = Instant::now();
            let names = expand_scenarios(&args.scenarios);
            let results = run_scenarios(&names, args.verbose).await;
            write_reports(&args, &results, start_time)?;
            if results.iter().any(|r| !r.passed) {
                std::process::exit(1);
            }
        }
        RunMode::Walk => {
            let summary = run_walk(&args.walk_plan()).await?;
            println!(
                "🏁 {} ticks, {:.0}% of {} steps{}",
                summary.ticks,
                summary.percent_complete,
                summary.steps,
                if summary.used_fallback {
                    " (built-in route)"
                } else {
                    ""
                }
            );
        }
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:20} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🚶 LoopWalk Trip Planner".bright_cyan().bold());
    println!("{}", "========================".cyan());
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for (key, _) in list_scenarios() {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}

async fn run_scenarios(names: &[String], verbose: bool) -> Vec<ScenarioResult> {
    println!("{}", "🧭 Running Flow Scenarios".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let mut results = Vec::new();
    for name in names {
        let Some(scenario) = get_scenario(name) else {
            eprintln!("⚠️  Unknown scenario: {}", name.yellow());
            continue;
        };
        let result = run_scenario(scenario.as_ref()).await;
        if result.passed {
            println!("✅ {} - {:?}", result.scenario_name, result.duration);
        } else {
            eprintln!("❌ {} - {:?}", result.scenario_name, result.duration);
            if verbose {
                for failure in &result.failures {
                    eprintln!("   {}", failure.red());
                }
            }
        }
        results.push(result);
    }
    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => reports::generate_json_report(&mut output_target, results)?,
        ReportFormat::Markdown => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# LoopWalk Flow Scenario Results\n\n_No scenarios executed._"
                )?;
            } else {
                reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        ReportFormat::Console => {
            if results.is_empty() {
                writeln!(&mut output_target, "No flow scenarios executed.")?;
            } else {
                reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
