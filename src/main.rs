use anyhow::{Context, Result};
use clap::Parser;
use reappointment_trends::{artifacts, Pipeline, PipelineConfig, Stage};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reappoint")]
#[command(about = "Reappointment trend analysis over yearly appointment files")]
#[command(version)]
struct CliArgs {
    /// TOML config file (defaults apply when omitted)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    input_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    start_year: Option<i32>,

    #[arg(long)]
    end_year: Option<i32>,

    /// Debug-level logging (RUST_LOG still wins when set)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run all nine stages in order
    Run,
    /// Run a single stage from the artifacts already in the output directory
    Stage {
        #[arg(value_enum)]
        stage: Stage,
    },
    /// Print the effective configuration as TOML
    PrintConfig,
}

fn main() {
    let args = CliArgs::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &CliArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &args.input_dir {
        config.input_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(year) = args.start_year {
        config.start_year = year;
    }
    if let Some(year) = args.end_year {
        config.end_year = year;
    }

    config.validate()?;
    Ok(config)
}

fn run(args: CliArgs) -> Result<()> {
    let config = load_config(&args)?;

    match args.command {
        Command::PrintConfig => {
            print!("{}", config.to_toml()?);
        }
        Command::Stage { stage } => {
            let pipeline = Pipeline::new(config)?;
            pipeline.run_stage(stage)?;
            println!("\n✅ {} complete", stage);
        }
        Command::Run => {
            println!("📊 Reappointment Trends v{}", reappointment_trends::VERSION);
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

            let pipeline = Pipeline::new(config)?;
            let summary = pipeline.run()?;

            println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("✅ Pipeline complete");
            println!("✓ Combined rows: {}", summary.combined_rows);
            println!("✓ Reappointments flagged: {}", summary.marking.flagged_after);
            println!("✓ Organization-years: {}", summary.rates.len());
            println!(
                "✓ Trend: {} ({:+.4} pp/year, p = {:.4})",
                summary.regression.direction,
                summary.regression.annual_change_pp(),
                summary.regression.p_value
            );
            if summary.quality.has_critical_issues() {
                let report = pipeline.config().output_path(artifacts::DATA_QUALITY);
                println!("⚠️  Data quality report has critical issues, see {}", report.display());
            }
        }
    }

    Ok(())
}
