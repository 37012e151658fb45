use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use branchsentry::health::CheckResult;
use branchsentry::job::{self, Delivery};
use branchsentry::{Config, HealthCheck, ReportFormat};

#[derive(Parser)]
#[command(name = "branchsentry")]
#[command(about = "Daily report of non-primary branches across GitHub organizations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan all organizations and email the report (scheduled entrypoint)
    Run(ReportArgs),

    /// Scan all organizations and print the report instead of sending it
    Preview(ReportArgs),

    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Check configuration, credentials and GitHub access
    Doctor,
}

#[derive(Args, Default)]
struct ReportArgs {
    /// Report layout (overrides the config file)
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Skip HEAD commit lookups and staleness flags
    #[arg(long)]
    no_staleness: bool,
}

impl ReportArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(format) = self.format {
            config.report.format = format;
        }
        if self.no_staleness {
            config.report.check_staleness = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;
    info!("Starting BranchSentry v{}", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.clone();

    match cli.command.unwrap_or(Commands::Run(ReportArgs::default())) {
        Commands::Run(args) => cmd_report(config_path, args, Delivery::Email).await,
        Commands::Preview(args) => cmd_report(config_path, args, Delivery::Preview).await,
        Commands::Init { force } => cmd_init(config_path, force),
        Commands::Doctor => cmd_doctor(config_path).await,
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries the run outcome; logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<std::path::PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => {
            let mut config = Config::load(&path)?;
            config.apply_env_overrides();
            Ok(config)
        }
        None => Config::load_or_default(),
    }
}

/// Scan and deliver a report, printing the outcome as JSON
async fn cmd_report(
    config_path: Option<std::path::PathBuf>,
    args: ReportArgs,
    delivery: Delivery,
) -> Result<()> {
    let outcome = match load_config(config_path) {
        Ok(mut config) => {
            args.apply(&mut config);
            job::run(&config, delivery).await
        }
        Err(e) => job::RunOutcome::failure(&e),
    };

    println!("{}", outcome.to_json());

    if !outcome.is_success() {
        std::process::exit(outcome.exit_code());
    }
    Ok(())
}

/// Write the default configuration
fn cmd_init(config_path: Option<std::path::PathBuf>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_config_path()?,
    };

    if path.exists() && !force {
        println!("Configuration already exists at {:?} (use --force to overwrite)", path);
        return Ok(());
    }

    Config::default().save(&path)?;

    println!("✅ BranchSentry configuration written to {:?}", path);
    println!("   Next: set GITHUB_SECRET_NAME, SENDER_EMAIL and RECIPIENT_EMAIL, then run 'branchsentry doctor'");

    Ok(())
}

/// System health check and diagnostics
async fn cmd_doctor(config_path: Option<std::path::PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let health = HealthCheck::run(&config).await;
    print_health_report(&health);

    if !health.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

/// Print health check report to stdout
fn print_health_report(health: &HealthCheck) {
    fn print_check(name: &str, result: &CheckResult) {
        println!("{}:", name);
        let icon = if result.passed {
            if result.is_warning { "⚠️ " } else { "✅" }
        } else {
            "❌"
        };
        println!("  {} {}", icon, result.message);
        if let Some(details) = &result.details {
            for line in details.lines() {
                println!("     {}", line);
            }
        }
    }

    println!("🔍 BranchSentry Diagnostics");
    println!();

    for (name, result) in health.all_checks() {
        print_check(name, result);
        println!();
    }

    if health.all_passed() {
        println!("✅ All checks passed");
    } else {
        println!("❌ Some checks failed");
    }
}
