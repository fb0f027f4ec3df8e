use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use folio_tester::utils::config::SuiteConfig;
use folio_tester::{flows, report, runner};

#[derive(Parser)]
#[command(name = "folio-tester")]
#[command(version)]
#[command(about = "End-to-end browser tests for the creator portfolio app", long_about = None)]
struct Cli {
    /// Verbose internal logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the end-to-end scenarios
    Run {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Base URL of the application under test
        #[arg(long)]
        base_url: Option<String>,

        /// Base URL of the application's API
        #[arg(long)]
        api_url: Option<String>,

        /// Output directory for screenshots and reports
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show the browser window
        #[arg(long, default_value = "false")]
        headed: bool,

        /// Run only these scenarios (id or name). Can be specified multiple times.
        #[arg(short, long)]
        scenario: Vec<String>,

        /// Write results.json and junit.xml into the run directory
        #[arg(long, default_value = "false")]
        report: bool,
    },

    /// List scenarios in run order
    List,

    /// Generate report from a saved results.json
    Report {
        /// Path to results JSON
        results: PathBuf,

        /// Output format (json, junit, summary)
        #[arg(short, long, default_value = "junit")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("{} {:#}", "✗ Error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

async fn execute(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Run {
            config,
            base_url,
            api_url,
            output,
            headed,
            scenario,
            report,
        } => {
            let mut suite_config = SuiteConfig::load(config.as_deref())?;
            if let Some(url) = base_url {
                suite_config.base_url = url;
            }
            if let Some(url) = api_url {
                suite_config.api_url = url;
            }
            if let Some(dir) = output {
                suite_config.output_dir = dir;
            }
            if headed {
                suite_config.browser.headless = false;
            }

            println!(
                "{} Running end-to-end tests against: {}",
                "▶".green().bold(),
                suite_config.base_url.cyan()
            );
            println!(
                "  Browser: {}",
                if suite_config.browser.headless {
                    "headless".to_string()
                } else {
                    "headed".yellow().to_string()
                }
            );
            if !scenario.is_empty() {
                println!("  Scenarios: {}", scenario.join(", ").yellow());
            }
            println!(
                "  Output: {}",
                suite_config.output_dir.display().to_string().cyan()
            );
            if report {
                println!("  Reports: {}", "Enabled".green());
            }

            let results = runner::run_suite(suite_config, &scenario, report).await?;
            Ok(if results.summary.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }

        Commands::List => {
            for (i, flow) in flows::all().iter().enumerate() {
                println!("{}. {} ({})", i + 1, flow.name(), flow.id().cyan());
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
