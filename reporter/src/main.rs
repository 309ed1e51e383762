use clap::{Parser, Subcommand};
use reporter::{init_logging, ReporterSettings};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use zephyr::prelude::*;

#[derive(Parser)]
#[command(name = "reporter")]
#[command(about = "Publish test outcomes to Zephyr Scale")]
struct Cli {
    /// Settings file; ZEPHYR_* environment variables are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a test cycle in the configured folder and print its key
    CreateCycle {
        /// Cycle title (defaults to the configured title)
        #[arg(short, long)]
        title: Option<String>,
        /// Cycle description (defaults to the configured description)
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Record one test result and print its id
    AddResult {
        /// Test case key, e.g. PROJ-T1
        #[arg(long)]
        test_case: String,
        /// Cycle key (defaults to the configured existing cycle)
        #[arg(long)]
        cycle: Option<String>,
        /// One of: Blocked, Fail, In Progress, Not Executed, Pass
        #[arg(long)]
        status: ExecutionStatus,
        /// HTML comment appended after the host metadata
        #[arg(long, default_value = "")]
        comment: String,
        /// Execution time in milliseconds
        #[arg(long, default_value = "0")]
        elapsed_ms: u64,
        /// Script or method label
        #[arg(long, default_value = "")]
        script: String,
    },
    /// Validate settings and print them with the token redacted
    Check,
    /// List the execution statuses Zephyr accepts
    Statuses,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cli = Cli::parse();

    if let Commands::Statuses = cli.command {
        for status in ExecutionStatus::ALL {
            println!("{}", status);
        }
        return Ok(());
    }

    let settings = match &cli.config {
        Some(path) => ReporterSettings::from_toml_file(path)?,
        None => ReporterSettings::from_env()?,
    };

    match cli.command {
        Commands::CreateCycle { title, description } => {
            let client = ZephyrClient::new(settings.client_config(), settings.credentials())?;
            let title = title.unwrap_or_else(|| settings.cycle_title.clone());
            let description = description.unwrap_or_else(|| settings.cycle_description.clone());
            let cycle = client.try_create_test_cycle(&title, &description)?;
            info!("Created test cycle {}", cycle.key);
            println!("{}", cycle.key);
        }
        Commands::AddResult {
            test_case,
            cycle,
            status,
            comment,
            elapsed_ms,
            script,
        } => {
            let cycle = cycle
                .or_else(|| settings.existing_cycle_key.clone())
                .ok_or("no cycle key given; pass --cycle or set ZEPHYR_CYCLE_KEY")?;
            let client = ZephyrClient::new(settings.client_config(), settings.credentials())?;
            let submission = ResultSubmission::new(test_case, cycle, status)
                .with_comment(comment)
                .with_elapsed_millis(elapsed_ms)
                .with_script(script);
            let created = client.try_add_test_result(&submission)?;
            println!("{}", created.id);
        }
        Commands::Check => {
            ZephyrClient::new(settings.client_config(), settings.credentials())?;
            let registry = settings.load_registry()?;
            let summary = json!({
                "project_key": settings.project_key,
                "auth_token": "[REDACTED]",
                "user_id": settings.user_id,
                "folder_id": settings.folder_id,
                "existing_cycle_key": settings.existing_cycle_key,
                "cycle_title": settings.cycle_title,
                "cycle_description": settings.cycle_description,
                "base_url": settings.base_url,
                "timeout_secs": settings.timeout.as_secs(),
                "fail_on_cycle_error": settings.fail_on_cycle_error,
                "registered_tests": registry.len(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Statuses => {}
    }

    Ok(())
}
