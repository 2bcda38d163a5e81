//! sql-boxcar - answer questions about a database with generated SQL.

mod cli;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use cli::Cli;
use sql_boxcar::boxcar::{
    ActionSummary, ApprovalMode, ApprovalStrategy, BoxcarBuilder, GeneratedAction,
};
use sql_boxcar::config::Config;
use sql_boxcar::db::{self, redact_url, run_script, DatabaseClient};
use sql_boxcar::error::{BoxcarError, Result};
use sql_boxcar::llm::{create_client, LlmClient};
use sql_boxcar::logging::{init_file_logging, init_stderr_logging};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();

    match cli.log_path() {
        Some(path) => init_file_logging(&path),
        None => init_stderr_logging(),
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env();
    cli.apply_to(&mut config)?;

    let url = config.database.resolved_url().to_string();
    info!("Connecting to {}", redact_url(&url));
    let db: Arc<dyn DatabaseClient> = Arc::from(db::connect(&url).await?);

    if let Some(seed) = &cli.seed {
        let script = std::fs::read_to_string(seed).map_err(|e| {
            BoxcarError::config(format!("Failed to read seed file {}: {e}", seed.display()))
        })?;
        let count = run_script(db.as_ref(), &script).await?;
        info!("Ran {} seed statements from {}", count, seed.display());
    }

    let llm: Arc<dyn LlmClient> = Arc::from(create_client(
        config.llm.provider,
        None,
        config.llm.model.clone(),
    )?);

    let mut builder = BoxcarBuilder::from_config(&config.boxcar);
    if config.boxcar.approval == ApprovalMode::Prompt {
        builder = builder.approval(Arc::new(StdinApproval));
    }
    let boxcar = builder.build(Arc::clone(&db), llm)?;

    let result = boxcar.run(&cli.question).await;
    if let Err(e) = db.close().await {
        warn!("Failed to close database: {}", e);
    }

    println!("{}", cli.output.render(&result?));
    Ok(())
}

/// Asks on the terminal before anything runs.
struct StdinApproval;

impl ApprovalStrategy for StdinApproval {
    fn decide(&self, action: &GeneratedAction) -> bool {
        let summary = ActionSummary::from(action);
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "\n{}\n", summary.sql);
        if let Some(warning) = &action.classification().warning {
            let _ = writeln!(stderr, "Warning: {}", warning);
        }
        let _ = write!(
            stderr,
            "Run this {} action? [y/N] ",
            summary.level.to_string().to_lowercase()
        );
        let _ = stderr.flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}
