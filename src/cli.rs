//! Command-line argument parsing for sql-boxcar.

use clap::Parser;
use std::path::PathBuf;

use sql_boxcar::boxcar::ApprovalMode;
use sql_boxcar::config::Config;
use sql_boxcar::error::Result;
use sql_boxcar::llm::LlmProvider;
use sql_boxcar::logging::default_log_path;
use sql_boxcar::query::OutputFormat;

/// Answer a question about a database with generated SQL.
#[derive(Parser, Debug)]
#[command(name = "sql-boxcar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The question to answer. Separate several questions with ';'.
    #[arg(value_name = "QUESTION")]
    pub question: String,

    /// Database connection URL (sqlite:... or postgres://...)
    #[arg(long, value_name = "URL", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Comma-separated entities the boxcar may use (default: all)
    #[arg(long, value_name = "TABLES", value_delimiter = ',')]
    pub tables: Option<Vec<String>>,

    /// Comma-separated entities to hide
    #[arg(long, value_name = "TABLES", value_delimiter = ',')]
    pub except: Option<Vec<String>>,

    /// Print the generated SQL without running it
    #[arg(long)]
    pub code_only: bool,

    /// Approval mode: always, never, read-only or prompt
    #[arg(long, value_name = "MODE")]
    pub approval: Option<String>,

    /// Approve without asking (same as --approval always)
    #[arg(short = 'y', long, conflicts_with = "approval")]
    pub yes: bool,

    /// LLM provider to use: openai or mock
    #[arg(long, value_name = "PROVIDER")]
    pub llm: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// SQL script to run before answering (e.g. to seed an in-memory database)
    #[arg(long, value_name = "PATH")]
    pub seed: Option<PathBuf>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log to a file instead of stderr (default location when no path is given)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<Option<PathBuf>>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_ref()
            .map(|path| path.clone().unwrap_or_else(default_log_path))
    }

    /// Overrides `config` with the flags that were given.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(url) = &self.database_url {
            config.database.url = Some(url.clone());
        }
        if let Some(tables) = &self.tables {
            config.boxcar.tables = Some(tables.clone());
        }
        if let Some(except) = &self.except {
            config.boxcar.except = except.clone();
        }
        if self.code_only {
            config.boxcar.code_only = true;
        }
        if self.yes {
            config.boxcar.approval = ApprovalMode::Always;
        } else if let Some(mode) = &self.approval {
            config.boxcar.approval = mode.parse()?;
        }
        if let Some(provider) = &self.llm {
            config.llm.provider = provider.parse::<LlmProvider>()?;
        }
        Ok(())
    }
}
