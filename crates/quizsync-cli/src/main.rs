//! quizsync CLI
//!
//! Command-line interface for quizsync - pull, browse, edit and push a
//! locally cached question bank.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use quizsync_core::{Config, Difficulty, LocalCache, StorageError, SyncError};

mod commands;
mod output;

use commands::question::{QuestionEdit, QuestionFilter};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "quizsync")]
#[command(about = "quizsync - Local-first question bank cache and sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the local cache with the remote collection
    Pull,
    /// Write the local cache to the remote collection
    Push,
    /// Show cache and remote status
    Status,
    /// Browse and edit cached questions
    #[command(alias = "q")]
    Question {
        #[command(subcommand)]
        command: QuestionCommands,
    },
    /// Record and list question log entries
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum QuestionCommands {
    /// List cached questions
    #[command(alias = "ls")]
    List {
        /// Filter by subject
        #[arg(short, long)]
        subject: Option<String>,
        /// Filter by topic
        #[arg(short, long)]
        topic: Option<String>,
        /// Filter by difficulty (easy, medium, hard)
        #[arg(short, long)]
        difficulty: Option<Difficulty>,
        /// Only questions that failed validation
        #[arg(long)]
        unvalidated: bool,
    },
    /// Show one question
    Show {
        /// Question ID
        id: String,
    },
    /// Edit a question locally
    Edit {
        /// Question ID
        id: String,
        /// New question text
        #[arg(long)]
        content: Option<String>,
        /// New answer
        #[arg(long)]
        answer: Option<String>,
        /// New explanation
        #[arg(long)]
        explanation: Option<String>,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Append a log entry
    Add {
        /// Question the entry refers to
        question_id: String,
        /// Event type, e.g. viewed or answered
        event_type: String,
        /// Extra attribute as key=value (repeatable)
        #[arg(short, long = "attr", value_name = "KEY=VALUE")]
        attrs: Vec<String>,
    },
    /// List log entries
    #[command(alias = "ls")]
    List {
        /// Only entries for this question
        #[arg(long = "question", value_name = "ID")]
        question_id: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, remote_url, collection, request_timeout_secs, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let result = run(cli, &output).await;
    if let Err(e) = &result {
        if let Some(hint) = recovery_hint(e) {
            if !output.is_quiet() {
                eprintln!("hint: {}", hint);
            }
        }
    }
    result
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let config_path = cli.config.as_ref();

    // Config commands don't need the cache
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key.clone(), value.clone(), config_path, output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let cache = Arc::new(LocalCache::open(&config).context("Failed to open local cache")?);

    let result = match cli.command {
        Commands::Pull => commands::sync::pull(cache.clone(), &config, output).await,
        Commands::Push => commands::sync::push(cache.clone(), &config, output).await,
        Commands::Status => commands::status::show(&cache, &config, output),
        Commands::Question { command } => handle_question_command(command, &cache, output),
        Commands::Log { command } => handle_log_command(command, &cache, output),
        Commands::Config { .. } => Ok(()), // Handled above
    };

    cache.close().context("Failed to close local cache")?;
    result
}

fn handle_question_command(
    command: QuestionCommands,
    cache: &LocalCache,
    output: &Output,
) -> Result<()> {
    match command {
        QuestionCommands::List {
            subject,
            topic,
            difficulty,
            unvalidated,
        } => commands::question::list(
            cache,
            QuestionFilter {
                subject,
                topic,
                difficulty,
                unvalidated,
            },
            output,
        ),
        QuestionCommands::Show { id } => commands::question::show(cache, id, output),
        QuestionCommands::Edit {
            id,
            content,
            answer,
            explanation,
        } => commands::question::edit(
            cache,
            id,
            QuestionEdit {
                content,
                answer,
                explanation,
            },
            output,
        ),
    }
}

fn handle_log_command(command: LogCommands, cache: &LocalCache, output: &Output) -> Result<()> {
    match command {
        LogCommands::Add {
            question_id,
            event_type,
            attrs,
        } => commands::log::add(cache, question_id, event_type, attrs, output),
        LogCommands::List { question_id } => commands::log::list(cache, question_id, output),
    }
}

/// Suggestion for storage failures anywhere in the error chain
fn recovery_hint(error: &anyhow::Error) -> Option<&'static str> {
    error.chain().find_map(|cause| {
        if let Some(storage) = cause.downcast_ref::<StorageError>() {
            return storage.recovery_suggestion();
        }
        match cause.downcast_ref::<SyncError>() {
            Some(SyncError::Storage(storage)) => storage.recovery_suggestion(),
            Some(SyncError::AlreadyRunning(_)) => Some("Wait for the other run to finish."),
            _ => None,
        }
    })
}

/// Initialize logging
///
/// Only initializes if QUIZSYNC_LOG is set. Logs go to config.log_file
/// when set, stderr otherwise.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("QUIZSYNC_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "quizsync_core={},quizsync={}",
        log_level, log_level
    ));

    match &config.log_file {
        Some(log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();

            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_question_list_filters() {
        let cli = Cli::try_parse_from([
            "quizsync",
            "--json",
            "question",
            "list",
            "--subject",
            "math",
            "--difficulty",
            "hard",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Question {
                command:
                    QuestionCommands::List {
                        subject,
                        difficulty,
                        unvalidated,
                        ..
                    },
            } => {
                assert_eq!(subject.as_deref(), Some("math"));
                assert_eq!(difficulty, Some(Difficulty::Hard));
                assert!(!unvalidated);
            }
            _ => panic!("expected question list"),
        }
    }

    #[test]
    fn test_parse_log_add_attributes() {
        let cli = Cli::try_parse_from([
            "quizsync", "log", "add", "q1", "answered", "--attr", "correct=true", "-a", "ms=900",
        ])
        .unwrap();

        match cli.command {
            Commands::Log {
                command: LogCommands::Add { attrs, .. },
            } => assert_eq!(attrs, vec!["correct=true", "ms=900"]),
            _ => panic!("expected log add"),
        }
    }

    #[test]
    fn test_bad_difficulty_is_rejected() {
        assert!(Cli::try_parse_from(["quizsync", "question", "list", "-d", "extreme"]).is_err());
    }

    #[test]
    fn test_recovery_hint_through_context() {
        let err = anyhow::Error::new(SyncError::Storage(StorageError::unavailable("closed")))
            .context("Pull failed");
        assert!(recovery_hint(&err).is_some());

        let plain = anyhow::anyhow!("something else");
        assert!(recovery_hint(&plain).is_none());
    }
}
