//! CLI entry point for biseo.
//!
//! Provides the `biseo` command: an interactive terminal session, one-shot
//! classification, and a status report.

mod cli;
mod config;
mod helpers;
mod repl;

use anyhow::Result;
use biseo_intent::InboundMessage;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::helpers::{build_app, env_non_empty, init_tracing, resolve_llm_config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { user, offline } => {
            init_tracing("warn", cli.json_logs);
            let config = AppConfig::load(&cli.config)?;
            let user = user.unwrap_or_else(|| config.assistant.user_id.clone());
            repl::run(&config, &user, offline).await
        }
        Commands::Classify { text, offline } => {
            init_tracing("warn", cli.json_logs);
            let config = AppConfig::load(&cli.config)?;
            cmd_classify(&config, &text, offline).await
        }
        Commands::Status => {
            init_tracing("warn", cli.json_logs);
            let config = AppConfig::load(&cli.config)?;
            cmd_status(&cli.config, &config)
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand: classify
// ---------------------------------------------------------------------------

async fn cmd_classify(config: &AppConfig, text: &str, offline: bool) -> Result<()> {
    let app = build_app(config, offline)?;
    let message = InboundMessage::new(config.assistant.user_id.clone(), text);
    let classification = app.assistant.classify(&message).await;
    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

fn cmd_status(path: &str, config: &AppConfig) -> Result<()> {
    let workflow = config.workflow()?;
    let set = |name: &str| {
        if env_non_empty(name).is_some() {
            "set"
        } else {
            "not set"
        }
    };

    println!();
    println!("  biseo status");
    println!("  ============");
    println!();
    println!("  Config file:      {path}");
    println!("  Timezone:         UTC{}", workflow.timezone);
    println!("  User:             {}", config.assistant.user_id);
    println!(
        "  Matching:         floor {:.2}, auto-commit {:.2}, up to {} candidates",
        workflow.match_floor, workflow.auto_commit_score, workflow.max_delete_candidates
    );
    println!(
        "  Session TTLs:     delete {}s, query {}s, task {}s",
        workflow.delete_session_ttl.as_secs(),
        workflow.query_session_ttl.as_secs(),
        workflow.task_session_ttl.as_secs()
    );
    println!();
    match resolve_llm_config() {
        Some(llm) => println!("  Model:            {} ({:?})", llm.default_model, llm.provider),
        None => println!("  Model:            none (keyword rules only)"),
    }
    println!("  GOOGLE_ACCESS_TOKEN: {}", set("GOOGLE_ACCESS_TOKEN"));
    println!(
        "  Backends:         {}",
        if env_non_empty("GOOGLE_ACCESS_TOKEN").is_some() {
            "Google Calendar + Google Tasks"
        } else {
            "in-memory"
        }
    );
    println!();
    Ok(())
}
