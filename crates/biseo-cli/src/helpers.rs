//! Shared helpers: tracing setup, provider resolution, and wiring the
//! assistant over real or in-memory backends.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use biseo_adapters::{
    CalendarBackend, GoogleCalendar, GoogleTasks, MemoryCalendar, MemoryTasks, TaskBackend,
};
use biseo_agent::{LlmClient, LlmClientConfig};
use biseo_intent::Assistant;
use biseo_store::{InMemoryContext, SystemClock};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber.  `RUST_LOG` overrides `default_level`.
pub fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

// ---------------------------------------------------------------------------
// LLM provider resolution
// ---------------------------------------------------------------------------

const DEFAULT_MODEL_ANTHROPIC: &str = "claude-sonnet-4-20250514";
const DEFAULT_MODEL_OPENAI: &str = "gpt-4o-mini";

/// Pick a model provider from the environment.
///
/// `BISEO_PROVIDER` (`anthropic` or `openai`) selects one explicitly;
/// otherwise `ANTHROPIC_API_KEY` is tried before `OPENAI_API_KEY`.
/// `BISEO_MODEL` and `BISEO_API_BASE_URL` override the model and endpoint.
/// `None` means no key was found and the assistant runs without a model.
pub fn resolve_llm_config() -> Option<LlmClientConfig> {
    let model_override = env_non_empty("BISEO_MODEL");
    let base_url_override = env_non_empty("BISEO_API_BASE_URL");

    let anthropic = || {
        let key = env_non_empty("ANTHROPIC_API_KEY")?;
        let model = model_override
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL_ANTHROPIC.to_owned());
        Some(LlmClientConfig::anthropic(key, model))
    };
    let openai = || {
        let key = env_non_empty("OPENAI_API_KEY")?;
        let model = model_override
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL_OPENAI.to_owned());
        Some(LlmClientConfig::openai(key, model))
    };

    let mut config = match env_non_empty("BISEO_PROVIDER").as_deref() {
        Some("anthropic") => anthropic(),
        Some("openai") => openai(),
        Some(other) => {
            warn!(provider = other, "unknown BISEO_PROVIDER, auto-detecting");
            anthropic().or_else(openai)
        }
        None => anthropic().or_else(openai),
    }?;
    if let Some(url) = base_url_override {
        config.base_url = url;
    }
    Some(config)
}

/// Read an environment variable, treating empty values as unset.
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Which backends and model the assistant ended up with.
#[derive(Debug, Clone)]
pub struct Wiring {
    pub backend: &'static str,
    pub model: Option<String>,
}

/// An assistant plus the conversation context the terminal feeds.
pub struct App {
    pub assistant: Assistant,
    pub context: Arc<InMemoryContext>,
    pub wiring: Wiring,
}

fn backends(
    config: &AppConfig,
    offline: bool,
) -> Result<(Arc<dyn CalendarBackend>, Arc<dyn TaskBackend>, &'static str)> {
    let token = if offline {
        None
    } else {
        env_non_empty("GOOGLE_ACCESS_TOKEN")
    };
    let Some(token) = token else {
        if !offline {
            warn!("GOOGLE_ACCESS_TOKEN not set, using in-memory backends");
        }
        return Ok((
            Arc::new(MemoryCalendar::new()),
            Arc::new(MemoryTasks::new()),
            "in-memory",
        ));
    };

    let timeout = Duration::from_secs(config.google.timeout_secs);
    let calendar = GoogleCalendar::new(
        &config.google.calendar_base_url,
        config.google.calendar_id.clone(),
        token.clone(),
        timeout,
    )
    .context("failed to set up Google Calendar")?;
    let tasks = GoogleTasks::new(&config.google.tasks_base_url, token, timeout)
        .context("failed to set up Google Tasks")?;
    Ok((Arc::new(calendar), Arc::new(tasks), "google"))
}

/// Build the assistant from `config` and the environment.
pub fn build_app(config: &AppConfig, offline: bool) -> Result<App> {
    let workflow = config.workflow()?;
    let clock = Arc::new(SystemClock);
    let context = Arc::new(InMemoryContext::new(workflow.history_limit * 2, clock.clone()));
    let (calendar, tasks, backend) = backends(config, offline)?;

    let mut builder = Assistant::builder(calendar, tasks)
        .clock(clock)
        .context(context.clone())
        .config(workflow);

    let mut model = None;
    if !offline && let Some(llm_config) = resolve_llm_config() {
        model = Some(llm_config.default_model.clone());
        let client = LlmClient::new(llm_config).context("failed to create LLM client")?;
        builder = builder.model(Arc::new(client));
    }

    let assistant = builder.build().context("failed to build assistant")?;
    info!(backend, model = model.as_deref().unwrap_or("none"), "assistant wired");
    Ok(App {
        assistant,
        context,
        wiring: Wiring { backend, model },
    })
}
