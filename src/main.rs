use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use futures::StreamExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use prompt_sync::config::Config;
use prompt_sync::{ChangeType, HttpTransport, NewPrompt, Prompt, PromptId, PromptStore, PromptUpdate};

#[derive(Parser)]
#[command(name = "prompt-sync", about = "Mirror and edit prompts on a remote prompts API")]
struct Cli {
    /// Base URL of the prompts API (overrides PROMPTS_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every prompt on the server
    #[command(alias = "ls")]
    List,
    /// Create a prompt
    Create {
        #[arg(long)]
        key: String,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        model: String,
    },
    /// Update the given fields of a prompt; omitted fields are left alone
    Update {
        id: PromptId,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Delete a prompt
    #[command(alias = "rm")]
    Delete { id: PromptId },
    /// Poll the server and print changes until interrupted
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("prompt_sync=info,reqwest=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true).with_bracketed_fields(false))
        .with(sentry::integrations::tracing::layer().event_filter(
            |metadata| match *metadata.level() {
                tracing::Level::ERROR => sentry::integrations::tracing::EventFilter::Event,
                tracing::Level::WARN | tracing::Level::INFO => {
                    sentry::integrations::tracing::EventFilter::Breadcrumb
                }
                _ => sentry::integrations::tracing::EventFilter::Ignore,
            },
        ))
        .init();

    let _guard = sentry::init((
        config.sentry_dsn.clone().unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.environment.clone().into()),
            traces_sample_rate: 0.2,
            ..Default::default()
        },
    ));

    let http_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(config.timeout)
        .build()
        .context("failed to build HTTP client")?;

    let api_url = cli.api_url.unwrap_or_else(|| config.api_url.clone());
    let transport = Arc::new(HttpTransport::new(http_client, api_url, config.api_key.clone()));
    let store = Arc::new(PromptStore::new(transport));

    match cli.command {
        Command::List => {
            refresh(&store).await?;
            print_prompts(&store.prompts());
        }
        Command::Create { key, prompt, model } => {
            let created = store.create(NewPrompt::new(key, prompt, model)).await?;
            print_prompts(&[created]);
        }
        Command::Update {
            id,
            key,
            prompt,
            model,
        } => {
            let updates = PromptUpdate { key, prompt, model };
            if updates.is_empty() {
                anyhow::bail!("nothing to update: pass at least one of --key, --prompt, --model");
            }
            refresh(&store).await?;
            if store.get(id).is_none() {
                tracing::warn!(prompt_id = id, "Prompt not in fetched list, sending update anyway");
            }
            let updated = store.update(id, updates).await?;
            print_prompts(&[updated]);
        }
        Command::Delete { id } => {
            store.delete(id).await?;
            println!("Deleted prompt {id}");
        }
        Command::Watch { interval } => {
            watch(store, Duration::from_secs(interval.max(1))).await?;
        }
    }

    Ok(())
}

/// `list()` never returns its failure, so surface it from the status.
async fn refresh(store: &PromptStore) -> Result<()> {
    store.list().await;
    match store.error() {
        Some(message) => anyhow::bail!(message),
        None => Ok(()),
    }
}

async fn watch(store: Arc<PromptStore>, interval: Duration) -> Result<()> {
    let mut changes = Box::pin(store.changes());
    let mut ticker = tokio::time::interval(interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut snapshot: Vec<Prompt> = Vec::new();
    let mut last_error: Option<String> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                store.list().await;
                let error = store.error();
                if error != last_error {
                    match &error {
                        Some(message) => eprintln!("{message}"),
                        None if last_error.is_some() => eprintln!("Connection restored"),
                        None => {}
                    }
                    last_error = error;
                }
            }
            Some(change) = changes.next() => {
                if change.change_type == ChangeType::Reloaded {
                    let current = store.prompts();
                    for line in diff_prompts(&snapshot, &current) {
                        println!("{line}");
                    }
                    snapshot = current;
                }
            }
            res = &mut shutdown => {
                res.context("failed to listen for Ctrl-C")?;
                tracing::info!("Stopping watch");
                return Ok(());
            }
        }
    }
}

fn print_prompts(prompts: &[Prompt]) {
    if prompts.is_empty() {
        println!("No prompts");
        return;
    }
    for p in prompts {
        println!("{}\t{}\t{}\t{}", p.id, p.key, p.model, first_line(&p.prompt));
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

/// One line per added (`+`), changed (`~`), or removed (`-`) prompt.
fn diff_prompts(old: &[Prompt], new: &[Prompt]) -> Vec<String> {
    let before: HashMap<PromptId, &Prompt> = old.iter().map(|p| (p.id, p)).collect();
    let after: HashMap<PromptId, &Prompt> = new.iter().map(|p| (p.id, p)).collect();

    let mut lines = Vec::new();
    for p in new {
        match before.get(&p.id) {
            None => lines.push(format!("+ {}\t{}\t{}", p.id, p.key, p.model)),
            Some(prev) if *prev != p => lines.push(format!("~ {}\t{}\t{}", p.id, p.key, p.model)),
            Some(_) => {}
        }
    }
    for p in old {
        if !after.contains_key(&p.id) {
            lines.push(format!("- {}\t{}", p.id, p.key));
        }
    }
    lines
}
