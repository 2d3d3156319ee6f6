//! `journal` CLI entry point.
//!
//! Every subcommand resolves the principal, runs one engine operation, and
//! prints the result (with its provenance tag) as JSON on stdout.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;

use moodjournal::config::JournalConfig;
use moodjournal::entry::{EntryPatch, NewEntry};
use moodjournal::principal::{
    DemoCredentials, DemoSession, IdentityProvider, NoIdentity, PrincipalResolver, SupabaseAuth,
};
use moodjournal::providers::classifier::ClassifierGateway;
use moodjournal::providers::gemini::GeminiTransport;
use moodjournal::providers::insights::{HttpInsightTransport, InsightGateway};
use moodjournal::store::local::LocalStore;
use moodjournal::store::medium::{LocalMedium, SqliteMedium};
use moodjournal::store::remote::{PostgrestConfig, PostgrestStore};
use moodjournal::store::{DateRange, ListQuery, RemoteStore};
use moodjournal::sync::policy::ForceMode;
use moodjournal::sync::{EngineOptions, JournalEngine};

/// Journal with mood tracking and remote/local storage.
#[derive(Parser)]
#[command(name = "journal", version, about)]
struct Cli {
    /// Force the store for this invocation (`database` or `localStorage`).
    #[arg(long, global = true)]
    force: Option<ForceMode>,

    /// Write JSON logs to this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Argument of `journal mode`: a force mode, or `auto` to clear it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Always try the remote store first.
    Database,
    /// Use local storage only.
    #[value(name = "localStorage")]
    LocalStorage,
    /// Route by principal.
    Auto,
}

impl ModeArg {
    fn force_mode(self) -> Option<ForceMode> {
        match self {
            Self::Database => Some(ForceMode::Database),
            Self::LocalStorage => Some(ForceMode::LocalStorage),
            Self::Auto => None,
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Write a new entry. Content is read from stdin when `--content` is absent.
    New {
        /// Entry title.
        #[arg(long)]
        title: String,
        /// Mood label.
        #[arg(long)]
        mood: String,
        /// Tag (repeatable, order kept).
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Entry text.
        #[arg(long)]
        content: Option<String>,
        /// Authorship date (YYYY-MM-DD), default today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List entries, newest first.
    List {
        /// Maximum number of entries.
        #[arg(long)]
        limit: Option<usize>,
        /// First date included (YYYY-MM-DD).
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        /// Last date included (YYYY-MM-DD).
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
    /// Show one entry.
    Show {
        /// Entry id.
        id: String,
    },
    /// Change fields of an entry.
    Edit {
        /// Entry id.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New content.
        #[arg(long)]
        content: Option<String>,
        /// New mood.
        #[arg(long)]
        mood: Option<String>,
        /// Replacement tags (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// New date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete an entry.
    Delete {
        /// Entry id.
        id: String,
    },
    /// Generate and store insights for an entry.
    Insights {
        /// Entry id.
        id: String,
    },
    /// Replace local storage with the full remote collection.
    Sync,
    /// Persist the store preference.
    Mode {
        /// Preference to store.
        #[arg(value_enum)]
        mode: ModeArg,
    },
    /// Start a demo session.
    Login {
        /// Demo username.
        username: String,
        /// Demo password.
        password: String,
    },
    /// End the demo session and drop its local entries.
    Logout,
    /// Show the resolved principal.
    Whoami,
    /// Check that the remote store is reachable.
    Check,
}

/// Everything a subcommand may need.
struct App {
    engine: JournalEngine,
    local: LocalStore,
    remote: Arc<dyn RemoteStore>,
    demo: DemoSession,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = JournalConfig::load().context("failed to load configuration")?;

    let _logging_guard = match cli.log_dir.as_ref().or(config.log_dir.as_ref()) {
        Some(dir) => Some(moodjournal::logging::init_file(dir, &config.log_level)?),
        None => {
            moodjournal::logging::init_cli(&config.log_level);
            None
        }
    };

    let app = build_app(&config, cli.force).await?;
    run(cli.command, &app).await
}

async fn build_app(config: &JournalConfig, force: Option<ForceMode>) -> Result<App> {
    let db_path = config.local_db_path()?;
    let medium: Arc<dyn LocalMedium> = Arc::new(
        SqliteMedium::open(&db_path)
            .await
            .with_context(|| format!("failed to open local storage at {}", db_path.display()))?,
    );
    let local = LocalStore::new(Arc::clone(&medium));

    let remote: Arc<dyn RemoteStore> = Arc::new(PostgrestStore::new(PostgrestConfig {
        base_url: config.remote.url.clone(),
        api_key: config.remote.api_key.clone(),
        table: config.remote.table.clone(),
    }));

    let identity: Arc<dyn IdentityProvider> = match &config.remote.url {
        Some(url) if config.auth.access_token.is_some() => Arc::new(SupabaseAuth::new(
            url.clone(),
            config.remote.api_key.clone(),
            config.auth.access_token.clone(),
        )),
        _ => Arc::new(NoIdentity),
    };

    let insights = if let Some(endpoint) = &config.insights.endpoint {
        InsightGateway::new(Arc::new(HttpInsightTransport::new(endpoint.clone())))
    } else if let Some(key) = &config.insights.gemini_api_key {
        InsightGateway::new(Arc::new(GeminiTransport::new(
            config.insights.gemini_base_url.clone(),
            config.insights.gemini_model.clone(),
            key.clone(),
        )))
    } else {
        InsightGateway::disabled()
    };

    let force_mode = match force.or(config.engine.force_mode) {
        Some(mode) => Some(mode),
        None => ForceMode::load(medium.as_ref())
            .await
            .context("failed to read stored force mode")?,
    };
    debug!(?force_mode, "force mode resolved");

    let engine = JournalEngine::new(
        Arc::clone(&remote),
        local.clone(),
        PrincipalResolver::new(identity, Arc::clone(&medium)),
        ClassifierGateway::http(config.classifier.endpoint.clone()),
        insights,
        EngineOptions {
            force_mode,
            mirror_full_reads: config.engine.mirror_full_reads,
        },
    );

    let demo = DemoSession::new(
        DemoCredentials {
            username: config.demo.username.clone(),
            password: config.demo.password.clone(),
        },
        local.clone(),
    );

    Ok(App {
        engine,
        local,
        remote,
        demo,
    })
}

async fn run(command: Command, app: &App) -> Result<()> {
    match command {
        Command::New {
            title,
            mood,
            tags,
            content,
            date,
        } => {
            let content = match content {
                Some(content) => content,
                None => read_stdin()?,
            };
            let served = app
                .engine
                .create(NewEntry {
                    title,
                    content,
                    mood,
                    tags,
                    date,
                })
                .await?;
            print_json(&served)
        }
        Command::List { limit, from, to } => {
            let range = match (from, to) {
                (Some(start), Some(end)) => Some(DateRange { start, end }),
                _ => None,
            };
            let served = app.engine.list(ListQuery { limit, range }).await?;
            print_json(&served)
        }
        Command::Show { id } => print_json(&app.engine.get(&id).await?),
        Command::Edit {
            id,
            title,
            content,
            mood,
            tags,
            date,
        } => {
            let patch = EntryPatch {
                title,
                content,
                mood,
                tags: (!tags.is_empty()).then_some(tags),
                date,
                ..EntryPatch::default()
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to change: pass at least one field");
            }
            print_json(&app.engine.update(&id, patch).await?)
        }
        Command::Delete { id } => print_json(&app.engine.delete(&id).await?),
        Command::Insights { id } => print_json(&app.engine.generate_insights(&id).await?),
        Command::Sync => {
            let synced = app.engine.sync_remote_to_local().await;
            print_json(&serde_json::json!({ "synced": synced }))?;
            if !synced {
                anyhow::bail!("sync did not complete");
            }
            Ok(())
        }
        Command::Mode { mode } => {
            let mode = mode.force_mode();
            ForceMode::store(app.local.medium().as_ref(), mode).await?;
            print_json(&serde_json::json!({
                "force_mode": mode.map(|m| m.as_str()).unwrap_or("auto")
            }))
        }
        Command::Login { username, password } => {
            let cookie = app.demo.sign_in(&username, &password).await?;
            print_json(&serde_json::json!({ "set_cookie": cookie }))
        }
        Command::Logout => {
            let cookie = app.demo.sign_out().await?;
            print_json(&serde_json::json!({ "set_cookie": cookie }))
        }
        Command::Whoami => {
            let principal = app.engine.principal().await;
            print_json(&serde_json::json!({
                "principal": principal,
                "local_preferred": principal.is_local_preferred(),
                "force_mode": app.engine.options().force_mode.map(|m| m.as_str()),
            }))
        }
        Command::Check => match app.remote.ping().await {
            Ok(()) => print_json(&serde_json::json!({ "remote": "ok" })),
            Err(err) => {
                print_json(&serde_json::json!({ "remote": err.to_string() }))?;
                anyhow::bail!("remote store unreachable")
            }
        },
    }
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read entry content from stdin")?;
    Ok(buf.trim_end().to_owned())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
