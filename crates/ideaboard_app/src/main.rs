mod settings;
mod session;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ideaboard_core::{IdeaSubmission, Phase, DEFAULT_INVOKE_PERSONAS};
use ideaboard_engine::{
    new_thread_id, CredentialProvider, FileStore, HttpJobClient, IdeaReader, LocalStore,
    ReqwestSubscriber, RunCreator, StoreCredentials, SubscribeSettings, Tracker, TrackerDeps,
    ACTIVE_THREAD_KEY, AUTH_TOKEN_KEY,
};
use tokio_util::sync::CancellationToken;
use tracker_logging::{tracker_info, tracker_warn};

use crate::session::{load_session, save_session, SessionSnapshot};
use crate::settings::{Settings, TransportKind};
use crate::terminal::{
    load_record, render_idea_list, render_record, TerminalNavigator, TerminalStatusSink,
};

#[derive(Parser, Debug)]
#[command(name = "ideaboard", version, about = "Submit startup ideas and follow persona generation")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "ideaboard.toml", env = "IDEABOARD_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store the bearer token used for the proxy
    Login {
        #[arg(long)]
        token: String,
    },
    /// Submit an idea for persona feedback
    Submit {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long = "audience")]
        target_audience: String,
        #[arg(long)]
        mvp_link: Option<String>,
        /// Personas to request from the invoke endpoint
        #[arg(long, default_value_t = DEFAULT_INVOKE_PERSONAS)]
        personas: u32,
        /// Track progress until the job settles
        #[arg(short, long)]
        follow: bool,
    },
    /// Track an existing job
    Track { job_id: String },
    /// Track the job this machine submitted last
    Resume,
    /// Show a job's result, refreshed from the ideas API when reachable
    Show { job_id: String },
    /// List submitted ideas with their status
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;

    tracker_logging::initialize(
        settings.log_destination()?,
        settings.log_level()?,
        &settings.logging.file,
    );

    let store: Arc<dyn LocalStore> = Arc::new(
        FileStore::open(settings.store.dir.clone())
            .with_context(|| format!("store directory {}", settings.store.dir.display()))?,
    );

    match cli.command {
        Command::Login { token } => {
            let token = token.trim();
            if token.is_empty() {
                bail!("token must not be empty");
            }
            store.set(AUTH_TOKEN_KEY, token)?;
            println!("Signed in.");
            Ok(())
        }
        Command::Submit {
            title,
            description,
            target_audience,
            mvp_link,
            personas,
            follow,
        } => {
            let submission = IdeaSubmission {
                title,
                description,
                target_audience,
                mvp_link,
                persona_count: personas,
            };
            let job_id = submit(&settings, &store, submission).await?;
            println!("Submitted idea as {job_id}");
            if follow {
                track(&settings, store, &job_id).await
            } else {
                Ok(())
            }
        }
        Command::Track { job_id } => track(&settings, store, &job_id).await,
        Command::Resume => {
            let Some(job_id) = store.get(ACTIVE_THREAD_KEY)? else {
                bail!("no job in progress");
            };
            track(&settings, store, job_id.trim()).await
        }
        Command::Show { job_id } => show(&settings, store, &job_id).await,
        Command::List { page, limit } => {
            let credential = StoreCredentials::new(store.clone()).credential();
            let client = HttpJobClient::new(settings.client_settings());
            let listing = client
                .list_ideas(page, limit, credential.as_deref())
                .await
                .context("listing ideas")?;
            let active = store.get(ACTIVE_THREAD_KEY).ok().flatten();
            print!(
                "{}",
                render_idea_list(&listing, active.as_deref().map(str::trim))
            );
            Ok(())
        }
    }
}

/// Prints the cached record, then the stored idea if it differs from the cache.
async fn show(settings: &Settings, store: Arc<dyn LocalStore>, job_id: &str) -> Result<()> {
    let cached = load_record(store.as_ref(), job_id);
    if let Some(record) = &cached {
        print!("{}", render_record(record));
    }

    let credential = StoreCredentials::new(store.clone()).credential();
    let client = HttpJobClient::new(settings.client_settings());
    match client.get_idea(job_id, credential.as_deref()).await {
        Ok(record) if cached.as_ref() == Some(&record) => Ok(()),
        Ok(record) => {
            if cached.is_some() {
                println!();
                println!("Updated from server:");
            }
            print!("{}", render_record(&record));
            Ok(())
        }
        Err(err) if cached.is_some() => {
            tracker_warn!("Could not refresh {} from the ideas API: {}", job_id, err);
            Ok(())
        }
        Err(err) => bail!("no cached result for {job_id} and the ideas API failed: {err}"),
    }
}

/// Starts a job and marks it active. Returns the thread id.
async fn submit(
    settings: &Settings,
    store: &Arc<dyn LocalStore>,
    submission: IdeaSubmission,
) -> Result<String> {
    let thread_id = new_thread_id();
    if settings.tracker.transport == TransportKind::Stream {
        let credential = StoreCredentials::new(store.clone()).credential();
        if credential.is_none() {
            bail!("not signed in; run `ideaboard login --token <token>` first");
        }
        let client = HttpJobClient::new(settings.client_settings());
        client
            .create_run(&thread_id, &submission, credential.as_deref())
            .await?;
    }

    store.set(ACTIVE_THREAD_KEY, &thread_id)?;
    save_session(
        store.as_ref(),
        &SessionSnapshot {
            active_thread: thread_id.clone(),
            transport: settings.tracker.transport,
            submission,
            started_at: Utc::now(),
        },
    );
    tracker_info!("Job {} is now active", thread_id);
    Ok(thread_id)
}

async fn track(settings: &Settings, store: Arc<dyn LocalStore>, job_id: &str) -> Result<()> {
    // A job submitted from this machine is tracked the way it was submitted.
    let mut settings = settings.clone();
    let mut submission = None;
    if let Some(session) = load_session(store.as_ref()) {
        if let Some(found) = session.submission_for(job_id) {
            settings.tracker.transport = session.transport;
            submission = Some(found.clone());
        }
    }
    let config = settings.tracker_config(submission)?;

    let client = Arc::new(HttpJobClient::new(settings.client_settings()));
    let deps = TrackerDeps {
        subscriber: Arc::new(ReqwestSubscriber::new(SubscribeSettings {
            connect_timeout: client.settings().connect_timeout,
        })),
        invoker: client,
        store: store.clone(),
        credentials: Arc::new(StoreCredentials::new(store.clone())),
        navigator: Arc::new(TerminalNavigator::new(job_id, store)),
        status_sink: Arc::new(TerminalStatusSink),
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracker_warn!("Interrupted; stopping tracker");
            interrupt.cancel();
        }
    });

    let status = Tracker::new(job_id, config, deps).run(cancel).await;
    match status.phase() {
        Phase::Completed => Ok(()),
        Phase::Failed => bail!("job {job_id} failed: {}", status.message()),
        Phase::Pending | Phase::Generating => {
            println!("Stopped tracking {job_id} ({status}); run `ideaboard resume` to continue.");
            Ok(())
        }
    }
}
