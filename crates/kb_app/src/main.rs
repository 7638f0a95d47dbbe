//! `kb`: upload PDFs to the knowledge base and chat against it from a terminal.
//!
//! ```bash
//! kb upload manuals/*.pdf --all
//! kb history --query loans
//! kb new-session "Deposits"
//! kb ask <session_id> "What is an arrangement?"
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use kb_app::config::{ClientConfig, LogTarget};
use kb_app::{intake, render, UploadApp};
use kb_core::{ChatMessage, Msg, StatusFilter, UploadStatus};
use kb_engine::{ApiError, BackendClient, EngineHandle};
use kb_logging::{kb_error, kb_info, kb_warn};

#[derive(Parser)]
#[command(name = "kb", version, about = "Knowledge-base ingestion and chat client")]
struct Cli {
    /// RON config file. Defaults to ./kb_client.ron when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL; overrides the config file and KB_API_BASE_URL.
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    /// Where log output goes; overrides the config file.
    #[arg(long, global = true, value_enum)]
    log: Option<LogArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LogArg {
    File,
    Terminal,
    Both,
}

impl From<LogArg> for LogTarget {
    fn from(arg: LogArg) -> Self {
        match arg {
            LogArg::File => LogTarget::File,
            LogArg::Terminal => LogTarget::Terminal,
            LogArg::Both => LogTarget::Both,
        }
    }
}

#[derive(clap::Args)]
struct ViewArgs {
    /// Only show items whose name contains this text.
    #[arg(long, default_value = "")]
    query: String,

    /// `all`, `pending`, `uploading`, `processing`, `completed` or `error`.
    #[arg(long, default_value = "all")]
    status: StatusFilter,

    /// Show every matching row instead of the first two.
    #[arg(long)]
    all: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Upload PDF files and wait for them to be ingested.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Rounds of retrying failed uploads.
        #[arg(long, default_value_t = 0)]
        retries: u32,

        /// Seconds to wait for uploads before giving up.
        #[arg(long, default_value_t = 300)]
        wait_secs: u64,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// List previously ingested documents.
    History {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// List chat sessions.
    Sessions,
    /// Print the messages of a session.
    Chat {
        session_id: String,

        /// Print every evidence source in full.
        #[arg(long)]
        details: bool,
    },
    /// Ask a question in a session.
    Ask {
        session_id: String,
        question: String,

        /// Print every evidence source in full.
        #[arg(long)]
        details: bool,
    },
    /// Start a new chat session.
    NewSession {
        #[arg(default_value = "")]
        title: String,
    },
    /// Rename a chat session.
    Rename { session_id: String, title: String },
    /// Delete a chat session.
    Delete { session_id: String },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load(cli.config.as_deref())?.with_env_overrides(cli.api_base_url);
    if let Some(log) = cli.log {
        config.log_destination = log.into();
    }
    kb_logging::initialize(config.log_destination.into(), config.log_level()?);
    if let Some(path) = config.loaded_from() {
        kb_info!("Loaded client config from {:?}", path);
    }
    let engine_config = config.engine_config()?;
    kb_info!("Using backend {}", engine_config.api.base_url);

    match cli.command {
        Command::Upload {
            paths,
            retries,
            wait_secs,
            view,
        } => {
            let engine = EngineHandle::new(engine_config).context("starting upload engine")?;
            run_upload(engine, &paths, retries, Duration::from_secs(wait_secs), view)
        }
        Command::History { view } => {
            let engine = EngineHandle::new(engine_config).context("starting upload engine")?;
            let mut app = UploadApp::new(engine);
            apply_view_args(&mut app, view);
            app.dispatch(Msg::Started);
            app.run_until_settled(Duration::from_secs(60), |_| {});
            print_lines(render::render(&app.view()));
            Ok(ExitCode::SUCCESS)
        }
        command => {
            let client = BackendClient::new(engine_config.api).context("building HTTP client")?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("starting async runtime")?;
            runtime.block_on(run_session_command(&client, command))
        }
    }
}

fn run_upload(
    engine: EngineHandle,
    paths: &[PathBuf],
    retries: u32,
    max_wait: Duration,
    view: ViewArgs,
) -> Result<ExitCode> {
    let mut app = UploadApp::new(engine);
    apply_view_args(&mut app, view);
    app.dispatch(Msg::Started);

    app.dispatch(Msg::FilesSelected(intake::read_files(paths)));
    let staged = app.state().in_flight().count();
    if staged < paths.len() {
        kb_warn!("Skipped {} of {} path(s)", paths.len() - staged, paths.len());
    }
    app.dispatch(Msg::UploadAllClicked);

    let mut settled = app.run_until_settled(max_wait, print_progress);
    for round in 1..=retries {
        if !settled || failed_count(&app) == 0 {
            break;
        }
        kb_info!("Retrying failed uploads (round {})", round);
        app.dispatch(Msg::RetryFailedClicked);
        settled = app.run_until_settled(max_wait, print_progress);
    }

    print_lines(render::render(&app.view()));
    if !settled {
        eprintln!("Some uploads were still in flight when the wait ended.");
        return Ok(ExitCode::FAILURE);
    }
    Ok(if failed_count(&app) == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn apply_view_args(app: &mut UploadApp, view: ViewArgs) {
    app.dispatch(Msg::SearchChanged(view.query));
    app.dispatch(Msg::StatusFilterChanged(view.status));
    if view.all {
        app.dispatch(Msg::ShowAllToggled);
    }
}

fn failed_count(app: &UploadApp) -> usize {
    app.state()
        .in_flight()
        .filter(|item| item.status == UploadStatus::Error)
        .count()
}

fn print_progress(view: &kb_core::AppViewModel) {
    if view.unsettled_count > 0 {
        eprintln!("{} upload(s) in progress...", view.unsettled_count);
    }
}

async fn run_session_command(client: &BackendClient, command: Command) -> Result<ExitCode> {
    let now = Utc::now();
    let outcome = match command {
        Command::Sessions => client.list_sessions().await.map(|sessions| {
            if sessions.is_empty() {
                println!("No conversations yet.");
            }
            for session in &sessions {
                println!("{}", render::format_session_row(session, now));
            }
        }),
        Command::Chat {
            session_id,
            details,
        } => client.chat_history(&session_id).await.map(|messages| {
            for message in &messages {
                print_message(message, details);
            }
        }),
        Command::Ask {
            session_id,
            question,
            details,
        } => {
            print_lines(render::format_message(&ChatMessage::user(question.clone(), now)));
            let reply = match client.ask(&session_id, &question).await {
                Ok(reply) => reply,
                Err(err) => {
                    report(&err, "Failed to send message");
                    ChatMessage::apology(Utc::now())
                }
            };
            print_message(&reply, details);
            Ok(())
        }
        Command::NewSession { title } => client
            .create_session(&title)
            .await
            .map(|session| println!("{}", render::format_session_row(&session, now))),
        Command::Rename { session_id, title } => client
            .rename_session(&session_id, &title)
            .await
            .map(|()| println!("Renamed {session_id}")),
        Command::Delete { session_id } => client
            .delete_session(&session_id)
            .await
            .map(|()| println!("Deleted {session_id}")),
        Command::Upload { .. } | Command::History { .. } => Ok(()),
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            report(&err, "Request failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn report(err: &ApiError, default: &str) {
    if err.is_transport() {
        kb_warn!("Backend unreachable: {}", err);
    } else {
        kb_error!("{}", err);
    }
    eprintln!("{}", err.user_message(default));
}

fn print_message(message: &ChatMessage, details: bool) {
    print_lines(render::format_message(message));
    if details {
        print_lines(render::format_evidence_details(message));
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
