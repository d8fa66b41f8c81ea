use std::{
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast,
};

use vetta::{
    db::{CandidateQuery, Database, SortField, SortOrder},
    models::CandidateProfile,
    resume,
    session::{InterviewState, SessionController, SessionEvent},
};

#[derive(Parser)]
#[command(name = "vetta", version, about = "Timed interview screening sessions")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, default_value = "vetta.sqlite3")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a timed interview session in the terminal
    Interview {
        /// Resume file (PDF or DOCX) to prefill candidate details from
        #[arg(long)]
        resume: Option<PathBuf>,
    },
    /// List completed interviews
    List {
        /// Substring matched against candidate name and email
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = SortArg::Date)]
        sort: SortArg,
        #[arg(long, value_enum, default_value_t = OrderArg::Desc)]
        order: OrderArg,
    },
    /// Delete a completed interview by session id
    Delete { session_id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Score,
    Date,
}

impl From<SortArg> for SortField {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => SortField::Name,
            SortArg::Score => SortField::Score,
            SortArg::Date => SortField::CompletedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Asc => SortOrder::Asc,
            OrderArg::Desc => SortOrder::Desc,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let db = Database::new(cli.db.clone())?;

    match cli.command {
        Command::Interview { resume } => run_interview(db, resume).await,
        Command::List {
            search,
            sort,
            order,
        } => list_candidates(&db, search, sort, order).await,
        Command::Delete { session_id } => {
            if db.delete_candidate(&session_id).await? {
                println!("Deleted {session_id}.");
            } else {
                println!("No record found for {session_id}.");
            }
            Ok(())
        }
    }
}

async fn run_interview(db: Database, resume_path: Option<PathBuf>) -> Result<()> {
    let controller = SessionController::new(db.clone());

    // A session that was mid-interview at shutdown gets an explicit
    // resume-or-restart choice; a stale countdown never continues silently.
    if let Some(stored) = db.load_session_snapshot().await? {
        if stored.was_active {
            println!(
                "An interview for {} was interrupted at question {} with {}s remaining.",
                display_name(&stored.state),
                stored.state.current_index + 1,
                stored.state.time_remaining
            );
            if prompt_yes_no("Resume it?")? {
                controller.resume_from_snapshot(stored.state).await?;
            } else {
                db.clear_session_snapshot().await?;
            }
        }
    }

    if !controller.get_state().await.is_started {
        let mut profile = CandidateProfile::default();
        if let Some(path) = resume_path {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            match resume::parse(&bytes, mime_for_path(&path)) {
                Ok(parsed) => profile = parsed,
                Err(err) => println!("{err}"),
            }
        }

        if profile.name.is_empty() {
            profile.name = prompt_line("Candidate name: ")?;
        }
        if profile.email.is_empty() {
            profile.email = prompt_line("Email: ")?;
        }
        if profile.phone.is_empty() {
            profile.phone = prompt_line("Phone: ")?;
        }

        controller
            .set_candidate_info(
                Some(profile.name),
                Some(profile.email),
                Some(profile.phone),
                Some(profile.resume_text),
            )
            .await;
        controller.start_interview().await?;
    }

    drive_session(&controller).await
}

async fn drive_session(controller: &SessionController) -> Result<()> {
    let mut events = controller.subscribe();
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    print_question(&controller.get_state().await);
    println!("(type your answer and press Enter; /pause, /resume, /quit)");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::CountdownTick { time_remaining, .. }) => {
                    if time_remaining <= 5 || time_remaining % 15 == 0 {
                        println!("  {time_remaining}s remaining");
                    }
                }
                Ok(SessionEvent::QuestionAdvanced { .. }) => {
                    print_question(&controller.get_state().await);
                }
                Ok(SessionEvent::SessionCompleted { record, .. }) => {
                    println!();
                    println!("Interview complete. Score: {}/100", record.total_score);
                    println!("{}", record.summary);
                    break;
                }
                Ok(SessionEvent::StateChanged { .. }) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Dropped {skipped} session events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            line = lines.next_line() => match line? {
                Some(text) => match text.trim() {
                    "/pause" => {
                        controller.pause().await;
                        println!("Paused.");
                    }
                    "/resume" => {
                        controller.resume().await;
                        println!("Resumed.");
                    }
                    "/quit" => {
                        controller.reset().await?;
                        println!("Session discarded.");
                        break;
                    }
                    _ => {
                        controller.submit_answer(text).await?;
                    }
                },
                None => break,
            },
        }
    }

    Ok(())
}

async fn list_candidates(
    db: &Database,
    search: Option<String>,
    sort: SortArg,
    order: OrderArg,
) -> Result<()> {
    let records = db
        .list_candidates(CandidateQuery {
            search,
            sort_by: sort.into(),
            order: order.into(),
        })
        .await?;

    if records.is_empty() {
        println!("No completed interviews.");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {:>3}/100  {}  {} <{}>",
            record.completed_at.format("%Y-%m-%d %H:%M"),
            record.total_score,
            record.id,
            record.name,
            record.email
        );
    }
    Ok(())
}

fn print_question(state: &InterviewState) {
    if let Some(question) = state.current_question() {
        println!();
        println!(
            "Question {}/{} [{}] ({}s): {}",
            state.current_index + 1,
            state.questions.len(),
            question.difficulty.as_str(),
            question.time_limit_secs,
            question.text
        );
    }
}

fn display_name(state: &InterviewState) -> String {
    if state.profile.name.is_empty() {
        state.session_id.clone()
    } else {
        state.profile.name.clone()
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => resume::PDF_MIME,
        Some("docx") => resume::DOCX_MIME,
        _ => "application/octet-stream",
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_yes_no(prompt: &str) -> Result<bool> {
    let line = prompt_line(&format!("{prompt} [y/N] "))?;
    Ok(matches!(line.as_str(), "y" | "Y" | "yes" | "Yes"))
}
