mod commands;
mod render;

use std::fmt;
use std::sync::Arc;

use case_core::Clock;
use case_core::model::CaseId;
use services::{
    Advance, AuthorityConfig, CaseSession, HttpCaseAuthority, IdlePolicy, SessionPhase,
    SubmitOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use commands::{HELP, Input};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingCaseId,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingCaseId => write!(f, "a case id is required (--case or CASESIM_CASE_ID)"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- --case <id> [--api <url>] [--token <token>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --api {}", services::config::DEFAULT_API_URL);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CASESIM_CASE_ID, CASESIM_API_URL, CASESIM_TOKEN, RUST_LOG");
}

struct Args {
    case_id: CaseId,
    authority: AuthorityConfig,
}

impl Args {
    /// Flags win over environment variables.
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut authority = AuthorityConfig::from_env();
        let mut case_id = std::env::var("CASESIM_CASE_ID")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(|value| CaseId::new(value.trim()));

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--case" => case_id = Some(CaseId::new(require_value(args, "--case")?.trim())),
                "--api" => authority.base_url = require_value(args, "--api")?,
                "--token" => authority = authority.with_token(require_value(args, "--token")?),
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let case_id = case_id.ok_or(ArgsError::MissingCaseId)?;
        Ok(Some(Self {
            case_id,
            authority,
        }))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Apply one line of input. Returns `false` when the learner quits.
async fn handle(session: &mut CaseSession, input: Input) -> bool {
    match input {
        Input::Answer(option) => match session.submit_answer(&option).await {
            SubmitOutcome::Ignored => println!("No answer can be submitted here."),
            SubmitOutcome::Incorrect => println!("Not quite."),
            SubmitOutcome::Correct => println!("Correct."),
            SubmitOutcome::Finished => {}
        },
        Input::Next => match session.advance() {
            Ok(Advance::Moved { .. }) => {}
            Ok(Advance::Finished(_)) => return false,
            Err(err) => println!("{err}"),
        },
        Input::Back => {
            if let Err(err) = session.go_back() {
                println!("{err}");
            }
        }
        Input::Goto(index) => {
            session.select_step(index);
        }
        Input::Retry => {
            if let Err(err) = session.retry() {
                println!("{err}");
            }
        }
        Input::CloseHint => session.dismiss_hint(),
        Input::Help => {
            println!("{HELP}");
            return true;
        }
        Input::Quit => return false,
        Input::Status | Input::Nothing => {}
        Input::Unknown(raw) => {
            println!("Unknown command: {raw} (? for help)");
            return true;
        }
    }
    println!("{}", render::screen(session));
    true
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let parsed = match Args::parse(&mut argv) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return Err(err.into());
        }
    };

    init_tracing();

    info!(case_id = %parsed.case_id, api = %parsed.authority.base_url, "starting case session");
    let authority = HttpCaseAuthority::new(parsed.authority)?;
    let (mut session, mut idle) =
        CaseSession::new(Arc::new(authority), Clock::System, IdlePolicy::default());

    if session.load_case(&parsed.case_id).await.is_err() {
        println!("{}", render::screen(&session));
        return Ok(());
    }
    println!("{}", render::screen(&session));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(signal) = idle.recv() => {
                if session.on_idle_fired(signal).await {
                    println!("{}", render::screen(&session));
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed");
                    break;
                };
                session.notify_activity();
                if !handle(&mut session, Input::parse(&line)).await {
                    break;
                }
                if *session.phase() == SessionPhase::Completed {
                    println!("Press n to finish.");
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
