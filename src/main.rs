use std::io::IsTerminal;

use anyhow::{Context, Result};
use chrono::Local;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use logsink::config::{Level, SinkConfig};
use logsink::format::Record;
use logsink::logging::{EmitOutcome, LogSink, RotationOutcome};
use logsink::shutdown::{self, SharedSink};
use logsink::size::format_size;
use logsink::{diagnostics, SinkError};

const ENV_HELP: &str = "\
Configured through LOG_LEVEL, LOG_FILE, LOG_ROTATION, LOG_ROTATION_TYPE,
LOG_MAX_SIZE, LOG_KEEP_DAYS, LOG_BUFFER_SIZE and LOG_JSON.";

/// Leveled logging for scripts, with buffered writes and log file rotation
#[derive(Debug, Parser)]
#[command(name = "logsink", version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true, after_help = ENV_HELP)]
struct Cli {
    /// Name of the script or process, shown in every record
    #[arg(long, global = true, env = "LOG_NAME", default_value = "script")]
    name: String,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    emit: EmitArgs,
}

#[derive(Debug, Args)]
struct EmitArgs {
    /// Record level: 0-4 or DEBUG, INFO, WARN, ERROR, FATAL
    #[arg(long, default_value = "info")]
    level: Level,

    /// Message to log, or `-` to log each line of stdin
    message: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rotate the active log file now
    Rotate,
    /// Show rotation settings and the state of the log files
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
}

/// What the invocation asks for
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Emit { level: Level, message: String },
    Stdin { level: Level },
    Rotate,
    Status { json: bool },
}

impl Cli {
    /// Without a message, piped stdin is logged line by line. None means there is
    /// nothing to log.
    fn action(&self, stdin_is_terminal: bool) -> Option<Action> {
        match &self.command {
            Some(Command::Rotate) => return Some(Action::Rotate),
            Some(Command::Status { json }) => return Some(Action::Status { json: *json }),
            None => {}
        }

        let level = self.emit.level;
        match self.emit.message.as_slice() {
            [] if stdin_is_terminal => None,
            [] => Some(Action::Stdin { level }),
            [word] if word == "-" => Some(Action::Stdin { level }),
            words => Some(Action::Emit {
                level,
                message: words.join(" "),
            }),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Done,
    /// A FATAL record was written and flushed
    Fatal,
}

/// 1 on any error or after a FATAL record, 0 otherwise
fn exit_code(result: &Result<Completion>) -> i32 {
    match result {
        Ok(Completion::Done) => 0,
        Ok(Completion::Fatal) | Err(_) => 1,
    }
}

fn open_sink<F>(name: &str, lookup: F) -> Result<LogSink>
where
    F: Fn(&str) -> Option<String>,
{
    let config = SinkConfig::from_env(name, lookup).context("Invalid logging configuration")?;
    LogSink::new(config).context("Failed to open log sink")
}

/// Render and emit one message, echoing it to stderr
fn emit(sink: &mut LogSink, level: Level, message: &str) -> EmitOutcome {
    let config = sink.config();
    let record = Record::new(Local::now(), level, &config.name, message);
    let line = record.render(config.json);
    let outcome = sink.emit(level, line.clone());
    if outcome != EmitOutcome::Filtered && outcome != EmitOutcome::Dropped {
        eprintln!("{}", line);
    }
    outcome
}

fn emit_once(sink: &mut LogSink, level: Level, message: &str) -> Result<Completion> {
    if emit(sink, level, message) == EmitOutcome::Fatal {
        return Ok(Completion::Fatal);
    }
    sink.shutdown().context("Failed to flush log file")?;
    Ok(Completion::Done)
}

async fn run_stdin(sink: SharedSink, level: Level) -> Result<Completion> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let termination = shutdown::wait_for_termination();
    tokio::pin!(termination);

    let completion = loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break Completion::Done;
                };
                let outcome = {
                    let mut guard = sink.lock().map_err(|_| anyhow::anyhow!("log sink lock poisoned"))?;
                    emit(&mut guard, level, &line)
                };
                if outcome == EmitOutcome::Fatal {
                    break Completion::Fatal;
                }
            }
            signal = &mut termination => {
                let signal = signal.context("Failed to listen for termination signals")?;
                tracing::debug!(?signal, "Termination signal received, flushing");
                break Completion::Done;
            }
        }
    };

    shutdown::finalize(&sink);
    Ok(completion)
}

fn print_rotation(outcome: Result<RotationOutcome, SinkError>) -> Result<()> {
    match outcome {
        Ok(RotationOutcome::Rotated { path, bytes }) => {
            println!("Rotated {} to {}", format_size(bytes), path.display());
        }
        Ok(RotationOutcome::NothingToRotate) => println!("Nothing to rotate"),
        Ok(RotationOutcome::AlreadyRotated { path }) => {
            println!("Already rotated: {}", path.display());
        }
        Ok(RotationOutcome::NoLongerDue) => println!("Rotation no longer due"),
        Err(e) if e.is_lock_unavailable() => {
            println!("Rotation already in progress elsewhere, skipped");
        }
        Err(e) => return Err(e).context("Rotation failed"),
    }
    Ok(())
}

fn print_status(sink: &LogSink, json: bool) -> Result<()> {
    let status = sink.status();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).context("Failed to serialize status")?
        );
        return Ok(());
    }

    let file = sink
        .active_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(disabled)".to_string());
    println!("Log file:      {}", file);
    println!(
        "Rotation:      {} ({})",
        if status.enabled { "enabled" } else { "disabled" },
        status.strategy
    );
    println!("Max size:      {}", format_size(status.max_size));
    println!("Keep days:     {}", status.keep_days);
    println!("Current size:  {}", format_size(status.current_size));
    println!("Rotated files: {}", status.rotated_count);
    Ok(())
}

async fn run(action: Action, mut sink: LogSink) -> Result<Completion> {
    match action {
        Action::Emit { level, message } => emit_once(&mut sink, level, &message),
        Action::Stdin { level } => run_stdin(shutdown::share(sink), level).await,
        Action::Rotate => {
            print_rotation(sink.rotate_now())?;
            Ok(Completion::Done)
        }
        Action::Status { json } => {
            print_status(&sink, json)?;
            Ok(Completion::Done)
        }
    }
}

#[tokio::main]
async fn main() {
    diagnostics::init_diagnostics();

    let cli = Cli::parse();
    let Some(action) = cli.action(std::io::stdin().is_terminal()) else {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "nothing to log: pass a message, `-`, or pipe lines on stdin",
            )
            .exit();
    };

    let result = match open_sink(&cli.name, |k| std::env::var(k).ok()) {
        Ok(sink) => run(action, sink).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    // Dropping the runtime would wait on a blocked stdin read
    std::process::exit(exit_code(&result));
}
