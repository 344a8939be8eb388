use std::io::Write;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::commands::{self, Session};

/// Line reader over stdin that prints a prompt before each line.
pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Next input line, `None` at end of input.
    pub async fn readline(&mut self) -> Result<Option<String>, String> {
        write!(std::io::stdout(), "> ").map_err(|e| e.to_string())?;
        std::io::stdout().flush().map_err(|e| e.to_string())?;
        self.lines.next_line().await.map_err(|e| e.to_string())
    }
}

#[derive(Parser, Debug)]
struct Repl {
    #[command(subcommand)]
    command: Option<ReplCommand>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum ReplCommand {
    /// Switch between hiding and dimming watched cards
    Toggle,
    /// Persist a new watched threshold (0.0 - 1.0)
    Threshold { value: f64 },
    /// Signal a completed in-app navigation
    Navigate,
    /// Show the latest pass report
    Report {
        #[arg(long)]
        json: bool,
    },
    /// Show persisted settings
    Config,
    Exit,
}

fn parse(line: &str) -> Result<Option<ReplCommand>, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "seen".to_string());
    let repl = Repl::try_parse_from(args).map_err(|e| e.to_string())?;
    Ok(repl.command)
}

/// Handle one REPL line. Returns `true` when the session should end.
pub async fn respond(line: &str, session: &Session) -> Result<bool, String> {
    match parse(line)? {
        Some(ReplCommand::Toggle) => session.toggle().await?,
        Some(ReplCommand::Threshold { value }) => session.set_threshold(value).await?,
        Some(ReplCommand::Navigate) => session.navigate()?,
        Some(ReplCommand::Report { json }) => session.report(json)?,
        Some(ReplCommand::Config) => commands::show_config(&session.store).await?,
        Some(ReplCommand::Exit) => return Ok(true),
        None => {}
    }
    Ok(false)
}
