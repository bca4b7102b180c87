//! Operator console
//!
//! Reads commands from stdin on its own thread and forwards them to the
//! controller loop. Stop and jump ask for confirmation first. Status is
//! answered directly from the published snapshot.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::thread;

use embassy_time::Instant;
use log::warn;

use cryo_core::traits::Sensor;

use crate::channels::Command;
use crate::context::{RunContext, StatusSnapshot};

const HELP: &str = "\
commands:
  start   start a cooldown run (or arm the scheduled start)
  stop    stop the run and de-energize both channels
  jump    skip the rest of stage 1 and start stage 2
  status  show stage and latest temperatures
  reload  re-read the settings file
  help    show this list
  quit    stop and exit";

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// Forward as-is
    Command(Command),
    /// Forward after a yes/no confirmation
    Confirm(Command),
    Status,
    Help,
    Empty,
    Unknown(String),
}

/// Parse one line of operator input
pub fn parse_line(line: &str) -> ConsoleInput {
    let word = line.trim().to_ascii_lowercase();
    match word.as_str() {
        "" => ConsoleInput::Empty,
        "start" => ConsoleInput::Command(Command::Start),
        "stop" => ConsoleInput::Confirm(Command::Stop),
        "jump" => ConsoleInput::Confirm(Command::JumpToStage2),
        "reload" => ConsoleInput::Command(Command::Reload),
        "quit" | "exit" => ConsoleInput::Command(Command::Quit),
        "status" => ConsoleInput::Status,
        "help" | "?" => ConsoleInput::Help,
        _ => ConsoleInput::Unknown(word),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn confirmation_prompt(command: Command) -> &'static str {
    match command {
        Command::Stop => "Stop the cooldown and de-energize both channels? [y/N] ",
        Command::JumpToStage2 => "Skip the rest of stage 1 and start stage 2? [y/N] ",
        _ => "Are you sure? [y/N] ",
    }
}

/// Render a status snapshot
pub fn format_status(status: &StatusSnapshot, now: Instant) -> String {
    let mut out = String::new();

    let _ = write!(out, "stage: {}", status.state);
    if !status.run_active {
        out.push_str(" (no run active)");
    }

    if let Some(at) = status.scheduled_for {
        let remaining = if at > now { (at - now).as_secs() } else { 0 };
        let _ = write!(out, "\nscheduled start in {} s", remaining);
    }

    match &status.latest {
        Some(sample) => {
            let _ = write!(out, "\nelapsed: {:.0} s", sample.elapsed_ms as f64 / 1000.0);
            for sensor in Sensor::ALL {
                let _ = write!(out, "\n  {:<12} {:>9.3} K", sensor.label(), sample.kelvin(sensor));
            }
        }
        None => out.push_str("\nno sample yet"),
    }

    out
}

fn send(ctx: &RunContext, command: Command) {
    if ctx.commands.try_send(command).is_err() {
        warn!("Command queue full, {:?} dropped", command);
    }
}

/// Console read loop
///
/// Returns on `quit` or end of input; both send [`Command::Quit`].
pub fn run<R: BufRead, W: Write>(ctx: &RunContext, mut input: R, mut output: W) -> io::Result<()> {
    writeln!(output, "type 'help' for commands")?;

    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            send(ctx, Command::Quit);
            return Ok(());
        }

        match parse_line(&line) {
            ConsoleInput::Command(command) => {
                send(ctx, command);
                if command == Command::Quit {
                    return Ok(());
                }
            }
            ConsoleInput::Confirm(command) => {
                write!(output, "{}", confirmation_prompt(command))?;
                output.flush()?;
                line.clear();
                input.read_line(&mut line)?;
                if is_yes(&line) {
                    send(ctx, command);
                } else {
                    writeln!(output, "cancelled")?;
                }
            }
            ConsoleInput::Status => {
                writeln!(output, "{}", format_status(&ctx.status(), Instant::now()))?;
            }
            ConsoleInput::Help => writeln!(output, "{}", HELP)?,
            ConsoleInput::Empty => {}
            ConsoleInput::Unknown(word) => {
                writeln!(output, "unknown command '{}', type 'help'", word)?;
            }
        }
    }
}

/// Start the console on its own thread
pub fn spawn(ctx: &'static RunContext) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            let stdin = io::stdin();
            if let Err(e) = run(ctx, stdin.lock(), io::stdout()) {
                warn!("Console stopped: {}", e);
                send(ctx, Command::Quit);
            }
        })
}
