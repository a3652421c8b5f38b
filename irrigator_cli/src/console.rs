//! Operator console on stdin.
//!
//! One command per line: `tare`, `cal`, `start`, `status`, `quit`. End of
//! input only stops the console; the loop keeps running.

use std::io::BufRead;

use crossbeam_channel as xch;
use irrigator_core::Ingestion;
use irrigator_core::runner::OperatorCommand;
use irrigator_traits::Relay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Operator(OperatorCommand),
    Status,
}

pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let cmd = match line.trim().to_ascii_lowercase().as_str() {
        "tare" => ConsoleCommand::Operator(OperatorCommand::Tare),
        "cal" | "calibrate" => ConsoleCommand::Operator(OperatorCommand::Cal),
        "start" => ConsoleCommand::Operator(OperatorCommand::StartManual),
        "quit" | "exit" => ConsoleCommand::Operator(OperatorCommand::Quit),
        "status" => ConsoleCommand::Status,
        _ => return None,
    };
    Some(cmd)
}

/// Detached: a blocked stdin read cannot be interrupted.
pub fn spawn<R>(ops: xch::Sender<OperatorCommand>, ingestion: Ingestion<R>)
where
    R: Relay + Send + 'static,
{
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Some(ConsoleCommand::Operator(cmd)) => {
                    if ops.send(cmd).is_err() {
                        break;
                    }
                }
                Some(ConsoleCommand::Status) => match ingestion.lock() {
                    Ok(controller) => println!("{}", controller.snapshot()),
                    Err(e) => tracing::warn!(error = %e, "status unavailable"),
                },
                None => eprintln!("unknown command {line:?}; expected tare|cal|start|status|quit"),
            }
        }
        tracing::debug!("console input closed");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_console_commands() {
        assert_eq!(
            parse_command(" START\n"),
            Some(ConsoleCommand::Operator(OperatorCommand::StartManual))
        );
        assert_eq!(parse_command("status"), Some(ConsoleCommand::Status));
        assert_eq!(
            parse_command("calibrate"),
            Some(ConsoleCommand::Operator(OperatorCommand::Cal))
        );
        assert_eq!(parse_command("irrigate now"), None);
    }
}
