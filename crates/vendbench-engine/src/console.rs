//! Operator commands read from stdin while a run is in progress.

use std::str::FromStr;

use crate::error::EngineError;

/// Usage line logged when a command is not understood.
pub const USAGE: &str = "commands: pause | help <instruction> | turns <n> | status | reset | quit";

/// One operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pause a running simulation, or resume a paused one.
    Pause,
    /// Resume with a natural-language instruction for the next turn.
    Help(String),
    /// Extend the run by this many turns.
    AddTurns(u32),
    /// Log the current state.
    Status,
    /// Discard the run and start a fresh one.
    Reset,
    /// Stop and exit.
    Quit,
}

impl FromStr for Command {
    type Err = EngineError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        match word.to_ascii_lowercase().as_str() {
            "pause" | "resume" => Ok(Self::Pause),
            "help" if rest.is_empty() => Err(EngineError::Console {
                message: "help needs an instruction, e.g. `help restock the chips`".to_owned(),
            }),
            "help" => Ok(Self::Help(rest.to_owned())),
            "turns" => rest
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .map(Self::AddTurns)
                .ok_or_else(|| EngineError::Console {
                    message: format!("turns needs a positive number, got '{rest}'"),
                }),
            "status" => Ok(Self::Status),
            "reset" => Ok(Self::Reset),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(EngineError::Console {
                message: format!("unknown command '{word}'; {USAGE}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        line.parse()
            .unwrap_or_else(|e| panic!("'{line}' should parse: {e}"))
    }

    #[test]
    fn simple_commands_ignore_case_and_padding() {
        assert_eq!(parse("  PAUSE "), Command::Pause);
        assert_eq!(parse("status"), Command::Status);
        assert_eq!(parse("Reset"), Command::Reset);
        assert_eq!(parse("exit"), Command::Quit);
    }

    #[test]
    fn help_keeps_the_instruction_text() {
        assert_eq!(
            parse("help   order 20 Chips from the supplier "),
            Command::Help("order 20 Chips from the supplier".to_owned())
        );
        assert!("help".parse::<Command>().is_err());
    }

    #[test]
    fn turns_requires_a_positive_count() {
        assert_eq!(parse("turns 25"), Command::AddTurns(25));
        assert!("turns 0".parse::<Command>().is_err());
        assert!("turns many".parse::<Command>().is_err());
        assert!("turns".parse::<Command>().is_err());
    }

    #[test]
    fn unknown_commands_are_rejected_with_usage() {
        let Err(err) = "dance".parse::<Command>() else {
            panic!("dance is not a command");
        };
        assert!(err.to_string().contains("unknown command 'dance'"));
        assert!(err.to_string().contains("turns <n>"));
    }
}
