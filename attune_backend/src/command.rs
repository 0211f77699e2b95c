use thiserror::Error;

use crate::database::{MAX_FEEDBACK_SCORE, MIN_FEEDBACK_SCORE};

/// One line of user input, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat(String),
    Feedback { score: u8, text: Option<String> },
    Profile,
    Quit,
    /// Blank line
    Empty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid feedback format. Use 'feedback <1-5> [optional comment]'")]
    InvalidFeedback,
    #[error("Please provide a score between 1 and 5.")]
    ScoreOutOfRange,
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Command::Empty);
    }

    let lowered = trimmed.to_lowercase();
    if matches!(lowered.as_str(), "quit" | "exit" | "bye") {
        return Ok(Command::Quit);
    }
    if lowered == "profile" {
        return Ok(Command::Profile);
    }

    let mut parts = trimmed.splitn(3, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    if !head.eq_ignore_ascii_case("feedback") {
        return Ok(Command::Chat(trimmed.to_string()));
    }

    let score: i64 = parts
        .next()
        .and_then(|raw| raw.parse().ok())
        .ok_or(CommandError::InvalidFeedback)?;
    if score < i64::from(MIN_FEEDBACK_SCORE) || score > i64::from(MAX_FEEDBACK_SCORE) {
        return Err(CommandError::ScoreOutOfRange);
    }
    let text = parts
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok(Command::Feedback {
        score: score as u8,
        text,
    })
}
