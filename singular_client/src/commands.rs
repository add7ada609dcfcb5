use singular::{Color, session::Command};
use std::fmt;

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// `play` without a card number.
    MissingCard,
    /// Card number that is not a positive integer.
    InvalidCard(String),
    /// Wild color that is not one of red, green, yellow, blue.
    InvalidColor(String),
    /// `say` without any text.
    EmptyChat,
    /// `public` with something other than on/off.
    InvalidToggle(String),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCard => write!(f, "Play requires a card number (e.g., 'play 3')"),
            Self::InvalidCard(value) => write!(
                f,
                "Invalid card number '{value}'. Use the number shown next to the card"
            ),
            Self::InvalidColor(value) => write!(
                f,
                "Invalid color '{value}'. Use red, green, yellow or blue"
            ),
            Self::EmptyChat => write!(f, "Nothing to say (e.g., 'say hello')"),
            Self::InvalidToggle(value) => {
                write!(f, "Invalid setting '{value}'. Use 'public on' or 'public off'")
            }
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{cmd}'. Type 'help' to see available commands"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
Commands:
  join                  Ask to join again after being turned away
  start                 Start the game (host)
  draw                  Draw a card
  play N [COLOR]        Play card N of your hand; wild cards need a color
  reset                 Back to the lobby after a game (host)
  public on|off         Show or hide the room in the lobby list (host)
  say TEXT              Chat
  help                  This help
  quit                  Leave";

/// Parse a command string into a session [`Command`].
///
/// Card numbers are 1-based as shown on screen.
///
/// # Examples
///
/// ```
/// use singular::{Color, session::Command};
/// use singular_client::commands::parse_command;
///
/// assert_eq!(parse_command("draw"), Ok(Command::Draw));
/// assert_eq!(parse_command("play 2"), Ok(Command::Play(1)));
/// assert_eq!(parse_command("play 1 blue"), Ok(Command::PlayWild(0, Color::Blue)));
/// ```
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let trimmed = input.trim();

    // Try single-word commands first
    match trimmed {
        "join" => return Ok(Command::Join),
        "start" => return Ok(Command::Start),
        "draw" => return Ok(Command::Draw),
        "reset" => return Ok(Command::Reset),
        _ => {}
    }

    let parts: Vec<&str> = trimmed.split_ascii_whitespace().collect();
    match parts.first() {
        Some(&"play") => parse_play_command(&parts),
        Some(&"public") => parse_public_command(&parts),
        Some(&"say") => {
            let text = trimmed["say".len()..].trim();
            if text.is_empty() {
                Err(ParseError::EmptyChat)
            } else {
                Ok(Command::Chat(text.to_string()))
            }
        }
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

/// Parse a play command: "play N [COLOR]"
fn parse_play_command(parts: &[&str]) -> Result<Command, ParseError> {
    let value = parts.get(1).ok_or(ParseError::MissingCard)?;
    let index = match value.parse::<usize>() {
        Ok(n) if n > 0 => n - 1,
        _ => return Err(ParseError::InvalidCard(value.to_string())),
    };
    match parts.get(2) {
        Some(color) => {
            let color = color
                .parse::<Color>()
                .map_err(|_| ParseError::InvalidColor(color.to_string()))?;
            Ok(Command::PlayWild(index, color))
        }
        None => Ok(Command::Play(index)),
    }
}

/// Parse a visibility command: "public on|off"
fn parse_public_command(parts: &[&str]) -> Result<Command, ParseError> {
    match parts.get(1) {
        Some(&"on") => Ok(Command::SetPublic(true)),
        Some(&"off") => Ok(Command::SetPublic(false)),
        Some(other) => Err(ParseError::InvalidToggle(other.to_string())),
        None => Err(ParseError::InvalidToggle(String::new())),
    }
}
