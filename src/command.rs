//! Text command interpreter. One submitted line maps to exactly one action
//! or one diagnostic message.

use crate::sim::{DecayInterval, IntervalError, Session};
use crate::view::PetView;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

pub const COMMANDS: [&str; 5] = ["help", "feed", "give", "teach", "change_needs_time"];

pub const HELP_TEXT: &str = "============
help command
============
> feed {food_item} -- Feed your pet. Known foods are more filling.
> give {item} -- Hand your pet something. Just tells you what you gave.
> teach {word} -- Chance to add word to pet vocab. Decreases energy.
> change_needs_time {time_in_seconds} -- Dev command. Changes how fast needs decrease. Default: 1800";

const GIVE_USAGE: &str = "give {item}";
const TEACH_USAGE: &str = "teach {word}";
const CHANGE_NEEDS_TIME_USAGE: &str = "change_needs_time {time_in_seconds}";

// base64 so the secret does not show up in a plain text search
const SECRET_ITEM: &str = "cG9n";
const SECRET_REWARD: &str = "UE9He1lvdSBmb3VuZCB0aGUgZmlyc3QgUEVHRyEgKDEvMyl9";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Help,
    Feed(Option<String>),
    Give(String),
    Teach(String),
    ChangeNeedsTime(DecayInterval),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("Invalid command: {0}")]
    Unknown(String),
    #[error("Missing argument. Usage: {0}")]
    MissingArgument(&'static str),
    #[error("Invalid interval: {raw} (expected a positive number of seconds)")]
    InvalidInterval {
        raw: String,
        #[source]
        reason: IntervalError,
    },
    #[error("{0} can no longer hear you...")]
    PetDead(String),
}

/// Lower-cases the line and splits it on whitespace. The first token names
/// the command, the second is its only argument; anything after is ignored.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.to_lowercase();
    let mut parts = line.split_whitespace();
    let name = parts.next().unwrap_or("");
    let arg = parts.next().map(str::to_string);

    match name {
        "help" => Ok(Command::Help),
        "feed" => Ok(Command::Feed(arg)),
        "give" => arg
            .map(Command::Give)
            .ok_or(CommandError::MissingArgument(GIVE_USAGE)),
        "teach" => arg
            .map(Command::Teach)
            .ok_or(CommandError::MissingArgument(TEACH_USAGE)),
        "change_needs_time" => {
            let raw = arg.ok_or(CommandError::MissingArgument(CHANGE_NEEDS_TIME_USAGE))?;
            match raw.parse::<DecayInterval>() {
                Ok(interval) => Ok(Command::ChangeNeedsTime(interval)),
                Err(reason) => Err(CommandError::InvalidInterval { raw, reason }),
            }
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// Runs one submitted line against the session. Every rejection is also
/// reported through `view`.
pub fn submit(
    session: &mut Session,
    line: &str,
    now: DateTime<Utc>,
    view: &mut dyn PetView,
) -> Result<(), CommandError> {
    let result = admit(session, line).map(|command| execute(session, command, now, view));
    if let Err(err) = &result {
        debug!(%err, line, "command rejected");
        view.display_message(&err.to_string());
    }
    result
}

fn admit(session: &Session, line: &str) -> Result<Command, CommandError> {
    if !session.is_alive() {
        return Err(CommandError::PetDead(session.pet().name.clone()));
    }
    parse(line)
}

pub fn execute(
    session: &mut Session,
    command: Command,
    now: DateTime<Utc>,
    view: &mut dyn PetView,
) {
    debug!(?command, "executing");
    match command {
        Command::Help => view.display_message(HELP_TEXT),
        Command::Feed(food) => session.feed(food.as_deref(), view),
        Command::Give(item) => view.display_message(&give_reply(&session.pet().name, &item)),
        Command::Teach(word) => session.train(&word, view),
        Command::ChangeNeedsTime(interval) => {
            session.set_decay_interval(interval, now);
            view.display_message(&format!(
                "Needs now decay every {} seconds",
                interval.secs()
            ));
        }
    }
}

fn give_reply(pet_name: &str, item: &str) -> String {
    if decode(SECRET_ITEM).as_deref() == Some(item) {
        if let Some(reward) = decode(SECRET_REWARD) {
            return reward;
        }
    }
    format!("You gave {} a {}", pet_name, item)
}

fn decode(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}
