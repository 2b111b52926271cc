//! Meta-command tokenizing and the save-transcript operation.
//!
//! A line whose first non-whitespace character is the command sigil is
//! tokenized here into the closed Command set. Unknown tokens are rejected
//! at this boundary with a typed error the session surfaces as a
//! diagnostic; they never reach dispatch logic.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filename used by `.save` when no target is given.
pub const DEFAULT_SAVE_NAME: &str = "tether.log";

/// The closed set of meta-commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Drop the in-progress statement buffer. History is untouched.
    Clear,
    /// Persist the transcript to a file in the working directory.
    Save(Option<String>),
    /// End the session cleanly.
    Exit,
}

/// Rejection of a sigil line. Recoverable: the session prints the message
/// and re-prompts with no state change.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("missing command after '.'")]
    Missing,
    #[error("invalid command \"{0}\"")]
    Unknown(String),
}

impl Command {
    /// Tokenize the remainder of a sigil line (everything after the sigil).
    ///
    /// Splits on whitespace; the first token selects the command. Tokens
    /// beyond what a command consumes are ignored.
    pub fn parse(rest: &str) -> Result<Command, CommandError> {
        let mut tokens = rest.split_whitespace();
        match tokens.next().ok_or(CommandError::Missing)? {
            "clear" => Ok(Command::Clear),
            "save" => Ok(Command::Save(tokens.next().map(str::to_string))),
            "exit" => Ok(Command::Exit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Reduce a save target to a bare filename.
///
/// Directory components are stripped so the transcript always lands in the
/// working directory; a target like `../../etc/x` cannot escape it.
fn save_file_name(target: Option<&str>) -> OsString {
    target
        .map(Path::new)
        .and_then(Path::file_name)
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from(DEFAULT_SAVE_NAME))
}

/// Write the transcript, one entry per line, to the resolved target in the
/// current working directory. Overwrites without confirmation.
pub fn save_transcript(history: &[String], target: Option<&str>) -> io::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    save_transcript_in(&cwd, history, target)
}

fn save_transcript_in(dir: &Path, history: &[String], target: Option<&str>) -> io::Result<PathBuf> {
    let path = dir.join(save_file_name(target));
    std::fs::write(&path, history.join("\n"))?;
    Ok(path)
}
