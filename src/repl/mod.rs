//! Line accumulation: the state machine between raw terminal lines and
//! completed statements.
//!
//! The accumulator owns the pending buffer (unsent lines of the statement
//! in progress) and the transcript history (every code line ever typed,
//! whether or not it was submitted). Each input line is classified as a
//! meta-command, an empty line, or code; code lines grow the buffer until
//! the completeness oracle approves the joined candidate for submission.

pub mod command;
pub mod oracle;

use regex::Regex;

use command::{Command, CommandError};
use oracle::{Completeness, classify};

/// Prompt shown to the user, a pure function of the last classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Buffer is empty, or a statement was just accepted.
    Primary,
    /// The buffered statement is still open.
    Continuation,
}

/// What the session should do with the line it just read.
#[derive(Debug, PartialEq)]
pub enum Action {
    /// Nothing to do; re-prompt in the current mode.
    Noop,
    /// A recognized meta-command; run it.
    RunCommand(Command),
    /// A sigil line that didn't tokenize; show the diagnostic, no state change.
    Reject(CommandError),
    /// The buffer formed a complete statement; ship it.
    Send(String),
    /// Statement still open; keep reading.
    AwaitMore,
}

/// Owns the pending buffer, the transcript history, and the prompt mode.
/// One instance per session, threaded through the session loop by value;
/// no globals.
pub struct Accumulator {
    pending: Vec<String>,
    history: Vec<String>,
    prompt_mode: PromptMode,
    sigil: Regex,
}

fn sigil_regex() -> Regex {
    // A line whose first non-whitespace character is the command sigil.
    Regex::new(r"^\s*\.").unwrap()
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            history: Vec::new(),
            prompt_mode: PromptMode::Primary,
            sigil: sigil_regex(),
        }
    }

    pub fn prompt_mode(&self) -> PromptMode {
        self.prompt_mode
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Every code line typed this session, in order, independent of
    /// submission outcome or buffer clears.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Feed one raw input line through the accumulation state machine.
    ///
    /// Command lines are recognized even while a multi-line statement is in
    /// progress; they bypass the buffer and the oracle entirely.
    pub fn submit_line(&mut self, raw: &str) -> Action {
        if raw.trim().is_empty() {
            return Action::Noop;
        }

        if let Some(m) = self.sigil.find(raw) {
            return match Command::parse(&raw[m.end()..]) {
                Ok(cmd) => Action::RunCommand(cmd),
                Err(err) => Action::Reject(err),
            };
        }

        self.pending.push(raw.to_string());
        self.history.push(raw.to_string());
        let candidate = self.pending.join("\n");

        match classify(&candidate) {
            Completeness::Complete => {
                self.pending.clear();
                self.prompt_mode = PromptMode::Primary;
                Action::Send(candidate)
            }
            Completeness::Incomplete => {
                self.prompt_mode = PromptMode::Continuation;
                Action::AwaitMore
            }
        }
    }

    /// Drop the in-progress statement. History is untouched.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
        self.prompt_mode = PromptMode::Primary;
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_complete_line_sends_immediately() {
        let mut acc = Accumulator::new();
        assert_eq!(acc.submit_line("1+1"), Action::Send("1+1".to_string()));
        assert_eq!(acc.prompt_mode(), PromptMode::Primary);
        assert!(!acc.has_pending());
    }

    #[test]
    fn multiline_statement_sends_on_final_line() {
        let mut acc = Accumulator::new();
        assert_eq!(acc.submit_line("function f() {"), Action::AwaitMore);
        assert_eq!(acc.prompt_mode(), PromptMode::Continuation);
        assert_eq!(
            acc.submit_line("}"),
            Action::Send("function f() {\n}".to_string())
        );
        assert_eq!(acc.prompt_mode(), PromptMode::Primary);
    }

    #[test]
    fn exactly_one_send_for_a_multiline_sequence() {
        let mut acc = Accumulator::new();
        let lines = ["var a = [", "1,", "2", "];"];
        let mut sends = Vec::new();
        for line in lines {
            if let Action::Send(src) = acc.submit_line(line) {
                sends.push(src);
            }
        }
        assert_eq!(sends, vec!["var a = [\n1,\n2\n];".to_string()]);
    }

    #[test]
    fn empty_line_is_noop_and_keeps_mode() {
        let mut acc = Accumulator::new();
        assert_eq!(acc.submit_line(""), Action::Noop);
        assert_eq!(acc.submit_line("   "), Action::Noop);
        assert_eq!(acc.prompt_mode(), PromptMode::Primary);

        acc.submit_line("if (x) {");
        assert_eq!(acc.submit_line(""), Action::Noop);
        assert_eq!(acc.prompt_mode(), PromptMode::Continuation);
        assert!(acc.has_pending());
    }

    #[test]
    fn command_line_bypasses_buffer_and_history() {
        let mut acc = Accumulator::new();
        assert_eq!(
            acc.submit_line(".save out.log"),
            Action::RunCommand(Command::Save(Some("out.log".to_string())))
        );
        assert_eq!(acc.submit_line(".exit"), Action::RunCommand(Command::Exit));
        assert!(acc.history().is_empty());
        assert!(!acc.has_pending());
    }

    #[test]
    fn command_recognized_with_leading_whitespace() {
        let mut acc = Accumulator::new();
        assert_eq!(
            acc.submit_line("   .clear"),
            Action::RunCommand(Command::Clear)
        );
    }

    #[test]
    fn command_recognized_mid_statement() {
        let mut acc = Accumulator::new();
        acc.submit_line("if (x) {");
        assert_eq!(
            acc.submit_line(".clear"),
            Action::RunCommand(Command::Clear)
        );
        // The command itself does not mutate the accumulator; the session
        // applies it. Buffer is still pending until clear_pending runs.
        assert!(acc.has_pending());
    }

    #[test]
    fn unknown_command_is_rejected_without_state_change() {
        let mut acc = Accumulator::new();
        acc.submit_line("if (x) {");
        assert_eq!(
            acc.submit_line(".bogus"),
            Action::Reject(CommandError::Unknown("bogus".to_string()))
        );
        assert!(acc.has_pending());
        assert_eq!(acc.prompt_mode(), PromptMode::Continuation);
    }

    #[test]
    fn clear_drops_buffer_but_not_history() {
        let mut acc = Accumulator::new();
        acc.submit_line("if (x) {");
        acc.clear_pending();
        assert!(!acc.has_pending());
        assert_eq!(acc.prompt_mode(), PromptMode::Primary);
        assert_eq!(acc.history(), &["if (x) {".to_string()]);
    }

    #[test]
    fn history_records_intent_independent_of_submission() {
        let mut acc = Accumulator::new();
        acc.submit_line("1+1");
        acc.submit_line("if (x) {");
        acc.clear_pending();
        acc.submit_line("2+2");
        assert_eq!(
            acc.history(),
            &[
                "1+1".to_string(),
                "if (x) {".to_string(),
                "2+2".to_string()
            ]
        );
    }

    #[test]
    fn leading_dot_code_is_a_command_not_code() {
        // ".5 + 1" reads as an unknown command, matching the sigil rule:
        // first non-whitespace character wins.
        let mut acc = Accumulator::new();
        assert_eq!(
            acc.submit_line(".5"),
            Action::Reject(CommandError::Unknown("5".to_string()))
        );
    }
}
