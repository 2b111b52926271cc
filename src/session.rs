//! Session loop: ties terminal input, the line accumulator, and the
//! transport bridge together into one single-threaded, poll-driven actor.
//!
//! One event at a time: a terminal line, an interrupt, or a runtime
//! lifecycle signal. Each handler runs to completion before the next event
//! is looked at, so the pending buffer and transcript history need no
//! locking, and statements reach the bridge in exactly the order the lines
//! that completed them were typed.
//!
//! The prompt is withheld until the runtime signals ready; typed-ahead
//! keystrokes stay in the kernel tty buffer because stdin is not polled
//! before then.

use anyhow::{Context, Result, bail};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::unistd::read;
use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::bridge::{Bridge, BridgeEvent};
use crate::config::Config;
use crate::log::{log_error, log_info, log_warn};
use crate::repl::command::{self, Command};
use crate::repl::{Accumulator, Action, PromptMode};

// Signal flags (set by handlers, drained at the top of the loop)
static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);
static SIGTERM_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_: libc::c_int) {
    SIGINT_RECEIVED.store(true, Ordering::Release);
}

extern "C" fn handle_sigterm(_: libc::c_int) {
    SIGTERM_RECEIVED.store(true, Ordering::Release);
}

/// Install handlers without SA_RESTART: poll must come back with EINTR so
/// the loop reacts to the flags on the next iteration.
fn install_signal_handlers() -> Result<()> {
    // SIGPIPE: ignore, so a write to a dead runtime surfaces as EPIPE on
    // submit instead of killing the process.
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    // SAFETY: installing SIG_IGN carries no handler code at all.
    unsafe { sigaction(Signal::SIGPIPE, &ignore) }.context("sigaction SIGPIPE failed")?;

    let handlers: [(Signal, extern "C" fn(libc::c_int)); 3] = [
        (Signal::SIGINT, handle_sigint),
        (Signal::SIGTERM, handle_sigterm),
        (Signal::SIGHUP, handle_sigterm),
    ];
    for (signal, handler) in handlers {
        let action = SigAction::new(SigHandler::Handler(handler), SaFlags::empty(), SigSet::empty());
        // SAFETY: the handlers only store to an AtomicBool, which is
        // async-signal-safe.
        unsafe { sigaction(signal, &action) }
            .with_context(|| format!("sigaction {:?} failed", signal))?;
    }
    Ok(())
}

/// Where the remote runtime stands from the session's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteSessionState {
    /// Launched but not yet accepting input; prompt withheld.
    Starting,
    /// Accepting statements.
    Ready,
    /// Gone. Entered at most once; nothing is submitted afterward.
    Terminated,
}

/// Control flow out of an event handler.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit(i32),
}

/// Accumulates raw stdin bytes and yields newline-terminated lines with
/// the terminator (and a preceding carriage return) stripped.
#[derive(Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut raw: Vec<u8> = self.buf.drain(..=pos).collect();
        raw.pop();
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        Some(String::from_utf8_lossy(&raw).into_owned())
    }
}

/// The interactive session: composition root for the accumulator, the
/// bridge, and the launched runtime process.
pub struct Session {
    config: Config,
    accumulator: Accumulator,
    bridge: Bridge,
    runtime: Option<Child>,
    state: RemoteSessionState,
    lines: LineBuffer,
}

impl Session {
    pub fn new(config: Config, bridge: Bridge, runtime: Option<Child>) -> Self {
        Self {
            config,
            accumulator: Accumulator::new(),
            bridge,
            runtime,
            state: RemoteSessionState::Starting,
            lines: LineBuffer::default(),
        }
    }

    /// Run the session to completion. Returns the process exit code.
    pub fn run(mut self) -> Result<i32> {
        install_signal_handlers()?;

        loop {
            if SIGTERM_RECEIVED.swap(false, Ordering::AcqRel) {
                log_info("session", "sigterm", "terminating");
                self.shutdown_runtime();
                return Ok(143);
            }
            if SIGINT_RECEIVED.swap(false, Ordering::AcqRel) {
                if let Flow::Exit(code) = self.handle_interrupt() {
                    self.shutdown_runtime();
                    return Ok(code);
                }
            }

            let stdin = io::stdin();
            let listener_fd = unsafe { BorrowedFd::borrow_raw(self.bridge.listener_raw_fd()) };
            let mut poll_fds = vec![PollFd::new(listener_fd, PollFlags::POLLIN)];

            let mut peer_idx = None;
            if let Some(raw) = self.bridge.peer_raw_fd() {
                let fd = unsafe { BorrowedFd::borrow_raw(raw) };
                peer_idx = Some(poll_fds.len());
                poll_fds.push(PollFd::new(fd, PollFlags::POLLIN));
            }

            // stdin joins the poll set only once the runtime is ready;
            // typed-ahead input waits in the kernel buffer until then.
            let mut stdin_idx = None;
            if self.state == RemoteSessionState::Ready {
                let fd = unsafe { BorrowedFd::borrow_raw(stdin.as_raw_fd()) };
                stdin_idx = Some(poll_fds.len());
                poll_fds.push(PollFd::new(fd, PollFlags::POLLIN));
            }

            // Short timeout while starting so a runtime that dies before
            // connecting is noticed; otherwise just block generously.
            let timeout = match self.state {
                RemoteSessionState::Starting => 500u16,
                _ => 10_000u16,
            };

            match poll(&mut poll_fds, PollTimeout::from(timeout)) {
                Ok(0) => {
                    if self.state == RemoteSessionState::Starting {
                        self.check_runtime_alive()?;
                    }
                    continue;
                }
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(e) => bail!("poll failed: {}", e),
            }

            let listener_readable = poll_fds[0]
                .revents()
                .map(|r| r.contains(PollFlags::POLLIN))
                .unwrap_or(false);
            let peer_readable = peer_idx
                .and_then(|i| poll_fds[i].revents())
                .map(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP))
                .unwrap_or(false);
            let stdin_readable = stdin_idx
                .and_then(|i| poll_fds[i].revents())
                .map(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP))
                .unwrap_or(false);
            drop(poll_fds);

            if listener_readable {
                self.bridge.accept()?;
            }

            if peer_readable {
                for event in self.bridge.read_events() {
                    if let Flow::Exit(code) = self.apply_bridge_event(event) {
                        self.shutdown_runtime();
                        return Ok(code);
                    }
                }
            }

            if stdin_readable {
                if let Flow::Exit(code) = self.drain_stdin()? {
                    self.shutdown_runtime();
                    return Ok(code);
                }
            }
        }
    }

    /// While starting, a runtime process that exits before signaling ready
    /// is a setup failure.
    fn check_runtime_alive(&mut self) -> Result<()> {
        if let Some(child) = self.runtime.as_mut() {
            if let Some(status) = child.try_wait().context("wait on runtime failed")? {
                bail!("runtime exited before signaling ready ({})", status);
            }
        }
        Ok(())
    }

    /// First interrupt with a pending statement drops the statement and
    /// warns; an interrupt with an empty buffer ends the session, so the
    /// immediate second ^C quits.
    fn handle_interrupt(&mut self) -> Flow {
        if self.accumulator.has_pending() {
            self.accumulator.clear_pending();
            println!("\n(^C again to quit)");
            self.print_prompt();
            Flow::Continue
        } else {
            println!();
            Flow::Exit(0)
        }
    }

    fn apply_bridge_event(&mut self, event: BridgeEvent) -> Flow {
        match event {
            BridgeEvent::Ready => {
                if self.state == RemoteSessionState::Starting {
                    self.state = RemoteSessionState::Ready;
                    log_info("session", "runtime.ready", "accepting statements");
                    self.print_prompt();
                } else {
                    log_warn("session", "runtime.ready.duplicate", "ignored");
                }
                Flow::Continue
            }
            BridgeEvent::Terminated { diagnostic } => {
                if self.state == RemoteSessionState::Terminated {
                    return Flow::Continue;
                }
                self.state = RemoteSessionState::Terminated;
                let diagnostic = if diagnostic.is_empty() {
                    "runtime terminated".to_string()
                } else {
                    diagnostic
                };
                log_error("session", "runtime.terminated", &diagnostic);
                eprintln!("error: {}", diagnostic);
                Flow::Exit(1)
            }
        }
    }

    fn drain_stdin(&mut self) -> Result<Flow> {
        let stdin = io::stdin();
        let mut buf = [0u8; 4096];
        match read(stdin.as_fd(), &mut buf) {
            // EOF: terminal gone or scripted input ended. Same as `.exit`.
            Ok(0) => return Ok(Flow::Exit(0)),
            Ok(n) => self.lines.push(&buf[..n]),
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => return Ok(Flow::Continue),
            Err(e) => bail!("read from stdin failed: {}", e),
        }

        while let Some(line) = self.lines.next_line() {
            if let Flow::Exit(code) = self.handle_line(&line) {
                return Ok(Flow::Exit(code));
            }
        }
        Ok(Flow::Continue)
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        match self.accumulator.submit_line(line) {
            Action::Noop => {}
            Action::Reject(err) => eprintln!("{}", err),
            Action::RunCommand(cmd) => return self.run_command(cmd),
            Action::Send(source) => {
                if let Err(e) = self.bridge.submit(&source) {
                    // A failed submit means the peer is gone; end through
                    // the terminated path so shutdown stays idempotent.
                    return self.apply_bridge_event(BridgeEvent::Terminated {
                        diagnostic: format!("failed to submit statement: {}", e),
                    });
                }
            }
            Action::AwaitMore => {}
        }
        self.print_prompt();
        Flow::Continue
    }

    fn run_command(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::Clear => self.accumulator.clear_pending(),
            Command::Save(target) => {
                match command::save_transcript(self.accumulator.history(), target.as_deref()) {
                    Ok(path) => log_info(
                        "session",
                        "save.ok",
                        &format!(
                            "{} lines to {}",
                            self.accumulator.history().len(),
                            path.display()
                        ),
                    ),
                    Err(e) => {
                        // Recoverable: only the save is aborted.
                        log_error("session", "save.fail", &e.to_string());
                        eprintln!("save failed: {}", e);
                    }
                }
            }
            Command::Exit => return Flow::Exit(0),
        }
        self.print_prompt();
        Flow::Continue
    }

    fn print_prompt(&self) {
        if self.state != RemoteSessionState::Ready {
            return;
        }
        let prompt = match self.accumulator.prompt_mode() {
            PromptMode::Primary => &self.config.prompt,
            PromptMode::Continuation => &self.config.continue_prompt,
        };
        print!("{}", prompt);
        let _ = io::stdout().flush();
    }

    /// Best-effort teardown of the launched runtime process.
    fn shutdown_runtime(&mut self) {
        if let Some(mut child) = self.runtime.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
