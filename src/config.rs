//! Configuration for a tether session.
//!
//! All TETHER_* environment access happens here, once, at startup. The
//! resulting Config is passed by value into the composition root; there is
//! no process-wide configuration global.

use anyhow::{Result, bail};
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "127.0.0.1:7737";
pub const DEFAULT_PROMPT: &str = "> ";
pub const DEFAULT_CONTINUE_PROMPT: &str = "... ";
pub const DEFAULT_PROJECT_DIR: &str = "_tether_app";

/// Session configuration from TETHER_* environment variables, with
/// command-line flags layered on top (flags win).
#[derive(Clone, Debug)]
pub struct Config {
    /// Bridge listen address (TETHER_BIND / --bind)
    pub bind: String,
    /// Prompt shown when the pending buffer is empty (TETHER_PROMPT)
    pub prompt: String,
    /// Prompt shown while a statement is still open (TETHER_CONTINUE_PROMPT)
    pub continue_prompt: String,
    /// Command line that launches the remote runtime (TETHER_RUNTIME_CMD / --runtime)
    pub runtime_cmd: Option<String>,
    /// Login probe command run once at startup (TETHER_LOGIN_CMD)
    pub login_cmd: Option<String>,
    /// Runtime project directory to provision (TETHER_PROJECT_DIR)
    pub project_dir: PathBuf,
    /// Directory of runtime support files copied into the project (TETHER_SUPPORT_DIR)
    pub support_dir: Option<PathBuf>,
    /// Skip the login probe (--skip-login)
    pub skip_login: bool,
    /// Verbose logging (TETHER_VERBOSE=1 / --verbose)
    pub verbose: bool,
}

impl Config {
    /// Load configuration from TETHER_* environment variables.
    pub fn from_env() -> Self {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        Self {
            bind: env("TETHER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            prompt: env("TETHER_PROMPT").unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            continue_prompt: env("TETHER_CONTINUE_PROMPT")
                .unwrap_or_else(|| DEFAULT_CONTINUE_PROMPT.to_string()),
            runtime_cmd: env("TETHER_RUNTIME_CMD"),
            login_cmd: env("TETHER_LOGIN_CMD"),
            project_dir: env("TETHER_PROJECT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT_DIR)),
            support_dir: env("TETHER_SUPPORT_DIR").map(PathBuf::from),
            skip_login: false,
            verbose: std::env::var("TETHER_VERBOSE").map(|v| v == "1").unwrap_or(false),
        }
    }

    /// Apply command-line flags on top of the environment.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--bind" => {
                    self.bind = take_value(args, i)?;
                    i += 2;
                }
                "--runtime" => {
                    self.runtime_cmd = Some(take_value(args, i)?);
                    i += 2;
                }
                "--skip-login" => {
                    self.skip_login = true;
                    i += 1;
                }
                "--verbose" => {
                    self.verbose = true;
                    i += 1;
                }
                other => bail!("unknown argument: {}", other),
            }
        }
        Ok(())
    }
}

fn take_value(args: &[String], i: usize) -> Result<String> {
    match args.get(i + 1) {
        Some(v) => Ok(v.clone()),
        None => bail!("{} requires a value", args[i]),
    }
}
