//! tether: an interactive console tethered to a remote execution runtime.
//!
//! Lines typed at the terminal accumulate until they form a syntactically
//! complete statement; each completed statement is shipped over a local TCP
//! bridge to the runtime process (on a device or emulator) for evaluation.
//! Meta-commands manage the session:
//!   .clear         drop the statement in progress
//!   .save [name]   write the transcript to the working directory
//!   .exit          end the session
//!
//! Startup order matters: the bridge must be listening before the runtime
//! is launched, and the prompt is withheld until the runtime signals ready.

mod bridge;
mod config;
mod launcher;
mod log;
mod paths;
mod repl;
mod session;

use anyhow::Result;
use std::env;

use config::Config;
use log::log_info;

fn print_usage() {
    eprintln!("tether - interactive console for a remote execution runtime");
    eprintln!();
    eprintln!("Usage: tether [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --bind <addr>     bridge listen address (default {})", config::DEFAULT_BIND);
    eprintln!("  --runtime <cmd>   command that launches the remote runtime");
    eprintln!("  --skip-login      skip the login probe");
    eprintln!("  --verbose         verbose logging");
    eprintln!("  -h, --help        show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TETHER_BIND, TETHER_PROMPT, TETHER_CONTINUE_PROMPT,");
    eprintln!("  TETHER_RUNTIME_CMD, TETHER_LOGIN_CMD, TETHER_PROJECT_DIR,");
    eprintln!("  TETHER_SUPPORT_DIR, TETHER_DIR, TETHER_VERBOSE");
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = Config::from_env();
    config.apply_args(&args)?;

    if config.verbose {
        log_info("main", "start", &format!("bind={}", config.bind));
    }

    // Setup failures below are fatal before the interactive loop starts.

    if !config.skip_login {
        if let Some(cmd) = config.login_cmd.clone() {
            launcher::ensure_logged_in(&cmd)?;
        }
    }

    if launcher::provision(&config.project_dir, config.support_dir.as_deref())? {
        println!("[provisioning runtime]");
    }

    // The bridge listens before the runtime exists, so the runtime always
    // has something to connect back to.
    let bridge = bridge::Bridge::listen(&config.bind)?;

    let runtime = match config.runtime_cmd.clone() {
        Some(cmd) => {
            println!("[launching runtime]");
            Some(launcher::launch(&cmd, bridge.port())?)
        }
        None => {
            // No launch command: wait for a runtime started by hand.
            println!("[waiting for runtime on {}]", config.bind);
            None
        }
    };

    let session = session::Session::new(config, bridge, runtime);
    let code = session.run()?;
    std::process::exit(code);
}
