//! Collaborator boundary for the remote runtime: login probe, one-shot
//! project provisioning, and the runtime launch itself.
//!
//! Everything here is setup that happens before the interactive loop. The
//! launched process connects back to the bridge on its own schedule; its
//! `ready`/`terminated` signals are the only contract the session relies
//! on. None of these steps carry internal state.

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::log::log_info;

/// Environment variable telling the launched runtime where the bridge
/// listens.
pub const PORT_ENV: &str = "TETHER_PORT";

/// Split a configured command line into program and arguments.
fn split_command(cmd: &str) -> Result<(String, Vec<String>)> {
    let mut parts = cmd.split_whitespace().map(str::to_string);
    let program = parts.next().context("empty runtime command")?;
    Ok((program, parts.collect()))
}

/// Run the configured login probe once at startup. A probe that cannot be
/// run or exits non-zero is a setup failure, fatal before the loop starts.
pub fn ensure_logged_in(cmd: &str) -> Result<()> {
    let (program, args) = split_command(cmd)?;
    let status = Command::new(&program)
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("failed to run login probe '{}'", cmd))?;
    if !status.success() {
        bail!("not logged in: probe '{}' exited with {}", cmd, status);
    }
    log_info("launcher", "login.ok", cmd);
    Ok(())
}

/// One-shot scaffold: make sure the runtime project directory exists and
/// carries the support files the runtime needs. Returns true if the
/// project directory had to be created.
pub fn provision(project_dir: &Path, support_dir: Option<&Path>) -> Result<bool> {
    let created = !project_dir.exists();
    if created {
        std::fs::create_dir_all(project_dir)
            .with_context(|| format!("failed to create {}", project_dir.display()))?;
    }

    if let Some(src) = support_dir {
        for entry in std::fs::read_dir(src)
            .with_context(|| format!("failed to read support dir {}", src.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let dst = project_dir.join(entry.file_name());
            std::fs::copy(entry.path(), &dst)
                .with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
        log_info(
            "launcher",
            "provision",
            &format!("{} -> {}", src.display(), project_dir.display()),
        );
    }

    Ok(created)
}

/// Launch the runtime build command with the bridge port exported. stdio is
/// inherited, so the runtime's evaluation output streams straight through
/// to the user's terminal.
pub fn launch(cmd: &str, port: u16) -> Result<Child> {
    let (program, args) = split_command(cmd)?;
    let child = Command::new(&program)
        .args(&args)
        .env(PORT_ENV, port.to_string())
        .spawn()
        .with_context(|| format!("failed to launch runtime '{}'", cmd))?;
    log_info(
        "launcher",
        "launch",
        &format!("'{}' pid={} port={}", cmd, child.id(), port),
    );
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_command_separates_program_and_args() {
        let (program, args) = split_command("ti build -p ios").unwrap();
        assert_eq!(program, "ti");
        assert_eq!(args, vec!["build".to_string(), "-p".to_string(), "ios".to_string()]);
    }

    #[test]
    fn split_command_rejects_empty() {
        assert!(split_command("").is_err());
        assert!(split_command("   ").is_err());
    }

    #[test]
    fn login_probe_success() {
        assert!(ensure_logged_in("true").is_ok());
    }

    #[test]
    fn login_probe_failure_is_fatal() {
        assert!(ensure_logged_in("false").is_err());
    }

    #[test]
    fn login_probe_unrunnable_is_fatal() {
        assert!(ensure_logged_in("/nonexistent-tether-probe").is_err());
    }

    #[test]
    fn provision_creates_missing_project_dir() {
        let base = tempfile::tempdir().unwrap();
        let project = base.path().join("app");
        assert!(provision(&project, None).unwrap());
        assert!(project.is_dir());
        // Second run is a no-op.
        assert!(!provision(&project, None).unwrap());
    }

    #[test]
    fn provision_copies_support_files() {
        let base = tempfile::tempdir().unwrap();
        let support = base.path().join("support");
        std::fs::create_dir(&support).unwrap();
        std::fs::write(support.join("bootstrap.js"), "// bootstrap").unwrap();
        std::fs::create_dir(support.join("nested")).unwrap();

        let project = base.path().join("app");
        provision(&project, Some(&support)).unwrap();
        assert_eq!(
            std::fs::read_to_string(project.join("bootstrap.js")).unwrap(),
            "// bootstrap"
        );
        // Only plain files are provisioned.
        assert!(!project.join("nested").exists());
    }

    #[test]
    fn launch_spawns_child() {
        let mut child = launch("true", 7737).unwrap();
        let status = child.wait().unwrap();
        assert!(status.success());
    }
}
