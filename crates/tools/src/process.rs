use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Spawns `command` and waits for it to exit, killing it if it runs longer
/// than `timeout`.
///
/// Only spawn and wait failures are errors here; interpreting the exit status
/// is left to the caller.
pub(crate) async fn run(mut command: Command, timeout: Duration) -> Result<Output> {
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
    tracing::trace!(command = ?command.as_std(), "Spawning external tool");
    let child = command.spawn().or_raise(|| ErrorKind::Io)?;
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output.or_raise(|| ErrorKind::Io),
        // Dropping the future drops the child, and `kill_on_drop` reaps it.
        Err(_) => exn::bail!(ErrorKind::Timeout(timeout)),
    }
}

/// Maps an unsuccessful exit status onto an error.
pub(crate) fn check(output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    match output.status.code() {
        Some(code) => exn::bail!(ErrorKind::Failed(code)),
        None => exn::bail!(ErrorKind::Killed),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("/bin/sh");
        command.args(["-c", script]);
        command
    }

    #[tokio::test]
    async fn test_captures_output() {
        let output = run(sh("echo hello"), Duration::from_secs(10)).await.unwrap();
        assert!(check(&output).is_ok());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let output = run(sh("exit 3"), Duration::from_secs(10)).await.unwrap();
        let err = check(&output).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Failed(3)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let err = run(sh("sleep 5"), Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Timeout(_)));
        assert!(err.is_retryable());
        assert_eq!((*err).to_string(), "external tool did not finish within 100ms");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run(Command::new("/definitely/not/a/program"), Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io));
    }
}
