//! One-shot external tool runs with a hard deadline.
//!
//! Probing and subtitle extraction invoke a tool once and only consume its
//! stdout, so the whole surface is a single capture call. Anything
//! long-lived (the streaming encoder) goes through the supervisor in
//! [`crate::encode`] instead.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

use mediabeam_core::{Error, Result};

/// Run a tool to completion and return its captured stdout.
///
/// The child never outlives the deadline: `kill_on_drop` takes it down when
/// the timed-out wait future is dropped. A non-zero exit is an
/// [`Error::Tool`] carrying the stderr tail; stdout of a failed run is
/// discarded.
pub async fn run_tool<I, S>(program: &Path, args: I, deadline: Duration) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string_lossy().into_owned());

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(std::process::Stdio::null());
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    cmd.kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| Error::tool(tool.clone(), format!("failed to spawn: {e}")))?;

    let output = match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(Error::tool(
                tool,
                format!("I/O error waiting for process: {e}"),
            ));
        }
        Err(_elapsed) => {
            return Err(Error::tool(tool, format!("timed out after {deadline:?}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool(
            tool,
            format!("exited with status {}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
