//! Subprocess execution for recorded commands and inspections (spec §4.5/
//! §5), replacing the reference implementation's tempfile-polling approach
//! (`runlib.py::_subprocess_run_duplicate_streams`) with two dedicated
//! reader threads, one per stream, joined after the child exits or is
//! killed for exceeding its timeout.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::{InTotoError, Result};

/// The outcome of running a command to completion (or to its timeout).
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub return_value: i64,
}

/// Run `argv` to completion, capturing stdout/stderr in full and optionally
/// also streaming them to this process's own stdout/stderr (spec §5: "MAY
/// stream... but MUST deliver the complete captured text"). `cwd` sets the
/// working directory the child inherits; standard input is never forwarded.
pub fn execute(
    argv: &[String],
    cwd: Option<&std::path::Path>,
    timeout: Option<Duration>,
    tee: bool,
) -> Result<ExecutionResult> {
    let Some((program, args)) = argv.split_first() else {
        return Err(InTotoError::FormatError("empty command".into()));
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let mut child = command.spawn().map_err(|e| InTotoError::Io {
        path: std::path::PathBuf::from(program),
        source: e,
    })?;

    let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr was piped");

    let stdout_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf);
        buf
    });
    let stderr_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut buf);
        buf
    });

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().map_err(|e| InTotoError::Io {
            path: std::path::PathBuf::from(program),
            source: e,
        })? {
            break status;
        }
        if let Some(limit) = timeout {
            if start.elapsed() > limit {
                let _ = child.kill();
                let _ = child.wait();
                return Err(InTotoError::TimeoutError {
                    command: argv.join(" "),
                    timeout_secs: limit.as_secs(),
                });
            }
        }
        std::thread::sleep(Duration::from_millis(20));
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    if tee {
        use std::io::Write;
        let _ = std::io::stdout().write_all(&stdout_bytes);
        let _ = std::io::stderr().write_all(&stderr_bytes);
    }

    Ok(ExecutionResult {
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        return_value: status.code().unwrap_or(-1) as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_return_value() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "echo hi".to_string()];
        let result = execute(&argv, None, None, false).unwrap();
        assert_eq!(result.stdout.trim(), "hi");
        assert_eq!(result.return_value, 0);
    }

    #[test]
    fn nonzero_exit_is_captured_not_an_error() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        let result = execute(&argv, None, None, false).unwrap();
        assert_eq!(result.return_value, 3);
    }

    #[test]
    fn exceeding_timeout_kills_and_errors() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "sleep 5".to_string()];
        let result = execute(&argv, None, Some(Duration::from_millis(100)), false);
        assert!(matches!(result, Err(InTotoError::TimeoutError { .. })));
    }

    #[test]
    fn empty_command_is_rejected() {
        let result = execute(&[], None, None, false);
        assert!(result.is_err());
    }
}
