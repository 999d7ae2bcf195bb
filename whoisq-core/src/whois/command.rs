use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::check_quota;
use crate::engine::{LookupExecutor, LookupRequest};
use crate::error::{Result, WhoisError};

const DEFAULT_PROGRAM: &str = "whois";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the system `whois` tool.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    timeout: Duration,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn args(request: &LookupRequest) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(server) = &request.server {
            args.push("-h".to_string());
            args.push(server.clone());
        }
        args.push(request.query_string());
        args
    }
}

impl LookupExecutor for CommandExecutor {
    #[instrument(skip(self, request), fields(query = %request.query_string()))]
    async fn lookup(&self, request: &LookupRequest) -> Result<String> {
        let args = Self::args(request);
        debug!(program = %self.program, ?args, "Running whois command");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .env("LANG", "en")
            .kill_on_drop(true)
            .output();

        let output = timeout(self.timeout, child)
            .await
            .map_err(|_| WhoisError::Timeout(format!("{} did not finish", self.program)))?
            .map_err(|e| WhoisError::CommandFailed {
                code: None,
                stderr: format!("failed to run {}: {}", self.program, e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if !request.ignore_returncode {
                return Err(WhoisError::CommandFailed {
                    code: output.status.code(),
                    stderr,
                });
            }
            warn!(code = ?output.status.code(), stderr = %stderr, "whois exited non-zero, keeping output");
        }

        check_quota(&stdout)?;
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelSequence;

    fn request(server: Option<&str>, ignore_returncode: bool) -> LookupRequest {
        LookupRequest {
            labels: LabelSequence::new(["example", "com"]),
            name_hint: false,
            server: server.map(str::to_string),
            delay: Duration::ZERO,
            cache: Default::default(),
            ignore_returncode,
        }
    }

    #[test]
    fn test_args_with_server() {
        let args = CommandExecutor::args(&request(Some("whois.verisign-grs.com"), false));
        assert_eq!(args, vec!["-h", "whois.verisign-grs.com", "example.com"]);
    }

    #[test]
    fn test_args_without_server() {
        assert_eq!(CommandExecutor::args(&request(None, false)), vec!["example.com"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo_program_output_is_returned() {
        let executor = CommandExecutor::new().with_program("echo");
        let out = executor.lookup(&request(None, false)).await.unwrap();
        assert_eq!(out.trim(), "example.com");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_command_failed() {
        let executor = CommandExecutor::new().with_program("false");
        let err = executor.lookup(&request(None, false)).await.unwrap_err();
        assert!(matches!(err, WhoisError::CommandFailed { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_ignored_on_request() {
        let executor = CommandExecutor::new().with_program("false");
        let out = executor.lookup(&request(None, true)).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_missing_program() {
        let executor = CommandExecutor::new().with_program("whoisq-no-such-program");
        let err = executor.lookup(&request(None, true)).await.unwrap_err();
        assert!(matches!(err, WhoisError::CommandFailed { code: None, .. }));
    }
}
