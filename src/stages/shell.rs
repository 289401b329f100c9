//! Running external programs for the archive and encryption stages

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{BackupError, BackupResult};
use crate::logging::RunLog;

/// Runs one program to completion, optionally feeding it a stdin string
#[derive(Debug, Clone)]
pub struct ShellRunner {
    stage: &'static str,
    check: bool,
}

impl ShellRunner {
    /// Runner whose failures are reported against `stage`; non-zero exits are errors
    pub fn new(stage: &'static str) -> Self {
        Self { stage, check: true }
    }

    /// Whether a non-zero exit status is an error (default `true`)
    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    fn failure(&self, message: String) -> BackupError {
        BackupError::Stage {
            stage: self.stage,
            message,
        }
    }

    /// Run `args[0]` with the remaining arguments and wait for it.
    ///
    /// `stdout` receives the program's standard output; it is discarded when
    /// `None`. Standard error is inherited.
    pub fn run(
        &self,
        args: &[OsString],
        stdin: Option<&str>,
        stdout: Option<File>,
        log: &dyn RunLog,
    ) -> BackupResult<ExitStatus> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| self.failure("empty command line".to_string()))?;

        log.info(&format!("Running shell command: {:?}", args));

        let mut child = Command::new(program)
            .args(rest)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(match stdout {
                Some(file) => Stdio::from(file),
                None => Stdio::null(),
            })
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    self.failure(format!("program not found: {}", program.to_string_lossy()))
                } else {
                    self.failure(format!(
                        "failed to start {}: {}",
                        program.to_string_lossy(),
                        e
                    ))
                }
            })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            // The program may exit without reading everything; its exit status says why.
            if let Err(e) = pipe.write_all(input.as_bytes()) {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.failure(format!("failed to write stdin: {}", e)));
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| self.failure(format!("failed to wait for command: {}", e)))?;

        if self.check && !status.success() {
            return Err(self.failure(format!(
                "{} exited with {} - check your logs",
                program.to_string_lossy(),
                status
            )));
        }

        Ok(status)
    }
}
