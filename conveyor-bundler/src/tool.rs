//! External command invocation.
//!
//! A [`Tool`] is a program plus fixed arguments from the build config. Three
//! invocation shapes cover every seam:
//!
//! - [`Tool::filter`] — stdin → stdout, for style passes and minifiers
//! - [`Tool::capture`] — extra args, stdout captured, for the bundler
//! - [`Tool::run_on_file`] — path appended, in-place, for image optimizers

use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::BundleError;

/// An external command line: `[program, arg...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    program: String,
    args: Vec<String>,
}

impl Tool {
    /// Build from a config command line. The caller (config validation)
    /// guarantees the slice is non-empty.
    pub fn from_command(command: &[String]) -> Tool {
        Tool {
            program: command[0].clone(),
            args: command[1..].to_vec(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Pipe `input` through the tool and return its stdout.
    ///
    /// `cwd` lets path-relative passes (import inlining) resolve siblings of
    /// the entry being transformed.
    pub fn filter(&self, input: &[u8], cwd: Option<&Path>) -> Result<Vec<u8>, BundleError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| self.spawn_err(e))?;
        // Scope the handle so stdin closes before we wait on the child.
        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| BundleError::Protocol(format!("no stdin for '{}'", self.program)))?;
            stdin.write_all(input).map_err(|e| self.pipe_err(e))?;
        }

        let output = child.wait_with_output().map_err(|e| self.pipe_err(e))?;
        self.check_status(output.status, &output.stderr)?;
        Ok(output.stdout)
    }

    /// Run with extra arguments and environment overrides, capturing stdout.
    pub fn capture(
        &self,
        extra_args: &[&OsStr],
        envs: &[(&str, String)],
    ) -> Result<Vec<u8>, BundleError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .args(extra_args)
            .envs(envs.iter().map(|(k, v)| (k, v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| self.spawn_err(e))?;
        self.check_status(output.status, &output.stderr)?;
        Ok(output.stdout)
    }

    /// Run against a file in place (optimizers rewrite their argument).
    pub fn run_on_file(&self, path: &Path) -> Result<(), BundleError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| self.spawn_err(e))?;
        self.check_status(output.status, &output.stderr)
    }

    fn spawn_err(&self, source: std::io::Error) -> BundleError {
        BundleError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    fn pipe_err(&self, source: std::io::Error) -> BundleError {
        BundleError::Pipe {
            program: self.program.clone(),
            source,
        }
    }

    fn check_status(
        &self,
        status: std::process::ExitStatus,
        stderr: &[u8],
    ) -> Result<(), BundleError> {
        if status.success() {
            return Ok(());
        }
        Err(BundleError::ToolFailed {
            program: self.program.clone(),
            status: status.to_string(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
