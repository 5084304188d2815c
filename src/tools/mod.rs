//! External tool invocation.
//!
//! Every delegated program (seqtk, blastn, bwa, samtools, lofreq, ...) is run
//! through the [`ToolRunner`] trait. A runner only executes; [`run_checked`]
//! turns a non-zero exit into a [`ToolError`] so no stage can proceed on the
//! output of a failed tool.
//!
//! Shell pipelines are not used. A step that would pipe one program into
//! another writes an intermediate file instead, and a program whose output
//! goes to stdout has it captured into the invocation's `stdout` path.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

pub mod commands;

/// Longest stderr excerpt kept in an error message
const STDERR_EXCERPT: usize = 2000;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// One program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<OsString>,

    /// File that receives the program's stdout
    pub stdout: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    #[must_use]
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// First argument that follows `flag`, e.g. the value of `-o`
    #[must_use]
    pub fn value_of(&self, flag: &str) -> Option<&Path> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(Path::new)
    }

    /// Shell-like rendering for logs and error messages
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        if let Some(stdout) = &self.stdout {
            line.push_str(" > ");
            line.push_str(&stdout.to_string_lossy());
        }
        line
    }
}

/// How a finished program terminated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolStatus {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stderr: String,
}

impl ToolStatus {
    #[must_use]
    pub fn success() -> Self {
        Self {
            code: Some(0),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes external programs, blocking until each one terminates
pub trait ToolRunner {
    /// Run `invocation` to completion and report how it ended
    ///
    /// # Errors
    ///
    /// Returns an I/O error only when the program could not be started or its
    /// stdout file could not be created. A non-zero exit is not an error at
    /// this level.
    fn execute(&self, invocation: &ToolInvocation) -> std::io::Result<ToolStatus>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn execute(&self, invocation: &ToolInvocation) -> std::io::Result<ToolStatus> {
        (**self).execute(invocation)
    }
}

/// Run an invocation and require a zero exit status
///
/// # Errors
///
/// Returns `ToolError::Launch` if the program could not be started and
/// `ToolError::Failed` if it exited non-zero or was killed.
pub fn run_checked<R: ToolRunner + ?Sized>(
    runner: &R,
    invocation: &ToolInvocation,
) -> Result<(), ToolError> {
    debug!(command = %invocation.command_line(), "Running external tool");

    let status = runner
        .execute(invocation)
        .map_err(|source| ToolError::Launch {
            program: invocation.program.clone(),
            source,
        })?;

    if status.is_success() {
        return Ok(());
    }

    let status_text = status
        .code
        .map_or_else(|| "a signal".to_string(), |c| format!("status {c}"));
    Err(ToolError::Failed {
        command: invocation.command_line(),
        status: status_text,
        stderr: excerpt(&status.stderr),
    })
}

fn excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= STDERR_EXCERPT {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - STDERR_EXCERPT;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &trimmed[start..])
}

/// Runs programs as child processes inside a working directory
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    work_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }
}

impl ToolRunner for ProcessRunner {
    fn execute(&self, invocation: &ToolInvocation) -> std::io::Result<ToolStatus> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stderr(Stdio::piped());

        match &invocation.stdout {
            Some(path) => command.stdout(Stdio::from(File::create(path)?)),
            None => command.stdout(Stdio::null()),
        };

        let output = command.output()?;
        Ok(ToolStatus {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
