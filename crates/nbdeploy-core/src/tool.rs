//! External tool invocation
//!
//! Every external program (converter, typesetter, rasterizer) is configured as
//! a command prefix such as `["jupyter"]` or `["python", "-m", "jupyter"]`.
//! Running it yields a [`ToolOutcome`]; the caller decides whether a failure
//! is fatal or advisory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Result of running an external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The tool ran and exited successfully
    Success,
    /// The program could not be found
    Missing { program: String },
    /// The tool ran but failed, or could not be started
    Failed {
        /// Exit code, if the process exited normally
        status: Option<i32>,
        /// Captured standard error (or the spawn error)
        stderr: String,
    },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success)
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutcome::Success => write!(f, "ok"),
            ToolOutcome::Missing { program } => write!(f, "`{program}` not found"),
            ToolOutcome::Failed {
                status: Some(code),
                stderr,
            } => write!(f, "exited with status {code}{}", stderr_suffix(stderr)),
            ToolOutcome::Failed {
                status: None,
                stderr,
            } => write!(f, "terminated abnormally{}", stderr_suffix(stderr)),
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// A configured command prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    /// Create a command with no leading arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Create from a command array (e.g., `["pdflatex", "-interaction=nonstopmode"]`).
    ///
    /// Returns `None` if the slice is empty.
    pub fn from_slice<S: AsRef<str>>(cmd: &[S]) -> Option<Self> {
        let (program, args) = cmd.split_first()?;
        Some(Self {
            program: program.as_ref().to_string(),
            args: args.iter().map(|s| s.as_ref().to_string()).collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Locate the program on `PATH` (or relative to the working directory).
    pub fn locate(&self) -> Option<PathBuf> {
        which::which(&self.program).ok()
    }

    /// Run the command with extra arguments and wait for it to finish.
    ///
    /// Output is captured; standard error is kept for diagnostics.
    pub fn run<I, S>(&self, extra_args: I, cwd: Option<&Path>) -> ToolOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let Some(resolved) = self.locate() else {
            return ToolOutcome::Missing {
                program: self.program.clone(),
            };
        };

        let mut cmd = Command::new(resolved);
        cmd.args(&self.args)
            .args(extra_args)
            .stdin(Stdio::null());

        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        match cmd.output() {
            Ok(output) if output.status.success() => ToolOutcome::Success,
            Ok(output) => ToolOutcome::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ToolOutcome::Missing {
                program: self.program.clone(),
            },
            Err(e) => ToolOutcome::Failed {
                status: None,
                stderr: e.to_string(),
            },
        }
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// The external tools used during deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    /// Notebook converter, invoked as `<converter> nbconvert --to markdown <notebook>`
    pub converter: ToolCommand,
    /// Typesetter, invoked as `<typesetter> <file>.tex`
    pub typesetter: ToolCommand,
    /// Rasterizer, invoked as `<rasterizer> -density <dpi> <file>.pdf <file>.png`
    pub rasterizer: ToolCommand,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            converter: ToolCommand::new("jupyter"),
            typesetter: ToolCommand {
                program: "pdflatex".to_string(),
                args: vec![
                    "-interaction=nonstopmode".to_string(),
                    "-halt-on-error".to_string(),
                ],
            },
            rasterizer: ToolCommand::new("convert"),
        }
    }
}
