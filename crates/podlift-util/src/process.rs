use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Output};

use crate::errors::PodliftError;

/// Builder for constructing and executing external processes.
///
/// The manifest loader uses this to shell out to CocoaPods
/// (`pod ipc spec`, `pod ipc podfile-json`) and capture the JSON it emits.
pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<String>,
}

impl CommandBuilder {
    /// Create a new builder for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory for the child process.
    pub fn cwd(mut self, dir: impl Into<String>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Execute the command and return its output.
    pub fn exec(&self) -> Result<Output, PodliftError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        if let Some(ref dir) = self.cwd {
            cmd.current_dir(Path::new(dir));
        }
        cmd.output().map_err(PodliftError::from)
    }

    /// Execute the command and return captured stdout as a string.
    ///
    /// A non-zero exit status is an error carrying the trimmed stderr.
    pub fn exec_stdout(&self) -> Result<String, PodliftError> {
        let output = self.exec()?;
        if !output.status.success() {
            return Err(PodliftError::Generic {
                message: format!(
                    "`{}` failed: {}",
                    self.program,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
