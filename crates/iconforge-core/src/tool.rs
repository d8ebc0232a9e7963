//! External command-line tool invocation
//!
//! The validator, previewer and device bridge are all blocking
//! subprocess calls. They go through [`ToolRunner`] so callers can be
//! driven by scripted output in tests.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Captured result of one tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` if the process was terminated by a signal
    pub status: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ToolOutput {
    /// Successful exit with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed exit with the given code and stdout
    pub fn failed(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Exited with code 0
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout.trim_end_matches('\n'), self.stderr)
        }
    }
}

/// Runs an external program to completion
pub trait ToolRunner {
    /// Run `program` with `args` and capture its output
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<ToolOutput>;
}

/// [`ToolRunner`] backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<ToolOutput> {
        debug!(program = %program.display(), ?args, "Running tool");
        let output = Command::new(program).args(args).output()?;

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, program: &Path, args: &[String]) -> std::io::Result<ToolOutput> {
        (**self).run(program, args)
    }
}

/// Platform executable file name for a tool
pub fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Path of `name` inside `dir`, or the bare name for a PATH lookup
pub fn tool_path(dir: Option<&Path>, name: &str) -> PathBuf {
    let file = executable_name(name);
    match dir {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output() {
        let output = ToolOutput {
            status: Some(1),
            stdout: "{\"a\":1}\n".into(),
            stderr: "warning".into(),
        };
        assert_eq!(output.combined(), "{\"a\":1}\nwarning");
        assert!(!output.success());
        assert!(ToolOutput::ok("").success());
    }

    #[test]
    fn test_tool_path() {
        let path = tool_path(Some(Path::new("/tools")), "icon-converter");
        assert!(path.starts_with("/tools"));
        assert!(path.to_string_lossy().contains("icon-converter"));
        assert_eq!(tool_path(None, "mldb"), PathBuf::from(executable_name("mldb")));
    }
}
