use std::cell::RefCell;
use std::collections::VecDeque;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One external invocation: explicit program, argv, and working directory.
/// Untrusted strings (the engine version) only ever travel as single argv
/// elements, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.into(),
        }
    }

    pub fn rendered(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().replace('\\', "/")];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub success: bool,
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            status_code: Some(0),
            ..Self::default()
        }
    }

    pub fn failed(status_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: Some(status_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Short human-readable failure description for error messages.
    pub fn failure_reason(&self) -> String {
        let status = match self.status_code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        let detail = self.stderr.trim();
        if detail.is_empty() {
            status
        } else {
            format!("{status}: {detail}")
        }
    }
}

/// Capability seam for all external tools (tar, 7z, git). The pipeline's
/// decision logic is exercised in tests through [`RecordingRunner`] without
/// touching real binaries.
pub trait ProcessRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<ProcessOutput>;
}

/// Runs commands for real, capturing output so tool chatter stays out of the
/// console and failures can quote stderr.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<ProcessOutput> {
        log::debug!("exec: {} (cwd {})", spec.rendered(), spec.cwd.display());
        let output = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .output()?;
        Ok(ProcessOutput {
            success: output.status.success(),
            status_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Replaying fake: records every spec it is asked to run and answers from a
/// scripted queue, defaulting to success once the script is exhausted.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<CommandSpec>>,
    script: RefCell<VecDeque<ProcessOutput>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, output: ProcessOutput) {
        self.script.borrow_mut().push_back(output);
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<ProcessOutput> {
        self.calls.borrow_mut().push(spec.clone());
        Ok(self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(ProcessOutput::succeeded))
    }
}

/// Locate a binary by scanning PATH, resolving Windows launcher extensions.
pub fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path_var = env::var("PATH").ok()?;
    find_in_path_var(binary, &path_var)
}

fn find_in_path_var(binary: &str, path_var: &str) -> Option<PathBuf> {
    let names = if cfg!(windows) {
        vec![
            format!("{binary}.exe"),
            format!("{binary}.cmd"),
            binary.to_string(),
        ]
    } else {
        vec![binary.to_string()]
    };

    let separator = if cfg!(windows) { ';' } else { ':' };
    for part in path_var.split(separator) {
        let candidate_dir = PathBuf::from(strip_wrapping_quotes(part.trim()));
        if candidate_dir.as_os_str().is_empty() {
            continue;
        }
        for name in &names {
            let candidate = candidate_dir.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

fn strip_wrapping_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
}
