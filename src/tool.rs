//! External tool invocation.
//!
//! Every stage of the pipeline shells out to one of three programs:
//! `ffmpeg` for the remux, `ffprobe` for the per-frame statistics and
//! `mkvpropedit` for embedding chapters. This module describes a single
//! invocation ([`ToolInvocation`]), what came back ([`ToolOutput`]) and the
//! [`ToolRunner`] seam that actually spawns processes.
//!
//! [`SystemToolRunner`] is the real implementation. Tests substitute their
//! own runner to script exit statuses and probe output without any of the
//! tools installed.

use std::{
    ffi::{OsStr, OsString},
    fmt::{Display, Formatter, Result as FmtResult},
    process::{Command, ExitStatus, Stdio},
};

use crate::error::SceneChapterError;

/// Number of trailing stderr lines kept on a failed invocation.
const STDERR_TAIL_LINES: usize = 20;

/// The external programs the pipeline depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalTool {
    /// Stream-copy remuxer.
    Ffmpeg,
    /// Frame-statistics probe.
    Ffprobe,
    /// Matroska chapter editor.
    Mkvpropedit,
}

impl ExternalTool {
    /// Default executable name, resolved through `PATH`.
    pub fn default_program(self) -> &'static str {
        match self {
            ExternalTool::Ffmpeg => "ffmpeg",
            ExternalTool::Ffprobe => "ffprobe",
            ExternalTool::Mkvpropedit => "mkvpropedit",
        }
    }

    /// Environment variable that overrides the executable.
    pub fn env_var(self) -> &'static str {
        match self {
            ExternalTool::Ffmpeg => "FFMPEG",
            ExternalTool::Ffprobe => "FFPROBE",
            ExternalTool::Mkvpropedit => "MKVPROPEDIT",
        }
    }
}

impl Display for ExternalTool {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.default_program())
    }
}

/// How an external process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatusInfo {
    /// Normal exit with the given code.
    Code(i32),
    /// Killed by a signal (Unix only).
    Signal(i32),
    /// Neither a code nor a signal was reported.
    Unknown,
}

impl ExitStatusInfo {
    /// Returns `true` for a zero exit code.
    pub fn success(self) -> bool {
        self == ExitStatusInfo::Code(0)
    }

    /// The exit code, if the process exited normally.
    pub fn code(self) -> Option<i32> {
        match self {
            ExitStatusInfo::Code(code) => Some(code),
            _ => None,
        }
    }
}

impl From<ExitStatus> for ExitStatusInfo {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitStatusInfo::Code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitStatusInfo::Signal(signal);
            }
        }

        ExitStatusInfo::Unknown
    }
}

impl Display for ExitStatusInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ExitStatusInfo::Code(code) => write!(f, "exit code {code}"),
            ExitStatusInfo::Signal(signal) => write!(f, "signal {signal}"),
            ExitStatusInfo::Unknown => f.write_str("unknown exit status"),
        }
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Termination status.
    pub status: ExitStatusInfo,
    /// Everything written to stdout.
    pub stdout: Vec<u8>,
    /// Everything written to stderr.
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// A successful run with the given stdout.
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            status: ExitStatusInfo::Code(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// A run that exited with `code` and wrote `stderr`.
    pub fn failure(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            status: ExitStatusInfo::Code(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    /// The last few lines of stderr, lossily decoded.
    pub fn stderr_tail(&self) -> String {
        let text = String::from_utf8_lossy(&self.stderr);
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
        lines[start..].join("\n")
    }
}

/// A fully-specified command line for one external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Which tool this runs.
    pub tool: ExternalTool,
    /// Executable name or path.
    pub program: OsString,
    /// Arguments, in order.
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    /// Start an invocation of `tool` through `program`.
    pub fn new(tool: ExternalTool, program: impl Into<OsString>) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    /// Run through `runner` and turn a non-zero exit into
    /// [`SceneChapterError::ExternalTool`].
    pub fn run_checked(&self, runner: &dyn ToolRunner) -> Result<ToolOutput, SceneChapterError> {
        log::info!("Running {self}");
        let output = runner.run(self)?;
        if !output.status.success() {
            let stderr = output.stderr_tail();
            log::debug!("{} stderr:\n{stderr}", self.tool);
            return Err(SceneChapterError::ExternalTool {
                tool: self.tool,
                status: output.status,
                stderr,
            });
        }
        Ok(output)
    }
}

impl Display for ToolInvocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&shell_quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

/// Quote `value` for display as a POSIX shell word.
fn shell_quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    if value.bytes().all(|b| {
        matches!(b,
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' |
            b'_' | b'-' | b'.' | b'/' | b':' | b'@' | b'%' | b'=' | b'?' | b',')
    }) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            quoted.push_str("'\"'\"'");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

/// Executes [`ToolInvocation`]s.
///
/// Implementations block until the process has finished. A process that
/// starts and exits non-zero is *not* an error at this layer; it is
/// reported through [`ToolOutput::status`] and turned into an error by
/// [`ToolInvocation::run_checked`].
pub trait ToolRunner {
    /// Run the invocation to completion and capture its output.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, SceneChapterError>;
}

/// Spawns real processes with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, SceneChapterError> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| SceneChapterError::ToolLaunch {
                tool: invocation.tool,
                program: invocation.program.to_string_lossy().into_owned(),
                source,
            })?;

        Ok(ToolOutput {
            status: output.status.into(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
