//! Error types for the `scenechapter` crate.
//!
//! This module defines [`SceneChapterError`], the unified error type returned
//! by all fallible operations in the crate. Errors carry the tool name, exit
//! status or file path involved so the binary can report them without extra
//! logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use serde_json::Error as JsonError;
use thiserror::Error;

use crate::tool::{ExitStatusInfo, ExternalTool};

/// The unified error type for all `scenechapter` operations.
///
/// Every public function that can fail returns `Result<T, SceneChapterError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SceneChapterError {
    /// An external tool ran but reported failure.
    #[error("{tool} failed with {status}")]
    ExternalTool {
        /// The tool that failed.
        tool: ExternalTool,
        /// How the process terminated.
        status: ExitStatusInfo,
        /// Trailing stderr output captured from the tool, if any.
        stderr: String,
    },

    /// An external tool could not be started at all (missing binary,
    /// permission denied).
    #[error("Failed to launch {tool} ({program}): {source}")]
    ToolLaunch {
        /// The tool that could not be launched.
        tool: ExternalTool,
        /// The executable that was attempted.
        program: String,
        /// Underlying spawn error.
        source: IoError,
    },

    /// The frame-statistics probe produced output that is not valid JSON.
    #[error("Failed to parse probe output: {0}")]
    ProbeOutput(#[from] JsonError),

    /// A scene-change threshold that cannot be compared against.
    #[error("Invalid threshold {0}: must be a finite, non-negative number")]
    InvalidThreshold(f64),

    /// A bit depth outside the range the probe statistic supports.
    #[error("Unsupported bit depth {0}: expected 8 to 16 bits per sample")]
    UnsupportedBitDepth(u8),

    /// A chapter timestamp string that is not `HH:MM:SS.mmm`.
    #[error("Invalid chapter timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// A chapter name that would break the one-line-per-field file layout.
    #[error("Chapter {number} name contains a line break: {name:?}")]
    InvalidChapterName {
        /// 1-based chapter number.
        number: usize,
        /// The offending name.
        name: String,
    },

    /// A chapter file line that does not follow the `CHAPTERnn` layout.
    #[error("Malformed chapter file at line {line}: {reason}")]
    MalformedChapterFile {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// The output directory could not be prepared.
    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDirectory {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: IoError,
    },

    /// The chapter file could not be written.
    #[error("Failed to write chapter file {path}: {source}")]
    ChapterWrite {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: IoError,
    },
}

impl SceneChapterError {
    /// The external tool involved in this error, if any.
    pub fn tool(&self) -> Option<ExternalTool> {
        match self {
            SceneChapterError::ExternalTool { tool, .. }
            | SceneChapterError::ToolLaunch { tool, .. } => Some(*tool),
            _ => None,
        }
    }
}
