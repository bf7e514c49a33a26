//! Container conversion to Matroska (remuxing).
//!
//! This module provides [`Remuxer`], which copies the first video stream and,
//! when present, the first audio stream into `<input>.mkv` without
//! re-encoding. This is equivalent to
//! `ffmpeg -i input.mp4 -c copy -map 0:v:0 -map 0:a:0? input.mp4.mkv`.
//!
//! # Example
//!
//! ```no_run
//! use scenechapter::{Remuxer, SystemToolRunner, ToolPaths};
//!
//! let remuxed = Remuxer::new("input.mp4").run(&ToolPaths::default(), &SystemToolRunner)?;
//! assert!(remuxed.ends_with("input.mp4.mkv"));
//! # Ok::<(), scenechapter::SceneChapterError>(())
//! ```

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    configuration::ToolPaths,
    error::SceneChapterError,
    tool::{ExternalTool, ToolInvocation, ToolRunner},
};

/// Suffix appended to the input path to name the remuxed file.
pub const REMUX_SUFFIX: &str = ".mkv";

/// Lossless Matroska remuxer.
///
/// The output lives next to the input: the literal suffix `.mkv` is appended
/// to the full input path, so `clip.mp4` becomes `clip.mp4.mkv`.
#[derive(Debug, Clone)]
pub struct Remuxer {
    input_path: PathBuf,
    output_path: PathBuf,
}

impl Remuxer {
    /// Create a remuxer for `input`.
    ///
    /// The input is not checked here; a missing or unreadable file surfaces
    /// as an `ffmpeg` failure from [`run`](Remuxer::run).
    pub fn new<P: AsRef<Path>>(input: P) -> Self {
        let input_path = input.as_ref().to_path_buf();
        Self {
            output_path: remuxed_path(&input_path),
            input_path,
        }
    }

    /// The source file.
    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    /// Where the Matroska file will be written.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// The `ffmpeg` command line for this remux.
    pub fn invocation(&self, tools: &ToolPaths) -> ToolInvocation {
        ToolInvocation::new(ExternalTool::Ffmpeg, tools.program(ExternalTool::Ffmpeg))
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"])
            .arg("-i")
            .arg(&self.input_path)
            .args(["-c", "copy", "-map", "0:v:0", "-map", "0:a:0?"])
            .arg(&self.output_path)
    }

    /// Execute the remux and return the path of the new file.
    ///
    /// # Errors
    ///
    /// Returns [`SceneChapterError::ToolLaunch`] if `ffmpeg` cannot be
    /// started and [`SceneChapterError::ExternalTool`] if it exits non-zero.
    pub fn run(
        &self,
        tools: &ToolPaths,
        runner: &dyn ToolRunner,
    ) -> Result<PathBuf, SceneChapterError> {
        self.invocation(tools).run_checked(runner)?;
        log::debug!(
            "Remuxed {} -> {}",
            self.input_path.display(),
            self.output_path.display()
        );
        Ok(self.output_path.clone())
    }
}

/// `<input>.mkv`, by plain concatenation.
pub fn remuxed_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(REMUX_SUFFIX);
    PathBuf::from(name)
}
