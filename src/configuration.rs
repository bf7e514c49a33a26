//! Pipeline configuration.
//!
//! [`PipelineOptions`] is a builder that threads the scene-change threshold,
//! chapter naming, the chapter file location and the external tool paths
//! through a run without growing every function signature.
//!
//! # Example
//!
//! ```no_run
//! use scenechapter::{PipelineOptions, ToolPaths};
//!
//! let options = PipelineOptions::new()
//!     .with_bit_depth(10)
//!     .with_chapter_names(["Cold open", "Title card"])
//!     .with_tools(ToolPaths::from_env());
//! ```

use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{chapter::check_chapter_name, error::SceneChapterError, tool::ExternalTool};

/// YDIF threshold for 8-bit sources.
pub const DEFAULT_THRESHOLD: f64 = 25.0;

/// Bit depth the default threshold is calibrated for.
pub const DEFAULT_BIT_DEPTH: u8 = 8;

/// File name used for the chapter file when no explicit path is set.
pub const DEFAULT_CHAPTER_FILE_NAME: &str = "chapters.txt";

/// Executables for the three external tools.
///
/// Each defaults to the bare program name so it is resolved through `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// Remuxer executable.
    pub ffmpeg: OsString,
    /// Probe executable.
    pub ffprobe: OsString,
    /// Chapter editor executable.
    pub mkvpropedit: OsString,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: ExternalTool::Ffmpeg.default_program().into(),
            ffprobe: ExternalTool::Ffprobe.default_program().into(),
            mkvpropedit: ExternalTool::Mkvpropedit.default_program().into(),
        }
    }
}

impl ToolPaths {
    /// Defaults, overridden by the `FFMPEG`, `FFPROBE` and `MKVPROPEDIT`
    /// environment variables when they are set and non-empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var_os(name))
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let resolve = |tool: ExternalTool| {
            lookup(tool.env_var())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| tool.default_program().into())
        };
        Self {
            ffmpeg: resolve(ExternalTool::Ffmpeg),
            ffprobe: resolve(ExternalTool::Ffprobe),
            mkvpropedit: resolve(ExternalTool::Mkvpropedit),
        }
    }

    /// The executable configured for `tool`.
    pub fn program(&self, tool: ExternalTool) -> &OsString {
        match tool {
            ExternalTool::Ffmpeg => &self.ffmpeg,
            ExternalTool::Ffprobe => &self.ffprobe,
            ExternalTool::Mkvpropedit => &self.mkvpropedit,
        }
    }
}

/// Settings for one pipeline run.
///
/// All fields have defaults matching the classic behaviour: 8-bit threshold
/// of 25.0, placeholder chapter names, `chapters.txt` in the output
/// directory, tools from `PATH`.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub(crate) threshold: f64,
    pub(crate) bit_depth: u8,
    pub(crate) chapter_file: Option<PathBuf>,
    pub(crate) chapter_names: Vec<String>,
    pub(crate) tools: ToolPaths,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            bit_depth: DEFAULT_BIT_DEPTH,
            chapter_file: None,
            chapter_names: Vec::new(),
            tools: ToolPaths::default(),
        }
    }

    /// Set the YDIF threshold, expressed on the 8-bit scale.
    ///
    /// A frame is a scene change when its YDIF is strictly greater than the
    /// effective threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Declare the source bit depth.
    ///
    /// YDIF is reported in sample units, so the 8-bit threshold is scaled by
    /// `2^(bit_depth - 8)`. Accepted range is 8 to 16.
    #[must_use]
    pub fn with_bit_depth(mut self, bit_depth: u8) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    /// Write the chapter file to `path` instead of the output directory.
    #[must_use]
    pub fn with_chapter_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.chapter_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Supply chapter names in order, starting with the zero chapter.
    ///
    /// Chapters beyond the supplied names get placeholders.
    #[must_use]
    pub fn with_chapter_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chapter_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the external tool executables.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }

    /// The threshold actually compared against, after bit-depth scaling.
    pub fn effective_threshold(&self) -> f64 {
        let shift = i32::from(self.bit_depth.saturating_sub(DEFAULT_BIT_DEPTH));
        self.threshold * 2f64.powi(shift)
    }

    /// Configured chapter names.
    pub fn chapter_names(&self) -> &[String] {
        &self.chapter_names
    }

    /// Configured tool executables.
    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    /// Where the chapter file goes for a run writing into `output_directory`.
    pub fn chapter_file_for(&self, output_directory: &Path) -> PathBuf {
        self.chapter_file
            .clone()
            .unwrap_or_else(|| output_directory.join(DEFAULT_CHAPTER_FILE_NAME))
    }

    /// Check the options before any tool runs.
    ///
    /// # Errors
    ///
    /// Returns [`SceneChapterError::InvalidThreshold`] for a NaN, infinite or
    /// negative threshold, [`SceneChapterError::UnsupportedBitDepth`] for a
    /// bit depth outside 8..=16 and [`SceneChapterError::InvalidChapterName`]
    /// for a chapter name containing a line break.
    pub fn validate(&self) -> Result<(), SceneChapterError> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(SceneChapterError::InvalidThreshold(self.threshold));
        }
        if !(8..=16).contains(&self.bit_depth) {
            return Err(SceneChapterError::UnsupportedBitDepth(self.bit_depth));
        }
        self.chapter_names
            .iter()
            .enumerate()
            .try_for_each(|(index, name)| check_chapter_name(index + 1, name))
    }
}
