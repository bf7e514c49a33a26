//! # scenechapter
//!
//! Remux a video to Matroska and insert chapter markers at probable scene
//! changes.
//!
//! Scene changes are found with the YDIF statistic of FFmpeg's
//! `signalstats` filter: the mean luminance difference between a frame and
//! the one before it. A large value most likely means a cut. The work is
//! split over three external programs, run one after another:
//!
//! - `ffmpeg` copies the first video and audio streams into `<input>.mkv`,
//! - `ffprobe` reports YDIF for every frame of that file as JSON,
//! - `mkvpropedit` embeds a chapter file with one chapter per detected cut.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use scenechapter::{PipelineOptions, ScenePipeline, SystemToolRunner};
//!
//! let pipeline = ScenePipeline::new(PipelineOptions::new())?;
//! let report = pipeline.run(Path::new("input.mp4"), Path::new("out"), &SystemToolRunner)?;
//! for entry in report.chapters.entries() {
//!     println!("{} {}", entry.timestamp(), entry.name);
//! }
//! # Ok::<(), scenechapter::SceneChapterError>(())
//! ```
//!
//! ## Building Blocks
//!
//! Each stage is usable on its own: [`Remuxer`], [`SceneDetector`] (with the
//! pure [`select_scene_changes`]) and [`ChapterWriter`] / [`ChapterList`].
//! All external processes go through the [`ToolRunner`] trait, so a caller
//! can substitute its own runner.
//!
//! ## Requirements
//!
//! `ffmpeg`, `ffprobe` and `mkvpropedit` (MKVToolNix) must be installed. Set
//! `FFMPEG`, `FFPROBE` or `MKVPROPEDIT` to point at specific binaries and use
//! [`ToolPaths::from_env`].

pub mod chapter;
pub mod configuration;
pub mod error;
pub mod pipeline;
pub mod probe;
pub mod remux;
pub mod scene;
pub mod tool;

pub use chapter::{
    ChapterEntry, ChapterList, ChapterWriter, check_chapter_name, format_timestamp, parse_timestamp,
};
pub use configuration::{DEFAULT_THRESHOLD, PipelineOptions, ToolPaths};
pub use error::SceneChapterError;
pub use pipeline::{PipelineReport, ScenePipeline};
pub use probe::{FrameSample, decode_frame_samples};
pub use remux::Remuxer;
pub use scene::{SceneChange, SceneDetection, SceneDetector, select_scene_changes};
pub use tool::{
    ExitStatusInfo, ExternalTool, SystemToolRunner, ToolInvocation, ToolOutput, ToolRunner,
};
