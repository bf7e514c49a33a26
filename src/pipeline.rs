//! The remux → probe → chapter pipeline.
//!
//! [`ScenePipeline::run`] performs the four stages strictly in sequence,
//! each blocking on its external tool:
//!
//! 1. prepare the output directory,
//! 2. remux the input to `<input>.mkv` with `ffmpeg`,
//! 3. probe the remuxed file with `ffprobe` and threshold YDIF,
//! 4. write the chapter file and embed it with `mkvpropedit`.
//!
//! The first failure aborts the run; later stages never see the output of a
//! failed one.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use scenechapter::{PipelineOptions, ScenePipeline, SystemToolRunner};
//!
//! let pipeline = ScenePipeline::new(PipelineOptions::new())?;
//! let report = pipeline.run(Path::new("input.mp4"), Path::new("out"), &SystemToolRunner)?;
//! println!("{} chapters in {}", report.chapters.len(), report.remuxed_path.display());
//! # Ok::<(), scenechapter::SceneChapterError>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    chapter::{ChapterList, ChapterWriter},
    configuration::PipelineOptions,
    error::SceneChapterError,
    remux::Remuxer,
    scene::{SceneChange, SceneDetector},
    tool::ToolRunner,
};

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// The Matroska file, now carrying the chapters.
    pub remuxed_path: PathBuf,
    /// The chapter definition file that was embedded.
    pub chapter_file: PathBuf,
    /// Frame records returned by the probe.
    pub frames_probed: usize,
    /// Detected scene changes, in frame order.
    pub scene_changes: Vec<SceneChange>,
    /// The chapters written, including the zero chapter.
    pub chapters: ChapterList,
}

/// A validated, reusable pipeline configuration.
#[derive(Debug, Clone)]
pub struct ScenePipeline {
    options: PipelineOptions,
}

impl ScenePipeline {
    /// Validate `options` and build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the error from [`PipelineOptions::validate`].
    pub fn new(options: PipelineOptions) -> Result<Self, SceneChapterError> {
        options.validate()?;
        Ok(Self { options })
    }

    /// The options this pipeline runs with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process `input`, placing the chapter file under `output_directory`
    /// unless an explicit chapter file was configured.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure: [`SceneChapterError::OutputDirectory`],
    /// a tool error from `ffmpeg`, `ffprobe` or `mkvpropedit`,
    /// [`SceneChapterError::ProbeOutput`] or
    /// [`SceneChapterError::ChapterWrite`].
    pub fn run(
        &self,
        input: &Path,
        output_directory: &Path,
        runner: &dyn ToolRunner,
    ) -> Result<PipelineReport, SceneChapterError> {
        fs::create_dir_all(output_directory).map_err(|source| {
            SceneChapterError::OutputDirectory {
                path: output_directory.to_path_buf(),
                source,
            }
        })?;
        let chapter_file = self.options.chapter_file_for(output_directory);
        let tools = self.options.tools();

        log::info!("Remuxing {}", input.display());
        let remuxed_path = Remuxer::new(input).run(tools, runner)?;

        log::info!("Probing {} for scene changes", remuxed_path.display());
        let threshold = self.options.effective_threshold();
        let detection = SceneDetector::new(threshold)
            .with_tools(tools.clone())
            .detect(&remuxed_path, runner)?;

        log::info!("Embedding chapters from {}", chapter_file.display());
        let chapters = ChapterWriter::new()
            .with_names(self.options.chapter_names().to_vec())
            .with_tools(tools.clone())
            .write_and_embed(
                &detection.timestamps_ms(),
                &chapter_file,
                &remuxed_path,
                runner,
            )?;

        Ok(PipelineReport {
            remuxed_path,
            chapter_file,
            frames_probed: detection.frames_probed,
            scene_changes: detection.changes,
            chapters,
        })
    }
}
