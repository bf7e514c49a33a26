//! Chapter lists in the simple (OGM) text format and embedding them with
//! `mkvpropedit`.
//!
//! The file holds one pair of lines per chapter:
//!
//! ```text
//! CHAPTER01=00:00:00.000
//! CHAPTER01NAME=Chapter 01
//! CHAPTER02=00:00:02.000
//! CHAPTER02NAME=Chapter 02
//! ```
//!
//! The first chapter always starts at zero; every detected scene change adds
//! one more.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{
    configuration::ToolPaths,
    error::SceneChapterError,
    tool::{ExternalTool, ToolInvocation, ToolRunner},
};

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// Format milliseconds as `HH:MM:SS.mmm`.
///
/// Hours are not wrapped at 24; past 99 the field simply grows.
pub fn format_timestamp(millis: u64) -> String {
    let hours = millis / MILLIS_PER_HOUR;
    let minutes = (millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    let seconds = (millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
    let fraction = millis % MILLIS_PER_SECOND;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{fraction:03}")
}

/// Parse an `HH:MM:SS.mmm` timestamp back to milliseconds.
///
/// # Errors
///
/// Returns [`SceneChapterError::InvalidTimestamp`] unless the string has at
/// least two hour digits, two minute digits below 60, two second digits
/// below 60 and exactly three millisecond digits.
pub fn parse_timestamp(value: &str) -> Result<u64, SceneChapterError> {
    let invalid = || SceneChapterError::InvalidTimestamp(value.to_string());

    let (clock, fraction) = value.split_once('.').ok_or_else(invalid)?;
    let mut fields = clock.split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(invalid());
    };

    let digits = |field: &str, width: Option<usize>| -> Result<u64, SceneChapterError> {
        let width_ok = match width {
            Some(width) => field.len() == width,
            None => field.len() >= 2,
        };
        if !width_ok || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        field.parse::<u64>().map_err(|_| invalid())
    };

    let hours = digits(hours, None)?;
    let minutes = digits(minutes, Some(2))?;
    let seconds = digits(seconds, Some(2))?;
    let fraction = digits(fraction, Some(3))?;
    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }

    hours
        .checked_mul(MILLIS_PER_HOUR)
        .and_then(|total| total.checked_add(minutes * MILLIS_PER_MINUTE))
        .and_then(|total| total.checked_add(seconds * MILLIS_PER_SECOND + fraction))
        .ok_or_else(invalid)
}

/// Placeholder name for the chapter with 1-based `number`.
pub fn placeholder_name(number: usize) -> String {
    format!("Chapter {number:02}")
}

/// Check that `name` fits on a single `CHAPTERnnNAME=` line.
///
/// # Errors
///
/// Returns [`SceneChapterError::InvalidChapterName`] if `name` contains a
/// carriage return or line feed.
pub fn check_chapter_name(number: usize, name: &str) -> Result<(), SceneChapterError> {
    if name.contains(['\n', '\r']) {
        return Err(SceneChapterError::InvalidChapterName {
            number,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Truncate a millisecond position to whole milliseconds.
///
/// Negative and NaN positions clamp to zero.
fn truncate_millis(millis: f64) -> u64 {
    millis as u64
}

/// A single chapter marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterEntry {
    /// Start position in whole milliseconds.
    pub start_ms: u64,
    /// Display name.
    pub name: String,
}

impl ChapterEntry {
    /// Chapter starting at `start_ms`.
    pub fn new(start_ms: u64, name: impl Into<String>) -> Self {
        Self {
            start_ms,
            name: name.into(),
        }
    }

    /// Start position formatted as `HH:MM:SS.mmm`.
    pub fn timestamp(&self) -> String {
        format_timestamp(self.start_ms)
    }
}

/// An ordered chapter list, always starting with a chapter at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterList {
    entries: Vec<ChapterEntry>,
}

impl ChapterList {
    /// Build the list for the given scene-change positions.
    ///
    /// `names` are applied in order starting with the zero chapter; missing
    /// names fall back to [`placeholder_name`].
    pub fn from_scene_changes(timestamps_ms: &[f64], names: &[String]) -> Self {
        let starts = std::iter::once(0).chain(timestamps_ms.iter().copied().map(truncate_millis));
        let entries = starts
            .enumerate()
            .map(|(index, start_ms)| {
                let name = names
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| placeholder_name(index + 1));
                ChapterEntry::new(start_ms, name)
            })
            .collect();
        Self { entries }
    }

    /// The chapters, in order.
    pub fn entries(&self) -> &[ChapterEntry] {
        &self.entries
    }

    /// Number of chapters, including the zero chapter.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Only a list read from an empty file can be empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every chapter name with [`check_chapter_name`].
    ///
    /// # Errors
    ///
    /// Returns [`SceneChapterError::InvalidChapterName`] for the first name
    /// containing a line break.
    pub fn validate(&self) -> Result<(), SceneChapterError> {
        self.entries
            .iter()
            .enumerate()
            .try_for_each(|(index, entry)| check_chapter_name(index + 1, &entry.name))
    }

    /// Parse a chapter file produced by [`Display`] / [`write_to`](Self::write_to).
    ///
    /// # Errors
    ///
    /// Returns [`SceneChapterError::MalformedChapterFile`] when lines are out
    /// of sequence or not `CHAPTERnn=` / `CHAPTERnnNAME=` pairs, and
    /// [`SceneChapterError::InvalidTimestamp`] for a bad timestamp.
    pub fn parse(text: &str) -> Result<Self, SceneChapterError> {
        let mut entries = Vec::new();
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());

        while let Some((line_number, line)) = lines.next() {
            let number = entries.len() + 1;
            let time_key = format!("CHAPTER{number:02}=");
            let timestamp = line.strip_prefix(&time_key).ok_or_else(|| {
                SceneChapterError::MalformedChapterFile {
                    line: line_number,
                    reason: format!("expected {time_key}"),
                }
            })?;
            let start_ms = parse_timestamp(timestamp)?;

            let name_key = format!("CHAPTER{number:02}NAME=");
            let (name_line_number, name_line) =
                lines
                    .next()
                    .ok_or_else(|| SceneChapterError::MalformedChapterFile {
                        line: line_number,
                        reason: format!("missing {name_key} line"),
                    })?;
            let name = name_line.strip_prefix(&name_key).ok_or_else(|| {
                SceneChapterError::MalformedChapterFile {
                    line: name_line_number,
                    reason: format!("expected {name_key}"),
                }
            })?;

            entries.push(ChapterEntry::new(start_ms, name));
        }

        Ok(Self { entries })
    }

    /// Write the list to `path`, replacing any existing file.
    ///
    /// The file is flushed and closed before this returns. Names are checked
    /// first, so a list that would not parse back leaves `path` untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SceneChapterError::InvalidChapterName`] for a name with a
    /// line break and [`SceneChapterError::ChapterWrite`] on any I/O failure.
    pub fn write_to(&self, path: &Path) -> Result<(), SceneChapterError> {
        self.validate()?;
        let to_error = |source| SceneChapterError::ChapterWrite {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(to_error)?;
        let mut writer = BufWriter::new(file);
        write!(writer, "{self}").map_err(to_error)?;
        writer.flush().map_err(to_error)?;
        log::debug!("Wrote {} chapter(s) to {}", self.len(), path.display());
        Ok(())
    }
}

impl Display for ChapterList {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (index, entry) in self.entries.iter().enumerate() {
            let number = index + 1;
            writeln!(f, "CHAPTER{number:02}={}", entry.timestamp())?;
            writeln!(f, "CHAPTER{number:02}NAME={}", entry.name)?;
        }
        Ok(())
    }
}

/// The `mkvpropedit` command line that replaces the chapters of `container`
/// with those in `chapter_file`.
pub fn embed_invocation(container: &Path, chapter_file: &Path, tools: &ToolPaths) -> ToolInvocation {
    ToolInvocation::new(
        ExternalTool::Mkvpropedit,
        tools.program(ExternalTool::Mkvpropedit),
    )
    .arg(container)
    .arg("-c")
    .arg(chapter_file)
}

/// Builds chapter lists, writes them out and embeds them.
#[derive(Debug, Clone, Default)]
pub struct ChapterWriter {
    names: Vec<String>,
    tools: ToolPaths,
}

impl ChapterWriter {
    /// Writer with placeholder names and tools from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chapter names, applied in order from the zero chapter.
    #[must_use]
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    /// Use the given tool executables.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }

    /// Build the chapter list for `timestamps_ms`.
    pub fn build(&self, timestamps_ms: &[f64]) -> ChapterList {
        ChapterList::from_scene_changes(timestamps_ms, &self.names)
    }

    /// Build the list, write it to `chapter_file` and embed it into
    /// `container` in place.
    ///
    /// # Errors
    ///
    /// Returns [`SceneChapterError::InvalidChapterName`] for a name with a
    /// line break, [`SceneChapterError::ChapterWrite`] if the file cannot be
    /// written, or a tool error if `mkvpropedit` cannot run or fails.
    pub fn write_and_embed(
        &self,
        timestamps_ms: &[f64],
        chapter_file: &Path,
        container: &Path,
        runner: &dyn ToolRunner,
    ) -> Result<ChapterList, SceneChapterError> {
        let chapters = self.build(timestamps_ms);
        chapters.write_to(chapter_file)?;
        embed_invocation(container, chapter_file, &self.tools).run_checked(runner)?;
        Ok(chapters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_millis_clamps() {
        assert_eq!(truncate_millis(3499.9), 3499);
        assert_eq!(truncate_millis(-5.0), 0);
        assert_eq!(truncate_millis(f64::NAN), 0);
    }

    #[test]
    fn chapter_names_must_be_single_line() {
        assert!(check_chapter_name(1, "Intro - part one").is_ok());
        assert!(check_chapter_name(2, "").is_ok());
        for name in ["a\nb", "a\rb", "trailing\r\n"] {
            assert!(matches!(
                check_chapter_name(3, name),
                Err(SceneChapterError::InvalidChapterName { number: 3, .. })
            ));
        }
    }

    #[test]
    fn placeholder_names_are_numbered() {
        assert_eq!(placeholder_name(1), "Chapter 01");
        assert_eq!(placeholder_name(12), "Chapter 12");
    }
}
