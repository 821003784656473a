//! Report output: target resolution, open/append policy, and the sink.
//!
//! Where reports go is decided once per run ([`OutputMode`]), then resolved
//! per image into an [`OutputTarget`]. The sink owns the open handles and the
//! overwrite bookkeeping; callers hand it a solution first and the star list
//! second, and the two chunks always land in the same target.

mod report;

pub use report::{render_solve, render_stars, ReportFormat};

use crate::error::Result;
use crate::types::{Solution, StarDetection};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Standard stream selector for report output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdout,
    Stderr,
}

/// Where reports go for the whole run. Decided once from the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// One derived file per image, named after the image
    PerImage,
    /// All images share one file
    Aggregate(PathBuf),
    /// All images write to a standard stream
    Stream(StdStream),
}

impl OutputMode {
    /// Interpret the CLI output argument: absent means per-image derived
    /// files, the special names `stdout`/`stderr` bind streams, anything
    /// else names an aggregate file.
    pub fn from_out_arg(out: Option<&str>) -> Self {
        match out {
            None => OutputMode::PerImage,
            Some("stdout") => OutputMode::Stream(StdStream::Stdout),
            Some("stderr") => OutputMode::Stream(StdStream::Stderr),
            Some(path) => OutputMode::Aggregate(PathBuf::from(path)),
        }
    }
}

/// A resolved report target for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    PerImageFile(PathBuf),
    AggregateFile(PathBuf),
    Stream(StdStream),
}

/// Report file name derived from an image name: the format suffix is
/// appended, so `m42.fits` becomes `m42.fits.txt` for the table format.
pub fn derived_report_path(image: &Path, format: ReportFormat) -> PathBuf {
    let mut name = image.as_os_str().to_os_string();
    name.push(format.suffix());
    PathBuf::from(name)
}

enum ActiveWriter {
    File(BufWriter<File>),
    Stream(StdStream),
}

impl ActiveWriter {
    fn write_all(&mut self, chunk: &[u8]) -> io::Result<()> {
        match self {
            ActiveWriter::File(w) => w.write_all(chunk),
            ActiveWriter::Stream(s) => write_stream(*s, chunk),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ActiveWriter::File(w) => w.flush(),
            ActiveWriter::Stream(StdStream::Stdout) => io::stdout().lock().flush(),
            ActiveWriter::Stream(StdStream::Stderr) => io::stderr().lock().flush(),
        }
    }
}

fn write_stream(stream: StdStream, chunk: &[u8]) -> io::Result<()> {
    match stream {
        StdStream::Stdout => io::stdout().lock().write_all(chunk),
        StdStream::Stderr => io::stderr().lock().write_all(chunk),
    }
}

/// Writes per-image reports to the run's configured target.
///
/// Overwrite semantics: in per-image mode a file is truncated on its first
/// write of the run and appended to afterwards; in aggregate mode the shared
/// file is truncated only when first opened, and every image after the first
/// appends. Standard streams are never closed. If a file cannot be opened
/// the sink falls back to stdout so a report is always visible somewhere.
pub struct OutputSink {
    mode: OutputMode,
    format: ReportFormat,
    overwrite: bool,
    /// Aggregate file existed before the run started; skip checks answer
    /// from this snapshot so mid-run writes never trigger skips.
    aggregate_preexisted: bool,
    /// Run-long aggregate handle (or its stdout fallback)
    aggregate: Option<ActiveWriter>,
    /// Writer for the image currently being reported (per-image mode)
    active: Option<ActiveWriter>,
    /// Per-image files already written this run, for truncate-on-first-write
    touched: HashSet<PathBuf>,
}

impl OutputSink {
    pub fn new(mode: OutputMode, format: ReportFormat, overwrite: bool) -> Self {
        let aggregate_preexisted =
            matches!(&mode, OutputMode::Aggregate(path) if path.exists());
        Self {
            mode,
            format,
            overwrite,
            aggregate_preexisted,
            aggregate: None,
            active: None,
            touched: HashSet::new(),
        }
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn mode(&self) -> &OutputMode {
        &self.mode
    }

    /// Resolve the report target for an image.
    pub fn resolve(&self, image: &Path) -> OutputTarget {
        match &self.mode {
            OutputMode::PerImage => {
                OutputTarget::PerImageFile(derived_report_path(image, self.format))
            }
            OutputMode::Aggregate(path) => OutputTarget::AggregateFile(path.clone()),
            OutputMode::Stream(stream) => OutputTarget::Stream(*stream),
        }
    }

    /// Skip-solved check: does an artifact for this image already exist?
    ///
    /// Streams never report an existing artifact.
    pub fn artifact_exists(&self, image: &Path) -> bool {
        match self.resolve(image) {
            OutputTarget::PerImageFile(path) => path.exists(),
            OutputTarget::AggregateFile(_) => self.aggregate_preexisted,
            OutputTarget::Stream(_) => false,
        }
    }

    /// Write the solve section for an image. Opens the image's target.
    pub fn write_solve_report(
        &mut self,
        image: &Path,
        date: DateTime<Utc>,
        solution: &Solution,
    ) -> Result<()> {
        let chunk = render_solve(self.format, image, date, solution)?;
        self.ensure_writer_for(image);
        self.write_chunk(chunk.as_bytes())?;
        Ok(())
    }

    /// Append the star section to the target opened by the solve report.
    pub fn append_star_report(&mut self, stars: &[StarDetection]) -> Result<()> {
        let chunk = render_stars(self.format, stars)?;
        self.write_chunk(chunk.as_bytes())?;
        Ok(())
    }

    /// Finish the current image: flush everything, close per-image files.
    ///
    /// The aggregate handle stays open for the rest of the run, flushed so a
    /// crash loses at most the in-flight image. Streams are never closed.
    pub fn finalize_image(&mut self) -> Result<()> {
        match &self.mode {
            OutputMode::PerImage => {
                if let Some(mut writer) = self.active.take() {
                    writer.flush()?;
                }
            }
            OutputMode::Aggregate(_) => {
                if let Some(writer) = self.aggregate.as_mut() {
                    writer.flush()?;
                }
            }
            OutputMode::Stream(stream) => {
                let mut w = ActiveWriter::Stream(*stream);
                w.flush()?;
            }
        }
        Ok(())
    }

    fn ensure_writer_for(&mut self, image: &Path) {
        match self.mode.clone() {
            OutputMode::PerImage => {
                let path = derived_report_path(image, self.format);
                self.open_per_image(path);
            }
            OutputMode::Aggregate(path) => self.ensure_aggregate_open(&path),
            OutputMode::Stream(_) => {}
        }
    }

    fn open_per_image(&mut self, path: PathBuf) {
        let first_touch = self.touched.insert(path.clone());
        let opened = if self.overwrite && first_touch {
            File::create(&path)
        } else {
            OpenOptions::new().create(true).append(true).open(&path)
        };
        self.active = Some(match opened {
            Ok(file) => ActiveWriter::File(BufWriter::new(file)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot open report file, falling back to stdout");
                ActiveWriter::Stream(StdStream::Stdout)
            }
        });
    }

    fn ensure_aggregate_open(&mut self, path: &Path) {
        if self.aggregate.is_some() {
            return;
        }
        // First open of the run; overwrite truncates exactly here, once.
        let opened = if self.overwrite {
            File::create(path)
        } else {
            OpenOptions::new().create(true).append(true).open(path)
        };
        self.aggregate = Some(match opened {
            Ok(file) => ActiveWriter::File(BufWriter::new(file)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot open aggregate report file, falling back to stdout");
                ActiveWriter::Stream(StdStream::Stdout)
            }
        });
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        match &self.mode {
            OutputMode::PerImage => match self.active.as_mut() {
                Some(writer) => writer.write_all(chunk),
                // Star section without a preceding solve section; keep the
                // report visible rather than dropping it.
                None => write_stream(StdStream::Stdout, chunk),
            },
            OutputMode::Aggregate(_) => match self.aggregate.as_mut() {
                Some(writer) => writer.write_all(chunk),
                None => write_stream(StdStream::Stdout, chunk),
            },
            OutputMode::Stream(stream) => write_stream(*stream, chunk),
        }
    }
}
