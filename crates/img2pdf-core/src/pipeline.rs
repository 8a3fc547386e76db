//! The conversion pipeline: collect, paginate, reduce if oversized, archive
//! if requested.
//!
//! Collection and pagination failures fail the run. Once a document exists, a
//! failure while reducing or archiving leaves that document in place and the
//! run ends as a partial success.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::archive::archive_document;
use crate::collect::{collect_from_dir, collect_from_list};
use crate::error::{Error, Result};
use crate::pdf::{PageSize, PaginateOutcome, Paginator, ReduceOutcome, reduce_if_oversized};
use crate::progress::{CancelToken, ProgressSink};
use crate::util::display_name;

/// Default size above which the document is rewritten (10 MiB).
pub const DEFAULT_SIZE_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Pipeline steps, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Collecting,
    Paginating,
    Reducing,
    Archiving,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Collecting => "collecting images",
            Self::Paginating => "building the PDF",
            Self::Reducing => "reducing the PDF size",
            Self::Archiving => "archiving the PDF",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Where the images come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSelection {
    /// Every image directly inside a directory, sorted by name
    Directory(PathBuf),
    /// An explicit list, used in the given order
    Files(Vec<PathBuf>),
}

impl InputSelection {
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        match self {
            Self::Directory(dir) => collect_from_dir(dir),
            Self::Files(files) => Ok(collect_from_list(files.iter().cloned())),
        }
    }
}

/// Where and under what name the document is archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    pub path: PathBuf,
    pub entry_name: String,
}

impl ArchiveRequest {
    /// `<document stem>.zip` next to the document, holding it under its own
    /// file name.
    pub fn for_document(document: &Path) -> Self {
        Self {
            path: document.with_extension("zip"),
            entry_name: display_name(document),
        }
    }
}

/// Everything one conversion run needs.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub inputs: InputSelection,
    pub output: PathBuf,
    pub page_size: PageSize,
    /// Size in bytes above which the document is rewritten
    pub size_threshold: u64,
    pub archive: Option<ArchiveRequest>,
    pub cancel: Option<CancelToken>,
}

impl ConversionJob {
    pub fn new(inputs: InputSelection, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            page_size: PageSize::default(),
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            archive: None,
            cancel: None,
        }
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub const fn with_size_threshold(mut self, bytes: u64) -> Self {
        self.size_threshold = bytes;
        self
    }

    #[must_use]
    pub fn with_archive(mut self, request: ArchiveRequest) -> Self {
        self.archive = Some(request);
        self
    }

    /// Archive next to the output, see [`ArchiveRequest::for_document`].
    #[must_use]
    pub fn with_default_archive(self) -> Self {
        let request = ArchiveRequest::for_document(&self.output);
        self.with_archive(request)
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum Outcome {
    /// There were no images; no file was created
    NoImages,
    /// Every requested step succeeded; `path` is the deliverable
    Completed {
        path: PathBuf,
        pages: usize,
        reduction: Option<ReduceOutcome>,
        archived: bool,
    },
    /// The document was produced but a later step failed
    Partial {
        document: PathBuf,
        pages: usize,
        stage: Stage,
        error: Error,
    },
}

/// Outcome of a run plus the stages it went through.
#[derive(Debug)]
pub struct ConversionReport {
    pub outcome: Outcome,
    pub stages: Vec<Stage>,
}

impl ConversionReport {
    /// The file the user should pick up, if any.
    pub fn final_path(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::NoImages => None,
            Outcome::Completed { path, .. } => Some(path),
            Outcome::Partial { document, .. } => Some(document),
        }
    }

    pub const fn is_complete(&self) -> bool {
        matches!(self.outcome, Outcome::Completed { .. })
    }

    /// A one-line summary suitable for showing to the user.
    pub fn message(&self) -> String {
        match &self.outcome {
            Outcome::NoImages => "No images found, nothing to convert".to_string(),
            Outcome::Completed {
                path,
                pages,
                reduction,
                archived,
            } => {
                let kind = if *archived { "Archive" } else { "PDF" };
                let mut message = format!("{kind} with {pages} pages saved to {}", path.display());
                if let Some(ReduceOutcome::Rewritten { before, after }) = reduction {
                    message.push_str(&format!(" (rewritten from {before} to {after} bytes)"));
                }
                message
            }
            Outcome::Partial {
                document,
                stage,
                error,
                ..
            } => {
                let missing = match stage {
                    Stage::Reducing => "not size-reduced",
                    Stage::Archiving => "not archived",
                    _ => "not finished",
                };
                format!(
                    "PDF saved to {}, {missing}: {}",
                    document.display(),
                    error.root()
                )
            }
        }
    }
}

/// Run `job` to completion.
///
/// Returns `Err` only when no document was produced (collection or
/// pagination failed, or the run was cancelled). The error is wrapped in
/// [`Error::Stage`] naming the failed step.
pub fn convert(job: &ConversionJob, progress: &dyn ProgressSink) -> Result<ConversionReport> {
    let mut stages = vec![Stage::Collecting];
    debug!("Stage: {}", Stage::Collecting);
    let images = job
        .inputs
        .collect()
        .map_err(|e| e.in_stage(Stage::Collecting))?;
    info!("Collected {} images", images.len());

    stages.push(Stage::Paginating);
    debug!("Stage: {}", Stage::Paginating);
    let mut paginator = Paginator::new(job.page_size);
    if let Some(token) = &job.cancel {
        paginator = paginator.with_cancel(token.clone());
    }
    let (document, pages) = match paginator
        .write(&images, &job.output, progress)
        .map_err(|e| e.in_stage(Stage::Paginating))?
    {
        PaginateOutcome::NoInput => {
            stages.push(Stage::Done);
            return Ok(ConversionReport {
                outcome: Outcome::NoImages,
                stages,
            });
        }
        PaginateOutcome::Written { path, pages } => (path, pages),
    };

    Ok(post_process(job, document, pages, stages))
}

/// Reduce and archive a document that has already been written.
///
/// Failures here never lose the document; they end the run as
/// [`Outcome::Partial`] with [`Stage::Failed`] as the last recorded stage.
fn post_process(
    job: &ConversionJob,
    document: PathBuf,
    pages: usize,
    mut stages: Vec<Stage>,
) -> ConversionReport {
    let partial = |mut stages: Vec<Stage>, stage: Stage, error: Error| {
        warn!("{} failed, keeping {}: {}", stage, document.display(), error);
        stages.push(Stage::Failed);
        ConversionReport {
            outcome: Outcome::Partial {
                document: document.clone(),
                pages,
                stage,
                error: error.in_stage(stage),
            },
            stages,
        }
    };

    let size = match fs::metadata(&document) {
        Ok(meta) => meta.len(),
        Err(e) => {
            stages.push(Stage::Reducing);
            let error = Error::Reduction(format!("failed to stat {}: {e}", document.display()));
            return partial(stages, Stage::Reducing, error);
        }
    };

    let mut reduction = None;
    if size > job.size_threshold {
        stages.push(Stage::Reducing);
        debug!("Stage: {}", Stage::Reducing);
        match reduce_if_oversized(&document, job.size_threshold) {
            Ok(outcome) => reduction = Some(outcome),
            Err(e) => return partial(stages, Stage::Reducing, e),
        }
    } else {
        debug!(
            "{} bytes is within the {} byte threshold, not reducing",
            size, job.size_threshold
        );
    }

    let (path, archived) = match &job.archive {
        Some(request) => {
            stages.push(Stage::Archiving);
            debug!("Stage: {}", Stage::Archiving);
            if let Err(e) = archive_document(&document, &request.path, &request.entry_name) {
                return partial(stages, Stage::Archiving, e);
            }
            (request.path.clone(), true)
        }
        None => (document.clone(), false),
    };

    stages.push(Stage::Done);
    info!("Conversion finished: {}", path.display());

    ConversionReport {
        outcome: Outcome::Completed {
            path,
            pages,
            reduction,
            archived,
        },
        stages,
    }
}
