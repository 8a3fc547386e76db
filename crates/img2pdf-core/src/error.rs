use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// Unified error type for img2pdf-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Input collection (directory listing)
/// - Image decoding and PDF writing
/// - Size reduction and archiving
/// - Configuration operations (loading, validation)
///
/// An empty input set is not an error; it is reported as an outcome.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Collection Errors
    // ==========================================================================
    /// Failed to list an input directory
    #[error("failed to read input directory {}: {reason}", path.display())]
    Collect { path: PathBuf, reason: String },

    // ==========================================================================
    // Pagination Errors
    // ==========================================================================
    /// An input image could not be opened or decoded
    #[error("failed to read image {}: {reason}", path.display())]
    ImageRead { path: PathBuf, reason: String },

    /// The output document could not be written
    #[error("failed to write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    /// The run was cancelled between two images
    #[error("conversion cancelled after {completed} of {total} images")]
    Cancelled { completed: usize, total: usize },

    // ==========================================================================
    // Post-processing Errors
    // ==========================================================================
    /// Rewriting an oversized document failed; the original is untouched
    #[error("size reduction failed: {0}")]
    Reduction(String),

    /// Archiving failed; the document file is untouched
    #[error("archiving failed: {0}")]
    Archive(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Unrecognized page size
    #[error("invalid page size '{0}' (expected letter, legal, a4, a5 or WxH in points)")]
    InvalidPageSize(String),

    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // Pipeline Errors
    // ==========================================================================
    /// A pipeline step failed and the run stopped there
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the pipeline step it happened in.
    pub fn in_stage(self, stage: Stage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The step-local error, looking through any `Stage` wrapper.
    pub fn root(&self) -> &Self {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
