//! img2pdf Core Library
//!
//! This library batches image files into a single PDF document:
//! - Input collection (directory scan or explicit selection)
//! - Pagination: one centered, fitted image per page
//! - Size reduction of oversized documents
//! - Single-entry ZIP archiving of the result
//!
//! [`convert`] runs all steps for a [`ConversionJob`].

pub mod archive;
pub mod collect;
pub mod config;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod progress;
pub mod util;

pub use archive::archive_document;
pub use collect::{IMAGE_EXTENSIONS, collect_from_dir, collect_from_list, is_image_path};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use pdf::{
    ImageReference, PageLayout, PageSize, PaginateOutcome, Paginator, ReduceOutcome,
    reduce_if_oversized,
};
pub use pipeline::{
    ArchiveRequest, ConversionJob, ConversionReport, DEFAULT_SIZE_THRESHOLD, InputSelection,
    Outcome, Stage, convert,
};
pub use progress::{CancelToken, NoProgress, ProgressSink};
