mod layout;
mod paginator;
mod rewrite;
mod source;

pub use layout::{PageLayout, PageSize};
pub use paginator::{PaginateOutcome, Paginator};
pub use rewrite::{ReduceOutcome, reduce_if_oversized, rewrite_pages};
pub use source::ImageReference;
