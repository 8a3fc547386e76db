//! Paginator: one page per image, written through a temporary file.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use super::layout::{PageLayout, PageSize};
use super::source::ImageReference;
use crate::error::{Error, Result};
use crate::progress::{CancelToken, ProgressSink, fraction};
use crate::util::{display_name, parent_dir};

/// Resource name of the image drawn on each page.
const IMAGE_RESOURCE: &[u8] = b"Im0";

/// Result of a pagination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginateOutcome {
    /// Nothing to convert; no file was created
    NoInput,
    /// The document was written to `path`
    Written { path: PathBuf, pages: usize },
}

/// Builds a PDF from a list of images, one page per image.
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    page_size: PageSize,
    cancel: Option<CancelToken>,
}

impl Paginator {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            cancel: None,
        }
    }

    /// Stop between images once `token` is cancelled.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Write `images`, in order, to `output`.
    ///
    /// The output file is only created once every page has been built and
    /// saved; any failure leaves `output` as it was.
    pub fn write(
        &self,
        images: &[PathBuf],
        output: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<PaginateOutcome> {
        if images.is_empty() {
            info!("No images to convert");
            return Ok(PaginateOutcome::NoInput);
        }

        let total = images.len();
        info!("Converting {} images into {}", total, output.display());

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(total);

        for (i, path) in images.iter().enumerate() {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                info!("Cancelled after {} of {} images", i, total);
                return Err(Error::Cancelled { completed: i, total });
            }

            let image = ImageReference::open(path)?;
            let layout = image.layout(self.page_size);
            debug!(
                "Page {}: {} ({}x{}) drawn at {}x{} +{}+{}",
                i + 1,
                display_name(path),
                image.width(),
                image.height(),
                layout.scaled_width,
                layout.scaled_height,
                layout.x_offset,
                layout.y_offset
            );

            let page_id = self.add_page(&mut doc, pages_id, &image, &layout)?;
            kids.push(Object::Reference(page_id));

            progress.report(fraction(i + 1, total));
        }

        #[allow(clippy::cast_possible_wrap)]
        let count = kids.len() as i64;
        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        save_document(&mut doc, output)?;
        info!("Wrote {} pages to {}", total, output.display());

        Ok(PaginateOutcome::Written {
            path: output.to_path_buf(),
            pages: total,
        })
    }

    /// Add one page showing `image` placed according to `layout`.
    fn add_page(
        &self,
        doc: &mut Document,
        pages_id: ObjectId,
        image: &ImageReference,
        layout: &PageLayout,
    ) -> Result<ObjectId> {
        let embedded = image.embed()?;

        let mut image_stream = embedded.image;
        if let Some(smask) = embedded.smask {
            let smask_id = doc.add_object(smask);
            image_stream.dict.set("SMask", Object::Reference(smask_id));
        }
        let image_id = doc.add_object(image_stream);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(layout.scaled_width),
                        0.into(),
                        0.into(),
                        Object::Real(layout.scaled_height),
                        Object::Real(layout.x_offset),
                        Object::Real(layout.y_offset),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content.encode().map_err(|e| Error::Write {
            path: image.path().to_path_buf(),
            reason: format!("failed to encode page content: {e}"),
        })?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content_bytes));

        let resources = Dictionary::from_iter([(
            "XObject",
            Object::Dictionary(Dictionary::from_iter([(
                "Im0",
                Object::Reference(image_id),
            )])),
        )]);

        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
            (
                "MediaBox",
                Object::Array(vec![
                    0.into(),
                    0.into(),
                    Object::Real(self.page_size.width),
                    Object::Real(self.page_size.height),
                ]),
            ),
        ]));

        Ok(page_id)
    }
}

/// Save `doc` to `output` via a temporary file in the same directory.
pub(crate) fn save_document(doc: &mut Document, output: &Path) -> Result<()> {
    let write_error = |reason: String| Error::Write {
        path: output.to_path_buf(),
        reason,
    };

    let dir = parent_dir(output);
    fs::create_dir_all(dir).map_err(|e| write_error(e.to_string()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".img2pdf-")
        .suffix(".pdf.part")
        .tempfile_in(dir)
        .map_err(|e| write_error(e.to_string()))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        doc.save_to(&mut writer)
            .map_err(|e| write_error(format!("failed to save PDF: {e}")))?;
        writer.flush().map_err(|e| write_error(e.to_string()))?;
    }

    tmp.persist(output)
        .map_err(|e| write_error(e.error.to_string()))?;

    Ok(())
}
