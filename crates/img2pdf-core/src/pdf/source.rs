//! Input images: header inspection and conversion to PDF image XObjects.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{DynamicImage, ImageReader};
use lopdf::{Dictionary, Object, Stream};

use super::layout::{PageLayout, PageSize};
use crate::error::{Error, Result};

/// An input image whose header has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    path: PathBuf,
    width: u32,
    height: u32,
}

/// Image data ready to be added to a document.
pub(crate) struct EmbeddedImage {
    pub image: Stream,
    /// Soft mask carrying the alpha channel, if the source had one
    pub smask: Option<Stream>,
}

impl ImageReference {
    /// Read the intrinsic pixel dimensions of an image without decoding it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let (width, height) = ImageReader::open(path)
            .map_err(|e| read_error(path, e))?
            .with_guessed_format()
            .map_err(|e| read_error(path, e))?
            .into_dimensions()
            .map_err(|e| read_error(path, e))?;

        if width == 0 || height == 0 {
            return Err(read_error(path, "image has no pixels"));
        }

        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Placement of this image on a page of the given size.
    pub fn layout(&self, page: PageSize) -> PageLayout {
        PageLayout::fit(self.width, self.height, page)
    }

    /// Decode the pixels and build the image XObject stream(s).
    pub(crate) fn embed(&self) -> Result<EmbeddedImage> {
        let decoded = ImageReader::open(&self.path)
            .map_err(|e| read_error(&self.path, e))?
            .with_guessed_format()
            .map_err(|e| read_error(&self.path, e))?
            .decode()
            .map_err(|e| read_error(&self.path, e))?;

        let color = decoded.color();
        let (pixels, color_space) = if color.has_color() {
            (decoded.to_rgb8().into_raw(), "DeviceRGB")
        } else {
            (decoded.to_luma8().into_raw(), "DeviceGray")
        };

        let smask = if color.has_alpha() {
            Some(self.image_stream(&alpha_channel(&decoded), "DeviceGray")?)
        } else {
            None
        };

        Ok(EmbeddedImage {
            image: self.image_stream(&pixels, color_space)?,
            smask,
        })
    }

    fn image_stream(&self, samples: &[u8], color_space: &str) -> Result<Stream> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(samples)
            .map_err(|e| read_error(&self.path, e))?;
        let compressed = encoder.finish().map_err(|e| read_error(&self.path, e))?;

        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(self.width))),
            ("Height", Object::Integer(i64::from(self.height))),
            ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(b"FlateDecode".to_vec())),
        ]);

        // Already compressed, keep lopdf from compressing it again
        Ok(Stream::new(dict, compressed).with_compression(false))
    }
}

fn alpha_channel(image: &DynamicImage) -> Vec<u8> {
    image.to_rgba8().pixels().map(|p| p.0[3]).collect()
}

fn read_error(path: &Path, reason: impl ToString) -> Error {
    Error::ImageRead {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
