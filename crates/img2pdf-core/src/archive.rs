//! Archiver: wrap the finished document in a single-entry ZIP.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;

use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::util::parent_dir;

/// Store `document` as the only entry of a deflated ZIP at `archive_path`.
///
/// The archive is written to a temporary file and renamed into place once
/// complete. Only then is the standalone document removed; on any error the
/// document is kept and no archive is left behind.
///
/// Returns the size of the archive in bytes.
pub fn archive_document(document: &Path, archive_path: &Path, entry_name: &str) -> Result<u64> {
    if entry_name.is_empty() {
        return Err(Error::Archive("archive entry name is empty".to_string()));
    }
    if document == archive_path {
        return Err(Error::Archive(format!(
            "archive path {} is the document itself",
            archive_path.display()
        )));
    }

    let mut source = File::open(document)
        .map_err(|e| Error::Archive(format!("failed to open {}: {e}", document.display())))?;
    let source_len = source
        .metadata()
        .map_err(|e| Error::Archive(format!("failed to stat {}: {e}", document.display())))?
        .len();

    let dir = parent_dir(archive_path);
    fs::create_dir_all(dir).map_err(|e| archive_io_error(archive_path, &e))?;
    let tmp = tempfile::Builder::new()
        .prefix(".img2pdf-")
        .suffix(".zip.part")
        .tempfile_in(dir)
        .map_err(|e| archive_io_error(archive_path, &e))?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(source_len >= u64::from(u32::MAX));

    let mut zip = ZipWriter::new(BufWriter::new(tmp));
    zip.start_file(entry_name, options)
        .map_err(|e| Error::Archive(format!("failed to start entry {entry_name}: {e}")))?;
    io::copy(&mut source, &mut zip).map_err(|e| archive_io_error(archive_path, &e))?;
    drop(source);

    let tmp = zip
        .finish()
        .map_err(|e| Error::Archive(format!("failed to finish archive: {e}")))?
        .into_inner()
        .map_err(|e| archive_io_error(archive_path, e.error()))?;
    let archive_len = tmp
        .as_file()
        .metadata()
        .map_err(|e| archive_io_error(archive_path, &e))?
        .len();

    tmp.persist(archive_path)
        .map_err(|e| archive_io_error(archive_path, &e.error))?;

    info!(
        "Archived {} as {} ({} -> {} bytes)",
        document.display(),
        archive_path.display(),
        source_len,
        archive_len
    );

    if let Err(e) = fs::remove_file(document) {
        warn!("Archive written but failed to remove {}: {}", document.display(), e);
    }

    Ok(archive_len)
}

fn archive_io_error(archive_path: &Path, e: &io::Error) -> Error {
    Error::Archive(format!("failed to write {}: {e}", archive_path.display()))
}
