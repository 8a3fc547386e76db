//! Integration tests for img2pdf-core
//!
//! These tests verify the end-to-end workflow:
//! - Directory collection and explicit selections
//! - Page count, order and placement in the written PDF
//! - Size reduction and archiving of the result
//! - Partial success and failure reporting

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use img2pdf_core::{
    AppConfig, ConversionJob, Error, InputSelection, NoProgress, Outcome, PageSize, ReduceOutcome,
    Stage, convert,
};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tempfile::TempDir;
use zip::ZipArchive;

// =============================================================================
// Test Fixtures
// =============================================================================

#[allow(clippy::cast_possible_truncation)]
fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
        .save(&path)
        .unwrap_or_else(|e| panic!("Failed to write fixture {name}: {e}"));
    path
}

/// The three images of the reference scenario, in a fresh directory.
fn scenario_dir() -> (TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let images = vec![
        write_png(dir.path(), "1.png", 400, 300),
        write_png(dir.path(), "2.png", 1200, 900),
        write_png(dir.path(), "3.png", 800, 1100),
    ];
    (dir, images)
}

/// Pixel width of the image drawn on a page.
fn page_image_width(doc: &Document, page_id: ObjectId) -> i64 {
    let page = doc.get_dictionary(page_id).expect("page dictionary");
    let resources = page
        .get(b"Resources")
        .and_then(Object::as_dict)
        .expect("page resources");
    let image_id = resources
        .get(b"XObject")
        .and_then(Object::as_dict)
        .and_then(|x| x.get(b"Im0"))
        .and_then(Object::as_reference)
        .expect("image reference");
    doc.get_object(image_id)
        .and_then(Object::as_stream)
        .and_then(|s| s.dict.get(b"Width"))
        .and_then(Object::as_i64)
        .expect("image width")
}

/// Operands of the `cm` operator on a page: [w, 0, 0, h, x, y].
fn page_placement(doc: &Document, page_id: ObjectId) -> Vec<f32> {
    let content = Content::decode(&doc.get_page_content(page_id).expect("page content"))
        .expect("decodable content");
    content
        .operations
        .iter()
        .find(|op| op.operator == "cm")
        .expect("cm operator")
        .operands
        .iter()
        .map(|o| o.as_float().expect("numeric operand"))
        .collect()
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("readable dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// =============================================================================
// Pagination Tests
// =============================================================================

#[test]
fn test_reference_scenario_layout() {
    let (dir, _) = scenario_dir();
    let output = dir.path().join("output.pdf");
    let job = ConversionJob::new(InputSelection::Directory(dir.path().to_path_buf()), &output)
        .with_page_size(PageSize::LETTER);

    let report = convert(&job, &NoProgress).expect("conversion should succeed");
    assert!(report.is_complete());

    let doc = Document::load(&output).expect("valid PDF");
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 3);

    let placements: Vec<Vec<f32>> = pages.values().map(|&id| page_placement(&doc, id)).collect();
    assert_eq!(placements[0], vec![400.0, 0.0, 0.0, 300.0, 106.0, 246.0]);
    assert_eq!(placements[1], vec![612.0, 0.0, 0.0, 459.0, 0.0, 166.5]);
    assert_eq!(placements[2], vec![576.0, 0.0, 0.0, 792.0, 18.0, 0.0]);
}

#[test]
fn test_pages_follow_selection_order() {
    let (dir, images) = scenario_dir();
    let output = dir.path().join("picked.pdf");
    // Reverse of the directory order.
    let selection: Vec<PathBuf> = images.iter().rev().cloned().collect();
    let job = ConversionJob::new(InputSelection::Files(selection), &output);

    convert(&job, &NoProgress).expect("conversion should succeed");

    let doc = Document::load(&output).expect("valid PDF");
    let widths: Vec<i64> = doc
        .get_pages()
        .values()
        .map(|&id| page_image_width(&doc, id))
        .collect();
    assert_eq!(widths, vec![800, 1200, 400]);
}

#[test]
fn test_pages_use_configured_page_size() {
    let (dir, _) = scenario_dir();
    let output = dir.path().join("a4.pdf");
    let job = ConversionJob::new(InputSelection::Directory(dir.path().to_path_buf()), &output)
        .with_page_size(PageSize::A4);

    convert(&job, &NoProgress).expect("conversion should succeed");

    let doc = Document::load(&output).expect("valid PDF");
    for (_, page_id) in doc.get_pages() {
        let media_box: Vec<f32> = doc
            .get_dictionary(page_id)
            .and_then(|p| p.get(b"MediaBox"))
            .and_then(Object::as_array)
            .expect("media box")
            .iter()
            .map(|o| o.as_float().expect("numeric"))
            .collect();
        assert_eq!(media_box, vec![0.0, 0.0, 595.0, 842.0]);
    }
}

#[test]
fn test_progress_reaches_one() {
    let (dir, _) = scenario_dir();
    let job = ConversionJob::new(
        InputSelection::Directory(dir.path().to_path_buf()),
        dir.path().join("output.pdf"),
    );

    let seen = RefCell::new(Vec::new());
    let sink = |f: f64| seen.borrow_mut().push(f);
    convert(&job, &sink).expect("conversion should succeed");

    let seen = seen.into_inner();
    assert_eq!(seen.len(), 3);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert!((seen[2] - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_empty_directory_reports_no_images() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("notes.txt"), b"not an image").expect("write");
    let output = dir.path().join("output.pdf");
    let job = ConversionJob::new(InputSelection::Directory(dir.path().to_path_buf()), &output);

    let report = convert(&job, &NoProgress).expect("empty input is not an error");
    assert!(matches!(report.outcome, Outcome::NoImages));
    assert!(!output.exists());
    assert_eq!(report.message(), "No images found, nothing to convert");
}

#[test]
fn test_corrupt_image_fails_with_file_name() {
    let (dir, mut images) = scenario_dir();
    let broken = dir.path().join("broken.jpg");
    fs::write(&broken, b"\xFF\xD8 truncated").expect("write");
    images.insert(1, broken.clone());
    let output = dir.path().join("output.pdf");
    let job = ConversionJob::new(InputSelection::Files(images), &output);

    let err = convert(&job, &NoProgress).expect_err("corrupt image must fail the run");
    assert!(matches!(
        err,
        Error::Stage {
            stage: Stage::Paginating,
            ..
        }
    ));
    match err.root() {
        Error::ImageRead { path, .. } => assert_eq!(path, &broken),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("broken.jpg"));
    assert!(!output.exists());
}

// =============================================================================
// Size Reduction Tests
// =============================================================================

#[test]
fn test_within_threshold_document_is_untouched() {
    let (dir, images) = scenario_dir();
    let output = dir.path().join("output.pdf");
    let job = ConversionJob::new(InputSelection::Files(images), &output)
        .with_size_threshold(u64::MAX);

    let report = convert(&job, &NoProgress).expect("conversion should succeed");
    assert!(!report.stages.contains(&Stage::Reducing));

    // Calling the reducer directly leaves the bytes alone too.
    let before = fs::read(&output).expect("document");
    let outcome = img2pdf_core::reduce_if_oversized(&output, u64::MAX).expect("no-op");
    assert!(matches!(outcome, ReduceOutcome::WithinBudget { .. }));
    assert_eq!(fs::read(&output).expect("document"), before);
}

#[test]
fn test_oversized_document_is_rewritten() {
    let (dir, _) = scenario_dir();
    let output = dir.path().join("output.pdf");
    let job = ConversionJob::new(InputSelection::Directory(dir.path().to_path_buf()), &output)
        .with_size_threshold(1);

    let report = convert(&job, &NoProgress).expect("conversion should succeed");
    assert!(report.stages.contains(&Stage::Reducing));
    match report.outcome {
        Outcome::Completed { reduction, .. } => {
            assert!(matches!(reduction, Some(ReduceOutcome::Rewritten { .. })));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let doc = Document::load(&output).expect("rewritten PDF is valid");
    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(
        dir_entries(dir.path()),
        vec!["1.png", "2.png", "3.png", "output.pdf"]
    );
}

// =============================================================================
// Archiving Tests
// =============================================================================

#[test]
fn test_archive_contains_document() {
    let (dir, images) = scenario_dir();
    let output = dir.path().join("output.pdf");

    // Produce the document alone first to capture its bytes.
    let plain = ConversionJob::new(InputSelection::Files(images.clone()), &output);
    convert(&plain, &NoProgress).expect("conversion should succeed");
    let document_bytes = fs::read(&output).expect("document");

    let archived = ConversionJob::new(InputSelection::Files(images), &output).with_default_archive();
    let report = convert(&archived, &NoProgress).expect("conversion should succeed");

    let archive_path = dir.path().join("output.zip");
    assert_eq!(report.final_path(), Some(archive_path.as_path()));
    assert!(!output.exists(), "standalone document should be removed");

    let mut archive = ZipArchive::new(File::open(&archive_path).expect("archive")).expect("zip");
    assert_eq!(archive.len(), 1);
    let mut entry = archive.by_index(0).expect("entry");
    assert_eq!(entry.name(), "output.pdf");
    let mut extracted = Vec::new();
    entry.read_to_end(&mut extracted).expect("readable entry");
    assert_eq!(extracted, document_bytes);
}

#[test]
fn test_config_driven_run() {
    let (dir, _) = scenario_dir();
    let out_dir = dir.path().join("out");
    let config = AppConfig {
        output_name: "album".to_string(),
        output_dir: Some(out_dir.clone()),
        archive: true,
        archive_name: Some("photos.pdf".to_string()),
        max_size_mb: 0,
        ..Default::default()
    };

    let job = config
        .job(InputSelection::Directory(dir.path().to_path_buf()))
        .expect("valid config");
    let report = convert(&job, &NoProgress).expect("conversion should succeed");

    assert_eq!(
        report.stages,
        vec![
            Stage::Collecting,
            Stage::Paginating,
            Stage::Reducing,
            Stage::Archiving,
            Stage::Done
        ]
    );
    assert_eq!(dir_entries(&out_dir), vec!["album.zip"]);

    let archive = ZipArchive::new(File::open(out_dir.join("album.zip")).expect("archive"))
        .expect("zip");
    assert_eq!(archive.file_names().collect::<Vec<_>>(), vec!["photos.pdf"]);
}
