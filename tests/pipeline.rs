//! Pipeline integration tests driven by a synthetic render backend.
//!
//! These exercise the full convert path (validation, staging, compositing,
//! the quality search and the atomic write) without needing pdfium.
//!
//! Run with:
//!   cargo test --test pipeline

use edgequake_pdf2img::{
    composite, convert_to_file, convert_with_backend, ConversionConfig, ConversionProgressCallback,
    ErrorKind, JpegCodec, MergeOrientation, PageSelection, PageSource, Pdf2ImgError, QualityCodec,
    RasterImage, RenderBackend, SearchOutcome, StagingMode, APP_WORKSPACE_GREY, DEFAULT_QUALITY,
};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Synthetic backend ────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Fill {
    Solid,
    Noise,
}

struct FakeBackend {
    pages: Vec<(u32, u32)>,
    fill: Fill,
    fail_on: Option<usize>,
    password: Option<&'static str>,
}

impl FakeBackend {
    fn new(pages: Vec<(u32, u32)>) -> Self {
        Self {
            pages,
            fill: Fill::Solid,
            fail_on: None,
            password: None,
        }
    }
}

struct FakeDocument<'a> {
    backend: &'a FakeBackend,
}

impl RenderBackend for FakeBackend {
    fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Box<dyn PageSource + 'a>, Pdf2ImgError> {
        if let Some(expected) = self.password {
            match password {
                None => {
                    return Err(Pdf2ImgError::PasswordRequired {
                        path: path.to_path_buf(),
                    })
                }
                Some(p) if p != expected => {
                    return Err(Pdf2ImgError::WrongPassword {
                        path: path.to_path_buf(),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(Box::new(FakeDocument { backend: self }))
    }
}

impl PageSource for FakeDocument<'_> {
    fn page_count(&self) -> usize {
        self.backend.pages.len()
    }

    fn render_page(&self, index: usize, _dpi: u32) -> Result<RasterImage, Pdf2ImgError> {
        if self.backend.fail_on == Some(index) {
            return Err(Pdf2ImgError::RasterisationFailed {
                page: index + 1,
                detail: "synthetic failure".to_string(),
            });
        }
        let (w, h) = self.backend.pages[index];
        Ok(page_image(w, h, index as u32, self.backend.fill))
    }
}

fn page_image(w: u32, h: u32, seed: u32, fill: Fill) -> RasterImage {
    let img = match fill {
        Fill::Solid => RgbImage::from_pixel(w, h, Rgb([250, 250, 250 - (seed as u8 % 50)])),
        Fill::Noise => {
            let mut state = 0x2545_F491u32.wrapping_add(seed);
            RgbImage::from_fn(w, h, |_, _| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let b = state.to_le_bytes();
                Rgb([b[0], b[1], b[2]])
            })
        }
    };
    RasterImage::from_dynamic(DynamicImage::ImageRgb8(img))
}

// ── Test helpers ─────────────────────────────────────────────────────────────

struct Workspace {
    dir: TempDir,
    input: PathBuf,
    output: PathBuf,
    staging: PathBuf,
}

/// A temp dir holding a stub `%PDF` input, an output path and a staging parent.
fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.pdf");
    let mut f = std::fs::File::create(&input).unwrap();
    f.write_all(b"%PDF-1.7\n%stub\n").unwrap();

    let staging = dir.path().join("staging");
    std::fs::create_dir_all(&staging).unwrap();

    Workspace {
        output: dir.path().join("out").join("doc.jpg"),
        input,
        staging,
        dir,
    }
}

fn config(ws: &Workspace) -> edgequake_pdf2img::ConversionConfigBuilder {
    ConversionConfig::builder().staging_dir(&ws.staging)
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

#[derive(Default)]
struct Recorder {
    started: AtomicUsize,
    rendered: Mutex<Vec<(usize, u32, u32)>>,
    canvas: Mutex<Option<(u32, u32)>>,
    attempts: AtomicU32,
    completed: Mutex<Option<(u64, u8)>>,
}

impl ConversionProgressCallback for Recorder {
    fn on_conversion_start(&self, total_pages: usize) {
        self.started.store(total_pages, Ordering::SeqCst);
    }
    fn on_page_rendered(&self, page_num: usize, _total: usize, width: u32, height: u32) {
        self.rendered.lock().unwrap().push((page_num, width, height));
    }
    fn on_canvas_ready(&self, width: u32, height: u32) {
        *self.canvas.lock().unwrap() = Some((width, height));
    }
    fn on_encode_attempt(&self, _quality: u8, _size_bytes: u64) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }
    fn on_conversion_complete(&self, output_bytes: u64, quality: u8) {
        *self.completed.lock().unwrap() = Some((output_bytes, quality));
    }
}

// ── Canvas geometry ──────────────────────────────────────────────────────────

#[test]
fn three_pages_stack_vertically() {
    let ws = workspace();
    let backend = FakeBackend::new(vec![(1000, 1400); 3]);
    let cfg = config(&ws).target_size_kb(100_000.0).build().unwrap();

    let report = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap();

    assert_eq!((report.canvas_width, report.canvas_height), (1000, 4200));
    assert_eq!(report.total_pages, 3);
    assert_eq!(report.stitched_pages, 3);
    assert_eq!(report.outcome, SearchOutcome::FastPath);
    assert_eq!(report.quality, DEFAULT_QUALITY);
    assert_eq!(report.encode_attempts, 0);

    let written = image::open(&ws.output).unwrap();
    assert_eq!(written.dimensions(), (1000, 4200));
    assert_eq!(
        std::fs::metadata(&ws.output).unwrap().len(),
        report.output_size_bytes
    );
}

#[test]
fn horizontal_merge_sums_widths() {
    let ws = workspace();
    let backend = FakeBackend::new(vec![(300, 400), (200, 500)]);
    let cfg = config(&ws)
        .orientation(MergeOrientation::Horizontal)
        .target_size_kb(100_000.0)
        .build()
        .unwrap();

    let report = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap();
    assert_eq!((report.canvas_width, report.canvas_height), (500, 500));
}

#[test]
fn single_page_round_trips_dimensions() {
    let ws = workspace();
    let backend = FakeBackend::new(vec![(612, 792)]);
    let cfg = config(&ws).target_size_kb(100_000.0).build().unwrap();

    let report = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap();
    assert_eq!((report.canvas_width, report.canvas_height), (612, 792));
    assert_eq!(image::open(&ws.output).unwrap().dimensions(), (612, 792));
}

#[test]
fn page_selection_stitches_in_document_order() {
    let ws = workspace();
    let backend = FakeBackend::new(vec![(100, 100), (200, 300), (150, 50)]);
    let cfg = config(&ws)
        .pages(PageSelection::Set(vec![3, 2]))
        .target_size_kb(100_000.0)
        .build()
        .unwrap();

    let report = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap();
    assert_eq!(report.stitched_pages, 2);
    assert_eq!((report.canvas_width, report.canvas_height), (200, 350));
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[test]
fn empty_document_is_invalid_input_and_writes_nothing() {
    let ws = workspace();
    let backend = FakeBackend::new(vec![]);
    let cfg = config(&ws).build().unwrap();

    let err = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap_err();
    assert!(matches!(err, Pdf2ImgError::EmptyDocument { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(!ws.output.exists());
}

#[test]
fn selection_outside_document_is_invalid_input() {
    let ws = workspace();
    let backend = FakeBackend::new(vec![(10, 10); 2]);
    let cfg = config(&ws).pages(PageSelection::Single(9)).build().unwrap();

    let err = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap_err();
    match err {
        Pdf2ImgError::PageOutOfRange { page, total } => assert_eq!((page, total), (9, 2)),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!ws.output.exists());
}

#[test]
fn missing_input_is_invalid_input() {
    let ws = workspace();
    let backend = FakeBackend::new(vec![(10, 10)]);
    let cfg = config(&ws).build().unwrap();

    let err =
        convert_with_backend(&backend, ws.dir.path().join("nope.pdf"), &ws.output, &cfg).unwrap_err();
    assert!(matches!(err, Pdf2ImgError::FileNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn negative_target_is_rejected_before_rendering() {
    let ws = workspace();
    let backend = FakeBackend::new(vec![(10, 10)]);
    let mut cfg = config(&ws).build().unwrap();
    cfg.target_size_kb = -5.0;

    let err = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap_err();
    assert!(matches!(err, Pdf2ImgError::InvalidTargetSize { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn render_failure_aborts_and_cleans_up_disk_staging() {
    let ws = workspace();
    let mut backend = FakeBackend::new(vec![(50, 60); 3]);
    backend.fail_on = Some(1);
    let cfg = config(&ws).staging(StagingMode::Disk).build().unwrap();

    let err = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap_err();
    assert!(matches!(err, Pdf2ImgError::RasterisationFailed { page: 2, .. }));
    assert_eq!(err.kind(), ErrorKind::RenderFailure);
    assert!(!ws.output.exists());
    assert!(is_empty_dir(&ws.staging), "staging artifacts left behind");
}

#[test]
fn write_failure_after_canvas_is_staged_cleans_up() {
    let ws = workspace();
    // a directory where the JPEG should go makes the final rename fail
    std::fs::create_dir_all(ws.output.join("occupied")).unwrap();
    let backend = FakeBackend::new(vec![(40, 30); 2]);
    let cfg = config(&ws)
        .staging(StagingMode::Disk)
        .target_size_kb(100_000.0)
        .build()
        .unwrap();

    let err = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap_err();
    assert!(matches!(err, Pdf2ImgError::OutputWriteFailed { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::IoFailure);
    assert!(ws.output.is_dir(), "destination replaced");
    assert!(is_empty_dir(&ws.staging), "combined image left behind");

    let siblings: Vec<_> = std::fs::read_dir(ws.output.parent().unwrap())
        .unwrap()
        .collect();
    assert_eq!(siblings.len(), 1, "temp output file left behind");
}

#[test]
fn password_is_forwarded_to_backend() {
    let ws = workspace();
    let mut backend = FakeBackend::new(vec![(10, 10)]);
    backend.password = Some("secret");

    let cfg = config(&ws).build().unwrap();
    let err = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap_err();
    assert!(matches!(err, Pdf2ImgError::PasswordRequired { .. }));

    let cfg = config(&ws).password("wrong").build().unwrap();
    let err = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap_err();
    assert!(matches!(err, Pdf2ImgError::WrongPassword { .. }));

    let cfg = config(&ws)
        .password("secret")
        .target_size_kb(100_000.0)
        .build()
        .unwrap();
    assert!(convert_with_backend(&backend, &ws.input, &ws.output, &cfg).is_ok());
}

// ── Staging modes ────────────────────────────────────────────────────────────

#[test]
fn disk_staging_matches_memory_geometry_and_cleans_up() {
    let backend = FakeBackend::new(vec![(120, 80), (100, 90)]);

    let ws_mem = workspace();
    let mem_cfg = config(&ws_mem).target_size_kb(100_000.0).build().unwrap();
    let mem = convert_with_backend(&backend, &ws_mem.input, &ws_mem.output, &mem_cfg).unwrap();

    let ws_disk = workspace();
    let disk_cfg = config(&ws_disk)
        .staging(StagingMode::Disk)
        .target_size_kb(100_000.0)
        .build()
        .unwrap();
    let disk = convert_with_backend(&backend, &ws_disk.input, &ws_disk.output, &disk_cfg).unwrap();

    assert_eq!(
        (mem.canvas_width, mem.canvas_height),
        (disk.canvas_width, disk.canvas_height)
    );
    assert_eq!(disk.staging, StagingMode::Disk);
    assert!(disk.source_size_bytes > 0);
    assert!(disk.cleanup_warnings.is_empty());
    assert!(is_empty_dir(&ws_disk.staging));
    assert!(ws_disk.output.exists());
}

// ── Size search ──────────────────────────────────────────────────────────────

#[test]
fn oversized_canvas_is_searched_down() {
    let ws = workspace();
    let mut backend = FakeBackend::new(vec![(320, 240)]);
    backend.fill = Fill::Noise;

    // Measure what the default encode of this canvas weighs.
    let canvas = composite(
        vec![page_image(320, 240, 0, Fill::Noise)],
        MergeOrientation::Vertical,
        APP_WORKSPACE_GREY,
    )
    .unwrap();
    let default_size = JpegCodec
        .encode(canvas.as_dynamic(), DEFAULT_QUALITY)
        .unwrap()
        .len() as u64;
    let target_kb = (default_size / 2) as f64 / 1024.0;

    let recorder = Arc::new(Recorder::default());
    let cfg = config(&ws)
        .target_size_kb(target_kb)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let report = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap();

    assert_ne!(report.outcome, SearchOutcome::FastPath);
    assert!((1..=7).contains(&report.encode_attempts));
    assert_eq!(report.source_size_bytes, default_size);
    assert_eq!(recorder.attempts.load(Ordering::SeqCst), report.encode_attempts);
    assert_eq!(
        std::fs::metadata(&ws.output).unwrap().len(),
        report.output_size_bytes
    );
    if report.outcome == SearchOutcome::WithinWindow {
        assert!(report.within_target());
    }
}

#[test]
fn progress_events_follow_the_pipeline() {
    let ws = workspace();
    let backend = FakeBackend::new(vec![(40, 30), (40, 20)]);
    let recorder = Arc::new(Recorder::default());
    let cfg = config(&ws)
        .target_size_kb(100_000.0)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let report = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap();

    assert_eq!(recorder.started.load(Ordering::SeqCst), 2);
    assert_eq!(
        *recorder.rendered.lock().unwrap(),
        vec![(1, 40, 30), (2, 40, 20)]
    );
    assert_eq!(*recorder.canvas.lock().unwrap(), Some((40, 50)));
    assert_eq!(
        *recorder.completed.lock().unwrap(),
        Some((report.output_size_bytes, report.quality))
    );
}

#[test]
fn report_serialises_to_json() {
    let ws = workspace();
    let backend = FakeBackend::new(vec![(10, 10)]);
    let cfg = config(&ws).target_size_kb(100_000.0).build().unwrap();
    let report = convert_with_backend(&backend, &ws.input, &ws.output, &cfg).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcome"], "FastPath");
    assert_eq!(json["canvas_width"], 10);
    assert!(json.get("cleanup_warnings").is_none());
}

// ── Async wrapper ────────────────────────────────────────────────────────────

#[test]
fn async_wrapper_reports_missing_input() {
    let ws = workspace();
    let cfg = config(&ws).build().unwrap();
    let missing = ws.dir.path().join("missing.pdf");

    let err = tokio_test::block_on(convert_to_file(&missing, &ws.output, &cfg)).unwrap_err();
    assert!(matches!(err, Pdf2ImgError::FileNotFound { .. }));
    assert!(!ws.output.exists());
}
