//! CLI binary for edgequake-pdf2img.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2img::{
    convert_to_file, inspect, ConversionConfig, ConversionProgressCallback, MergeOrientation,
    PageSelection, ProgressCallback, SearchOutcome, StagingMode,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a page counter while rendering, then a
/// spinner reporting each quality probe while encoding.
struct CliProgressCallback {
    bar: ProgressBar,
    attempts: AtomicU32,
}

impl CliProgressCallback {
    /// Spinner-only until `on_conversion_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            attempts: AtomicU32::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Stitching {total_pages} pages…"))
        ));
    }

    fn on_page_rendered(&self, page_num: usize, _total_pages: usize, width: u32, height: u32) {
        self.bar.println(format!(
            "  {} Page {:>3}  {}",
            green("✓"),
            page_num,
            dim(&format!("{width}×{height} px")),
        ));
        self.bar.inc(1);
    }

    fn on_canvas_ready(&self, width: u32, height: u32) {
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        self.bar.set_style(spinner_style);
        self.bar.set_prefix("Encoding");
        self.bar
            .set_message(format!("canvas {width}×{height} px, searching quality…"));
    }

    fn on_encode_attempt(&self, quality: u8, size_bytes: u64) {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.bar.set_message(format!(
            "attempt {n}: q={quality} → {}",
            format_kb(size_bytes)
        ));
    }

    fn on_conversion_complete(&self, _output_bytes: u64, _quality: u8) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Stitch all pages into document.jpg (500 KB target)
  pdf2img document.pdf

  # 1.5 MB target, explicit output path
  pdf2img -s 1536 document.pdf -o scan.jpg

  # First three pages side by side at 150 DPI
  pdf2img --pages 1-3 --orientation horizontal --dpi 150 slides.pdf

  # Stage intermediate pages on disk instead of in memory
  pdf2img --stage-on-disk large.pdf

  # Inspect PDF metadata only
  pdf2img --inspect-only document.pdf

  # Machine-readable report
  pdf2img --json document.pdf > report.json

SIZE TARGET:
  The output is searched into the window [target − tolerance, target].
  When the default-quality JPEG is already smaller than the target it is
  written as-is. 1 KB = 1024 bytes.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  PDF2IMG_*         Every flag has a matching variable, e.g. PDF2IMG_TARGET_SIZE
  RUST_LOG          Override log filter (e.g. RUST_LOG=edgequake_pdf2img=debug)
"#;

/// Stitch every page of a PDF into one JPEG that fits a target file size.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Stitch every page of a PDF into one JPEG that fits a target file size",
    long_about = "Render each page of a PDF with pdfium, stack the pages into a single \
canvas and binary-search the JPEG quality so the written file lands just under the \
requested size.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Output JPEG path. Default: <input stem>.jpg next to the input.
    #[arg(short, long, env = "PDF2IMG_OUTPUT")]
    output: Option<PathBuf>,

    /// Target output size in KB (1 KB = 1024 bytes).
    #[arg(short = 's', long, env = "PDF2IMG_TARGET_SIZE", default_value_t = 500.0,
          value_parser = parse_target_kb)]
    target_size: f64,

    /// Width of the acceptance window below the target, in KB.
    #[arg(long, env = "PDF2IMG_TOLERANCE", default_value_t = 10)]
    tolerance_kb: u64,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDF2IMG_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Merge axis: vertical (pages stacked) or horizontal (side by side).
    #[arg(long, env = "PDF2IMG_ORIENTATION", value_enum, default_value = "vertical")]
    orientation: OrientationArg,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2IMG_PAGES", default_value = "all")]
    pages: String,

    /// Canvas fill colour behind pages, as RRGGBB hex.
    #[arg(long, env = "PDF2IMG_BACKGROUND", default_value = "ABABAB",
          value_parser = parse_background)]
    background: [u8; 3],

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2IMG_PASSWORD")]
    password: Option<String>,

    /// Write intermediate page images to a temp directory instead of memory.
    #[arg(long, env = "PDF2IMG_STAGE_ON_DISK")]
    stage_on_disk: bool,

    /// Print the ConversionReport (or metadata) as JSON on stdout.
    #[arg(long, env = "PDF2IMG_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMG_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrientationArg {
    Vertical,
    Horizontal,
}

impl From<OrientationArg> for MergeOrientation {
    fn from(v: OrientationArg) -> Self {
        match v {
            OrientationArg::Vertical => MergeOrientation::Vertical,
            OrientationArg::Horizontal => MergeOrientation::Horizontal,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
            for (i, (w, h)) in meta.page_sizes_pt.iter().enumerate() {
                println!("  page {:>3}:   {:.0} × {:.0} pt", i + 1, w, h);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    // ── Run conversion ───────────────────────────────────────────────────
    let report = convert_to_file(&cli.input, &output_path, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        let mark = if report.within_target() || report.outcome == SearchOutcome::FastPath {
            green("✔")
        } else {
            yellow("⚠")
        };
        eprintln!(
            "{}  {} pages  {}×{} px  →  {}",
            mark,
            report.stitched_pages,
            report.canvas_width,
            report.canvas_height,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {} at q={}  (target {}, {} attempts, {})  {}ms",
            bold(&format_kb(report.output_size_bytes)),
            report.quality,
            format_kb(report.target_size_bytes),
            report.encode_attempts,
            describe_outcome(report.outcome),
            report.total_duration_ms,
        );
        for w in &report.cleanup_warnings {
            eprintln!("   {} could not remove {}", yellow("⚠"), dim(w));
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = parse_pages(&cli.pages)?;
    let staging = if cli.stage_on_disk {
        StagingMode::Disk
    } else {
        StagingMode::Memory
    };

    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .target_size_kb(cli.target_size)
        .tolerance_bytes(cli.tolerance_kb.saturating_mul(1024))
        .orientation(cli.orientation.into())
        .background(cli.background)
        .pages(pages)
        .staging(staging);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `<dir>/<stem>.jpg` beside the input.
fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("jpg")
}

fn describe_outcome(outcome: SearchOutcome) -> &'static str {
    match outcome {
        SearchOutcome::FastPath => "already under target",
        SearchOutcome::WithinWindow => "within window",
        SearchOutcome::Exhausted => "closest reachable",
    }
}

fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

/// Parse `--target-size`: a non-negative, finite number of kilobytes.
fn parse_target_kb(s: &str) -> std::result::Result<f64, String> {
    let kb: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if !kb.is_finite() || kb < 0.0 {
        return Err(format!("target size must be a non-negative number of KB, got {s}"));
    }
    Ok(kb)
}

/// Parse `--background` as `RRGGBB` with an optional leading `#`.
fn parse_background(s: &str) -> std::result::Result<[u8; 3], String> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("expected RRGGBB hex colour, got '{s}'"));
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
