//! CLI binary for pdf2quiz.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use pdf2quiz::{
    error_payload, extract, inspect, ExtractionConfig, ExtractionProgressCallback, MathpixClient,
    OcrCredentials, PageSelection, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the whole document, a log line per
/// page. Works correctly when pages complete out of order (fan-out mode).
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_extraction_start
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos}/{len} pages  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_prefix("Recognising");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}…", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            dim(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, _total_pages: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

// ── CLI definition ───────────────────────────────────────────────────────────

/// Extract multiple-choice questions (with math notation) from a PDF.
#[derive(Parser, Debug)]
#[command(name = "pdf2quiz", version, about)]
struct Cli {
    /// Input PDF: local path or HTTP(S) URL.
    input: String,

    /// Write the JSON payload to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: json (transport payload) or text (human-readable).
    #[arg(long, default_value = "json", value_parser = ["json", "text"])]
    format: String,

    /// Rendering DPI (72–600).
    #[arg(long, default_value_t = 300)]
    dpi: u32,

    /// Concurrent recognition calls (1 = strictly serial).
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Pages to process: "all", "3", "2-5", or "1,3,7".
    #[arg(long, default_value = "all")]
    pages: String,

    /// Password for encrypted PDFs.
    #[arg(long)]
    password: Option<String>,

    /// OCR app id.
    #[arg(long, env = "MATHPIX_APP_ID", hide_env_values = true)]
    app_id: Option<String>,

    /// OCR app key.
    #[arg(long, env = "MATHPIX_APP_KEY", hide_env_values = true)]
    app_key: Option<String>,

    /// OCR service base URL.
    #[arg(long, default_value = "https://api.mathpix.com")]
    ocr_url: String,

    /// Max retries per page on transient recognition failures.
    #[arg(long, default_value_t = 2)]
    max_retries: u32,

    /// Per-recognition-call timeout in seconds.
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Print document metadata and exit (no OCR, no credentials needed).
    #[arg(long)]
    inspect: bool,

    /// Verify OCR credentials against the account endpoint and exit.
    #[arg(long)]
    verify_credentials: bool,

    /// Suppress the progress bar.
    #[arg(short, long)]
    quiet: bool,
}

/// Parse the --pages flag into a `PageSelection`.
fn parse_pages(spec: &str) -> Result<PageSelection> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("all") {
        return Ok(PageSelection::All);
    }
    if let Some((start, end)) = spec.split_once('-') {
        let start: usize = start.trim().parse().context("invalid range start")?;
        let end: usize = end.trim().parse().context("invalid range end")?;
        return Ok(PageSelection::Range(start, end));
    }
    if spec.contains(',') {
        let pages = spec
            .split(',')
            .map(|p| p.trim().parse::<usize>().context("invalid page number"))
            .collect::<Result<Vec<_>>>()?;
        return Ok(PageSelection::Set(pages));
    }
    Ok(PageSelection::Single(
        spec.parse().context("invalid page number")?,
    ))
}

fn credentials_from_cli(cli: &Cli) -> Result<OcrCredentials> {
    match (&cli.app_id, &cli.app_key) {
        (Some(id), Some(key)) if !id.is_empty() && !key.is_empty() => {
            Ok(OcrCredentials::new(id, key))
        }
        _ => bail!(
            "OCR credentials required: pass --app-id/--app-key or set \
             MATHPIX_APP_ID and MATHPIX_APP_KEY"
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Metadata-only mode: no credentials, no OCR.
    if cli.inspect {
        let meta = inspect(&cli.input).await?;
        println!("{}", serde_json::to_string_pretty(&meta)?);
        return Ok(());
    }

    let credentials = credentials_from_cli(&cli)?;

    // Credential check runs before any document work, so a bad key surfaces
    // immediately rather than on page 1 of a long upload.
    if cli.verify_credentials {
        let client = MathpixClient::new(&cli.ocr_url, credentials, cli.timeout)?;
        client.verify_credentials().await?;
        eprintln!("{} credentials accepted", green("✓"));
        return Ok(());
    }

    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .credentials(credentials)
        .ocr_base_url(&cli.ocr_url)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.timeout)
        .pages(parse_pages(&cli.pages)?);

    if let Some(pwd) = cli.password.clone() {
        builder = builder.password(pwd);
    }
    if !cli.quiet {
        builder = builder.progress_callback(CliProgressCallback::new() as ProgressCallback);
    }

    let config = builder.build()?;

    match extract(&cli.input, &config).await {
        Ok(result) => {
            let rendered = match cli.format.as_str() {
                "json" => serde_json::to_string_pretty(&result.to_payload())?,
                _ => {
                    let mut out = String::new();
                    for q in &result.questions {
                        out.push_str(&format!("{}. {}\n", q.number, q.text));
                        for opt in &q.options {
                            out.push_str(&format!("   - {}\n", opt));
                        }
                    }
                    out
                }
            };

            match cli.output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("writing {}", path.display()))?;
                    eprintln!("{} wrote {}", green("✓"), path.display());
                }
                None => println!("{rendered}"),
            }

            eprintln!(
                "{}",
                dim(&format!(
                    "{} questions from {}/{} pages in {:.1}s",
                    result.stats.question_count,
                    result.stats.recognized_pages,
                    result.stats.recognized_pages + result.stats.failed_pages,
                    result.stats.total_duration_ms as f64 / 1000.0,
                )),
            );
            if result.stats.failed_pages > 0 {
                eprintln!(
                    "{}",
                    red(&format!(
                        "{} page(s) failed recognition — their text is missing",
                        result.stats.failed_pages
                    )),
                );
            }
            Ok(())
        }
        Err(e) => {
            // Emit the structured error payload on stdout for scripted
            // callers, the readable message on stderr for humans.
            println!("{}", serde_json::to_string_pretty(&error_payload(&e))?);
            eprintln!("{} {}", red(&bold("error:")), e);
            std::process::exit(1);
        }
    }
}
