//! padcount CLI: count pads in a photograph, print markers, dump parameters.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use padcount::fiducial::render_marker;
use padcount::{Backend, DetectionParameters, PadCounter, PreviewFormat, QualityPolicy};

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "padcount")]
#[command(about = "Count circular pads in a flat-lay photograph (optional printed fiducial for scale)")]
#[command(version)]
struct Cli {
    /// Log level: off, error, warn, info, debug, trace.
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    /// Emit JSON log lines (tracing builds only).
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count pads in an image.
    Count(CountArgs),

    /// Render a printable fiducial marker as PNG.
    Marker(MarkerArgs),

    /// Print the default detection parameters as JSON.
    Params {
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct CountArgs {
    /// Path to the input image (any format the `image` crate decodes).
    image: PathBuf,

    /// Detection parameters (JSON); missing fields take defaults.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Write the JSON report here instead of printing it.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write the annotated preview here.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Preview encoding.
    #[arg(long, value_enum, default_value_t = PreviewFormatArg::Jpeg)]
    preview_format: PreviewFormatArg,

    #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
    backend: BackendArg,

    /// Fail instead of warning when the frame is blurry, clipped or small.
    #[arg(long)]
    strict_quality: bool,
}

#[derive(Debug, Clone, Args)]
struct MarkerArgs {
    /// Marker id in the dictionary.
    #[arg(long)]
    id: u32,

    /// Marker side in pixels, outer border included.
    #[arg(long, default_value = "600")]
    side_px: usize,

    /// White margin around the marker, in pixels.
    #[arg(long, default_value = "60")]
    quiet_zone_px: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Full,
    Fallback,
}

impl BackendArg {
    fn to_backend(self) -> Backend {
        match self {
            Self::Auto => Backend::probe(),
            Self::Full => Backend::Full,
            Self::Fallback => Backend::Fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PreviewFormatArg {
    Jpeg,
    Png,
}

impl PreviewFormatArg {
    fn to_format(self) -> PreviewFormat {
        match self {
            Self::Jpeg => PreviewFormat::Jpeg,
            Self::Png => PreviewFormat::Png,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli) {
        eprintln!("warning: logger not installed: {err}");
    }

    let outcome = match &cli.command {
        Commands::Count(args) => run_count(args),
        Commands::Marker(args) => run_marker(args),
        Commands::Params { out } => run_params(out.as_deref()),
    };
    if let Err(err) = outcome {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) -> CliResult<()> {
    padcount::core::init_with_level(cli.log_level)?;
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) -> CliResult<()> {
    // Bridge `log` records from the library crates into the subscriber.
    let _ = LogTracer::init();
    log::set_max_level(cli.log_level);
    padcount::core::init_tracing(cli.log_level, cli.log_json);
    Ok(())
}

// ── count ──────────────────────────────────────────────────────────────

fn run_count(args: &CountArgs) -> CliResult<()> {
    let params = match &args.params {
        Some(path) => DetectionParameters::load_json(path)?,
        None => DetectionParameters::default(),
    };
    let policy = if args.strict_quality {
        QualityPolicy::Blocking
    } else {
        QualityPolicy::Advisory
    };
    let counter = PadCounter::new(params)?
        .with_backend(args.backend.to_backend())
        .with_quality_policy(policy)
        .with_preview_format(args.preview_format.to_format());

    let bytes = fs::read(&args.image)?;
    let result = counter.count(&bytes)?;

    if let Some(path) = &args.preview {
        fs::write(path, &result.preview_image)?;
        info!("wrote preview to {}", path.display());
    }

    let json = result.to_json_pretty()?;
    match &args.report {
        Some(path) => {
            fs::write(path, json)?;
            info!("wrote report to {}", path.display());
            println!("{}", result.count);
        }
        None => println!("{json}"),
    }
    Ok(())
}

// ── marker ─────────────────────────────────────────────────────────────

fn run_marker(args: &MarkerArgs) -> CliResult<()> {
    let dictionary = DetectionParameters::default().fiducial_dictionary;
    let marker = render_marker(
        &dictionary.dictionary(),
        args.id,
        args.side_px,
        args.quiet_zone_px,
    )?;
    let img = image::GrayImage::from_raw(marker.width as u32, marker.height as u32, marker.data)
        .ok_or("rendered marker has an inconsistent buffer size")?;
    img.save(&args.out)?;
    info!(
        "wrote {dictionary} marker {} ({} px) to {}",
        args.id,
        args.side_px,
        args.out.display()
    );
    Ok(())
}

// ── params ─────────────────────────────────────────────────────────────

fn run_params(out: Option<&Path>) -> CliResult<()> {
    let params = DetectionParameters::default();
    match out {
        Some(path) => params.write_json(path)?,
        None => println!("{}", serde_json::to_string_pretty(&params)?),
    }
    Ok(())
}
