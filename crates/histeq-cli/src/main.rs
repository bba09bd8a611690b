//! histeq — GPU histogram equalization for raster images.
//!
//! Thin I/O shell around `histeq-gpu`: argument parsing, adapter listing,
//! image decode/encode, and textual reporting. No kernel logic here.

mod loader;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use histeq_core::BIN_COUNT;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "histeq", about = "GPU histogram equalization for raster images")]
struct Args {
    /// Input image file.
    input: Option<PathBuf>,

    /// Output image file (default: `<input stem>_eq.<ext>`).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Select the GPU adapter by index (see --list-devices).
    #[arg(short, long)]
    device: Option<usize>,

    /// List available adapters and exit.
    #[arg(short, long)]
    list_devices: bool,

    /// Collapse color input to single-channel luminance before equalizing.
    #[arg(short, long)]
    grayscale: bool,

    /// Print per-bin histogram counts after equalization.
    #[arg(long)]
    dump_histogram: bool,

    /// Emit the histogram and cumulative map as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.list_devices {
        for (index, info) in histeq_gpu::list_adapters().iter().enumerate() {
            println!("{index}: {} ({:?}, {:?})", info.name, info.backend, info.device_type);
        }
        return Ok(());
    }

    let Some(input) = args.input else {
        bail!("no input image given (see --help)");
    };
    let output = args.output.unwrap_or_else(|| default_output(&input));

    let image = loader::load_image(&input, args.grayscale)
        .with_context(|| format!("loading {}", input.display()))?;
    tracing::info!(
        width = image.width(),
        height = image.height(),
        channels = image.channels(),
        depth = %image.depth(),
        "loaded image"
    );

    let context = histeq_gpu::GpuContext::new(args.device)?;
    let pipeline = histeq_gpu::EqualizePipeline::new(&context);
    let result = pipeline.equalize(&image)?;

    let t = &result.timings;
    tracing::info!(
        upload = ?t.upload,
        histogram = ?t.histogram,
        scan = ?t.scan,
        remap = ?t.remap,
        download = ?t.download,
        total = ?t.total(),
        "pipeline timings"
    );

    if args.json {
        let report = serde_json::json!({
            "histogram": result.histogram,
            "cumulative": result.cumulative,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if args.dump_histogram {
        for c in 0..result.histogram.channels {
            let bins = result.histogram.channel(c);
            println!("channel {c}:");
            for intensity in 0..BIN_COUNT {
                println!("  intensity {intensity}: {}", bins[intensity]);
            }
        }
    }

    loader::save_image(&output, &result.image)
        .with_context(|| format!("saving {}", output.display()))?;
    tracing::info!(path = %output.display(), "wrote equalized image");
    Ok(())
}

/// Derive `<stem>_eq.<ext>` next to the input file.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    input.with_file_name(format!("{stem}_eq.{ext}"))
}
