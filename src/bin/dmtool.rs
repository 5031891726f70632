use clap::{Parser, Subcommand};
use dmtx_scan::detector::sampler::{SymbolQuad, module_is_dark};
use dmtx_scan::tools::{
    GrayImage, binarize, binary_stats, collect_images, grid_to_text, load_gray, scan_image,
};
use dmtx_scan::{BitMatrix, DataMatrixCode, ScanOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "dmtool", version, about = "Data Matrix scanning tools")]
struct Cli {
    /// Fixed binarization threshold (Otsu's method when omitted)
    #[arg(long, global = true)]
    threshold: Option<u8>,
    /// Abort each scan after this many milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    /// Decode candidates in parallel
    #[arg(long, global = true)]
    parallel: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan an image, or every image under a directory
    Detect {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the module grid of every symbol found in an image
    Grid {
        #[arg(long)]
        image: PathBuf,
    },
    /// Print binarization statistics for an image
    Stats {
        #[arg(long)]
        image: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let mut options = ScanOptions::from_env();
    if let Some(ms) = cli.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }
    if cli.parallel {
        options = options.with_parallel(true);
    }

    match cli.command {
        Command::Detect { image, limit } => detect_cmd(&image, limit, cli.threshold, &options),
        Command::Grid { image } => grid_cmd(&image, cli.threshold, &options),
        Command::Stats { image } => stats_cmd(&image, cli.threshold),
    }
}

fn load_or_report(path: &Path) -> Option<GrayImage> {
    match load_gray(path) {
        Ok(gray) => Some(gray),
        Err(err) => {
            eprintln!("Failed to load image {}: {}", path.display(), err);
            None
        }
    }
}

fn describe(code: &DataMatrixCode) -> String {
    format!(
        "{}x{} {:?} confidence={:.2} content={:?}",
        code.rows, code.cols, code.format, code.confidence, code.content
    )
}

fn detect_cmd(path: &Path, limit: Option<usize>, threshold: Option<u8>, options: &ScanOptions) {
    let images = collect_images(path, limit);
    if images.is_empty() {
        println!("No images found under {}", path.display());
        return;
    }

    let mut total_elapsed = Duration::default();
    let mut hits = 0usize;
    for image in &images {
        let Some(gray) = load_or_report(image) else {
            continue;
        };
        let start = Instant::now();
        let outcome = scan_image(&gray, threshold, options);
        let elapsed = start.elapsed();
        total_elapsed += elapsed;

        match outcome {
            Ok(codes) => {
                if !codes.is_empty() {
                    hits += 1;
                }
                println!(
                    "{}: {}x{} -> {} symbols ({:.2?})",
                    image.display(),
                    gray.width,
                    gray.height,
                    codes.len(),
                    elapsed
                );
                for (i, code) in codes.iter().enumerate() {
                    println!("  DM {}: {}", i, describe(code));
                }
            }
            Err(err) => println!("{}: {} ({:.2?})", image.display(), err, elapsed),
        }
    }

    if images.len() > 1 {
        println!(
            "Read {}/{} images, total time {:.2?}",
            hits,
            images.len(),
            total_elapsed
        );
    }
}

fn grid_cmd(path: &Path, threshold: Option<u8>, options: &ScanOptions) {
    let Some(gray) = load_or_report(path) else {
        return;
    };
    let Some(view) = gray.view() else {
        eprintln!("Image {} is empty", path.display());
        return;
    };

    let codes = match scan_image(&gray, threshold, options) {
        Ok(codes) => codes,
        Err(err) => {
            eprintln!("Scan failed: {}", err);
            return;
        }
    };
    println!("Found {} symbols", codes.len());

    for (i, code) in codes.iter().enumerate() {
        let [top_left, top_right, bottom_right, bottom_left] = code.corners;
        let quad = SymbolQuad {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        };
        let grid = BitMatrix::from_fn(code.cols, code.rows, |col, row| {
            module_is_dark(&view, &quad, code.rows, code.cols, row, col)
        });
        println!("DM {}: {}", i, describe(code));
        print!("{}", grid_to_text(&grid));
    }
}

fn stats_cmd(path: &Path, threshold: Option<u8>) {
    let Some(gray) = load_or_report(path) else {
        return;
    };
    println!("Image: {} ({}x{})", path.display(), gray.width, gray.height);

    let (min, max) = gray
        .pixels
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    let avg = if gray.pixels.is_empty() {
        0
    } else {
        gray.pixels.iter().map(|&p| p as u64).sum::<u64>() / gray.pixels.len() as u64
    };
    println!("Grayscale range: {}-{}, average: {}", min, max, avg);

    let stats = binary_stats(&binarize(&gray, threshold));
    println!(
        "Binary: black_pixels={} total={} black_ratio={:.2}%",
        stats.black_pixels,
        stats.total_pixels,
        stats.black_ratio * 100.0
    );
}
