use crate::models::{BitMatrix, GrayView};
use crate::utils::binarization::{otsu_binarize, threshold_binarize};
use crate::{DataMatrixCode, ScanError, ScanOptions, scan_with_sampler};
use image::GenericImageView;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn max_dim_from_env() -> Option<u32> {
    match env::var("DM_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// 8-bit grayscale image owned in memory (0 = black)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    /// Row-major pixels
    pub pixels: Vec<u8>,
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
}

impl GrayImage {
    /// Borrowed view for sampling
    pub fn view(&self) -> Option<GrayView<'_>> {
        GrayView::new(&self.pixels, self.width, self.height)
    }
}

/// Load an image file as grayscale.
///
/// Images larger than `DM_MAX_DIM` on their long side are downscaled first.
pub fn load_gray<P: AsRef<Path>>(path: P) -> Result<GrayImage, image::ImageError> {
    let img = image::open(path)?;
    let img = match max_dim_from_env() {
        Some(max_dim) if img.dimensions().0.max(img.dimensions().1) > max_dim => {
            img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
        }
        _ => img,
    };
    let luma = img.to_luma8();
    let (width, height) = luma.dimensions();
    Ok(GrayImage {
        pixels: luma.into_raw(),
        width: width as usize,
        height: height as usize,
    })
}

/// Binarize with a fixed threshold, or Otsu's when `threshold` is `None`
pub fn binarize(gray: &GrayImage, threshold: Option<u8>) -> BitMatrix {
    let Some(view) = gray.view() else {
        return BitMatrix::new(0, 0);
    };
    match threshold {
        Some(t) => threshold_binarize(&view, t),
        None => otsu_binarize(&view),
    }
}

/// Scan a loaded grayscale image with grayscale module sampling
pub fn scan_image(
    gray: &GrayImage,
    threshold: Option<u8>,
    options: &ScanOptions,
) -> Result<Vec<DataMatrixCode>, ScanError> {
    let bitmap = binarize(gray, threshold);
    match gray.view() {
        Some(view) => scan_with_sampler(&bitmap, &view, options),
        None => Ok(Vec::new()),
    }
}

/// Summary statistics for a binary matrix.
#[derive(Debug, Clone, Copy)]
pub struct BinaryStats {
    /// Count of black pixels.
    pub black_pixels: usize,
    /// Total pixels in the matrix.
    pub total_pixels: usize,
    /// Ratio of black pixels to total pixels.
    pub black_ratio: f64,
}

/// Compute black pixel stats for a binary matrix.
pub fn binary_stats(binary: &BitMatrix) -> BinaryStats {
    let black = binary
        .as_bytes()
        .iter()
        .map(|b| b.count_ones() as usize)
        .sum::<usize>();
    let total = binary.width() * binary.height();
    let ratio = if total == 0 {
        0.0
    } else {
        black as f64 / total as f64
    };
    BinaryStats {
        black_pixels: black,
        total_pixels: total,
        black_ratio: ratio,
    }
}

/// Render a module grid as text, `#` for dark and `.` for light
pub fn grid_to_text(grid: &BitMatrix) -> String {
    let mut out = String::with_capacity((grid.width() + 1) * grid.height());
    for y in 0..grid.height() {
        out.extend(grid.row_bits(y).iter().map(|&b| if b { '#' } else { '.' }));
        out.push('\n');
    }
    out
}

/// Image files under `path` (or `path` itself), sorted, with an optional limit
pub fn collect_images<P: AsRef<Path>>(path: P, limit: Option<usize>) -> Vec<PathBuf> {
    let root = path.as_ref();
    let mut images = if root.is_dir() {
        walk_images(root)
    } else {
        vec![root.to_path_buf()]
    };
    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images
}

fn walk_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if ext == "png" || ext == "jpg" || ext == "jpeg" || ext == "gif" || ext == "bmp" {
                    images.push(path);
                }
            }
        }
    }

    images
}
