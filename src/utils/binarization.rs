//! Grayscale to black/white conversion for the bitmap the detector works on
use crate::models::{BitMatrix, DarknessSampler, GrayView};

/// Otsu's threshold: the level that maximises between-class variance.
///
/// Pixels strictly below the returned level are dark. An image with a
/// single gray level has no dark class and returns 0, so it binarizes white.
pub fn otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    if histogram.iter().filter(|&&count| count > 0).count() < 2 {
        return 0;
    }

    let total = gray.len() as f64;
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut best = (0.0f64, 0u8);
    let (mut below, mut below_sum) = (0u64, 0.0f64);
    // Threshold t puts levels 0..t in the dark class
    for t in 1..=255usize {
        below += histogram[t - 1];
        below_sum += (t - 1) as f64 * histogram[t - 1] as f64;
        let above = total - below as f64;
        if below == 0 || above == 0.0 {
            continue;
        }
        let dark_mean = below_sum / below as f64;
        let light_mean = (total_sum - below_sum) / above;
        let variance = (below as f64 / total) * (above / total) * (dark_mean - light_mean).powi(2);
        if variance > best.0 {
            best = (variance, t as u8);
        }
    }
    best.1
}

/// Global threshold binarization (true = black)
pub fn threshold_binarize(gray: &GrayView<'_>, threshold: u8) -> BitMatrix {
    let width = gray.width();
    let data = gray.data();
    BitMatrix::from_fn(width, gray.height(), |x, y| data[y * width + x] < threshold)
}

/// Binarize with Otsu's threshold
pub fn otsu_binarize(gray: &GrayView<'_>) -> BitMatrix {
    threshold_binarize(gray, otsu_threshold(gray.data()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarize() {
        let gray = [100, 150, 200, 50]; // 2x2 image
        let view = GrayView::new(&gray, 2, 2).unwrap();
        let binary = threshold_binarize(&view, 128);

        assert!(binary.get(0, 0));
        assert!(!binary.get(1, 0));
        assert!(!binary.get(0, 1));
        assert!(binary.get(1, 1));
    }

    #[test]
    fn test_otsu_splits_two_classes() {
        let mut gray = vec![50u8; 50];
        gray.extend(vec![200u8; 50]);
        let threshold = otsu_threshold(&gray);
        assert!(threshold > 50 && threshold <= 200, "{threshold}");

        let view = GrayView::new(&gray, 10, 10).unwrap();
        let binary = otsu_binarize(&view);
        assert!(binary.get(0, 0));
        assert!(!binary.get(0, 7));
    }

    #[test]
    fn test_flat_image_is_white() {
        assert_eq!(otsu_threshold(&[90u8; 16]), 0);
        assert_eq!(otsu_threshold(&[]), 0);

        let gray = [40u8; 16];
        let view = GrayView::new(&gray, 4, 4).unwrap();
        let binary = otsu_binarize(&view);
        assert!((0..4).all(|y| (0..4).all(|x| !binary.get(x, y))));
    }
}
