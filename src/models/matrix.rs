/// Compact bit matrix for storing binary image or module data (true = black)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BitMatrix {
    /// Create a new bit matrix with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Build a matrix by evaluating `f(x, y)` for every cell
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut matrix = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    matrix.set(x, y, true);
                }
            }
        }
        matrix
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get bit at (x, y); out-of-range reads are white
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        (self.data[index / 8] >> (index % 8)) & 1 == 1
    }

    /// Get bit at signed coordinates; anything outside the image is white
    pub fn get_signed(&self, x: isize, y: isize) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        self.get(x as usize, y as usize)
    }

    /// Set bit at (x, y)
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        let byte_index = index / 8;
        let bit_index = index % 8;
        if value {
            self.data[byte_index] |= 1 << bit_index;
        } else {
            self.data[byte_index] &= !(1 << bit_index);
        }
    }

    /// Toggle bit at (x, y)
    pub fn toggle(&mut self, x: usize, y: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        self.data[index / 8] ^= 1 << (index % 8);
    }

    /// Clear all bits to 0
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Copy of row `y` as booleans
    pub fn row_bits(&self, y: usize) -> Vec<bool> {
        (0..self.width).map(|x| self.get(x, y)).collect()
    }

    /// Copy of column `x` as booleans
    pub fn column_bits(&self, x: usize) -> Vec<bool> {
        (0..self.height).map(|y| self.get(x, y)).collect()
    }

    /// Nearest-pixel lookup at a floating-point image coordinate.
    ///
    /// Pixel `(i, j)` covers `[i, i + 1) x [j, j + 1)`.
    pub fn sample_nearest(&self, x: f32, y: f32) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        self.get_signed(x.floor() as isize, y.floor() as isize)
    }

    /// Get raw data as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Continuous darkness lookup used by the grid sampler.
///
/// Returns 0.0 for white and 1.0 for black; implementations interpolate
/// between pixel centers.
pub trait DarknessSampler: Sync {
    /// Image width in pixels
    fn width(&self) -> usize;
    /// Image height in pixels
    fn height(&self) -> usize;
    /// Darkness at the floating-point coordinate `(x, y)`
    fn darkness(&self, x: f32, y: f32) -> f32;
}

fn bilinear(x: f32, y: f32, mut value: impl FnMut(isize, isize) -> f32) -> f32 {
    let fx = x - 0.5;
    let fy = y - 0.5;
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let (ix, iy) = (x0 as isize, y0 as isize);
    let top = value(ix, iy) * (1.0 - tx) + value(ix + 1, iy) * tx;
    let bottom = value(ix, iy + 1) * (1.0 - tx) + value(ix + 1, iy + 1) * tx;
    top * (1.0 - ty) + bottom * ty
}

impl DarknessSampler for BitMatrix {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn darkness(&self, x: f32, y: f32) -> f32 {
        if !x.is_finite() || !y.is_finite() {
            return 0.0;
        }
        bilinear(x, y, |ix, iy| if self.get_signed(ix, iy) { 1.0 } else { 0.0 })
    }
}

/// Borrowed 8-bit grayscale image (0 = black, 255 = white)
#[derive(Debug, Clone, Copy)]
pub struct GrayView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
}

impl<'a> GrayView<'a> {
    /// Wrap a row-major grayscale buffer; `None` if the buffer is too small
    pub fn new(data: &'a [u8], width: usize, height: usize) -> Option<Self> {
        if data.len() < width * height {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    /// Row-major pixel values
    pub fn data(&self) -> &'a [u8] {
        &self.data[..self.width * self.height]
    }

    fn pixel_darkness(&self, x: isize, y: isize) -> f32 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return 0.0;
        }
        1.0 - self.data[y as usize * self.width + x as usize] as f32 / 255.0
    }
}

impl DarknessSampler for GrayView<'_> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn darkness(&self, x: f32, y: f32) -> f32 {
        if !x.is_finite() || !y.is_finite() {
            return 0.0;
        }
        bilinear(x, y, |ix, iy| self.pixel_darkness(ix, iy))
    }
}
