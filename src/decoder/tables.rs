//! Data Matrix symbol size catalogue and the nearest-size selector

/// Symbol family a configuration belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Reed-Solomon protected symbol (even sizes)
    Ecc200,
    /// ECC000-140 symbol (odd square sizes)
    Legacy,
}

/// One legal Data Matrix size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    /// ECC200 or legacy
    pub kind: SymbolKind,
    /// Total module rows including the finder and clock borders
    pub rows: usize,
    /// Total module columns including the finder and clock borders
    pub cols: usize,
    /// Number of data regions stacked vertically
    pub regions_y: usize,
    /// Number of data regions side by side
    pub regions_x: usize,
    /// Data module rows per region (alignment border excluded)
    pub region_rows: usize,
    /// Data module columns per region (alignment border excluded)
    pub region_cols: usize,
    /// Data codewords (ECC200) or data bits (legacy)
    pub data_codewords: usize,
    /// Error correction codewords (ECC200); zero for legacy
    pub ecc_codewords: usize,
    /// Interleaved Reed-Solomon blocks (ECC200); zero for legacy
    pub blocks: usize,
}

impl Configuration {
    #[allow(clippy::too_many_arguments)]
    const fn ecc200(
        rows: usize,
        cols: usize,
        regions_y: usize,
        regions_x: usize,
        region_rows: usize,
        region_cols: usize,
        data_codewords: usize,
        ecc_codewords: usize,
        blocks: usize,
    ) -> Self {
        Self {
            kind: SymbolKind::Ecc200,
            rows,
            cols,
            regions_y,
            regions_x,
            region_rows,
            region_cols,
            data_codewords,
            ecc_codewords,
            blocks,
        }
    }

    const fn legacy(size: usize) -> Self {
        Self {
            kind: SymbolKind::Legacy,
            rows: size,
            cols: size,
            regions_y: 1,
            regions_x: 1,
            region_rows: size - 2,
            region_cols: size - 2,
            data_codewords: (size - 2) * (size - 2),
            ecc_codewords: 0,
            blocks: 0,
        }
    }

    /// Rows of the data grid with every alignment border removed
    pub fn full_data_rows(&self) -> usize {
        self.regions_y * self.region_rows
    }

    /// Columns of the data grid with every alignment border removed
    pub fn full_data_cols(&self) -> usize {
        self.regions_x * self.region_cols
    }

    /// Codewords (ECC200) or bits (legacy) carried by the whole symbol
    pub fn full_symbol_count(&self) -> usize {
        self.data_codewords + self.ecc_codewords
    }

    /// Error correction codewords in each interleaved block
    pub fn ecc_per_block(&self) -> usize {
        if self.blocks == 0 {
            return 0;
        }
        self.ecc_codewords / self.blocks
    }

    /// Data codewords held by block `block`.
    ///
    /// Codewords are dealt round-robin, so when the data count does not
    /// divide evenly the leading blocks get one more (144x144 only).
    pub fn data_in_block(&self, block: usize) -> usize {
        if self.blocks == 0 || block >= self.blocks {
            return 0;
        }
        let base = self.data_codewords / self.blocks;
        let extra = self.data_codewords % self.blocks;
        if block < extra { base + 1 } else { base }
    }

    /// Module row of the symbol that holds data-grid row `row`
    pub fn symbol_row(&self, row: usize) -> usize {
        (row / self.region_rows) * (self.region_rows + 2) + 1 + row % self.region_rows
    }

    /// Module column of the symbol that holds data-grid column `col`
    pub fn symbol_col(&self, col: usize) -> usize {
        (col / self.region_cols) * (self.region_cols + 2) + 1 + col % self.region_cols
    }
}

/// Every legal size: ECC200 squares, ECC200 rectangles, then legacy squares
pub static CONFIGURATIONS: [Configuration; 51] = [
    Configuration::ecc200(10, 10, 1, 1, 8, 8, 3, 5, 1),
    Configuration::ecc200(12, 12, 1, 1, 10, 10, 5, 7, 1),
    Configuration::ecc200(14, 14, 1, 1, 12, 12, 8, 10, 1),
    Configuration::ecc200(16, 16, 1, 1, 14, 14, 12, 12, 1),
    Configuration::ecc200(18, 18, 1, 1, 16, 16, 18, 14, 1),
    Configuration::ecc200(20, 20, 1, 1, 18, 18, 22, 18, 1),
    Configuration::ecc200(22, 22, 1, 1, 20, 20, 30, 20, 1),
    Configuration::ecc200(24, 24, 1, 1, 22, 22, 36, 24, 1),
    Configuration::ecc200(26, 26, 1, 1, 24, 24, 44, 28, 1),
    Configuration::ecc200(32, 32, 2, 2, 14, 14, 62, 36, 1),
    Configuration::ecc200(36, 36, 2, 2, 16, 16, 86, 42, 1),
    Configuration::ecc200(40, 40, 2, 2, 18, 18, 114, 48, 1),
    Configuration::ecc200(44, 44, 2, 2, 20, 20, 144, 56, 1),
    Configuration::ecc200(48, 48, 2, 2, 22, 22, 174, 68, 1),
    Configuration::ecc200(52, 52, 2, 2, 24, 24, 204, 84, 2),
    Configuration::ecc200(64, 64, 4, 4, 14, 14, 280, 112, 2),
    Configuration::ecc200(72, 72, 4, 4, 16, 16, 368, 144, 4),
    Configuration::ecc200(80, 80, 4, 4, 18, 18, 456, 192, 4),
    Configuration::ecc200(88, 88, 4, 4, 20, 20, 576, 224, 4),
    Configuration::ecc200(96, 96, 4, 4, 22, 22, 696, 272, 4),
    Configuration::ecc200(104, 104, 4, 4, 24, 24, 816, 336, 6),
    Configuration::ecc200(120, 120, 6, 6, 18, 18, 1050, 408, 6),
    Configuration::ecc200(132, 132, 6, 6, 20, 20, 1304, 496, 8),
    Configuration::ecc200(144, 144, 6, 6, 22, 22, 1558, 620, 10),
    Configuration::ecc200(8, 18, 1, 1, 6, 16, 5, 7, 1),
    Configuration::ecc200(8, 32, 1, 2, 6, 14, 10, 11, 1),
    Configuration::ecc200(12, 26, 1, 1, 10, 24, 16, 14, 1),
    Configuration::ecc200(12, 36, 1, 2, 10, 16, 22, 18, 1),
    Configuration::ecc200(16, 36, 1, 2, 14, 16, 32, 24, 1),
    Configuration::ecc200(16, 48, 1, 2, 14, 22, 49, 28, 1),
    Configuration::legacy(7),
    Configuration::legacy(9),
    Configuration::legacy(11),
    Configuration::legacy(13),
    Configuration::legacy(15),
    Configuration::legacy(17),
    Configuration::legacy(19),
    Configuration::legacy(21),
    Configuration::legacy(23),
    Configuration::legacy(25),
    Configuration::legacy(27),
    Configuration::legacy(29),
    Configuration::legacy(31),
    Configuration::legacy(33),
    Configuration::legacy(35),
    Configuration::legacy(37),
    Configuration::legacy(39),
    Configuration::legacy(41),
    Configuration::legacy(43),
    Configuration::legacy(45),
    Configuration::legacy(47),
];

/// Look up a configuration by exact size
pub fn find_configuration(kind: SymbolKind, rows: usize, cols: usize) -> Option<&'static Configuration> {
    CONFIGURATIONS
        .iter()
        .find(|c| c.kind == kind && c.rows == rows && c.cols == cols)
}

/// Candidate configurations for estimated module counts, best first.
///
/// An exact size match is returned alone. Otherwise the nearest size (by
/// squared distance in rows/cols space) and its immediate neighbours in the
/// table are returned, provided the nearest one is within 20% of
/// `rows + cols`.
pub fn select_configurations(rows: f32, cols: f32, kind: SymbolKind) -> Vec<&'static Configuration> {
    if !(rows.is_finite() && cols.is_finite()) || rows < 1.0 || cols < 1.0 {
        return Vec::new();
    }
    let rows = rows.round();
    let cols = cols.round();

    let family: Vec<&'static Configuration> =
        CONFIGURATIONS.iter().filter(|c| c.kind == kind).collect();

    let mut best: Option<(usize, f32)> = None;
    for (idx, config) in family.iter().enumerate() {
        let dr = config.rows as f32 - rows;
        let dc = config.cols as f32 - cols;
        let dist = dr * dr + dc * dc;
        if dist == 0.0 {
            return vec![config];
        }
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((idx, dist));
        }
    }

    let Some((idx, dist)) = best else {
        return Vec::new();
    };
    if dist.sqrt() > 0.2 * (rows + cols) {
        return Vec::new();
    }

    let mut out = vec![family[idx]];
    if idx + 1 < family.len() {
        out.push(family[idx + 1]);
    }
    if idx > 0 {
        out.push(family[idx - 1]);
    }
    out
}
