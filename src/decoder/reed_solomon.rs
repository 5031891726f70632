//! Reed-Solomon error correction for ECC200 symbols
//!
//! Data Matrix uses RS over GF(256) with primitive polynomial
//! x^8 + x^5 + x^3 + x^2 + 1 and generator roots alpha^1 .. alpha^n.

/// Arithmetic in GF(256) under the Data Matrix primitive polynomial
pub struct Gf256;

const PRIMITIVE: u16 = 0x12D;

const fn build_tables() -> ([u8; 256], [u8; 256]) {
    let mut exp = [0u8; 256];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE;
        }
        i += 1;
    }
    exp[255] = exp[0];
    (exp, log)
}

const TABLES: ([u8; 256], [u8; 256]) = build_tables();
static EXP_TABLE: [u8; 256] = TABLES.0;
static LOG_TABLE: [u8; 256] = TABLES.1;

impl Gf256 {
    /// alpha^n
    pub fn exp(n: usize) -> u8 {
        EXP_TABLE[n % 255]
    }

    /// Field product
    pub fn mul(a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        let log_a = LOG_TABLE[a as usize] as usize;
        let log_b = LOG_TABLE[b as usize] as usize;
        EXP_TABLE[(log_a + log_b) % 255]
    }

    /// Division; `None` when dividing by zero
    pub fn div(a: u8, b: u8) -> Option<u8> {
        if b == 0 {
            return None;
        }
        if a == 0 {
            return Some(0);
        }
        let log_a = LOG_TABLE[a as usize] as usize;
        let log_b = LOG_TABLE[b as usize] as usize;
        Some(EXP_TABLE[(log_a + 255 - log_b) % 255])
    }

    /// Multiplicative inverse; `None` for zero
    pub fn inverse(a: u8) -> Option<u8> {
        Self::div(1, a)
    }

    /// `a` raised to the `n`th power, with 0^0 = 1
    pub fn pow_usize(a: u8, n: usize) -> u8 {
        if a == 0 {
            return if n == 0 { 1 } else { 0 };
        }
        let log_a = LOG_TABLE[a as usize] as usize;
        EXP_TABLE[(log_a * (n % 255)) % 255]
    }
}

/// Evaluate a polynomial with ascending coefficients at `x`
fn eval_ascending(poly: &[u8], x: u8) -> u8 {
    poly.iter()
        .rev()
        .fold(0u8, |acc, &coeff| Gf256::mul(acc, x) ^ coeff)
}

/// Outcome of correcting one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockCorrection {
    /// Number of codewords that were changed
    pub corrected: usize,
    /// 1.0 for an error-free block, falling as the correction budget is used
    pub confidence: f32,
}

/// Reed-Solomon decoder for one interleaved ECC200 block
pub struct ReedSolomonDecoder {
    num_ecc_codewords: usize,
}

impl ReedSolomonDecoder {
    /// Decoder for blocks carrying `num_ecc_codewords` error codewords
    pub fn new(num_ecc_codewords: usize) -> Self {
        Self { num_ecc_codewords }
    }

    /// Correct `received` (data followed by error codewords) in place
    pub fn decode(&self, received: &mut [u8]) -> Result<BlockCorrection, &'static str> {
        if received.len() <= self.num_ecc_codewords || received.len() > 255 {
            return Err("Block length out of range");
        }

        let syndrome = self.calculate_syndrome(received);
        if syndrome.iter().all(|&s| s == 0) {
            return Ok(BlockCorrection {
                corrected: 0,
                confidence: 1.0,
            });
        }

        // Find error locator polynomial using Berlekamp-Massey
        let sigma = self.find_error_locator(&syndrome)?;
        let num_errors = sigma.len() - 1;
        if num_errors == 0 || 2 * num_errors > self.num_ecc_codewords {
            return Err("Too many errors");
        }

        // Find error positions (Chien search)
        let error_positions = self.find_error_positions(&sigma, received.len())?;

        // Find error values (Forney algorithm)
        let error_values =
            self.find_error_values(&sigma, &syndrome, &error_positions, received.len())?;

        for (&pos, &value) in error_positions.iter().zip(error_values.iter()) {
            received[pos] ^= value;
        }

        // Verify syndrome is now zero
        if self.calculate_syndrome(received).iter().any(|&s| s != 0) {
            return Err("Uncorrectable error");
        }

        Ok(BlockCorrection {
            corrected: num_errors,
            confidence: 1.0 - num_errors as f32 / self.num_ecc_codewords as f32,
        })
    }

    /// S_i = r(alpha^(i + 1)), with r[0] the highest-degree coefficient
    fn calculate_syndrome(&self, received: &[u8]) -> Vec<u8> {
        (0..self.num_ecc_codewords)
            .map(|i| {
                let x = Gf256::exp(i + 1);
                received
                    .iter()
                    .fold(0u8, |acc, &coeff| Gf256::mul(acc, x) ^ coeff)
            })
            .collect()
    }

    fn find_error_locator(&self, syndrome: &[u8]) -> Result<Vec<u8>, &'static str> {
        // Berlekamp-Massey algorithm
        let n = syndrome.len();
        let mut sigma = vec![1u8];
        let mut b = vec![1u8];
        let mut delta_b: u8 = 1;
        let mut l = 0;
        let mut m = 1;

        for i in 0..n {
            let mut delta = syndrome[i];
            for j in 1..=l {
                if j < sigma.len() {
                    delta ^= Gf256::mul(sigma[j], syndrome[i - j]);
                }
            }

            if delta == 0 {
                m += 1;
                continue;
            }

            let d = Gf256::div(delta, delta_b).ok_or("Zero discrepancy base")?;
            let previous = sigma.clone();
            if sigma.len() < b.len() + m {
                sigma.resize(b.len() + m, 0);
            }
            // sigma = sigma - d * x^m * b
            for (j, &coeff) in b.iter().enumerate() {
                sigma[j + m] ^= Gf256::mul(d, coeff);
            }

            if 2 * l <= i {
                b = previous;
                delta_b = delta;
                l = i + 1 - l;
                m = 1;
            } else {
                m += 1;
            }
        }

        while sigma.len() > 1 && sigma.last() == Some(&0) {
            sigma.pop();
        }
        if sigma.len() - 1 != l {
            return Err("Locator degree mismatch");
        }
        Ok(sigma)
    }

    fn find_error_positions(&self, sigma: &[u8], n: usize) -> Result<Vec<usize>, &'static str> {
        // Chien search: sigma(x) = prod(1 - X_k * x) where X_k = alpha^(n-1-pos)
        let mut positions = Vec::new();
        for i in 0..n {
            let exp = (n - 1 - i) % 255;
            let x_inv = Gf256::exp(255 - exp);
            if eval_ascending(sigma, x_inv) == 0 {
                positions.push(i);
            }
        }

        if positions.len() != sigma.len() - 1 {
            return Err("Wrong number of error positions found");
        }
        Ok(positions)
    }

    fn find_error_values(
        &self,
        sigma: &[u8],
        syndrome: &[u8],
        error_positions: &[usize],
        n: usize,
    ) -> Result<Vec<u8>, &'static str> {
        // omega = syndrome * sigma mod x^(2t)
        let mut omega = vec![0u8; syndrome.len()];
        for (i, slot) in omega.iter_mut().enumerate() {
            for (j, &coeff) in sigma.iter().enumerate().take(i + 1) {
                *slot ^= Gf256::mul(coeff, syndrome[i - j]);
            }
        }

        // sigma'(x) = sum over odd i of sigma[i] * x^(i-1)
        let sigma_prime: Vec<u8> = sigma
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &coeff)| if i % 2 == 1 { coeff } else { 0 })
            .collect();

        let mut values = Vec::with_capacity(error_positions.len());
        for &pos in error_positions {
            let exp = (n - 1 - pos) % 255;
            let x_inv = Gf256::exp(255 - exp);

            let omega_val = eval_ascending(&omega, x_inv);
            let sigma_prime_val = eval_ascending(&sigma_prime, x_inv);
            if sigma_prime_val == 0 {
                return Err("Sigma derivative is zero");
            }

            // First consecutive root is alpha^1, so the X_k^(1 - b) factor is 1
            let value = Gf256::div(omega_val, sigma_prime_val).ok_or("Sigma derivative is zero")?;
            values.push(value);
        }

        Ok(values)
    }
}

/// Error correction codewords for `data`, generator roots alpha^1 .. alpha^num_ecc
pub fn rs_encode(data: &[u8], num_ecc: usize) -> Vec<u8> {
    // Generator polynomial, descending coefficients, leading 1
    let mut generator = vec![1u8];
    for i in 1..=num_ecc {
        let root = Gf256::exp(i);
        let mut next = vec![0u8; generator.len() + 1];
        for (j, &coeff) in generator.iter().enumerate() {
            next[j] ^= coeff;
            next[j + 1] ^= Gf256::mul(coeff, root);
        }
        generator = next;
    }

    let mut remainder = vec![0u8; num_ecc];
    for &d in data {
        let factor = d ^ remainder[0];
        remainder.rotate_left(1);
        remainder[num_ecc - 1] = 0;
        for j in 0..num_ecc {
            remainder[j] ^= Gf256::mul(generator[j + 1], factor);
        }
    }
    remainder
}
