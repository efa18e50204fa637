//! Systematic Reed-Solomon codec over GF(2^8).
//!
//! Decoding runs the textbook ladder: syndromes, Berlekamp-Massey, Chien
//! search, Forney magnitudes, then a syndrome re-check of the corrected
//! message. The Chien search walks all 255 non-zero field elements, not
//! just `msg.len()` of them, and maps each root at `alpha^i` to reverse
//! position `(255 - i) % 255` -- both are easy to get subtly wrong and both
//! silently corrupt output when they are.

use crate::gf256::{self, GfError};
use cimbar_core::ECC_BYTES;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RsError {
    #[error("message of {0} bytes exceeds the 255-byte block size")]
    MessageTooLong(usize),
    #[error("message of {got} bytes leaves no data beside {ecc} parity bytes")]
    MessageTooShort { got: usize, ecc: usize },
    #[error("too many errors to correct")]
    Uncorrectable,
    #[error("corrected message failed the syndrome re-check")]
    VerificationFailed,
    #[error(transparent)]
    Field(#[from] GfError),
}

/// RS codec with a fixed parity length.
#[derive(Clone, Debug)]
pub struct ReedSolomon {
    ecc_len: usize,
    generator: Vec<u8>,
}

impl ReedSolomon {
    /// Build a codec with `ecc_len` parity bytes per block.
    pub fn new(ecc_len: usize) -> Self {
        // g(x) = prod_{i=0}^{ecc_len-1} (x - alpha^i)
        let mut generator = vec![1u8];
        for i in 0..ecc_len {
            generator = gf256::poly_mul(&generator, &[1, gf256::pow(2, i as i32)]);
        }
        Self { ecc_len, generator }
    }

    /// The wire default of 32 parity bytes per block.
    pub fn with_default_ecc() -> Self {
        Self::new(ECC_BYTES)
    }

    #[inline]
    pub fn ecc_len(&self) -> usize {
        self.ecc_len
    }

    /// Systematic encode: `data || parity`, parity by polynomial long
    /// division modulo the generator.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>, RsError> {
        let total = data.len() + self.ecc_len;
        if total > 255 {
            return Err(RsError::MessageTooLong(total));
        }

        let mut work = vec![0u8; total];
        work[..data.len()].copy_from_slice(data);
        for i in 0..data.len() {
            let coef = work[i];
            if coef == 0 {
                continue;
            }
            for (j, &g) in self.generator.iter().enumerate().skip(1) {
                work[i + j] ^= gf256::mul(g, coef);
            }
        }
        work[..data.len()].copy_from_slice(data);
        Ok(work)
    }

    /// Decode one block, correcting up to `ecc_len / 2` byte errors.
    /// Returns the data portion.
    pub fn decode(&self, msg: &[u8]) -> Result<Vec<u8>, RsError> {
        if msg.len() > 255 {
            return Err(RsError::MessageTooLong(msg.len()));
        }
        if msg.len() < self.ecc_len {
            return Err(RsError::MessageTooShort {
                got: msg.len(),
                ecc: self.ecc_len,
            });
        }
        let data_len = msg.len() - self.ecc_len;

        let synd = self.syndromes(msg);
        if synd.iter().all(|&s| s == 0) {
            return Ok(msg[..data_len].to_vec());
        }

        let lambda = berlekamp_massey(&synd, self.ecc_len)?;
        let errors = lambda.len() - 1;
        if errors == 0 {
            return Ok(msg[..data_len].to_vec());
        }

        // Chien search over every non-zero field element. A root at
        // alpha^i marks reverse position (255 - i) % 255 in the codeword.
        let mut reverse_pos = Vec::with_capacity(errors);
        for i in 0..255 {
            if gf256::poly_eval(&lambda, gf256::pow(2, i)) == 0 {
                let pos = ((255 - i) % 255) as usize;
                if pos < msg.len() {
                    reverse_pos.push(pos);
                }
            }
        }
        if reverse_pos.len() != errors {
            return Err(RsError::Uncorrectable);
        }

        // Forney: Omega(x) = (S_asc * Lambda) mod x^t, with the syndromes
        // in ascending order (S_0 as the constant term).
        let mut synd_asc = synd.clone();
        synd_asc.reverse();
        let product = gf256::poly_mul(&synd_asc, &lambda);
        let omega = &product[product.len().saturating_sub(self.ecc_len)..];

        let mut corrected = msg.to_vec();
        for &pos in &reverse_pos {
            let x = gf256::pow(2, pos as i32);
            let x_inv = gf256::inv(x)?;
            let lambda_prime = eval_formal_derivative(&lambda, x_inv);
            if lambda_prime == 0 {
                return Err(RsError::Uncorrectable);
            }
            let numerator = gf256::mul(x, gf256::poly_eval(omega, x_inv));
            let magnitude = gf256::div(numerator, lambda_prime)?;
            corrected[msg.len() - 1 - pos] ^= magnitude;
        }

        if self.syndromes(&corrected).iter().any(|&s| s != 0) {
            return Err(RsError::VerificationFailed);
        }
        Ok(corrected[..data_len].to_vec())
    }

    fn syndromes(&self, msg: &[u8]) -> Vec<u8> {
        (0..self.ecc_len)
            .map(|i| gf256::poly_eval(msg, gf256::pow(2, i as i32)))
            .collect()
    }
}

/// Evaluate the formal derivative of `lambda` (high-degree-first) at `x`.
/// Over GF(2^m) only odd-exponent terms survive.
fn eval_formal_derivative(lambda: &[u8], x: u8) -> u8 {
    let deg = lambda.len() - 1;
    let mut acc = 0u8;
    for (k, &c) in lambda.iter().enumerate() {
        let e = deg - k;
        if e % 2 == 1 {
            acc ^= gf256::mul(c, gf256::pow(x, (e - 1) as i32));
        }
    }
    acc
}

/// Berlekamp-Massey: the minimal error-locator polynomial for `synd`,
/// high-degree-first with `Lambda(0) = 1`.
fn berlekamp_massey(synd: &[u8], ecc_len: usize) -> Result<Vec<u8>, RsError> {
    let mut err_loc = vec![1u8];
    let mut old_loc = vec![1u8];

    for i in 0..synd.len() {
        old_loc.push(0);

        let mut delta = synd[i];
        for j in 1..err_loc.len() {
            if j <= i {
                let coef = err_loc[err_loc.len() - 1 - j];
                delta ^= gf256::mul(coef, synd[i - j]);
            }
        }

        if delta != 0 {
            if old_loc.len() > err_loc.len() {
                let promoted = gf256::poly_scale(&old_loc, delta);
                old_loc = gf256::poly_scale(&err_loc, gf256::inv(delta)?);
                err_loc = promoted;
            }
            err_loc = gf256::poly_add(&err_loc, &gf256::poly_scale(&old_loc, delta));
        }
    }

    let first = err_loc
        .iter()
        .position(|&c| c != 0)
        .unwrap_or(err_loc.len() - 1);
    let err_loc = err_loc[first..].to_vec();

    if (err_loc.len() - 1) * 2 > ecc_len {
        return Err(RsError::Uncorrectable);
    }
    Ok(err_loc)
}
