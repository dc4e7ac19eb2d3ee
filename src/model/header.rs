use std::collections::HashMap;

use crate::utils::constants::BLOCK_SIZE;

#[derive(Debug, Clone, Default)]
pub struct HduHeader {
    pub cards: Vec<(String, String)>,
    pub index: HashMap<String, String>,
}

impl HduHeader {
    pub fn from_cards(cards: Vec<(String, String)>) -> Self {
        let index = cards.iter().cloned().collect();
        Self { cards, index }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|s| s.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.index.get(key)?.trim().parse().ok()
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.index.get(key)?.trim().parse().ok()
    }

    /// `XTENSION` value for extension HDUs, `None` for the primary one.
    pub fn extension(&self) -> Option<&str> {
        self.get("XTENSION").map(str::trim)
    }

    pub fn is_image(&self) -> bool {
        matches!(self.extension(), None | Some("IMAGE"))
    }

    /// Axis lengths in FITS order (NAXIS1 first).
    pub fn naxes(&self) -> Vec<usize> {
        let naxis = self.get_i64("NAXIS").unwrap_or(0).max(0);
        (1..=naxis)
            .map(|i| self.get_i64(&format!("NAXIS{}", i)).unwrap_or(0).max(0) as usize)
            .collect()
    }

    /// Pixel count over all axes, `None` if it does not fit in `usize`.
    pub fn pixel_count(&self) -> Option<usize> {
        self.naxes().iter().try_fold(1usize, |acc, n| acc.checked_mul(*n))
    }

    /// Size of the data unit before padding, `None` on overflow.
    pub fn data_byte_count(&self) -> Option<usize> {
        if self.naxes().is_empty() {
            return Some(0);
        }
        let bitpix = self.get_i64("BITPIX").unwrap_or(0);
        let bytes_per_pixel = (bitpix.unsigned_abs() / 8) as usize;
        let pcount = self.get_i64("PCOUNT").unwrap_or(0).max(0) as usize;
        let gcount = self.get_i64("GCOUNT").unwrap_or(1).max(1) as usize;
        self.pixel_count()?
            .checked_add(pcount)?
            .checked_mul(gcount)?
            .checked_mul(bytes_per_pixel)
    }

    pub fn padded_data_bytes(&self) -> Option<usize> {
        self.data_byte_count()?
            .div_ceil(BLOCK_SIZE)
            .checked_mul(BLOCK_SIZE)
    }
}
