use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use memmap2::{Mmap, MmapOptions};
use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;

use crate::model::{Hdu, HduHeader, HduList};
use crate::utils::constants::{BLOCK_SIZE, CARD_SIZE};
use crate::utils::dispatcher::{resolve_fits_source, FitsSource};

pub fn create_mmap(file: &File) -> Result<Mmap> {
    let mmap = unsafe { MmapOptions::new().map(file).context("mmap failed")? };
    #[cfg(unix)]
    {
        let _ = mmap.advise(memmap2::Advice::Sequential);
    }
    Ok(mmap)
}

/// Reads every HDU of a FITS file (plain, gzip-compressed or inside a ZIP).
pub fn read_hdu_list(path: &Path) -> Result<HduList> {
    let source = resolve_fits_source(path)?;
    read_source(&source).with_context(|| format!("Failed to read FITS {:?}", path))
}

pub fn read_source(source: &FitsSource) -> Result<HduList> {
    match source {
        FitsSource::Gzip(p) => {
            let file = File::open(p).with_context(|| format!("Failed to open {:?}", p))?;
            let mut bytes = Vec::new();
            GzDecoder::new(file)
                .read_to_end(&mut bytes)
                .with_context(|| format!("Failed to decompress {:?}", p))?;
            parse_hdus(&bytes)
        }
        other => {
            let p = other.path();
            let file = File::open(p).with_context(|| format!("Failed to open {:?}", p))?;
            let mmap = create_mmap(&file)?;
            parse_hdus(&mmap)
        }
    }
}

#[inline]
fn scaling(header: &HduHeader) -> (f64, f64) {
    let bzero = header.get_f64("BZERO").unwrap_or(0.0);
    let bscale = header.get_f64("BSCALE").unwrap_or(1.0);
    (bzero, bscale)
}

pub fn decode_pixels(data: &[u8], bitpix: i64, bscale: f64, bzero: f64) -> Result<Vec<f32>> {
    let scale = |v: f64| (v * bscale + bzero) as f32;
    let pixels: Vec<f32> = match bitpix {
        8 => data.par_iter().map(|&b| scale(b as f64)).collect(),
        16 => data
            .par_chunks_exact(2)
            .map(|c| scale(i16::from_be_bytes([c[0], c[1]]) as f64))
            .collect(),
        32 => data
            .par_chunks_exact(4)
            .map(|c| scale(i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64))
            .collect(),
        64 => data
            .par_chunks_exact(8)
            .map(|c| {
                let v = i64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]);
                scale(v as f64)
            })
            .collect(),
        -32 => data
            .par_chunks_exact(4)
            .map(|c| scale(f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64))
            .collect(),
        -64 => data
            .par_chunks_exact(8)
            .map(|c| scale(f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])))
            .collect(),
        other => bail!("Unsupported BITPIX {}", other),
    };
    Ok(pixels)
}

fn extract_header_value(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('\'') {
        if let Some(end) = rest.find('\'') {
            return rest[..end].trim_end().to_string();
        }
    }
    match trimmed.find('/') {
        Some(pos) => trimmed[..pos].trim().to_string(),
        None => trimmed.to_string(),
    }
}

pub struct ParsedHeader {
    pub header: HduHeader,
    pub data_start: usize,
    pub next_hdu_offset: usize,
}

pub fn parse_header_at(bytes: &[u8], offset: usize) -> Result<ParsedHeader> {
    let mut cards = Vec::new();
    let mut pos = offset;
    let mut end_found = false;

    while !end_found {
        if pos + BLOCK_SIZE > bytes.len() {
            bail!("Unexpected end of file while reading header at offset {}", offset);
        }

        let block = &bytes[pos..pos + BLOCK_SIZE];
        pos += BLOCK_SIZE;

        for card_bytes in block.chunks_exact(CARD_SIZE) {
            let keyword = String::from_utf8_lossy(&card_bytes[0..8]).trim().to_string();

            if keyword == "END" {
                end_found = true;
                break;
            }

            if &card_bytes[8..10] != b"= " {
                continue;
            }

            let value = extract_header_value(&String::from_utf8_lossy(&card_bytes[10..]));
            cards.push((keyword, value));
        }
    }

    let header = HduHeader::from_cards(cards);
    let next_hdu_offset = header
        .padded_data_bytes()
        .and_then(|len| pos.checked_add(len))
        .with_context(|| format!("Data size of HDU at offset {} overflows", offset))?;

    Ok(ParsedHeader {
        header,
        data_start: pos,
        next_hdu_offset,
    })
}

fn decode_image(bytes: &[u8], parsed: &ParsedHeader) -> Result<Option<ArrayD<f32>>> {
    let header = &parsed.header;
    let axes = header.naxes();
    let npix = header.pixel_count().context("Image pixel count overflows")?;
    if !header.is_image() || axes.is_empty() || npix == 0 {
        return Ok(None);
    }

    let bitpix = header.get_i64("BITPIX").context("Missing BITPIX in image HDU")?;
    let bytes_per_pixel = (bitpix.unsigned_abs() / 8) as usize;
    let data_end = npix
        .checked_mul(bytes_per_pixel)
        .and_then(|len| parsed.data_start.checked_add(len));
    let Some(data_end) = data_end.filter(|end| *end <= bytes.len()) else {
        bail!("Image data exceeds file size");
    };

    let (bzero, bscale) = scaling(header);
    let pixels = decode_pixels(&bytes[parsed.data_start..data_end], bitpix, bscale, bzero)?;

    // FITS stores NAXIS1 fastest, so the row-major shape is the reversed axis list.
    let shape: Vec<usize> = axes.iter().rev().copied().collect();
    let data = ArrayD::from_shape_vec(IxDyn(&shape), pixels)
        .context("Failed to reshape image pixels")?;
    Ok(Some(data))
}

pub fn parse_hdus(bytes: &[u8]) -> Result<HduList> {
    let mut hdus = Vec::new();
    let mut offset = 0usize;

    while offset + BLOCK_SIZE <= bytes.len() {
        let parsed = match parse_header_at(bytes, offset) {
            Ok(p) => p,
            Err(e) if !hdus.is_empty() => {
                log::warn!("ignoring trailing bytes after HDU {}: {:#}", hdus.len() - 1, e);
                break;
            }
            Err(e) => return Err(e),
        };
        let data = decode_image(bytes, &parsed)?;
        hdus.push(Hdu::new(parsed.header, data));
        offset = parsed.next_hdu_offset;
    }

    if hdus.is_empty() {
        bail!("No HDU found");
    }
    log::debug!("parsed {} HDU(s)", hdus.len());
    Ok(HduList::new(hdus))
}
