use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::ArrayD;

use crate::utils::constants::{BLOCK_SIZE, CARD_SIZE};

/// Writes `image` as the primary HDU of a new FITS file (BITPIX -32).
pub fn write_fits_image(image: &ArrayD<f32>, output_path: &Path, extra: &[(&str, &str)]) -> Result<()> {
    let mut cards: Vec<(String, String)> = vec![
        ("SIMPLE".into(), "T".into()),
        ("BITPIX".into(), "-32".into()),
        ("NAXIS".into(), image.ndim().to_string()),
    ];
    // Row-major shape is reversed relative to NAXISn.
    for (i, len) in image.shape().iter().rev().enumerate() {
        cards.push((format!("NAXIS{}", i + 1), len.to_string()));
    }
    for (k, v) in extra {
        if !k.is_ascii() || !v.is_ascii() {
            bail!("FITS header card {}={:?} is not ASCII", k, v);
        }
        cards.retain(|(ck, _)| ck != k);
        cards.push((k.to_string(), v.to_string()));
    }

    let file = std::fs::File::create(output_path)
        .with_context(|| format!("Cannot create {:?}", output_path))?;
    let mut writer = BufWriter::new(file);

    write_header_block(&mut writer, &cards)?;
    write_f32_data(&mut writer, image)?;

    writer.flush()?;
    Ok(())
}

fn write_header_block(writer: &mut impl Write, cards: &[(String, String)]) -> Result<()> {
    let mut block_bytes = Vec::new();

    for (key, value) in cards {
        block_bytes.extend_from_slice(format_card(key, value).as_bytes());
    }
    block_bytes.extend_from_slice(format!("{:<80}", "END").as_bytes());

    let remainder = block_bytes.len() % BLOCK_SIZE;
    if remainder != 0 {
        block_bytes.extend_from_slice(&vec![b' '; BLOCK_SIZE - remainder]);
    }

    writer.write_all(&block_bytes)?;
    Ok(())
}

fn format_card(key: &str, value: &str) -> String {
    if key == "HISTORY" || key == "COMMENT" {
        return format!("{:<8}{:<72}", key, value);
    }

    let keyword = format!("{:<8}", &key[..key.len().min(8)]);

    let trimmed = value.trim();
    let is_bool = trimmed == "T" || trimmed == "F";
    let is_numeric = trimmed.parse::<f64>().is_ok();

    let formatted_value = if is_bool || is_numeric {
        format!("{:>20}", trimmed)
    } else {
        format!("'{:<8}'", trimmed)
    };

    let card = format!("{}= {}", keyword, formatted_value);
    format!("{:<80}", &card[..card.len().min(CARD_SIZE)])
}

fn write_f32_data(writer: &mut impl Write, image: &ArrayD<f32>) -> Result<()> {
    let mut buf = Vec::with_capacity(image.len() * 4);
    for v in image.iter() {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    let remainder = buf.len() % BLOCK_SIZE;
    if remainder != 0 {
        buf.resize(buf.len() + BLOCK_SIZE - remainder, 0);
    }
    writer.write_all(&buf)?;
    Ok(())
}
