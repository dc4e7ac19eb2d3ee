use std::path::{Path, PathBuf};

use ndarray::ArrayD;

use crate::error::{PlotError, PlotResult};
use crate::model::{Hdu, HduList};
use crate::utils::dispatcher::resolve_fits_source;
use crate::utils::fits::read_source;

/// Anything image data can be pulled from.
#[derive(Debug, Clone, Copy)]
pub enum ImageInput<'a> {
    Array(&'a ArrayD<f32>),
    Hdu(&'a Hdu),
    /// Indexed by the `hdu` selector, 0 when absent.
    HduList(&'a HduList),
    /// A FITS file, optionally gzipped or inside a zip archive.
    Path(&'a Path),
}

impl<'a> From<&'a ArrayD<f32>> for ImageInput<'a> {
    fn from(a: &'a ArrayD<f32>) -> Self {
        ImageInput::Array(a)
    }
}

impl<'a> From<&'a Hdu> for ImageInput<'a> {
    fn from(h: &'a Hdu) -> Self {
        ImageInput::Hdu(h)
    }
}

impl<'a> From<&'a HduList> for ImageInput<'a> {
    fn from(l: &'a HduList) -> Self {
        ImageInput::HduList(l)
    }
}

impl<'a> From<&'a Path> for ImageInput<'a> {
    fn from(p: &'a Path) -> Self {
        ImageInput::Path(p)
    }
}

impl<'a> From<&'a PathBuf> for ImageInput<'a> {
    fn from(p: &'a PathBuf) -> Self {
        ImageInput::Path(p.as_path())
    }
}

impl<'a> From<&'a str> for ImageInput<'a> {
    fn from(s: &'a str) -> Self {
        ImageInput::Path(Path::new(s))
    }
}

fn non_empty(data: Option<&ArrayD<f32>>, context: impl FnOnce() -> String) -> PlotResult<ArrayD<f32>> {
    match data {
        Some(d) if !d.is_empty() => Ok(d.clone()),
        _ => Err(PlotError::NoData(context())),
    }
}

fn hdu_context(index: usize) -> String {
    format!("for HDU {}", index)
}

/// Pulls the numeric array out of `input`.
///
/// For files without a selector the first HDU carrying image data is used,
/// so multi-extension files with an empty primary still plot.
pub fn extract_data(input: ImageInput<'_>, hdu: Option<usize>) -> PlotResult<ArrayD<f32>> {
    match input {
        ImageInput::Array(a) => non_empty(Some(a), || format!("in array of shape {:?}", a.shape())),
        ImageInput::Hdu(h) => non_empty(h.data.as_ref(), || "in the given HDU".to_string()),
        ImageInput::HduList(list) => {
            let index = hdu.unwrap_or(0);
            non_empty(
                list.get(index).and_then(|h| h.data.as_ref()),
                || hdu_context(index),
            )
        }
        ImageInput::Path(path) => {
            let unsupported = |e: anyhow::Error| {
                PlotError::UnsupportedInputType(format!("{} ({:#})", path.display(), e))
            };
            let source = resolve_fits_source(path).map_err(unsupported)?;
            let list = read_source(&source).map_err(unsupported)?;
            log::debug!("{} HDUs read from {:?}", list.len(), path);

            match hdu {
                Some(index) => non_empty(
                    list.get(index).and_then(|h| h.data.as_ref()),
                    || hdu_context(index),
                ),
                None => non_empty(
                    list.hdus
                        .iter()
                        .filter_map(|h| h.data.as_ref())
                        .find(|d| !d.is_empty()),
                    || path.display().to_string(),
                ),
            }
        }
    }
}
