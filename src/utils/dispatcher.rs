use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tempfile::TempDir;

/// A path resolved to something the FITS reader can open.
pub enum FitsSource {
    Plain(PathBuf),
    Gzip(PathBuf),
    /// First FITS member of a ZIP archive, extracted into a temp dir that
    /// lives as long as this value.
    Extracted { path: PathBuf, _tmp: TempDir },
}

impl FitsSource {
    pub fn path(&self) -> &Path {
        match self {
            FitsSource::Plain(p) | FitsSource::Gzip(p) => p,
            FitsSource::Extracted { path, .. } => path,
        }
    }
}

pub fn resolve_fits_source(path: &Path) -> Result<FitsSource> {
    if !path.is_file() {
        bail!("{:?} is not a readable file", path);
    }
    if is_fits_path(path) {
        Ok(FitsSource::Plain(path.to_path_buf()))
    } else if is_gzip_fits_path(path) {
        Ok(FitsSource::Gzip(path.to_path_buf()))
    } else if is_zip_path(path) {
        extract_first_fits(path)
    } else {
        bail!("{:?} is not a FITS file", path);
    }
}

fn is_fits_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".fits") || lower.ends_with(".fit") || lower.ends_with(".fts")
}

fn is_fits_path(p: &Path) -> bool {
    p.file_name()
        .map(|n| is_fits_name(&n.to_string_lossy()))
        .unwrap_or(false)
}

fn is_gzip_fits_path(p: &Path) -> bool {
    p.file_name()
        .map(|n| {
            let name = n.to_string_lossy().to_ascii_lowercase();
            name.strip_suffix(".gz").map(is_fits_name).unwrap_or(false)
        })
        .unwrap_or(false)
}

fn is_zip_path(p: &Path) -> bool {
    p.extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

fn extract_first_fits(zip_path: &Path) -> Result<FitsSource> {
    let tmp = TempDir::new().context("Failed to create temp directory")?;

    let file = File::open(zip_path)
        .with_context(|| format!("Failed to open ZIP {:?}", zip_path))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive {:?}", zip_path))?;

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| !n.ends_with('/') && is_fits_name(n))
        .map(str::to_string)
        .collect();
    names.sort();

    let Some(name) = names.into_iter().next() else {
        bail!("No .fits files found inside ZIP {:?}", zip_path);
    };

    let mut entry = archive
        .by_name(&name)
        .with_context(|| format!("Failed to read ZIP entry {}", name))?;
    let file_name = Path::new(&name)
        .file_name()
        .unwrap_or_default()
        .to_os_string();
    let out_path = tmp.path().join(file_name);
    let mut out_file = File::create(&out_path)
        .with_context(|| format!("Failed to create extracted file {:?}", out_path))?;
    io::copy(&mut entry, &mut out_file)
        .with_context(|| format!("Failed to extract {:?}", name))?;

    log::debug!("extracted {} from {:?}", name, zip_path);
    Ok(FitsSource::Extracted {
        path: out_path,
        _tmp: tmp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_fits_path() {
        assert!(is_fits_path(Path::new("data.fits")));
        assert!(is_fits_path(Path::new("data.FIT")));
        assert!(is_fits_path(Path::new("data.fts")));
        assert!(!is_fits_path(Path::new("data.zip")));
        assert!(!is_fits_path(Path::new("data.png")));
    }

    #[test]
    fn test_is_gzip_fits_path() {
        assert!(is_gzip_fits_path(Path::new("/raw/20190827_043.fits.gz")));
        assert!(!is_gzip_fits_path(Path::new("notes.txt.gz")));
        assert!(!is_gzip_fits_path(Path::new("image.fits")));
    }

    #[test]
    fn test_is_zip_path() {
        assert!(is_zip_path(Path::new("archive.zip")));
        assert!(is_zip_path(Path::new("archive.ZIP")));
        assert!(!is_zip_path(Path::new("data.fits")));
    }

    #[test]
    fn test_missing_file_rejected() {
        assert!(resolve_fits_source(Path::new("/definitely/not/here.fits")).is_err());
    }

    #[test]
    fn test_non_fits_file_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("notes.txt");
        std::fs::write(&p, "hello").unwrap();
        assert!(resolve_fits_source(&p).is_err());
    }
}
