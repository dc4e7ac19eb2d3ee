use ndarray::ArrayViewD;
use serde::{Deserialize, Serialize};

/// Computes display contrast limits for an image buffer.
pub trait ContrastScale: Send {
    fn limits(&self, data: &ArrayViewD<f32>) -> (f64, f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZScaleParams {
    pub n_samples: usize,
    pub contrast: f64,
    pub max_reject: f64,
    pub min_npixels: usize,
    pub krej: f64,
    pub max_iterations: usize,
}

impl Default for ZScaleParams {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            contrast: 0.25,
            max_reject: 0.5,
            min_npixels: 5,
            krej: 2.5,
            max_iterations: 5,
        }
    }
}

/// IRAF-style zscale: fits a line to the sorted sample with iterative
/// rejection and stretches the median by slope / contrast.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZScale {
    pub params: ZScaleParams,
}

impl ZScale {
    pub fn new(params: ZScaleParams) -> Self {
        Self { params }
    }
}

impl ContrastScale for ZScale {
    fn limits(&self, data: &ArrayViewD<f32>) -> (f64, f64) {
        zscale(data, &self.params)
    }
}

fn sample(data: &ArrayViewD<f32>, n_samples: usize) -> Vec<f64> {
    let stride = (data.len() / n_samples.max(1)).max(1);
    let mut samples: Vec<f64> = data
        .iter()
        .step_by(stride)
        .take(n_samples)
        .filter(|v| v.is_finite())
        .map(|&v| v as f64)
        .collect();
    samples.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    samples
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Least-squares line through the good points; returns (slope, intercept).
fn fit_line(y: &[f64], bad: &[bool]) -> (f64, f64) {
    let good = || y.iter().enumerate().filter(|(i, _)| !bad[*i]);
    let n = good().count() as f64;
    let x_mean = good().map(|(i, _)| i as f64).sum::<f64>() / n;
    let y_mean = good().map(|(_, v)| *v).sum::<f64>() / n;

    let (sxy, sxx) = good().fold((0.0, 0.0), |(sxy, sxx), (i, v)| {
        let dx = i as f64 - x_mean;
        (sxy + dx * (v - y_mean), sxx + dx * dx)
    });
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (slope, y_mean - slope * x_mean)
}

/// Marks every point within `width` of a rejected one.
fn grow_mask(bad: &[bool], width: usize) -> Vec<bool> {
    let n = bad.len();
    let before = (width - 1) / 2;
    let after = width - 1 - before;
    let mut grown = vec![false; n];
    for (i, _) in bad.iter().enumerate().filter(|(_, b)| **b) {
        let lo = i.saturating_sub(before);
        let hi = (i + after).min(n - 1);
        grown[lo..=hi].iter_mut().for_each(|g| *g = true);
    }
    grown
}

pub fn zscale(data: &ArrayViewD<f32>, params: &ZScaleParams) -> (f64, f64) {
    let samples = sample(data, params.n_samples);
    let npix = samples.len();
    if npix == 0 {
        return (0.0, 1.0);
    }

    let (mut vmin, mut vmax) = (samples[0], samples[npix - 1]);

    let min_pix = params
        .min_npixels
        .max((npix as f64 * params.max_reject) as usize);
    let grow = ((npix as f64 * 0.01) as usize).max(1);

    let mut bad = vec![false; npix];
    let mut good_count = npix;
    let mut last_good_count = npix + 1;
    let mut fit = None;

    for _ in 0..params.max_iterations {
        if good_count >= last_good_count || good_count < min_pix {
            break;
        }

        let (slope, intercept) = fit_line(&samples, &bad);
        fit = Some(slope);

        let flat: Vec<f64> = samples
            .iter()
            .enumerate()
            .map(|(i, v)| v - (intercept + slope * i as f64))
            .collect();

        let good_flat: Vec<f64> = flat
            .iter()
            .enumerate()
            .filter(|(i, _)| !bad[*i])
            .map(|(_, f)| *f)
            .collect();
        let mean = good_flat.iter().sum::<f64>() / good_flat.len() as f64;
        let std = (good_flat.iter().map(|f| (f - mean).powi(2)).sum::<f64>()
            / good_flat.len() as f64)
            .sqrt();
        let threshold = params.krej * std;

        for (b, f) in bad.iter_mut().zip(&flat) {
            if *f < -threshold || *f > threshold {
                *b = true;
            }
        }
        bad = grow_mask(&bad, grow);

        last_good_count = good_count;
        good_count = bad.iter().filter(|b| !**b).count();
    }

    if let Some(slope) = fit {
        if good_count >= min_pix {
            let slope = if params.contrast > 0.0 {
                slope / params.contrast
            } else {
                slope
            };
            let center = ((npix - 1) / 2) as f64;
            let median = median_sorted(&samples);
            vmin = vmin.max(median - (center - 1.0) * slope);
            vmax = vmax.min(median + (npix as f64 - center) * slope);
        }
    }

    log::debug!("zscale over {} samples -> ({}, {})", npix, vmin, vmax);
    (vmin, vmax)
}
