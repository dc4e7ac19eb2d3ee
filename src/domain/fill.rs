use serde::{Deserialize, Serialize};

use crate::domain::session::Session;
use crate::error::{PlotError, PlotResult};
use crate::model::{AxesRef, BandArtist, Rgb, TwinY};

const BAND_ALPHA: f64 = 0.3;
const MARGIN_FRACTION: f64 = 0.05;

/// One edge of a shaded band: a constant or one value per x.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Band {
    Scalar(f64),
    Series(Vec<f64>),
}

impl From<f64> for Band {
    fn from(v: f64) -> Self {
        Band::Scalar(v)
    }
}

impl From<Vec<f64>> for Band {
    fn from(v: Vec<f64>) -> Self {
        Band::Series(v)
    }
}

impl Band {
    fn expand(&self, len: usize) -> PlotResult<Vec<f64>> {
        match self {
            Band::Scalar(v) => Ok(vec![*v; len]),
            Band::Series(s) if s.len() == len => Ok(s.clone()),
            Band::Series(s) => Err(PlotError::BandLength { band: s.len(), x: len }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillBetween {
    pub bottom: Option<Band>,
    pub top: Option<Band>,
    /// Label of the secondary y axis.
    pub ylabel: Option<String>,
    /// Band colour, also used for the secondary axis labels.
    pub facecolor: Option<Rgb>,
    pub alpha: Option<f64>,
    /// Legend entry.
    pub label: Option<String>,
}

fn max_of(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min_of(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Shades between `bottom` and `top` on a secondary y scale of `axes`,
/// against the x values of the first line drawn there.
pub fn fill_between(session: &mut Session, axes: AxesRef, fb: &FillBetween) -> PlotResult<()> {
    if fb.bottom.is_none() && fb.top.is_none() {
        return Ok(());
    }

    let target = session.axes_mut(axes)?;
    let x = target
        .lines()
        .next()
        .filter(|l| !l.x.is_empty())
        .map(|l| l.x.clone())
        .ok_or(PlotError::NoLine)?;
    let n = x.len();

    let bottom = match &fb.bottom {
        Some(b) => b.expand(n)?,
        None => vec![0.0; n],
    };
    let top = match &fb.top {
        Some(t) => t.expand(n)?,
        None => vec![max_of(&bottom); n],
    };

    let (lo, hi) = (min_of(&bottom), max_of(&top));
    let margin = MARGIN_FRACTION * (hi - lo);
    let ylim = (lo - margin, hi + margin);
    log::debug!("band on {} over {} points, twin ylim {:?}", axes, n, ylim);

    let twin = target.twin.get_or_insert_with(TwinY::default);
    twin.bands.push(BandArtist {
        x,
        bottom,
        top,
        color: fb.facecolor.unwrap_or(Rgb::ORANGE),
        alpha: fb.alpha.unwrap_or(BAND_ALPHA),
        label: fb.label.clone(),
    });
    if fb.ylabel.is_some() {
        twin.ylabel = fb.ylabel.clone();
    }
    twin.color = fb.facecolor;
    twin.ylim = Some(ylim);
    Ok(())
}
