use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FigureId(pub u32);

impl fmt::Display for FigureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Figure {}", self.0)
    }
}

/// Handle to one sub-surface of a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxesRef {
    pub figure: FigureId,
    pub index: usize,
}

impl fmt::Display for AxesRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Axes {} of {}", self.index, self.figure)
    }
}

/// Visible coordinate range on both axes. Pairs may be reversed to flip an axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl Window {
    pub fn full(rows: usize, cols: usize) -> Self {
        Self {
            x: (0.0, cols as f64),
            y: (0.0, rows as f64),
        }
    }
}

/// An axis limit: an explicit range, or a single number meaning `[0, number]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Limit {
    Range(f64, f64),
    Upper(f64),
}

impl Limit {
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Limit::Range(lo, hi) => (lo, hi),
            Limit::Upper(hi) => (0.0, hi),
        }
    }
}

impl From<f64> for Limit {
    fn from(v: f64) -> Self {
        Limit::Upper(v)
    }
}

impl From<(f64, f64)> for Limit {
    fn from((lo, hi): (f64, f64)) -> Self {
        Limit::Range(lo, hi)
    }
}

/// Where row 0 of an image is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Gray,
    Viridis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const GRAY: Rgb = Rgb(128, 128, 128);
    pub const BLUE: Rgb = Rgb(31, 119, 180);
    pub const ORANGE: Rgb = Rgb(255, 127, 14);
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(format!("bad hex colour '{}'", s));
            }
            let channel = |i: usize| {
                u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("bad hex colour '{}': {}", s, e))
            };
            return Ok(Rgb(channel(0)?, channel(2)?, channel(4)?));
        }
        match s.to_ascii_lowercase().as_str() {
            "k" | "black" => Ok(Rgb::BLACK),
            "w" | "white" => Ok(Rgb(255, 255, 255)),
            "r" | "red" => Ok(Rgb(214, 39, 40)),
            "g" | "green" => Ok(Rgb(44, 160, 44)),
            "b" | "blue" => Ok(Rgb::BLUE),
            "y" | "yellow" => Ok(Rgb(255, 221, 0)),
            "c" | "cyan" => Ok(Rgb(23, 190, 207)),
            "m" | "magenta" => Ok(Rgb(227, 119, 194)),
            "orange" => Ok(Rgb::ORANGE),
            "gray" | "grey" => Ok(Rgb::GRAY),
            other => Err(format!("unknown colour '{}'", other)),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        format!("#{:02x}{:02x}{:02x}", c.0, c.1, c.2)
    }
}

/// Legend anchor, numbered like the usual `loc` codes (1 = upper right).
/// Deserializes from a code or a name such as `"upper left"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "LegendLocRepr")]
pub enum LegendLoc {
    Best,
    UpperRight,
    UpperLeft,
    LowerLeft,
    LowerRight,
    Right,
    CenterLeft,
    CenterRight,
    LowerCenter,
    UpperCenter,
    Center,
}

impl LegendLoc {
    pub fn from_code(code: u8) -> Option<Self> {
        use LegendLoc::*;
        Some(match code {
            0 => Best,
            1 => UpperRight,
            2 => UpperLeft,
            3 => LowerLeft,
            4 => LowerRight,
            5 => Right,
            6 => CenterLeft,
            7 => CenterRight,
            8 => LowerCenter,
            9 => UpperCenter,
            10 => Center,
            _ => return None,
        })
    }
}

impl FromStr for LegendLoc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use LegendLoc::*;
        Ok(match s.trim().to_ascii_lowercase().replace(' ', "_").as_str() {
            "best" => Best,
            "upper_right" => UpperRight,
            "upper_left" => UpperLeft,
            "lower_left" => LowerLeft,
            "lower_right" => LowerRight,
            "right" => Right,
            "center_left" => CenterLeft,
            "center_right" => CenterRight,
            "lower_center" => LowerCenter,
            "upper_center" => UpperCenter,
            "center" => Center,
            _ => return Err(format!("unknown legend location '{}'", s)),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LegendLocRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<LegendLocRepr> for LegendLoc {
    type Error = String;

    fn try_from(repr: LegendLocRepr) -> Result<Self, Self::Error> {
        match repr {
            LegendLocRepr::Code(code) => {
                LegendLoc::from_code(code).ok_or_else(|| format!("unknown legend code {}", code))
            }
            LegendLocRepr::Name(name) => name.parse(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendOptions {
    pub loc: Option<LegendLoc>,
    pub title: Option<String>,
}

/// Tick label pattern for date axes, coarsest last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    HourMinuteSecond,
    HourMinute,
    DayMinute,
    YearMonth,
    Year,
}

impl DateFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            DateFormat::HourMinuteSecond => "%H:%M:%S",
            DateFormat::HourMinute => "%H:%M",
            DateFormat::DayMinute => "%Y-%b-%d %H:%M",
            DateFormat::YearMonth => "%Y %b",
            DateFormat::Year => "%Y",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageArtist {
    pub data: Array2<f32>,
    pub vmin: f64,
    pub vmax: f64,
    pub origin: Origin,
    /// `[x0, x1, y0, y1]` in data coordinates.
    pub extent: [f64; 4],
    pub cmap: Colormap,
}

#[derive(Debug, Clone, Default)]
pub struct LineArtist {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub label: Option<String>,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone)]
pub struct SpanArtist {
    pub orientation: Orientation,
    pub min: f64,
    pub max: f64,
    pub color: Rgb,
    pub alpha: f64,
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RefLineArtist {
    pub orientation: Orientation,
    pub value: f64,
    pub color: Rgb,
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TextArtist {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub color: Rgb,
}

#[derive(Debug, Clone)]
pub enum Artist {
    Image(ImageArtist),
    Line(LineArtist),
    Span(SpanArtist),
    RefLine(RefLineArtist),
    Text(TextArtist),
}

#[derive(Debug, Clone)]
pub struct BandArtist {
    pub x: Vec<f64>,
    pub bottom: Vec<f64>,
    pub top: Vec<f64>,
    pub color: Rgb,
    pub alpha: f64,
    pub label: Option<String>,
}

/// Secondary y scale sharing the x axis of its parent axes.
#[derive(Debug, Clone, Default)]
pub struct TwinY {
    pub bands: Vec<BandArtist>,
    pub ylabel: Option<String>,
    pub color: Option<Rgb>,
    pub ylim: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Default)]
pub struct Axes {
    pub artists: Vec<Artist>,
    pub title: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub xlim: Option<(f64, f64)>,
    pub ylim: Option<(f64, f64)>,
    pub legend: Option<LegendOptions>,
    pub x_ticklabels: Option<Vec<String>>,
    pub y_ticklabels: Option<Vec<String>>,
    pub x_date_format: Option<DateFormat>,
    pub grid: bool,
    pub twin: Option<TwinY>,
}

impl Axes {
    pub fn clear(&mut self) {
        *self = Axes::default();
    }

    pub fn lines(&self) -> impl Iterator<Item = &LineArtist> {
        self.artists.iter().filter_map(|a| match a {
            Artist::Line(l) => Some(l),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageArtist> {
        self.artists.iter().filter_map(|a| match a {
            Artist::Image(i) => Some(i),
            _ => None,
        })
    }

    pub fn spans(&self) -> impl Iterator<Item = &SpanArtist> {
        self.artists.iter().filter_map(|a| match a {
            Artist::Span(s) => Some(s),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty() && self.twin.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Colorbar {
    pub axes: usize,
    pub vmin: f64,
    pub vmax: f64,
    pub cmap: Colormap,
}

/// Top-level canvas holding one or more axes.
#[derive(Debug, Clone)]
pub struct Figure {
    pub id: FigureId,
    /// Pixel size used when the figure is rendered.
    pub size: (u32, u32),
    pub axes: Vec<Axes>,
    pub colorbars: Vec<Colorbar>,
}

impl Figure {
    pub fn new(id: FigureId, size: (u32, u32)) -> Self {
        Self {
            id,
            size,
            axes: Vec::new(),
            colorbars: Vec::new(),
        }
    }

    pub fn clf(&mut self) {
        self.axes.clear();
        self.colorbars.clear();
    }

    pub fn add_subplot(&mut self) -> usize {
        self.axes.push(Axes::default());
        self.axes.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_upper_means_from_zero() {
        assert_eq!(Limit::from(12.0).bounds(), (0.0, 12.0));
        assert_eq!(Limit::from((3.0, 5.0)).bounds(), (3.0, 5.0));
    }

    #[test]
    fn test_limit_deserializes_number_or_pair() {
        let upper: Limit = serde_json::from_str("7.5").unwrap();
        assert_eq!(upper.bounds(), (0.0, 7.5));
        let range: Limit = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(range.bounds(), (1.0, 2.0));
    }

    #[test]
    fn test_rgb_parsing() {
        assert_eq!("#ff8000".parse::<Rgb>().unwrap(), Rgb(255, 128, 0));
        assert_eq!("black".parse::<Rgb>().unwrap(), Rgb::BLACK);
        assert!("chartreuse-ish".parse::<Rgb>().is_err());
        assert!("#12".parse::<Rgb>().is_err());
        assert!("#aéabc".parse::<Rgb>().is_err());
        assert!(serde_json::from_str::<Rgb>(r##""#aéabc""##).is_err());
    }

    #[test]
    fn test_legend_codes() {
        assert_eq!(LegendLoc::from_code(1), Some(LegendLoc::UpperRight));
        assert_eq!(LegendLoc::from_code(10), Some(LegendLoc::Center));
        assert_eq!(LegendLoc::from_code(11), None);
    }

    #[test]
    fn test_legend_loc_from_code_or_name() {
        let loc = |json: &str| serde_json::from_str::<LegendLoc>(json);
        assert_eq!(loc("1").unwrap(), LegendLoc::UpperRight);
        assert_eq!(loc("10").unwrap(), LegendLoc::Center);
        assert_eq!(loc(r#""upper left""#).unwrap(), LegendLoc::UpperLeft);
        assert_eq!(loc(r#""lower_right""#).unwrap(), LegendLoc::LowerRight);
        assert!(loc("11").is_err());
        assert!(loc(r#""somewhere""#).is_err());

        let saved = serde_json::to_string(&LegendLoc::CenterLeft).unwrap();
        assert_eq!(saved, r#""center_left""#);
        assert_eq!(loc(&saved).unwrap(), LegendLoc::CenterLeft);
    }

    #[test]
    fn test_clf_drops_axes_and_colorbars() {
        let mut fig = Figure::new(FigureId(1), (640, 480));
        let idx = fig.add_subplot();
        fig.colorbars.push(Colorbar {
            axes: idx,
            vmin: 0.0,
            vmax: 1.0,
            cmap: Colormap::Gray,
        });
        fig.clf();
        assert!(fig.axes.is_empty());
        assert!(fig.colorbars.is_empty());
    }
}
