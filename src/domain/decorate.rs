use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::fill::{fill_between, FillBetween};
use crate::domain::session::Session;
use crate::error::{PlotError, PlotResult};
use crate::model::{
    Artist, Axes, AxesRef, LegendOptions, Limit, LineArtist, Orientation, RefLineArtist, Rgb,
    SpanArtist, TextArtist,
};

const SPAN_ALPHA: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanArgs {
    #[serde(alias = "xmin", alias = "ymin")]
    pub min: f64,
    #[serde(alias = "xmax", alias = "ymax")]
    pub max: f64,
    #[serde(default, alias = "facecolor")]
    pub color: Option<Rgb>,
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
}

impl SpanArgs {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            color: None,
            alpha: None,
            label: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefLineArgs {
    #[serde(alias = "x", alias = "y")]
    pub value: f64,
    #[serde(default)]
    pub color: Option<Rgb>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextArgs {
    pub x: f64,
    pub y: f64,
    #[serde(alias = "s")]
    pub text: String,
    #[serde(default)]
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotArgs {
    /// Defaults to `0..y.len()`.
    #[serde(default)]
    pub x: Option<Vec<f64>>,
    pub y: Vec<f64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub color: Option<Rgb>,
}

fn visible_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridArgs {
    #[serde(default = "visible_default")]
    pub visible: bool,
}

/// Cosmetic operations that can be requested by name on an axes.
///
/// Serialized as `{"method": {kwargs}}`; the variant names double as the
/// method registry for [`AxesOp::from_method`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxesOp {
    AxVSpan(SpanArgs),
    AxHSpan(SpanArgs),
    AxVLine(RefLineArgs),
    AxHLine(RefLineArgs),
    Text(TextArgs),
    Plot(PlotArgs),
    Grid(GridArgs),
}

impl AxesOp {
    pub const METHODS: [&'static str; 7] = [
        "axvspan", "axhspan", "axvline", "axhline", "text", "plot", "grid",
    ];

    /// Builds the operations for `name` from one kwargs object or a list of them.
    pub fn from_method(name: &str, kwargs: &Value) -> PlotResult<Vec<AxesOp>> {
        if !Self::METHODS.contains(&name) {
            return Err(PlotError::UnknownAxesMethod(name.to_string()));
        }
        let sets: Vec<&Value> = match kwargs {
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };
        sets.into_iter()
            .map(|args| {
                let tagged = Value::Object([(name.to_string(), args.clone())].into_iter().collect());
                serde_json::from_value(tagged).map_err(|e| {
                    PlotError::Other(anyhow::anyhow!("bad arguments for {}: {}", name, e))
                })
            })
            .collect()
    }

    /// Reads `{"name": kwargs | [kwargs, ...], ...}` or a list of such objects.
    pub fn parse_all(value: &Value) -> PlotResult<Vec<AxesOp>> {
        match value {
            Value::Object(map) => {
                let mut ops = Vec::new();
                for (name, kwargs) in map {
                    ops.extend(Self::from_method(name, kwargs)?);
                }
                Ok(ops)
            }
            Value::Array(items) => {
                let mut ops = Vec::new();
                for item in items {
                    ops.extend(Self::parse_all(item)?);
                }
                Ok(ops)
            }
            Value::Null => Ok(Vec::new()),
            other => Err(PlotError::Other(anyhow::anyhow!(
                "ax_methods must map method names to arguments, got {}",
                other
            ))),
        }
    }

    pub fn is_vspan(&self) -> bool {
        matches!(self, AxesOp::AxVSpan(_))
    }

    pub fn apply(&self, axes: &mut Axes) {
        let artist = match self {
            AxesOp::AxVSpan(s) => span(Orientation::Vertical, s),
            AxesOp::AxHSpan(s) => span(Orientation::Horizontal, s),
            AxesOp::AxVLine(l) => ref_line(Orientation::Vertical, l),
            AxesOp::AxHLine(l) => ref_line(Orientation::Horizontal, l),
            AxesOp::Text(t) => Artist::Text(TextArtist {
                x: t.x,
                y: t.y,
                text: t.text.clone(),
                color: t.color.unwrap_or(Rgb::BLACK),
            }),
            AxesOp::Plot(p) => Artist::Line(LineArtist {
                x: p
                    .x
                    .clone()
                    .unwrap_or_else(|| (0..p.y.len()).map(|i| i as f64).collect()),
                y: p.y.clone(),
                label: p.label.clone(),
                color: p.color,
            }),
            AxesOp::Grid(g) => {
                axes.grid = g.visible;
                return;
            }
        };
        axes.artists.push(artist);
    }
}

fn span(orientation: Orientation, s: &SpanArgs) -> Artist {
    Artist::Span(SpanArtist {
        orientation,
        min: s.min,
        max: s.max,
        color: s.color.unwrap_or(Rgb::GRAY),
        alpha: s.alpha.unwrap_or(SPAN_ALPHA),
        label: s.label.clone(),
    })
}

fn ref_line(orientation: Orientation, l: &RefLineArgs) -> Artist {
    Artist::RefLine(RefLineArtist {
        orientation,
        value: l.value,
        color: l.color.unwrap_or(Rgb::BLACK),
        label: l.label.clone(),
    })
}

fn de_ax_methods<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<AxesOp>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    AxesOp::parse_all(&value).map_err(serde::de::Error::custom)
}

/// Optional decorations applied to an axes after drawing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotProps {
    pub xlim: Option<Limit>,
    pub ylim: Option<Limit>,
    /// Shows a legend; an unset anchor uses the configured default.
    pub legend: Option<LegendOptions>,
    pub title: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub fill_between: Option<FillBetween>,
    /// Vertical span shorthand, skipped when `ax_methods` already holds an `axvspan`.
    pub vspan: Option<SpanArgs>,
    #[serde(deserialize_with = "de_ax_methods")]
    pub ax_methods: Vec<AxesOp>,
    pub save: Option<PathBuf>,
    /// Defaults to `save.is_none()`.
    pub show: Option<bool>,
    pub close: bool,
}

impl PlotProps {
    pub fn should_show(&self) -> bool {
        self.show.unwrap_or(self.save.is_none())
    }
}

/// Applies `props` to `axes`, then saves, shows and closes its figure as asked.
pub fn set_plot_props(session: &mut Session, axes: AxesRef, props: &PlotProps) -> PlotResult<()> {
    {
        let target = session.axes_mut(axes)?;
        for op in &props.ax_methods {
            op.apply(target);
        }
        if let Some(v) = &props.vspan {
            if props.ax_methods.iter().any(AxesOp::is_vspan) {
                log::debug!("vspan shorthand ignored, axvspan given in ax_methods");
            } else {
                AxesOp::AxVSpan(v.clone()).apply(target);
            }
        }
    }

    if let Some(fb) = &props.fill_between {
        fill_between(session, axes, fb)?;
    }

    let default_loc = session.config().legend_loc;
    let target = session.axes_mut(axes)?;
    if let Some(title) = &props.title {
        target.title = Some(title.clone());
    }
    if let Some(label) = &props.xlabel {
        target.xlabel = Some(label.clone());
    }
    if let Some(label) = &props.ylabel {
        target.ylabel = Some(label.clone());
    }
    if let Some(legend) = &props.legend {
        target.legend = Some(LegendOptions {
            loc: legend.loc.or(Some(default_loc)),
            title: legend.title.clone(),
        });
    }
    if let Some(lim) = props.xlim {
        target.xlim = Some(lim.bounds());
    }
    if let Some(lim) = props.ylim {
        target.ylim = Some(lim.bounds());
    }

    if let Some(path) = &props.save {
        session.save(axes.figure, path)?;
    }
    if props.should_show() {
        session.show(axes.figure)?;
    }
    if props.close {
        session.close(axes.figure);
    }
    Ok(())
}
