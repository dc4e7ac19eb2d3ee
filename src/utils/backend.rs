use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use plotters::chart::DualCoordChartContext;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::{CoordTranslate, Shift};
use plotters::prelude::*;
use plotters::style::colors::colormaps::ViridisRGB;

use crate::model::{
    Artist, Axes, Colorbar, Colormap, DateFormat, Figure, ImageArtist, LegendLoc, Orientation,
    Origin, Rgb,
};
use crate::utils::render::scale_to_byte;

/// Persists and displays figures on behalf of a session.
pub trait Backend: Send {
    fn save(&mut self, figure: &Figure, path: &Path) -> Result<()>;
    fn show(&mut self, figure: &Figure) -> Result<()>;
}

const FONT: &str = "sans-serif";
const TITLE_SIZE: i32 = 20;
const LABEL_SIZE: i32 = 14;
const COLORBAR_WIDTH: u32 = 90;
const LINE_COLORS: [Rgb; 4] = [Rgb::BLUE, Rgb::ORANGE, Rgb(44, 160, 44), Rgb(214, 39, 40)];

/// Renders with `plotters`: PNG for bitmap extensions, SVG for `.svg`.
/// `show` has no window to draw into and writes a preview PNG instead.
pub struct PlottersBackend {
    preview_dir: PathBuf,
    shown: usize,
}

impl PlottersBackend {
    pub fn new(preview_dir: PathBuf) -> Self {
        Self {
            preview_dir,
            shown: 0,
        }
    }
}

impl Backend for PlottersBackend {
    fn save(&mut self, figure: &Figure, path: &Path) -> Result<()> {
        render_figure(figure, path)?;
        log::info!("saved {} to {:?}", figure.id, path);
        Ok(())
    }

    fn show(&mut self, figure: &Figure) -> Result<()> {
        std::fs::create_dir_all(&self.preview_dir)
            .with_context(|| format!("Failed to create preview dir {:?}", self.preview_dir))?;
        self.shown += 1;
        let path = self
            .preview_dir
            .join(format!("figure_{}_{:03}.png", figure.id.0, self.shown));
        render_figure(figure, &path)?;
        log::info!("{} preview written to {:?}", figure.id, path);
        Ok(())
    }
}

fn plot_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("plot rendering failed: {}", e)
}

pub fn render_figure(figure: &Figure, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output dir {:?}", parent))?;
    }
    let is_svg = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if is_svg {
        let root = SVGBackend::new(path, figure.size).into_drawing_area();
        draw_figure(figure, &root)?;
        root.present().map_err(plot_err)?;
    } else {
        let root = BitMapBackend::new(path, figure.size).into_drawing_area();
        draw_figure(figure, &root)?;
        root.present().map_err(plot_err)?;
    }
    Ok(())
}

/// Rows and columns of the subplot grid for `n` axes.
pub fn grid_shape(n: usize) -> (usize, usize) {
    if n == 0 {
        return (1, 1);
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    (n.div_ceil(cols), cols)
}

fn draw_figure<DB: DrawingBackend>(figure: &Figure, root: &DrawingArea<DB, Shift>) -> Result<()> {
    root.fill(&WHITE).map_err(plot_err)?;
    let areas = root.split_evenly(grid_shape(figure.axes.len()));

    for (i, (axes, area)) in figure.axes.iter().zip(areas.iter()).enumerate() {
        let colorbar = figure.colorbars.iter().find(|c| c.axes == i);
        match colorbar {
            Some(cb) => {
                let width = area.dim_in_pixel().0.saturating_sub(COLORBAR_WIDTH);
                let (plot_area, bar_area) = area.split_horizontally(width);
                draw_axes(&plot_area, axes)?;
                draw_colorbar(&bar_area, cb)?;
            }
            None => draw_axes(area, axes)?,
        }
    }
    Ok(())
}

pub fn to_plotters(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

pub fn colormap_color(cmap: Colormap, v: f32, vmin: f64, vmax: f64) -> RGBColor {
    match cmap {
        Colormap::Gray => {
            let b = scale_to_byte(v, vmin, vmax);
            RGBColor(b, b, b)
        }
        Colormap::Viridis => {
            if !v.is_finite() {
                return BLACK;
            }
            let t = ((v as f64 - vmin) / (vmax - vmin).max(1e-30)).clamp(0.0, 1.0);
            ViridisRGB.get_color(t)
        }
    }
}

fn legend_position(loc: LegendLoc) -> SeriesLabelPosition {
    match loc {
        LegendLoc::Best | LegendLoc::UpperRight => SeriesLabelPosition::UpperRight,
        LegendLoc::UpperLeft => SeriesLabelPosition::UpperLeft,
        LegendLoc::LowerLeft => SeriesLabelPosition::LowerLeft,
        LegendLoc::LowerRight => SeriesLabelPosition::LowerRight,
        LegendLoc::Right | LegendLoc::CenterRight => SeriesLabelPosition::MiddleRight,
        LegendLoc::CenterLeft => SeriesLabelPosition::MiddleLeft,
        LegendLoc::LowerCenter => SeriesLabelPosition::LowerMiddle,
        LegendLoc::UpperCenter => SeriesLabelPosition::UpperMiddle,
        LegendLoc::Center => SeriesLabelPosition::MiddleMiddle,
    }
}

pub fn format_tick(v: f64) -> String {
    let a = v.abs();
    if a != 0.0 && !(1e-3..1e5).contains(&a) {
        return format!("{:.2e}", v);
    }
    let s = format!("{:.3}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn format_date_tick(plot_date: f64, format: DateFormat) -> String {
    let secs = plot_date * 86_400.0;
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos)
        .map(|t| t.format(format.pattern()).to_string())
        .unwrap_or_default()
}

fn widen(lo: f64, hi: f64) -> (f64, f64) {
    if (hi - lo).abs() < f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

fn data_range(axes: &Axes) -> ((f64, f64), (f64, f64)) {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    let take = |r: &mut (f64, f64), v: f64| {
        if v.is_finite() {
            r.0 = r.0.min(v);
            r.1 = r.1.max(v);
        }
    };
    for artist in &axes.artists {
        match artist {
            Artist::Image(img) => {
                let [x0, x1, y0, y1] = img.extent;
                take(&mut x, x0);
                take(&mut x, x1);
                take(&mut y, y0);
                take(&mut y, y1);
            }
            Artist::Line(l) => {
                l.x.iter().for_each(|v| take(&mut x, *v));
                l.y.iter().for_each(|v| take(&mut y, *v));
            }
            Artist::Span(s) => match s.orientation {
                Orientation::Vertical => {
                    take(&mut x, s.min);
                    take(&mut x, s.max);
                }
                Orientation::Horizontal => {
                    take(&mut y, s.min);
                    take(&mut y, s.max);
                }
            },
            Artist::RefLine(_) | Artist::Text(_) => {}
        }
    }
    let finish = |r: (f64, f64)| if r.0 <= r.1 { widen(r.0, r.1) } else { (0.0, 1.0) };
    (finish(x), finish(y))
}

/// Ascending range plus whether the requested limits run backwards.
fn oriented(lim: (f64, f64)) -> (f64, f64, bool) {
    let (lo, hi) = widen(lim.0.min(lim.1), lim.0.max(lim.1));
    (lo, hi, lim.0 > lim.1)
}

fn draw_axes<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, axes: &Axes) -> Result<()> {
    let (auto_x, auto_y) = data_range(axes);
    let (x0, x1, flip_x) = oriented(axes.xlim.unwrap_or(auto_x));
    let (y0, y1, flip_y) = oriented(axes.ylim.unwrap_or(auto_y));
    // Reversed limits are drawn by mirroring coordinates and relabelling ticks.
    let fx = move |v: f64| if flip_x { x0 + x1 - v } else { v };
    let fy = move |v: f64| if flip_y { y0 + y1 - v } else { v };

    let twin = axes.twin.as_ref();
    let (t0, t1) = twin
        .and_then(|t| t.ylim)
        .map(|(a, b)| widen(a, b))
        .unwrap_or((y0, y1));

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .right_y_label_area_size(if twin.is_some() { 60 } else { 0 });
    if let Some(title) = &axes.title {
        builder.caption(title, (FONT, TITLE_SIZE));
    }
    let mut chart = builder
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(plot_err)?
        .set_secondary_coord(x0..x1, t0..t1);

    let blank_x = axes.x_ticklabels.is_some();
    let blank_y = axes.y_ticklabels.is_some();
    let date_format = axes.x_date_format;
    let x_fmt = move |v: &f64| {
        if blank_x {
            " ".to_string()
        } else if let Some(fmt) = date_format {
            format_date_tick(fx(*v), fmt)
        } else {
            format_tick(fx(*v))
        }
    };
    let y_fmt = move |v: &f64| {
        if blank_y {
            " ".to_string()
        } else {
            format_tick(fy(*v))
        }
    };

    let mut mesh = chart.configure_mesh();
    mesh.x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .label_style((FONT, LABEL_SIZE));
    if let Some(label) = &axes.xlabel {
        mesh.x_desc(label.as_str());
    }
    if let Some(label) = &axes.ylabel {
        mesh.y_desc(label.as_str());
    }
    if !axes.grid {
        mesh.disable_mesh();
    }
    mesh.draw().map_err(plot_err)?;

    let (px_w, px_h) = area.dim_in_pixel();
    let mut next_color = LINE_COLORS.iter().cycle();

    for artist in &axes.artists {
        match artist {
            Artist::Image(img) => draw_image(&mut chart, img, (px_w, px_h), &fx, &fy)?,
            Artist::Line(line) => {
                let color = to_plotters(line.color.unwrap_or(*next_color.next().unwrap_or(&Rgb::BLUE)));
                let points: Vec<(f64, f64)> = line
                    .x
                    .iter()
                    .zip(&line.y)
                    .map(|(x, y)| (fx(*x), fy(*y)))
                    .collect();
                let anno = chart
                    .draw_series(LineSeries::new(points, color.stroke_width(2)))
                    .map_err(plot_err)?;
                if let Some(label) = &line.label {
                    anno.label(label.as_str()).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
                }
            }
            Artist::Span(span) => {
                let color = to_plotters(span.color).mix(span.alpha);
                let corners = match span.orientation {
                    Orientation::Vertical => [(fx(span.min), y0), (fx(span.max), y1)],
                    Orientation::Horizontal => [(x0, fy(span.min)), (x1, fy(span.max))],
                };
                let anno = chart
                    .draw_series(std::iter::once(Rectangle::new(corners, color.filled())))
                    .map_err(plot_err)?;
                if let Some(label) = &span.label {
                    anno.label(label.as_str()).legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled())
                    });
                }
            }
            Artist::RefLine(line) => {
                let color = to_plotters(line.color);
                let points = match line.orientation {
                    Orientation::Vertical => vec![(fx(line.value), y0), (fx(line.value), y1)],
                    Orientation::Horizontal => vec![(x0, fy(line.value)), (x1, fy(line.value))],
                };
                chart
                    .draw_series(std::iter::once(PathElement::new(points, color.stroke_width(1))))
                    .map_err(plot_err)?;
            }
            Artist::Text(text) => {
                let style = (FONT, LABEL_SIZE).into_font().color(&to_plotters(text.color));
                chart
                    .draw_series(std::iter::once(Text::new(
                        text.text.clone(),
                        (fx(text.x), fy(text.y)),
                        style,
                    )))
                    .map_err(plot_err)?;
            }
        }
    }

    if let Some(twin) = twin {
        let color = to_plotters(twin.color.unwrap_or(Rgb::BLACK));
        let twin_fmt = |v: &f64| format_tick(*v);
        let mut secondary = chart.configure_secondary_axes();
        secondary
            .y_label_formatter(&twin_fmt)
            .label_style((FONT, LABEL_SIZE).into_font().color(&color));
        if let Some(label) = &twin.ylabel {
            secondary.y_desc(label.as_str());
        }
        secondary.draw().map_err(plot_err)?;

        for band in &twin.bands {
            let mut outline: Vec<(f64, f64)> = band
                .x
                .iter()
                .zip(&band.top)
                .map(|(x, t)| (fx(*x), *t))
                .collect();
            outline.extend(band.x.iter().zip(&band.bottom).rev().map(|(x, b)| (fx(*x), *b)));
            let fill = to_plotters(band.color).mix(band.alpha);
            chart
                .draw_secondary_series(std::iter::once(Polygon::new(outline, fill.filled())))
                .map_err(plot_err)?;
        }
    }

    if let Some(legend) = &axes.legend {
        chart
            .configure_series_labels()
            .position(legend_position(legend.loc.unwrap_or(LegendLoc::UpperRight)))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font((FONT, LABEL_SIZE))
            .draw()
            .map_err(plot_err)?;
    }

    Ok(())
}

fn draw_image<DB, CT2>(
    chart: &mut DualCoordChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>, CT2>,
    img: &ImageArtist,
    pixels: (u32, u32),
    fx: &impl Fn(f64) -> f64,
    fy: &impl Fn(f64) -> f64,
) -> Result<()>
where
    DB: DrawingBackend,
    CT2: CoordTranslate,
{
    let (rows, cols) = img.data.dim();
    if rows == 0 || cols == 0 {
        log::warn!("skipping empty image artist");
        return Ok(());
    }
    let [x0, x1, y0, y1] = img.extent;
    let dx = (x1 - x0) / cols as f64;
    let dy = (y1 - y0) / rows as f64;
    // One rectangle per screen pixel at most.
    let step = (cols / pixels.0.max(1) as usize)
        .max(rows / pixels.1.max(1) as usize)
        .max(1);

    let cells = (0..rows).step_by(step).flat_map(|r| {
        (0..cols).step_by(step).map(move |c| {
            let v = img.data[[r, c]];
            let c_end = (c + step).min(cols);
            let (ya, yb) = match img.origin {
                Origin::Lower => (y0 + r as f64 * dy, y0 + (r + step).min(rows) as f64 * dy),
                Origin::Upper => (y1 - r as f64 * dy, y1 - (r + step).min(rows) as f64 * dy),
            };
            let color = colormap_color(img.cmap, v, img.vmin, img.vmax);
            Rectangle::new(
                [(fx(x0 + c as f64 * dx), fy(ya)), (fx(x0 + c_end as f64 * dx), fy(yb))],
                color.filled(),
            )
        })
    });
    chart.draw_series(cells).map_err(plot_err)?;
    Ok(())
}

fn draw_colorbar<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, cb: &Colorbar) -> Result<()> {
    let (lo, hi) = widen(cb.vmin, cb.vmax);
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(0)
        .right_y_label_area_size(50)
        .build_cartesian_2d(0.0..1.0, lo..hi)
        .map_err(plot_err)?
        .set_secondary_coord(0.0..1.0, lo..hi);

    chart
        .configure_secondary_axes()
        .y_label_formatter(&|v: &f64| format_tick(*v))
        .label_style((FONT, LABEL_SIZE))
        .draw()
        .map_err(plot_err)?;

    const STEPS: usize = 128;
    let dv = (hi - lo) / STEPS as f64;
    chart
        .draw_series((0..STEPS).map(|i| {
            let v = lo + i as f64 * dv;
            let color = colormap_color(cb.cmap, v as f32, lo, hi);
            Rectangle::new([(0.0, v), (1.0, v + dv)], color.filled())
        }))
        .map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_shape() {
        assert_eq!(grid_shape(0), (1, 1));
        assert_eq!(grid_shape(1), (1, 1));
        assert_eq!(grid_shape(2), (1, 2));
        assert_eq!(grid_shape(3), (2, 2));
        assert_eq!(grid_shape(5), (2, 3));
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(0.0), "0");
        assert_eq!(format_tick(12.5), "12.5");
        assert_eq!(format_tick(200.0), "200");
        assert_eq!(format_tick(123456.0), "1.23e5");
    }

    #[test]
    fn test_format_date_tick() {
        // 2019-08-27T04:30:00 UTC
        let days = 18135.0 + 4.5 / 24.0;
        assert_eq!(format_date_tick(days, DateFormat::HourMinute), "04:30");
        assert_eq!(format_date_tick(days, DateFormat::YearMonth), "2019 Aug");
    }

    #[test]
    fn test_gray_colormap_endpoints() {
        assert_eq!(colormap_color(Colormap::Gray, 0.0, 0.0, 1.0), RGBColor(0, 0, 0));
        assert_eq!(colormap_color(Colormap::Gray, 1.0, 0.0, 1.0), RGBColor(255, 255, 255));
    }

    #[test]
    fn test_oriented_flags_reversed_limits() {
        assert_eq!(oriented((10.0, 0.0)), (0.0, 10.0, true));
        assert_eq!(oriented((0.0, 10.0)), (0.0, 10.0, false));
    }

    #[test]
    fn test_data_range_from_image_extent() {
        let mut axes = Axes::default();
        axes.artists.push(Artist::Image(ImageArtist {
            data: ndarray::Array2::zeros((2, 2)),
            vmin: 0.0,
            vmax: 1.0,
            origin: Origin::Lower,
            extent: [0.0, 200.0, 0.0, 100.0],
            cmap: Colormap::Gray,
        }));
        assert_eq!(data_range(&axes), ((0.0, 200.0), (0.0, 100.0)));
    }
}
