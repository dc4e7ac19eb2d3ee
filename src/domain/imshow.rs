use std::path::PathBuf;

use anyhow::anyhow;
use ndarray::{s, Array2, ArrayD, Axis, Ix2};

use crate::domain::decorate::{set_plot_props, PlotProps};
use crate::domain::extract::{extract_data, ImageInput};
use crate::domain::interactive::{InteractiveHandler, Marks};
use crate::domain::session::{AxesSpec, Session};
use crate::error::{PlotError, PlotResult};
use crate::model::{
    Artist, AxesRef, Colorbar, Colormap, FigureId, ImageArtist, Limit, Origin, Window,
};
use crate::utils::render::render_scaled;

/// Display parameters for [`imshowz`]. Everything is optional.
#[derive(Debug, Clone)]
pub struct ImshowOptions {
    pub axes: AxesSpec,
    /// HDU selector for lists and files.
    pub hdu: Option<usize>,
    /// Contrast limits; computed with the session's scale when absent.
    pub minmax: Option<(f64, f64)>,
    pub xlim: Option<Limit>,
    pub ylim: Option<Limit>,
    /// Center of a zoomed view; overrides `xlim`/`ylim`.
    pub cxy: Option<(f64, f64)>,
    /// Radius around `cxy`. Defaults to the distance to the nearest border.
    pub plot_rad: Option<f64>,
    pub ticks: bool,
    pub colorbar: bool,
    /// Degrees counter-clockwise, multiple of 90.
    pub rotate: i32,
    pub invertx: bool,
    pub inverty: bool,
    pub origin: Origin,
    pub force_new: bool,
    /// Crop the data to the window instead of only zooming.
    pub trim_data: bool,
    /// `[x0, x1, y0, y1]` the image is stretched over.
    pub extent: Option<[f64; 4]>,
    pub interactive: bool,
    /// Falls back to the session's configured colormap.
    pub cmap: Option<Colormap>,
    /// Also write the stretched pixels alone as a grayscale PNG.
    pub export: Option<PathBuf>,
    pub props: PlotProps,
}

impl Default for ImshowOptions {
    fn default() -> Self {
        Self {
            axes: AxesSpec::None,
            hdu: None,
            minmax: None,
            xlim: None,
            ylim: None,
            cxy: None,
            plot_rad: None,
            ticks: true,
            colorbar: false,
            rotate: 0,
            invertx: false,
            inverty: false,
            origin: Origin::Lower,
            force_new: false,
            trim_data: false,
            extent: None,
            interactive: false,
            cmap: None,
            export: None,
            props: PlotProps::default(),
        }
    }
}

pub struct ImshowOutput {
    /// Contrast limits the image was drawn with.
    pub lims: (f64, f64),
    /// View window after cropping and inversion.
    pub window: Window,
    pub figure: FigureId,
    pub axes: AxesRef,
    pub marks_xy: Option<Marks>,
    pub handler: Option<Box<dyn InteractiveHandler>>,
}

/// Reduces any array to the 2-D plane that gets displayed: higher axes are
/// indexed at 0, 0-D and 1-D data become a single row.
fn display_plane(data: ArrayD<f32>) -> PlotResult<Array2<f32>> {
    if data.ndim() < 2 {
        let n = data.len();
        return Array2::from_shape_vec((1, n), data.into_iter().collect())
            .map_err(|e| PlotError::Other(anyhow!("cannot display as a row: {}", e)));
    }
    if data.ndim() > 2 {
        log::debug!("displaying first plane of {:?} data", data.shape());
    }
    let mut view = data.view();
    while view.ndim() > 2 {
        view = view.index_axis_move(Axis(2), 0);
    }
    let plane = view
        .into_dimensionality::<Ix2>()
        .map_err(|e| PlotError::Other(anyhow!("cannot display data: {}", e)))?;
    Ok(plane.to_owned())
}

/// Quarter turns counter-clockwise in the plane of axes 0 and 1.
pub fn rotate_quarter_turns(data: Array2<f32>, degrees: i32) -> PlotResult<Array2<f32>> {
    if degrees % 90 != 0 {
        return Err(PlotError::InvalidRotation(degrees));
    }
    let turns = (degrees / 90).rem_euclid(4);
    let mut out = data;
    for _ in 0..turns {
        out.invert_axis(Axis(1));
        out.swap_axes(0, 1);
        out = out.as_standard_layout().into_owned();
    }
    Ok(out)
}

/// Window of radius `rad` around `center`, kept inside `[0, cols] x [0, rows]`.
///
/// The center is pulled into the data and the radius is at least one pixel,
/// so both ranges are always non-empty.
pub fn centered_window(center: (f64, f64), rad: Option<f64>, rows: usize, cols: usize) -> Window {
    let (w, h) = (cols as f64, rows as f64);
    let cx = center.0.clamp(0.0, w);
    let cy = center.1.clamp(0.0, h);
    let border = (w - cx).min(cx).min(h - cy).min(cy);
    let r = rad.unwrap_or(border).max(1.0);
    Window {
        x: ((cx - r).max(0.0), (cx + r).min(w)),
        y: ((cy - r).max(0.0), (cy + r).min(h)),
    }
}

fn pixel_range(lim: (f64, f64), len: usize) -> (usize, usize) {
    let clamp = |v: f64| v.round().clamp(0.0, len as f64) as usize;
    (clamp(lim.0.min(lim.1)), clamp(lim.0.max(lim.1)))
}

/// Crops `data` to `window`; returns the crop and its surface-relative window.
fn trim(data: &Array2<f32>, window: &Window) -> PlotResult<(Array2<f32>, Window)> {
    let (rows, cols) = data.dim();
    let (r0, r1) = pixel_range(window.y, rows);
    let (c0, c1) = pixel_range(window.x, cols);
    if r0 == r1 || c0 == c1 {
        return Err(PlotError::NoData(format!(
            "inside window x={:?} y={:?}",
            window.x, window.y
        )));
    }
    let cropped = data.slice(s![r0..r1, c0..c1]).to_owned();
    let (nr, nc) = cropped.dim();
    let local = Window {
        x: (0.0, (nc - 1) as f64),
        y: (0.0, (nr - 1) as f64),
    };
    Ok((cropped, local))
}

/// Displays an image with zscale (or explicit) contrast limits.
pub fn imshowz<'a>(
    session: &mut Session,
    input: impl Into<ImageInput<'a>>,
    opts: &ImshowOptions,
) -> PlotResult<ImshowOutput> {
    let data = extract_data(input.into(), opts.hdu)?;

    let mut props = opts.props.clone();
    if opts.interactive {
        props.show = Some(false);
        props.save = None;
    }

    if opts.extent.is_some() && opts.xlim.is_some() && opts.ylim.is_some() {
        return Err(PlotError::ConflictingExtent);
    }

    let mut data = rotate_quarter_turns(display_plane(data)?, opts.rotate)?;
    let (rows, cols) = data.dim();

    let full = Window::full(rows, cols);
    let mut window = Window {
        x: opts.xlim.map(Limit::bounds).unwrap_or(full.x),
        y: opts.ylim.map(Limit::bounds).unwrap_or(full.y),
    };

    if let Some(center) = opts.cxy {
        window = centered_window(center, opts.plot_rad, rows, cols);
    }

    if opts.trim_data {
        let (cropped, local) = trim(&data, &window)?;
        data = cropped;
        window = local;
    }

    let lims = match opts.minmax {
        Some(lims) => lims,
        None => session.contrast_limits(&data.view().into_dyn()),
    };
    log::debug!(
        "imshowz {}x{} window x={:?} y={:?} lims={:?}",
        data.ncols(),
        data.nrows(),
        window.x,
        window.y,
        lims
    );

    let (figure, axes) = session.figaxes(opts.axes, opts.force_new, true)?;

    let extent = opts
        .extent
        .unwrap_or([window.x.0, window.x.1, window.y.0, window.y.1]);
    let cmap = opts.cmap.unwrap_or(session.config().colormap);
    let blank_ticks = session.config().blank_tick_count;

    if let Some(path) = &opts.export {
        render_scaled(&data, lims, opts.origin, path)?;
    }

    let target = session.axes_mut(axes)?;
    target.artists.push(Artist::Image(ImageArtist {
        data: data.clone(),
        vmin: lims.0,
        vmax: lims.1,
        origin: opts.origin,
        extent,
        cmap,
    }));

    if opts.invertx {
        window.x = (window.x.1, window.x.0);
    }
    if opts.inverty {
        window.y = (window.y.1, window.y.0);
    }

    if !opts.ticks {
        target.x_ticklabels = Some(vec![" ".to_string(); blank_ticks]);
        target.y_ticklabels = Some(vec![" ".to_string(); blank_ticks]);
    }

    if opts.colorbar {
        if let Some(fig) = session.figure_mut(figure) {
            fig.colorbars.push(Colorbar {
                axes: axes.index,
                vmin: lims.0,
                vmax: lims.1,
                cmap,
            });
        }
    }

    props.xlim = Some(Limit::Range(window.x.0, window.x.1));
    props.ylim = Some(Limit::Range(window.y.0, window.y.1));
    set_plot_props(session, axes, &props)?;

    let (marks_xy, handler) = if opts.interactive {
        let handler = session.bind_interactive(&data.view().into_dyn(), extent, axes);
        (Some(handler.marks()), Some(handler))
    } else {
        (None, None)
    };

    Ok(ImshowOutput {
        lims,
        window,
        figure,
        axes,
        marks_xy,
        handler,
    })
}
