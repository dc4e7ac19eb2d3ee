use ndarray::{ArrayD, Axis};

use crate::domain::decorate::{set_plot_props, PlotProps};
use crate::domain::extract::{extract_data, ImageInput};
use crate::domain::session::{AxesSpec, Session};
use crate::error::{PlotError, PlotResult};
use crate::model::{Artist, Limit, LineArtist};

/// Which element of each axis to keep; `None` keeps the whole axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Index on the last axis, with the first axis free and the rest at 0.
    At(usize),
    Explicit(Vec<Option<usize>>),
}

impl Default for Position {
    fn default() -> Self {
        Position::At(0)
    }
}

impl From<usize> for Position {
    fn from(p: usize) -> Self {
        Position::At(p)
    }
}

impl From<Vec<Option<usize>>> for Position {
    fn from(v: Vec<Option<usize>>) -> Self {
        Position::Explicit(v)
    }
}

impl Position {
    pub fn expand(&self, ndim: usize) -> Vec<Option<usize>> {
        match self {
            Position::At(p) => {
                let mut pos = vec![None];
                pos.extend(std::iter::repeat(Some(0)).take(ndim.saturating_sub(2)));
                pos.push(Some(*p));
                pos
            }
            Position::Explicit(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcrossOptions {
    pub axes: AxesSpec,
    pub hdu: Option<usize>,
    pub pos: Position,
    pub force_new: bool,
    pub title: Option<String>,
    pub xtitle: Option<String>,
    pub ytitle: Option<String>,
    pub xlim: Option<Limit>,
    pub ylim: Option<Limit>,
    /// Legend entry for the plotted cut.
    pub label: Option<String>,
    /// Remaining decorations; the fields above take precedence.
    pub props: PlotProps,
}

impl Default for AcrossOptions {
    fn default() -> Self {
        Self {
            axes: AxesSpec::default(),
            hdu: None,
            pos: Position::default(),
            force_new: true,
            title: None,
            xtitle: None,
            ytitle: None,
            xlim: None,
            ylim: None,
            label: None,
            props: PlotProps::default(),
        }
    }
}

/// Indexes out every fixed axis of `data`, keeping free ones in order.
pub fn slice_at(data: &ArrayD<f32>, pos: &[Option<usize>]) -> PlotResult<ArrayD<f32>> {
    if pos.len() != data.ndim() {
        return Err(PlotError::DimensionMismatch {
            pos: pos.len(),
            ndim: data.ndim(),
        });
    }
    let mut view = data.view();
    // Back to front so earlier axis numbers stay valid.
    for (axis, index) in pos.iter().enumerate().rev() {
        if let Some(index) = *index {
            let len = view.len_of(Axis(axis));
            if index >= len {
                return Err(PlotError::PositionOutOfBounds { axis, index, len });
            }
            view = view.index_axis_move(Axis(axis), index);
        }
    }
    Ok(view.to_owned())
}

fn cut_lines(cut: &ArrayD<f32>, label: Option<&String>) -> Vec<LineArtist> {
    let line = |values: Vec<f32>| LineArtist {
        x: (0..values.len()).map(|i| i as f64).collect(),
        y: values.into_iter().map(f64::from).collect(),
        label: label.cloned(),
        color: None,
    };
    if cut.ndim() == 0 {
        return vec![line(cut.iter().copied().collect())];
    }
    cut.lanes(Axis(0))
        .into_iter()
        .map(|lane| line(lane.to_vec()))
        .collect()
}

/// Plots a cut through `input` along its free axes.
///
/// Returns the cut and the full extracted array.
pub fn plot_across<'a>(
    session: &mut Session,
    input: impl Into<ImageInput<'a>>,
    opts: &AcrossOptions,
) -> PlotResult<(ArrayD<f32>, ArrayD<f32>)> {
    let data = extract_data(input.into(), opts.hdu)?;
    let pos = opts.pos.expand(data.ndim());
    let cut = slice_at(&data, &pos)?;
    log::debug!("cut {:?} of {:?} data -> {:?}", pos, data.shape(), cut.shape());

    let (_, axes) = session.figaxes(opts.axes, opts.force_new, true)?;
    let target = session.axes_mut(axes)?;
    target.artists.extend(
        cut_lines(&cut, opts.label.as_ref())
            .into_iter()
            .map(Artist::Line),
    );

    let mut props = opts.props.clone();
    props.title = opts.title.clone().or(props.title);
    props.xlabel = opts.xtitle.clone().or(props.xlabel);
    props.ylabel = opts.ytitle.clone().or(props.ylabel);
    props.xlim = opts.xlim.or(props.xlim);
    props.ylim = opts.ylim.or(props.ylim);
    set_plot_props(session, axes, &props)?;

    Ok((cut, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn cube() -> ArrayD<f32> {
        ArrayD::from_shape_fn(IxDyn(&[5, 4, 10]), |ix| (ix[0] * 100 + ix[1] * 10 + ix[2]) as f32)
    }

    #[test]
    fn test_scalar_pos_expands_to_ndim() {
        for ndim in 2..7 {
            let pos = Position::At(3).expand(ndim);
            assert_eq!(pos.len(), ndim);
            assert_eq!(pos[0], None);
            assert_eq!(pos[ndim - 1], Some(3));
            assert!(pos[1..ndim - 1].iter().all(|p| *p == Some(0)));
        }
    }

    #[test]
    fn test_mismatched_pos_reports_both_sizes() {
        let data = cube();
        match slice_at(&data, &[None, Some(1)]) {
            Err(PlotError::DimensionMismatch { pos, ndim }) => assert_eq!((pos, ndim), (2, 3)),
            other => panic!("unexpected {:?}", other),
        }
        let flat = ArrayD::<f32>::zeros(IxDyn(&[8]));
        assert!(matches!(
            slice_at(&flat, &Position::At(1).expand(1)),
            Err(PlotError::DimensionMismatch { pos: 2, ndim: 1 })
        ));
    }

    #[test]
    fn test_index_out_of_bounds() {
        assert!(matches!(
            slice_at(&cube(), &[None, Some(0), Some(10)]),
            Err(PlotError::PositionOutOfBounds { axis: 2, index: 10, len: 10 })
        ));
    }

    #[test]
    fn test_cut_of_cube() {
        let cut = slice_at(&cube(), &Position::At(3).expand(3)).unwrap();
        assert_eq!(cut.shape(), &[5]);
        let expected: Vec<f32> = (0..5).map(|i| (i * 100 + 3) as f32).collect();
        assert_eq!(cut.iter().copied().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_two_free_axes_plot_one_line_per_column() {
        let mut s = Session::new();
        let opts = AcrossOptions {
            pos: vec![None, None, Some(2)].into(),
            title: Some("cut".into()),
            props: PlotProps {
                show: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };
        let data = cube();
        let (cut, full) = plot_across(&mut s, &data, &opts).unwrap();
        assert_eq!(cut.shape(), &[5, 4]);
        assert_eq!(full, data);

        let ax = s.current_axes().unwrap();
        let axes = s.axes(ax).unwrap();
        assert_eq!(axes.lines().count(), 4);
        assert_eq!(axes.lines().next().unwrap().y.len(), 5);
        assert_eq!(axes.title.as_deref(), Some("cut"));
    }

    #[test]
    fn test_each_cut_opens_a_new_figure() {
        let mut s = Session::new();
        let opts = AcrossOptions {
            props: PlotProps {
                show: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };
        let data = cube();
        plot_across(&mut s, &data, &opts).unwrap();
        plot_across(&mut s, &data, &opts).unwrap();
        assert_eq!(s.figure_ids().len(), 2);
    }
}
