//! Error types for the plotting helpers.

use thiserror::Error;

/// Convenience alias for results carrying a [`PlotError`].
pub type PlotResult<T> = Result<T, PlotError>;

/// Everything a plotting call can fail with.
///
/// Errors are raised where they are detected and handed straight back to the
/// caller; nothing in the crate retries or recovers.
#[derive(Error, Debug)]
pub enum PlotError {
    /// The image input is not one of the recognised shapes.
    #[error("Unrecognized type for input data: {0}")]
    UnsupportedInputType(String),

    /// The input resolved to an absent or empty array.
    #[error("Nothing to plot {0}")]
    NoData(String),

    /// The axes descriptor does not name a live figure or axes.
    #[error("Given value for axes ({0}) is not recognized")]
    UnrecognizedAxesSpec(String),

    #[error("If extent is specified for imshowz, then xlim and ylim should not")]
    ConflictingExtent,

    #[error("rotate must be a multiple of 90 (got {0})")]
    InvalidRotation(i32),

    /// A position specification does not match the data dimensionality.
    #[error("pos (size: {pos}) must have the same size as data array dimension ({ndim})")]
    DimensionMismatch { pos: usize, ndim: usize },

    #[error("pos index {index} is out of bounds for axis {axis} of length {len}")]
    PositionOutOfBounds { axis: usize, index: usize, len: usize },

    #[error("Time format not understood: {0}")]
    UnrecognizedTimeFormat(String),

    /// A shaded band needs the x values of a line already drawn on the axes.
    #[error("fill_between needs at least one plotted line on the axes")]
    NoLine,

    /// A band series and the x values it is drawn against differ in length.
    #[error("band length {band} does not match x length {x}")]
    BandLength { band: usize, x: usize },

    #[error("Unknown axes method '{0}'")]
    UnknownAxesMethod(String),

    /// I/O, FITS parsing and rendering failures.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
