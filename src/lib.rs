//! Quick-look plotting for astronomical images: zscale display, cuts across
//! data cubes, date-formatted time axes and the usual plot decorations.
//!
//! Every call draws through an explicit [`Session`], which owns the open
//! figures and the collaborators used to scale, render and interact with them.

pub mod domain;
pub mod error;
pub mod model;
pub mod utils;

pub use crate::domain::across::{plot_across, AcrossOptions, Position};
pub use crate::domain::config_manager::PlotConfig;
pub use crate::domain::decorate::{set_plot_props, AxesOp, PlotProps, SpanArgs};
pub use crate::domain::extract::{extract_data, ImageInput};
pub use crate::domain::fill::{fill_between, Band, FillBetween};
pub use crate::domain::imshow::{imshowz, ImshowOptions, ImshowOutput};
pub use crate::domain::interactive::{InteractiveBinding, InteractiveHandler, Marks};
pub use crate::domain::session::{AxesSpec, Session};
pub use crate::domain::timeaxis::{figaxes_xdate, TimeInput};
pub use crate::domain::zscale::{ContrastScale, ZScale};
pub use crate::error::{PlotError, PlotResult};
pub use crate::utils::backend::Backend;
