use std::collections::BTreeMap;
use std::path::Path;

use ndarray::ArrayViewD;

use crate::domain::config_manager::{load_config, PlotConfig};
use crate::domain::interactive::{InteractiveBinding, InteractiveHandler, MarkBinding};
use crate::domain::zscale::{ContrastScale, ZScale};
use crate::error::{PlotError, PlotResult};
use crate::model::{Axes, AxesRef, Figure, FigureId};
use crate::utils::backend::{Backend, PlottersBackend};

/// Where a plotting call should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxesSpec {
    /// The current figure, or a new one with `force_new`.
    #[default]
    None,
    /// A figure by number, created on first use.
    Number(u32),
    Figure(FigureId),
    Axes(AxesRef),
}

impl From<u32> for AxesSpec {
    fn from(n: u32) -> Self {
        AxesSpec::Number(n)
    }
}

impl From<FigureId> for AxesSpec {
    fn from(id: FigureId) -> Self {
        AxesSpec::Figure(id)
    }
}

impl From<AxesRef> for AxesSpec {
    fn from(r: AxesRef) -> Self {
        AxesSpec::Axes(r)
    }
}

/// Drawing context owning every open figure plus the collaborators used to
/// scale, render and interact with them.
pub struct Session {
    config: PlotConfig,
    figures: BTreeMap<FigureId, Figure>,
    current: Option<FigureId>,
    current_axes: Option<AxesRef>,
    backend: Box<dyn Backend>,
    scale: Box<dyn ContrastScale>,
    binding: Box<dyn InteractiveBinding>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(PlotConfig::default())
    }

    /// Session configured from the config file and `ASTROPLOT_*` environment.
    pub fn from_env() -> Self {
        Self::with_config(load_config())
    }

    pub fn with_config(config: PlotConfig) -> Self {
        Self {
            backend: Box::new(PlottersBackend::new(config.preview_dir())),
            scale: Box::new(ZScale::new(config.zscale)),
            binding: Box::new(MarkBinding),
            config,
            figures: BTreeMap::new(),
            current: None,
            current_axes: None,
        }
    }

    pub fn with_backend(mut self, backend: impl Backend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    pub fn with_scale(mut self, scale: impl ContrastScale + 'static) -> Self {
        self.scale = Box::new(scale);
        self
    }

    pub fn with_binding(mut self, binding: impl InteractiveBinding + 'static) -> Self {
        self.binding = Box::new(binding);
        self
    }

    pub fn config(&self) -> &PlotConfig {
        &self.config
    }

    pub fn figure(&self, id: FigureId) -> Option<&Figure> {
        self.figures.get(&id)
    }

    pub fn figure_mut(&mut self, id: FigureId) -> Option<&mut Figure> {
        self.figures.get_mut(&id)
    }

    pub fn figure_ids(&self) -> Vec<FigureId> {
        self.figures.keys().copied().collect()
    }

    pub fn current_figure(&self) -> Option<FigureId> {
        self.current
    }

    pub fn current_axes(&self) -> Option<AxesRef> {
        self.current_axes
    }

    pub fn axes(&self, r: AxesRef) -> PlotResult<&Axes> {
        self.figures
            .get(&r.figure)
            .and_then(|f| f.axes.get(r.index))
            .ok_or_else(|| PlotError::UnrecognizedAxesSpec(r.to_string()))
    }

    pub fn axes_mut(&mut self, r: AxesRef) -> PlotResult<&mut Axes> {
        self.figures
            .get_mut(&r.figure)
            .and_then(|f| f.axes.get_mut(r.index))
            .ok_or_else(|| PlotError::UnrecognizedAxesSpec(r.to_string()))
    }

    /// Opens a figure with the lowest unused number above every open one.
    pub fn new_figure(&mut self) -> FigureId {
        let next = self.figures.keys().next_back().map_or(1, |id| id.0 + 1);
        let id = FigureId(next);
        self.figures
            .insert(id, Figure::new(id, self.config.figure_size()));
        self.current = Some(id);
        log::debug!("opened {}", id);
        id
    }

    fn figure_or_create(&mut self, id: FigureId) -> &mut Figure {
        let size = self.config.figure_size();
        self.figures.entry(id).or_insert_with(|| {
            log::debug!("opened {}", id);
            Figure::new(id, size)
        })
    }

    fn live_figure(&mut self, id: FigureId) -> PlotResult<&mut Figure> {
        self.figures
            .get_mut(&id)
            .ok_or_else(|| PlotError::UnrecognizedAxesSpec(id.to_string()))
    }

    /// Resolves `spec` into a concrete figure and axes, clearing as requested.
    /// The result becomes the current figure and axes.
    pub fn figaxes(
        &mut self,
        spec: AxesSpec,
        force_new: bool,
        clear: bool,
    ) -> PlotResult<(FigureId, AxesRef)> {
        let (figure, index) = match spec {
            AxesSpec::None => {
                let id = match self.current.filter(|id| self.figures.contains_key(id)) {
                    Some(id) if !force_new => id,
                    _ => self.new_figure(),
                };
                let fig = self.live_figure(id)?;
                fig.clf();
                (id, fig.add_subplot())
            }
            AxesSpec::Number(n) => {
                let id = FigureId(n);
                let fig = self.figure_or_create(id);
                if clear || fig.axes.is_empty() {
                    fig.clf();
                    (id, fig.add_subplot())
                } else {
                    (id, 0)
                }
            }
            AxesSpec::Figure(id) => {
                let fig = self.live_figure(id)?;
                if clear {
                    fig.clf();
                }
                if fig.axes.is_empty() {
                    (id, fig.add_subplot())
                } else {
                    (id, 0)
                }
            }
            AxesSpec::Axes(r) => {
                let axes = self.axes_mut(r)?;
                if clear {
                    axes.clear();
                }
                (r.figure, r.index)
            }
        };

        let axes = AxesRef { figure, index };
        self.current = Some(figure);
        self.current_axes = Some(axes);
        log::debug!("{:?} resolved to {}", spec, axes);
        Ok((figure, axes))
    }

    pub fn contrast_limits(&self, data: &ArrayViewD<f32>) -> (f64, f64) {
        self.scale.limits(data)
    }

    pub fn bind_interactive(
        &self,
        data: &ArrayViewD<f32>,
        extent: [f64; 4],
        axes: AxesRef,
    ) -> Box<dyn InteractiveHandler> {
        self.binding.bind(data, extent, axes)
    }

    pub fn save(&mut self, id: FigureId, path: &Path) -> PlotResult<()> {
        let fig = self
            .figures
            .get(&id)
            .ok_or_else(|| PlotError::UnrecognizedAxesSpec(id.to_string()))?;
        self.backend.save(fig, path)?;
        Ok(())
    }

    pub fn show(&mut self, id: FigureId) -> PlotResult<()> {
        let fig = self
            .figures
            .get(&id)
            .ok_or_else(|| PlotError::UnrecognizedAxesSpec(id.to_string()))?;
        self.backend.show(fig)?;
        Ok(())
    }

    /// Destroys a figure. Returns whether it was open.
    pub fn close(&mut self, id: FigureId) -> bool {
        let closed = self.figures.remove(&id).is_some();
        if self.current == Some(id) {
            self.current = self.figures.keys().next_back().copied();
            self.current_axes = None;
        }
        if closed {
            log::debug!("closed {}", id);
        }
        closed
    }
}
