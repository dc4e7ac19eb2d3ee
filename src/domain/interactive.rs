use std::sync::{Arc, Mutex, MutexGuard};

use ndarray::ArrayViewD;

use crate::model::AxesRef;

/// Coordinates picked on an interactive display, shared with the handler
/// that fills it.
pub type Marks = Arc<Mutex<Vec<(f64, f64)>>>;

/// A live binding between a displayed image and user picks.
pub trait InteractiveHandler: Send {
    fn axes(&self) -> AxesRef;
    fn marks(&self) -> Marks;
    /// Records a pick at data coordinates; returns whether it was accepted.
    fn pick(&mut self, x: f64, y: f64) -> bool;
}

/// Produces a handler for an image drawn on some axes.
pub trait InteractiveBinding: Send {
    /// `extent` is the displayed `[x0, x1, y0, y1]` of `data`.
    fn bind(
        &self,
        data: &ArrayViewD<f32>,
        extent: [f64; 4],
        axes: AxesRef,
    ) -> Box<dyn InteractiveHandler>;
}

/// Accepts picks that land on the displayed image and keeps them in order.
pub struct PickHandler {
    axes: AxesRef,
    x: (f64, f64),
    y: (f64, f64),
    marks: Marks,
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    (a.min(b), a.max(b))
}

fn lock(marks: &Marks) -> MutexGuard<'_, Vec<(f64, f64)>> {
    marks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InteractiveHandler for PickHandler {
    fn axes(&self) -> AxesRef {
        self.axes
    }

    fn marks(&self) -> Marks {
        Arc::clone(&self.marks)
    }

    fn pick(&mut self, x: f64, y: f64) -> bool {
        let inside = (self.x.0..=self.x.1).contains(&x) && (self.y.0..=self.y.1).contains(&y);
        if inside {
            lock(&self.marks).push((x, y));
        } else {
            log::debug!("pick ({}, {}) outside x={:?} y={:?} ignored", x, y, self.x, self.y);
        }
        inside
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkBinding;

impl InteractiveBinding for MarkBinding {
    fn bind(
        &self,
        _data: &ArrayViewD<f32>,
        extent: [f64; 4],
        axes: AxesRef,
    ) -> Box<dyn InteractiveHandler> {
        let [x0, x1, y0, y1] = extent;
        Box::new(PickHandler {
            axes,
            x: ordered(x0, x1),
            y: ordered(y0, y1),
            marks: Marks::default(),
        })
    }
}
