// Viewport controller - visible time range over the buffer contents
use crate::error::EngineError;
use serde::Serialize;

/// The currently visible time/value rectangle of the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Domain {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Domain {
    pub fn span(&self) -> f64 {
        self.x_max - self.x_min
    }

    fn is_valid(&self) -> bool {
        self.x_min.is_finite() && self.x_max.is_finite() && self.x_min < self.x_max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    In,
    Out,
}

/// Tracks the visible domain and follow-tail mode. Reads only the buffer's
/// time extremes and sample count; all operations are no-ops while no data
/// has been observed.
#[derive(Debug)]
pub struct ViewportController {
    domain: Option<Domain>,
    follow: bool,
    follow_window: f64,
    zoom_sensitivity: f64,
    min_zoom_span: f64,
    y_ceiling: f64,
}

impl ViewportController {
    pub fn new(follow_window: f64, zoom_sensitivity: f64, min_zoom_span: f64, y_ceiling: f64) -> Self {
        Self {
            domain: None,
            follow: true,
            follow_window,
            zoom_sensitivity,
            min_zoom_span,
            y_ceiling,
        }
    }

    pub fn domain(&self) -> Option<Domain> {
        self.domain
    }

    pub fn follow(&self) -> bool {
        self.follow
    }

    /// Forget the domain. It is recomputed, never inherited, on the next
    /// empty-to-non-empty transition.
    pub fn forget(&mut self) {
        self.domain = None;
    }

    /// Called after every flush that leaves data in the buffer. Initializes
    /// the domain once a non-degenerate extent exists; afterwards it advances
    /// the follow window and keeps the left edge inside the retained data.
    pub fn on_data(&mut self, min_t: f64, max_t: f64) {
        if max_t <= min_t {
            // A lone sample has no usable extent; initialization waits for
            // the next flush and an existing window is left untouched.
            return;
        }
        match self.domain {
            None => {
                let x_min = if self.follow {
                    (max_t - self.follow_window).max(min_t)
                } else {
                    min_t
                };
                self.domain = Some(Domain {
                    x_min,
                    x_max: max_t,
                    y_min: 0.0,
                    y_max: self.y_ceiling,
                });
            }
            Some(domain) if self.follow => {
                // The trailing window grows until it reaches the configured
                // width, then keeps that width as maxT advances.
                self.domain = Some(Domain {
                    x_min: (max_t - self.follow_window).max(min_t),
                    x_max: max_t,
                    ..domain
                });
            }
            Some(domain) => {
                // Eviction can advance the oldest timestamp past a parked
                // window; slide it right without changing the span.
                if domain.x_min < min_t {
                    let x_max = (min_t + domain.span()).min(max_t);
                    self.domain = Some(Domain {
                        x_min: min_t,
                        x_max,
                        ..domain
                    });
                }
            }
        }
    }

    /// Snap to the trailing window when enabling follow with data present.
    /// Returns the new follow flag.
    pub fn toggle_follow(&mut self, min_t: f64, max_t: f64) -> bool {
        self.follow = !self.follow;
        if self.follow {
            if let Some(domain) = self.domain {
                self.domain = Some(Domain {
                    x_min: (max_t - self.follow_window).max(min_t),
                    x_max: max_t,
                    ..domain
                });
            }
        }
        self.follow
    }

    /// Wheel zoom anchored at cursor fraction `p` within the chart area.
    /// Disables follow-tail. The anchor time stays fixed under the cursor up
    /// to clamping at the data edges.
    pub fn zoom(
        &mut self,
        p: f64,
        direction: ZoomDirection,
        min_t: f64,
        max_t: f64,
    ) -> Result<(), EngineError> {
        let Some(domain) = self.domain else {
            return Ok(());
        };
        self.follow = false;

        let span = domain.span();
        let factor = match direction {
            ZoomDirection::In => 1.0 - self.zoom_sensitivity,
            ZoomDirection::Out => 1.0 + self.zoom_sensitivity,
        };
        let extent = max_t - min_t;
        let max_span = (extent * 1.2).max(self.min_zoom_span);
        let new_span = (span * factor).clamp(self.min_zoom_span, max_span);

        let mouse_t = domain.x_min + p * span;
        let mut x_min = mouse_t - (mouse_t - domain.x_min) * new_span / span;
        let mut x_max = x_min + new_span;

        // Slide the window back inside the data rather than shrinking it.
        if x_min < min_t {
            let shift = min_t - x_min;
            x_min += shift;
            x_max += shift;
        }
        if x_max > max_t {
            let shift = x_max - max_t;
            x_min -= shift;
            x_max -= shift;
        }
        if x_min < min_t {
            // Both edges overflow: center on the data, or fall back to the
            // full extent when the span cannot fit at all.
            let mid = (min_t + max_t) / 2.0;
            x_min = mid - new_span / 2.0;
            x_max = mid + new_span / 2.0;
            if x_min < min_t || x_max > max_t {
                x_min = min_t;
                x_max = max_t;
            }
        }

        self.commit(Domain {
            x_min,
            x_max,
            ..domain
        })
    }

    /// Drag pan by a fraction of the chart width, computed against the drag
    /// start snapshot. Disables follow-tail. Clamping transfers overflow to
    /// the opposite bound so the span is preserved exactly.
    pub fn pan(
        &mut self,
        start: Domain,
        delta_fraction: f64,
        sample_count: usize,
        sample_rate_hz: f64,
    ) -> Result<(), EngineError> {
        if self.domain.is_none() {
            return Ok(());
        }
        self.follow = false;

        let dt = delta_fraction * start.span();
        let mut x_min = start.x_min - dt;
        let mut x_max = start.x_max - dt;

        if x_min < 0.0 {
            x_max -= x_min;
            x_min = 0.0;
        }
        let limit = if sample_count > 0 && sample_rate_hz > 0.0 {
            (sample_count - 1) as f64 / sample_rate_hz
        } else {
            0.0
        };
        if x_max > limit {
            let overflow = x_max - limit;
            x_min -= overflow;
            x_max = limit;
        }

        self.commit(Domain {
            x_min,
            x_max,
            ..start
        })
    }

    /// Show the full data extent and re-enable follow-tail.
    pub fn reset(&mut self, min_t: f64, max_t: f64) {
        self.follow = true;
        self.domain = Some(Domain {
            x_min: min_t,
            x_max: max_t,
            y_min: 0.0,
            y_max: self.y_ceiling,
        });
    }

    fn commit(&mut self, candidate: Domain) -> Result<(), EngineError> {
        if !candidate.is_valid() {
            return Err(EngineError::Viewport("inverted or non-finite bounds"));
        }
        self.domain = Some(candidate);
        Ok(())
    }
}
