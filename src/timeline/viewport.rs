/// Zoom floor. Below this the tick magnitude math degenerates
/// (`log10` of a vanishing span) and the transform stops being
/// invertible in f64.
pub const MIN_ZOOM: f64 = 1e-9;

/// Visible time window: `position` is the time value at the horizontal
/// center of the canvas, `zoom` the total visible time span. All
/// pixel-facing operations take the live canvas width so the transform
/// is recomputed from current bounds on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub position: f64,
    pub zoom: f64,
}

impl Viewport {
    /// Centers the view on `[begin, end]`, zoomed out to the padded
    /// span. Used on load and on an explicit view reset.
    pub fn fit_to_extent(begin: f64, end: f64, padding: f64) -> Self {
        Self {
            position: (begin + end) / 2.0,
            zoom: ((end - begin) * padding).max(MIN_ZOOM),
        }
    }

    pub fn time_to_x(&self, time: f64, width: f32) -> f32 {
        let width = f64::from(width);
        ((time - self.position) * (width / self.zoom) + width / 2.0) as f32
    }

    pub fn x_to_time(&self, x: f32, width: f32) -> f64 {
        let width = f64::from(width);
        (f64::from(x) - width / 2.0) * (self.zoom / width) + self.position
    }

    /// Shifts the view by a pixel delta, converted into time at the
    /// current zoom. Dragging right moves the view into the past.
    pub fn pan(&mut self, delta_x: f32, width: f32) {
        self.position -= f64::from(delta_x) * self.zoom / f64::from(width);
    }

    /// Zooms around a fixed screen point: the time value under
    /// `cursor_x` stays put. A factor that would push the zoom under
    /// [`MIN_ZOOM`] is ignored, preserving the last valid state.
    pub fn zoom_at(&mut self, cursor_x: f32, factor: f64, width: f32) {
        let zoom = self.zoom * factor;
        if !zoom.is_finite() || zoom < MIN_ZOOM {
            return;
        }

        let fx = f64::from(cursor_x) / f64::from(width);
        let anchor = self.position - (0.5 - fx) * self.zoom;

        self.position = anchor + zoom * (0.5 - fx);
        self.zoom = zoom;
    }

    pub fn visible_range(&self) -> (f64, f64) {
        (self.position - self.zoom / 2.0, self.position + self.zoom / 2.0)
    }

    /// Top of a node's horizontal band. The vertical axis is a fixed
    /// 1:1 band mapping with no pan or zoom.
    pub fn node_to_y(node: usize, height: f32, node_count: usize) -> f32 {
        node as f32 * Self::node_band(height, node_count)
    }

    pub fn node_band(height: f32, node_count: usize) -> f32 {
        height / node_count.max(1) as f32
    }
}

/// Wheel delta to zoom factor, matching the original viewer's
/// `exp(-delta / 240)` response for a 120-unit wheel notch.
pub fn wheel_zoom_factor(lines: f32) -> f64 {
    (-f64::from(lines) * 0.5).exp().clamp(0.01, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn viewport() -> Viewport {
        Viewport {
            position: 37.5,
            zoom: 12.0,
        }
    }

    #[test]
    fn transform_round_trips() {
        let view = viewport();
        for &time in &[0.0, 31.5, 37.5, 43.5, 1e4] {
            let x = view.time_to_x(time, 800.0);
            assert!((view.x_to_time(x, 800.0) - time).abs() < 1e-6 * time.abs().max(1.0));
        }
    }

    #[test]
    fn position_maps_to_center_pixel() {
        let view = viewport();
        assert!((f64::from(view.time_to_x(view.position, 800.0)) - 400.0).abs() < EPS);
    }

    #[test]
    fn zoom_in_then_out_restores_state() {
        let mut view = viewport();
        let original = view;

        view.zoom_at(123.0, 0.5, 800.0);
        view.zoom_at(123.0, 2.0, 800.0);

        assert!((view.position - original.position).abs() < EPS);
        assert!((view.zoom - original.zoom).abs() < EPS);
    }

    #[test]
    fn zoom_anchors_the_cursor_time() {
        let mut view = viewport();
        let anchor = view.x_to_time(600.0, 800.0);

        view.zoom_at(600.0, 0.25, 800.0);

        assert!((view.x_to_time(600.0, 800.0) - anchor).abs() < EPS);
    }

    #[test]
    fn zoom_floor_rejects_degenerate_spans() {
        let mut view = Viewport {
            position: 1.0,
            zoom: MIN_ZOOM * 1.5,
        };
        let before = view;

        view.zoom_at(400.0, 0.1, 800.0);
        assert_eq!(view, before);

        view.zoom_at(400.0, 0.0, 800.0);
        assert_eq!(view, before);
    }

    #[test]
    fn pan_converts_pixels_to_time() {
        let mut view = viewport();
        // 800 px wide at zoom 12 => 1 px is 0.015 time units.
        view.pan(100.0, 800.0);
        assert!((view.position - (37.5 - 1.5)).abs() < EPS);
    }

    #[test]
    fn fit_to_extent_centers_and_spans() {
        let view = Viewport::fit_to_extent(10.0, 30.0, 1.0);
        assert!((view.position - 20.0).abs() < EPS);
        assert!((view.zoom - 20.0).abs() < EPS);

        let (lo, hi) = view.visible_range();
        assert!((lo - 10.0).abs() < EPS);
        assert!((hi - 30.0).abs() < EPS);
    }

    #[test]
    fn vertical_bands_split_height_evenly() {
        assert_eq!(Viewport::node_to_y(0, 400.0, 4), 0.0);
        assert_eq!(Viewport::node_to_y(3, 400.0, 4), 300.0);
        assert_eq!(Viewport::node_band(400.0, 4), 100.0);
    }
}
