//! Scrollbar thickness, measured once per engine.

use box_tree::Metrics;
use log::debug;

/// Thickness used when the environment reserves no space for scrollbars.
pub const MIN_SCROLLBAR: i32 = 2;

/// Lazily measured, cached scrollbar thickness.
#[derive(Debug, Clone, Default)]
pub struct ScrollbarMetric {
    thickness: Option<i32>,
}

impl ScrollbarMetric {
    pub const fn new() -> Self {
        Self { thickness: None }
    }

    /// Measure on first use, then return the cached value.
    pub fn measure<M: Metrics>(&mut self, metrics: &mut M) -> i32 {
        if let Some(thickness) = self.thickness {
            return thickness;
        }
        let probe = metrics.probe_scrollbar();
        let measured = (probe.plain_width - probe.scrolling_width).round() as i32;
        let thickness = if measured <= 0 {
            debug!("Scrollbar probe reported {measured}px, using {MIN_SCROLLBAR}px");
            MIN_SCROLLBAR
        } else {
            measured
        };
        self.thickness = Some(thickness);
        thickness
    }

    /// Cached thickness, if measured.
    pub const fn resolved(&self) -> Option<i32> {
        self.thickness
    }

    /// Whether column widths need the one pixel rounding compensation.
    ///
    /// True until the thickness has been measured. A clamped probe counts
    /// as measured.
    pub const fn needs_compensation(&self) -> bool {
        self.thickness.is_none()
    }

    /// Cached thickness or 0 before the first measurement.
    pub fn thickness(&self) -> i32 {
        self.thickness.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use box_tree::FlowMetrics;

    #[test]
    fn overlay_scrollbars_clamp_to_minimum() {
        let mut metrics = FlowMetrics::new(800.0, 600.0).with_scrollbar(0.0);
        let mut metric = ScrollbarMetric::new();
        assert_eq!(metric.resolved(), None);
        assert!(metric.needs_compensation());
        assert_eq!(metric.measure(&mut metrics), MIN_SCROLLBAR);
        assert!(!metric.needs_compensation());
    }

    #[test]
    fn measurement_is_cached() {
        let mut metrics = FlowMetrics::new(800.0, 600.0).with_scrollbar(17.0);
        let mut metric = ScrollbarMetric::new();
        assert_eq!(metric.measure(&mut metrics), 17);
        let mut wider = FlowMetrics::new(800.0, 600.0).with_scrollbar(30.0);
        assert_eq!(metric.measure(&mut wider), 17);
        assert_eq!(metric.thickness(), 17);
        assert!(!metric.needs_compensation());
    }
}
