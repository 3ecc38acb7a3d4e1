//! Viewer zoom level and drag panning

/// How the viewer sizes the focused image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Zoom {
    /// Scale to the viewport, preserving aspect ratio
    #[default]
    Fit,
    /// Image width as a percentage of the viewport width
    Percent(u16),
}

impl Zoom {
    pub const MIN_PERCENT: u16 = 10;
    pub const MAX_PERCENT: u16 = 800;
    pub const STEP: u16 = 10;

    /// Leaving Fit starts from 100%
    fn percent(self) -> u16 {
        match self {
            Zoom::Fit => 100,
            Zoom::Percent(pct) => pct,
        }
    }

    pub fn zoom_in(self) -> Self {
        Zoom::Percent((self.percent() + Self::STEP).min(Self::MAX_PERCENT))
    }

    pub fn zoom_out(self) -> Self {
        Zoom::Percent(self.percent().saturating_sub(Self::STEP).max(Self::MIN_PERCENT))
    }

    pub fn label(self) -> String {
        match self {
            Zoom::Fit => "Fit".to_string(),
            Zoom::Percent(pct) => format!("{}%", pct),
        }
    }

    /// Dragging pans the image only when it is wider than the viewport
    pub fn is_pannable(self) -> bool {
        matches!(self, Zoom::Percent(pct) if pct > 100)
    }

    /// Rendered image width for a viewport, `None` when fitting
    pub fn image_width(self, viewport_width: f32) -> Option<f32> {
        match self {
            Zoom::Fit => None,
            Zoom::Percent(pct) => Some(viewport_width * f32::from(pct) / 100.0),
        }
    }
}

/// An in-progress drag over a zoomed image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pan {
    start_cursor: (f32, f32),
    start_offset: (f32, f32),
}

impl Pan {
    pub fn begin(cursor: (f32, f32), offset: (f32, f32)) -> Self {
        Self {
            start_cursor: cursor,
            start_offset: offset,
        }
    }

    /// Scroll offset for the current cursor: the image follows the pointer
    pub fn offset_at(&self, cursor: (f32, f32)) -> (f32, f32) {
        let x = self.start_offset.0 - (cursor.0 - self.start_cursor.0);
        let y = self.start_offset.1 - (cursor.1 - self.start_cursor.1);
        (x.max(0.0), y.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_steps_from_fit() {
        assert_eq!(Zoom::Fit.zoom_in(), Zoom::Percent(110));
        assert_eq!(Zoom::Fit.zoom_out(), Zoom::Percent(90));
        assert_eq!(Zoom::Percent(110).zoom_out(), Zoom::Percent(100));
    }

    #[test]
    fn test_zoom_is_clamped() {
        assert_eq!(Zoom::Percent(800).zoom_in(), Zoom::Percent(800));
        assert_eq!(Zoom::Percent(795).zoom_in(), Zoom::Percent(800));
        assert_eq!(Zoom::Percent(10).zoom_out(), Zoom::Percent(10));
        assert_eq!(Zoom::Percent(15).zoom_out(), Zoom::Percent(10));
    }

    #[test]
    fn test_labels_and_panning() {
        assert_eq!(Zoom::Fit.label(), "Fit");
        assert_eq!(Zoom::Percent(250).label(), "250%");
        assert!(!Zoom::Fit.is_pannable());
        assert!(!Zoom::Percent(100).is_pannable());
        assert!(Zoom::Percent(110).is_pannable());
    }

    #[test]
    fn test_image_width() {
        assert_eq!(Zoom::Fit.image_width(1000.0), None);
        assert_eq!(Zoom::Percent(250).image_width(1000.0), Some(2500.0));
        assert_eq!(Zoom::Percent(50).image_width(1000.0), Some(500.0));
    }

    #[test]
    fn test_pan_follows_the_pointer() {
        let pan = Pan::begin((100.0, 100.0), (300.0, 200.0));
        assert_eq!(pan.offset_at((100.0, 100.0)), (300.0, 200.0));
        // Dragging left and up reveals more of the right and bottom
        assert_eq!(pan.offset_at((60.0, 80.0)), (340.0, 220.0));
        assert_eq!(pan.offset_at((500.0, 400.0)), (0.0, 0.0));
    }
}
