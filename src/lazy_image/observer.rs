//! Viewport intersection arithmetic

use super::element::{Bounds, ElementId};

/// Visible window in layout units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub top: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(top: usize, height: usize) -> Self {
        Self { top, height }
    }

    /// Exclusive end
    pub fn bottom(&self) -> usize {
        self.top + self.height
    }

    /// Fraction of `bounds` inside the viewport, in `0.0..=1.0`.
    ///
    /// A zero-height element counts as fully visible when its top edge lies
    /// inside the viewport.
    pub fn intersection_ratio(&self, bounds: Bounds) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        if bounds.height == 0 {
            return if bounds.top >= self.top && bounds.top < self.bottom() {
                1.0
            } else {
                0.0
            };
        }
        let start = bounds.top.max(self.top);
        let end = bounds.bottom().min(self.bottom());
        if end <= start {
            return 0.0;
        }
        (end - start) as f32 / bounds.height as f32
    }
}

/// One observation of an element against the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub element: ElementId,
    pub ratio: f32,
}

impl IntersectionEntry {
    pub fn is_intersecting(&self) -> bool {
        self.ratio > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_inside_viewport() {
        let viewport = Viewport::new(10, 20);
        assert_eq!(viewport.intersection_ratio(Bounds::row(10)), 1.0);
        assert_eq!(viewport.intersection_ratio(Bounds::row(29)), 1.0);
    }

    #[test]
    fn row_outside_viewport() {
        let viewport = Viewport::new(10, 20);
        assert_eq!(viewport.intersection_ratio(Bounds::row(9)), 0.0);
        assert_eq!(viewport.intersection_ratio(Bounds::row(30)), 0.0);
    }

    #[test]
    fn partial_overlap() {
        let viewport = Viewport::new(10, 5);
        assert_eq!(viewport.intersection_ratio(Bounds::new(8, 4)), 0.5);
        assert_eq!(viewport.intersection_ratio(Bounds::new(14, 2)), 0.5);
    }

    #[test]
    fn zero_sized() {
        assert_eq!(Viewport::new(0, 0).intersection_ratio(Bounds::row(0)), 0.0);
        let viewport = Viewport::new(0, 3);
        assert_eq!(viewport.intersection_ratio(Bounds::new(2, 0)), 1.0);
        assert_eq!(viewport.intersection_ratio(Bounds::new(3, 0)), 0.0);
    }

    #[test]
    fn entry_threshold() {
        let entry = IntersectionEntry {
            element: crate::lazy_image::ImageElement::new().id(),
            ratio: 0.0,
        };
        assert!(!entry.is_intersecting());
        assert!(IntersectionEntry { ratio: 0.01, ..entry }.is_intersecting());
    }
}
