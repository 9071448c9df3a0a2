//! Row window over the results table.
//!
//! Tracks the selected row and the first visible row, keeping the
//! selection on screen. The window doubles as the viewport the lazy image
//! loader observes.

use std::ops::Range;

use crate::lazy_image::Viewport;

/// Calculate visible range for viewport
pub fn calculate_visible_range(
    total_items: usize,
    viewport_start: usize,
    viewport_size: usize,
) -> (usize, usize) {
    let start = viewport_start.min(total_items);
    let end = (viewport_start + viewport_size).min(total_items);
    (start, end)
}

/// Calculate page jump target
pub fn calculate_page_jump(
    current_pos: usize,
    page_size: usize,
    total_items: usize,
    direction_up: bool,
) -> usize {
    if direction_up {
        current_pos.saturating_sub(page_size)
    } else {
        (current_pos + page_size).min(total_items.saturating_sub(1))
    }
}

/// Smallest offset change that keeps `selected` inside the window
pub fn scroll_to_show(selected: usize, offset: usize, height: usize) -> usize {
    if height == 0 || selected < offset {
        selected
    } else if selected >= offset + height {
        (selected + 1).saturating_sub(height)
    } else {
        offset
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsViewport {
    selected: usize,
    offset: usize,
    height: usize,
    total: usize,
}

impl ResultsViewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// New result set: back to the top
    pub fn reset(&mut self, total: usize) {
        self.total = total;
        self.selected = 0;
        self.offset = 0;
    }

    /// Rows available for results in the last layout
    pub fn set_height(&mut self, height: usize) {
        self.height = height;
        self.clamp();
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn move_up(&mut self) {
        self.select(self.selected.saturating_sub(1));
    }

    pub fn move_down(&mut self) {
        self.select(self.selected + 1);
    }

    pub fn page_up(&mut self) {
        let page = self.height.max(1);
        self.select(calculate_page_jump(self.selected, page, self.total, true));
    }

    pub fn page_down(&mut self) {
        let page = self.height.max(1);
        self.select(calculate_page_jump(self.selected, page, self.total, false));
    }

    pub fn home(&mut self) {
        self.select(0);
    }

    pub fn end(&mut self) {
        self.select(self.total.saturating_sub(1));
    }

    fn select(&mut self, row: usize) {
        self.selected = row.min(self.total.saturating_sub(1));
        self.clamp();
    }

    fn clamp(&mut self) {
        self.selected = self.selected.min(self.total.saturating_sub(1));
        self.offset = scroll_to_show(self.selected, self.offset, self.height);
        // Don't leave blank rows at the bottom when the list fits
        let max_offset = self.total.saturating_sub(self.height);
        self.offset = self.offset.min(max_offset);
    }

    /// Indices of the rows currently on screen
    pub fn visible_range(&self) -> Range<usize> {
        let (start, end) = calculate_visible_range(self.total, self.offset, self.height);
        start..end
    }

    /// The on-screen window in row units, for intersection checks
    pub fn lazy_viewport(&self) -> Viewport {
        Viewport::new(self.offset, self.height)
    }
}
