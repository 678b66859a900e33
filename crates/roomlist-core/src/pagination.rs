//! Window bookkeeping for the ungrouped, "load more" view.

/// Monotonically growing pagination window.
///
/// The window never shrinks while one subscription is alive; it snaps back
/// to a single page only when a criteria change opens a fresh subscription.
#[derive(Debug, Clone)]
pub struct PageWindow {
    page_size: usize,
    window: usize,
    refresh_in_flight: bool,
}

impl PageWindow {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            window: page_size,
            refresh_in_flight: false,
        }
    }

    pub fn current(&self) -> usize {
        self.window
    }

    /// Grow by one page and return the new window size.
    ///
    /// Returns `None` while the refresh for a previous growth is still in
    /// flight; rapid scroll events would otherwise request the same window
    /// twice.
    pub fn grow(&mut self) -> Option<usize> {
        if self.refresh_in_flight {
            return None;
        }
        self.window += self.page_size;
        self.refresh_in_flight = true;
        Some(self.window)
    }

    /// The regrown subscription delivered its first snapshot.
    pub fn refresh_done(&mut self) {
        self.refresh_in_flight = false;
    }

    /// Snap back to one page for a fresh subscription.
    pub fn reset(&mut self) {
        self.window = self.page_size;
        self.refresh_in_flight = false;
    }
}
