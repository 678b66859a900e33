use std::time::Duration;

/// Tunables of the list core.
#[derive(Debug, Clone, Copy)]
pub struct ListConfig {
    /// Records fetched per page in the ungrouped, "load more" view.
    pub page_size: usize,
    /// Quiescence window before a typed query is sent to the search service.
    pub search_debounce: Duration,
}

impl ListConfig {
    pub fn new(page_size: usize, search_debounce: Duration) -> Self {
        Self {
            page_size: page_size.max(1),
            search_debounce,
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self::new(20, Duration::from_millis(300))
    }
}
