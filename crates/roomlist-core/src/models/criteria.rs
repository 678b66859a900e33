use serde::{Deserialize, Serialize};

/// Primary sort key of the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// `updated_at` descending.
    #[default]
    Recency,
    /// Display name ascending.
    Alphabetical,
}

/// Immutable description of the desired view.
///
/// Equality is field-by-field; the runtime only resubscribes when a new
/// criteria value actually differs from the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCriteria {
    pub sort_key: SortKey,
    pub group_by_type: bool,
    pub show_favorites: bool,
    pub show_unread: bool,
    /// The user is an omnichannel agent and sees queued visitor rooms.
    pub omnichannel_agent: bool,
    /// Alphabetical sort uses the full name instead of the username.
    pub real_name_sort: bool,
}

impl QueryCriteria {
    /// True when some section-producing flag forces observing the entire
    /// matching set instead of a paginated window.
    pub fn grouping_active(&self) -> bool {
        self.group_by_type || self.show_favorites || self.show_unread
    }
}
