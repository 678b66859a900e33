use serde::{Deserialize, Serialize};

use super::Conversation;

/// Labels of the synthetic section rows. The set is closed and the
/// declaration order is the precedence order between sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionLabel {
    InProgress,
    OnHold,
    Unread,
    Favorites,
    Teams,
    Discussions,
    Channels,
    DirectMessages,
    /// Catch-all for whatever no earlier section claimed.
    Chats,
}

impl SectionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionLabel::InProgress => "In Progress",
            SectionLabel::OnHold => "On Hold",
            SectionLabel::Unread => "Unread",
            SectionLabel::Favorites => "Favorites",
            SectionLabel::Teams => "Teams",
            SectionLabel::Discussions => "Discussions",
            SectionLabel::Channels => "Channels",
            SectionLabel::DirectMessages => "Direct Messages",
            SectionLabel::Chats => "Chats",
        }
    }
}

/// One row of the emitted view sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "row", content = "data", rename_all = "snake_case")]
pub enum ViewRow {
    Section(SectionLabel),
    Conversation(Conversation),
}

impl ViewRow {
    /// Section headers separate groups; they are not records.
    pub fn is_separator(&self) -> bool {
        matches!(self, ViewRow::Section(_))
    }
}

/// Lifecycle phase of the consumer-facing view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewPhase {
    /// Waiting for the first snapshot of the current subscription.
    Loading,
    Live,
    /// The live query could not be opened. Not retried internally; call
    /// `set_criteria` again once the store is reachable.
    Failed(String),
}

/// What the consumer observes: always a well-defined row sequence, plus the
/// phase it is in. A failed refresh keeps the last good rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub rows: Vec<ViewRow>,
    pub phase: ViewPhase,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            phase: ViewPhase::Loading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationKind;

    #[test]
    fn test_separator_marker() {
        assert!(ViewRow::Section(SectionLabel::Unread).is_separator());
        let record = Conversation::new("r1", ConversationKind::Direct, 1);
        assert!(!ViewRow::Conversation(record).is_separator());
    }

    #[test]
    fn test_labels() {
        assert_eq!(SectionLabel::DirectMessages.as_str(), "Direct Messages");
        assert_eq!(SectionLabel::Chats.as_str(), "Chats");
    }

    #[test]
    fn test_rows_serialize_with_a_row_tag() {
        // embedders (and the repl's dump command) tell the variants apart
        // by the "row" tag
        let header = serde_json::to_value(ViewRow::Section(SectionLabel::Unread)).unwrap();
        assert_eq!(header["row"], "section");
        assert_eq!(header["data"], "unread");

        let record = Conversation::new("r1", ConversationKind::Direct, 1);
        let row = serde_json::to_value(ViewRow::Conversation(record)).unwrap();
        assert_eq!(row["row"], "conversation");
        assert_eq!(row["data"]["id"], "r1");
    }
}
