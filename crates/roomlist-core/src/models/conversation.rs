use serde::{Deserialize, Serialize};

/// Discriminator of a conversation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Direct,
    PublicChannel,
    PrivateChannel,
    Team,
    Discussion,
    Omnichannel,
}

/// One conversation/room as persisted in the local table.
///
/// Records are only ever mutated through the store's transactional write
/// path; the list core reads them from live-query snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique, stable id.
    pub id: String,
    pub kind: ConversationKind,
    /// Last-activity timestamp in milliseconds; the recency sort key.
    pub updated_at: u64,
    pub name: String,
    /// Full name ("fname"); preferred over `name` when real names are on.
    pub fname: Option<String>,
    pub favorite: bool,
    /// Unread message counter.
    pub unread: u32,
    /// Ids of threads inside this conversation with unread replies.
    pub thread_unread: Vec<String>,
    /// Set when the room should light up even with a zero counter.
    pub alert: bool,
    /// Per-room "don't show unread status" preference; wins over counters.
    pub hide_unread_badge: bool,
    /// Omnichannel only: the visitor is parked.
    pub on_hold: bool,
    pub archived: bool,
    pub open: bool,
    /// Marks the main channel of a team.
    pub team_main: bool,
    /// Parent room id; present on discussions.
    pub parent_id: Option<String>,
}

impl Conversation {
    /// A visible record with defaults everywhere but the identifying fields.
    /// `name` starts out as the id; callers override what they need.
    pub fn new(id: impl Into<String>, kind: ConversationKind, updated_at: u64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            updated_at,
            fname: None,
            favorite: false,
            unread: 0,
            thread_unread: Vec::new(),
            alert: false,
            hide_unread_badge: false,
            on_hold: false,
            archived: false,
            open: true,
            team_main: false,
            parent_id: None,
        }
    }

    /// Unread state as the list sees it: counter, per-thread unread replies
    /// or the alert flag, unless the room suppresses its unread badge.
    pub fn is_unread(&self) -> bool {
        if self.hide_unread_badge {
            return false;
        }
        self.alert || self.unread > 0 || !self.thread_unread.is_empty()
    }

    /// Display title: the full name when real names are on and the record
    /// carries a non-empty one, otherwise the plain name.
    pub fn title(&self, real_names: bool) -> &str {
        if real_names {
            if let Some(fname) = &self.fname {
                if !fname.is_empty() {
                    return fname;
                }
            }
        }
        &self.name
    }

    /// Name field fed to the alphabetical sort.
    pub fn sort_name(&self, real_names: bool) -> &str {
        self.title(real_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unread_from_counter_alert_or_threads() {
        let base = Conversation::new("r1", ConversationKind::PublicChannel, 10);
        assert!(!base.is_unread());

        let counted = Conversation {
            unread: 3,
            ..base.clone()
        };
        assert!(counted.is_unread());

        let alerted = Conversation {
            alert: true,
            ..base.clone()
        };
        assert!(alerted.is_unread());

        let threaded = Conversation {
            thread_unread: vec!["t1".to_string()],
            ..base.clone()
        };
        assert!(threaded.is_unread());
    }

    #[test]
    fn test_unread_badge_suppression_wins() {
        let suppressed = Conversation {
            unread: 5,
            alert: true,
            hide_unread_badge: true,
            ..Conversation::new("r1", ConversationKind::Direct, 10)
        };
        assert!(!suppressed.is_unread());
    }

    #[test]
    fn test_title_prefers_fname_only_with_real_names() {
        let c = Conversation {
            name: "jdoe".to_string(),
            fname: Some("Jane Doe".to_string()),
            ..Conversation::new("r1", ConversationKind::Direct, 10)
        };
        assert_eq!(c.title(true), "Jane Doe");
        assert_eq!(c.title(false), "jdoe");
    }

    #[test]
    fn test_title_falls_back_on_empty_fname() {
        let c = Conversation {
            name: "general".to_string(),
            fname: Some(String::new()),
            ..Conversation::new("r1", ConversationKind::PublicChannel, 10)
        };
        assert_eq!(c.title(true), "general");

        let missing = Conversation {
            name: "general".to_string(),
            fname: None,
            ..Conversation::new("r2", ConversationKind::PublicChannel, 10)
        };
        assert_eq!(missing.title(true), "general");
    }
}
