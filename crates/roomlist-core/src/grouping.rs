//! Partitioning of an ordered record set into labeled sections.
//!
//! Pure transform: snapshot in, row sequence out. Runs as successive
//! partition passes over a working set; each pass removes what it matched,
//! so every record lands in exactly one section. Store order is preserved
//! inside every section and a header is only emitted ahead of a non-empty
//! section.

use crate::models::{Conversation, ConversationKind, QueryCriteria, SectionLabel, ViewRow};

/// Map the store-ordered record set into the emitted row sequence.
pub fn group_conversations(records: &[Conversation], criteria: &QueryCriteria) -> Vec<ViewRow> {
    let mut remainder: Vec<Conversation> = records.to_vec();
    let mut rows: Vec<ViewRow> = Vec::with_capacity(records.len() + 8);

    if criteria.omnichannel_agent {
        let omnichannel = take(&mut remainder, |c| c.kind == ConversationKind::Omnichannel);
        let (on_hold, in_progress): (Vec<_>, Vec<_>) =
            omnichannel.into_iter().partition(|c| c.on_hold);
        push_section(&mut rows, SectionLabel::InProgress, in_progress);
        push_section(&mut rows, SectionLabel::OnHold, on_hold);
    }

    if criteria.show_unread {
        let unread = take(&mut remainder, Conversation::is_unread);
        push_section(&mut rows, SectionLabel::Unread, unread);
    }

    if criteria.show_favorites {
        let favorites = take(&mut remainder, |c| c.favorite);
        push_section(&mut rows, SectionLabel::Favorites, favorites);
    }

    if criteria.group_by_type {
        let teams = take(&mut remainder, |c| c.team_main);
        let discussions = take(&mut remainder, |c| c.parent_id.is_some());
        let channels = take(&mut remainder, |c| {
            matches!(
                c.kind,
                ConversationKind::PublicChannel | ConversationKind::PrivateChannel
            )
        });
        let direct = take(&mut remainder, |c| c.kind == ConversationKind::Direct);
        push_section(&mut rows, SectionLabel::Teams, teams);
        push_section(&mut rows, SectionLabel::Discussions, discussions);
        push_section(&mut rows, SectionLabel::Channels, channels);
        push_section(&mut rows, SectionLabel::DirectMessages, direct);
    }

    let sectioned = criteria.omnichannel_agent
        || criteria.show_unread
        || criteria.show_favorites
        || criteria.group_by_type;
    if sectioned {
        // Whatever no pass claimed goes under the catch-all, so the
        // partition stays complete even for records outside every group
        // (e.g. omnichannel rooms of a non-agent with type grouping on).
        push_section(&mut rows, SectionLabel::Chats, remainder);
    } else {
        rows.extend(remainder.into_iter().map(ViewRow::Conversation));
    }

    rows
}

/// Remove and return the records matching `pred`, preserving order.
fn take(records: &mut Vec<Conversation>, pred: impl Fn(&Conversation) -> bool) -> Vec<Conversation> {
    let mut taken = Vec::new();
    let mut kept = Vec::with_capacity(records.len());
    for record in records.drain(..) {
        if pred(&record) {
            taken.push(record);
        } else {
            kept.push(record);
        }
    }
    *records = kept;
    taken
}

/// Append a header and its records; empty sections emit nothing.
fn push_section(rows: &mut Vec<ViewRow>, label: SectionLabel, records: Vec<Conversation>) {
    if records.is_empty() {
        return;
    }
    rows.push(ViewRow::Section(label));
    rows.extend(records.into_iter().map(ViewRow::Conversation));
}
