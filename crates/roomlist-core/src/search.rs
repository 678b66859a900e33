//! Debounced search overlay.
//!
//! Free-text search temporarily replaces the grouped rows with a flat result
//! list. Requests are generation-tagged: only a result carrying the current
//! generation may touch the overlay, which makes cancellation a counter bump
//! compared at apply time instead of a timer/cancellation primitive.

use std::time::Duration;

use tokio::time::Instant;

use crate::models::{Conversation, ViewRow};

/// State machine of the search overlay. The timer firing and the request
/// completion are driven from the runtime's select loop.
#[derive(Debug)]
pub struct SearchOverlay {
    debounce: Duration,
    generation: u64,
    active: bool,
    pending: Option<Pending>,
    results: Option<Vec<Conversation>>,
}

/// Text waiting for the quiescence window to elapse.
#[derive(Debug)]
struct Pending {
    text: String,
    deadline: Instant,
}

impl SearchOverlay {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            generation: 0,
            active: false,
            pending: None,
            results: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deadline the runtime should sleep until while a keystroke is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Record a new text value. Empty text cancels the session; anything
    /// else restarts the quiescence timer (trailing-edge debounce).
    pub fn on_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.cancel();
            return;
        }
        self.active = true;
        self.pending = Some(Pending {
            text: text.to_string(),
            deadline: Instant::now() + self.debounce,
        });
    }

    /// The timer elapsed: consume the pending text and hand out the
    /// generation number for the request about to be issued.
    pub fn fire(&mut self) -> Option<(u64, String)> {
        let pending = self.pending.take()?;
        self.generation += 1;
        Some((self.generation, pending.text))
    }

    /// Apply a completed request. Returns false (and changes nothing) for
    /// any generation but the current one of a still-active session.
    pub fn apply(&mut self, generation: u64, results: Vec<Conversation>) -> bool {
        if !self.active || generation != self.generation {
            return false;
        }
        self.results = Some(results);
        true
    }

    /// Clear the overlay and invalidate anything still in flight.
    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.active = false;
        self.pending = None;
        self.results = None;
    }

    /// The flat overlay rows while search owns the view. `None` until a
    /// result arrived, so the grouped rows stay visible during the first
    /// round trip.
    pub fn rows(&self) -> Option<Vec<ViewRow>> {
        if !self.active {
            return None;
        }
        self.results
            .as_ref()
            .map(|results| results.iter().cloned().map(ViewRow::Conversation).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConversationKind;

    fn overlay() -> SearchOverlay {
        SearchOverlay::new(Duration::from_millis(300))
    }

    fn result(id: &str) -> Vec<Conversation> {
        vec![Conversation::new(id, ConversationKind::PublicChannel, 1)]
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_text_restarts_the_timer() {
        let mut search = overlay();
        search.on_text("alp");
        let first = search.deadline().unwrap();

        tokio::time::advance(Duration::from_millis(200)).await;
        search.on_text("alpha");
        let second = search.deadline().unwrap();
        assert!(second > first);

        // only the trailing text fires, with the next generation
        assert_eq!(search.fire(), Some((1, "alpha".to_string())));
        assert_eq!(search.deadline(), None);
    }

    #[test]
    fn test_stale_generation_never_overwrites_newer() {
        let mut search = overlay();
        search.on_text("a");
        let (g1, _) = search.fire().unwrap();
        search.on_text("ab");
        let (g2, _) = search.fire().unwrap();
        assert!(g2 > g1);

        assert!(search.apply(g2, result("newer")));
        // the late g1 response must not touch the overlay
        assert!(!search.apply(g1, result("older")));
        let rows = search.rows().unwrap();
        assert_eq!(rows.len(), 1);
        match &rows[0] {
            ViewRow::Conversation(c) => assert_eq!(c.id, "newer"),
            ViewRow::Section(_) => panic!("overlay rows carry no headers"),
        }
    }

    #[test]
    fn test_cancel_invalidates_in_flight_request() {
        let mut search = overlay();
        search.on_text("query");
        let (generation, _) = search.fire().unwrap();
        search.cancel();
        assert!(!search.apply(generation, result("late")));
        assert!(search.rows().is_none());
    }

    #[test]
    fn test_empty_text_is_inert() {
        let mut search = overlay();
        search.on_text("   ");
        assert!(!search.is_active());
        assert!(search.deadline().is_none());
        assert!(search.fire().is_none());
        assert!(search.rows().is_none());
    }

    #[test]
    fn test_grouped_rows_stay_until_first_result() {
        let mut search = overlay();
        search.on_text("q");
        assert!(search.is_active());
        // active session, no response yet: nothing to overlay
        assert!(search.rows().is_none());

        let (generation, _) = search.fire().unwrap();
        assert!(search.apply(generation, Vec::new()));
        // an empty result is a real overlay, distinct from "no result yet"
        assert_eq!(search.rows().unwrap().len(), 0);
    }
}
