use std::time::{Duration, Instant};

use super::{Joke, JokeSet};

#[derive(Debug, Clone)]
struct ActiveJoke {
    joke: Joke,
    shown_at: Instant,
    dismiss_at: Instant,
}

/// Tracks the single joke currently shown on top of the slides.
///
/// The auto-dismiss timer is a deadline checked by [`JokeManager::tick`], so the
/// owner decides when time advances.
#[derive(Debug, Clone, Default)]
pub struct JokeManager {
    jokes: JokeSet,
    active: Option<ActiveJoke>,
}

impl JokeManager {
    pub fn new(jokes: JokeSet) -> Self {
        Self { jokes, active: None }
    }

    /// Swap in another deck's jokes. Whatever is on screen is dismissed.
    pub fn replace_jokes(&mut self, jokes: JokeSet) -> bool {
        self.jokes = jokes;
        self.dismiss()
    }

    pub fn jokes(&self) -> &JokeSet {
        &self.jokes
    }

    /// Show the joke bound to `hotkey`, replacing any joke already active.
    /// Unknown hotkeys do nothing.
    pub fn trigger(&mut self, hotkey: &str, now: Instant) -> Option<&Joke> {
        let joke = self.jokes.find(hotkey)?.clone();
        tracing::debug!("showing joke {} for {}ms", joke.id, joke.display_duration_ms);
        let dismiss_at = now + Duration::from_millis(joke.display_duration_ms);
        self.active = Some(ActiveJoke {
            joke,
            shown_at: now,
            dismiss_at,
        });
        self.active_joke()
    }

    /// Clear the active joke and cancel its timer. Returns whether anything
    /// was showing.
    pub fn dismiss(&mut self) -> bool {
        self.active.take().is_some()
    }

    /// Dismiss the active joke once its display time has passed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match &self.active {
            Some(active) if now >= active.dismiss_at => {
                tracing::debug!("joke {} expired", active.joke.id);
                self.active = None;
                true
            }
            _ => false,
        }
    }

    pub fn active_joke(&self) -> Option<&Joke> {
        self.active.as_ref().map(|a| &a.joke)
    }

    /// When the active joke was last triggered. Re-triggering restarts it.
    pub fn shown_at(&self) -> Option<Instant> {
        self.active.as_ref().map(|a| a.shown_at)
    }

    /// When the active joke will dismiss itself, for scheduling repaints.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.as_ref().map(|a| a.dismiss_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joke::{JokeDef, JokeFile};

    fn manager() -> JokeManager {
        let def = |id: &str, hotkey: &str, duration: u64| JokeDef {
            id: id.to_string(),
            hotkey: hotkey.to_string(),
            kind: "text".to_string(),
            text: Some(id.to_string()),
            duration: Some(duration),
            ..JokeDef::default()
        };
        JokeManager::new(JokeSet::from_file(
            JokeFile {
                jokes: vec![def("quick", "1", 100), def("slow", "2", 5000)],
            },
            2000,
        ))
    }

    #[test]
    fn test_auto_dismiss() {
        let mut jokes = manager();
        let t0 = Instant::now();
        assert!(jokes.trigger("1", t0).is_some());
        assert!(!jokes.tick(t0 + Duration::from_millis(50)));
        assert!(jokes.active_joke().is_some());
        assert!(jokes.tick(t0 + Duration::from_millis(150)));
        assert!(jokes.active_joke().is_none());
    }

    #[test]
    fn test_trigger_replaces_active() {
        let mut jokes = manager();
        let t0 = Instant::now();
        jokes.trigger("2", t0);
        jokes.trigger("1", t0 + Duration::from_millis(10));
        assert_eq!(jokes.active_joke().map(|j| j.id.as_str()), Some("quick"));
        assert_eq!(jokes.next_deadline(), Some(t0 + Duration::from_millis(110)));
    }

    #[test]
    fn test_retrigger_restarts_timer() {
        let mut jokes = manager();
        let t0 = Instant::now();
        jokes.trigger("1", t0);
        jokes.trigger("1", t0 + Duration::from_millis(80));
        assert!(!jokes.tick(t0 + Duration::from_millis(150)));
        assert!(jokes.tick(t0 + Duration::from_millis(180)));
    }

    #[test]
    fn test_retrigger_restarts_entry_animation() {
        let mut jokes = manager();
        let t0 = Instant::now();
        jokes.trigger("2", t0);
        assert_eq!(jokes.shown_at(), Some(t0));
        let again = t0 + Duration::from_millis(300);
        jokes.trigger("2", again);
        assert_eq!(jokes.shown_at(), Some(again));
        jokes.dismiss();
        assert_eq!(jokes.shown_at(), None);
    }

    #[test]
    fn test_unknown_hotkey_is_noop() {
        let mut jokes = manager();
        let t0 = Instant::now();
        jokes.trigger("2", t0);
        assert!(jokes.trigger("9", t0).is_none());
        assert_eq!(jokes.active_joke().map(|j| j.id.as_str()), Some("slow"));
    }

    #[test]
    fn test_manual_dismiss_cancels_timer_and_is_idempotent() {
        let mut jokes = manager();
        let t0 = Instant::now();
        jokes.trigger("1", t0);
        assert!(jokes.dismiss());
        assert!(!jokes.dismiss());
        assert!(jokes.next_deadline().is_none());
        assert!(!jokes.tick(t0 + Duration::from_millis(500)));
    }
}
