use serde::{Deserialize, Serialize};

use crate::deck::{CameraOverlayConfig, Deck, DeckId};
use crate::joke::Joke;
use crate::navigation::Navigator;
use crate::slide::SlideView;

/// Everything the audience needs to draw the current moment of the talk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub current_index: usize,
    pub total_slides: usize,
    pub current_slide: Option<SlideView>,
    pub next_slide: Option<SlideView>,
    #[serde(default)]
    pub jokes: Vec<Joke>,
    /// Epoch milliseconds when the audience window was opened or the timer
    /// was last reset.
    pub presentation_start_time: Option<i64>,
    pub deck_id: Option<DeckId>,
    pub camera_overlay_visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_overlay: Option<CameraOverlayConfig>,
    pub theme: String,
    pub is_external_deck: bool,
    /// The full slide list, present only for external decks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_slides: Option<Vec<SlideView>>,
}

/// The part of a snapshot that decides whether it is worth sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupKey {
    current_index: usize,
    total_slides: usize,
    deck_id: Option<DeckId>,
    camera_overlay_visible: bool,
    theme: String,
}

impl SyncSnapshot {
    pub fn build(
        deck: Option<&Deck>,
        navigator: &Navigator,
        theme: &str,
        camera_overlay_visible: bool,
        presentation_start_time: Option<i64>,
    ) -> Self {
        let external = deck.is_some_and(Deck::is_external);
        let index = navigator.current_index();
        let view = |i: usize| deck.and_then(|d| d.slide(i)).map(|s| s.view(external));

        Self {
            current_index: index,
            total_slides: navigator.total(),
            current_slide: view(index),
            next_slide: view(index + 1),
            jokes: deck
                .and_then(|d| d.jokes.as_ref())
                .map(|j| j.jokes.clone())
                .unwrap_or_default(),
            presentation_start_time,
            deck_id: deck.map(|d| d.id.clone()),
            camera_overlay_visible,
            camera_overlay: deck.and_then(|d| d.camera_overlay.clone()),
            theme: theme.to_string(),
            is_external_deck: external,
            external_slides: deck
                .filter(|d| d.is_external())
                .map(|d| d.slides.iter().map(|s| s.view(true)).collect()),
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            current_index: self.current_index,
            total_slides: self.total_slides,
            deck_id: self.deck_id.clone(),
            camera_overlay_visible: self.camera_overlay_visible,
            theme: self.theme.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::DeckLibrary;
    use crate::markup::MarkupDocument;
    use crate::slide::{Layout, Slide};

    fn external_deck(n: usize) -> Deck {
        let slides = (0..n)
            .map(|i| {
                Slide::markup(
                    format!("s{i}"),
                    MarkupDocument::parse(&format!("# Slide {i}\n\nBody")),
                    Layout::Center,
                )
            })
            .collect();
        Deck {
            id: DeckId::generate_external(),
            name: "ext".to_string(),
            slides,
            jokes: None,
            camera_overlay: None,
            base_path: None,
        }
    }

    #[test]
    fn test_external_deck_embeds_flattened_slides() {
        let deck = external_deck(5);
        let mut nav = Navigator::new();
        nav.select_deck(deck.id.clone(), deck.len());
        let snapshot = SyncSnapshot::build(Some(&deck), &nav, "dark", false, None);

        assert!(snapshot.is_external_deck);
        let slides = snapshot.external_slides.as_ref().unwrap();
        assert_eq!(slides.len(), 5);
        assert!(slides.iter().all(|s| s.kind == "mdx" && s.html.as_deref().is_some_and(|h| !h.is_empty())));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["externalSlides"].as_array().map(Vec::len), Some(5));
        assert_eq!(json["isExternalDeck"], true);
    }

    #[test]
    fn test_bundled_deck_omits_slide_list() {
        let library = DeckLibrary::bundled(2000);
        let deck = library.resolve("welcome").unwrap();
        let mut nav = Navigator::new();
        nav.select_deck(deck.id.clone(), deck.len());
        nav.next();
        let snapshot = SyncSnapshot::build(Some(deck), &nav, "light", true, Some(1));

        assert!(!snapshot.is_external_deck);
        assert!(snapshot.external_slides.is_none());
        assert_eq!(snapshot.current_slide.as_ref().map(|s| s.id.as_str()), Some("two-windows"));
        assert_eq!(snapshot.next_slide.as_ref().map(|s| s.id.as_str()), Some("sync"));
        assert!(!snapshot.jokes.is_empty());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("externalSlides").is_none());
        assert_eq!(json["deckId"], "welcome");
    }

    #[test]
    fn test_dedup_key_ignores_timestamp() {
        let deck = external_deck(2);
        let mut nav = Navigator::new();
        nav.select_deck(deck.id.clone(), deck.len());
        let a = SyncSnapshot::build(Some(&deck), &nav, "dark", false, Some(1));
        let b = SyncSnapshot::build(Some(&deck), &nav, "dark", false, Some(2));
        assert_eq!(a.dedup_key(), b.dedup_key());
        let c = SyncSnapshot::build(Some(&deck), &nav, "light", false, Some(1));
        assert_ne!(a.dedup_key(), c.dedup_key());
    }

    #[test]
    fn test_no_deck() {
        let snapshot = SyncSnapshot::build(None, &Navigator::new(), "dark", false, None);
        assert_eq!(snapshot.total_slides, 0);
        assert!(snapshot.current_slide.is_none());
        assert!(snapshot.deck_id.is_none());
    }
}
