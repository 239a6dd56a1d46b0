//! Deck model and the library of decks a session can switch between.

pub mod loader;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::joke::JokeSet;
use crate::slide::Slide;

pub use loader::{load_path, parse_manifest};

/// Identifies a deck. Bundled decks are addressed by name; externally loaded
/// decks get a generated identifier the audience cannot resolve on its own.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeckId {
    Bundled(String),
    External(String),
}

const EXTERNAL_PREFIX: &str = "external-";

impl DeckId {
    pub fn generate_external() -> Self {
        Self::External(format!("{EXTERNAL_PREFIX}{}", uuid::Uuid::new_v4()))
    }

    /// Parse the wire form back into an id.
    pub fn parse(s: &str) -> Self {
        if s.starts_with(EXTERNAL_PREFIX) {
            Self::External(s.to_string())
        } else {
            Self::Bundled(s.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Bundled(s) | Self::External(s) => s,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeckId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeckId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Where the presenter's camera bubble sits when it is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraOverlayConfig {
    #[serde(default = "default_camera_position")]
    pub position: String,
    #[serde(default = "default_camera_size")]
    pub size: String,
    #[serde(default = "default_camera_shape")]
    pub shape: String,
}

fn default_camera_position() -> String {
    "bottom-right".to_string()
}

fn default_camera_size() -> String {
    "medium".to_string()
}

fn default_camera_shape() -> String {
    "circle".to_string()
}

impl Default for CameraOverlayConfig {
    fn default() -> Self {
        Self {
            position: default_camera_position(),
            size: default_camera_size(),
            shape: default_camera_shape(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    pub slides: Vec<Slide>,
    pub jokes: Option<JokeSet>,
    pub camera_overlay: Option<CameraOverlayConfig>,
    /// Directory relative asset paths were resolved against.
    pub base_path: Option<PathBuf>,
}

impl Deck {
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn slide(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    pub fn is_external(&self) -> bool {
        self.id.is_external()
    }
}

struct BundledDeck {
    name: &'static str,
    manifest: &'static str,
    jokes: Option<&'static str>,
    files: &'static [(&'static str, &'static str)],
}

struct BundledFiles(&'static [(&'static str, &'static str)]);

impl crate::slide::MarkupSource for BundledFiles {
    fn load(&self, slide_id: &str, src: &str) -> Result<String, String> {
        let wanted = src.trim_start_matches("./");
        self.0
            .iter()
            .find(|(path, _)| *path == wanted)
            .map(|(_, text)| text.to_string())
            .ok_or_else(|| format!("markup not found for slide: {slide_id}"))
    }
}

const BUNDLED: &[BundledDeck] = &[
    BundledDeck {
        name: "welcome",
        manifest: include_str!("../../decks/welcome/deck.yaml"),
        jokes: Some(include_str!("../../decks/welcome/jokes.yaml")),
        files: &[
            ("slides/intro.md", include_str!("../../decks/welcome/slides/intro.md")),
            ("slides/sync.md", include_str!("../../decks/welcome/slides/sync.md")),
        ],
    },
    BundledDeck {
        name: "quick-demo",
        manifest: include_str!("../../decks/quick-demo/deck.yaml"),
        jokes: None,
        files: &[],
    },
];

/// All decks available to a presenter session, in display order.
#[derive(Debug, Clone, Default)]
pub struct DeckLibrary {
    decks: BTreeMap<DeckId, Deck>,
    order: Vec<DeckId>,
}

impl DeckLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The decks compiled into the binary.
    pub fn bundled(default_joke_duration_ms: u64) -> Self {
        let mut library = Self::new();
        for bundled in BUNDLED {
            let id = DeckId::Bundled(bundled.name.to_string());
            let origin = PathBuf::from(bundled.name).join("deck.yaml");
            let deck = loader::parse_manifest(
                id,
                &origin,
                bundled.manifest,
                bundled.jokes,
                &BundledFiles(bundled.files),
                default_joke_duration_ms,
            );
            match deck {
                Ok(deck) => library.insert(deck),
                Err(e) => tracing::error!("bundled deck {} is invalid: {e}", bundled.name),
            }
        }
        library
    }

    /// Add or replace a deck. A replaced deck keeps its position.
    pub fn insert(&mut self, deck: Deck) {
        if !self.decks.contains_key(&deck.id) {
            self.order.push(deck.id.clone());
        }
        self.decks.insert(deck.id.clone(), deck);
    }

    pub fn get(&self, id: &DeckId) -> Option<&Deck> {
        self.decks.get(id)
    }

    /// Look a deck up by id, then by display name ignoring case.
    pub fn resolve(&self, name: &str) -> Option<&Deck> {
        self.get(&DeckId::parse(name)).or_else(|| {
            self.iter()
                .find(|deck| deck.name.eq_ignore_ascii_case(name.trim()))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Deck> {
        self.order.iter().filter_map(|id| self.decks.get(id))
    }

    pub fn first(&self) -> Option<&Deck> {
        self.order.first().and_then(|id| self.decks.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::SlideKind;

    #[test]
    fn test_external_ids_are_distinct() {
        let a = DeckId::generate_external();
        let b = DeckId::generate_external();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("external-"));
        assert!(a.is_external());
        assert_eq!(DeckId::parse(a.as_str()), a);
    }

    #[test]
    fn test_deck_id_serializes_as_string() {
        let id = DeckId::Bundled("welcome".to_string());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"welcome\"");
        let back: DeckId = serde_json::from_str("\"external-123\"").unwrap();
        assert_eq!(back, DeckId::External("external-123".to_string()));
    }

    #[test]
    fn test_bundled_library_loads() {
        let library = DeckLibrary::bundled(2000);
        assert_eq!(library.len(), 2);
        let welcome = library.resolve("welcome").unwrap();
        assert!(!welcome.is_external());
        assert!(welcome.len() >= 4);
        assert!(welcome.jokes.as_ref().is_some_and(|j| !j.is_empty()));
        assert!(
            welcome
                .slides
                .iter()
                .all(|s| !matches!(s.kind, SlideKind::Error { .. }))
        );
        assert_eq!(library.first().map(|d| d.name.as_str()), Some("Welcome to Stagecast"));
        assert_eq!(
            library.resolve("welcome to stagecast").map(|d| d.id.as_str()),
            Some("welcome")
        );
        assert!(library.resolve("missing").is_none());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut library = DeckLibrary::bundled(2000);
        let mut deck = library.resolve("welcome").unwrap().clone();
        deck.name = "Renamed".to_string();
        library.insert(deck);
        assert_eq!(library.len(), 2);
        assert_eq!(library.first().map(|d| d.name.as_str()), Some("Renamed"));
    }
}
