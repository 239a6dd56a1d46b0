use std::path::Path;

use serde::Deserialize;

use super::{CameraOverlayConfig, Deck, DeckId};
use crate::error::DeckError;
use crate::joke::{JokeContent, JokeDef, JokeFile, JokeSet};
use crate::markup::{self, MarkupDocument, splitter};
use crate::slide::{Layout, MarkupSource, RawSlide, Slide, SlideKind};

const MANIFESTS: &[&str] = &["deck.yaml", "deck.yml", "deck.json"];
const JOKE_FILES: &[&str] = &["jokes.yaml", "jokes.yml", "jokes.json"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeckManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    slides: Vec<RawSlide>,
    #[serde(default)]
    jokes: Option<Vec<JokeDef>>,
    #[serde(default)]
    camera_overlay: Option<CameraOverlayConfig>,
}

/// Reads markup slide sources from a deck directory.
struct DirectorySource<'a>(&'a Path);

impl MarkupSource for DirectorySource<'_> {
    fn load(&self, slide_id: &str, src: &str) -> Result<String, String> {
        let path = self.0.join(src.trim_start_matches("./"));
        std::fs::read_to_string(&path).map_err(|e| {
            tracing::debug!("failed to read {}: {e}", path.display());
            format!("markup not found for slide: {slide_id}")
        })
    }
}

/// Load an external deck from a directory or a single markdown file.
pub fn load_path(path: &Path, default_joke_duration_ms: u64) -> Result<Deck, DeckError> {
    if path.is_file() {
        return load_markdown_file(path);
    }

    let manifest_path = MANIFESTS
        .iter()
        .map(|name| path.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| DeckError::MissingManifest(path.to_path_buf()))?;
    let manifest = read(&manifest_path)?;

    let jokes_path = JOKE_FILES.iter().map(|name| path.join(name)).find(|p| p.is_file());
    let jokes = jokes_path.as_deref().map(read).transpose()?;

    let base = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let mut deck = parse_manifest(
        DeckId::generate_external(),
        &manifest_path,
        &manifest,
        jokes.as_deref(),
        &DirectorySource(path),
        default_joke_duration_ms,
    )?;
    resolve_assets(&mut deck, &base);
    deck.base_path = Some(base);
    Ok(deck)
}

fn read(path: &Path) -> Result<String, DeckError> {
    std::fs::read_to_string(path).map_err(|source| DeckError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_document<T: for<'de> Deserialize<'de>>(origin: &Path, text: &str) -> Result<T, DeckError> {
    let is_json = origin.extension().is_some_and(|e| e == "json") || text.trim_start().starts_with('{');
    let parsed = if is_json {
        serde_json::from_str(text).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(text).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| DeckError::Parse {
        path: origin.to_path_buf(),
        message,
    })
}

/// Build a deck from manifest text. `origin` names the manifest in errors.
pub fn parse_manifest(
    id: DeckId,
    origin: &Path,
    manifest: &str,
    jokes: Option<&str>,
    source: &dyn MarkupSource,
    default_joke_duration_ms: u64,
) -> Result<Deck, DeckError> {
    let manifest: DeckManifest = parse_document(origin, manifest)?;
    if manifest.slides.is_empty() {
        return Err(DeckError::Empty(id.to_string()));
    }

    let joke_file = match jokes {
        Some(text) => Some(parse_document::<JokeFile>(&origin.with_file_name("jokes"), text)?),
        None => manifest.jokes.map(|jokes| JokeFile { jokes }),
    };
    let jokes = joke_file.map(|file| JokeSet::from_file(file, default_joke_duration_ms));

    let slides: Vec<Slide> = manifest
        .slides
        .into_iter()
        .map(|raw| Slide::from_raw(raw, source))
        .collect();
    tracing::info!("loaded deck {id} with {} slides", slides.len());

    Ok(Deck {
        name: manifest.name.unwrap_or_else(|| id.to_string()),
        id,
        slides,
        jokes,
        camera_overlay: manifest.camera_overlay,
        base_path: None,
    })
}

/// A single markdown file becomes a deck of markup slides.
fn load_markdown_file(path: &Path) -> Result<Deck, DeckError> {
    let text = read(path)?;
    let (frontmatter, body) = markup::split_frontmatter(&text);
    let id = DeckId::generate_external();

    let slides: Vec<Slide> = splitter::split(body)
        .into_iter()
        .enumerate()
        .map(|(i, section)| {
            let layout = section
                .directive("layout")
                .and_then(|name| {
                    Layout::from_name(name).or_else(|| {
                        tracing::warn!("slide {}: unknown layout {name:?}, using center", i + 1);
                        None
                    })
                })
                .unwrap_or_default();
            let mut slide = Slide::markup(
                format!("slide-{}", i + 1),
                MarkupDocument::parse(&section.body),
                layout,
            );
            if let Some(notes) = section.directive("notes") {
                slide.notes = notes.to_string();
            }
            slide
        })
        .collect();
    if slides.is_empty() {
        return Err(DeckError::Empty(path.display().to_string()));
    }

    let name = frontmatter
        .get("title")
        .cloned()
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| id.to_string());
    let base = path
        .parent()
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.to_path_buf()));

    tracing::info!("loaded {} with {} slides", path.display(), slides.len());
    Ok(Deck {
        id,
        name,
        slides,
        jokes: None,
        camera_overlay: None,
        base_path: base,
    })
}

/// Resolve a deck-relative asset reference. URLs and absolute paths are kept.
pub fn resolve_asset(base: &Path, src: &str) -> String {
    if src.contains("://") || src.starts_with("data:") || Path::new(src).is_absolute() {
        return src.to_string();
    }
    let clean = src.trim_start_matches("./");
    base.join(clean).to_string_lossy().into_owned()
}

fn resolve_assets(deck: &mut Deck, base: &Path) {
    for slide in &mut deck.slides {
        match &mut slide.kind {
            SlideKind::Image { src, .. } | SlideKind::Embed { src } => *src = resolve_asset(base, src),
            _ => {}
        }
    }
    if let Some(jokes) = &mut deck.jokes {
        for joke in &mut jokes.jokes {
            match &mut joke.content {
                JokeContent::Image { src, .. } | JokeContent::Gif { src, .. } | JokeContent::Video { src, .. } => {
                    *src = resolve_asset(base, src)
                }
                JokeContent::Text { .. } => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write(dir: &Path, name: &str, text: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_load_directory_deck() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "deck.yaml",
            r#"
name: Talk
slides:
  - id: intro
    type: mdx
    src: ./slides/intro.mdx
  - id: photo
    type: image
    src: ./assets/photo.png
  - id: remote
    type: image
    src: https://example.com/a.png
  - id: missing
    type: mdx
    src: slides/missing.mdx
cameraOverlay:
  position: top-left
"#,
        );
        write(dir.path(), "slides/intro.mdx", "---\ntitle: Hello\n---\n# Hello\n\nWorld");
        write(
            dir.path(),
            "jokes.yaml",
            "jokes:\n  - id: a\n    hotkey: \"1\"\n    type: image\n    src: ./assets/a.png\n",
        );

        let deck = load_path(dir.path(), 2000).unwrap();
        assert!(deck.is_external());
        assert_eq!(deck.name, "Talk");
        assert_eq!(deck.len(), 4);
        assert_eq!(deck.slides[0].kind.tag(), "mdx");
        assert_eq!(deck.slides[3].kind.tag(), "error");

        let base = dir.path().canonicalize().unwrap();
        match &deck.slides[1].kind {
            SlideKind::Image { src, .. } => assert_eq!(Path::new(src), base.join("assets/photo.png")),
            other => panic!("unexpected {other:?}"),
        }
        match &deck.slides[2].kind {
            SlideKind::Image { src, .. } => assert_eq!(src, "https://example.com/a.png"),
            other => panic!("unexpected {other:?}"),
        }
        let joke = deck.jokes.as_ref().and_then(|j| j.find("1")).unwrap();
        assert_eq!(joke.content.media_src().map(PathBuf::from), Some(base.join("assets/a.png")));
        assert_eq!(deck.camera_overlay.as_ref().map(|c| c.position.as_str()), Some("top-left"));
        assert_eq!(deck.camera_overlay.as_ref().map(|c| c.shape.as_str()), Some("circle"));
    }

    #[test]
    fn test_load_json_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "deck.json",
            r#"{"name": "J", "slides": [{"id": "a", "type": "youtube", "youtubeId": "xyz"}],
               "jokes": [{"id": "t", "hotkey": "t", "type": "text", "text": "hi"}]}"#,
        );
        let deck = load_path(dir.path(), 1234).unwrap();
        assert_eq!(deck.slides[0].kind.tag(), "youtube");
        assert_eq!(deck.jokes.unwrap().find("t").unwrap().display_duration_ms, 1234);
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_path(dir.path(), 2000), Err(DeckError::MissingManifest(_))));
    }

    #[test]
    fn test_invalid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "deck.yaml", "slides: [unclosed");
        assert!(matches!(load_path(dir.path(), 2000), Err(DeckError::Parse { .. })));
    }

    #[test]
    fn test_empty_deck_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "deck.yaml", "name: Nothing\nslides: []\n");
        assert!(matches!(load_path(dir.path(), 2000), Err(DeckError::Empty(_))));
    }

    #[test]
    fn test_load_single_markdown_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "talk.md",
            "---\ntitle: My Talk\n---\n\n# One\n\nFirst\n\n@notes: breathe\n@layout: full\n# Two\n\nSecond\n\n---\n\nThird",
        );
        let deck = load_path(&dir.path().join("talk.md"), 2000).unwrap();
        assert_eq!(deck.name, "My Talk");
        assert_eq!(deck.len(), 3);
        assert_eq!(deck.slides[1].notes, "breathe");
        assert_eq!(deck.slides[1].layout, Layout::Full);
        assert!(deck.slides.iter().all(|s| s.kind.tag() == "mdx"));
    }

    #[test]
    fn test_resolve_asset_keeps_urls() {
        let base = Path::new("/decks/a");
        assert_eq!(resolve_asset(base, "https://x/y.png"), "https://x/y.png");
        assert_eq!(resolve_asset(base, "data:image/png;base64,AA"), "data:image/png;base64,AA");
        assert_eq!(PathBuf::from(resolve_asset(base, "./img/y.png")), base.join("img/y.png"));
    }
}
