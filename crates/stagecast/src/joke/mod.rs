//! Hotkey-triggered overlay media ("jokes").
//!
//! Deck files describe jokes loosely; [`Joke::from_def`] validates the
//! description and falls back to documented defaults with a warning instead of
//! rejecting the deck.

pub mod manager;
pub mod preload;

use serde::{Deserialize, Serialize};

pub use manager::JokeManager;
pub use preload::Preloader;

/// Display duration used when neither the joke nor the config sets one.
pub const DEFAULT_DISPLAY_DURATION_MS: u64 = 2000;

pub const ENTRY_ANIMATIONS: &[&str] = &[
    "fade",
    "scale",
    "slideInLeft",
    "slideInRight",
    "slideInTop",
    "slideInBottom",
    "bounce",
    "flip",
    "spin",
    "zoom",
    "elastic",
    "shake",
    "bounceRotate",
    "slideScale",
    "flipSlide",
    "spinZoom",
    "shakeScale",
    "slideRotate",
];

pub const EXIT_ANIMATIONS: &[&str] = &[
    "fade",
    "scale",
    "slideOutLeft",
    "slideOutRight",
    "slideOutTop",
    "slideOutBottom",
    "shrink",
    "spinOut",
    "zoomOut",
    "bounceRotateOut",
    "slideScaleOut",
    "flipSlideOut",
    "spinZoomOut",
    "shakeScaleOut",
    "slideRotateOut",
];

pub const EASINGS: &[&str] = &[
    "linear",
    "easeIn",
    "easeOut",
    "easeInOut",
    "spring",
    "bounce",
    "anticipate",
];

pub const POSITIONS: &[&str] = &[
    "center",
    "top-left",
    "top-right",
    "bottom-left",
    "bottom-right",
    "top",
    "bottom",
    "left",
    "right",
];

pub const SIZES: &[&str] = &["small", "medium", "large", "fullscreen"];

/// A validated overlay joke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Joke {
    pub id: String,
    pub hotkey: String,
    #[serde(flatten)]
    pub content: JokeContent,
    #[serde(rename = "duration")]
    pub display_duration_ms: u64,
    pub animation: AnimationSpec,
    pub position: PositionSpec,
    pub size: SizeSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JokeContent {
    Image {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
    Gif {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
    Video {
        src: String,
        #[serde(rename = "loop")]
        looping: bool,
        muted: bool,
    },
    Text {
        text: String,
    },
}

impl JokeContent {
    /// The media asset to fetch ahead of time, if any.
    pub fn media_src(&self) -> Option<&str> {
        match self {
            Self::Image { src, .. } | Self::Gif { src, .. } | Self::Video { src, .. } => Some(src),
            Self::Text { .. } => None,
        }
    }

    /// Whether the asset is a decodable still or animated image.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. } | Self::Gif { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSpec {
    pub entry: String,
    pub exit: String,
    pub easing: String,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    #[serde(rename = "delay")]
    pub delay_ms: u64,
}

impl Default for AnimationSpec {
    fn default() -> Self {
        Self {
            entry: "fade".to_string(),
            exit: "fade".to_string(),
            easing: "easeInOut".to_string(),
            duration_ms: 500,
            delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionSpec {
    Preset(String),
    Custom { x: String, y: String },
}

impl Default for PositionSpec {
    fn default() -> Self {
        Self::Preset("center".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeSpec {
    pub preset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<String>,
}

impl Default for SizeSpec {
    fn default() -> Self {
        Self {
            preset: "large".to_string(),
            max_width: None,
            max_height: None,
        }
    }
}

/// A joke as written in a deck's jokes file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JokeDef {
    pub id: String,
    #[serde(default)]
    pub hotkey: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "loop", default)]
    pub looping: Option<bool>,
    #[serde(default)]
    pub muted: Option<bool>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub animation: Option<AnimationDef>,
    #[serde(default)]
    pub position: Option<PositionDef>,
    #[serde(default)]
    pub custom_position: Option<CustomPosition>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub max_width: Option<String>,
    #[serde(default)]
    pub max_height: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimationDef {
    pub entry: Option<String>,
    pub exit: Option<String>,
    pub easing: Option<String>,
    pub duration: Option<u64>,
    pub delay: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PositionDef {
    Preset(String),
    Custom(CustomPosition),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomPosition {
    pub x: String,
    pub y: String,
}

/// Top-level shape of a `jokes.yaml` / `jokes.json` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JokeFile {
    #[serde(default)]
    pub jokes: Vec<JokeDef>,
}

fn validated(field: &str, joke_id: &str, value: Option<String>, valid: &[&str], default: &str) -> String {
    match value {
        Some(v) if valid.contains(&v.as_str()) => v,
        Some(v) => {
            tracing::warn!(
                "joke {joke_id}: invalid {field} {v:?}, using {default:?} (valid: {})",
                valid.join(", ")
            );
            default.to_string()
        }
        None => default.to_string(),
    }
}

impl Joke {
    /// Validate a joke definition. Returns `None` (after logging) when the
    /// definition cannot produce anything displayable.
    pub fn from_def(def: JokeDef, default_duration_ms: u64) -> Option<Self> {
        let id = def.id;
        if def.hotkey.chars().count() != 1 {
            tracing::warn!("joke {id}: hotkey must be a single character, got {:?}", def.hotkey);
            return None;
        }

        let content = match (def.kind.as_str(), def.src, def.text) {
            ("image", Some(src), _) => JokeContent::Image { src, alt: def.alt },
            ("gif", Some(src), _) => JokeContent::Gif { src, alt: def.alt },
            ("video", Some(src), _) => JokeContent::Video {
                src,
                looping: def.looping.unwrap_or(true),
                muted: def.muted.unwrap_or(true),
            },
            ("text", _, Some(text)) => JokeContent::Text { text },
            (kind, _, _) => {
                tracing::warn!("joke {id}: type {kind:?} is unknown or missing its content");
                return None;
            }
        };

        let defaults = AnimationSpec::default();
        let animation = match def.animation {
            None => defaults,
            Some(a) => AnimationSpec {
                entry: validated("entry animation", &id, a.entry, ENTRY_ANIMATIONS, &defaults.entry),
                exit: validated("exit animation", &id, a.exit, EXIT_ANIMATIONS, &defaults.exit),
                easing: validated("easing", &id, a.easing, EASINGS, &defaults.easing),
                duration_ms: a.duration.unwrap_or(defaults.duration_ms),
                delay_ms: a.delay.unwrap_or(defaults.delay_ms),
            },
        };

        let position = match (def.custom_position, def.position) {
            (Some(CustomPosition { x, y }), _) | (None, Some(PositionDef::Custom(CustomPosition { x, y }))) => {
                PositionSpec::Custom { x, y }
            }
            (None, Some(PositionDef::Preset(p))) => {
                PositionSpec::Preset(validated("position", &id, Some(p), POSITIONS, "center"))
            }
            (None, None) => PositionSpec::default(),
        };

        let size = SizeSpec {
            preset: validated("size", &id, def.size, SIZES, "large"),
            max_width: def.max_width,
            max_height: def.max_height,
        };

        Some(Self {
            id,
            hotkey: def.hotkey,
            content,
            display_duration_ms: def.duration.unwrap_or(default_duration_ms),
            animation,
            position,
            size,
        })
    }
}

/// The jokes configured for one deck.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JokeSet {
    pub jokes: Vec<Joke>,
}

impl JokeSet {
    pub fn new(jokes: Vec<Joke>) -> Self {
        let set = Self { jokes };
        for (i, joke) in set.jokes.iter().enumerate() {
            if set.jokes[..i].iter().any(|j| j.hotkey == joke.hotkey) {
                tracing::warn!(
                    "hotkey {:?} is bound more than once; joke {} takes precedence",
                    joke.hotkey,
                    joke.id
                );
            }
        }
        set
    }

    /// Validate every definition in a jokes file, dropping unusable entries.
    pub fn from_file(file: JokeFile, default_duration_ms: u64) -> Self {
        Self::new(
            file.jokes
                .into_iter()
                .filter_map(|def| Joke::from_def(def, default_duration_ms))
                .collect(),
        )
    }

    /// Look up the joke bound to `hotkey` (case-sensitive). When several share
    /// a hotkey the last one registered wins.
    pub fn find(&self, hotkey: &str) -> Option<&Joke> {
        self.jokes.iter().rev().find(|j| j.hotkey == hotkey)
    }

    pub fn is_empty(&self) -> bool {
        self.jokes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jokes.len()
    }
}
