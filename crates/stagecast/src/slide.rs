use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::markup::MarkupDocument;

/// How a slide's content is arranged on the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    #[default]
    Center,
    #[serde(rename = "split-40-60")]
    Split4060,
    #[serde(rename = "split-60-40")]
    Split6040,
    ThreeUp,
    Full,
}

impl Layout {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "center" => Some(Self::Center),
            "split-40-60" => Some(Self::Split4060),
            "split-60-40" => Some(Self::Split6040),
            "three-up" => Some(Self::ThreeUp),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Split4060 => "split-40-60",
            Self::Split6040 => "split-60-40",
            Self::ThreeUp => "three-up",
            Self::Full => "full",
        }
    }
}

/// Kind-specific slide content.
#[derive(Debug, Clone, PartialEq)]
pub enum SlideKind {
    Text {
        title_html: String,
        body_html: Option<String>,
    },
    Image {
        src: String,
        alt: Option<String>,
    },
    Video {
        youtube_id: String,
        start: u32,
    },
    Embed {
        src: String,
    },
    /// A compiled markup document. The block tree stays in-process; only its
    /// HTML flattening crosses a process boundary.
    Markup(Arc<MarkupDocument>),
    Error {
        message: String,
    },
    /// An authored type this build does not know how to render.
    Unknown {
        kind: String,
    },
}

impl SlideKind {
    /// The wire tag for this kind.
    pub fn tag(&self) -> &str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Video { .. } => "youtube",
            Self::Embed { .. } => "iframe",
            Self::Markup(_) => "mdx",
            Self::Error { .. } => "error",
            Self::Unknown { kind } => kind,
        }
    }
}

/// A renderable slide. Immutable once constructed; identity is `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub id: String,
    pub kind: SlideKind,
    pub layout: Layout,
    pub notes: String,
}

/// A slide as written in a deck file, before normalization.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSlide {
    pub id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// `{title, body}` HTML fragments for text slides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<TextHtml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TextHtml {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

impl RawSlide {
    /// True when the slide's content lives in a separate markup file.
    pub fn is_markup_file(&self) -> bool {
        self.src
            .as_deref()
            .is_some_and(|s| s.ends_with(".md") || s.ends_with(".mdx"))
    }
}

/// Resolves the source of markup-authored slides.
pub trait MarkupSource {
    /// Return the raw markup text for `src`, or a message describing why it
    /// could not be found.
    fn load(&self, slide_id: &str, src: &str) -> Result<String, String>;
}

impl Slide {
    /// A synthetic slide shown in place of content that failed to resolve.
    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: SlideKind::Error {
                message: message.into(),
            },
            layout: Layout::Center,
            notes: String::new(),
        }
    }

    pub fn markup(id: impl Into<String>, document: MarkupDocument, layout: Layout) -> Self {
        let notes = document.notes().unwrap_or_default().to_string();
        Self {
            id: id.into(),
            kind: SlideKind::Markup(Arc::new(document)),
            layout,
            notes,
        }
    }

    /// Normalize an authored slide definition.
    pub fn from_raw(raw: RawSlide, source: &dyn MarkupSource) -> Self {
        let layout = match raw.layout.as_deref() {
            None => Layout::Center,
            Some(name) => Layout::from_name(name).unwrap_or_else(|| {
                tracing::warn!("slide {}: unknown layout {name:?}, using center", raw.id);
                Layout::Center
            }),
        };

        if raw.is_markup_file() {
            let src = raw.src.as_deref().unwrap_or_default();
            return match source.load(&raw.id, src) {
                Ok(text) => {
                    let mut slide = Self::markup(raw.id, MarkupDocument::parse(&text), layout);
                    if let Some(notes) = raw.notes {
                        slide.notes = notes;
                    }
                    slide
                }
                Err(message) => {
                    tracing::error!("slide {}: {message}", raw.id);
                    Self::error(raw.id, message)
                }
            };
        }

        let kind_name = raw.kind.as_deref().unwrap_or("text");
        let missing = |field: &str| format!("{kind_name} slide {} is missing `{field}`", raw.id);
        let kind = match kind_name {
            "text" => {
                let (title_html, body_html) = match &raw.html {
                    Some(html) => (html.title.clone(), html.body.clone()),
                    None => (
                        raw.title.clone().unwrap_or_default(),
                        raw.body.clone(),
                    ),
                };
                SlideKind::Text {
                    title_html,
                    body_html,
                }
            }
            "image" => match raw.src.clone() {
                Some(src) => SlideKind::Image {
                    src,
                    alt: raw.alt.clone(),
                },
                None => SlideKind::Error {
                    message: missing("src"),
                },
            },
            "youtube" | "video" => match raw.youtube_id.clone() {
                Some(youtube_id) => SlideKind::Video {
                    youtube_id,
                    start: raw.start.unwrap_or(0),
                },
                None => SlideKind::Error {
                    message: missing("youtubeId"),
                },
            },
            "iframe" | "embed" => match raw.src.clone() {
                Some(src) => SlideKind::Embed { src },
                None => SlideKind::Error {
                    message: missing("src"),
                },
            },
            "mdx" | "markdown" | "md" => {
                let body = raw.body.clone().unwrap_or_default();
                SlideKind::Markup(Arc::new(MarkupDocument::parse(&body)))
            }
            "error" => SlideKind::Error {
                message: raw.body.clone().unwrap_or_default(),
            },
            other => {
                tracing::warn!("slide {}: unknown slide type {other:?}", raw.id);
                SlideKind::Unknown {
                    kind: other.to_string(),
                }
            }
        };

        Self {
            id: raw.id,
            kind,
            layout,
            notes: raw.notes.unwrap_or_default(),
        }
    }

    /// Title used by presenter chrome and the native renderer.
    pub fn title(&self) -> Option<&str> {
        match &self.kind {
            SlideKind::Text { title_html, .. } => Some(title_html.as_str()),
            SlideKind::Markup(doc) => doc.title(),
            SlideKind::Image { alt, .. } => alt.as_deref(),
            _ => None,
        }
    }

    /// Plain-data projection of this slide.
    ///
    /// With `flatten_markup`, markup documents are rendered to an HTML string so
    /// a surface without the markup pipeline can still show them.
    pub fn view(&self, flatten_markup: bool) -> SlideView {
        let mut view = SlideView {
            id: self.id.clone(),
            kind: self.kind.tag().to_string(),
            layout: self.layout,
            notes: self.notes.clone(),
            ..SlideView::default()
        };
        match &self.kind {
            SlideKind::Text {
                title_html,
                body_html,
            } => {
                view.title = Some(title_html.clone());
                view.html = Some(match body_html {
                    Some(body) => format!("<h1>{title_html}</h1>{body}"),
                    None => format!("<h1>{title_html}</h1>"),
                });
            }
            SlideKind::Image { src, alt } => {
                view.src = Some(src.clone());
                view.alt = alt.clone();
            }
            SlideKind::Video { youtube_id, start } => {
                view.youtube_id = Some(youtube_id.clone());
                view.start = Some(*start);
            }
            SlideKind::Embed { src } => view.src = Some(src.clone()),
            SlideKind::Markup(doc) => {
                view.title = doc.title().map(str::to_string);
                view.subtitle = doc.subtitle().map(str::to_string);
                view.frontmatter = Some(doc.frontmatter.clone());
                if view.notes.is_empty() {
                    view.notes = doc.notes().unwrap_or_default().to_string();
                }
                if flatten_markup {
                    view.html = Some(doc.to_html());
                }
            }
            SlideKind::Error { message } => view.error = Some(message.clone()),
            SlideKind::Unknown { kind } => {
                view.error = Some(format!("unsupported slide type: {kind}"));
            }
        }
        view
    }
}

/// The serializable projection of a [`Slide`] carried in sync messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub layout: Layout,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontmatter: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
