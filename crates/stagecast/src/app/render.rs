use std::collections::HashMap;
use std::sync::LazyLock;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Vec2};
use regex::Regex;

use crate::deck::CameraOverlayConfig;
use crate::joke::{Joke, JokeContent, PositionSpec, Preloader};
use crate::markup::{Block, strip_inline};
use crate::slide::{Layout, Slide, SlideKind, SlideView};
use crate::theme::Theme;

static HTML_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(h[1-6]|p|li|blockquote|pre)\b[^>]*>(.*?)</(?:h[1-6]|p|li|blockquote|pre)>")
        .expect("html block pattern")
});
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern"));

/// One painted line of slide text.
#[derive(Debug, Clone, PartialEq)]
pub enum TextLine {
    Heading(String),
    Body(String),
    Error(String),
}

pub fn compute_scale(rect: Rect) -> f32 {
    let ref_w = 1920.0;
    let ref_h = 1080.0;
    (rect.width() / ref_w).min(rect.height() / ref_h)
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn strip_tags(html: &str) -> String {
    unescape(HTML_TAG.replace_all(html, "").trim())
}

/// Reduce an HTML fragment to paintable lines.
pub fn html_lines(html: &str) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = HTML_BLOCK
        .captures_iter(html)
        .map(|cap| {
            let text = strip_tags(&cap[2]);
            match &cap[1] {
                tag if tag.starts_with('h') => TextLine::Heading(text),
                "li" => TextLine::Body(format!("\u{2022} {text}")),
                _ => TextLine::Body(text),
            }
        })
        .filter(|line| !matches!(line, TextLine::Heading(t) | TextLine::Body(t) if t.is_empty()))
        .collect();
    if lines.is_empty() {
        let text = strip_tags(html);
        if !text.is_empty() {
            lines.push(TextLine::Body(text));
        }
    }
    lines
}

pub fn slide_lines(slide: &Slide) -> Vec<TextLine> {
    match &slide.kind {
        SlideKind::Text {
            title_html,
            body_html,
        } => {
            let mut lines = vec![TextLine::Heading(strip_tags(title_html))];
            if let Some(body) = body_html {
                lines.extend(html_lines(body));
            }
            lines
        }
        SlideKind::Markup(doc) => {
            let mut lines = Vec::new();
            for block in &doc.blocks {
                match block {
                    Block::Heading { text, .. } => lines.push(TextLine::Heading(strip_inline(text))),
                    Block::Paragraph(text) | Block::Quote(text) => {
                        lines.push(TextLine::Body(strip_inline(text)))
                    }
                    Block::List { ordered, items } => {
                        for (i, item) in items.iter().enumerate() {
                            let marker = if *ordered {
                                format!("{}.", i + 1)
                            } else {
                                "\u{2022}".to_string()
                            };
                            lines.push(TextLine::Body(format!("{marker} {}", strip_inline(item))));
                        }
                    }
                    Block::Code { code, .. } => lines.push(TextLine::Body(code.clone())),
                    Block::Rule => {}
                }
            }
            if lines.is_empty() {
                if let Some(title) = doc.title() {
                    lines.push(TextLine::Heading(title.to_string()));
                }
            }
            lines
        }
        SlideKind::Image { src, alt } => media_lines("Image", alt.as_deref().unwrap_or(src)),
        SlideKind::Video { youtube_id, start } => {
            media_lines("YouTube", &format!("{youtube_id} @ {start}s"))
        }
        SlideKind::Embed { src } => media_lines("Embedded page", src),
        SlideKind::Error { message } => vec![TextLine::Error(message.clone())],
        SlideKind::Unknown { kind } => vec![TextLine::Error(format!("unsupported slide type: {kind}"))],
    }
}

pub fn view_lines(view: &SlideView) -> Vec<TextLine> {
    match view.kind.as_str() {
        "text" | "mdx" => match &view.html {
            Some(html) => html_lines(html),
            None => view
                .title
                .iter()
                .map(|t| TextLine::Heading(t.clone()))
                .chain(view.subtitle.iter().map(|s| TextLine::Body(s.clone())))
                .collect(),
        },
        "image" => media_lines(
            "Image",
            view.alt.as_deref().or(view.src.as_deref()).unwrap_or_default(),
        ),
        "youtube" => media_lines("YouTube", view.youtube_id.as_deref().unwrap_or_default()),
        "iframe" => media_lines("Embedded page", view.src.as_deref().unwrap_or_default()),
        other => vec![TextLine::Error(
            view.error
                .clone()
                .unwrap_or_else(|| format!("unsupported slide type: {other}")),
        )],
    }
}

fn media_lines(label: &str, detail: &str) -> Vec<TextLine> {
    vec![
        TextLine::Heading(label.to_string()),
        TextLine::Body(detail.to_string()),
    ]
}

/// Paint slide lines into `rect`.
pub fn draw_lines(
    painter: &egui::Painter,
    lines: &[TextLine],
    layout: Layout,
    theme: &Theme,
    rect: Rect,
    scale: f32,
    opacity: f32,
) {
    let margin = if layout == Layout::Full { 0.04 } else { 0.1 };
    let inner = rect.shrink2(Vec2::new(rect.width() * margin, rect.height() * margin));
    let wrap = match layout {
        Layout::Split4060 | Layout::Split6040 => inner.width() * 0.6,
        _ => inner.width(),
    };

    let galleys: Vec<_> = lines
        .iter()
        .map(|line| {
            let (text, size, color) = match line {
                TextLine::Heading(t) => (t, theme.title_size, theme.heading_color),
                TextLine::Body(t) => (t, theme.body_size, theme.foreground),
                TextLine::Error(t) => (t, theme.body_size, theme.error),
            };
            painter.layout(
                text.clone(),
                FontId::proportional(size * scale.max(0.2)),
                Theme::with_opacity(color, opacity),
                wrap,
            )
        })
        .collect();

    let gap = 16.0 * scale;
    let total: f32 = galleys.iter().map(|g| g.rect.height() + gap).sum();
    let mut y = match layout {
        Layout::Center => inner.center().y - total / 2.0,
        _ => inner.top(),
    };
    for galley in galleys {
        let x = match layout {
            Layout::Center => inner.center().x - galley.rect.width() / 2.0,
            Layout::Split6040 => inner.right() - wrap,
            _ => inner.left(),
        };
        let height = galley.rect.height();
        painter.galley(Pos2::new(x, y), galley, theme.foreground);
        y += height + gap;
    }
}

/// Per-frame look of a joke during its entry animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryFrame {
    pub opacity: f32,
    pub scale: f32,
    /// Offset as a fraction of the surface size.
    pub offset: Vec2,
}

pub fn ease(easing: &str, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    match easing {
        "linear" => t,
        "easeIn" => t * t,
        "easeOut" => 1.0 - (1.0 - t) * (1.0 - t),
        "spring" => {
            let u = t - 1.0;
            1.0 + 2.70158 * u * u * u + 1.70158 * u * u
        }
        "anticipate" => 2.70158 * t * t * t - 1.70158 * t * t,
        "bounce" => {
            let (n, d) = (7.5625, 2.75);
            if t < 1.0 / d {
                n * t * t
            } else if t < 2.0 / d {
                let u = t - 1.5 / d;
                n * u * u + 0.75
            } else if t < 2.5 / d {
                let u = t - 2.25 / d;
                n * u * u + 0.9375
            } else {
                let u = t - 2.625 / d;
                n * u * u + 0.984375
            }
        }
        _ => t * t * (3.0 - 2.0 * t),
    }
}

pub fn entry_frame(joke: &Joke, elapsed_ms: f32) -> EntryFrame {
    let anim = &joke.animation;
    let delay = anim.delay_ms as f32;
    if elapsed_ms < delay {
        return EntryFrame {
            opacity: 0.0,
            scale: 1.0,
            offset: Vec2::ZERO,
        };
    }
    let t = if anim.duration_ms == 0 {
        1.0
    } else {
        (elapsed_ms - delay) / anim.duration_ms as f32
    };
    let p = ease(&anim.easing, t);
    let rest = 1.0 - p;
    let mut frame = EntryFrame {
        opacity: 1.0,
        scale: 1.0,
        offset: Vec2::ZERO,
    };
    match anim.entry.as_str() {
        "slideInLeft" => frame.offset.x = -rest,
        "slideInRight" => frame.offset.x = rest,
        "slideInTop" => frame.offset.y = -rest,
        "slideInBottom" => frame.offset.y = rest,
        "shake" | "shakeScale" => {
            frame.offset.x = (t.clamp(0.0, 1.0) * std::f32::consts::PI * 6.0).sin() * 0.02 * rest;
            if anim.entry == "shakeScale" {
                frame.scale = p;
            }
        }
        "fade" => frame.opacity = p.clamp(0.0, 1.0),
        _ => frame.scale = p,
    }
    frame
}

fn parse_length(value: &str, extent: f32, scale: f32) -> Option<f32> {
    let value = value.trim();
    if let Some(pct) = value.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(|p| p / 100.0 * extent);
    }
    let px = value.strip_suffix("px").unwrap_or(value);
    px.trim().parse::<f32>().ok().map(|p| p * scale)
}

/// Where the joke box lands inside `surface`.
pub fn joke_rect(joke: &Joke, surface: Rect, content: Vec2, scale: f32) -> Rect {
    let max_w = joke
        .size
        .max_width
        .as_deref()
        .and_then(|v| parse_length(v, surface.width(), scale))
        .unwrap_or_else(|| {
            surface.width()
                * match joke.size.preset.as_str() {
                    "small" => 0.25,
                    "medium" => 0.45,
                    "fullscreen" => 1.0,
                    _ => 0.7,
                }
        });
    let max_h = joke
        .size
        .max_height
        .as_deref()
        .and_then(|v| parse_length(v, surface.height(), scale))
        .unwrap_or(if joke.size.preset == "fullscreen" {
            surface.height()
        } else {
            surface.height() * 0.8
        });
    let fit = (max_w / content.x.max(1.0)).min(max_h / content.y.max(1.0));
    let size = content * fit;

    match &joke.position {
        PositionSpec::Custom { x, y } => {
            let cx = parse_length(x, surface.width(), scale).unwrap_or(surface.width() / 2.0);
            let cy = parse_length(y, surface.height(), scale).unwrap_or(surface.height() / 2.0);
            Rect::from_center_size(surface.min + Vec2::new(cx, cy), size)
        }
        PositionSpec::Preset(name) => {
            let align = match name.as_str() {
                "top-left" => Align2::LEFT_TOP,
                "top-right" => Align2::RIGHT_TOP,
                "bottom-left" => Align2::LEFT_BOTTOM,
                "bottom-right" => Align2::RIGHT_BOTTOM,
                "top" => Align2::CENTER_TOP,
                "bottom" => Align2::CENTER_BOTTOM,
                "left" => Align2::LEFT_CENTER,
                "right" => Align2::RIGHT_CENTER,
                _ => Align2::CENTER_CENTER,
            };
            align.align_size_within_rect(size, surface.shrink(24.0 * scale))
        }
    }
}

/// Upload a preloaded image once and reuse the texture afterwards.
pub fn texture_for(
    cache: &mut HashMap<String, egui::TextureHandle>,
    preloader: &Preloader,
    ctx: &egui::Context,
    src: &str,
) -> Option<egui::TextureHandle> {
    if let Some(texture) = cache.get(src) {
        return Some(texture.clone());
    }
    let image = preloader.get(src)?.image?;
    let size = [image.width() as usize, image.height() as usize];
    let color = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
    let texture = ctx.load_texture(src, color, egui::TextureOptions::LINEAR);
    cache.insert(src.to_string(), texture.clone());
    Some(texture)
}

/// Paint the active joke. Images use `texture` once their bytes are decoded.
pub fn draw_joke(
    painter: &egui::Painter,
    joke: &Joke,
    elapsed_ms: f32,
    texture: Option<&egui::TextureHandle>,
    theme: &Theme,
    surface: Rect,
    scale: f32,
) {
    let frame = entry_frame(joke, elapsed_ms);
    if frame.opacity <= 0.0 {
        return;
    }
    let offset = Vec2::new(frame.offset.x * surface.width(), frame.offset.y * surface.height());

    match (&joke.content, texture) {
        (JokeContent::Image { .. } | JokeContent::Gif { .. }, Some(texture)) => {
            let rect = joke_rect(joke, surface, texture.size_vec2(), scale);
            let rect = Rect::from_center_size(rect.center() + offset, rect.size() * frame.scale);
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            painter.image(
                texture.id(),
                rect,
                uv,
                Theme::with_opacity(Color32::WHITE, frame.opacity),
            );
        }
        (content, _) => {
            let text = match content {
                JokeContent::Text { text } => text.clone(),
                JokeContent::Video { src, .. } => format!("\u{25B6} {src}"),
                JokeContent::Image { src, alt } | JokeContent::Gif { src, alt } => {
                    alt.clone().unwrap_or_else(|| src.clone())
                }
            };
            let galley = painter.layout(
                text,
                FontId::proportional(theme.title_size * 1.5 * scale.max(0.2) * frame.scale.max(0.05)),
                Theme::with_opacity(theme.accent, frame.opacity),
                surface.width() * 0.8,
            );
            let rect = joke_rect(joke, surface, galley.rect.size(), scale);
            let rect = Rect::from_center_size(rect.center() + offset, galley.rect.size());
            painter.rect_filled(
                rect.expand(16.0 * scale),
                12.0 * scale,
                Theme::with_opacity(theme.joke_backdrop, frame.opacity * 0.6),
            );
            painter.galley(rect.min, galley, theme.accent);
        }
    }
}

/// Paint the camera bubble placeholder where the overlay is configured.
pub fn draw_camera_overlay(
    painter: &egui::Painter,
    config: &CameraOverlayConfig,
    theme: &Theme,
    surface: Rect,
    scale: f32,
) {
    let diameter = match config.size.as_str() {
        "small" => 120.0,
        "large" => 300.0,
        _ => 200.0,
    } * scale.max(0.3);
    let align = match config.position.as_str() {
        "top-left" => Align2::LEFT_TOP,
        "top-right" => Align2::RIGHT_TOP,
        "bottom-left" => Align2::LEFT_BOTTOM,
        _ => Align2::RIGHT_BOTTOM,
    };
    let rect = align.align_size_within_rect(Vec2::splat(diameter), surface.shrink(32.0 * scale));
    let stroke = egui::Stroke::new(4.0 * scale.max(0.3), theme.camera_ring);
    if config.shape == "circle" {
        painter.circle_filled(rect.center(), diameter / 2.0, theme.panel_background);
        painter.circle_stroke(rect.center(), diameter / 2.0, stroke);
    } else {
        painter.rect_filled(rect, 12.0 * scale, theme.panel_background);
        painter.rect_stroke(rect, 12.0 * scale, stroke, egui::StrokeKind::Outside);
    }
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        "camera",
        FontId::proportional(theme.status_size),
        theme.muted,
    );
}
