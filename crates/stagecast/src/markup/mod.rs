//! Markup-authored slides: frontmatter, a small markdown block model, and
//! flattening to an HTML string for surfaces that cannot compile markup.

pub mod splitter;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// CSS wrapper applied to every flattened document.
const PROSE_CLASS: &str = "prose prose-invert max-w-4xl mx-auto p-8";

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("italic pattern"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("link pattern"));
static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s+(.*)$").expect("ordered item pattern"));

/// A parsed markup document.
///
/// The block tree is what the native renderer paints; [`MarkupDocument::to_html`]
/// is the plain-data projection sent to audience surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupDocument {
    pub frontmatter: BTreeMap<String, String>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    List { ordered: bool, items: Vec<String> },
    Code { language: Option<String>, code: String },
    Quote(String),
    Rule,
}

impl MarkupDocument {
    /// Parse a document, extracting a leading `---` frontmatter block if present.
    pub fn parse(source: &str) -> Self {
        let (frontmatter, body) = split_frontmatter(source);
        Self {
            frontmatter,
            blocks: parse_blocks(body),
        }
    }

    /// Frontmatter title, falling back to the first heading.
    pub fn title(&self) -> Option<&str> {
        self.frontmatter.get("title").map(String::as_str).or_else(|| {
            self.blocks.iter().find_map(|b| match b {
                Block::Heading { text, .. } => Some(text.as_str()),
                _ => None,
            })
        })
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.frontmatter.get("subtitle").map(String::as_str)
    }

    pub fn notes(&self) -> Option<&str> {
        self.frontmatter.get("notes").map(String::as_str)
    }

    /// Render the block tree to a self-contained HTML string.
    pub fn to_html(&self) -> String {
        let mut html = format!("<div class=\"{PROSE_CLASS}\">");
        for block in &self.blocks {
            match block {
                Block::Heading { level, text } => {
                    html.push_str(&format!("<h{level}>{}</h{level}>", render_inline(text)));
                }
                Block::Paragraph(text) => {
                    html.push_str(&format!("<p>{}</p>", render_inline(text)));
                }
                Block::List { ordered, items } => {
                    let tag = if *ordered { "ol" } else { "ul" };
                    html.push_str(&format!("<{tag}>"));
                    for item in items {
                        html.push_str(&format!("<li>{}</li>", render_inline(item)));
                    }
                    html.push_str(&format!("</{tag}>"));
                }
                Block::Code { language, code } => match language {
                    Some(lang) => html.push_str(&format!(
                        "<pre><code class=\"language-{}\">{}</code></pre>",
                        escape_html(lang),
                        escape_html(code)
                    )),
                    None => html.push_str(&format!("<pre><code>{}</code></pre>", escape_html(code))),
                },
                Block::Quote(text) => {
                    html.push_str(&format!("<blockquote>{}</blockquote>", render_inline(text)));
                }
                Block::Rule => html.push_str("<hr>"),
            }
        }
        html.push_str("</div>");
        html
    }

    /// Text content with markup removed, one block per line.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Heading { text, .. } | Block::Paragraph(text) | Block::Quote(text) => {
                    lines.push(strip_inline(text));
                }
                Block::List { ordered, items } => {
                    for (i, item) in items.iter().enumerate() {
                        let marker = if *ordered {
                            format!("{}.", i + 1)
                        } else {
                            "\u{2022}".to_string()
                        };
                        lines.push(format!("{marker} {}", strip_inline(item)));
                    }
                }
                Block::Code { code, .. } => lines.push(code.clone()),
                Block::Rule => {}
            }
        }
        lines.join("\n")
    }
}

/// Split a leading YAML frontmatter block from the body.
///
/// Only scalar values are kept; nested structures are dropped since they
/// cannot be shown as slide metadata.
pub fn split_frontmatter(source: &str) -> (BTreeMap<String, String>, &str) {
    let mut meta = BTreeMap::new();
    let trimmed = source.trim_start_matches('\u{feff}');
    let Some(rest) = trimmed
        .strip_prefix("---\n")
        .or_else(|| trimmed.strip_prefix("---\r\n"))
    else {
        return (meta, trimmed);
    };
    let Some(end) = find_closing_fence(rest) else {
        return (meta, trimmed);
    };
    let yaml = &rest[..end.start];
    let body = &rest[end.end..];

    match serde_yaml::from_str::<serde_yaml::Mapping>(yaml) {
        Ok(mapping) => {
            for (key, value) in mapping {
                let Some(key) = key.as_str() else { continue };
                let value = match value {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    _ => continue,
                };
                meta.insert(key.to_string(), value);
            }
        }
        Err(e) => tracing::warn!("ignoring malformed frontmatter: {e}"),
    }
    (meta, body)
}

struct Fence {
    start: usize,
    end: usize,
}

fn find_closing_fence(rest: &str) -> Option<Fence> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some(Fence {
                start: offset,
                end: offset + line.len(),
            });
        }
        offset += line.len();
    }
    None
}

fn parse_blocks(body: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut quote: Vec<&str> = Vec::new();
    let mut list: Option<(bool, Vec<String>)> = None;
    let mut lines = body.lines();

    fn flush(
        blocks: &mut Vec<Block>,
        paragraph: &mut Vec<&str>,
        quote: &mut Vec<&str>,
        list: &mut Option<(bool, Vec<String>)>,
    ) {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
        if !quote.is_empty() {
            blocks.push(Block::Quote(quote.join(" ")));
            quote.clear();
        }
        if let Some((ordered, items)) = list.take() {
            blocks.push(Block::List { ordered, items });
        }
    }

    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if let Some(fence) = trimmed.strip_prefix("```") {
            flush(&mut blocks, &mut paragraph, &mut quote, &mut list);
            let language = Some(fence.trim().to_string()).filter(|l| !l.is_empty());
            let mut code = Vec::new();
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with("```") {
                    break;
                }
                code.push(inner);
            }
            blocks.push(Block::Code {
                language,
                code: code.join("\n"),
            });
            continue;
        }

        if trimmed.is_empty() {
            flush(&mut blocks, &mut paragraph, &mut quote, &mut list);
            continue;
        }

        // Directive lines are consumed by the splitter
        if trimmed.starts_with('@') && trimmed.contains(':') {
            continue;
        }

        let hashes = trimmed.chars().take_while(|&c| c == '#').count();
        if (1..=6).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
            flush(&mut blocks, &mut paragraph, &mut quote, &mut list);
            blocks.push(Block::Heading {
                level: hashes as u8,
                text: trimmed[hashes..].trim().to_string(),
            });
            continue;
        }

        if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-') {
            flush(&mut blocks, &mut paragraph, &mut quote, &mut list);
            blocks.push(Block::Rule);
            continue;
        }

        if let Some(text) = trimmed.strip_prefix('>') {
            if !paragraph.is_empty() || list.is_some() {
                flush(&mut blocks, &mut paragraph, &mut quote, &mut list);
            }
            quote.push(text.trim());
            continue;
        }

        let bullet = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
            .or_else(|| trimmed.strip_prefix("+ "));
        let item = match bullet {
            Some(text) => Some((false, text.to_string())),
            None => ORDERED_ITEM
                .captures(trimmed)
                .map(|caps| (true, caps[1].to_string())),
        };
        if let Some((ordered, text)) = item {
            if !paragraph.is_empty() || !quote.is_empty() {
                flush(&mut blocks, &mut paragraph, &mut quote, &mut list);
            }
            match list.as_mut() {
                Some((kind, items)) if *kind == ordered => items.push(text),
                _ => {
                    flush(&mut blocks, &mut paragraph, &mut quote, &mut list);
                    list = Some((ordered, vec![text]));
                }
            }
            continue;
        }

        if list.is_some() || !quote.is_empty() {
            flush(&mut blocks, &mut paragraph, &mut quote, &mut list);
        }
        paragraph.push(trimmed);
    }
    flush(&mut blocks, &mut paragraph, &mut quote, &mut list);
    blocks
}

/// Escape the characters that are significant in HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inline markdown to HTML. Code spans are emitted verbatim (escaped) and
/// never receive emphasis.
fn render_inline(text: &str) -> String {
    let mut out = String::new();
    for (i, segment) in text.split('`').enumerate() {
        if i % 2 == 1 {
            out.push_str(&format!("<code>{}</code>", escape_html(segment)));
            continue;
        }
        let escaped = escape_html(segment);
        let linked = LINK.replace_all(&escaped, "<a href=\"$2\">$1</a>");
        let bold = BOLD.replace_all(&linked, "<strong>$1</strong>");
        let italic = ITALIC.replace_all(&bold, "<em>$1</em>");
        out.push_str(&italic);
    }
    out
}

/// Inline markup removed, leaving the visible text.
pub fn strip_inline(text: &str) -> String {
    let linked = LINK.replace_all(text, "$1");
    let bold = BOLD.replace_all(&linked, "$1");
    let italic = ITALIC.replace_all(&bold, "$1");
    italic.replace('`', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontmatter_extracted() {
        let doc = MarkupDocument::parse(
            "---\ntitle: Welcome\nnotes: \"Say hello\"\norder: 3\n---\n# Heading\n\nBody",
        );
        assert_eq!(doc.title(), Some("Welcome"));
        assert_eq!(doc.notes(), Some("Say hello"));
        assert_eq!(doc.frontmatter.get("order").map(String::as_str), Some("3"));
        assert_eq!(doc.blocks.len(), 2);
    }

    #[test]
    fn test_title_falls_back_to_heading() {
        let doc = MarkupDocument::parse("## Agenda\n\n- one\n- two");
        assert_eq!(doc.title(), Some("Agenda"));
        assert_eq!(
            doc.blocks[1],
            Block::List {
                ordered: false,
                items: vec!["one".to_string(), "two".to_string()]
            }
        );
    }

    #[test]
    fn test_unterminated_frontmatter_is_body() {
        let doc = MarkupDocument::parse("---\ntitle: nope\n# Heading");
        assert!(doc.frontmatter.is_empty());
    }

    #[test]
    fn test_to_html_blocks() {
        let doc = MarkupDocument::parse(
            "# Hello **world**\n\nSome *emphasis* and `a<b`.\n\n1. first\n2. second\n\n```rust\nfn main() {}\n```",
        );
        let html = doc.to_html();
        assert!(html.starts_with("<div class=\"prose"));
        assert!(html.contains("<h1>Hello <strong>world</strong></h1>"));
        assert!(html.contains("<em>emphasis</em>"));
        assert!(html.contains("<code>a&lt;b</code>"));
        assert!(html.contains("<ol><li>first</li><li>second</li></ol>"));
        assert!(html.contains("<pre><code class=\"language-rust\">fn main() {}</code></pre>"));
    }

    #[test]
    fn test_html_is_escaped() {
        let doc = MarkupDocument::parse("<script>alert(1)</script>");
        assert!(doc.to_html().contains("&lt;script&gt;"));
    }

    #[test]
    fn test_links_and_quotes() {
        let doc = MarkupDocument::parse("> quoted [site](https://example.com)");
        assert_eq!(
            doc.to_html(),
            "<div class=\"prose prose-invert max-w-4xl mx-auto p-8\"><blockquote>quoted <a href=\"https://example.com\">site</a></blockquote></div>"
        );
    }

    #[test]
    fn test_plain_text() {
        let doc = MarkupDocument::parse("# Title\n\n- **bold** item\n- `code`");
        assert_eq!(doc.plain_text(), "Title\n\u{2022} bold item\n\u{2022} code");
    }
}
