/// One slide cut out of a multi-slide markdown file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSection {
    /// `@key: value` directive lines found in the section.
    pub directives: Vec<(String, String)>,
    /// The section body with directive lines removed.
    pub body: String,
}

impl RawSection {
    pub fn directive(&self, name: &str) -> Option<&str> {
        self.directives
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Split a markdown body (after frontmatter extraction) into slide sections.
///
/// A new section starts at:
/// 1. `---` with blank lines on both sides
/// 2. three or more consecutive blank lines
/// 3. a `# ` heading once the current section already has content
///
/// Lines inside fenced code blocks never break a section.
pub fn split(body: &str) -> Vec<RawSection> {
    let body = body.replace("\r\n", "\n");
    let lines: Vec<&str> = body.split('\n').collect();

    let mut sections = Vec::new();
    let mut current = Section::default();
    let mut blank_run = 0;
    let mut fence: Option<(char, usize)> = None;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if let Some((ch, len)) = fence {
            current.push(line);
            let closing = trimmed.chars().take_while(|&c| c == ch).count();
            if closing >= len && trimmed.chars().skip(closing).all(char::is_whitespace) {
                fence = None;
            }
            continue;
        }

        if trimmed.is_empty() {
            blank_run += 1;
            if blank_run == 3 {
                current.finish_into(&mut sections);
            } else if blank_run < 3 {
                current.push(line);
            }
            continue;
        }
        let after_blank = blank_run > 0 || i == 0;
        blank_run = 0;

        if is_dash_separator(trimmed) {
            let next_blank = lines.get(i + 1).is_none_or(|l| l.trim().is_empty());
            if after_blank && next_blank {
                current.finish_into(&mut sections);
                continue;
            }
        }

        if let Some((name, value)) = parse_directive(trimmed) {
            current.directives.push((name, value));
            current.directives_since_content += 1;
            continue;
        }

        if line.starts_with("# ") && current.has_content {
            // Directives written just above the heading belong to the new section
            let carried = current.trailing_directives();
            current.finish_into(&mut sections);
            current.directives = carried;
        }

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            let ch = trimmed.chars().next().unwrap_or('`');
            fence = Some((ch, trimmed.chars().take_while(|&c| c == ch).count()));
        }

        current.push(line);
        current.has_content = true;
        current.directives_since_content = 0;
    }
    current.finish_into(&mut sections);
    sections
}

#[derive(Default)]
struct Section {
    lines: Vec<String>,
    directives: Vec<(String, String)>,
    has_content: bool,
    /// Directives seen after the last content line.
    directives_since_content: usize,
}

impl Section {
    fn push(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn trailing_directives(&mut self) -> Vec<(String, String)> {
        let keep = self.directives.len() - self.directives_since_content.min(self.directives.len());
        self.directives.split_off(keep)
    }

    fn finish_into(&mut self, sections: &mut Vec<RawSection>) {
        let taken = std::mem::take(self);
        let body = taken.lines.join("\n").trim().to_string();
        if body.is_empty() && taken.directives.is_empty() {
            return;
        }
        sections.push(RawSection {
            directives: taken.directives,
            body,
        });
    }
}

fn is_dash_separator(line: &str) -> bool {
    line.len() >= 3 && line.chars().all(|c| c == '-')
}

fn parse_directive(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix('@')?;
    let (name, value) = rest.split_once(':')?;
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bodies(sections: &[RawSection]) -> Vec<&str> {
        sections.iter().map(|s| s.body.as_str()).collect()
    }

    #[test]
    fn test_blank_line_split() {
        let slides = split("Slide one\n\n\n\nSlide two");
        assert_eq!(bodies(&slides), vec!["Slide one", "Slide two"]);
    }

    #[test]
    fn test_dash_separator() {
        let slides = split("Slide one\n\n---\n\nSlide two");
        assert_eq!(bodies(&slides), vec!["Slide one", "Slide two"]);
    }

    #[test]
    fn test_heading_inference() {
        let slides = split("# First\n\nContent\n\n# Second\n\nMore content");
        assert_eq!(slides.len(), 2);
        assert!(slides[0].body.starts_with("# First"));
        assert!(slides[1].body.starts_with("# Second"));
    }

    #[test]
    fn test_h2_no_split() {
        assert_eq!(split("# Title\n\n## Subtitle\n\nContent").len(), 1);
    }

    #[test]
    fn test_combined_separators_make_one_break() {
        assert_eq!(split("Slide one\n\n\n\n---\n\n\n\nSlide two").len(), 2);
    }

    #[test]
    fn test_directives_collected() {
        let slides = split("@notes: remember the demo\n# Title\n\nBody");
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].directive("notes"), Some("remember the demo"));
        assert!(!slides[0].body.contains("@notes"));
    }

    #[test]
    fn test_directive_before_heading_moves_to_next_slide() {
        let slides = split("# Title\n\nSubtitle\n\n@layout: full\n# Second Slide\n\nContent");
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].directive("layout"), None);
        assert_eq!(slides[1].directive("layout"), Some("full"));
    }

    #[test]
    fn test_heading_in_code_block_no_split() {
        let slides = split("# Title\n\n```python\n# this is a comment\nprint('hi')\n```");
        assert_eq!(slides.len(), 1);
    }
}
