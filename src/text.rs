use crate::font::FontRegistry;
use crate::types::Pt;
use kuchiki::traits::TendrilSink;
use kuchiki::{NodeData, NodeRef};

const BLOCK_TAGS: &[&str] = &[
    "br", "p", "div", "li", "tr", "td", "th", "ul", "ol", "table", "h1", "h2", "h3", "h4", "h5",
    "h6",
];

/// Reduces editor HTML to the text a browser would show: markup parsed as
/// HTML, `script`/`style` bodies dropped, entities decoded, block boundaries
/// turned into spaces. A `<` that does not open a tag stays literal.
pub fn strip_markup(input: &str) -> String {
    if !input.contains(['<', '&']) {
        return input.replace('\u{a0}', " ");
    }
    let document = kuchiki::parse_html().one(input);
    let mut out = String::with_capacity(input.len());
    collect_text(&document, &mut out);
    out.replace('\u{a0}', " ")
}

fn collect_text(node: &NodeRef, out: &mut String) {
    for child in node.children() {
        match child.data() {
            NodeData::Text(text) => out.push_str(&text.borrow()),
            NodeData::Element(element) => {
                let name: &str = element.name.local.as_ref();
                if name == "script" || name == "style" {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push(' ');
                }
                collect_text(&child, out);
                if block {
                    out.push(' ');
                }
            }
            _ => collect_text(&child, out),
        }
    }
}

/// Collapses every whitespace run to one space and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Greedy line breaking at word boundaries. A word wider than `max_width` on
/// its own is broken between characters without a hyphen; a single glyph
/// wider than the line still gets a line of its own. Empty input yields no
/// lines.
pub fn wrap_text(
    fonts: &FontRegistry,
    font: &str,
    font_size: Pt,
    text: &str,
    max_width: Pt,
) -> Vec<String> {
    let measure = |line: &str| fonts.measure_text_width(font, font_size, line);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure(word) <= max_width {
            current = word.to_string();
            continue;
        }
        let mut chunk = String::new();
        for ch in word.chars() {
            let mut next = chunk.clone();
            next.push(ch);
            if !chunk.is_empty() && measure(&next) > max_width {
                lines.push(std::mem::take(&mut chunk));
                chunk.push(ch);
            } else {
                chunk = next;
            }
        }
        current = chunk;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::HELVETICA;

    fn wrap(text: &str, width: f32) -> Vec<String> {
        let fonts = FontRegistry::new();
        wrap_text(&fonts, HELVETICA, Pt::from_f32(10.0), text, Pt::from_f32(width))
    }

    #[test]
    fn strips_tags_and_decodes_entities() {
        assert_eq!(strip_markup("<b>Tom</b> &amp; Jerry"), "Tom & Jerry");
        assert_eq!(strip_markup("a&lt;b&gt;c"), "a<b>c");
        assert_eq!(strip_markup("x&#65;&#x42;y"), "xABy");
        assert_eq!(strip_markup("5 &unknown; 6"), "5 &unknown; 6");
    }

    #[test]
    fn block_tags_become_spaces() {
        let plain = strip_markup("<p>first</p><p>second<br/>third</p>");
        assert_eq!(collapse_whitespace(&plain), "first second third");
    }

    #[test]
    fn script_and_style_bodies_are_dropped() {
        let plain = strip_markup("a<script type=\"x\">alert(1)</script>b<STYLE>p{}</STYLE>c");
        assert_eq!(plain, "abc");
    }

    #[test]
    fn comparison_signs_stay_literal() {
        assert_eq!(strip_markup("x < y"), "x < y");
        assert_eq!(strip_markup("x < 5 and y > 3"), "x < 5 and y > 3");
        assert_eq!(
            strip_markup("<b>If</b> a <= b then 2 < 3 > 1"),
            "If a <= b then 2 < 3 > 1"
        );
    }

    #[test]
    fn non_breaking_spaces_become_spaces() {
        assert_eq!(strip_markup("10&nbsp;km"), "10 km");
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(wrap("", 100.0).is_empty());
        assert!(wrap("   \n\t ", 100.0).is_empty());
    }

    #[test]
    fn lines_respect_width() {
        let fonts = FontRegistry::new();
        let size = Pt::from_f32(10.0);
        let width = Pt::from_f32(80.0);
        let text = "The quick brown fox jumps over the lazy dog near the river bank";
        let lines = wrap_text(&fonts, HELVETICA, size, text, width);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(fonts.measure_text_width(HELVETICA, size, line) <= width);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn long_word_breaks_without_hyphen() {
        let lines = wrap("supercalifragilisticexpialidocious", 40.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| !line.ends_with('-')));
        assert_eq!(lines.concat(), "supercalifragilisticexpialidocious");
    }

    #[test]
    fn rewrapping_a_line_is_stable() {
        let text = "Which of the following rivers flows through the Deccan plateau region";
        for line in wrap(text, 90.0) {
            assert_eq!(wrap(&line, 90.0), vec![line.clone()]);
        }
    }

    #[test]
    fn glyph_wider_than_line_gets_its_own_line() {
        assert_eq!(wrap("WW", 5.0), vec!["W".to_string(), "W".to_string()]);
    }
}
