//! Text normalization for feed descriptions and extracted page content

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n)+").expect("valid blank line pattern"));

/// Elements whose contents are never visible text
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Strip markup, collapse runs of blank lines into a single line break and trim.
/// Script, style and similar elements are dropped together with their contents.
pub fn clean_text(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let text: String = fragment
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
            });
            (!hidden).then_some(&**text)
        })
        .collect();
    let text = text.replace("\r\n", "\n");
    BLANK_LINES.replace_all(&text, "\n").trim().to_string()
}

/// Length in Unicode scalar values rather than bytes
pub fn logical_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markup() {
        let cleaned = clean_text("<p>Hello <b>world</b></p><br/><a href=\"x\">link</a>");
        assert_eq!(cleaned, "Hello worldlink");
    }

    #[test]
    fn test_drops_script_and_style_contents() {
        let cleaned = clean_text(
            "<style>p{color:red}</style><script>track('x');</script><p>Real teaser</p>",
        );
        assert_eq!(cleaned, "Real teaser");
    }

    #[test]
    fn test_drops_noscript_nested_in_content() {
        let cleaned = clean_text(
            "<div>Before <noscript><img src=\"pixel\">Enable JS</noscript>after</div>",
        );
        assert_eq!(cleaned, "Before after");
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(clean_text("Fish &amp; chips"), "Fish & chips");
    }

    #[test]
    fn test_collapses_blank_lines() {
        assert_eq!(clean_text("first\n\n\n\nsecond\n \nthird"), "first\nsecond\nthird");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(clean_text("  \n padded text \n\n "), "padded text");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(clean_text("no markup here"), "no markup here");
    }

    #[test]
    fn test_logical_len_counts_chars() {
        let cyrillic = "привет";
        assert_eq!(cyrillic.len(), 12);
        assert_eq!(logical_len(cyrillic), 6);
    }
}
