//! Minimal HTML→text conversion for JD Resolver (spec §4.2, step 3).
//!
//! Deliberately not a full HTML parser: the JD text this service needs is a
//! flat paragraph stream, not a DOM. A fixed tag/entity table is enough and
//! keeps the dependency footprint to what `regex` already provides.

use regex::Regex;
use std::sync::OnceLock;

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
];

fn script_style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</\1>").unwrap()
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<[^>]+>").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").unwrap())
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

/// Converts raw HTML into a plain-text block stream: strips `<script>`/`<style>`,
/// turns block-level tags into newlines, decodes a fixed small entity set.
pub fn html_to_text(html: &str) -> String {
    let without_scripts = script_style_re().replace_all(html, "");

    let mut marked = without_scripts.into_owned();
    for tag in BLOCK_TAGS {
        let open = format!("<{tag}");
        let close_tag = format!("</{tag}>");
        marked = replace_tag_prefix_with(&marked, &open, "\n");
        marked = marked.replace(&close_tag, "\n");
    }

    let stripped = tag_re().replace_all(&marked, " ");
    let decoded = decode_entities(&stripped);

    let collapsed = whitespace_re().replace_all(&decoded, " ");
    let collapsed = blank_lines_re().replace_all(&collapsed, "\n\n");

    collapsed
        .lines()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Replaces every occurrence of a tag open-prefix (e.g. `<p`) with `replacement`,
/// leaving the rest of the tag (attributes, `/>`) intact for the generic tag
/// stripper to remove afterward.
fn replace_tag_prefix_with(input: &str, prefix: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = find_tag_open(rest, prefix) {
        out.push_str(&rest[..idx]);
        out.push_str(replacement);
        out.push_str(&rest[idx..idx + prefix.len()]);
        rest = &rest[idx + prefix.len()..];
    }
    out.push_str(rest);
    out
}

fn find_tag_open(haystack: &str, prefix: &str) -> Option<usize> {
    let lower = haystack.to_lowercase();
    let lower_prefix = prefix.to_lowercase();
    let mut start = 0;
    while let Some(pos) = lower[start..].find(&lower_prefix) {
        let abs = start + pos;
        let next_char = haystack[abs + prefix.len()..].chars().next();
        let boundary = next_char.map(|c| !c.is_alphanumeric()).unwrap_or(true);
        if boundary {
            return Some(abs);
        }
        start = abs + prefix.len();
    }
    None
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&rsquo;", "'")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_and_style_blocks() {
        let html = "<html><head><style>body{color:red}</style></head><body>\
            <script>trackPageView();</script><p>Hello</p></body></html>";
        let text = html_to_text(html);
        assert!(!text.contains("trackPageView"));
        assert!(!text.contains("color:red"));
        assert!(text.contains("Hello"));
    }

    #[test]
    fn block_tags_become_newlines() {
        let html = "<div>Role Overview</div><p>Key Responsibilities:</p><li>Ship things</li>";
        let text = html_to_text(html);
        assert!(text.contains("Role Overview"));
        assert!(text.lines().count() >= 2);
    }

    #[test]
    fn decodes_fixed_entity_set() {
        let html = "<p>Sales &amp; Marketing &mdash; 3&ndash;5 years</p>";
        let text = html_to_text(html);
        assert_eq!(text, "Sales & Marketing - 3-5 years");
    }
}
