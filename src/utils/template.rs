//! Minimal placeholder templating for reply messages.
//!
//! Replaces `{{field}}` placeholders with HTML-escaped values. This is
//! deliberately not a template engine: no conditionals, no loops, just
//! substitution for the handful of reply formats the bot sends.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
});

/// HTML template for one devread article.
pub const ARTICLE_TEMPLATE: &str = "<a href=\"{{url}}\"><b>{{title}}</b></a>\n{{body}}";

/// Render `template`, replacing each `{{field}}` with the HTML-escaped
/// value from `fields`. Placeholders without a value are left intact.
pub fn render_template(template: &str, fields: &HashMap<&str, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures| {
            match fields.get(&caps[1]) {
                Some(value) => escape_html(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Escape the characters Telegram's HTML parse mode treats specially.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_substitution() {
        let out = render_template("Hi {{name}}!", &fields(&[("name", "Ada")]));
        assert_eq!(out, "Hi Ada!");
    }

    #[test]
    fn test_values_are_escaped() {
        let out = render_template("{{title}}", &fields(&[("title", "a <b> & \"c\"")]));
        assert_eq!(out, "a &lt;b&gt; &amp; &quot;c&quot;");
    }

    #[test]
    fn test_unknown_placeholder_left_intact() {
        let out = render_template("{{known}} {{unknown}}", &fields(&[("known", "x")]));
        assert_eq!(out, "x {{unknown}}");
    }

    #[test]
    fn test_article_template_renders() {
        let out = render_template(
            ARTICLE_TEMPLATE,
            &fields(&[
                ("title", "Intro to Rust"),
                ("body", "Ownership & borrowing"),
                ("url", "https://example.com/a?x=1&y=2"),
            ]),
        );
        assert_eq!(
            out,
            "<a href=\"https://example.com/a?x=1&amp;y=2\"><b>Intro to Rust</b></a>\nOwnership &amp; borrowing"
        );
    }

    #[test]
    fn test_whitespace_inside_placeholder() {
        let out = render_template("{{ name }}", &fields(&[("name", "x")]));
        assert_eq!(out, "x");
    }
}
