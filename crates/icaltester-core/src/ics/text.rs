//! Text-level helpers: line unfolding and TEXT value escaping.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static FOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]").expect("Invalid fold regex"));

/// Joins folded lines.
///
/// A line starting with a space or tab continues the previous line; the line
/// break and that single whitespace character are removed.
pub fn unfold(text: &str) -> Cow<'_, str> {
    FOLD.replace_all(text, "")
}

/// Escapes a TEXT value.
///
/// Backslash is escaped first so later substitutions are not doubled.
pub fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Reverses [`escape_text`].
///
/// Accepts `\N` as a newline too. Unknown escapes are kept verbatim.
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') | Some('N') => out.push('\n'),
            Some(',') => out.push(','),
            Some(';') => out.push(';'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_order() {
        assert_eq!(escape_text("a,b;c\nd\\e"), "a\\,b\\;c\\nd\\\\e");
    }

    #[test]
    fn unescape_reverses_escape() {
        let samples = [
            "a,b;c\nd\\e",
            "trailing backslash \\",
            "\\n literally",
            "plain",
            "",
        ];
        for sample in samples {
            assert_eq!(unescape_text(&escape_text(sample)), sample);
        }
    }

    #[test]
    fn unescape_handles_uppercase_n_and_unknown_escapes() {
        assert_eq!(unescape_text("one\\Ntwo"), "one\ntwo");
        assert_eq!(unescape_text("C:\\tmp"), "C:\\tmp");
        assert_eq!(unescape_text("dangling\\"), "dangling\\");
    }

    #[test]
    fn unfold_joins_continuations() {
        assert_eq!(unfold("SUMMARY:Long\r\n  title\r\nUID:1"), "SUMMARY:Long title\r\nUID:1");
        assert_eq!(unfold("SUMMARY:a\n\tb"), "SUMMARY:ab");
        assert_eq!(unfold("A:1\r\nB:2"), "A:1\r\nB:2");
    }
}
