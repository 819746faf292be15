// SPDX-License-Identifier: AGPL-3.0-or-later
//! `:shortcode:` to emoji substitution for prose text

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

static SHORTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([A-Za-z0-9_+\-]+):").unwrap());

/// Autolinks and inline link or image destinations
static LINK_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<[A-Za-z][A-Za-z0-9+.\-]*:[^\s<>]*>|\]\([^)\s]*(?:\s+"[^"]*")?\)"#).unwrap()
});

const SHORTCODES: &[(&str, &str)] = &[
    ("+1", "👍"),
    ("-1", "👎"),
    ("100", "💯"),
    ("alarm_clock", "⏰"),
    ("angry", "😠"),
    ("apple", "🍎"),
    ("arrow_down", "⬇️"),
    ("arrow_left", "⬅️"),
    ("arrow_right", "➡️"),
    ("arrow_up", "⬆️"),
    ("art", "🎨"),
    ("beer", "🍺"),
    ("bell", "🔔"),
    ("blush", "😊"),
    ("bomb", "💣"),
    ("book", "📖"),
    ("bookmark", "🔖"),
    ("boom", "💥"),
    ("brain", "🧠"),
    ("bug", "🐛"),
    ("bulb", "💡"),
    ("calendar", "📆"),
    ("cat", "🐱"),
    ("chart_with_upwards_trend", "📈"),
    ("check", "✔️"),
    ("clap", "👏"),
    ("clipboard", "📋"),
    ("cloud", "☁️"),
    ("coffee", "☕"),
    ("computer", "💻"),
    ("confused", "😕"),
    ("construction", "🚧"),
    ("cool", "🆒"),
    ("cry", "😢"),
    ("dart", "🎯"),
    ("dog", "🐶"),
    ("email", "📧"),
    ("eyes", "👀"),
    ("fire", "🔥"),
    ("flag", "🚩"),
    ("gear", "⚙️"),
    ("gift", "🎁"),
    ("globe_with_meridians", "🌐"),
    ("grin", "😁"),
    ("grinning", "😀"),
    ("hammer", "🔨"),
    ("heart", "❤️"),
    ("heavy_check_mark", "✔️"),
    ("hourglass", "⌛"),
    ("house", "🏠"),
    ("information_source", "ℹ️"),
    ("joy", "😂"),
    ("key", "🔑"),
    ("laughing", "😆"),
    ("link", "🔗"),
    ("lock", "🔒"),
    ("mag", "🔍"),
    ("memo", "📝"),
    ("moon", "🌙"),
    ("muscle", "💪"),
    ("no_entry", "⛔"),
    ("ok", "🆗"),
    ("ok_hand", "👌"),
    ("package", "📦"),
    ("pencil", "📝"),
    ("pencil2", "✏️"),
    ("pray", "🙏"),
    ("pushpin", "📌"),
    ("question", "❓"),
    ("raised_hands", "🙌"),
    ("recycle", "♻️"),
    ("red_circle", "🔴"),
    ("rocket", "🚀"),
    ("rotating_light", "🚨"),
    ("scroll", "📜"),
    ("see_no_evil", "🙈"),
    ("shield", "🛡️"),
    ("smile", "😄"),
    ("smiley", "😃"),
    ("sparkles", "✨"),
    ("star", "⭐"),
    ("stop_sign", "🛑"),
    ("sunglasses", "😎"),
    ("sunny", "☀️"),
    ("tada", "🎉"),
    ("thinking", "🤔"),
    ("thumbsdown", "👎"),
    ("thumbsup", "👍"),
    ("trophy", "🏆"),
    ("truck", "🚚"),
    ("unlock", "🔓"),
    ("warning", "⚠️"),
    ("wave", "👋"),
    ("white_check_mark", "✅"),
    ("wink", "😉"),
    ("wrench", "🔧"),
    ("x", "❌"),
    ("zap", "⚡"),
    ("zzz", "💤"),
];

static TABLE: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| SHORTCODES.iter().copied().collect());

/// Glyph for a shortcode name (without colons), case-insensitive
pub fn lookup(name: &str) -> Option<&'static str> {
    TABLE.get(name.to_ascii_lowercase().as_str()).copied()
}

/// Replace every known `:name:` shortcode in `text` with its glyph
///
/// Unknown shortcodes are left as written.
pub fn emojify(text: &str) -> String {
    emojify_cow(text).into_owned()
}

/// Like [`emojify`], borrowing when nothing matched
pub fn emojify_cow(text: &str) -> Cow<'_, str> {
    SHORTCODE_RE.replace_all(text, |caps: &Captures<'_>| match lookup(&caps[1]) {
        Some(glyph) => glyph.to_string(),
        None => caps[0].to_string(),
    })
}

/// Like [`emojify_cow`], leaving literal markdown untouched
///
/// Inline code spans (and fences embedded in raw list or quote source),
/// autolinks and link destinations keep their shortcodes as written.
pub fn emojify_prose(text: &str) -> Cow<'_, str> {
    if !text.contains(':') {
        return Cow::Borrowed(text);
    }
    let literals = literal_spans(text);
    if literals.is_empty() {
        return emojify_cow(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in literals {
        out.push_str(&emojify_cow(&text[cursor..span.start]));
        out.push_str(&text[span.clone()]);
        cursor = span.end;
    }
    out.push_str(&emojify_cow(&text[cursor..]));
    if out == text {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(out)
    }
}

/// Sorted, disjoint byte ranges that must not be emojified
fn literal_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = code_spans(text);
    for m in LINK_LITERAL_RE.find_iter(text) {
        let range = m.range();
        if !spans.iter().any(|s| s.start < range.end && range.start < s.end) {
            spans.push(range);
        }
    }
    spans.sort_by_key(|s| s.start);
    spans
}

/// Backtick runs closed by a run of the same length
///
/// An unmatched run is literal backticks and opens nothing.
fn code_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let run_end = |mut i: usize| {
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        i
    };

    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let start = i;
        i = run_end(i);
        let width = i - start;

        let mut j = i;
        while j < bytes.len() {
            if bytes[j] != b'`' {
                j += 1;
                continue;
            }
            let close = run_end(j);
            if close - j == width {
                spans.push(start..close);
                i = close;
                break;
            }
            j = close;
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_shortcode() {
        assert_eq!(emojify(":rocket: go!"), "🚀 go!");
    }

    #[test]
    fn test_unknown_shortcode_unchanged() {
        assert_eq!(emojify(":not_a_real_emoji:"), ":not_a_real_emoji:");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(emojify(":Tada: :FIRE:"), "🎉 🔥");
    }

    #[test]
    fn test_plus_and_minus_names() {
        assert_eq!(emojify(":+1: and :-1:"), "👍 and 👎");
    }

    #[test]
    fn test_unclosed_and_times() {
        assert_eq!(emojify("at 10:30 today :rocket"), "at 10:30 today :rocket");
    }

    #[test]
    fn test_borrows_without_match() {
        assert!(matches!(emojify_cow("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_prose_skips_code_spans() {
        assert_eq!(emojify_prose("Use `:tada:` literally"), "Use `:tada:` literally");
        assert_eq!(emojify_prose(":tada: and `:tada:`"), "🎉 and `:tada:`");
        assert_eq!(emojify_prose("``a `:x:` b`` :x:"), "``a `:x:` b`` ❌");
    }

    #[test]
    fn test_prose_unmatched_backtick_is_literal() {
        assert_eq!(emojify_prose("a ` :fire:"), "a ` 🔥");
        assert_eq!(emojify_prose("``x` :fire:"), "``x` 🔥");
    }

    #[test]
    fn test_prose_skips_link_destinations() {
        assert_eq!(
            emojify_prose("[:link:](https://host/:tada:) <https://x/:fire:>"),
            "[🔗](https://host/:tada:) <https://x/:fire:>"
        );
    }

    #[test]
    fn test_prose_skips_embedded_fence() {
        let raw = "- item :wave:\n\n  ```\n  :wave:\n  ```";
        assert_eq!(emojify_prose(raw), "- item 👋\n\n  ```\n  :wave:\n  ```");
    }

    #[test]
    fn test_prose_borrows_when_unchanged() {
        assert!(matches!(emojify_prose("`:tada:`"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_table_has_no_duplicates() {
        assert_eq!(TABLE.len(), SHORTCODES.len());
    }
}
