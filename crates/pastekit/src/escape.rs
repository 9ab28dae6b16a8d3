// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SPECIAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[&<>"']"#).unwrap());

/// Escape a raw text fragment for use as HTML text content.
///
/// Replaces exactly `&`, `<`, `>`, `"` and `'` with their entities;
/// every other character passes through untouched. Callers must escape
/// each raw fragment exactly once - the function does not try to detect
/// already-escaped input.
pub fn escape(text: &str) -> Cow<'_, str> {
    SPECIAL_CHARS.replace_all(text, |caps: &Captures| match &caps[0] {
        "&" => "&amp;",
        "<" => "&lt;",
        ">" => "&gt;",
        "\"" => "&quot;",
        _ => "&#x27;",
    })
}

/// Escape a value for use inside a double-quoted HTML attribute.
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn escapes_all_five_special_characters() {
        assert_eq!(
            escape(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(escape("two pointer technique"), "two pointer technique");
    }

    #[test]
    fn only_the_five_specials_are_touched() {
        assert_eq!(escape("path/to/file (a/b) = 50%"), "path/to/file (a/b) = 50%");
        assert_eq!(escape("</a>"), "&lt;/a&gt;");
    }

    #[test]
    fn escaped_output_has_no_literal_specials() {
        let out = escape("if a < b && b > c { \"quote\" + 'tick' }").into_owned();
        let stripped = out
            .replace("&amp;", "")
            .replace("&lt;", "")
            .replace("&gt;", "")
            .replace("&quot;", "")
            .replace("&#x27;", "");
        assert!(!stripped.contains(['<', '>', '&', '"', '\'']));
    }

    #[test]
    fn attribute_escaping_covers_quotes() {
        assert_eq!(
            escape_attribute(r#"https://example.org/?q="rust""#),
            "https://example.org/?q=&quot;rust&quot;"
        );
    }
}
