// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use indoc::indoc;
use pastekit::{
    clean, classify, extract_structure, parse, route, sanitize_for_display,
    structure_plain_text, PasteMode, PasteProcessor,
};
use speculoos::prelude::*;

#[test]
fn plain_text_with_heading_and_bullets_structures_into_blocks() {
    let text = indoc! {"
        TWO POINTER TECHNIQUE

        - Sorted arrays
        - Finding pairs
    "};
    let html = structure_plain_text(text);
    assert_eq!(
        html,
        "<h2>TWO POINTER TECHNIQUE</h2><br>\
         <ul><li>Sorted arrays</li><li>Finding pairs</li></ul>"
    );
}

#[test]
fn a_single_inline_div_extracts_to_a_paragraph() {
    let dom = parse("<div>Hello <b>world</b></div>");
    assert_eq!(
        extract_structure(&dom),
        "<p>Hello <strong>world</strong></p>"
    );
}

#[test]
fn smart_paste_of_step_lines_yields_an_ordered_list() {
    let processor = PasteProcessor::new();
    let html = processor.process(
        None,
        Some("Step 1: Open the box\nStep 2: Find the gift"),
        PasteMode::Smart,
    );
    assert_eq!(html, "<ol><li>Open the box</li><li>Find the gift</li></ol>");
}

#[test]
fn pasted_notes_survive_the_whole_smart_pipeline() {
    let text = indoc! {"
        BINARY SEARCH BASICS

        Definition:
        Search in a sorted array by halving the interval.

        Steps to apply:
        1. Pick the middle element
        2. Discard the half that cannot contain the target

        ```
        fn bisect(xs: &[i32], t: i32) -> bool {
            xs.binary_search(&t).is_ok()
        }
        ```
    "};
    let html = route(None, Some(text), PasteMode::Smart);

    assert_that!(html).contains("<h2>BINARY SEARCH BASICS</h2>");
    // Short colon-terminated lines rank as headings, colon kept.
    assert_that!(html).contains("<h2>Definition:</h2>");
    assert_that!(html)
        .contains("<ol><li>Pick the middle element</li>");
    assert_that!(html).contains("<pre><code>fn bisect");
    // Fenced content keeps its indentation, escaped.
    assert_that!(html).contains("    xs.binary_search(&amp;t).is_ok()");
}

#[test]
fn smart_paste_prefers_real_html_and_strips_its_junk() {
    let clipboard_html = indoc! {r#"
        <meta charset="utf-8">
        <h1 style="margin: 0" class="docs-title">Heap property</h1>
        <!-- boilerplate -->
        <p><span>Every parent is</span> <b>smaller</b> than its children.</p>
        <script>track();</script>
    "#};
    let html = route(
        Some(clipboard_html),
        Some("Heap property\nEvery parent is smaller than its children."),
        PasteMode::Smart,
    );
    assert_eq!(
        html,
        "<h2>Heap property</h2>\
         <p>Every parent is <strong>smaller</strong> than its children.</p>"
    );
}

#[test]
fn cleaning_pipeline_output_again_changes_nothing() {
    let inputs = [
        route(
            None,
            Some("NOTES ON GRAPHS\n\n- nodes\n- edges\n\nplain tail"),
            PasteMode::Smart,
        ),
        route(Some("<div>Hi <i>there</i></div><p>x</p>"), None, PasteMode::Formatted),
        clean("<p>a<br><br><br>b</p><p> </p>"),
    ];
    for html in inputs {
        assert_eq!(clean(&html), html);
    }
}

#[test]
fn every_token_of_dense_plain_text_is_preserved_in_order() {
    let text = "alpha beta\ngamma < delta\n\"quoted\" & 'ticked'";
    let lines: Vec<&str> = text.lines().collect();
    let html = pastekit::assemble(&classify(&lines));

    // Strip tags, unescape, then compare token streams.
    let mut text_only = String::new();
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text_only.push(c),
            _ => {}
        }
    }
    let text_only = text_only
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&");
    let expected: Vec<&str> = text.split_whitespace().collect();
    let actual: Vec<&str> = text_only.split_whitespace().collect();
    assert_eq!(actual, expected);
}

#[test]
fn lists_stay_balanced_across_hostile_inputs() {
    let inputs = [
        "- a\n1. b\n- c\n\n- d",
        "1. only\nplain\n- x",
        "- unterminated",
        "```\n- inside fence\n",
    ];
    for text in inputs {
        let html = route(None, Some(text), PasteMode::Smart);
        assert_eq!(
            html.matches("<ul>").count(),
            html.matches("</ul>").count(),
            "unbalanced <ul> for {text:?}"
        );
        assert_eq!(
            html.matches("<ol>").count(),
            html.matches("</ol>").count(),
            "unbalanced <ol> for {text:?}"
        );
    }
}

#[test]
fn stored_answers_are_sanitized_at_the_display_boundary() {
    let stored = r#"<h2>XSS notes</h2><p onmouseover="p()">hover</p><a href="javascript:alert(1)">link</a><iframe src="https://evil"></iframe>"#;
    let shown = sanitize_for_display(stored);
    assert_that!(shown).is_equal_to(
        "<h2>XSS notes</h2><p>hover</p><a>link</a>".to_owned(),
    );
}

#[test]
fn formatted_mode_normalizes_code_blocks() {
    let html = route(
        Some("<pre><code class=\"language-rust\">let a = 1;</code></pre>"),
        None,
        PasteMode::Formatted,
    );
    assert_eq!(html, "<pre><code>let a = 1;</code></pre>");
}

#[test]
fn missing_clipboard_is_a_no_op_not_an_error() {
    let processor = PasteProcessor::new();
    assert_eq!(processor.process(None, None, PasteMode::Smart), "");
    assert_eq!(processor.process(Some(""), Some("   "), PasteMode::Plain), "");
}
