// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::scratch::{ScratchContainer, ScratchHandle, ScratchNode};
use crate::dom::{parse, ScratchDom};
use crate::escape::{escape, escape_attribute};

/// Three or more consecutive breaks anywhere collapse down to two.
static BR_RUN_COLLAPSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:<br>\s*){3,}").unwrap());

static WS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Dropped together with their content.
const DISALLOWED_TAGS: &[&str] =
    &["script", "style", "iframe", "object", "embed", "meta", "link"];

const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "pre",
    "blockquote", "div", "table",
];

const VOID_TAGS: &[&str] = &["br", "img", "hr"];

fn allowed_attrs(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["href", "title"],
        "img" => &["src", "alt"],
        "code" => &["class"],
        _ => &[],
    }
}

/// Structurally normalize an HTML string.
///
/// Parses and re-serializes, dropping disallowed elements and comments,
/// filtering attributes down to a per-tag allow-list, promoting
/// inline-only `div`s to `p`, unwrapping childless `span`s, collapsing
/// whitespace (except inside `pre`) and normalizing `<br>` runs.
///
/// Idempotent: cleaning already-clean output changes nothing.
pub fn clean(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let dom = parse(html);
    let mut out = String::new();
    for handle in dom.top_level_children() {
        out.push_str(&serialize(&dom, &handle, false));
    }
    let out = BR_RUN_COLLAPSE.replace_all(&out, "<br><br>");
    out.trim().to_owned()
}

fn serialize(dom: &ScratchDom, handle: &ScratchHandle, in_pre: bool) -> String {
    let container = match dom.get_node(handle) {
        ScratchNode::Text(t) => {
            if in_pre {
                return escape(&t.content).into_owned();
            }
            let collapsed = WS_RUN.replace_all(&t.content, " ");
            // Whitespace-only nodes are the `>  <` gaps; drop them.
            if collapsed.trim().is_empty() {
                return String::new();
            }
            return escape(&collapsed).into_owned();
        }
        ScratchNode::Comment(_) | ScratchNode::Document(_) => {
            return String::new()
        }
        ScratchNode::Container(c) => c,
    };

    let tag = container.tag();
    if DISALLOWED_TAGS.contains(&tag) {
        return String::new();
    }

    match tag {
        "pre" => {
            let inner = serialize_children(dom, container, true);
            format!("<pre>{inner}</pre>")
        }
        "p" => serialize_paragraph(dom, container),
        "div" => {
            if is_inline_only(dom, container)
                && !dom.text_content(handle).trim().is_empty()
            {
                serialize_paragraph(dom, container)
            } else {
                let inner = serialize_children(dom, container, false);
                format!("<div>{inner}</div>")
            }
        }
        "span" => {
            let has_element_children = container.children.iter().any(
                |child| matches!(dom.get_node(child), ScratchNode::Container(_)),
            );
            if has_element_children {
                let inner = serialize_children(dom, container, false);
                format!("<span>{inner}</span>")
            } else {
                serialize_children(dom, container, false)
            }
        }
        _ => {
            let attrs = serialize_attrs(container);
            if VOID_TAGS.contains(&tag) {
                format!("<{tag}{attrs}>")
            } else {
                let inner = serialize_children(dom, container, in_pre);
                format!("<{tag}{attrs}>{inner}</{tag}>")
            }
        }
    }
}

/// Emit a paragraph, breaking it at every run of two-or-more `<br>`
/// that are direct children. Runs buried inside inline wrappers are
/// left where they are; cutting through a wrapper would unbalance it.
fn serialize_paragraph(dom: &ScratchDom, container: &ScratchContainer) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut br_run = 0usize;

    for child in &container.children {
        if let ScratchNode::Container(c) = dom.get_node(child) {
            if c.tag() == "br" {
                br_run += 1;
                continue;
            }
        }
        let rendered = serialize(dom, child, false);
        if rendered.is_empty() {
            // Whitespace-only text between breaks does not end a run.
            continue;
        }
        if br_run >= 2 {
            segments.push(std::mem::take(&mut current));
        } else if br_run == 1 {
            current.push_str("<br>");
        }
        br_run = 0;
        current.push_str(&rendered);
    }
    if br_run == 1 {
        current.push_str("<br>");
    }
    segments.push(current);

    segments
        .iter()
        .map(|segment| segment.trim())
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("<p>{segment}</p>"))
        .collect()
}

fn serialize_children(
    dom: &ScratchDom,
    container: &ScratchContainer,
    in_pre: bool,
) -> String {
    container
        .children
        .iter()
        .map(|child| serialize(dom, child, in_pre))
        .collect()
}

fn serialize_attrs(container: &ScratchContainer) -> String {
    let allowed = allowed_attrs(container.tag());
    let mut out = String::new();
    for (name, value) in &container.attrs {
        if allowed.contains(&name.as_str()) {
            out.push_str(&format!(" {name}=\"{}\"", escape_attribute(value)));
        }
    }
    out
}

fn is_inline_only(dom: &ScratchDom, container: &ScratchContainer) -> bool {
    container.children.iter().all(|child| {
        match dom.get_node(child) {
            ScratchNode::Container(c) => !BLOCK_TAGS.contains(&c.tag()),
            _ => true,
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("   \n  "), "");
    }

    #[test]
    fn empty_paragraphs_are_removed() {
        assert_eq!(clean("<p>a</p><p>  </p><p>b</p>"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn long_br_runs_collapse_to_two() {
        assert_eq!(clean("a<br><br><br><br>b"), "a<br><br>b");
        assert_eq!(clean("a<br>b"), "a<br>b");
    }

    #[test]
    fn inter_tag_whitespace_is_trimmed() {
        assert_eq!(
            clean("<h2>T</h2>\n  <p>body   text</p>"),
            "<h2>T</h2><p>body text</p>"
        );
    }

    #[test]
    fn scripts_and_styles_are_dropped_with_content() {
        assert_eq!(
            clean("<p>ok</p><script>alert(1)</script><style>p{}</style>"),
            "<p>ok</p>"
        );
    }

    #[test]
    fn comments_are_stripped() {
        assert_eq!(clean("<p>a<!-- hidden -->b</p>"), "<p>ab</p>");
    }

    #[test]
    fn attributes_are_filtered_per_tag() {
        assert_eq!(
            clean("<a href=\"https://e.org\" onclick=\"x()\" style=\"c\">l</a>"),
            "<a href=\"https://e.org\">l</a>"
        );
        assert_eq!(
            clean("<code class=\"language-rust\" data-x=\"1\">f()</code>"),
            "<code class=\"language-rust\">f()</code>"
        );
    }

    #[test]
    fn inline_only_divs_become_paragraphs() {
        assert_eq!(
            clean("<div>Hello <strong>there</strong></div>"),
            "<p>Hello <strong>there</strong></p>"
        );
    }

    #[test]
    fn divs_with_block_children_stay_divs() {
        assert_eq!(
            clean("<div><p>a</p><p>b</p></div>"),
            "<div><p>a</p><p>b</p></div>"
        );
    }

    #[test]
    fn childless_spans_are_unwrapped() {
        assert_eq!(clean("<p><span>word</span></p>"), "<p>word</p>");
    }

    #[test]
    fn double_br_inside_a_paragraph_splits_it() {
        assert_eq!(
            clean("<p>first<br><br>second</p>"),
            "<p>first</p><p>second</p>"
        );
    }

    #[test]
    fn single_br_inside_a_paragraph_is_kept() {
        assert_eq!(clean("<p>a<br>b</p>"), "<p>a<br>b</p>");
    }

    #[test]
    fn br_runs_inside_inline_wrappers_are_not_split() {
        let once = clean("<p><span>a<br><br>b</span></p>");
        assert_eq!(once, "<p><span>a<br><br>b</span></p>");
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn whitespace_between_breaks_still_forms_a_run() {
        assert_eq!(clean("<p>a<br> <br>b</p>"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn pre_content_keeps_its_whitespace() {
        let html = "<pre><code>fn main() {\n    body();\n}</code></pre>";
        assert_eq!(clean(html), html);
    }

    #[test]
    fn cleaning_is_idempotent() {
        let inputs = [
            "<p>a</p>\n<p></p><div>CAPS <b>x</b></div>",
            "<p>first<br><br><br>second</p>",
            "<pre><code>a\n  b</code></pre>",
            "<ul>\n<li>one</li>\n<li>two</li>\n</ul>",
            "<a href=\"https://e.org\" id=\"z\">link</a> text",
        ];
        for input in inputs {
            let once = clean(input);
            assert_eq!(clean(&once), once, "not idempotent for {input:?}");
        }
    }
}
