// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::escape::{escape, escape_attribute};

use super::scratch::{ScratchContainer, ScratchDom, ScratchHandle, ScratchNode};

/// Extract clean semantic HTML from a parsed clipboard fragment.
///
/// Recursive descent over the scratch container. Source markup is not
/// preserved verbatim; every node is re-emitted into a fixed vocabulary
/// (`h2`, `h3`, `p`, `ul`, `ol`, `li`, `pre`, `code`, `blockquote`,
/// `strong`, `em`, `u`, `a`, `br`) and wrapper tags with no semantic
/// meaning are discarded.
pub fn extract_structure(dom: &ScratchDom) -> String {
    let mut result = Vec::new();
    for handle in dom.top_level_children() {
        let html = process_node(dom, &handle, None);
        if !html.is_empty() {
            result.push(html);
        }
    }
    result.join("\n")
}

fn process_node(
    dom: &ScratchDom,
    handle: &ScratchHandle,
    parent_tag: Option<&str>,
) -> String {
    let container = match dom.get_node(handle) {
        ScratchNode::Text(t) => {
            let text = t.content.trim();
            return if text.is_empty() {
                String::new()
            } else {
                format!("<p>{}</p>", escape(text))
            };
        }
        ScratchNode::Container(c) => c,
        ScratchNode::Comment(_) | ScratchNode::Document(_) => {
            return String::new()
        }
    };

    match container.tag() {
        // Dropped with their content; unwrapping would leak script text
        // into paragraphs.
        "script" | "style" | "iframe" | "object" | "embed" | "meta"
        | "link" => String::new(),
        "p" | "div" => process_paragraph(dom, handle),
        tag @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
            let content = inline_html(dom, container);
            if content.trim().is_empty() {
                return String::new();
            }
            // h1 is reserved for the page title; downgrade it.
            let level = if tag == "h1" { "h2" } else { tag };
            format!("<{level}>{content}</{level}>")
        }
        tag @ ("ul" | "ol") => process_list(dom, container, tag),
        "li" => {
            let content = inline_html(dom, container);
            if content.trim().is_empty() {
                String::new()
            } else {
                format!("<li>{content}</li>")
            }
        }
        "pre" => process_code_block(dom, handle),
        "code" => {
            // Inside pre this is already handled by the pre rule.
            if parent_tag == Some("pre") {
                return String::new();
            }
            let content = dom.text_content(handle);
            let content = content.trim();
            if content.is_empty() {
                String::new()
            } else {
                format!("<code>{}</code>", escape(content))
            }
        }
        "blockquote" => {
            let content = process_children(dom, container, "blockquote");
            if content.trim().is_empty() {
                String::new()
            } else {
                format!("<blockquote>{content}</blockquote>")
            }
        }
        "br" => "<br>".into(),
        "strong" | "b" => wrap_text(dom, handle, "strong"),
        "em" | "i" => wrap_text(dom, handle, "em"),
        "u" => wrap_text(dom, handle, "u"),
        "a" => process_link(dom, container),
        "span" => process_children(dom, container, "span"),
        // Unknown wrappers are discarded, their children kept.
        tag => process_children(dom, container, tag),
    }
}

/// `p` and `div` content that looks like a heading is promoted: short,
/// period-free text that is ALL CAPS becomes `h2` and a trailing colon
/// becomes `h3`. Everything else stays a paragraph.
fn process_paragraph(dom: &ScratchDom, handle: &ScratchHandle) -> String {
    let ScratchNode::Container(container) = dom.get_node(handle) else {
        return String::new();
    };
    let content = inline_html(dom, container);
    if content.trim().is_empty() {
        return String::new();
    }

    let text = dom.text_content(handle);
    let text = text.trim();
    if text.chars().count() < 60 && !text.ends_with('.') && !text.contains('\n')
    {
        if text == text.to_uppercase()
            && text.split_whitespace().count() >= 2
        {
            return format!("<h2>{content}</h2>");
        }
        if text.ends_with(':') {
            let content = content.strip_suffix(':').unwrap_or(&content);
            return format!("<h3>{content}</h3>");
        }
    }

    format!("<p>{content}</p>")
}

/// Only direct `li` children are kept; anything else nested directly in
/// the list (stray text, orphaned markup) is dropped, and a list with no
/// surviving items vanishes entirely.
fn process_list(
    dom: &ScratchDom,
    container: &ScratchContainer,
    tag: &str,
) -> String {
    let mut items = Vec::new();
    for child in &container.children {
        let ScratchNode::Container(c) = dom.get_node(child) else {
            continue;
        };
        if c.tag() != "li" {
            continue;
        }
        let content = inline_html(dom, c);
        if !content.trim().is_empty() {
            items.push(format!("<li>{content}</li>"));
        }
    }
    if items.is_empty() {
        return String::new();
    }
    format!("<{tag}>\n{}\n</{tag}>", items.join("\n"))
}

fn process_code_block(dom: &ScratchDom, handle: &ScratchHandle) -> String {
    // Nested code text is taken verbatim, never re-parsed.
    let content = match dom.find_descendant(handle, "code") {
        Some(code) => dom.text_content(&code),
        None => dom.text_content(handle),
    };
    if content.trim().is_empty() {
        return String::new();
    }
    format!("<pre><code>{}</code></pre>", escape(&content))
}

fn process_link(dom: &ScratchDom, container: &ScratchContainer) -> String {
    let href = container.get_attr("href").unwrap_or("#");
    let mut content = String::new();
    for child in &container.children {
        content.push_str(&dom.text_content(child));
    }
    if content.trim().is_empty() {
        return String::new();
    }
    format!(
        "<a href=\"{}\">{}</a>",
        escape_attribute(href),
        escape(&content)
    )
}

fn wrap_text(dom: &ScratchDom, handle: &ScratchHandle, tag: &str) -> String {
    format!("<{tag}>{}</{tag}>", escape(&dom.text_content(handle)))
}

fn process_children(
    dom: &ScratchDom,
    container: &ScratchContainer,
    tag: &str,
) -> String {
    let mut results = Vec::new();
    for child in &container.children {
        let html = process_node(dom, child, Some(tag));
        if !html.is_empty() {
            results.push(html);
        }
    }
    results.join("\n")
}

/// Inline rendering of a block's children, space-joined. Unlike
/// [process_node] this never opens a new block; nested block markup
/// degrades to its text content.
fn inline_html(dom: &ScratchDom, container: &ScratchContainer) -> String {
    let mut parts = Vec::new();
    for child in &container.children {
        match dom.get_node(child) {
            ScratchNode::Text(t) => {
                let text = t.content.trim();
                if !text.is_empty() {
                    parts.push(escape(text).into_owned());
                }
            }
            ScratchNode::Container(c) => match c.tag() {
                "br" => parts.push("<br>".into()),
                "strong" | "b" => {
                    parts.push(wrap_text(dom, child, "strong"))
                }
                "em" | "i" => parts.push(wrap_text(dom, child, "em")),
                "u" => parts.push(wrap_text(dom, child, "u")),
                "code" => parts.push(format!(
                    "<code>{}</code>",
                    escape(&dom.text_content(child))
                )),
                "a" => {
                    let html = process_link(dom, c);
                    if !html.is_empty() {
                        parts.push(html);
                    }
                }
                _ => {
                    let text = dom.text_content(child);
                    if !text.trim().is_empty() {
                        parts.push(escape(&text).into_owned());
                    }
                }
            },
            ScratchNode::Comment(_) | ScratchNode::Document(_) => {}
        }
    }
    parts.join(" ")
}
