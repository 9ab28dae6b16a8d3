// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::dom::scratch::{ScratchContainer, ScratchHandle, ScratchNode};
use crate::dom::{parse, ScratchDom};
use crate::escape::{escape, escape_attribute};

/// Allow-list applied to any stored HTML before it reaches a renderer or
/// an export pipeline. This is the single trust boundary between stored
/// content and display.
#[derive(Clone, Debug)]
pub struct SanitizePolicy {
    allowed_tags: HashSet<&'static str>,
    allowed_attributes: HashSet<&'static str>,
    allowed_uri_schemes: Regex,
}

/// Tags whose content is dangerous, not just the wrapper.
const DROP_WITH_CONTENT: &[&str] = &["script", "style"];

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

/// Attributes interpreted as URIs, subject to the scheme check.
const URI_ATTRIBUTES: &[&str] = &["href", "src"];

static DEFAULT_POLICY: Lazy<SanitizePolicy> = Lazy::new(|| SanitizePolicy {
    allowed_tags: [
        "h1", "h2", "h3", "h4", "h5", "h6", "p", "br", "hr", "strong", "b",
        "em", "i", "u", "s", "strike", "ol", "ul", "li", "blockquote", "pre",
        "code", "a", "span", "div", "table", "thead", "tbody", "tr", "th",
        "td", "sub", "sup", "mark",
    ]
    .into(),
    allowed_attributes: ["href", "target", "rel", "class", "style", "id"]
        .into(),
    // Accepts known-safe schemes, relative references and opaque values
    // with no scheme at all; rejects javascript: and friends.
    allowed_uri_schemes: Regex::new(
        r"(?i)^(?:(?:(?:f|ht)tps?|mailto|tel|callto|sms|cid|xmpp):|[^a-z]|[a-z+.\-]+(?:[^a-z+.\-:]|$))",
    )
    .unwrap(),
});

impl SanitizePolicy {
    /// The policy used everywhere content is rendered or exported.
    pub fn default_policy() -> &'static SanitizePolicy {
        &DEFAULT_POLICY
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.allowed_tags.contains(tag)
    }

    pub fn allows_attribute(&self, name: &str) -> bool {
        self.allowed_attributes.contains(name)
    }

    /// URI attribute values must carry an allowed scheme once resolved.
    /// Relative references have no scheme and pass.
    pub fn allows_uri(&self, value: &str) -> bool {
        let resolved = match Url::parse(value) {
            Ok(url) => format!("{}:", url.scheme()),
            // Not an absolute URL; judge the raw value.
            Err(_) => value.to_owned(),
        };
        self.allowed_uri_schemes.is_match(&resolved)
    }
}

/// Sanitize stored HTML with the default policy.
pub fn sanitize_for_display(html: &str) -> String {
    sanitize(html, SanitizePolicy::default_policy())
}

/// Reduce HTML to the policy's allow-list.
///
/// Disallowed tags are unwrapped (children kept) except for script and
/// style, which vanish with their content. Disallowed attributes and
/// URI values with bad schemes are dropped silently; none of this is an
/// error condition.
pub fn sanitize(html: &str, policy: &SanitizePolicy) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let dom = parse(html);
    let mut out = String::new();
    for handle in dom.top_level_children() {
        out.push_str(&emit(&dom, &handle, policy));
    }
    out
}

fn emit(dom: &ScratchDom, handle: &ScratchHandle, policy: &SanitizePolicy) -> String {
    let container = match dom.get_node(handle) {
        ScratchNode::Text(t) => return escape(&t.content).into_owned(),
        ScratchNode::Comment(_) | ScratchNode::Document(_) => {
            return String::new()
        }
        ScratchNode::Container(c) => c,
    };

    let tag = container.tag();
    if DROP_WITH_CONTENT.contains(&tag) {
        return String::new();
    }
    if !policy.allows_tag(tag) {
        // Unwrap: the children may still be fine.
        return emit_children(dom, container, policy);
    }

    let attrs = emit_attrs(container, policy);
    if VOID_TAGS.contains(&tag) {
        format!("<{tag}{attrs}>")
    } else {
        let inner = emit_children(dom, container, policy);
        format!("<{tag}{attrs}>{inner}</{tag}>")
    }
}

fn emit_children(
    dom: &ScratchDom,
    container: &ScratchContainer,
    policy: &SanitizePolicy,
) -> String {
    container
        .children
        .iter()
        .map(|child| emit(dom, child, policy))
        .collect()
}

fn emit_attrs(container: &ScratchContainer, policy: &SanitizePolicy) -> String {
    let mut out = String::new();
    for (name, value) in &container.attrs {
        if !policy.allows_attribute(name) {
            continue;
        }
        if URI_ATTRIBUTES.contains(&name.as_str()) && !policy.allows_uri(value)
        {
            continue;
        }
        out.push_str(&format!(" {name}=\"{}\"", escape_attribute(value)));
    }
    out
}
