// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use html5ever::tree_builder::ElementFlags;
use html5ever::{Attribute, QualName};

/// Index of a node inside a [ScratchDom] arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ScratchHandle(pub(crate) usize);

/// A disposable, per-paste parsing container.
///
/// Parents refer to their children by handles and all nodes are owned in
/// one list held by the dom itself, which is what html5ever's tree sink
/// wants to talk to. The arena may contain garbage nodes created during
/// parsing but no longer referenced; walkers start from the document
/// handle, so garbage is simply never visited.
#[derive(Clone, Debug, PartialEq)]
pub struct ScratchDom {
    pub(crate) nodes: Vec<ScratchNode>,
    pub(crate) document_handle: ScratchHandle,
}

impl ScratchDom {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![ScratchNode::Document(ScratchDocument {
                children: Vec::new(),
            })],
            document_handle: ScratchHandle(0),
        }
    }

    pub(crate) fn document_handle(&self) -> &ScratchHandle {
        &self.document_handle
    }

    pub(crate) fn get_node(&self, handle: &ScratchHandle) -> &ScratchNode {
        &self.nodes[handle.0]
    }

    pub(crate) fn get_mut_node(
        &mut self,
        handle: &ScratchHandle,
    ) -> &mut ScratchNode {
        &mut self.nodes[handle.0]
    }

    pub(crate) fn add_node(&mut self, node: ScratchNode) -> ScratchHandle {
        self.nodes.push(node);
        ScratchHandle(self.nodes.len() - 1)
    }

    pub(crate) fn create_element(
        &mut self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> ScratchHandle {
        self.add_node(ScratchNode::Container(ScratchContainer {
            name,
            attrs: attrs
                .iter()
                .map(|attr| {
                    (
                        attr.name.local.as_ref().to_owned(),
                        attr.value.as_ref().to_owned(),
                    )
                })
                .collect(),
            children: Vec::new(),
        }))
    }

    /// Children of the parsed fragment, with the implicit `html` wrapper
    /// element that fragment parsing introduces skipped over.
    pub(crate) fn top_level_children(&self) -> Vec<ScratchHandle> {
        let mut out = Vec::new();
        let ScratchNode::Document(doc) = self.get_node(self.document_handle())
        else {
            return out;
        };
        for handle in &doc.children {
            match self.get_node(handle) {
                ScratchNode::Container(c) if c.tag() == "html" => {
                    out.extend(c.children.iter().cloned())
                }
                _ => out.push(handle.clone()),
            }
        }
        out
    }

    /// Concatenated text of every text descendant, comments skipped.
    pub(crate) fn text_content(&self, handle: &ScratchHandle) -> String {
        let mut out = String::new();
        self.collect_text(handle, &mut out);
        out
    }

    fn collect_text(&self, handle: &ScratchHandle, out: &mut String) {
        match self.get_node(handle) {
            ScratchNode::Text(text) => out.push_str(&text.content),
            ScratchNode::Container(c) => {
                for child in &c.children {
                    self.collect_text(child, out);
                }
            }
            ScratchNode::Document(doc) => {
                for child in &doc.children {
                    self.collect_text(child, out);
                }
            }
            ScratchNode::Comment(_) => {}
        }
    }

    /// First descendant container with the given tag, depth first.
    pub(crate) fn find_descendant(
        &self,
        handle: &ScratchHandle,
        tag: &str,
    ) -> Option<ScratchHandle> {
        let ScratchNode::Container(c) = self.get_node(handle) else {
            return None;
        };
        for child in &c.children {
            if let ScratchNode::Container(cc) = self.get_node(child) {
                if cc.tag() == tag {
                    return Some(child.clone());
                }
            }
            if let Some(found) = self.find_descendant(child, tag) {
                return Some(found);
            }
        }
        None
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ScratchNode {
    Document(ScratchDocument),
    Container(ScratchContainer),
    Text(ScratchText),
    Comment(ScratchComment),
}

impl ScratchNode {
    pub(crate) fn name(&self) -> &QualName {
        match self {
            ScratchNode::Container(c) => &c.name,
            _ => panic!("Only containers have names"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ScratchDocument {
    pub(crate) children: Vec<ScratchHandle>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ScratchContainer {
    pub(crate) name: QualName,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) children: Vec<ScratchHandle>,
}

impl ScratchContainer {
    pub(crate) fn tag(&self) -> &str {
        self.name.local.as_ref()
    }

    pub(crate) fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _v)| n == name)
            .map(|(_n, v)| v.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ScratchText {
    pub(crate) content: String,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ScratchComment {
    #[allow(dead_code)] // kept for debugging; comments are always stripped
    pub(crate) content: String,
}

/// Errors accumulated while populating a scratch container. The partially
/// built dom is carried along so callers can degrade instead of aborting.
#[derive(Debug)]
pub(crate) struct ScratchCreationError {
    pub(crate) dom: ScratchDom,
    pub(crate) parse_errors: Vec<String>,
}

impl ScratchCreationError {
    pub(crate) fn new() -> Self {
        Self {
            dom: ScratchDom::new(),
            parse_errors: Vec::new(),
        }
    }
}
