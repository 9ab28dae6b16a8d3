// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use html5ever::interface::NextParserState;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{parse_fragment, Attribute, QualName};
use std::cell::{Ref, RefCell};

use super::qual_name;
use super::scratch::{
    ScratchComment, ScratchContainer, ScratchCreationError, ScratchDocument,
    ScratchDom, ScratchHandle, ScratchNode, ScratchText,
};

pub(crate) type ScratchResult = Result<ScratchDom, ScratchCreationError>;

/// html5ever tree sink that materializes a fragment into a [ScratchDom].
///
/// Clipboard HTML is hostile: mis-nested tags, comments, foster-parented
/// table content. Everything the tree builder reports is accepted in some
/// degraded form so that extraction never has to abort; parse notices are
/// collected and the partial dom is still returned alongside them.
pub(crate) struct ScratchBuilder {
    state: RefCell<ScratchCreationError>,
}

impl ScratchBuilder {
    pub(crate) fn parse(html: &str) -> ScratchResult {
        parse_fragment(
            ScratchBuilder::default(),
            Default::default(),
            qual_name(""),
            vec![],
        )
        .from_utf8()
        .one(html.as_bytes())
    }

    /// Scan the arena for the parent whose child list holds `handle`.
    fn parent_of(&self, handle: &ScratchHandle) -> Option<ScratchHandle> {
        let state = self.state.borrow();
        for (i, node) in state.dom.nodes.iter().enumerate() {
            let children = match node {
                ScratchNode::Container(c) => &c.children,
                ScratchNode::Document(d) => &d.children,
                _ => continue,
            };
            if children.contains(handle) {
                return Some(ScratchHandle(i));
            }
        }
        None
    }
}

impl Default for ScratchBuilder {
    fn default() -> Self {
        Self {
            state: RefCell::new(ScratchCreationError::new()),
        }
    }
}

impl TreeSink for ScratchBuilder {
    type Handle = ScratchHandle;
    type Output = ScratchResult;
    type ElemName<'a> = Ref<'a, QualName>;

    fn finish(self) -> Self::Output {
        if self.state.borrow().parse_errors.is_empty() {
            Ok(self.state.borrow().dom.clone())
        } else {
            Err(ScratchCreationError {
                dom: self.state.borrow().dom.clone(),
                parse_errors: self.state.borrow().parse_errors.clone(),
            })
        }
    }

    fn parse_error(&self, msg: std::borrow::Cow<'static, str>) {
        log::trace!(target: "pastekit.dom", "parse notice: {msg}");
        self.state.borrow_mut().parse_errors.push(String::from(msg));
    }

    fn get_document(&self) -> Self::Handle {
        self.state.borrow().dom.document_handle().clone()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        Ref::map(self.state.borrow(), |state| {
            state.dom.get_node(target).name()
        })
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Self::Handle {
        self.state
            .borrow_mut()
            .dom
            .create_element(name, attrs, flags)
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        // Materialized so the cleaner can strip them later.
        self.state
            .borrow_mut()
            .dom
            .add_node(ScratchNode::Comment(ScratchComment {
                content: text.as_ref().to_owned(),
            }))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        // Processing instructions carry nothing we keep; store as a comment.
        self.state
            .borrow_mut()
            .dom
            .add_node(ScratchNode::Comment(ScratchComment {
                content: format!("{target} {data}"),
            }))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let dom = &mut self.state.borrow_mut().dom;
        match child {
            NodeOrText::AppendNode(child) => match dom.get_mut_node(parent) {
                ScratchNode::Container(p) => p.children.push(child),
                ScratchNode::Document(p) => p.children.push(child),
                _ => panic!("Appending node to a leaf! {:?}", parent),
            },
            NodeOrText::AppendText(tendril) => {
                let text_handle = match dom.get_node(parent) {
                    ScratchNode::Text(_) => Some(parent.clone()),
                    ScratchNode::Container(ScratchContainer {
                        children, ..
                    })
                    | ScratchNode::Document(ScratchDocument { children }) => {
                        match children
                            .last()
                            .map(|handle| (handle, dom.get_node(handle)))
                        {
                            Some((last_child, ScratchNode::Text(_))) => {
                                Some(last_child.clone())
                            }
                            _ => None,
                        }
                    }
                    ScratchNode::Comment(_) => None,
                };

                if let Some(text_handle) = text_handle {
                    if let ScratchNode::Text(t) = dom.get_mut_node(&text_handle)
                    {
                        t.content += tendril.as_ref();
                    } else {
                        unreachable!(
                            "`text_handle` must map to a `ScratchNode::Text`"
                        )
                    }
                } else {
                    let new_handle = dom.add_node(ScratchNode::Text(
                        ScratchText {
                            content: tendril.as_ref().to_owned(),
                        },
                    ));

                    match dom.get_mut_node(parent) {
                        ScratchNode::Container(p) => {
                            p.children.push(new_handle)
                        }
                        ScratchNode::Document(p) => p.children.push(new_handle),
                        _ => panic!("parent changed from container to leaf!"),
                    }
                }
            }
        };
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        // Foster parenting (mis-nested table content). If the element has a
        // parent, degrade to appending there; otherwise fall back to the
        // previous element.
        match self.parent_of(element) {
            Some(parent) => self.append(&parent, child),
            None => self.append(prev_element, child),
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        // Doctypes in clipboard payloads are noise.
    }

    fn mark_script_already_started(&self, _node: &Self::Handle) {
        // Scripts are never executed here.
    }

    fn pop(&self, _node: &Self::Handle) {
        // Nothing to do here for now.
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // No separate template document; the template node doubles as its
        // own content, and the sanitizer discards it anyway.
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {
        // Nothing to do here for now.
    }

    fn append_before_sibling(
        &self,
        sibling: &Self::Handle,
        new_node: NodeOrText<Self::Handle>,
    ) {
        let Some(parent) = self.parent_of(sibling) else {
            // Degraded: no known parent, keep the node at the top level.
            return self.append(&self.get_document(), new_node);
        };
        let node_handle = match new_node {
            NodeOrText::AppendNode(handle) => handle,
            NodeOrText::AppendText(tendril) => {
                self.state.borrow_mut().dom.add_node(ScratchNode::Text(
                    ScratchText {
                        content: tendril.as_ref().to_owned(),
                    },
                ))
            }
        };
        let dom = &mut self.state.borrow_mut().dom;
        let children = match dom.get_mut_node(&parent) {
            ScratchNode::Container(c) => &mut c.children,
            ScratchNode::Document(d) => &mut d.children,
            _ => unreachable!("parent_of only returns containers"),
        };
        let index = children
            .iter()
            .position(|h| h == sibling)
            .unwrap_or(children.len());
        children.insert(index, node_handle);
    }

    fn add_attrs_if_missing(
        &self,
        target: &Self::Handle,
        attrs: Vec<Attribute>,
    ) {
        let dom = &mut self.state.borrow_mut().dom;
        let node = dom.get_mut_node(target);
        if let ScratchNode::Container(node) = node {
            let to_add: Vec<(String, String)> = attrs
                .iter()
                .filter_map(|attr| {
                    let attr_name = attr.name.local.as_ref();
                    if node.attrs.iter().any(|(name, _)| name == attr_name) {
                        None
                    } else {
                        Some((
                            attr_name.to_owned(),
                            attr.value.as_ref().to_owned(),
                        ))
                    }
                })
                .collect();
            node.attrs.extend(to_add);
        } else {
            panic!("Non-element passed to add_attrs_if_missing!");
        }
    }

    fn associate_with_form(
        &self,
        _target: &Self::Handle,
        _form: &Self::Handle,
        _nodes: (&Self::Handle, Option<&Self::Handle>),
    ) {
        // Forms are stripped later; the association is irrelevant.
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        if let Some(parent) = self.parent_of(target) {
            let dom = &mut self.state.borrow_mut().dom;
            match dom.get_mut_node(&parent) {
                ScratchNode::Container(c) => {
                    c.children.retain(|h| h != target)
                }
                ScratchNode::Document(d) => {
                    d.children.retain(|h| h != target)
                }
                _ => {}
            }
        }
    }

    fn reparent_children(
        &self,
        node: &Self::Handle,
        new_parent: &Self::Handle,
    ) {
        let dom = &mut self.state.borrow_mut().dom;
        let moved = match dom.get_mut_node(node) {
            ScratchNode::Container(c) => std::mem::take(&mut c.children),
            ScratchNode::Document(d) => std::mem::take(&mut d.children),
            _ => Vec::new(),
        };
        match dom.get_mut_node(new_parent) {
            ScratchNode::Container(c) => c.children.extend(moved),
            ScratchNode::Document(d) => d.children.extend(moved),
            _ => panic!("reparenting into a leaf!"),
        }
    }

    fn is_mathml_annotation_xml_integration_point(
        &self,
        _handle: &Self::Handle,
    ) -> bool {
        false
    }

    fn set_current_line(&self, _line_number: u64) {
        // Nothing to do here for now.
    }

    fn complete_script(&self, _node: &Self::Handle) -> NextParserState {
        NextParserState::Continue
    }

    fn allow_declarative_shadow_roots(
        &self,
        _intended_parent: &Self::Handle,
    ) -> bool {
        false
    }

    fn attach_declarative_shadow(
        &self,
        _location: &Self::Handle,
        _template: &Self::Handle,
        _attrs: Vec<Attribute>,
    ) -> Result<(), String> {
        Err(String::from("declarative shadow roots are not supported"))
    }
}

/// Materialize clipboard HTML into a scratch container.
///
/// Parse notices (common for clipboard junk) are logged and the partially
/// built dom is used as-is; a node the tree builder could not place
/// cleanly still ends up somewhere reachable rather than aborting the
/// whole paste.
pub fn parse(html: &str) -> ScratchDom {
    match ScratchBuilder::parse(html) {
        Ok(dom) => dom,
        Err(err) => {
            log::debug!(
                target: "pastekit.dom",
                "recovered scratch dom with {} parse notice(s)",
                err.parse_errors.len()
            );
            err.dom
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::scratch::ScratchNode;
    use super::*;

    /// Tags of the top level nodes, text rendered as `"text"`.
    fn top_level(dom: &ScratchDom) -> Vec<String> {
        dom.top_level_children()
            .iter()
            .map(|handle| match dom.get_node(handle) {
                ScratchNode::Container(c) => c.tag().to_owned(),
                ScratchNode::Text(t) => format!("{:?}", t.content),
                ScratchNode::Comment(_) => "#comment".to_owned(),
                ScratchNode::Document(_) => "#document".to_owned(),
            })
            .collect()
    }

    #[test]
    fn parsing_an_empty_string_creates_an_empty_dom() {
        assert!(top_level(&parse("")).is_empty());
    }

    #[test]
    fn parsing_a_text_snippet_creates_one_text_node() {
        assert_eq!(top_level(&parse("foo")), vec!["\"foo\""]);
    }

    #[test]
    fn parsing_two_tags_creates_two_containers() {
        assert_eq!(top_level(&parse("<i></i><b></b>")), vec!["i", "b"]);
    }

    #[test]
    fn nested_structures_are_preserved() {
        let dom = parse("A<i>B<b>C</b>D</i>E");
        assert_eq!(top_level(&dom), vec!["\"A\"", "i", "\"E\""]);
        let i_handle = &dom.top_level_children()[1];
        assert_eq!(dom.text_content(i_handle), "BCD");
    }

    #[test]
    fn attributes_are_preserved() {
        let dom = parse("<a href='https://example.org' id='x'>txt</a>");
        let a = &dom.top_level_children()[0];
        let ScratchNode::Container(c) = dom.get_node(a) else {
            panic!("expected a container");
        };
        assert_eq!(c.get_attr("href"), Some("https://example.org"));
        assert_eq!(c.get_attr("id"), Some("x"));
        assert_eq!(c.get_attr("class"), None);
    }

    #[test]
    fn escaped_entities_are_decoded_into_text() {
        let dom = parse("aaa&lt;strong&gt;bbb&lt;/strong&gt;ccc");
        assert_eq!(
            top_level(&dom),
            vec!["\"aaa<strong>bbb</strong>ccc\""]
        );
    }

    #[test]
    fn comments_become_comment_nodes() {
        assert_eq!(
            top_level(&parse("<!-- hi --><p>x</p>")),
            vec!["#comment", "p"]
        );
    }

    #[test]
    fn unterminated_markup_still_yields_a_dom() {
        let dom = parse("<ul><li>one<li>two");
        let ul = &dom.top_level_children()[0];
        assert_eq!(dom.text_content(ul), "onetwo");
    }
}
