// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::classify::{ClassifiedLine, LineKind};
use crate::escape::escape;

/// Block context of the assembler state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockState {
    None,
    InBulletList,
    InOrderedList,
    InCodeBlock,
}

/// Assemble classified lines into a well-nested HTML string.
///
/// Single forward pass. Every opened list or code block is closed before
/// the function returns, and an unterminated code fence still flushes its
/// buffer so no content is dropped.
pub fn assemble(lines: &[ClassifiedLine]) -> String {
    Assembler::new().run(lines)
}

struct Assembler {
    state: BlockState,
    fragments: Vec<String>,
    code_buffer: Vec<String>,
    last_kind: Option<LineKind>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            state: BlockState::None,
            fragments: Vec::new(),
            code_buffer: Vec::new(),
            last_kind: None,
        }
    }

    fn run(mut self, lines: &[ClassifiedLine]) -> String {
        for line in lines {
            if self.state == BlockState::InCodeBlock {
                if line.kind == LineKind::CodeFence {
                    self.flush_code_block();
                } else {
                    // Whatever the classifier said, fenced content is kept
                    // verbatim (escaped).
                    self.code_buffer.push(escape(&line.content).into_owned());
                }
                continue;
            }

            match line.kind {
                LineKind::Empty => {
                    self.close_list();
                    // No spacing right after a list close or at the start.
                    if self
                        .fragments
                        .last()
                        .is_some_and(|f| !f.ends_with("</ul>") && !f.ends_with("</ol>"))
                    {
                        self.fragments.push("<br>".into());
                    }
                }
                LineKind::Heading => self.push_block("h2", &line.content),
                LineKind::Subheading => self.push_block("h3", &line.content),
                LineKind::CodeFence => {
                    self.close_list();
                    self.state = BlockState::InCodeBlock;
                }
                LineKind::Bullet => {
                    self.push_list_item(BlockState::InBulletList, "<ul>", &line.content)
                }
                LineKind::Ordered => {
                    self.push_list_item(BlockState::InOrderedList, "<ol>", &line.content)
                }
                LineKind::CodeLine => {
                    self.close_list();
                    self.fragments.push(format!(
                        "<pre><code>{}</code></pre>",
                        escape(&line.content)
                    ));
                }
                LineKind::Paragraph => {
                    self.close_list();
                    self.push_paragraph(&line.content);
                }
            }
            self.last_kind = Some(line.kind);
        }

        if self.state == BlockState::InCodeBlock {
            // Unterminated fence: flush rather than drop the buffer.
            self.flush_code_block();
        }
        self.close_list();
        self.fragments.concat()
    }

    fn push_block(&mut self, tag: &str, content: &str) {
        self.close_list();
        self.fragments
            .push(format!("<{tag}>{}</{tag}>", escape(content)));
    }

    fn push_list_item(&mut self, list: BlockState, open_tag: &str, content: &str) {
        if self.state != list {
            self.close_list();
            self.fragments.push(open_tag.into());
            self.state = list;
        }
        self.fragments
            .push(format!("<li>{}</li>", escape(content)));
    }

    /// Consecutive paragraph lines merge into one `<p>`, space-joined.
    fn push_paragraph(&mut self, content: &str) {
        if self.last_kind == Some(LineKind::Paragraph) {
            if let Some(last) = self.fragments.last_mut() {
                if let Some(body) = last.strip_suffix("</p>") {
                    *last = format!("{body} {}</p>", escape(content));
                    return;
                }
            }
        }
        self.fragments.push(format!("<p>{}</p>", escape(content)));
    }

    fn close_list(&mut self) {
        match self.state {
            BlockState::InBulletList => self.fragments.push("</ul>".into()),
            BlockState::InOrderedList => self.fragments.push("</ol>".into()),
            BlockState::None | BlockState::InCodeBlock => return,
        }
        self.state = BlockState::None;
    }

    fn flush_code_block(&mut self) {
        self.fragments.push(format!(
            "<pre><code>{}</code></pre>",
            self.code_buffer.join("\n")
        ));
        self.code_buffer.clear();
        self.state = BlockState::None;
    }
}
