// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use once_cell::sync::Lazy;
use regex::Regex;

/// The structural role assigned to a single line of plain text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Empty,
    Heading,
    Subheading,
    Bullet,
    Ordered,
    CodeFence,
    CodeLine,
    Paragraph,
}

/// One classified line. `kind` fully determines how `content` is escaped
/// and wrapped by the assembler; `content` never contains markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub kind: LineKind,
    pub content: String,
}

impl ClassifiedLine {
    fn new(kind: LineKind, content: impl Into<String>) -> Self {
        Self { kind, content: content.into() }
    }
}

static ALL_CAPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z\s]+$").unwrap());
static SUBHEAD_LEAD_IN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(definition:|what is|introduction:|overview:|note:|important:)")
        .unwrap()
});
static BULLET_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-•*→]\s+").unwrap());
static BULLET_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-•*→]\s*").unwrap());
static ORDERED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s+").unwrap());
static ORDERED_NUMBER_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*").unwrap());
static ORDERED_STEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^step\s+\d+[:.]\s*").unwrap());
static ORDERED_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(first|second|third|fourth|fifth|firstly|secondly)[,:\s]")
        .unwrap()
});
static CODE_INDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^( {4,}|\t)").unwrap());
static CODE_SHAPES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"function\s+\w+\(",
        r"const\s+\w+\s*=",
        r"let\s+\w+\s*=",
        r"var\s+\w+\s*=",
        r"class\s+\w+",
        r"def\s+\w+\(",
        r"public\s+(static\s+)?void",
        r"import\s+",
        r#"from\s+['"]"#,
        r"return\s+",
        r"\{.*\}.*\{.*\}",
        r"\w+\(.*\)\s*\{",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Classify each input line in a single pass with one line of lookahead.
///
/// Rules are evaluated first-match-wins in the order: empty, heading,
/// subheading, code fence, bullet, ordered item, code line, paragraph.
/// Inside an open code fence every line is passed through verbatim as a
/// `CodeLine` so the assembler can preserve it untouched.
pub fn classify(lines: &[&str]) -> Vec<ClassifiedLine> {
    let mut out = Vec::with_capacity(lines.len());
    let mut in_fence = false;

    for (i, raw) in lines.iter().enumerate() {
        let trimmed = raw.trim();

        if in_fence {
            if is_code_fence(trimmed) {
                in_fence = false;
                out.push(ClassifiedLine::new(LineKind::CodeFence, ""));
            } else {
                // Verbatim, untrimmed: fenced content keeps its indentation.
                out.push(ClassifiedLine::new(LineKind::CodeLine, *raw));
            }
            continue;
        }

        let next = lines.get(i + 1).copied();
        let line = if trimmed.is_empty() {
            ClassifiedLine::new(LineKind::Empty, "")
        } else if is_heading(trimmed, next) {
            ClassifiedLine::new(LineKind::Heading, trimmed)
        } else if is_subheading(trimmed) {
            ClassifiedLine::new(
                LineKind::Subheading,
                trimmed.strip_suffix(':').unwrap_or(trimmed),
            )
        } else if is_code_fence(trimmed) {
            in_fence = true;
            ClassifiedLine::new(LineKind::CodeFence, "")
        } else if BULLET_MARKER.is_match(trimmed) {
            ClassifiedLine::new(
                LineKind::Bullet,
                BULLET_STRIP.replace(trimmed, "").into_owned(),
            )
        } else if is_ordered_item(trimmed) {
            ClassifiedLine::new(LineKind::Ordered, strip_ordered_marker(trimmed))
        } else if is_code_line(raw, trimmed) {
            ClassifiedLine::new(LineKind::CodeLine, trimmed)
        } else {
            ClassifiedLine::new(LineKind::Paragraph, trimmed)
        };
        out.push(line);
    }

    out
}

/// Heading test, rule order: (a) ALL-CAPS multi-word line, (b) short
/// standalone line whose following line is not itself heading-shaped,
/// (c) short colon-terminated line. Lines carrying a list or fence
/// marker are never heading text; rule (b) must not swallow them before
/// the list rules get a look.
fn is_heading(line: &str, next: Option<&str>) -> bool {
    let words = line.split_whitespace().count();

    if words >= 2 && ALL_CAPS.is_match(line) {
        return true;
    }

    if (2..=6).contains(&words)
        && !line.ends_with('.')
        && !has_list_or_fence_marker(line)
    {
        // One line of lookahead: two consecutive short lines cannot both
        // qualify, and a short line at end of input is left to later rules.
        if let Some(next) = next {
            let next = next.trim();
            if next.is_empty() || !is_heading_shaped(next) {
                return true;
            }
        }
    }

    line.ends_with(':') && line.chars().count() < 60 && words <= 8
}

/// Shallow version of the heading test used for lookahead only.
fn is_heading_shaped(line: &str) -> bool {
    let words = line.split_whitespace().count();
    (words >= 2 && ALL_CAPS.is_match(line))
        || ((2..=6).contains(&words)
            && !line.ends_with('.')
            && !has_list_or_fence_marker(line))
        || (line.ends_with(':') && line.chars().count() < 60 && words <= 8)
}

fn has_list_or_fence_marker(line: &str) -> bool {
    BULLET_MARKER.is_match(line)
        || ORDERED_NUMBER.is_match(line)
        || ORDERED_STEP.is_match(line)
        || is_code_fence(line)
}

fn is_subheading(line: &str) -> bool {
    (line.ends_with(':') && line.chars().count() < 80)
        || SUBHEAD_LEAD_IN.is_match(line)
}

fn is_code_fence(line: &str) -> bool {
    line.starts_with("```") || line.starts_with("~~~")
}

fn is_ordered_item(line: &str) -> bool {
    ORDERED_NUMBER.is_match(line)
        || ORDERED_STEP.is_match(line)
        || ORDERED_WORD.is_match(line)
}

/// Strip the `1.` / `Step 1:` marker. Ordinal words (`First,` ...) are
/// detected as items but read as prose, so they are kept.
fn strip_ordered_marker(line: &str) -> String {
    let stripped = ORDERED_NUMBER_STRIP.replace(line, "");
    ORDERED_STEP.replace(&stripped, "").into_owned()
}

fn is_code_line(raw: &str, trimmed: &str) -> bool {
    CODE_INDENT.is_match(raw)
        || CODE_SHAPES.iter().any(|shape| shape.is_match(trimmed))
}
