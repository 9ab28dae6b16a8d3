// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::cell::Cell;

use once_cell::sync::Lazy;
use regex::Regex;
use strum_macros::{Display, EnumString};

use crate::assemble::assemble;
use crate::classify::classify;
use crate::clean::clean;
use crate::dom::{extract_structure, parse};
use crate::escape::escape;

/// How a paste should be interpreted.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum PasteMode {
    /// Pick the best strategy from the payload itself.
    #[default]
    Smart,
    /// Trust the HTML payload when one exists.
    Formatted,
    /// Ignore HTML entirely.
    Plain,
}

impl PasteMode {
    /// Human readable label, as shown in a mode picker.
    pub fn label(&self) -> &'static str {
        match self {
            PasteMode::Smart => "Smart Paste",
            PasteMode::Formatted => "Keep Formatting",
            PasteMode::Plain => "Plain Text",
        }
    }
}

static SEMANTIC_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(p|h[1-6]|ul|ol|li|pre|code|blockquote|strong|em)\b")
        .unwrap()
});

static STRUCTURE_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?m)^\s*[-•*→]\s+",     // bullet lines
        r"(?m)^\s*\d+\.\s+",      // numbered lines
        r"(?im)^step\s+\d+[:.]",  // step sequences
        r"(?m)^[A-Z\s]{10,}$",    // long ALL-CAPS line
        r"(?m)^.{1,60}:$",        // short colon-terminated line
        r"```",                   // code fence
        r"(?m)^[ \t]{4,}\S",      // deep indent
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Dispatches clipboard payloads through one of the processing paths and
/// guards its scratch parsing state against overlapping paste events.
///
/// The processor itself holds no document state; the guard only exists
/// because a second paste arriving while the first is still mutating the
/// scratch container must be ignored, not interleaved.
pub struct PasteProcessor {
    in_flight: Cell<bool>,
}

impl PasteProcessor {
    pub fn new() -> Self {
        Self {
            in_flight: Cell::new(false),
        }
    }

    /// Process one paste event. Returns HTML ready for insertion;
    /// insertion and cursor placement stay with the caller.
    ///
    /// A paste arriving while another is in flight returns an empty
    /// string and the caller performs no insertion.
    pub fn process(
        &self,
        html: Option<&str>,
        text: Option<&str>,
        mode: PasteMode,
    ) -> String {
        if self.in_flight.replace(true) {
            log::warn!(
                target: "pastekit.paste",
                "paste ignored: a previous paste is still in flight"
            );
            return String::new();
        }
        let _guard = InFlightGuard(&self.in_flight);
        route(html, text, mode)
    }
}

impl Default for PasteProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a Cell<bool>);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Route one clipboard payload to a processing path. Empty payloads are
/// treated as absent; with neither payload the result is empty and the
/// caller performs no insertion.
pub fn route(
    html: Option<&str>,
    text: Option<&str>,
    mode: PasteMode,
) -> String {
    let html = html.filter(|h| !h.trim().is_empty());
    let text = text.filter(|t| !t.trim().is_empty());

    match mode {
        PasteMode::Plain => structure_plain_text(text.unwrap_or("")),
        PasteMode::Formatted => match html {
            Some(html) => process_html(html),
            None => structure_plain_text(text.unwrap_or("")),
        },
        PasteMode::Smart => smart_process(html, text),
    }
}

fn smart_process(html: Option<&str>, text: Option<&str>) -> String {
    if let Some(html) = html {
        if is_well_formed_html(html) {
            log::debug!(target: "pastekit.paste", "smart paste: html path");
            return process_html(html);
        }
    }
    let Some(text) = text else {
        return String::new();
    };
    if has_structure_markers(text) {
        log::debug!(target: "pastekit.paste", "smart paste: structuring path");
        structure_plain_text(text)
    } else {
        process_plain_text(text)
    }
}

fn process_html(html: &str) -> String {
    clean(&extract_structure(&parse(html)))
}

/// Heuristic structuring of plain text: classify each line, then
/// assemble the block structure.
pub fn structure_plain_text(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    assemble(&classify(&lines))
}

/// Naive conversion: blank-line separated blocks become paragraphs, no
/// heading or list inference.
pub fn process_plain_text(text: &str) -> String {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                out.push(format!("<p>{}</p>", escape(&current.join(" "))));
                current.clear();
            }
        } else {
            current.push(trimmed);
        }
    }
    if !current.is_empty() {
        out.push(format!("<p>{}</p>", escape(&current.join(" "))));
    }
    out.concat()
}

/// HTML is worth keeping when it carries at least one semantic tag and
/// is not merely a wrapper div around unstructured text.
fn is_well_formed_html(html: &str) -> bool {
    let has_semantic_tags = SEMANTIC_TAG.is_match(html);
    let trimmed = html.trim();
    let wrapper_div_only = trimmed.starts_with("<div")
        && trimmed.ends_with("</div>")
        && !has_semantic_tags;
    has_semantic_tags && !wrapper_div_only
}

fn has_structure_markers(text: &str) -> bool {
    STRUCTURE_MARKERS.iter().any(|marker| marker.is_match(text))
}
