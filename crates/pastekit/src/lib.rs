// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Paste processing for rich-text note editors.
//!
//! Clipboard payloads arrive as some mix of `text/html` and
//! `text/plain`. This crate turns either into clean semantic HTML:
//! plain text is classified line by line and assembled into blocks,
//! HTML is parsed into a scratch container, reduced to a fixed
//! vocabulary and structurally normalized. A [PasteProcessor] routes a
//! payload through the right path per paste mode, and a shared
//! [SanitizePolicy] guards everything that later reaches a renderer.

pub mod assemble;
pub mod classify;
pub mod clean;
pub mod dom;
pub mod escape;
pub mod paste;
pub mod record;
pub mod sanitize;

pub use crate::assemble::assemble;
pub use crate::classify::{classify, ClassifiedLine, LineKind};
pub use crate::clean::clean;
pub use crate::dom::{extract_structure, parse, ScratchDom};
pub use crate::escape::{escape, escape_attribute};
pub use crate::paste::{
    process_plain_text, route, structure_plain_text, PasteMode,
    PasteProcessor,
};
pub use crate::record::{Difficulty, Question, RecordError, Subject};
pub use crate::sanitize::{sanitize, sanitize_for_display, SanitizePolicy};
