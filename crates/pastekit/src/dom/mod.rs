// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

pub mod builder;
pub mod extract;
pub mod scratch;

pub use builder::parse;
pub use extract::extract_structure;
pub use scratch::ScratchDom;

use html5ever::{namespace_url, ns, LocalName, QualName};

pub(crate) fn qual_name(name: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(name))
}
