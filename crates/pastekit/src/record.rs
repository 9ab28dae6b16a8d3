// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{self, Formatter};

use strum_macros::{Display, EnumString};

use crate::sanitize::sanitize_for_display;

/// Difficulty rating of a stored question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A stored question and its rich-text answer.
///
/// `answer_html` is kept as pasted/processed; it passes the sanitize
/// policy again in [Question::sanitized_answer] whenever it is about to
/// be rendered or exported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub title: String,
    pub answer_html: String,
    pub difficulty: Difficulty,
    pub tags: BTreeSet<String>,
}

impl Question {
    pub fn new(
        title: &str,
        answer_html: &str,
        difficulty: Difficulty,
        tags: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, RecordError> {
        let title = title.trim();
        if title.chars().count() < 5 {
            return Err(RecordError::TitleTooShort { min: 5 });
        }
        let answer_html = answer_html.trim();
        if answer_html.is_empty() {
            return Err(RecordError::MissingAnswer);
        }
        let tags = tags
            .into_iter()
            .map(|tag| tag.as_ref().trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        Ok(Self {
            title: title.to_owned(),
            answer_html: answer_html.to_owned(),
            difficulty,
            tags,
        })
    }

    /// The answer reduced to the display allow-list. Call this at every
    /// point the answer reaches a renderer or an export pipeline.
    pub fn sanitized_answer(&self) -> String {
        sanitize_for_display(&self.answer_html)
    }
}

/// A grouping of questions under one topic, owned by one account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subject {
    pub title: String,
    pub description: String,
    pub owner: String,
}

impl Subject {
    pub fn new(
        title: &str,
        description: &str,
        owner: &str,
    ) -> Result<Self, RecordError> {
        let title = title.trim();
        if !(2..=100).contains(&title.chars().count()) {
            return Err(RecordError::TitleOutOfRange { min: 2, max: 100 });
        }
        let description = description.trim();
        if description.chars().count() > 500 {
            return Err(RecordError::DescriptionTooLong { max: 500 });
        }
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(RecordError::MissingOwner);
        }
        Ok(Self {
            title: title.to_owned(),
            description: description.to_owned(),
            owner: owner.to_owned(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordError {
    TitleTooShort { min: usize },
    TitleOutOfRange { min: usize, max: usize },
    MissingAnswer,
    MissingOwner,
    DescriptionTooLong { max: usize },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::TitleTooShort { min } => {
                write!(f, "Title must be at least {min} characters")
            }
            RecordError::TitleOutOfRange { min, max } => {
                write!(f, "Title must be between {min} and {max} characters")
            }
            RecordError::MissingAnswer => write!(f, "Answer is required"),
            RecordError::MissingOwner => {
                write!(f, "Subject owner is required")
            }
            RecordError::DescriptionTooLong { max } => {
                write!(f, "Description cannot exceed {max} characters")
            }
        }
    }
}

impl Error for RecordError {}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn difficulty_round_trips_through_its_name() {
        assert_eq!(Difficulty::Medium.to_string(), "Medium");
        assert_eq!(Difficulty::from_str("Hard"), Ok(Difficulty::Hard));
        assert!(Difficulty::from_str("brutal").is_err());
    }

    #[test]
    fn questions_validate_title_and_answer() {
        let err = Question::new("abc", "<p>x</p>", Difficulty::Easy, ["t"])
            .unwrap_err();
        assert_eq!(err, RecordError::TitleTooShort { min: 5 });

        let err = Question::new("Binary search", "  ", Difficulty::Easy, ["t"])
            .unwrap_err();
        assert_eq!(err, RecordError::MissingAnswer);
    }

    #[test]
    fn tags_are_lowercased_deduplicated_and_trimmed() {
        let q = Question::new(
            "Binary search",
            "<p>x</p>",
            Difficulty::Easy,
            [" Arrays", "arrays", "Sorting "],
        )
        .unwrap();
        let tags: Vec<&str> = q.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["arrays", "sorting"]);
    }

    #[test]
    fn the_answer_is_sanitized_before_display() {
        let q = Question::new(
            "Binary search",
            "<p>ok</p><script>alert(1)</script>",
            Difficulty::Hard,
            Vec::<String>::new(),
        )
        .unwrap();
        assert_eq!(q.sanitized_answer(), "<p>ok</p>");
    }

    #[test]
    fn subjects_validate_their_lengths() {
        assert!(Subject::new("Algorithms", "short notes", "user-1").is_ok());
        assert_eq!(
            Subject::new("A", "", "user-1").unwrap_err(),
            RecordError::TitleOutOfRange { min: 2, max: 100 }
        );
        let long = "d".repeat(501);
        assert_eq!(
            Subject::new("Algorithms", &long, "user-1").unwrap_err(),
            RecordError::DescriptionTooLong { max: 500 }
        );
    }

    #[test]
    fn subjects_require_an_owner() {
        assert_eq!(
            Subject::new("Algorithms", "notes", "  ").unwrap_err(),
            RecordError::MissingOwner
        );
        let subject = Subject::new("Algorithms", "notes", " user-1 ").unwrap();
        assert_eq!(subject.owner, "user-1");
    }
}
