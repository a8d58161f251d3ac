//! Delimiter-encoded payloads produced by the model: quiz questions and
//! recommendation pairs.

use serde::{Deserialize, Serialize};

use crate::localization::t;

/// Separator between fields of structured model output
pub const FIELD_DELIMITER: char = '_';

const QUESTION_FIELDS: usize = 6;
const ANSWER_NUMBERS: [&str; 4] = ["1", "2", "3", "4"];

/// True when `text` is `question_a1_a2_a3_a4_n` with `n` in 1..=4
pub fn is_valid_question(text: &str) -> bool {
    let parts: Vec<&str> = text.split(FIELD_DELIMITER).collect();
    parts.len() == QUESTION_FIELDS && ANSWER_NUMBERS.contains(&parts[5])
}

/// True when `text` splits into exactly two topics
pub fn is_valid_recommendation(text: &str) -> bool {
    text.split(FIELD_DELIMITER).count() == 2
}

/// A multiple-choice quiz question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub answers: [String; 4],
    /// Index into `answers`, always in 0..=3
    pub correct_index: usize,
}

impl Question {
    /// Parse validated model output, `None` if it does not match the schema
    ///
    /// A blank question or answer is rejected like a malformed one.
    pub fn parse(text: &str) -> Option<Self> {
        if !is_valid_question(text) {
            return None;
        }
        let parts: Vec<&str> = text.split(FIELD_DELIMITER).map(str::trim).collect();
        if parts[..QUESTION_FIELDS - 1].iter().any(|part| part.is_empty()) {
            return None;
        }
        let correct_index = parts[5].parse::<usize>().ok()? - 1;

        Some(Self {
            text: parts[0].to_string(),
            answers: [
                parts[1].to_string(),
                parts[2].to_string(),
                parts[3].to_string(),
                parts[4].to_string(),
            ],
            correct_index,
        })
    }

    pub fn correct_answer(&self) -> &str {
        &self.answers[self.correct_index]
    }
}

/// Two follow-up topics offered as buttons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationPair {
    pub first: String,
    pub second: String,
}

impl RecommendationPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Parse validated model output
    ///
    /// Blank topics are rejected so that a pair never renders an empty button.
    pub fn parse(text: &str) -> Option<Self> {
        if !is_valid_recommendation(text) {
            return None;
        }
        let (first, second) = text.split_once(FIELD_DELIMITER)?;
        let (first, second) = (first.trim(), second.trim());
        if first.is_empty() || second.is_empty() {
            return None;
        }
        Some(Self::new(first, second))
    }

    /// Pair used whenever the model does not produce a usable one
    pub fn fallback() -> Self {
        Self::new(
            t("recommendation-fallback-first"),
            t("recommendation-fallback-second"),
        )
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.first == topic || self.second == topic
    }

    pub fn as_array(&self) -> [&str; 2] {
        [&self.first, &self.second]
    }
}
