//! Conversation state carried between messages of one chat.

use serde::{Deserialize, Serialize};

use crate::generation::RecommendationPair;

/// Kind of picture requested in the image flow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageType {
    Standard,
    Contour,
}

/// The step a chat is on, with exactly the data that step needs
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum DialogueState {
    #[default]
    MainMenu,
    GradeSelect,
    SubjectSelect {
        grade: u8,
    },
    AwaitingAnswer {
        correct: String,
        subject: String,
        grade: u8,
    },
    RecommendationChoice {
        subject: String,
        /// `None` when the loop started from a free-text topic
        grade: Option<u8>,
        prior: RecommendationPair,
    },
    TopicExplainInput,
    ImageTypeSelect,
    StyleSelect,
    AwaitingImagePrompt {
        style: String,
        image_type: ImageType,
        negative_prompt: Option<String>,
    },
    CalculatorInput {
        expression: String,
    },
}

impl DialogueState {
    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            DialogueState::MainMenu => "MainMenu",
            DialogueState::GradeSelect => "GradeSelect",
            DialogueState::SubjectSelect { .. } => "SubjectSelect",
            DialogueState::AwaitingAnswer { .. } => "AwaitingAnswer",
            DialogueState::RecommendationChoice { .. } => "RecommendationChoice",
            DialogueState::TopicExplainInput => "TopicExplainInput",
            DialogueState::ImageTypeSelect => "ImageTypeSelect",
            DialogueState::StyleSelect => "StyleSelect",
            DialogueState::AwaitingImagePrompt { .. } => "AwaitingImagePrompt",
            DialogueState::CalculatorInput { .. } => "CalculatorInput",
        }
    }

    pub fn is_main_menu(&self) -> bool {
        matches!(self, DialogueState::MainMenu)
    }
}
