//! Pure state transition function
//!
//! Given the current step, what the service layer can offer and one event,
//! `transition` returns the next step, the messages to send and at most one
//! request to a remote service. The result of that request comes back as the
//! next event. No I/O happens here.

use tracing::debug;

use super::render::{self, Outbound, OutboundText};
use super::state::{DialogueState, ImageType};
use crate::calculator::{evaluate, format_number};
use crate::errors::{CalculatorError, GenerationError, ImageError, TransitionError};
use crate::generation::{Question, RecommendationPair};
use crate::image_gen::{ImageRequest, DEFAULT_STYLE};
use crate::localization::{t, t_args};
use crate::subjects::{is_valid_subject, parse_grade_token, GradeToken};

/// Slash commands that behave like the home button
const RESET_COMMANDS: [&str; 2] = ["/start", "/help"];

/// Grade used by the recommendation loop entered from the main-menu explain flow
pub const EXPLAIN_LOOP_GRADE: u8 = 5;

/// What the service layer offers to the conversation
#[derive(Debug, Clone, Default)]
pub struct DialogueContext {
    pub image_available: bool,
    pub styles: Vec<String>,
}

/// Inputs to the state machine
#[derive(Debug, Clone)]
pub enum Event {
    /// A text message from the user
    Text(String),
    QuestionGenerated {
        subject: String,
        result: Result<Question, GenerationError>,
    },
    ExplanationGenerated {
        topic: String,
        result: Result<String, GenerationError>,
    },
    RecommendationsFetched {
        topic: String,
        pair: RecommendationPair,
    },
    /// PNG bytes of a finished image
    ImageGenerated(Result<Vec<u8>, ImageError>),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Text(_) => "Text",
            Event::QuestionGenerated { .. } => "QuestionGenerated",
            Event::ExplanationGenerated { .. } => "ExplanationGenerated",
            Event::RecommendationsFetched { .. } => "RecommendationsFetched",
            Event::ImageGenerated(_) => "ImageGenerated",
        }
    }
}

/// Remote work requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Question { grade: u8, subject: String },
    Explanation { topic: String, grade: Option<u8> },
    Recommendations { topic: String },
    Image(ImageRequest),
}

/// Result of a state transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: DialogueState,
    pub outbound: Vec<Outbound>,
    pub request: Option<Request>,
}

impl Transition {
    pub fn to(state: DialogueState) -> Self {
        Self {
            state,
            outbound: vec![],
            request: None,
        }
    }

    pub fn send(mut self, message: OutboundText) -> Self {
        self.outbound.push(Outbound::Text(message));
        self
    }

    pub fn send_all(mut self, messages: impl IntoIterator<Item = OutboundText>) -> Self {
        self.outbound
            .extend(messages.into_iter().map(Outbound::Text));
        self
    }

    pub fn send_image(mut self, png: Vec<u8>) -> Self {
        self.outbound.push(Outbound::Image(png));
        self
    }

    pub fn request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Texts of the outbound messages, images skipped
    pub fn texts(&self) -> Vec<&str> {
        self.outbound
            .iter()
            .filter_map(|outbound| match outbound {
                Outbound::Text(message) => Some(message.text.as_str()),
                Outbound::Image(_) => None,
            })
            .collect()
    }
}

pub fn is_home(text: &str) -> bool {
    text == t("button-home") || RESET_COMMANDS.contains(&text)
}

fn go_home() -> Transition {
    Transition::to(DialogueState::MainMenu).send(render::welcome())
}

fn image_unavailable() -> Transition {
    Transition::to(DialogueState::MainMenu)
        .send(render::image_unavailable())
        .send(render::welcome())
}

/// Pure transition function
pub fn transition(
    state: &DialogueState,
    context: &DialogueContext,
    event: Event,
) -> Result<Transition, TransitionError> {
    match (state, event) {
        (_, Event::Text(text)) => Ok(on_text(state, context, &text)),

        // Quiz question arrived
        (DialogueState::SubjectSelect { grade }, Event::QuestionGenerated { subject, result }) => {
            Ok(match result {
                Ok(question) => Transition::to(DialogueState::AwaitingAnswer {
                    correct: question.correct_answer().to_string(),
                    subject: subject.clone(),
                    grade: *grade,
                })
                .send(render::question(&question, &subject, *grade)),
                Err(_) => Transition::to(DialogueState::MainMenu)
                    .send(render::notice("quiz-generation-failed"))
                    .send(render::welcome()),
            })
        }

        // Recommendations after a quiz answer
        (
            DialogueState::AwaitingAnswer { subject, grade, .. },
            Event::RecommendationsFetched { pair, .. },
        ) => Ok(Transition::to(DialogueState::RecommendationChoice {
            subject: subject.clone(),
            grade: Some(*grade),
            prior: pair.clone(),
        })
        .send(render::recommendations(&pair))),

        // Explanation inside the recommendation loop, errors keep the loop going
        (
            DialogueState::RecommendationChoice { .. },
            Event::ExplanationGenerated { topic, result },
        ) => {
            let messages = match result {
                Ok(text) => render::explanation(&text),
                Err(e) => vec![render::error_notice(&render::generation_error_cause(&e))],
            };
            Ok(Transition::to(state.clone())
                .send_all(messages)
                .request(Request::Recommendations { topic }))
        }

        (
            DialogueState::RecommendationChoice { subject, grade, .. },
            Event::RecommendationsFetched { pair, .. },
        ) => Ok(Transition::to(DialogueState::RecommendationChoice {
            subject: subject.clone(),
            grade: *grade,
            prior: pair.clone(),
        })
        .send(render::recommendations(&pair))),

        // Explanation of a free-text topic from the main menu
        (DialogueState::TopicExplainInput, Event::ExplanationGenerated { topic, result }) => {
            Ok(match result {
                Ok(text) => Transition::to(DialogueState::TopicExplainInput)
                    .send_all(render::explanation(&text))
                    .request(Request::Recommendations { topic }),
                Err(e) => Transition::to(DialogueState::MainMenu)
                    .send(render::error_notice(&render::generation_error_cause(&e)))
                    .send(render::welcome()),
            })
        }

        (DialogueState::TopicExplainInput, Event::RecommendationsFetched { topic, pair }) => {
            Ok(Transition::to(DialogueState::RecommendationChoice {
                subject: topic,
                grade: Some(EXPLAIN_LOOP_GRADE),
                prior: pair.clone(),
            })
            .send(render::recommendations(&pair)))
        }

        (DialogueState::AwaitingImagePrompt { image_type, .. }, Event::ImageGenerated(result)) => {
            Ok(match result {
                Ok(png) => {
                    let done = Transition::to(DialogueState::MainMenu)
                        .send_image(png)
                        .send(render::image_ready());
                    if *image_type == ImageType::Contour {
                        done.send(render::contour_tip())
                    } else {
                        done
                    }
                }
                Err(e) => Transition::to(DialogueState::MainMenu).send(render::image_failed(&e)),
            })
        }

        (state, event) => Err(TransitionError::UnexpectedEvent {
            state: state.name().to_string(),
            event: event.name().to_string(),
        }),
    }
}

fn on_text(state: &DialogueState, context: &DialogueContext, text: &str) -> Transition {
    // Global override, checked before any step-specific handling
    if is_home(text) {
        return go_home();
    }

    match state {
        DialogueState::MainMenu | DialogueState::GradeSelect | DialogueState::ImageTypeSelect => {
            menu_input(context, text)
        }
        DialogueState::SubjectSelect { grade } => subject_input(*grade, text),
        DialogueState::AwaitingAnswer {
            correct, subject, ..
        } => Transition::to(state.clone())
            .send(render::answer_feedback(text, correct))
            .request(Request::Recommendations {
                topic: subject.clone(),
            }),
        DialogueState::RecommendationChoice { grade, prior, .. } => {
            debug!(
                from_recommendation = prior.contains(text),
                "Explaining topic from the recommendation loop"
            );
            Transition::to(state.clone())
                .send(OutboundText::plain(t_args(
                    "explain-preparing",
                    &[("topic", text)],
                )))
                .request(Request::Explanation {
                    topic: text.to_string(),
                    grade: *grade,
                })
        }
        DialogueState::TopicExplainInput => Transition::to(DialogueState::TopicExplainInput)
            .send(OutboundText::plain(t_args(
                "explain-searching",
                &[("topic", text)],
            )))
            .request(Request::Explanation {
                topic: text.to_string(),
                grade: None,
            }),
        DialogueState::StyleSelect => style_input(context, text),
        DialogueState::AwaitingImagePrompt {
            style,
            image_type,
            negative_prompt,
        } => image_prompt_input(context, state, style, *image_type, negative_prompt, text),
        DialogueState::CalculatorInput { expression } => calculator_input(expression, text),
    }
}

/// Buttons that work whenever no free-text step is active
fn menu_input(context: &DialogueContext, text: &str) -> Transition {
    if text == t("menu-quiz") {
        return Transition::to(DialogueState::GradeSelect).send(render::grade_prompt());
    }
    if text == t("menu-explain") {
        return Transition::to(DialogueState::TopicExplainInput).send(render::topic_prompt());
    }
    if text == t("menu-calculator") {
        return Transition::to(DialogueState::CalculatorInput {
            expression: String::new(),
        })
        .send(render::calculator(""));
    }
    if text == t("menu-about") {
        return Transition::to(DialogueState::MainMenu).send(render::about());
    }
    if text == t("menu-image") {
        if !context.image_available {
            return image_unavailable();
        }
        return Transition::to(DialogueState::ImageTypeSelect).send(render::image_type_prompt());
    }

    if let Some(token) = parse_grade_token(text) {
        return match token {
            GradeToken::Valid(grade) => Transition::to(DialogueState::SubjectSelect { grade })
                .send(render::subject_prompt(grade)),
            GradeToken::OutOfRange => Transition::to(DialogueState::MainMenu)
                .send(render::notice("quiz-invalid-grade"))
                .send(render::welcome()),
        };
    }

    if text == t("image-standard") || text == t("image-contour") {
        if !context.image_available {
            return image_unavailable();
        }
        let (image_type, negative_prompt) = if text == t("image-contour") {
            (ImageType::Contour, Some(t("image-contour-negative")))
        } else {
            (ImageType::Standard, None)
        };
        return Transition::to(DialogueState::AwaitingImagePrompt {
            style: DEFAULT_STYLE.to_string(),
            image_type,
            negative_prompt,
        })
        .send(render::image_describe());
    }
    if text == t("image-style-button") {
        if !context.image_available {
            return image_unavailable();
        }
        return Transition::to(DialogueState::StyleSelect)
            .send(render::style_prompt(&context.styles));
    }

    Transition::to(DialogueState::MainMenu).send(render::unknown_input())
}

fn subject_input(grade: u8, subject: &str) -> Transition {
    if !is_valid_subject(grade, subject) {
        return Transition::to(DialogueState::GradeSelect)
            .send(render::notice("quiz-invalid-subject"))
            .send(render::grade_prompt());
    }

    Transition::to(DialogueState::SubjectSelect { grade })
        .send(render::notice("quiz-generating"))
        .request(Request::Question {
            grade,
            subject: subject.to_string(),
        })
}

fn style_input(context: &DialogueContext, style: &str) -> Transition {
    if !context.image_available {
        return image_unavailable();
    }
    if !context.styles.iter().any(|s| s == style) {
        return Transition::to(DialogueState::ImageTypeSelect)
            .send(render::notice("image-invalid-style"))
            .send(render::image_type_prompt());
    }

    Transition::to(DialogueState::AwaitingImagePrompt {
        style: style.to_string(),
        image_type: ImageType::Standard,
        negative_prompt: None,
    })
    .send(render::style_selected(style))
}

fn image_prompt_input(
    context: &DialogueContext,
    state: &DialogueState,
    style: &str,
    image_type: ImageType,
    negative_prompt: &Option<String>,
    text: &str,
) -> Transition {
    if !context.image_available {
        return image_unavailable();
    }

    let prompt = match image_type {
        ImageType::Contour => t_args("image-contour-prompt", &[("prompt", text)]),
        ImageType::Standard => text.to_string(),
    };
    let request = ImageRequest::new(prompt, style).with_negative_prompt(negative_prompt.clone());

    Transition::to(state.clone())
        .send(render::notice("image-generating"))
        .request(Request::Image(request))
}

fn calculator_input(expression: &str, key: &str) -> Transition {
    if key == t("calculator-exit") {
        return go_home();
    }

    let expression = match key {
        "C" => String::new(),
        "=" => match evaluate(expression) {
            Ok(value) => format_number(value),
            Err(CalculatorError::InvalidExpression(reason)) => {
                return Transition::to(DialogueState::CalculatorInput {
                    expression: String::new(),
                })
                .send(render::error_notice(&render::expression_error_cause(&reason)))
                .send(render::calculator(""));
            }
        },
        _ => format!("{expression}{key}"),
    };

    Transition::to(DialogueState::CalculatorInput {
        expression: expression.clone(),
    })
    .send(render::calculator(&expression))
}
