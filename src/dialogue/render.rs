//! Outbound messages as plain data: text, rendering mode and the reply
//! keyboard attached to it. Nothing here talks to Telegram.

use crate::errors::{ExpressionError, GenerationError, ImageError};
use crate::generation::{Question, RecommendationPair};
use crate::localization::{t, t_args};
use crate::subjects::{grades, subjects_for};

/// Telegram rejects longer messages
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Maximum number of style buttons
const MAX_STYLE_BUTTONS: usize = 10;

const CALCULATOR_KEYS: [&str; 16] = [
    "7", "8", "9", "/", "4", "5", "6", "*", "1", "2", "3", "-", "0", ".", "=", "+",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    Html,
}

/// Rows of reply buttons shown under the input field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
}

impl ReplyKeyboard {
    /// Lay buttons out `per_row` to a row
    pub fn grid<I, S>(buttons: I, per_row: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buttons: Vec<String> = buttons.into_iter().map(Into::into).collect();
        let rows = buttons
            .chunks(per_row.max(1))
            .map(|row| row.to_vec())
            .collect();
        Self { rows }
    }

    /// Append the home button on its own row
    pub fn with_home(mut self) -> Self {
        self.rows.push(vec![t("button-home")]);
        self
    }

    /// Every button label, row by row
    pub fn buttons(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundText {
    pub text: String,
    pub format: TextFormat,
    pub keyboard: Option<ReplyKeyboard>,
}

impl OutboundText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Plain,
            keyboard: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Html,
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: ReplyKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Something the bot sends to a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(OutboundText),
    /// PNG bytes
    Image(Vec<u8>),
}

pub fn main_menu_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::grid(
        [
            t("menu-explain"),
            t("menu-quiz"),
            t("menu-image"),
            t("menu-calculator"),
            t("menu-about"),
        ],
        2,
    )
}

pub fn home_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::default().with_home()
}

pub fn welcome() -> OutboundText {
    let text = [
        t("welcome-title"),
        [
            t("welcome-explain"),
            t("welcome-quiz"),
            t("welcome-image"),
            t("welcome-calculator"),
        ]
        .join("\n"),
        t("welcome-choose"),
    ]
    .join("\n\n");
    OutboundText::html(escape_html(&text)).with_keyboard(main_menu_keyboard())
}

pub fn about() -> OutboundText {
    let text = format!(
        "{}\n\n{}\n{}\n{}\n{}\n{}",
        t("about-title"),
        t_args("about-version", &[("version", env!("CARGO_PKG_VERSION"))]),
        t("about-tech"),
        t("about-tech-llm"),
        t("about-tech-image"),
        t("about-tech-runtime"),
    );
    OutboundText::html(escape_html(&text)).with_keyboard(main_menu_keyboard())
}

pub fn unknown_input() -> OutboundText {
    OutboundText::plain(t("unknown-input")).with_keyboard(main_menu_keyboard())
}

pub fn internal_error() -> OutboundText {
    OutboundText::plain(t("internal-error")).with_keyboard(main_menu_keyboard())
}

/// A one-line notice with no keyboard change
pub fn notice(key: &str) -> OutboundText {
    OutboundText::plain(t(key))
}

pub fn error_notice(cause: &str) -> OutboundText {
    OutboundText::plain(t_args("error-generic", &[("cause", cause)]))
}

pub fn grade_label(grade: u8) -> String {
    t_args("grade-button", &[("grade", &grade.to_string())])
}

pub fn grade_prompt() -> OutboundText {
    OutboundText::plain(t("quiz-choose-grade"))
        .with_keyboard(ReplyKeyboard::grid(grades().map(grade_label), 3).with_home())
}

pub fn subject_prompt(grade: u8) -> OutboundText {
    let subjects = subjects_for(grade).unwrap_or_default();
    OutboundText::plain(t_args(
        "quiz-choose-subject",
        &[("grade", &grade.to_string())],
    ))
    .with_keyboard(ReplyKeyboard::grid(subjects.iter().copied(), 2).with_home())
}

pub fn question(question: &Question, subject: &str, grade: u8) -> OutboundText {
    let header = t_args(
        "quiz-question",
        &[("subject", subject), ("grade", &grade.to_string())],
    );
    OutboundText::plain(format!("{header}\n\n{}", question.text))
        .with_keyboard(ReplyKeyboard::grid(question.answers.iter().cloned(), 1).with_home())
}

pub fn answer_feedback(answer: &str, correct: &str) -> OutboundText {
    if answer == correct {
        OutboundText::plain(t("quiz-correct"))
    } else {
        OutboundText::plain(t_args("quiz-incorrect", &[("answer", correct)]))
    }
}

pub fn recommendations(pair: &RecommendationPair) -> OutboundText {
    OutboundText::plain(t("recommendations-prompt"))
        .with_keyboard(ReplyKeyboard::grid(pair.as_array(), 1).with_home())
}

pub fn topic_prompt() -> OutboundText {
    OutboundText::plain(t("explain-ask-topic")).with_keyboard(home_keyboard())
}

/// Explanation text converted to Telegram HTML and split to fit messages
pub fn explanation(text: &str) -> Vec<OutboundText> {
    format_explanation(text, MAX_MESSAGE_CHARS)
        .into_iter()
        .map(OutboundText::html)
        .collect()
}

pub fn image_type_prompt() -> OutboundText {
    OutboundText::plain(format!("{}\n\n{}", t("image-title"), t("image-choose-type")))
        .with_keyboard(
            ReplyKeyboard::grid(
                [t("image-standard"), t("image-contour"), t("image-style-button")],
                2,
            )
            .with_home(),
        )
}

pub fn style_prompt(styles: &[String]) -> OutboundText {
    OutboundText::plain(t("image-choose-style")).with_keyboard(
        ReplyKeyboard::grid(styles.iter().take(MAX_STYLE_BUTTONS).cloned(), 2).with_home(),
    )
}

pub fn image_describe() -> OutboundText {
    OutboundText::plain(t("image-describe")).with_keyboard(home_keyboard())
}

pub fn style_selected(style: &str) -> OutboundText {
    OutboundText::plain(format!(
        "{}\n\n{}",
        t_args("image-style-selected", &[("style", style)]),
        t("image-describe-after-style")
    ))
    .with_keyboard(home_keyboard())
}

pub fn image_unavailable() -> OutboundText {
    notice("image-unavailable")
}

pub fn image_ready() -> OutboundText {
    OutboundText::plain(t("image-ready")).with_keyboard(main_menu_keyboard())
}

pub fn contour_tip() -> OutboundText {
    OutboundText::plain(t("image-contour-tip")).with_keyboard(main_menu_keyboard())
}

pub fn image_failed(error: &ImageError) -> OutboundText {
    OutboundText::plain(t_args("image-failed", &[("cause", &image_error_cause(error))]))
        .with_keyboard(main_menu_keyboard())
}

pub fn calculator_keyboard() -> ReplyKeyboard {
    let mut keyboard = ReplyKeyboard::grid(CALCULATOR_KEYS, 4);
    keyboard.rows.push(vec!["C".to_string(), t("calculator-exit")]);
    keyboard.with_home()
}

pub fn calculator(expression: &str) -> OutboundText {
    let shown = if expression.is_empty() {
        t("calculator-empty")
    } else {
        expression.to_string()
    };
    OutboundText::plain(format!(
        "{}\n\n{}",
        t("calculator-title"),
        t_args("calculator-expression", &[("expression", &shown)])
    ))
    .with_keyboard(calculator_keyboard())
}

/// Human-readable cause of a failed explanation
pub fn generation_error_cause(error: &GenerationError) -> String {
    match error {
        GenerationError::ExplanationUnavailable(cause) => cause.clone(),
        other => other.to_string(),
    }
}

pub fn image_error_cause(error: &ImageError) -> String {
    match error {
        ImageError::Unavailable => t("image-error-unavailable"),
        ImageError::SubmissionFailed(_) => t("image-error-submission"),
        ImageError::Timeout { .. } => t("image-error-timeout"),
        ImageError::RemoteFailure(description) => {
            t_args("image-error-remote", &[("cause", description)])
        }
        ImageError::Decode(_) => t("image-error-decode"),
    }
}

pub fn expression_error_cause(error: &ExpressionError) -> String {
    match error {
        ExpressionError::Empty => t("calc-error-empty"),
        ExpressionError::UnsupportedCharacter(c) => {
            t_args("calc-error-character", &[("character", &c.to_string())])
        }
        ExpressionError::UnexpectedToken(token) => {
            t_args("calc-error-token", &[("token", token)])
        }
        ExpressionError::UnexpectedEnd => t("calc-error-end"),
        ExpressionError::InvalidNumber(number) => {
            t_args("calc-error-number", &[("number", number)])
        }
        ExpressionError::DivisionByZero => t("calc-error-division"),
        ExpressionError::Overflow => t("calc-error-overflow"),
        ExpressionError::TooDeep(limit) => {
            t_args("calc-error-depth", &[("limit", &limit.to_string())])
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Convert model markdown to Telegram HTML pieces of at most `limit` visible
/// characters each
///
/// `###` headings become dashes and `**bold**` spans become `<b>` tags; the
/// rest of the text is escaped. Cuts fall between characters of the source
/// text, never inside an escaped entity, and a bold span crossing a cut is
/// closed and reopened so every piece is valid HTML on its own.
pub fn format_explanation(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let text = text.replace("###", "-");

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut used = 0;

    for (i, segment) in text.split("**").enumerate() {
        let bold = i % 2 == 1;
        let chars: Vec<char> = segment.chars().collect();
        let mut start = 0;
        while start < chars.len() {
            if used == limit {
                chunks.push(std::mem::take(&mut current));
                used = 0;
            }
            let take = (limit - used).min(chars.len() - start);
            let piece: String = chars[start..start + take].iter().collect();
            if bold {
                current.push_str(&format!("<b>{}</b>", escape_html(&piece)));
            } else {
                current.push_str(&escape_html(&piece));
            }
            used += take;
            start += take;
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
