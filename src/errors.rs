//! # Error Types Module
//!
//! Structured error types for the remote generation services, the calculator
//! and the dialogue state machine. Every variant is recoverable: the
//! orchestrator turns them into a short notice for the chat and moves the
//! conversation back to a safe step.

use thiserror::Error;

/// Failures of the text-generation endpoint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Schema-validated generation never produced acceptable output
    #[error("generation exhausted after {attempts} attempts")]
    Exhausted { attempts: u32 },
    /// Single-shot free-form generation failed
    #[error("explanation unavailable: {0}")]
    ExplanationUnavailable(String),
}

/// Failures of the image pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// The pipeline identifier could not be resolved at startup
    #[error("image service unavailable")]
    Unavailable,
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    #[error("generation not finished after {attempts} status checks")]
    Timeout { attempts: u32 },
    #[error("remote failure: {0}")]
    RemoteFailure(String),
    /// Payload was not valid base64 or not a decodable image
    #[error("decode error: {0}")]
    Decode(String),
}

/// Reasons an arithmetic expression is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,
    #[error("unsupported character '{0}'")]
    UnsupportedCharacter(char),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is too large")]
    Overflow,
    #[error("parentheses nested deeper than {0}")]
    TooDeep(usize),
}

/// Calculator failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculatorError {
    #[error("invalid expression: {0}")]
    InvalidExpression(#[from] ExpressionError),
}

/// Sequencing faults inside the dialogue state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("event {event} is not expected in step {state}")]
    UnexpectedEvent { state: String, event: String },
}
