//! # Calculator Module
//!
//! Evaluation of the restricted arithmetic expressions typed on the calculator
//! keypad: numbers, `+ - * /`, parentheses and spaces. Operators follow the
//! usual precedence and are left-associative; unary signs are allowed.

use log::{debug, trace};

use crate::errors::{CalculatorError, ExpressionError};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(value) => format_number(*value),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
        }
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '.' | '(' | ')' | ' ')
}

fn tokenize(expression: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let token = match c {
            ' ' => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            _ => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
                continue;
            }
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}

/// Deepest parenthesis nesting accepted by the parser
pub const MAX_NESTING_DEPTH: usize = 64;

/// Recursive-descent parser evaluating while it parses
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // expr := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(ExpressionError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    // unary := ('+' | '-')* primary
    fn unary(&mut self) -> Result<f64, ExpressionError> {
        let mut negative = false;
        loop {
            match self.peek() {
                Some(Token::Minus) => negative = !negative,
                Some(Token::Plus) => {}
                _ => break,
            }
            self.pos += 1;
        }
        let value = self.primary()?;
        Ok(if negative { -value } else { value })
    }

    // primary := number | '(' expr ')'
    fn primary(&mut self) -> Result<f64, ExpressionError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                if self.depth >= MAX_NESTING_DEPTH {
                    return Err(ExpressionError::TooDeep(MAX_NESTING_DEPTH));
                }
                self.depth += 1;
                let value = self.expression()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    Some(other) => Err(ExpressionError::UnexpectedToken(other.describe())),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExpressionError::UnexpectedToken(other.describe())),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}

/// Evaluate a restricted arithmetic expression
///
/// Characters outside digits, `+ - * / . ( )` and space are rejected before
/// anything is parsed.
///
/// # Examples
///
/// ```rust
/// use school_helper::calculator::evaluate;
///
/// assert_eq!(evaluate("2+2*2").unwrap(), 6.0);
/// assert!(evaluate("1/0").is_err());
/// ```
pub fn evaluate(expression: &str) -> Result<f64, CalculatorError> {
    if let Some(c) = expression.chars().find(|c| !is_allowed(*c)) {
        debug!("Rejected expression with unsupported character {c:?}");
        return Err(ExpressionError::UnsupportedCharacter(c).into());
    }

    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Empty.into());
    }
    trace!("Tokenized {expression:?} into {} tokens", tokens.len());

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    // No implicit multiplication: anything left over is an error
    if let Some(extra) = parser.peek() {
        return Err(ExpressionError::UnexpectedToken(extra.describe()).into());
    }
    if !value.is_finite() {
        return Err(ExpressionError::Overflow.into());
    }

    debug!("Evaluated {expression:?} = {value}");
    Ok(value)
}

/// Render a result the way it goes back into the expression
///
/// Whole numbers print without a fractional part so that the user can keep
/// typing after `=`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
