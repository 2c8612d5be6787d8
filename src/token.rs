use log::{debug, info};
use serde::Serialize;
use std::fmt;
use std::mem;

/// Location of a token in the script source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    /// Byte offset of the first byte of the token.
    pub offset: usize,

    /// 1‑based line number.
    pub line: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize) -> Self {
        Self { offset, line }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, offset {}", self.line, self.offset)
    }
}

/// A numeric literal: integral lexemes stay integers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Number {
    Int(i64),
    Decimal(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => {
                let mut buf: itoa::Buffer = itoa::Buffer::new();
                f.write_str(buf.format(*n))
            }

            Number::Decimal(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
        }
    }
}

/// The different kinds of tokens recognized by the scanner.
///
/// `STRING`, `NUMBER` and `OPTION` carry their decoded payloads.
/// `IDENTIFIER` is any other bare word, symbols included.
/// `EOF` marks the end of input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '\'' (defers the following term)
    QUOTE,

    /// `--name`, carrying `name`
    OPTION(String),

    /// A bare word such as `filter`, `+` or `$it`
    IDENTIFIER,

    /// A string literal (contents without quotes, escapes decoded)
    STRING(String),

    /// A numeric literal
    NUMBER(Number),

    /// End‑of‑file marker
    EOF,
}

impl PartialEq for TokenType {
    /// Two TokenTypes are equal if they share the same variant
    /// (ignoring any inner data). Uses `mem::discriminant` to compare.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// A scanned token, including its type, the original lexeme,
/// and where it was found.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: &'a str,

    /// Start of the lexeme in the source.
    pub pos: Position,
}

impl<'a> Token<'a> {
    /// Create a new Token with the given type, lexeme, and position.
    pub fn new(token_type: TokenType, lexeme: &'a str, pos: Position) -> Self {
        debug!(
            "Creating new token: type={:?}, lexeme={}, pos={}",
            token_type, lexeme, pos
        );

        Self {
            token_type,
            lexeme,
            pos,
        }
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literal: String = match &self.token_type {
            TokenType::STRING(s) => s.clone(),
            TokenType::NUMBER(n) => n.to_string(),
            TokenType::OPTION(name) => name.clone(),
            _ => "null".to_string(),
        };

        let variant: &'static str = match self.token_type {
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::QUOTE => "QUOTE",
            TokenType::OPTION(_) => "OPTION",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::STRING(_) => "STRING",
            TokenType::NUMBER(_) => "NUMBER",
            TokenType::EOF => "EOF",
        };

        info!("Formatted token: {} {} {}", variant, self.lexeme, literal);

        write!(f, "{} {} {}", variant, self.lexeme, literal)
    }
}
