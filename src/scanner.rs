//! Module `scanner` implements a one‑pass, streaming lexer for the chain
//! language.
//!
//! It transforms a source string into a sequence of `Token<'a>`s, skipping
//! whitespace and emitting exactly one `EOF` token at the end. Designed as a
//! `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token<'a>, ExprError>` on each `.next()`.
//!
//! # Token Recognition (`scan_token`)
//!
//! - Punctuators: `(`, `)` and the defer quote `'`.
//! - String literals: `"` … `"`, with `\"`, `\\`, `\n`, `\t`, `\r`, `\'` escapes
//!   resolved through a perfect‑hash `ESCAPES` map; the body is searched with
//!   `memchr2`.
//! - Words: any run of bytes up to whitespace, a paren or a double quote.
//!   A word is then classified as an `OPTION` (`--name`), a `NUMBER`
//!   (`-?[0-9]+(.[0-9]+)?`) or an `IDENTIFIER`.
//! - Errors: unterminated strings, unknown escapes, `--` with no name and
//!   digit‑leading words that are not numbers.
//!
//! # Example
//!
//! ```rust
//! use cardexpr::scanner::Scanner;
//!
//! for result in Scanner::new("+ 1 * 2 3") {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("Lex error: {}", err),
//!     }
//! }
//! ```

use crate::error::{ExprError, Result};
use crate::token::{Number, Position, Token, TokenType};
use log::{debug, info};
use memchr::{memchr2, memchr_iter};
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static escape map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static ESCAPES: phf::Map<u8, char> = phf_map! {
    b'"'  => '"',
    b'\\' => '\\',
    b'\'' => '\'',
    b'n'  => '\n',
    b't'  => '\t',
    b'r'  => '\r',
};

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s. The lifetime `'a` ties every emitted token's
/// `lexeme` slice back to the original source.
pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    start: usize,               // index of the first byte of the current lexeme
    start_line: usize,          // line the current lexeme began on
    curr: usize,                // index one past the last byte examined
    line: usize,                // 1‑based line counter
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            start_line: 1,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it. Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it; `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.curr]
        }
    }

    #[inline(always)]
    fn start_pos(&self) -> Position {
        Position::new(self.start, self.start_line)
    }

    #[inline(always)]
    fn is_delimiter(b: u8) -> bool {
        b.is_ascii_whitespace() || matches!(b, b'(' | b')' | b'"')
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`. Whitespace is skipped by
    /// returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            b'(' => self.pending = Some(TokenType::LEFT_PAREN),
            b')' => self.pending = Some(TokenType::RIGHT_PAREN),
            b'\'' => self.pending = Some(TokenType::QUOTE),

            b'\n' => {
                self.line += 1;

                return Ok(());
            }

            b if b.is_ascii_whitespace() => {
                return Ok(());
            }

            b'"' => {
                return self.parse_string();
            }

            _ => {
                return self.parse_word();
            }
        }

        Ok(())
    }

    /// Parse a double‑quoted string literal, decoding escapes.
    ///
    /// `self.start` points to the opening `"`; on return `self.curr` points
    /// past the closing `"`.
    fn parse_string(&mut self) -> Result<()> {
        let mut text = String::new();

        loop {
            let rest: &[u8] = &self.bytes[self.curr..];

            let Some(found) = memchr2(b'"', b'\\', rest) else {
                return Err(ExprError::parse(self.start_pos(), "Unterminated string."));
            };

            let chunk_end = self.curr + found;
            self.line += memchr_iter(b'\n', &rest[..found]).count();
            text.push_str(&self.src[self.curr..chunk_end]);
            self.curr = chunk_end;

            if self.advance() == b'"' {
                break;
            }

            let Some(escaped) = self.src[self.curr..].chars().next() else {
                return Err(ExprError::parse(self.start_pos(), "Unterminated string."));
            };

            let escape_pos = Position::new(self.curr - 1, self.line);
            self.curr += escaped.len_utf8();

            let decoded: Option<&char> = u8::try_from(escaped)
                .ok()
                .and_then(|b| ESCAPES.get(&b));

            match decoded {
                Some(c) => text.push(*c),
                None => {
                    return Err(ExprError::parse(
                        escape_pos,
                        format!("Unknown escape sequence: \\{}", escaped),
                    ));
                }
            }
        }

        self.pending = Some(TokenType::STRING(text));

        Ok(())
    }

    /// Consume a bare word and classify it as option, number or identifier.
    fn parse_word(&mut self) -> Result<()> {
        while !self.is_at_end() && !Self::is_delimiter(self.peek()) {
            self.advance();
        }

        let word: &str = &self.src[self.start..self.curr];

        if let Some(name) = word.strip_prefix("--") {
            if name.is_empty() {
                return Err(ExprError::parse(
                    self.start_pos(),
                    "Expected option name after '--'",
                ));
            }

            self.pending = Some(TokenType::OPTION(name.to_string()));

            return Ok(());
        }

        let unsigned: &str = word.strip_prefix('-').unwrap_or(word);

        if unsigned.as_bytes().first().is_some_and(u8::is_ascii_digit) {
            let number: Number = parse_number(word).ok_or_else(|| {
                ExprError::parse(self.start_pos(), format!("Invalid number: {}", word))
            })?;

            self.pending = Some(TokenType::NUMBER(number));

            return Ok(());
        }

        self.pending = Some(TokenType::IDENTIFIER);

        Ok(())
    }
}

/// Parse `-?[0-9]+(.[0-9]+)?`; anything else (or an out of range integer) is `None`.
fn parse_number(word: &str) -> Option<Number> {
    let unsigned: &str = word.strip_prefix('-').unwrap_or(word);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if !all_digits(whole) {
        return None;
    }

    match fraction {
        None => word.parse::<i64>().ok().map(Number::Int),
        Some(fraction) if all_digits(fraction) => word.parse::<f64>().ok().map(Number::Decimal),
        Some(_) => None,
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1;
                return Some(Ok(Token::new(
                    TokenType::EOF,
                    "",
                    Position::new(self.len(), self.line),
                )));
            }

            self.start = self.curr;
            self.start_line = self.line;
            self.pending = None;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some(tt) = self.pending.take() {
                let lexeme: &str = &self.src[self.start..self.curr];
                debug!("Scanned token ({:?}) at {}", tt, self.start_pos());

                return Some(Ok(Token::new(tt, lexeme, self.start_pos())));
            }
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
