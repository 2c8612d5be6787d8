/*!
Recursive‑descent parser for the chain language.

Grammar
-------

```text
program  → chain EOF ;
chain    → term+ ;
term     → STRING | NUMBER | IDENTIFIER | OPTION
         | "'" term
         | "(" chain ")" ;
```

The parser is purely syntactic: it never looks names up and never decides
which identifiers are methods. A program is always an [`Expr::Chain`]; every
parenthesised group becomes an [`Expr::Block`] around its own chain.

Each token is consumed exactly once, so parsing is Θ(n) in the token count;
call‑stack depth grows with paren/quote nesting only, which is capped at
[`MAX_NESTING`].

### Logging Policy

| Location                  | Level   | Purpose                                   |
|---------------------------|---------|-------------------------------------------|
| `Parser::new`, `parse`    | `info`  | Lifecycle milestones.                     |
| `chain`, `term`           | `debug` | Descent into grammar branches.            |
*/

use std::rc::Rc;

use crate::error::{ExprError, Result};
use crate::expr::Expr;
use crate::scanner::Scanner;
use crate::token::{Position, Token, TokenType};

use log::{debug, info};

/// How deeply parens and quotes may nest before the source is rejected.
pub const MAX_NESTING: usize = 256;

/// Scan and parse `source` in one step, failing on the first error.
pub fn parse(source: &str) -> Result<Expr> {
    let tokens: Vec<Token<'_>> = Scanner::new(source).collect::<Result<Vec<_>>>()?;

    Parser::new(&tokens).parse()
}

/// Top‑level parser over an immutable slice of tokens.
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    current: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Construct a new parser. `tokens` must end with an `EOF` token, as the
    /// scanner guarantees.
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            depth: 0,
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse the whole token stream as one chain.
    pub fn parse(&mut self) -> Result<Expr> {
        info!("Beginning parse phase");

        if self.is_at_end() {
            return Err(ExprError::parse(self.peek_pos(), "Expected expression"));
        }

        let chain: Expr = self.chain()?;

        if !self.is_at_end() {
            return Err(ExprError::parse(self.peek_pos(), "Unexpected ')'"));
        }

        info!("Parse phase complete");

        Ok(chain)
    }

    // ───────────────────────── grammar rules ─────────────────────

    fn chain(&mut self) -> Result<Expr> {
        debug!("Entering chain at {}", self.peek_pos());

        let mut terms: Vec<Expr> = Vec::new();

        while !self.is_at_end() && !self.check(TokenType::RIGHT_PAREN) {
            terms.push(self.term()?);
        }

        Ok(Expr::Chain(terms))
    }

    fn term(&mut self) -> Result<Expr> {
        let token: &'a Token<'a> = self.advance();

        debug!("Parsing term '{}' at {}", token.lexeme, token.pos);

        match &token.token_type {
            TokenType::STRING(s) => Ok(Expr::Text(s.clone())),

            TokenType::NUMBER(n) => Ok(Expr::Number(*n)),

            TokenType::IDENTIFIER => Ok(Expr::Identifier {
                name: token.lexeme.to_string(),
                pos: token.pos,
            }),

            TokenType::OPTION(name) => Ok(Expr::Option {
                name: name.clone(),
                pos: token.pos,
            }),

            TokenType::QUOTE => {
                if self.is_at_end() || self.check(TokenType::RIGHT_PAREN) {
                    return Err(ExprError::parse(
                        token.pos,
                        "Expected expression after quote",
                    ));
                }

                self.enter(token.pos)?;
                let inner: Expr = self.term()?;
                self.depth -= 1;

                Ok(Expr::Deferred(Rc::new(inner)))
            }

            TokenType::LEFT_PAREN => {
                if self.check(TokenType::RIGHT_PAREN) {
                    return Err(ExprError::parse(token.pos, "Empty expression '()'"));
                }

                self.enter(token.pos)?;
                let inner: Expr = self.chain()?;
                self.depth -= 1;

                if !self.matches(TokenType::RIGHT_PAREN) {
                    return Err(ExprError::parse(
                        token.pos,
                        "Unbalanced '(': expected ')' before end of input",
                    ));
                }

                Ok(Expr::Block(Box::new(inner)))
            }

            TokenType::RIGHT_PAREN | TokenType::EOF => Err(ExprError::parse(
                token.pos,
                format!("Unexpected '{}'", token.lexeme),
            )),
        }
    }

    // ────────────────────── utility helpers ───────────────────────

    fn enter(&mut self, pos: Position) -> Result<()> {
        self.depth += 1;

        if self.depth > MAX_NESTING {
            return Err(ExprError::parse(
                pos,
                format!("Expression nested deeper than {} levels", MAX_NESTING),
            ));
        }

        Ok(())
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token<'a> {
        let token: &'a Token<'a> = self.peek();

        if !self.is_at_end() {
            self.current += 1;
        }

        token
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.tokens
            .get(self.current)
            .map_or(true, |token| matches!(token.token_type, TokenType::EOF))
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token<'a> {
        let index = self.current.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    fn peek_pos(&self) -> Position {
        self.tokens
            .get(self.current)
            .map(|token| token.pos)
            .unwrap_or_default()
    }
}
