use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;
use tracing::{debug, trace};

use crate::token::{Literal, Token, TokenType};

/// Everything a scan produced. Tokens always end with a single `EOF`.
#[derive(Debug)]
pub struct ScanOutput {
    pub tokens: Vec<Token>,
    pub errors: Vec<ScanningError>,
}

impl ScanOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Scan the whole source, collecting tokens and lexical errors side by side.
pub fn scan(source: &str) -> ScanOutput {
    let output = Scanner::new(source).scan_tokens();
    debug!(
        tokens = output.tokens.len(),
        errors = output.errors.len(),
        "scanned source"
    );
    output
}

/// public interface for tokenizing, errors go to `error_reporter` in source order
pub fn tokenize(source: &str, mut error_reporter: impl FnMut(&ScanningError)) -> Vec<Token> {
    let ScanOutput { tokens, errors } = scan(source);
    for error in &errors {
        error_reporter(error);
    }
    tokens
}

struct Scanner<'a> {
    source: &'a str,
    char_iter: Peekable<Chars<'a>>,
    tokens: Vec<Token>,
    errors: Vec<ScanningError>,

    // byte offsets into source
    current_lexeme_start: usize,
    current: usize,
    line: usize,
}

#[derive(Debug, PartialEq, Error)]
pub enum ScanningError {
    #[error("Unexpected character: {character}")]
    UnexpectedCharacter { line: usize, character: char },
    #[error("Unterminated string.")]
    UnterminatedString { line: usize, string_start: String },
}

impl ScanningError {
    pub fn line(&self) -> usize {
        match self {
            ScanningError::UnexpectedCharacter { line, .. }
            | ScanningError::UnterminatedString { line, .. } => *line,
        }
    }
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            source,
            char_iter: source.chars().peekable(),
            tokens: vec![],
            errors: vec![],
            current_lexeme_start: 0,
            current: 0,
            line: 1,
        }
    }

    fn scan_tokens(mut self) -> ScanOutput {
        while !self.is_at_end() {
            self.current_lexeme_start = self.current;
            if let Err(scanning_error) = self.scan_token() {
                trace!(%scanning_error, line = scanning_error.line(), "lexical error");
                self.errors.push(scanning_error);
            }
        }
        self.tokens.push(Token {
            r#type: TokenType::EOF,
            lexeme: "".to_string(),
            literal: None,
            line: self.line,
        });
        ScanOutput {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn scan_token(&mut self) -> Result<(), ScanningError> {
        let Some(c) = self.advance() else {
            return Ok(());
        };
        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            ';' => self.add_token(TokenType::Semicolon),
            '*' => self.add_token(TokenType::Star),
            '!' => self.add_operator(TokenType::BangEqual, TokenType::Bang),
            '=' => self.add_operator(TokenType::EqualEqual, TokenType::Equal),
            '<' => self.add_operator(TokenType::LessEqual, TokenType::Less),
            '>' => self.add_operator(TokenType::GreaterEqual, TokenType::Greater),
            '/' => {
                if self.match_one('/') {
                    // the newline is left for the main loop so the line count stays right
                    while self.peek_one().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' => self.consume_string()?,
            c if is_digit(c) => self.consume_number(),
            c if is_alpha(c) => self.consume_identifier(),
            _ => {
                return Err(ScanningError::UnexpectedCharacter {
                    line: self.line,
                    character: c,
                });
            }
        }
        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn match_one(&mut self, expected: char) -> bool {
        if self.peek_one() != Some(expected) {
            return false;
        }
        self.advance();
        true
    }

    fn advance(&mut self) -> Option<char> {
        let current_char = self.char_iter.next()?;
        self.current += current_char.len_utf8();
        Some(current_char)
    }

    /// like advance but does not consume the character. 1 lookahead.
    fn peek_one(&mut self) -> Option<char> {
        self.char_iter.peek().copied()
    }

    /// 2 lookahead. `current` always sits on a char boundary so the slice is safe.
    fn peek_two(&self) -> Option<char> {
        self.source[self.current..].chars().nth(1)
    }

    fn current_lexeme(&self) -> &'a str {
        &self.source[self.current_lexeme_start..self.current]
    }

    fn add_operator(&mut self, with_equal: TokenType, alone: TokenType) {
        let token_type = if self.match_one('=') { with_equal } else { alone };
        self.add_token(token_type);
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_token_with_literal(token_type, None);
    }

    fn add_token_with_literal(&mut self, token_type: TokenType, literal: Option<Literal>) {
        let token = Token {
            r#type: token_type,
            lexeme: self.current_lexeme().to_string(),
            literal,
            line: self.line,
        };
        trace!(%token, line = token.line(), "token");
        self.tokens.push(token);
    }

    fn consume_string(&mut self) -> Result<(), ScanningError> {
        while let Some(c) = self.peek_one() {
            if c == '"' {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(ScanningError::UnterminatedString {
                line: self.line,
                string_start: self.current_lexeme().to_string(),
            });
        }

        // closing quote
        self.advance();

        let lexeme = self.current_lexeme();
        let value = lexeme[1..lexeme.len() - 1].to_string();
        self.add_token_with_literal(TokenType::String, Some(Literal::String(value)));
        Ok(())
    }

    fn consume_number(&mut self) {
        self.consume_digits();

        if self.peek_one() == Some('.') && self.peek_two().is_some_and(is_digit) {
            self.advance();
            self.consume_digits();
        }

        // digits with at most one inner '.': parsing only saturates to inf, never fails
        let value: f64 = self.current_lexeme().parse().unwrap_or(f64::INFINITY);
        self.add_token_with_literal(TokenType::Number, Some(Literal::Number(value)));
    }

    fn consume_digits(&mut self) {
        while self.peek_one().is_some_and(is_digit) {
            self.advance();
        }
    }

    fn consume_identifier(&mut self) {
        while self.peek_one().is_some_and(is_alphanumeric) {
            self.advance();
        }

        let token_type = match_keyword(self.current_lexeme()).unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }
}

fn match_keyword(input: &str) -> Option<TokenType> {
    match input {
        "and" => Some(TokenType::And),
        "class" => Some(TokenType::Class),
        "else" => Some(TokenType::Else),
        "false" => Some(TokenType::False),
        "fun" => Some(TokenType::Fun),
        "for" => Some(TokenType::For),
        "if" => Some(TokenType::If),
        "nil" => Some(TokenType::Nil),
        "or" => Some(TokenType::Or),
        "print" => Some(TokenType::Print),
        "return" => Some(TokenType::Return),
        "super" => Some(TokenType::Super),
        "this" => Some(TokenType::This),
        "true" => Some(TokenType::True),
        "var" => Some(TokenType::Var),
        "while" => Some(TokenType::While),
        _ => None,
    }
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alphanumeric(c: char) -> bool {
    is_digit(c) || is_alpha(c)
}
