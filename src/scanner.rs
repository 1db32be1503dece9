pub mod token;

use crate::scanner::token::{Literal, Token, TokenType};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScanError {}

/// Everything one pass over the source produced. Errors never stop the scan,
/// so `tokens` is always complete and ends with `Eof`.
#[derive(Debug)]
pub struct ScanResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<ScanError>,
}

pub struct Scanner<'k> {
    source: Vec<char>,
    tokens: Vec<Token>,
    errors: Vec<ScanError>,
    start: usize,
    current: usize,
    line: usize,
    keywords: &'k HashMap<String, TokenType>,
}

impl<'k> Scanner<'k> {
    pub fn new(source: &str, keywords: &'k HashMap<String, TokenType>) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            errors: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            keywords,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    pub fn scan_tokens(mut self) -> ScanResult {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.tokens.push(Token::new(TokenType::Eof, "", self.line));
        ScanResult {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    fn scan_token(&mut self) {
        let Some(c) = self.advance() else {
            return;
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

            // One or two character tokens
            '!' => {
                let token_type = if self.match_char('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token_type);
            }

            '=' => {
                let token_type = if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type);
            }

            '>' => {
                let token_type = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }

            '<' => {
                let token_type = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }

            '/' => {
                if self.match_char('/') {
                    // Comment goes until end of line
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }

            ' ' | '\r' | '\t' => {}

            '\n' => self.line += 1,

            '"' => self.handle_string(),

            c if c.is_ascii_digit() => self.handle_number(),

            c if is_alpha(c) => self.handle_identifier(),

            _ => self.report_error("Unexpected character."),
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.current).copied();
        if ch.is_some() {
            self.current += 1;
        }
        ch
    }

    fn peek(&self) -> char {
        self.source.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn handle_string(&mut self) {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.report_error("Unterminated string.");
            return;
        }

        // the closing quote
        self.advance();

        // string value, not the lexeme, so the quotes are trimmed
        let value: String = self.source[self.start + 1..self.current - 1]
            .iter()
            .collect();
        self.add_literal_token(TokenType::String, Literal::Str(value));
    }

    fn handle_number(&mut self) {
        // First digit is already consumed
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A dot without a digit after it is not part of the number
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.lexeme();
        match text.parse::<f64>() {
            Ok(num) => self.add_literal_token(TokenType::Number, Literal::Number(num)),
            Err(_) => self.report_error(format!("Invalid number '{}'.", text)),
        }
    }

    fn handle_identifier(&mut self) {
        while is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let text = self.lexeme();
        let token_type = self
            .keywords
            .get(&text)
            .copied()
            .unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn add_token(&mut self, token_type: TokenType) {
        let text = self.lexeme();
        self.tokens.push(Token::new(token_type, text, self.line));
    }

    fn add_literal_token(&mut self, token_type: TokenType, literal: Literal) {
        let text = self.lexeme();
        self.tokens
            .push(Token::with_literal(token_type, text, literal, self.line));
    }

    fn report_error(&mut self, message: impl Into<String>) {
        self.errors.push(ScanError {
            line: self.line,
            message: message.into(),
        });
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alpha_numeric(c: char) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}
