use crate::interpreter::RuntimeError;
use crate::parser::ParseError;
use crate::scanner::ScanError;
use crate::scanner::token::{Token, TokenType};
use std::io::Write;

pub fn render(line: usize, location: &str, message: &str) -> String {
    format!("[line {}] Error{}: {}", line, location, message)
}

/// Where an error points: nothing at end of input, otherwise the lexeme.
pub fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::Eof {
        String::new()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

pub fn suggest_hint(message: &str) -> Option<String> {
    let msg = message.to_lowercase();

    if msg.contains("two numbers or two strings") {
        return Some("both sides of '+' must have the same type".into());
    }

    if msg.contains("undefined variable") {
        return Some("declare it with 'var' before using or assigning it".into());
    }

    if msg.contains("must be a number") || msg.contains("must be numbers") {
        return Some("only numbers can be negated, compared or used in arithmetic".into());
    }

    None
}

/// The sink every diagnostic goes through, plus the two flags the driver
/// checks to pick an exit code.
pub struct Diagnostics {
    sink: Box<dyn Write>,
    show_hints: bool,
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new(sink: Box<dyn Write>) -> Self {
        Diagnostics {
            sink,
            show_hints: false,
            had_error: false,
            had_runtime_error: false,
        }
    }

    pub fn with_hints(mut self, show_hints: bool) -> Self {
        self.show_hints = show_hints;
        self
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clears the compile-time flag only; a runtime fault stays recorded.
    pub fn reset_error(&mut self) {
        self.had_error = false;
    }

    pub fn report(&mut self, line: usize, location: &str, message: &str) {
        self.had_error = true;
        let text = render(line, location, message);
        self.emit(&text);
    }

    pub fn scan_error(&mut self, error: &ScanError) {
        self.report(error.line, "", &error.message);
    }

    pub fn parse_error(&mut self, error: &ParseError) {
        self.report(error.token.line, &location_of(&error.token), &error.message);
    }

    pub fn runtime_error(&mut self, error: &RuntimeError) {
        self.had_runtime_error = true;
        self.emit(&error.to_string());
        if self.show_hints {
            if let Some(hint) = suggest_hint(&error.message) {
                self.emit(&format!("  = hint: {}", hint));
            }
        }
    }

    /// Debug output (token and tree dumps) shares the diagnostic stream.
    pub fn trace(&mut self, text: &str) {
        self.emit(text);
    }

    fn emit(&mut self, text: &str) {
        // Nowhere left to report a failing diagnostic stream to.
        let _ = writeln!(self.sink, "{}", text);
        let _ = self.sink.flush();
    }
}
