use crate::config::{EXIT_COMPILE_ERROR, EXIT_RUNTIME_ERROR, RuntimeConfig};
use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;
use crate::interpreter::environment::Environment;
use crate::parser::Parser;
use crate::parser::printer::AstPrinter;
use crate::scanner::Scanner;
use crate::scanner::token::TokenType;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

/// One host-process lifetime: a file run or an interactive session. The
/// environment and the runtime-error flag outlive individual `run` calls.
pub struct Session {
    keywords: HashMap<String, TokenType>,
    config: RuntimeConfig,
    interpreter: Interpreter,
    diagnostics: Diagnostics,
}

impl Session {
    pub fn new(keywords: HashMap<String, TokenType>, config: RuntimeConfig) -> Self {
        Self::with_writers(
            keywords,
            config,
            Box::new(io::stdout()),
            Box::new(io::stderr()),
        )
    }

    /// `output` receives what scripts print, `errors` every diagnostic.
    pub fn with_writers(
        keywords: HashMap<String, TokenType>,
        config: RuntimeConfig,
        output: Box<dyn Write>,
        errors: Box<dyn Write>,
    ) -> Self {
        let diagnostics = Diagnostics::new(errors).with_hints(config.show_hints);
        let interpreter = Interpreter::with_output(Rc::new(Environment::new()), output);
        Session {
            keywords,
            config,
            interpreter,
            diagnostics,
        }
    }

    /// Scans, parses and, if both were clean, evaluates `source`.
    pub fn run(&mut self, source: &str) {
        let scanned = Scanner::new(source, &self.keywords).scan_tokens();
        for error in &scanned.errors {
            self.diagnostics.scan_error(error);
        }

        if self.config.dump_tokens {
            for token in &scanned.tokens {
                self.diagnostics.trace(&token.to_string());
            }
        }

        let parsed = Parser::new(scanned.tokens).parse();
        for error in &parsed.errors {
            self.diagnostics.parse_error(error);
        }

        if self.config.dump_ast {
            for stmt in &parsed.statements {
                self.diagnostics.trace(&AstPrinter::print_stmt(stmt));
            }
        }

        if self.diagnostics.had_error() {
            return;
        }

        if let Err(error) = self.interpreter.interpret(&parsed.statements) {
            self.diagnostics.runtime_error(&error);
        }
    }

    pub fn had_error(&self) -> bool {
        self.diagnostics.had_error()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.diagnostics.had_runtime_error()
    }

    pub fn reset_error(&mut self) {
        self.diagnostics.reset_error();
    }

    pub fn environment(&self) -> Rc<Environment> {
        self.interpreter.environment()
    }

    pub fn exit_code(&self) -> i32 {
        if self.had_error() {
            EXIT_COMPILE_ERROR
        } else if self.had_runtime_error() {
            EXIT_RUNTIME_ERROR
        } else {
            0
        }
    }
}
