pub mod environment;
pub mod value;

use crate::interpreter::environment::Environment;
use crate::interpreter::value::Value;
use crate::parser::ast::{Expr, Stmt};
use crate::scanner::token::{Token, TokenType};
use std::fmt;
use std::io::Write;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    fn new(token: &Token, message: impl Into<String>) -> Self {
        RuntimeError {
            token: token.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n[line {}]", self.message, self.token.line)
    }
}

impl std::error::Error for RuntimeError {}

pub struct Interpreter {
    // Shared so the host can keep inspecting bindings between runs.
    env: Rc<Environment>,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn with_output(env: Rc<Environment>, output: Box<dyn Write>) -> Self {
        Interpreter { env, output }
    }

    pub fn environment(&self) -> Rc<Environment> {
        Rc::clone(&self.env)
    }

    /// Executes top-level statements in order. The first runtime fault stops
    /// the run; statements after it are not executed.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));
        let _ = self.output.flush();
        result
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                // A closed stdout is not the script's fault; keep running.
                let _ = writeln!(self.output, "{}", value);
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Nil,
                };
                self.env.define(&name.lexeme, value);
            }
            Stmt::Block(statements) => {
                // no new scope: the environment is flat
                for stmt in statements {
                    self.execute(stmt)?;
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }
            }
        }
        Ok(())
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Variable(name) => self
                .env
                .get(&name.lexeme)
                .map_err(|msg| RuntimeError::new(name, msg)),
            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.env
                    .assign(&name.lexeme, value.clone())
                    .map_err(|msg| RuntimeError::new(name, msg))?;
                Ok(value)
            }
            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match (operator.token_type, right) {
                    (TokenType::Bang, v) => Ok(Value::Bool(!v.is_truthy())),
                    (TokenType::Minus, Value::Num(n)) => Ok(Value::Num(-n)),
                    (TokenType::Minus, _) => Err(RuntimeError::new(
                        operator,
                        format!("Operand of '{}' must be a number.", operator.lexeme),
                    )),
                    (other, _) => Err(RuntimeError::new(
                        operator,
                        format!("Unknown unary operator {:?}.", other),
                    )),
                }
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                // short-circuit: yield the operand that decided the result
                let decided = match operator.token_type {
                    TokenType::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if decided {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }
        }
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (operator.token_type, left, right) {
        (TokenType::EqualEqual, l, r) => Ok(Value::Bool(l == r)),
        (TokenType::BangEqual, l, r) => Ok(Value::Bool(l != r)),

        (TokenType::Plus, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
        (TokenType::Plus, Value::Str(a), Value::Str(b)) => {
            Ok(Value::Str(Rc::from(format!("{}{}", a, b))))
        }
        (TokenType::Plus, l, r) => Err(RuntimeError::new(
            operator,
            format!(
                "Operands of '+' must be two numbers or two strings, got {} and {}.",
                l.type_name(),
                r.type_name()
            ),
        )),

        // Division by zero is IEEE-754: inf, -inf or NaN, never a fault.
        (TokenType::Minus, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a - b)),
        (TokenType::Slash, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a / b)),
        (TokenType::Star, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a * b)),

        (TokenType::Greater, Value::Num(a), Value::Num(b)) => Ok(Value::Bool(a > b)),
        (TokenType::GreaterEqual, Value::Num(a), Value::Num(b)) => Ok(Value::Bool(a >= b)),
        (TokenType::Less, Value::Num(a), Value::Num(b)) => Ok(Value::Bool(a < b)),
        (TokenType::LessEqual, Value::Num(a), Value::Num(b)) => Ok(Value::Bool(a <= b)),

        (
            TokenType::Minus
            | TokenType::Slash
            | TokenType::Star
            | TokenType::Greater
            | TokenType::GreaterEqual
            | TokenType::Less
            | TokenType::LessEqual,
            _,
            _,
        ) => Err(RuntimeError::new(
            operator,
            format!("Operands of '{}' must be numbers.", operator.lexeme),
        )),

        (other, _, _) => Err(RuntimeError::new(
            operator,
            format!("Unknown binary operator {:?}.", other),
        )),
    }
}
