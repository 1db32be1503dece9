use crate::parser::ast::Literal;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Num(f64),
    Str(Rc<str>),
}

impl Value {
    /// `nil` and `false` are falsy; everything else, `0` and `""` included, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Nil => Value::Nil,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Num(*n),
            Literal::Str(s) => Value::Str(Rc::from(s.as_str())),
        }
    }
}

/// Integral numbers drop the fractional part (`7`, not `7.0`); everything
/// else uses the default float text, so infinities print as `inf`.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Num(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(Value::Num(7.0).to_string(), "7");
        assert_eq!(Value::Num(7.5).to_string(), "7.5");
        assert_eq!(Value::Num(-3.0).to_string(), "-3");
        assert_eq!(Value::Num(0.1 + 0.2).to_string(), "0.30000000000000004");
        assert_eq!(Value::Num(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Num(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn test_other_values_display() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Str(Rc::from("hi")).to_string(), "hi");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Num(0.0).is_truthy());
        assert!(Value::Str(Rc::from("")).is_truthy());
    }

    #[test]
    fn test_equality_across_kinds() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Num(1.0), Value::Str(Rc::from("1")));
        assert_eq!(Value::Str(Rc::from("a")), Value::Str(Rc::from("a")));
    }
}
