use crate::interpreter::value::format_number;
use crate::parser::ast::{Expr, Literal, Stmt};

/// Renders syntax trees in a fully parenthesized prefix form, which makes
/// precedence and grouping visible at a glance: `1 + 2 * 3` prints as
/// `(+ 1 (* 2 3))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print_expr(expr)),
            Stmt::Print(expr) => format!("(print {})", Self::print_expr(expr)),
            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print_expr(init)),
                None => format!("(var {})", name.lexeme),
            },
            Stmt::Block(statements) => {
                let mut out = String::from("(block");
                for stmt in statements {
                    out.push(' ');
                    out.push_str(&Self::print_stmt(stmt));
                }
                out.push(')');
                out
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print_expr(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print_expr(condition),
                    Self::print_stmt(then_branch)
                ),
            },
        }
    }

    pub fn print_expr(expr: &Expr) -> String {
        match expr {
            Expr::Literal(literal) => match literal {
                Literal::Nil => "nil".to_string(),
                Literal::Bool(b) => b.to_string(),
                Literal::Number(n) => format_number(*n),
                Literal::Str(s) => format!("{:?}", s),
            },
            Expr::Grouping(inner) => format!("(group {})", Self::print_expr(inner)),
            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print_expr(right))
            }
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print_expr(left),
                Self::print_expr(right)
            ),
            Expr::Variable(name) => name.lexeme.clone(),
            Expr::Assign { name, value } => {
                format!("(= {} {})", name.lexeme, Self::print_expr(value))
            }
        }
    }
}
