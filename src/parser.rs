// declaration → "var" IDENTIFIER ( "=" expression )? ";" | statement ;
// statement   → "if" "(" expression ")" statement ( "else" statement )?
//             | "print" expression ";" | "{" declaration* "}" | expression ";" ;
// assignment  → logic_or ( "=" assignment )? ;
// logic_or    → logic_and ( "or" logic_and )* ;
// logic_and   → equality ( "and" equality )* ;
// equality    → comparison ( ( "!=" | "==" ) comparison )* ;
// comparison  → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
// term        → factor ( ( "-" | "+" ) factor )* ;
// factor      → unary ( ( "/" | "*" ) unary )* ;
// unary       → ( "!" | "-" ) unary | primary ;
// primary     → NUMBER | STRING | "true" | "false" | "nil" | IDENTIFIER | "(" expression ")" ;

pub mod ast;
pub mod printer;

use crate::parser::ast::{Expr, Literal, Stmt};
use crate::scanner::token::{self, Token, TokenType};
use std::fmt;

// Deepest tree the parser will build. Parsing and evaluation both recurse
// once per level, so this bounds their stack use.
const MAX_NESTING: usize = 255;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {} at '{}': {}",
            self.token.line, self.token.lexeme, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Statements that parsed cleanly, plus every diagnostic seen on the way.
/// A statement that failed is absent from `statements`.
#[derive(Debug)]
pub struct ParseResult {
    pub statements: Vec<Stmt>,
    pub errors: Vec<ParseError>,
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    /// `tokens` must end with an `Eof` token, as `Scanner::scan_tokens` guarantees.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| t.token_type != TokenType::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenType::Eof, "", line));
        }
        Self {
            tokens,
            current: 0,
            depth: 0,
            errors: Vec::new(),
        }
    }

    // utility methods
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, token_type: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek().token_type == token_type
    }

    fn match_any(&mut self, types: &[TokenType]) -> bool {
        for t in types {
            if self.check(*t) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn error(&self, token: &Token, message: &str) -> ParseError {
        ParseError {
            token: token.clone(),
            message: message.to_string(),
        }
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<Token, ParseError> {
        if self.check(token_type) {
            Ok(self.advance().clone())
        } else {
            Err(self.error(self.peek(), message))
        }
    }

    fn nest(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error(self.peek(), "Too much nesting."));
        }
        Ok(())
    }

    // Runs `parse` one level deeper; the depth is restored on every path out.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = self.depth;
        let result = self.nest().and_then(|()| parse(self));
        self.depth = saved;
        result
    }

    pub fn parse(mut self) -> ParseResult {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        ParseResult {
            statements,
            errors: self.errors,
        }
    }

    // Panic-mode recovery: drop tokens until just past a ';' or right before a
    // keyword that starts a statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_any(&[TokenType::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;

        let initializer = if self.match_any(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.match_any(&[TokenType::If]) {
            self.nested(Self::if_statement)
        } else if self.match_any(&[TokenType::Print]) {
            self.print_statement()
        } else if self.match_any(&[TokenType::LeftBrace]) {
            Ok(Stmt::Block(self.nested(Self::block)?))
        } else {
            self.expression_statement()
        }
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        // a dangling else binds to the nearest if
        let else_branch = if self.match_any(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> Result<Stmt, ParseError> {
        let value = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.logic_or()?;

        if self.match_any(&[TokenType::Equal]) {
            let equals = self.previous().clone();
            let value = self.nested(Self::assignment)?; // right-associative

            return match expr {
                Expr::Variable(name) => Ok(Expr::Assign {
                    name,
                    value: Box::new(value),
                }),
                target => {
                    // Reported, but the parser is not confused: keep going
                    // with the left-hand side as if there were no '='.
                    let error = self.error(&equals, "Invalid assignment target.");
                    self.errors.push(error);
                    Ok(target)
                }
            };
        }

        Ok(expr)
    }

    fn logic_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.logic_and()?;

        let saved = self.depth;
        while self.match_any(&[TokenType::Or]) {
            self.nest()?;
            let operator = self.previous().clone();
            let right = self.logic_and()?;
            left = Expr::Logical {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        self.depth = saved;

        Ok(left)
    }

    fn logic_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;

        let saved = self.depth;
        while self.match_any(&[TokenType::And]) {
            self.nest()?;
            let operator = self.previous().clone();
            let right = self.equality()?;
            left = Expr::Logical {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        self.depth = saved;

        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[TokenType::BangEqual, TokenType::EqualEqual],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Less,
                TokenType::LessEqual,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[TokenType::Minus, TokenType::Plus], Self::factor)
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[TokenType::Slash, TokenType::Star], Self::unary)
    }

    // One left-associative precedence level: operand ( op operand )*
    fn binary_level(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut left = operand(self)?;

        // every operator in a chain adds a level to the left spine
        let saved = self.depth;
        while self.match_any(operators) {
            self.nest()?;
            let operator = self.previous().clone();
            let right = operand(self)?;
            left = Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        self.depth = saved;

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.match_any(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous().clone();
            let right = self.nested(Self::unary)?; // recursive for chained unary: --x
            Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            })
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();

        let expr = match token.token_type {
            TokenType::False => Expr::Literal(Literal::Bool(false)),
            TokenType::True => Expr::Literal(Literal::Bool(true)),
            TokenType::Nil => Expr::Literal(Literal::Nil),
            TokenType::Number | TokenType::String => match token.literal.clone() {
                Some(token::Literal::Number(n)) => Expr::Literal(Literal::Number(n)),
                Some(token::Literal::Str(s)) => Expr::Literal(Literal::Str(s)),
                None => return Err(self.error(&token, "Expect literal value.")),
            },
            TokenType::Identifier => Expr::Variable(token),
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                return Ok(Expr::Grouping(Box::new(expr)));
            }
            _ => return Err(self.error(&token, "Expect expression.")),
        };

        self.advance();
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::default_keywords;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> ParseResult {
        let keywords = default_keywords();
        let scanned = Scanner::new(source, &keywords).scan_tokens();
        assert!(scanned.errors.is_empty(), "scan errors: {:?}", scanned.errors);
        Parser::new(scanned.tokens).parse()
    }

    fn parse_stmt(source: &str) -> Stmt {
        let result = parse(source);
        assert!(result.errors.is_empty(), "parse errors: {:?}", result.errors);
        assert_eq!(result.statements.len(), 1, "Expected one statement");
        result.statements.into_iter().next().unwrap()
    }

    fn parse_expr(source: &str) -> Expr {
        match parse_stmt(&format!("{};", source)) {
            Stmt::Expression(expr) => expr,
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Literal::Number(n)))
    }

    fn op(token_type: TokenType, lexeme: &str) -> Token {
        Token::new(token_type, lexeme, 1)
    }

    #[test]
    fn test_precedence_mul_over_add() {
        assert_eq!(
            parse_expr("2+3*4"),
            Expr::Binary {
                left: num(2.0),
                operator: op(TokenType::Plus, "+"),
                right: Box::new(Expr::Binary {
                    left: num(3.0),
                    operator: op(TokenType::Star, "*"),
                    right: num(4.0),
                }),
            }
        );
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        assert_eq!(
            parse_expr("8-4-2"),
            Expr::Binary {
                left: Box::new(Expr::Binary {
                    left: num(8.0),
                    operator: op(TokenType::Minus, "-"),
                    right: num(4.0),
                }),
                operator: op(TokenType::Minus, "-"),
                right: num(2.0),
            }
        );
    }

    #[test]
    fn test_unary_is_right_associative() {
        assert_eq!(
            parse_expr("!!true"),
            Expr::Unary {
                operator: op(TokenType::Bang, "!"),
                right: Box::new(Expr::Unary {
                    operator: op(TokenType::Bang, "!"),
                    right: Box::new(Expr::Literal(Literal::Bool(true))),
                }),
            }
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let a = Token::new(TokenType::Identifier, "a", 1);
        let b = Token::new(TokenType::Identifier, "b", 1);
        assert_eq!(
            parse_expr("a = b = 1"),
            Expr::Assign {
                name: a,
                value: Box::new(Expr::Assign {
                    name: b,
                    value: num(1.0),
                }),
            }
        );
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        match parse_expr("a or b and c") {
            Expr::Logical {
                operator, right, ..
            } => {
                assert_eq!(operator.token_type, TokenType::Or);
                assert!(matches!(*right, Expr::Logical { .. }));
            }
            other => panic!("Expected logical expression, got {:?}", other),
        }
    }

    #[test]
    fn test_grouping() {
        assert_eq!(parse_expr("(1)"), Expr::Grouping(num(1.0)));
    }

    #[test]
    fn test_var_declaration_without_initializer() {
        match parse_stmt("var x;") {
            Stmt::Var { name, initializer } => {
                assert_eq!(name.lexeme, "x");
                assert!(initializer.is_none());
            }
            other => panic!("Expected var declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else_binds_to_nearest_if() {
        match parse_stmt("if (a) if (b) print 1; else print 2;") {
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                assert!(else_branch.is_none());
                assert!(matches!(
                    *then_branch,
                    Stmt::If {
                        else_branch: Some(_),
                        ..
                    }
                ));
            }
            other => panic!("Expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_block_holds_declarations() {
        match parse_stmt("{ var a = 1; print a; }") {
            Stmt::Block(statements) => {
                assert_eq!(statements.len(), 2);
                assert!(matches!(statements[0], Stmt::Var { .. }));
                assert!(matches!(statements[1], Stmt::Print(_)));
            }
            other => panic!("Expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_two_bad_statements_give_two_errors() {
        let result = parse("print ;\nvar = 1;\nprint 3;");
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].message, "Expect expression.");
        assert_eq!(result.errors[1].message, "Expect variable name.");
        // the good statement after the bad ones survives
        assert_eq!(result.statements.len(), 1);
    }

    #[test]
    fn test_synchronize_resumes_after_semicolon() {
        let result = parse("1 + ; print 2;");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.statements.len(), 1);
        assert!(matches!(result.statements[0], Stmt::Print(_)));
    }

    #[test]
    fn test_synchronize_stops_before_keyword() {
        let result = parse("var 1 print 2;");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].token.lexeme, "1");
        assert_eq!(result.statements.len(), 1);
        assert!(matches!(result.statements[0], Stmt::Print(_)));
    }

    #[test]
    fn test_missing_semicolon_at_eof() {
        let result = parse("print 1");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].token.token_type, TokenType::Eof);
        assert_eq!(result.errors[0].message, "Expect ';' after value.");
        assert!(result.statements.is_empty());
    }

    #[test]
    fn test_invalid_assignment_target_keeps_statement() {
        let result = parse("1 = 2;");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Invalid assignment target.");
        assert_eq!(result.errors[0].token.lexeme, "=");
        assert_eq!(
            result.statements,
            vec![Stmt::Expression(Expr::Literal(Literal::Number(1.0)))]
        );
    }

    #[test]
    fn test_unclosed_block() {
        let result = parse("{ print 1;");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Expect '}' after block.");
    }

    // Parses on a thread with the main thread's usual 8 MiB stack.
    fn parse_on_main_sized_stack(source: String) -> ParseResult {
        std::thread::Builder::new()
            .stack_size(8 << 20)
            .spawn(move || parse(&source))
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn test_deeply_nested_groupings_are_a_syntax_error() {
        let source = format!("print {}1{};\nprint 2;", "(".repeat(10_000), ")".repeat(10_000));
        let result = parse_on_main_sized_stack(source);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Too much nesting.");
        assert_eq!(result.errors[0].token.lexeme, "(");
        // recovery resumes at the next statement
        assert_eq!(result.statements.len(), 1);
        assert!(matches!(result.statements[0], Stmt::Print(_)));
    }

    #[test]
    fn test_deep_unary_and_long_chains_are_bounded() {
        let unary = parse_on_main_sized_stack(format!("print {}1;", "-".repeat(10_000)));
        assert_eq!(unary.errors.len(), 1);
        assert_eq!(unary.errors[0].message, "Too much nesting.");

        let chain = parse_on_main_sized_stack(format!("print 1{};", "+1".repeat(10_000)));
        assert_eq!(chain.errors.len(), 1);
        assert_eq!(chain.errors[0].message, "Too much nesting.");

        let blocks = parse_on_main_sized_stack(format!("{}{}", "{".repeat(10_000), "}".repeat(10_000)));
        assert!(blocks
            .errors
            .iter()
            .any(|e| e.message == "Too much nesting."));
    }

    #[test]
    fn test_moderate_nesting_still_parses() {
        let source = format!("print {}1{};", "(".repeat(100), ")".repeat(100));
        let result = parse_on_main_sized_stack(source);
        assert!(result.errors.is_empty(), "parse errors: {:?}", result.errors);
        assert_eq!(result.statements.len(), 1);
    }

    #[test]
    fn test_parser_appends_missing_eof() {
        let result = Parser::new(Vec::new()).parse();
        assert!(result.statements.is_empty());
        assert!(result.errors.is_empty());
    }
}
