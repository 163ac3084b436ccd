//! Recursive-descent parser for the sandboxed expression language.
//!
//! The grammar is a small JS-flavoured statement/expression language:
//! `let` bindings, assignment, `if`/`else`, `while`, blocks, and the usual
//! arithmetic/comparison/logical operators over numbers, strings, arrays,
//! and objects. Recursion depth is capped so pathological nesting fails
//! with a syntax error instead of exhausting the stack.

use super::lexer::{describe, Token};
use super::EvalError;

/// Maximum parser recursion depth.
const MAX_PARSE_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Member(Box<Expr>, String),
    Call(Box<Expr>, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    Let(String, Expr),
    Assign(String, Expr),
    Expr(Expr),
    If(Expr, Vec<Stmt>, Option<Vec<Stmt>>),
    While(Expr, Vec<Stmt>),
    Block(Vec<Stmt>),
}

/// Parse a token stream into a statement list. An empty stream is a
/// syntax error so `evaluate("")` has a pinned, deterministic outcome.
pub(crate) fn parse(tokens: Vec<Token>) -> Result<Vec<Stmt>, EvalError> {
    if tokens.is_empty() {
        return Err(EvalError::Syntax("empty program".to_string()));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let mut stmts = Vec::new();
    while !parser.at_end() {
        stmts.push(parser.parse_stmt()?);
    }
    Ok(stmts)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), EvalError> {
        match self.advance() {
            Some(token) if &token == expected => Ok(()),
            Some(token) => Err(EvalError::Syntax(format!(
                "expected {}, found {}",
                describe(expected),
                describe(&token)
            ))),
            None => Err(EvalError::Syntax(format!(
                "expected {}, found end of input",
                describe(expected)
            ))),
        }
    }

    fn expect_ident(&mut self) -> Result<String, EvalError> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            Some(token) => Err(EvalError::Syntax(format!(
                "expected an identifier, found {}",
                describe(&token)
            ))),
            None => Err(EvalError::Syntax(
                "expected an identifier, found end of input".to_string(),
            )),
        }
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(EvalError::Syntax(
                "expression nesting too deep".to_string(),
            ));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    // -- statements ---------------------------------------------------------

    fn parse_stmt(&mut self) -> Result<Stmt, EvalError> {
        self.descend()?;
        let stmt = match self.peek() {
            Some(Token::Let) => {
                self.pos += 1;
                let name = self.expect_ident()?;
                self.expect(&Token::Assign)?;
                let value = self.parse_expr()?;
                Ok(Stmt::Let(name, value))
            }
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => {
                self.pos += 1;
                self.expect(&Token::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                let body = self.parse_block()?;
                Ok(Stmt::While(cond, body))
            }
            Some(Token::LBrace) => Ok(Stmt::Block(self.parse_block()?)),
            Some(Token::Ident(_)) if self.peek_ahead(1) == Some(&Token::Assign) => {
                let name = self.expect_ident()?;
                self.pos += 1; // `=`
                let value = self.parse_expr()?;
                Ok(Stmt::Assign(name, value))
            }
            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }?;
        self.ascend();
        // Statement terminators are optional.
        self.eat(&Token::Semicolon);
        Ok(stmt)
    }

    fn parse_if(&mut self) -> Result<Stmt, EvalError> {
        self.expect(&Token::If)?;
        self.expect(&Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen)?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.eat(&Token::Else) {
            if self.peek() == Some(&Token::If) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If(cond, then_branch, else_branch))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, EvalError> {
        self.expect(&Token::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                return Ok(stmts);
            }
            if self.at_end() {
                return Err(EvalError::Syntax(
                    "expected `}`, found end of input".to_string(),
                ));
            }
            stmts.push(self.parse_stmt()?);
        }
    }

    // -- expressions --------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        self.descend()?;
        let expr = self.parse_or();
        self.ascend();
        expr
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_equality()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinOp::Eq,
                Some(Token::Ne) => BinOp::Ne,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_comparison()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Ge) => BinOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_factor()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_factor(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Bang) => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            self.descend()?;
            let inner = self.parse_unary()?;
            self.ascend();
            return Ok(Expr::Unary(op, Box::new(inner)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Token::LParen) {
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                        // Allow a trailing comma before `)`.
                        if self.eat(&Token::RParen) {
                            break;
                        }
                    }
                }
                expr = Expr::Call(Box::new(expr), args);
            } else if self.eat(&Token::LBracket) {
                let index = self.parse_expr()?;
                self.expect(&Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat(&Token::Dot) {
                let name = self.expect_ident()?;
                expr = Expr::Member(Box::new(expr), name);
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Null) => Ok(Expr::Null),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                loop {
                    if self.eat(&Token::RBracket) {
                        return Ok(Expr::Array(items));
                    }
                    if self.at_end() {
                        return Err(EvalError::Syntax(
                            "expected `]`, found end of input".to_string(),
                        ));
                    }
                    items.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) {
                        self.expect(&Token::RBracket)?;
                        return Ok(Expr::Array(items));
                    }
                }
            }
            Some(Token::LBrace) => {
                let mut pairs = Vec::new();
                loop {
                    if self.eat(&Token::RBrace) {
                        return Ok(Expr::Object(pairs));
                    }
                    let key = match self.advance() {
                        Some(Token::Ident(name)) => name,
                        Some(Token::Str(s)) => s,
                        Some(token) => {
                            return Err(EvalError::Syntax(format!(
                                "expected an object key, found {}",
                                describe(&token)
                            )));
                        }
                        None => {
                            return Err(EvalError::Syntax(
                                "expected an object key, found end of input".to_string(),
                            ));
                        }
                    };
                    self.expect(&Token::Colon)?;
                    let value = self.parse_expr()?;
                    pairs.push((key, value));
                    if !self.eat(&Token::Comma) {
                        self.expect(&Token::RBrace)?;
                        return Ok(Expr::Object(pairs));
                    }
                }
            }
            Some(token) => Err(EvalError::Syntax(format!(
                "expected an expression, found {}",
                describe(&token)
            ))),
            None => Err(EvalError::Syntax(
                "expected an expression, found end of input".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::lexer::tokenize;

    fn parse_source(source: &str) -> Result<Vec<Stmt>, EvalError> {
        parse(tokenize(source)?)
    }

    #[test]
    fn test_parse_precedence() {
        let stmts = parse_source("1 + 2 * 3").unwrap();
        assert_eq!(
            stmts,
            vec![Stmt::Expr(Expr::Binary(
                BinOp::Add,
                Box::new(Expr::Num(1.0)),
                Box::new(Expr::Binary(
                    BinOp::Mul,
                    Box::new(Expr::Num(2.0)),
                    Box::new(Expr::Num(3.0))
                ))
            ))]
        );
    }

    #[test]
    fn test_parse_let_and_assign() {
        let stmts = parse_source("let x = 1; x = 2; x").unwrap();
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[0], Stmt::Let(..)));
        assert!(matches!(stmts[1], Stmt::Assign(..)));
        assert!(matches!(stmts[2], Stmt::Expr(..)));
    }

    #[test]
    fn test_parse_if_else_chain() {
        let stmts = parse_source("if (a) { 1 } else if (b) { 2 } else { 3 }").unwrap();
        let Stmt::If(_, _, Some(else_branch)) = &stmts[0] else {
            panic!("expected an if statement with an else branch");
        };
        assert!(matches!(else_branch[0], Stmt::If(..)));
    }

    #[test]
    fn test_parse_while() {
        let stmts = parse_source("while (true) {}").unwrap();
        assert!(matches!(stmts[0], Stmt::While(..)));
    }

    #[test]
    fn test_parse_call_and_postfix() {
        let stmts = parse_source("min(1, 2)[0].a").unwrap();
        let Stmt::Expr(Expr::Member(inner, name)) = &stmts[0] else {
            panic!("expected a member expression");
        };
        assert_eq!(name, "a");
        assert!(matches!(inner.as_ref(), Expr::Index(..)));
    }

    #[test]
    fn test_parse_object_literal_in_expression() {
        let stmts = parse_source("let o = {a: 1, \"x y\": 2}").unwrap();
        let Stmt::Let(_, Expr::Object(pairs)) = &stmts[0] else {
            panic!("expected an object literal");
        };
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_parse_unbalanced_brace_is_syntax_error() {
        let err = parse_source("{").unwrap_err();
        assert!(matches!(err, EvalError::Syntax(_)));
    }

    #[test]
    fn test_parse_empty_program_is_syntax_error() {
        let err = parse_source("").unwrap_err();
        assert!(matches!(err, EvalError::Syntax(m) if m == "empty program"));
    }

    #[test]
    fn test_parse_depth_cap() {
        let source = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        let err = parse_source(&source).unwrap_err();
        assert!(matches!(err, EvalError::Syntax(m) if m.contains("nesting")));
    }

    #[test]
    fn test_parse_trailing_garbage_is_syntax_error() {
        let err = parse_source("1 + ").unwrap_err();
        assert!(matches!(err, EvalError::Syntax(_)));
    }
}
