//! Expression tokens, syntax tree and parser for the code inside tags.

use serde_json::Value;

use crate::error::CompileError;

/// Punctuators, longest first so that `===` wins over `==` and `=`
const PUNCTS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "(", ")", "[", "]", "{", "}", ",", ":",
    ".", "!", "<", ">", "+", "-", "*", "/", "%", "=", ";",
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

pub(crate) fn tokenize(src: &str, line: usize) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() {
            let mut end = i;
            while let Some(&(j, d)) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    end = j + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let number = src[i..end]
                .parse::<f64>()
                .map_err(|_| CompileError::new(line, format!("invalid number '{}'", &src[i..end])))?;
            tokens.push(Token::Number(number));
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let mut end = i;
            while let Some(&(j, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' || d == '$' {
                    end = j + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(src[i..end].to_string()));
        } else if c == '\'' || c == '"' {
            chars.next();
            let mut value = String::new();
            let mut closed = false;
            while let Some((_, d)) = chars.next() {
                match d {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, 'r')) => value.push('\r'),
                        Some((_, other)) => value.push(other),
                        None => break,
                    },
                    d if d == c => {
                        closed = true;
                        break;
                    }
                    d => value.push(d),
                }
            }
            if !closed {
                return Err(CompileError::new(line, "unterminated string literal"));
            }
            tokens.push(Token::Str(value));
        } else {
            let rest = &src[i..];
            let Some(punct) = PUNCTS.iter().find(|p| rest.starts_with(**p)) else {
                return Err(CompileError::new(line, format!("unexpected character '{}'", c)));
            };
            for _ in 0..punct.len() {
                chars.next();
            }
            tokens.push(Token::Punct(punct));
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Var(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    /// Call to a helper served by the template host (`include`, `script`, ...)
    Call(String, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// Recursive-descent parser over the tokens of one tag
pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
}

impl Parser {
    pub(crate) fn new(src: &str, line: usize) -> Result<Self, CompileError> {
        Ok(Self {
            tokens: tokenize(src, line)?,
            pos: 0,
            line,
        })
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(self.line, message)
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn eat_punct(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(name)) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_punct(&mut self, punct: &str) -> Result<(), CompileError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}', found {}", punct, self.describe_next())))
        }
    }

    pub(crate) fn expect_ident(&mut self) -> Result<String, CompileError> {
        match self.next() {
            Some(Token::Ident(name)) if !is_reserved(&name) => Ok(name),
            other => {
                let found = other.as_ref().map(describe).unwrap_or_else(|| "end of tag".into());
                Err(self.error(format!("expected a name, found {}", found)))
            }
        }
    }

    /// Fails unless every token was consumed (an optional `;` may remain)
    pub(crate) fn finish(&mut self) -> Result<(), CompileError> {
        self.eat_punct(";");
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.error(format!("unexpected {}", self.describe_next())))
        }
    }

    fn describe_next(&self) -> String {
        self.peek().map(describe).unwrap_or_else(|| "end of tag".into())
    }

    pub(crate) fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_and()?;
        while self.eat_punct("||") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_equality()?;
        while self.eat_punct("&&") {
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = if self.eat_punct("===") || self.eat_punct("==") {
                BinaryOp::Eq
            } else if self.eat_punct("!==") || self.eat_punct("!=") {
                BinaryOp::Ne
            } else {
                return Ok(left);
            };
            let right = self.parse_comparison()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.eat_punct("<=") {
                BinaryOp::Le
            } else if self.eat_punct(">=") {
                BinaryOp::Ge
            } else if self.eat_punct("<") {
                BinaryOp::Lt
            } else if self.eat_punct(">") {
                BinaryOp::Gt
            } else {
                return Ok(left);
            };
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_punct("+") {
                BinaryOp::Add
            } else if self.eat_punct("-") {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat_punct("*") {
                BinaryOp::Mul
            } else if self.eat_punct("/") {
                BinaryOp::Div
            } else if self.eat_punct("%") {
                BinaryOp::Rem
            } else {
                return Ok(left);
            };
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        if self.eat_punct("!") {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.parse_unary()?)));
        }
        if self.eat_punct("-") {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_unary()?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_punct(".") {
                let name = match self.next() {
                    Some(Token::Ident(name)) => name,
                    _ => return Err(self.error("expected a property name after '.'")),
                };
                expr = Expr::Member(Box::new(expr), name);
            } else if self.eat_punct("[") {
                let index = self.parse_expr()?;
                self.expect_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if matches!(self.peek(), Some(Token::Punct("("))) {
                return Err(self.error("only helper functions such as include() can be called"));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Literal(super::eval::number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                "this" => {
                    self.expect_punct(".")?;
                    let helper = self.expect_ident()?;
                    if !matches!(self.peek(), Some(Token::Punct("("))) {
                        return Err(self.error(format!("this.{} must be called", helper)));
                    }
                    self.parse_call(helper)
                }
                _ if is_reserved(&name) => Err(self.error(format!("unexpected keyword '{}'", name))),
                _ if matches!(self.peek(), Some(Token::Punct("("))) => self.parse_call(name),
                _ => Ok(Expr::Var(name)),
            },
            Some(Token::Punct("(")) => {
                let inner = self.parse_expr()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            Some(Token::Punct("[")) => {
                let mut items = Vec::new();
                while !self.eat_punct("]") {
                    items.push(self.parse_expr()?);
                    if !self.eat_punct(",") {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            Some(Token::Punct("{")) => {
                let mut fields = Vec::new();
                while !self.eat_punct("}") {
                    let key = match self.next() {
                        Some(Token::Ident(key)) | Some(Token::Str(key)) => key,
                        _ => return Err(self.error("expected an object key")),
                    };
                    let value = if self.eat_punct(":") {
                        self.parse_expr()?
                    } else {
                        // shorthand `{ post }`
                        Expr::Var(key.clone())
                    };
                    fields.push((key, value));
                    if !self.eat_punct(",") {
                        self.expect_punct("}")?;
                        break;
                    }
                }
                Ok(Expr::Object(fields))
            }
            Some(other) => Err(self.error(format!("unexpected {}", describe(&other)))),
            None => Err(self.error("expected an expression")),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Expr, CompileError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            args.push(self.parse_expr()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(Expr::Call(name, args))
    }
}

fn is_reserved(name: &str) -> bool {
    matches!(name, "if" | "else" | "for" | "in" | "let" | "this")
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => format!("number {}", n),
        Token::Str(s) => format!("string '{}'", s),
        Token::Ident(name) => format!("'{}'", name),
        Token::Punct(p) => format!("'{}'", p),
    }
}
