//! Walks the render tree against a data mapping.
//!
//! Values are plain `serde_json::Value`s and follow JavaScript conventions
//! where templates expect them: truthiness, `+` concatenating strings,
//! missing properties reading as `null`, and `null` printing as nothing.

use serde_json::{Map, Value};

use crate::error::{RenderError, Result};

use super::TemplateHost;
use super::escape::html_escape;
use super::expr::{BinaryOp, Expr, UnaryOp};
use super::parse::Node;

pub(crate) struct Renderer<'a, 'h> {
    data: &'a Value,
    locals: Vec<(String, Value)>,
    host: &'a mut (dyn TemplateHost + 'h),
    out: String,
}

impl<'a, 'h> Renderer<'a, 'h> {
    pub(crate) fn new(data: &'a Value, host: &'a mut (dyn TemplateHost + 'h)) -> Self {
        Self {
            data,
            locals: Vec::new(),
            host,
            out: String::new(),
        }
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    pub(crate) fn render(&mut self, nodes: &[Node]) -> Result<()> {
        let scope = self.locals.len();
        for node in nodes {
            self.render_node(node)?;
        }
        self.locals.truncate(scope);
        Ok(())
    }

    fn render_node(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Text(text) => self.out.push_str(text),
            Node::Output { expr, escape } => {
                let value = self.eval(expr)?;
                let text = display(&value);
                if *escape {
                    self.out.push_str(&html_escape(&text));
                } else {
                    self.out.push_str(&text);
                }
            }
            Node::If {
                branches,
                otherwise,
            } => {
                for (cond, body) in branches {
                    if truthy(&self.eval(cond)?) {
                        return self.render(body);
                    }
                }
                if let Some(body) = otherwise {
                    self.render(body)?;
                }
            }
            Node::For {
                key,
                value,
                iterable,
                body,
            } => {
                let entries: Vec<(Value, Value)> = match self.eval(iterable)? {
                    Value::Array(items) => items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| (Value::from(i), item))
                        .collect(),
                    Value::Object(map) => map
                        .into_iter()
                        .map(|(k, v)| (Value::String(k), v))
                        .collect(),
                    Value::Null => Vec::new(),
                    other => {
                        return Err(RenderError::NotIterable {
                            type_name: type_name(&other),
                        }
                        .into());
                    }
                };
                for (k, v) in entries {
                    let scope = self.locals.len();
                    if let Some(key) = key {
                        self.locals.push((key.clone(), k));
                    }
                    self.locals.push((value.clone(), v));
                    self.render(body)?;
                    self.locals.truncate(scope);
                }
            }
            Node::Let { name, value } => {
                let value = self.eval(value)?;
                self.locals.push((name.clone(), value));
            }
            Node::Eval(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Value> {
        if let Some((_, value)) = self.locals.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        match self.data.get(name) {
            Some(value) => Ok(value.clone()),
            None => Err(RenderError::UndefinedVariable {
                name: name.to_string(),
            }
            .into()),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value> {
        Ok(match expr {
            Expr::Literal(value) => value.clone(),
            Expr::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Expr::Object(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    let value = self.eval(value)?;
                    map.insert(key.clone(), value);
                }
                Value::Object(map)
            }
            Expr::Var(name) => self.lookup(name)?,
            Expr::Member(target, name) => member(&self.eval(target)?, name),
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                match (&target, &index) {
                    (Value::Array(items), Value::Number(n)) => n
                        .as_u64()
                        .and_then(|i| items.get(i as usize))
                        .cloned()
                        .unwrap_or(Value::Null),
                    (Value::String(s), Value::Number(n)) => n
                        .as_u64()
                        .and_then(|i| s.chars().nth(i as usize))
                        .map(|c| Value::String(c.to_string()))
                        .unwrap_or(Value::Null),
                    (_, Value::String(key)) => member(&target, key),
                    _ => Value::Null,
                }
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>>>()?;
                self.host.call(name, &args)?
            }
            Expr::Unary(UnaryOp::Not, inner) => Value::Bool(!truthy(&self.eval(inner)?)),
            Expr::Unary(UnaryOp::Neg, inner) => match self.eval(inner)? {
                Value::Number(n) => number(-n.as_f64().unwrap_or(0.0)),
                other => {
                    return Err(RenderError::InvalidOperand {
                        op: "-",
                        reason: format!("cannot negate {}", type_name(&other)),
                    }
                    .into());
                }
            },
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if truthy(&left) { self.eval(right)? } else { left }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if truthy(&left) { left } else { self.eval(right)? }
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)?
            }
        })
    }
}

fn member(target: &Value, name: &str) -> Value {
    match target {
        Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
        Value::Array(items) if name == "length" => Value::from(items.len()),
        Value::String(s) if name == "length" => Value::from(s.chars().count()),
        _ => Value::Null,
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    let value = match op {
        BinaryOp::Eq => Value::Bool(loose_eq(left, right)),
        BinaryOp::Ne => Value::Bool(!loose_eq(left, right)),
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => {
                number(a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0))
            }
            (Value::String(_), _) | (_, Value::String(_)) => {
                Value::String(display(left) + &display(right))
            }
            _ => return Err(operand_error(op, left, right)),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(operand_error(op, left, right));
            };
            if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0.0 {
                return Err(RenderError::InvalidOperand {
                    op: op.symbol(),
                    reason: "division by zero".to_string(),
                }
                .into());
            }
            number(match op {
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            })
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::Number(a), Value::Number(b)) => a
                    .as_f64()
                    .unwrap_or(0.0)
                    .partial_cmp(&b.as_f64().unwrap_or(0.0)),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => return Err(operand_error(op, left, right)),
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    };
    Ok(value)
}

fn operand_error(op: BinaryOp, left: &Value, right: &Value) -> crate::error::ViewError {
    RenderError::InvalidOperand {
        op: op.symbol(),
        reason: format!("{} and {}", type_name(left), type_name(right)),
    }
    .into()
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// Builds a JSON number, keeping whole values integral so they print as `42`
pub(crate) fn number(n: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text a value contributes to the output
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
