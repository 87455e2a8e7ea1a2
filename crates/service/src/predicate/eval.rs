//! In-process evaluation of predicates against any serde record.
//!
//! Fields are read from the record's serde representation, so the names a
//! predicate uses are the serialized field names of `T`.
//!
//! Nulls follow SQL three-valued logic: comparing a null field against a
//! literal, or running a text operator over one, is unknown. `not` keeps
//! unknown unknown, and a record matches only when the whole predicate is
//! true. `eq null` / `ne null` test for presence and are never unknown. Text
//! operators are case-sensitive.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value as Json};
use thiserror::Error;

use super::{CompareOp, Expr, Predicate, TextOp, Value};
use crate::errors::ServiceError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("record does not serialize to an object: {0}")]
    NotARecord(String),
    #[error("unknown field: {0}")]
    UnknownField(String),
}

impl From<EvalError> for ServiceError {
    fn from(e: EvalError) -> Self {
        ServiceError::InvalidArgument(e.to_string())
    }
}

impl<T: Serialize> Predicate<T> {
    /// Evaluate against one record.
    pub fn matches(&self, record: &T) -> Result<bool, EvalError> {
        let json = serde_json::to_value(record).map_err(|e| EvalError::NotARecord(e.to_string()))?;
        let Json::Object(fields) = json else {
            return Err(EvalError::NotARecord(format!("{json}")));
        };
        Ok(eval_expr(self.expr(), &fields)?.unwrap_or(false))
    }
}

/// Evaluate a bare expression against a serde object. `None` is SQL unknown.
pub fn eval_expr(expr: &Expr, fields: &Map<String, Json>) -> Result<Option<bool>, EvalError> {
    Ok(match expr {
        Expr::Const(b) => Some(*b),
        Expr::Compare { field, op, value } => {
            let actual = read(fields, field)?;
            compare(actual.as_ref(), *op, value)
        }
        Expr::In { field, values } => {
            let actual = read(fields, field)?;
            let mut result = Some(false);
            for v in values {
                match compare(actual.as_ref(), CompareOp::Eq, v) {
                    Some(true) => return Ok(Some(true)),
                    Some(false) => {}
                    None => result = None,
                }
            }
            result
        }
        Expr::Text { field, op, pattern } => match read(fields, field)? {
            Some(Value::String(s)) => Some(match op {
                TextOp::Contains => s.contains(pattern.as_str()),
                TextOp::StartsWith => s.starts_with(pattern.as_str()),
                TextOp::EndsWith => s.ends_with(pattern.as_str()),
            }),
            Some(Value::Null) => None,
            _ => Some(false),
        },
        Expr::IsNull(field) => Some(matches!(read(fields, field)?, Some(Value::Null))),
        Expr::And(xs) => {
            let mut result = Some(true);
            for x in xs {
                match eval_expr(x, fields)? {
                    Some(false) => return Ok(Some(false)),
                    Some(true) => {}
                    None => result = None,
                }
            }
            result
        }
        Expr::Or(xs) => {
            let mut result = Some(false);
            for x in xs {
                match eval_expr(x, fields)? {
                    Some(true) => return Ok(Some(true)),
                    Some(false) => {}
                    None => result = None,
                }
            }
            result
        }
        Expr::Not(x) => eval_expr(x, fields)?.map(|b| !b),
    })
}

/// `Ok(None)` for composite values (arrays, nested objects), which compare
/// false against every literal.
pub(crate) fn read(fields: &Map<String, Json>, name: &str) -> Result<Option<Value>, EvalError> {
    let raw = fields.get(name).ok_or_else(|| EvalError::UnknownField(name.to_owned()))?;
    Ok(match raw {
        Json::Null => Some(Value::Null),
        Json::Bool(b) => Some(Value::Bool(*b)),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Int(i)),
            None => n.as_f64().map(Value::Float),
        },
        Json::String(s) => Some(Value::String(s.clone())),
        Json::Array(_) | Json::Object(_) => None,
    })
}

fn compare(actual: Option<&Value>, op: CompareOp, expected: &Value) -> Option<bool> {
    let Some(actual) = actual else { return Some(false) };
    match (actual.is_null(), expected.is_null()) {
        (true, true) => return Some(op == CompareOp::Eq),
        (false, true) => return Some(op == CompareOp::Ne),
        (true, false) => return None,
        (false, false) => {}
    }
    let Some(ord) = order(actual, expected) else { return Some(false) };
    Some(match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Ne => ord != Ordering::Equal,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Ge => ord != Ordering::Less,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
    })
}

pub(crate) fn order(a: &Value, b: &Value) -> Option<Ordering> {
    use Value as V;
    match (a, b) {
        (V::Int(x), V::Int(y)) => Some(x.cmp(y)),
        (V::Int(x), V::Float(y)) => (*x as f64).partial_cmp(y),
        (V::Float(x), V::Int(y)) => x.partial_cmp(&(*y as f64)),
        (V::Float(x), V::Float(y)) => x.partial_cmp(y),
        (V::Bool(x), V::Bool(y)) => Some(x.cmp(y)),
        (V::String(x), V::String(y)) => Some(x.cmp(y)),
        (V::Uuid(x), V::Uuid(y)) => Some(x.cmp(y)),
        (V::String(s), V::Uuid(u)) => s.parse::<uuid::Uuid>().ok().map(|p| p.cmp(u)),
        (V::Uuid(u), V::String(s)) => s.parse::<uuid::Uuid>().ok().map(|p| u.cmp(&p)),
        _ => None,
    }
}
