//! Inspectable predicate algebra.
//!
//! A [`Predicate<T>`] is a boolean expression over the fields of one shape `T`
//! (a storage model or a transfer DTO). Unlike a closure it can be walked and
//! rebuilt, which is what lets the mapping layer rewrite field references
//! from one shape to another (see [`crate::mapping::translate`]) and lets the
//! repository compile it into a `sea_orm::Condition` (see [`condition`]).
//!
//! ```
//! use service::predicate::{Field, Predicate};
//!
//! struct Book;
//! const TITLE: Field<Book> = Field::new("title");
//! const PAGES: Field<Book> = Field::new("pages");
//!
//! let p: Predicate<Book> = TITLE.starts_with("Rust").and(PAGES.gt(300));
//! assert_eq!(p.to_string(), "startswith(title, 'Rust') and pages gt 300");
//! assert_eq!(p.fields(), vec!["title", "pages"]);
//! ```

pub mod condition;
pub mod eval;

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Literal operand of a predicate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Uuid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::Int(v.into()) }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Int(v) }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self { Value::Int(v.into()) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Float(v) }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::String(v.to_owned()) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::String(v) }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self { Value::Uuid(v) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Uuid(u) => write!(f, "{u}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "eq"),
            CompareOp::Ne => write!(f, "ne"),
            CompareOp::Gt => write!(f, "gt"),
            CompareOp::Ge => write!(f, "ge"),
            CompareOp::Lt => write!(f, "lt"),
            CompareOp::Le => write!(f, "le"),
        }
    }
}

/// String predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

impl fmt::Display for TextOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextOp::Contains => write!(f, "contains"),
            TextOp::StartsWith => write!(f, "startswith"),
            TextOp::EndsWith => write!(f, "endswith"),
        }
    }
}

/// Untyped expression tree. Field references are plain names of the shape
/// the owning [`Predicate`] is typed over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Const(bool),
    Compare { field: String, op: CompareOp, value: Value },
    In { field: String, values: Vec<Value> },
    Text { field: String, op: TextOp, pattern: String },
    IsNull(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// `a and b`, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Expr) -> Expr {
        match (self, other) {
            (Expr::And(mut a), Expr::And(b)) => {
                a.extend(b);
                Expr::And(a)
            }
            (Expr::And(mut a), b) => {
                a.push(b);
                Expr::And(a)
            }
            (a, b) => Expr::And(vec![a, b]),
        }
    }

    /// `a or b`, flattening nested disjunctions.
    #[must_use]
    pub fn or(self, other: Expr) -> Expr {
        match (self, other) {
            (Expr::Or(mut a), Expr::Or(b)) => {
                a.extend(b);
                Expr::Or(a)
            }
            (Expr::Or(mut a), b) => {
                a.push(b);
                Expr::Or(a)
            }
            (a, b) => Expr::Or(vec![a, b]),
        }
    }

    /// Field name of a leaf node.
    pub fn field(&self) -> Option<&str> {
        match self {
            Expr::Compare { field, .. } | Expr::In { field, .. } | Expr::Text { field, .. } | Expr::IsNull(field) => Some(field),
            _ => None,
        }
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Const(_) => {}
            Expr::And(xs) | Expr::Or(xs) => xs.iter().for_each(|x| x.collect_fields(out)),
            Expr::Not(x) => x.collect_fields(out),
            leaf => {
                if let Some(f) = leaf.field() {
                    if !out.contains(&f) {
                        out.push(f);
                    }
                }
            }
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Self::Output {
        Expr::Not(Box::new(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, xs: &[Expr], sep: &str) -> fmt::Result {
            for (i, x) in xs.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                match x {
                    Expr::And(_) | Expr::Or(_) => write!(f, "({x})")?,
                    _ => write!(f, "{x}")?,
                }
            }
            Ok(())
        }

        match self {
            Expr::Const(b) => write!(f, "{b}"),
            Expr::Compare { field, op, value } => write!(f, "{field} {op} {value}"),
            Expr::In { field, values } => {
                let items: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{field} in ({})", items.join(", "))
            }
            Expr::Text { field, op, pattern } => write!(f, "{op}({field}, {})", Value::String(pattern.clone())),
            Expr::IsNull(field) => write!(f, "{field} eq null"),
            Expr::And(xs) if xs.is_empty() => write!(f, "true"),
            Expr::Or(xs) if xs.is_empty() => write!(f, "false"),
            Expr::And(xs) => join(f, xs, "and"),
            Expr::Or(xs) => join(f, xs, "or"),
            Expr::Not(x) => write!(f, "not ({x})"),
        }
    }
}

/// An [`Expr`] tagged with the shape whose field names it uses.
pub struct Predicate<T> {
    expr: Expr,
    _shape: PhantomData<fn(&T) -> bool>,
}

impl<T> Predicate<T> {
    pub fn new(expr: Expr) -> Self {
        Self { expr, _shape: PhantomData }
    }

    /// Matches everything.
    pub fn always() -> Self {
        Self::new(Expr::Const(true))
    }

    /// Matches nothing.
    pub fn never() -> Self {
        Self::new(Expr::Const(false))
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    #[must_use]
    pub fn and(self, other: Predicate<T>) -> Self {
        Self::new(self.expr.and(other.expr))
    }

    #[must_use]
    pub fn or(self, other: Predicate<T>) -> Self {
        Self::new(self.expr.or(other.expr))
    }

    /// Referenced field names in first-seen order, without duplicates.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.expr.collect_fields(&mut out);
        out
    }
}

impl<T> std::ops::Not for Predicate<T> {
    type Output = Predicate<T>;

    fn not(self) -> Self::Output {
        Predicate::new(!self.expr)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self::new(self.expr.clone())
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.expr).finish()
    }
}

impl<T> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.fmt(f)
    }
}

impl<T> PartialEq for Predicate<T> {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

/// Typed handle to a named field of shape `T`; usually declared as an
/// associated const on the shape.
pub struct Field<T> {
    name: &'static str,
    _shape: PhantomData<fn(&T)>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.name).finish()
    }
}

impl<T> Field<T> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _shape: PhantomData }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Predicate<T> {
        Predicate::new(Expr::Compare { field: self.name.to_owned(), op, value: value.into() })
    }

    fn text(self, op: TextOp, pattern: &str) -> Predicate<T> {
        Predicate::new(Expr::Text { field: self.name.to_owned(), op, pattern: pattern.to_owned() })
    }

    pub fn eq(self, value: impl Into<Value>) -> Predicate<T> {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Predicate<T> {
        self.compare(CompareOp::Ne, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Predicate<T> {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Predicate<T> {
        self.compare(CompareOp::Ge, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Predicate<T> {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Predicate<T> {
        self.compare(CompareOp::Le, value)
    }

    pub fn is_in<V, I>(self, values: I) -> Predicate<T>
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Predicate::new(Expr::In { field: self.name.to_owned(), values: values.into_iter().map(Into::into).collect() })
    }

    pub fn contains(self, pattern: &str) -> Predicate<T> {
        self.text(TextOp::Contains, pattern)
    }

    pub fn starts_with(self, pattern: &str) -> Predicate<T> {
        self.text(TextOp::StartsWith, pattern)
    }

    pub fn ends_with(self, pattern: &str) -> Predicate<T> {
        self.text(TextOp::EndsWith, pattern)
    }

    pub fn is_null(self) -> Predicate<T> {
        Predicate::new(Expr::IsNull(self.name.to_owned()))
    }
}
