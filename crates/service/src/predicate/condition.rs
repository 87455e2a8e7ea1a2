//! Predicate (storage shape) → `sea_orm::Condition` compiler.
//!
//! Field names resolve through the entity's generated `Column` table, so a
//! predicate can only reference real columns.

use std::str::FromStr;

use sea_orm::sea_query::{Expr as SqlExpr, LikeExpr};
use sea_orm::{ColumnTrait, Condition, EntityTrait};
use thiserror::Error;

use super::{CompareOp, Expr, Predicate, TextOp, Value};
use crate::errors::ServiceError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConditionError {
    #[error("unknown column `{column}` on `{table}`")]
    UnknownColumn { table: String, column: String },
    #[error("operator `{0}` cannot compare against null")]
    NullComparison(CompareOp),
    #[error("null is not allowed in an `in` list for `{0}`")]
    NullInList(String),
}

impl From<ConditionError> for ServiceError {
    fn from(e: ConditionError) -> Self {
        ServiceError::InvalidArgument(e.to_string())
    }
}

pub type ConditionResult<T> = Result<T, ConditionError>;

/// Resolve a column by its column name.
pub fn column<E>(name: &str) -> ConditionResult<E::Column>
where
    E: EntityTrait,
    E::Column: FromStr,
{
    E::Column::from_str(name).map_err(|_| ConditionError::UnknownColumn {
        table: E::default().table_name().to_owned(),
        column: name.to_owned(),
    })
}

fn to_db(v: &Value) -> Option<sea_orm::Value> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some((*b).into()),
        Value::Int(i) => Some((*i).into()),
        Value::Float(x) => Some((*x).into()),
        Value::String(s) => Some(s.clone().into()),
        Value::Uuid(u) => Some((*u).into()),
    }
}

/// Escape `%`, `_` and the escape character itself so `s` matches literally.
fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn like(op: TextOp, pattern: &str) -> LikeExpr {
    let escaped = like_escape(pattern);
    let pattern = match op {
        TextOp::Contains => format!("%{escaped}%"),
        TextOp::StartsWith => format!("{escaped}%"),
        TextOp::EndsWith => format!("%{escaped}"),
    };
    LikeExpr::new(pattern).escape('\\')
}

fn constant(b: bool) -> Condition {
    Condition::all().add(SqlExpr::cust(if b { "1=1" } else { "1=0" }))
}

/// Compile a storage-shape predicate for entity `E`.
pub fn to_condition<E>(predicate: &Predicate<E::Model>) -> ConditionResult<Condition>
where
    E: EntityTrait,
    E::Column: FromStr,
{
    compile::<E>(predicate.expr())
}

fn compile<E>(expr: &Expr) -> ConditionResult<Condition>
where
    E: EntityTrait,
    E::Column: FromStr,
{
    Ok(match expr {
        Expr::Const(b) => constant(*b),
        Expr::Compare { field, op, value } => {
            let col = column::<E>(field)?;
            let sql = match (to_db(value), op) {
                (None, CompareOp::Eq) => col.is_null(),
                (None, CompareOp::Ne) => col.is_not_null(),
                (None, other) => return Err(ConditionError::NullComparison(*other)),
                (Some(v), CompareOp::Eq) => col.eq(v),
                (Some(v), CompareOp::Ne) => col.ne(v),
                (Some(v), CompareOp::Gt) => col.gt(v),
                (Some(v), CompareOp::Ge) => col.gte(v),
                (Some(v), CompareOp::Lt) => col.lt(v),
                (Some(v), CompareOp::Le) => col.lte(v),
            };
            Condition::all().add(sql)
        }
        Expr::In { field, values } => {
            let col = column::<E>(field)?;
            if values.is_empty() {
                // IN () → always false
                return Ok(constant(false));
            }
            let vals = values
                .iter()
                .map(|v| to_db(v).ok_or_else(|| ConditionError::NullInList(field.clone())))
                .collect::<ConditionResult<Vec<_>>>()?;
            Condition::all().add(col.is_in(vals))
        }
        Expr::Text { field, op, pattern } => {
            let col = column::<E>(field)?;
            Condition::all().add(col.like(like(*op, pattern)))
        }
        Expr::IsNull(field) => Condition::all().add(column::<E>(field)?.is_null()),
        Expr::And(xs) if xs.is_empty() => constant(true),
        Expr::Or(xs) if xs.is_empty() => constant(false),
        Expr::And(xs) => {
            let mut cond = Condition::all();
            for x in xs {
                cond = cond.add(compile::<E>(x)?);
            }
            cond
        }
        Expr::Or(xs) => {
            let mut cond = Condition::any();
            for x in xs {
                cond = cond.add(compile::<E>(x)?);
            }
            cond
        }
        Expr::Not(x) => Condition::all().add(compile::<E>(x)?).not(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::Field;
    use models::person;
    use sea_orm::{DbBackend, QueryFilter, QueryTrait};

    const FULL_NAME: Field<person::Model> = Field::new("full_name");
    const BIRTH_YEAR: Field<person::Model> = Field::new("birth_year");
    const TEAM_ID: Field<person::Model> = Field::new("team_id");

    fn sql(p: &Predicate<person::Model>) -> String {
        let cond = to_condition::<person::Entity>(p).unwrap();
        person::Entity::find().filter(cond).build(DbBackend::Sqlite).to_string()
    }

    #[test]
    fn compiles_comparisons_and_connectives() {
        let s = sql(&FULL_NAME.eq("Ada").and(BIRTH_YEAR.gt(1800)));
        assert!(s.contains(r#""full_name" = 'Ada'"#), "{s}");
        assert!(s.contains(r#""birth_year" > 1800"#), "{s}");
        assert!(s.contains(" AND "), "{s}");

        let s = sql(&FULL_NAME.eq("Ada").or(FULL_NAME.eq("Grace")));
        assert!(s.contains(" OR "), "{s}");
    }

    #[test]
    fn compiles_null_tests_membership_and_text() {
        assert!(sql(&TEAM_ID.eq(None::<i32>)).contains("IS NULL"));
        assert!(sql(&TEAM_ID.ne(None::<i32>)).contains("IS NOT NULL"));
        assert!(sql(&TEAM_ID.is_null()).contains("IS NULL"));
        assert!(sql(&TEAM_ID.is_in([1, 2])).contains("IN (1, 2)"));
        assert!(sql(&TEAM_ID.is_in(Vec::<i32>::new())).contains("1=0"));
        assert!(sql(&FULL_NAME.contains("da")).contains("LIKE '%da%'"));
        assert!(sql(&FULL_NAME.starts_with("Ad")).contains("LIKE 'Ad%'"));
        assert!(sql(&!FULL_NAME.eq("Ada")).contains("NOT"));
    }

    #[test]
    fn text_patterns_escape_wildcards() {
        assert_eq!(like_escape("50%"), r"50\%");
        assert_eq!(like_escape("a_b"), r"a\_b");
        assert_eq!(like_escape(r"c:\tmp"), r"c:\\tmp");
        assert_eq!(like_escape("plain"), "plain");

        let s = sql(&FULL_NAME.ends_with("%"));
        assert!(s.contains("LIKE"), "{s}");
        assert!(s.contains("ESCAPE"), "{s}");
    }

    #[test]
    fn rejects_unknown_columns_and_null_ordering() {
        let p: Predicate<person::Model> = Field::new("age").gt(30);
        let err = to_condition::<person::Entity>(&p).unwrap_err();
        assert_eq!(err, ConditionError::UnknownColumn { table: "person".into(), column: "age".into() });
        assert!(matches!(ServiceError::from(err), ServiceError::InvalidArgument(m) if m.contains("age")));

        let p = BIRTH_YEAR.gt(None::<i32>);
        assert_eq!(to_condition::<person::Entity>(&p).unwrap_err(), ConditionError::NullComparison(CompareOp::Gt));

        let p = TEAM_ID.is_in([Some(1), None]);
        assert_eq!(to_condition::<person::Entity>(&p).unwrap_err(), ConditionError::NullInList("team_id".into()));
    }
}
