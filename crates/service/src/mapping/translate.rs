//! Rewrites a transfer-shape predicate into the equivalent storage-shape one.
//!
//! Every leaf's field is looked up in the [`TypeMap`] correspondence table;
//! operators, literals and tree shape are kept as-is. A field with no storage
//! counterpart (a computed field, or a typo) fails the whole translation, so a
//! partial predicate never reaches the database.

use std::any::type_name;

use super::{MappingError, TypeMap};
use crate::predicate::{Expr, Predicate};

pub fn translate<S, D>(map: &TypeMap<S, D>, predicate: &Predicate<D>) -> Result<Predicate<S>, MappingError> {
    rewrite(predicate.expr(), &|field| {
        map.storage_field(field).map(str::to_owned).ok_or_else(|| MappingError::UnmappedField {
            field: field.to_owned(),
            source_type: type_name::<D>(),
            target_type: type_name::<S>(),
        })
    })
    .map(Predicate::new)
}

/// Rebuild `expr` with every field name passed through `rename`.
pub fn rewrite<F>(expr: &Expr, rename: &F) -> Result<Expr, MappingError>
where
    F: Fn(&str) -> Result<String, MappingError>,
{
    Ok(match expr {
        Expr::Const(b) => Expr::Const(*b),
        Expr::Compare { field, op, value } => Expr::Compare { field: rename(field)?, op: *op, value: value.clone() },
        Expr::In { field, values } => Expr::In { field: rename(field)?, values: values.clone() },
        Expr::Text { field, op, pattern } => Expr::Text { field: rename(field)?, op: *op, pattern: pattern.clone() },
        Expr::IsNull(field) => Expr::IsNull(rename(field)?),
        Expr::And(xs) => Expr::And(xs.iter().map(|x| rewrite(x, rename)).collect::<Result<_, _>>()?),
        Expr::Or(xs) => Expr::Or(xs.iter().map(|x| rewrite(x, rename)).collect::<Result<_, _>>()?),
        Expr::Not(x) => Expr::Not(Box::new(rewrite(x, rename)?)),
    })
}
