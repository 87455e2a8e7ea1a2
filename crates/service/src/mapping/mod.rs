//! Mapping configuration between storage shapes and transfer shapes.
//!
//! A [`TypeMap<S, D>`] declares, field by field, which storage field of `S`
//! backs each transfer field of `D`. The same table drives value conversion
//! (serde field renaming in both directions) and predicate translation
//! ([`translate`]). Transfer fields with no declared storage field are
//! computed: they are filled by an `after_to_dto` hook and can never be
//! used in a filter.
//!
//! All maps live in one [`MappingConfig`], built once at startup and shared
//! read-only behind an `Arc`.

pub mod translate;

use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::predicate::Predicate;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MappingError {
    #[error("field `{field}` of {source_type} has no mapping to {target_type}")]
    UnmappedField { field: String, source_type: &'static str, target_type: &'static str },
    #[error("no mapping registered between {source_type} and {target_type}")]
    UnregisteredPair { source_type: &'static str, target_type: &'static str },
    #[error("mapping between {source_type} and {target_type} is registered twice")]
    DuplicatePair { source_type: &'static str, target_type: &'static str },
    #[error("field `{field}` is declared twice in mapping {pair}")]
    DuplicateField { pair: String, field: String },
    #[error("value conversion failed: {0}")]
    Conversion(String),
}

impl MappingError {
    /// Offending field name, for `UnmappedField` / `DuplicateField`.
    pub fn field(&self) -> Option<&str> {
        match self {
            MappingError::UnmappedField { field, .. } | MappingError::DuplicateField { field, .. } => Some(field),
            _ => None,
        }
    }
}

type Hook<A, B> = fn(&A, &mut B);

/// Field correspondence and conversion rules for one (storage, transfer) pair.
pub struct TypeMap<S, D> {
    /// (transfer field, storage field)
    fields: Vec<(String, String)>,
    after_to_dto: Option<Hook<S, D>>,
    after_to_storage: Option<Hook<D, S>>,
    _pair: PhantomData<fn(&S, &D)>,
}

impl<S, D> std::fmt::Debug for TypeMap<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMap")
            .field("storage", &type_name::<S>())
            .field("transfer", &type_name::<D>())
            .field("fields", &self.fields)
            .field("after_to_dto", &self.after_to_dto.is_some())
            .field("after_to_storage", &self.after_to_storage.is_some())
            .finish()
    }
}

impl<S, D> Default for TypeMap<S, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, D> TypeMap<S, D> {
    pub fn new() -> Self {
        Self { fields: Vec::new(), after_to_dto: None, after_to_storage: None, _pair: PhantomData }
    }

    /// Transfer field `dto_field` is backed by storage field `storage_field`.
    #[must_use]
    pub fn field(mut self, dto_field: &str, storage_field: &str) -> Self {
        self.fields.push((dto_field.to_owned(), storage_field.to_owned()));
        self
    }

    /// Fields with the same name on both sides.
    #[must_use]
    pub fn same(mut self, names: &[&str]) -> Self {
        for n in names {
            self = self.field(n, n);
        }
        self
    }

    /// Runs after storage → transfer conversion; fills computed fields.
    #[must_use]
    pub fn after_to_dto(mut self, hook: Hook<S, D>) -> Self {
        self.after_to_dto = Some(hook);
        self
    }

    /// Runs after transfer → storage conversion.
    #[must_use]
    pub fn after_to_storage(mut self, hook: Hook<D, S>) -> Self {
        self.after_to_storage = Some(hook);
        self
    }

    pub fn storage_field(&self, dto_field: &str) -> Option<&str> {
        self.fields.iter().find(|(d, _)| d == dto_field).map(|(_, s)| s.as_str())
    }

    pub fn dto_field(&self, storage_field: &str) -> Option<&str> {
        self.fields.iter().find(|(_, s)| s == storage_field).map(|(d, _)| d.as_str())
    }

    /// Declared (transfer, storage) pairs in declaration order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(d, s)| (d.as_str(), s.as_str()))
    }

    fn validate(&self) -> Result<(), MappingError> {
        let mut dto_seen = HashSet::new();
        let mut storage_seen = HashSet::new();
        for (d, s) in &self.fields {
            // one storage column per transfer field and vice versa, so both
            // directions are unambiguous
            let dup = if !dto_seen.insert(d.as_str()) {
                Some(d)
            } else if !storage_seen.insert(s.as_str()) {
                Some(s)
            } else {
                None
            };
            if let Some(field) = dup {
                return Err(MappingError::DuplicateField {
                    pair: format!("{} <-> {}", type_name::<S>(), type_name::<D>()),
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }
}

impl<S: Serialize + DeserializeOwned, D: Serialize + DeserializeOwned> TypeMap<S, D> {
    /// Storage → transfer.
    pub fn to_dto(&self, storage: &S) -> Result<D, MappingError> {
        let mut dto: D = rename(storage, self.fields.iter().map(|(d, s)| (s.as_str(), d.as_str())))?;
        if let Some(hook) = self.after_to_dto {
            hook(storage, &mut dto);
        }
        Ok(dto)
    }

    /// Transfer → storage.
    pub fn to_storage(&self, dto: &D) -> Result<S, MappingError> {
        let mut storage: S = rename(dto, self.fields.iter().map(|(d, s)| (d.as_str(), s.as_str())))?;
        if let Some(hook) = self.after_to_storage {
            hook(dto, &mut storage);
        }
        Ok(storage)
    }

    pub fn to_dtos(&self, rows: &[S]) -> Result<Vec<D>, MappingError> {
        rows.iter().map(|r| self.to_dto(r)).collect()
    }

    pub fn to_storages(&self, dtos: &[D]) -> Result<Vec<S>, MappingError> {
        dtos.iter().map(|d| self.to_storage(d)).collect()
    }
}

impl<S: 'static, D: 'static> TypeMap<S, D> {
    /// Rewrite a transfer-shape predicate into a storage-shape one.
    pub fn translate(&self, predicate: &Predicate<D>) -> Result<Predicate<S>, MappingError> {
        translate::translate(self, predicate)
    }
}

/// Copy only declared fields from `from`'s serde object into a new object,
/// renaming `(from_name, to_name)`, then deserialize the target.
fn rename<'a, A, B>(from: &A, pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Result<B, MappingError>
where
    A: Serialize,
    B: DeserializeOwned,
{
    let json = serde_json::to_value(from).map_err(|e| MappingError::Conversion(e.to_string()))?;
    let Json::Object(src) = json else {
        return Err(MappingError::Conversion(format!("{} is not a record", type_name::<A>())));
    };
    let mut out = Map::with_capacity(src.len());
    for (from_name, to_name) in pairs {
        if let Some(v) = src.get(from_name) {
            out.insert(to_name.to_owned(), v.clone());
        }
    }
    serde_json::from_value(Json::Object(out))
        .map_err(|e| MappingError::Conversion(format!("{} -> {}: {e}", type_name::<A>(), type_name::<B>())))
}

/// Registry of all type maps, keyed by (storage, transfer) type.
#[derive(Default)]
pub struct MappingConfig {
    maps: HashMap<(TypeId, TypeId), Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for MappingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingConfig").field("pairs", &self.maps.len()).finish()
    }
}

impl MappingConfig {
    pub fn builder() -> MappingConfigBuilder {
        MappingConfigBuilder::default()
    }

    /// Type map for (`S`, `D`).
    pub fn get<S: 'static, D: 'static>(&self) -> Result<&TypeMap<S, D>, MappingError> {
        self.maps
            .get(&(TypeId::of::<S>(), TypeId::of::<D>()))
            .and_then(|m| m.downcast_ref::<TypeMap<S, D>>())
            .ok_or(MappingError::UnregisteredPair { source_type: type_name::<S>(), target_type: type_name::<D>() })
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct MappingConfigBuilder {
    config: MappingConfig,
}

impl MappingConfigBuilder {
    /// Register one pair; rejects duplicate pairs and duplicate field declarations.
    pub fn register<S: 'static, D: 'static>(mut self, map: TypeMap<S, D>) -> Result<Self, MappingError> {
        map.validate()?;
        let key = (TypeId::of::<S>(), TypeId::of::<D>());
        if self.config.maps.contains_key(&key) {
            return Err(MappingError::DuplicatePair { source_type: type_name::<S>(), target_type: type_name::<D>() });
        }
        self.config.maps.insert(key, Box::new(map));
        Ok(self)
    }

    pub fn build(self) -> MappingConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: i32,
        full_name: String,
        birth_year: i32,
        secret: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Dto {
        id: i32,
        name: String,
        #[serde(default)]
        shout: String,
    }

    fn map() -> TypeMap<Row, Dto> {
        TypeMap::<Row, Dto>::new()
            .same(&["id"])
            .field("name", "full_name")
            .after_to_dto(|row, dto| dto.shout = row.full_name.to_uppercase())
            .after_to_storage(|_, row| row.secret = "redacted".into())
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct RowWithDefaults {
        id: i32,
        full_name: String,
        #[serde(default)]
        birth_year: i32,
        #[serde(default)]
        secret: String,
    }

    #[test]
    fn to_dto_renames_and_runs_hook() {
        let row = Row { id: 1, full_name: "Ada".into(), birth_year: 1815, secret: "s".into() };
        let dto = map().to_dto(&row).unwrap();
        assert_eq!(dto, Dto { id: 1, name: "Ada".into(), shout: "ADA".into() });
    }

    #[test]
    fn to_storage_fails_when_storage_needs_undeclared_fields() {
        let dto = Dto { id: 1, name: "Ada".into(), shout: String::new() };
        let err = map().to_storage(&dto).unwrap_err();
        assert!(matches!(err, MappingError::Conversion(m) if m.contains("birth_year")));
    }

    #[test]
    fn to_storage_renames_back_and_runs_hook() {
        let m = TypeMap::<RowWithDefaults, Dto>::new()
            .same(&["id"])
            .field("name", "full_name")
            .after_to_storage(|_, row| row.secret = "redacted".into());
        let row = m.to_storage(&Dto { id: 3, name: "Grace".into(), shout: "x".into() }).unwrap();
        assert_eq!(row, RowWithDefaults { id: 3, full_name: "Grace".into(), birth_year: 0, secret: "redacted".into() });
    }

    #[test]
    fn field_lookups_work_both_ways() {
        let m = map();
        assert_eq!(m.storage_field("name"), Some("full_name"));
        assert_eq!(m.dto_field("full_name"), Some("name"));
        assert_eq!(m.storage_field("shout"), None);
        assert_eq!(m.pairs().count(), 2);

        let shown = format!("{m:?}");
        assert!(shown.contains(r#"("name", "full_name")"#), "{shown}");
        assert!(shown.contains("after_to_dto: true"), "{shown}");
    }

    #[test]
    fn registry_returns_registered_pairs_only() {
        let cfg = MappingConfig::builder().register(map()).unwrap().build();
        assert_eq!(cfg.len(), 1);
        assert!(cfg.get::<Row, Dto>().is_ok());
        let err = cfg.get::<Dto, Row>().unwrap_err();
        assert!(matches!(err, MappingError::UnregisteredPair { .. }));
    }

    #[test]
    fn registry_rejects_duplicates() {
        let err = MappingConfig::builder().register(map()).unwrap().register(map()).unwrap_err();
        assert!(matches!(err, MappingError::DuplicatePair { .. }));

        let twice: TypeMap<Row, Dto> = TypeMap::new().field("name", "full_name").field("name", "secret");
        let err = MappingConfig::builder().register(twice).unwrap_err();
        assert_eq!(err.field(), Some("name"));

        let shared: TypeMap<Row, Dto> = TypeMap::new().field("name", "full_name").field("shout", "full_name");
        let err = MappingConfig::builder().register(shared).unwrap_err();
        assert_eq!(err.field(), Some("full_name"));
    }
}
