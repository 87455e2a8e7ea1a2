//! In-memory repository for tests and doc examples.
//!
//! Predicates run through the in-process evaluator instead of SQL, so the
//! same storage-shape predicate can be checked against both backends. Field
//! names are still resolved through the entity's column table first, which
//! keeps error behavior aligned with [`super::SeaOrmRepository`].

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use sea_orm::{DbErr, EntityTrait, IdenStatic, PrimaryKeyTrait};
use serde_json::{Map, Value as Json};
use uuid::Uuid;

use super::{Include, Repository, StorageEntity, StorageModel};
use crate::errors::{ServiceError, ServiceResult};
use crate::mapping::MappingError;
use crate::predicate::condition::column;
use crate::predicate::eval::{order, read};
use crate::predicate::{Predicate, Value};

struct Table<M> {
    rows: Vec<M>,
    next_id: i64,
}

pub struct MockRepository<E: EntityTrait> {
    table: Mutex<Table<E::Model>>,
    calls: AtomicUsize,
}

impl<E: EntityTrait> Default for MockRepository<E> {
    fn default() -> Self {
        Self { table: Mutex::new(Table { rows: Vec::new(), next_id: 1 }), calls: AtomicUsize::new(0) }
    }
}

fn record<M: StorageModel>(model: &M) -> ServiceResult<Map<String, Json>> {
    match serde_json::to_value(model) {
        Ok(Json::Object(fields)) => Ok(fields),
        Ok(other) => Err(MappingError::Conversion(format!("not a record: {other}")).into()),
        Err(e) => Err(MappingError::Conversion(e.to_string()).into()),
    }
}

/// Ascending order with nulls first. Composite values sort last.
fn sort_key_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            Some(Value::Null) => 0,
            Some(_) => 1,
            None => 2,
        }
    }
    match (a, b) {
        (Some(x), Some(y)) if !x.is_null() && !y.is_null() => order(x, y).unwrap_or(Ordering::Equal),
        _ => rank(a).cmp(&rank(b)),
    }
}

impl<E> MockRepository<E>
where
    E: StorageEntity,
    E::Model: StorageModel,
    E::Column: FromStr,
{
    /// Number of repository operations invoked so far.
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    fn enter(&self) -> MutexGuard<'_, Table<E::Model>> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn id_of(model: &E::Model) -> ServiceResult<i64> {
        let col = E::id_column();
        let name = col.as_str();
        record(model)?
            .get(name)
            .and_then(Json::as_i64)
            .ok_or_else(|| MappingError::Conversion(format!("`{name}` is not an integer key")).into())
    }

    fn with_id(model: E::Model, id: i64) -> ServiceResult<E::Model> {
        let mut fields = record(&model)?;
        fields.insert(E::id_column().as_str().to_owned(), Json::from(id));
        serde_json::from_value(Json::Object(fields)).map_err(|e| MappingError::Conversion(e.to_string()).into())
    }

    fn check_fields(predicate: &Predicate<E::Model>) -> ServiceResult<()> {
        for f in predicate.fields() {
            column::<E>(f)?;
        }
        Ok(())
    }

    fn filter(rows: &[E::Model], predicate: &Predicate<E::Model>) -> ServiceResult<Vec<E::Model>> {
        Self::check_fields(predicate)?;
        let mut out = Vec::new();
        for row in rows {
            if predicate.matches(row)? {
                out.push(row.clone());
            }
        }
        Ok(out)
    }

    fn insert(table: &mut Table<E::Model>, model: E::Model) -> ServiceResult<E::Model> {
        let model = if <E::PrimaryKey as PrimaryKeyTrait>::auto_increment() {
            let id = table.next_id;
            table.next_id += 1;
            Self::with_id(model, id)?
        } else {
            model
        };
        table.rows.push(model.clone());
        Ok(model)
    }

    fn position(table: &Table<E::Model>, id: i64) -> ServiceResult<Option<usize>> {
        for (i, row) in table.rows.iter().enumerate() {
            if Self::id_of(row)? == id {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl<E> Repository<E> for MockRepository<E>
where
    E: StorageEntity,
    E::Model: StorageModel,
    E::Column: FromStr,
{
    async fn get_by_id(&self, id: i32) -> ServiceResult<Option<E::Model>> {
        let table = self.enter();
        let idx = Self::position(&table, id.into())?;
        Ok(idx.map(|i| table.rows[i].clone()))
    }

    async fn get_by_guid(&self, guid: &str) -> ServiceResult<Option<E::Model>> {
        let table = self.enter();
        let col = E::guid_column().ok_or_else(|| ServiceError::invalid("entity has no guid column"))?;
        let guid = Uuid::parse_str(guid).map_err(|e| ServiceError::invalid(format!("malformed guid `{guid}`: {e}")))?;
        let wanted = guid.to_string();
        for row in &table.rows {
            if record(row)?.get(col.as_str()).and_then(Json::as_str) == Some(wanted.as_str()) {
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    async fn get_all(&self) -> ServiceResult<Vec<E::Model>> {
        Ok(self.enter().rows.clone())
    }

    async fn get_all_with_related(&self, includes: &[&dyn Include<E>]) -> ServiceResult<Vec<E::Model>> {
        let table = self.enter();
        if let Some(first) = includes.first() {
            return Err(ServiceError::invalid(format!("include `{}` needs a database connection", first.name())));
        }
        Ok(table.rows.clone())
    }

    async fn find(&self, predicate: &Predicate<E::Model>) -> ServiceResult<Vec<E::Model>> {
        Self::filter(&self.enter().rows, predicate)
    }

    async fn find_paged(&self, predicate: &Predicate<E::Model>, skip: u64, take: u64) -> ServiceResult<Vec<E::Model>> {
        let mut rows = Self::filter(&self.enter().rows, predicate)?;
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows.drain(..) {
            keyed.push((Self::id_of(&row)?, row));
        }
        keyed.sort_by_key(|(id, _)| *id);
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = usize::try_from(take).unwrap_or(usize::MAX);
        Ok(keyed.into_iter().skip(skip).take(take).map(|(_, row)| row).collect())
    }

    async fn find_one(&self, predicate: &Predicate<E::Model>) -> ServiceResult<Option<E::Model>> {
        Ok(self.find_paged(predicate, 0, 1).await?.into_iter().next())
    }

    async fn get_limited_ordered(&self, limit: u64, field: &str) -> ServiceResult<Vec<E::Model>> {
        let col = column::<E>(field)?;
        let table = self.enter();
        let mut keyed = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            keyed.push((read(&record(row)?, col.as_str())?, row.clone()));
        }
        keyed.sort_by(|(a, _), (b, _)| sort_key_cmp(a.as_ref(), b.as_ref()));
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(keyed.into_iter().take(limit).map(|(_, row)| row).collect())
    }

    async fn count(&self) -> ServiceResult<u64> {
        Ok(self.enter().rows.len() as u64)
    }

    async fn count_by_predicate(&self, predicate: &Predicate<E::Model>) -> ServiceResult<u64> {
        Ok(self.find(predicate).await?.len() as u64)
    }

    async fn add(&self, model: E::Model) -> ServiceResult<E::Model> {
        Self::insert(&mut self.enter(), model)
    }

    async fn add_range(&self, models: Vec<E::Model>) -> ServiceResult<Vec<E::Model>> {
        let mut table = self.enter();
        models.into_iter().map(|m| Self::insert(&mut table, m)).collect()
    }

    async fn update(&self, model: E::Model) -> ServiceResult<E::Model> {
        Ok(self.update_range(vec![model]).await?.remove(0))
    }

    async fn update_range(&self, models: Vec<E::Model>) -> ServiceResult<Vec<E::Model>> {
        let mut table = self.enter();
        let mut slots = Vec::with_capacity(models.len());
        for model in &models {
            let idx = Self::position(&table, Self::id_of(model)?)?
                .ok_or(DbErr::RecordNotUpdated)?;
            slots.push(idx);
        }
        for (idx, model) in slots.into_iter().zip(&models) {
            table.rows[idx] = model.clone();
        }
        Ok(models)
    }

    async fn remove(&self, model: E::Model) -> ServiceResult<u64> {
        self.remove_range(vec![model]).await
    }

    async fn remove_range(&self, models: Vec<E::Model>) -> ServiceResult<u64> {
        let mut table = self.enter();
        let mut affected = 0;
        for model in &models {
            if let Some(idx) = Self::position(&table, Self::id_of(model)?)? {
                table.rows.remove(idx);
                affected += 1;
            }
        }
        Ok(affected)
    }
}
