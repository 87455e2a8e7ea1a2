//! Generic data access over one storage entity.
//!
//! `Repository<E>` is the seam between the service layer and SeaORM; the
//! production implementation is [`SeaOrmRepository`]. Predicates handed to a
//! repository are already in storage shape.

pub mod include;
pub mod mock;
pub mod seaorm;

use async_trait::async_trait;
use sea_orm::EntityTrait;
use serde::{de::DeserializeOwned, Serialize};

pub use include::{Include, IncludeMany, IncludeOne};
pub use seaorm::SeaOrmRepository;

use crate::errors::ServiceResult;
use crate::predicate::Predicate;

/// Entities the generic repository can serve.
pub trait StorageEntity: EntityTrait {
    /// Integer primary key column.
    fn id_column() -> Self::Column;

    /// Globally unique identifier column, when the entity has one.
    fn guid_column() -> Option<Self::Column> {
        None
    }
}

/// Bounds every storage model must meet to travel through repositories and
/// mappings.
pub trait StorageModel: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> StorageModel for T where T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

#[async_trait]
pub trait Repository<E>: Send + Sync
where
    E: StorageEntity,
    E::Model: StorageModel,
{
    async fn get_by_id(&self, id: i32) -> ServiceResult<Option<E::Model>>;
    /// `InvalidArgument` when `guid` is malformed or `E` has no GUID column.
    async fn get_by_guid(&self, guid: &str) -> ServiceResult<Option<E::Model>>;
    async fn get_all(&self) -> ServiceResult<Vec<E::Model>>;
    async fn get_all_with_related(&self, includes: &[&dyn Include<E>]) -> ServiceResult<Vec<E::Model>>;

    async fn find(&self, predicate: &Predicate<E::Model>) -> ServiceResult<Vec<E::Model>>;
    /// Matching rows ordered by primary key, skipping `skip` and returning at
    /// most `take`.
    async fn find_paged(&self, predicate: &Predicate<E::Model>, skip: u64, take: u64) -> ServiceResult<Vec<E::Model>>;
    async fn find_one(&self, predicate: &Predicate<E::Model>) -> ServiceResult<Option<E::Model>>;
    /// First `limit` rows ascending by the column named `field`.
    async fn get_limited_ordered(&self, limit: u64, field: &str) -> ServiceResult<Vec<E::Model>>;

    async fn count(&self) -> ServiceResult<u64>;
    async fn count_by_predicate(&self, predicate: &Predicate<E::Model>) -> ServiceResult<u64>;

    async fn add(&self, model: E::Model) -> ServiceResult<E::Model>;
    async fn add_range(&self, models: Vec<E::Model>) -> ServiceResult<Vec<E::Model>>;
    async fn update(&self, model: E::Model) -> ServiceResult<E::Model>;
    async fn update_range(&self, models: Vec<E::Model>) -> ServiceResult<Vec<E::Model>>;
    /// Rows affected.
    async fn remove(&self, model: E::Model) -> ServiceResult<u64>;
    async fn remove_range(&self, models: Vec<E::Model>) -> ServiceResult<u64>;
}
