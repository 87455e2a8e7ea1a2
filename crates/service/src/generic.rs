//! Transfer-shape facade over a [`Repository`].
//!
//! Callers work with `D` and `Predicate<D>` only. Every predicate is
//! translated to the storage shape before the repository is touched, so an
//! untranslatable filter fails with [`ServiceError::Mapping`] and issues no
//! backend call.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, instrument};

use crate::errors::{OrNotFound, ServiceResult};
use crate::mapping::{MappingConfig, TypeMap};
use crate::pagination::Pagination;
use crate::predicate::Predicate;
use crate::repository::{Include, Repository, SeaOrmRepository, StorageEntity, StorageModel};

/// Bounds for transfer shapes.
pub trait TransferModel: Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> TransferModel for T where T: Send + Sync + Serialize + DeserializeOwned + 'static {}

pub struct GenericService<E, D, R = SeaOrmRepository<E>> {
    repo: Arc<R>,
    mappings: Arc<MappingConfig>,
    _shapes: PhantomData<fn() -> (E, D)>,
}

impl<E, D, R> Clone for GenericService<E, D, R> {
    fn clone(&self) -> Self {
        Self { repo: self.repo.clone(), mappings: self.mappings.clone(), _shapes: PhantomData }
    }
}

impl<E, D, R> GenericService<E, D, R>
where
    E: StorageEntity,
    E::Model: StorageModel,
    D: TransferModel,
    R: Repository<E>,
{
    /// Fails with `UnregisteredPair` when `mappings` has no `(E::Model, D)` map.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::mappings::mapping_config;
    /// use service::generic::GenericService;
    /// use service::person::{PersonDto, PersonService};
    /// use service::repository::mock::MockRepository;
    ///
    /// let repo = Arc::new(MockRepository::<models::person::Entity>::default());
    /// let svc: PersonService<MockRepository<_>> =
    ///     GenericService::new(repo.clone(), Arc::new(mapping_config().unwrap())).unwrap();
    /// let ada = tokio_test::block_on(svc.add(PersonDto::new("Ada", 1815))).unwrap();
    /// assert_eq!(ada.id, 1);
    ///
    /// let found = tokio_test::block_on(svc.find(&PersonDto::NAME.eq("Ada"))).unwrap();
    /// assert_eq!(found, vec![ada]);
    ///
    /// // computed fields cannot be filtered on, and the repository is never reached
    /// let calls = repo.calls();
    /// assert!(tokio_test::block_on(svc.find(&PersonDto::AGE.gt(30))).is_err());
    /// assert_eq!(repo.calls(), calls);
    /// ```
    pub fn new(repo: Arc<R>, mappings: Arc<MappingConfig>) -> ServiceResult<Self> {
        mappings.get::<E::Model, D>()?;
        Ok(Self { repo, mappings, _shapes: PhantomData })
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    fn map(&self) -> ServiceResult<&TypeMap<E::Model, D>> {
        Ok(self.mappings.get::<E::Model, D>()?)
    }

    fn translate(&self, predicate: &Predicate<D>) -> ServiceResult<Predicate<E::Model>> {
        Ok(self.map()?.translate(predicate)?)
    }

    fn to_dto_opt(&self, row: Option<E::Model>) -> ServiceResult<Option<D>> {
        match row {
            Some(r) => Ok(Some(self.map()?.to_dto(&r)?)),
            None => Ok(None),
        }
    }

    fn to_dtos(&self, rows: &[E::Model]) -> ServiceResult<Vec<D>> {
        Ok(self.map()?.to_dtos(rows)?)
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> ServiceResult<Option<D>> {
        let row = self.repo.get_by_id(id).await?;
        self.to_dto_opt(row)
    }

    /// Like [`Self::get_by_id`], but a missing row is `NotFound`.
    #[instrument(skip(self))]
    pub async fn require_by_id(&self, id: i32) -> ServiceResult<D> {
        let label = E::default().table_name().to_owned();
        self.get_by_id(id).await?.or_not_found(&label)
    }

    #[instrument(skip(self))]
    pub async fn get_by_guid(&self, guid: &str) -> ServiceResult<Option<D>> {
        let row = self.repo.get_by_guid(guid).await?;
        self.to_dto_opt(row)
    }

    #[instrument(skip(self))]
    pub async fn get_all(&self) -> ServiceResult<Vec<D>> {
        let rows = self.repo.get_all().await?;
        self.to_dtos(&rows)
    }

    /// Includes are storage-level and pass through unchanged.
    #[instrument(skip(self, includes), fields(includes = includes.len()))]
    pub async fn get_all_with_related(&self, includes: &[&dyn Include<E>]) -> ServiceResult<Vec<D>> {
        let rows = self.repo.get_all_with_related(includes).await?;
        self.to_dtos(&rows)
    }

    #[instrument(skip(self, predicate), fields(predicate = %predicate))]
    pub async fn find(&self, predicate: &Predicate<D>) -> ServiceResult<Vec<D>> {
        let storage = self.translate(predicate)?;
        let rows = self.repo.find(&storage).await?;
        self.to_dtos(&rows)
    }

    #[instrument(skip(self, predicate), fields(predicate = %predicate))]
    pub async fn find_paged(&self, predicate: &Predicate<D>, skip: u64, take: u64) -> ServiceResult<Vec<D>> {
        let storage = self.translate(predicate)?;
        let rows = self.repo.find_paged(&storage, skip, take).await?;
        self.to_dtos(&rows)
    }

    /// 1-based page over the filtered, key-ordered results.
    pub async fn find_page(&self, predicate: &Predicate<D>, page: Pagination) -> ServiceResult<Vec<D>> {
        let (skip, take) = page.window();
        self.find_paged(predicate, skip, take).await
    }

    #[instrument(skip(self, predicate), fields(predicate = %predicate))]
    pub async fn find_one(&self, predicate: &Predicate<D>) -> ServiceResult<Option<D>> {
        let storage = self.translate(predicate)?;
        let row = self.repo.find_one(&storage).await?;
        self.to_dto_opt(row)
    }

    /// `field` names a storage column.
    #[instrument(skip(self))]
    pub async fn get_limited_ordered(&self, limit: u64, field: &str) -> ServiceResult<Vec<D>> {
        let rows = self.repo.get_limited_ordered(limit, field).await?;
        self.to_dtos(&rows)
    }

    pub async fn count(&self) -> ServiceResult<u64> {
        self.repo.count().await
    }

    #[instrument(skip(self, predicate), fields(predicate = %predicate))]
    pub async fn count_by_predicate(&self, predicate: &Predicate<D>) -> ServiceResult<u64> {
        let storage = self.translate(predicate)?;
        self.repo.count_by_predicate(&storage).await
    }

    #[instrument(skip_all)]
    pub async fn add(&self, dto: D) -> ServiceResult<D> {
        let map = self.map()?;
        let stored = self.repo.add(map.to_storage(&dto)?).await?;
        info!(table = E::default().table_name(), "record_added");
        Ok(map.to_dto(&stored)?)
    }

    #[instrument(skip_all, fields(n = dtos.len()))]
    pub async fn add_range(&self, dtos: Vec<D>) -> ServiceResult<Vec<D>> {
        let map = self.map()?;
        let stored = self.repo.add_range(map.to_storages(&dtos)?).await?;
        info!(table = E::default().table_name(), n = stored.len(), "records_added");
        Ok(map.to_dtos(&stored)?)
    }

    #[instrument(skip_all)]
    pub async fn update(&self, dto: D) -> ServiceResult<D> {
        let map = self.map()?;
        let stored = self.repo.update(map.to_storage(&dto)?).await?;
        Ok(map.to_dto(&stored)?)
    }

    #[instrument(skip_all, fields(n = dtos.len()))]
    pub async fn update_range(&self, dtos: Vec<D>) -> ServiceResult<Vec<D>> {
        let map = self.map()?;
        let stored = self.repo.update_range(map.to_storages(&dtos)?).await?;
        Ok(map.to_dtos(&stored)?)
    }

    /// Rows affected.
    #[instrument(skip_all)]
    pub async fn remove(&self, dto: D) -> ServiceResult<u64> {
        let row = self.map()?.to_storage(&dto)?;
        let affected = self.repo.remove(row).await?;
        info!(table = E::default().table_name(), affected, "record_removed");
        Ok(affected)
    }

    #[instrument(skip_all, fields(n = dtos.len()))]
    pub async fn remove_range(&self, dtos: Vec<D>) -> ServiceResult<u64> {
        let rows = self.map()?.to_storages(&dtos)?;
        let affected = self.repo.remove_range(rows).await?;
        info!(table = E::default().table_name(), affected, "records_removed");
        Ok(affected)
    }
}
