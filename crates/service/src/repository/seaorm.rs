use std::marker::PhantomData;
use std::str::FromStr;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    IntoActiveModel, PaginatorTrait, PrimaryKeyTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use super::{Include, Repository, StorageEntity, StorageModel};
use crate::errors::{ServiceError, ServiceResult};
use crate::predicate::condition::{column, to_condition};
use crate::predicate::Predicate;

pub struct SeaOrmRepository<E> {
    pub db: DatabaseConnection,
    _entity: PhantomData<E>,
}

impl<E> SeaOrmRepository<E> {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, _entity: PhantomData }
    }
}

impl<E> SeaOrmRepository<E>
where
    E: StorageEntity,
    E::Model: StorageModel,
{
    /// Typed variant of [`Repository::get_limited_ordered`].
    pub async fn get_limited_ordered_by(&self, limit: u64, col: E::Column) -> ServiceResult<Vec<E::Model>> {
        let rows = E::find().order_by_asc(col).limit(limit).all(&self.db).await?;
        Ok(rows)
    }
}

/// Active model ready for insert: every column marked as set, except an
/// auto-increment key, which the backend assigns.
fn insertable<E>(model: E::Model) -> E::ActiveModel
where
    E: StorageEntity,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E>,
{
    let mut am = model.into_active_model().reset_all();
    if <E::PrimaryKey as PrimaryKeyTrait>::auto_increment() {
        am.not_set(E::id_column());
    }
    am
}

async fn insert_one<E, C>(db: &C, model: E::Model) -> ServiceResult<E::Model>
where
    C: ConnectionTrait,
    E: StorageEntity,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
{
    Ok(insertable::<E>(model).insert(db).await?)
}

async fn update_one<E, C>(db: &C, model: E::Model) -> ServiceResult<E::Model>
where
    C: ConnectionTrait,
    E: StorageEntity,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
{
    Ok(model.into_active_model().reset_all().update(db).await?)
}

async fn delete_one<E, C>(db: &C, model: E::Model) -> ServiceResult<u64>
where
    C: ConnectionTrait,
    E: StorageEntity,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
{
    Ok(model.into_active_model().delete(db).await?.rows_affected)
}

#[async_trait]
impl<E> Repository<E> for SeaOrmRepository<E>
where
    E: StorageEntity,
    E::Model: StorageModel + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
    E::Column: FromStr,
{
    async fn get_by_id(&self, id: i32) -> ServiceResult<Option<E::Model>> {
        debug!(table = E::default().table_name(), id, "get_by_id");
        let row = E::find().filter(E::id_column().eq(id)).one(&self.db).await?;
        Ok(row)
    }

    async fn get_by_guid(&self, guid: &str) -> ServiceResult<Option<E::Model>> {
        debug!(table = E::default().table_name(), guid, "get_by_guid");
        let col = E::guid_column()
            .ok_or_else(|| ServiceError::invalid(format!("{} has no guid column", E::default().table_name())))?;
        let guid = Uuid::parse_str(guid).map_err(|e| ServiceError::invalid(format!("malformed guid `{guid}`: {e}")))?;
        let row = E::find().filter(col.eq(guid)).one(&self.db).await?;
        Ok(row)
    }

    async fn get_all(&self) -> ServiceResult<Vec<E::Model>> {
        debug!(table = E::default().table_name(), "get_all");
        Ok(E::find().all(&self.db).await?)
    }

    async fn get_all_with_related(&self, includes: &[&dyn Include<E>]) -> ServiceResult<Vec<E::Model>> {
        let mut rows = E::find().all(&self.db).await?;
        for include in includes {
            debug!(table = E::default().table_name(), include = include.name(), rows = rows.len(), "eager load");
            include.load(&self.db, &mut rows).await?;
        }
        Ok(rows)
    }

    async fn find(&self, predicate: &Predicate<E::Model>) -> ServiceResult<Vec<E::Model>> {
        debug!(table = E::default().table_name(), %predicate, "find");
        let cond = to_condition::<E>(predicate)?;
        Ok(E::find().filter(cond).all(&self.db).await?)
    }

    async fn find_paged(&self, predicate: &Predicate<E::Model>, skip: u64, take: u64) -> ServiceResult<Vec<E::Model>> {
        debug!(table = E::default().table_name(), %predicate, skip, take, "find_paged");
        let cond = to_condition::<E>(predicate)?;
        let rows = E::find()
            .filter(cond)
            .order_by_asc(E::id_column())
            .offset(skip)
            .limit(take)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn find_one(&self, predicate: &Predicate<E::Model>) -> ServiceResult<Option<E::Model>> {
        debug!(table = E::default().table_name(), %predicate, "find_one");
        let cond = to_condition::<E>(predicate)?;
        Ok(E::find().filter(cond).order_by_asc(E::id_column()).one(&self.db).await?)
    }

    async fn get_limited_ordered(&self, limit: u64, field: &str) -> ServiceResult<Vec<E::Model>> {
        debug!(table = E::default().table_name(), limit, field, "get_limited_ordered");
        let col = column::<E>(field)?;
        self.get_limited_ordered_by(limit, col).await
    }

    async fn count(&self) -> ServiceResult<u64> {
        Ok(E::find().count(&self.db).await?)
    }

    async fn count_by_predicate(&self, predicate: &Predicate<E::Model>) -> ServiceResult<u64> {
        debug!(table = E::default().table_name(), %predicate, "count_by_predicate");
        let cond = to_condition::<E>(predicate)?;
        Ok(E::find().filter(cond).count(&self.db).await?)
    }

    async fn add(&self, model: E::Model) -> ServiceResult<E::Model> {
        let stored = insert_one::<E, _>(&self.db, model).await?;
        debug!(table = E::default().table_name(), "add");
        Ok(stored)
    }

    async fn add_range(&self, models: Vec<E::Model>) -> ServiceResult<Vec<E::Model>> {
        debug!(table = E::default().table_name(), n = models.len(), "add_range");
        let txn = self.db.begin().await?;
        let mut stored = Vec::with_capacity(models.len());
        for model in models {
            stored.push(insert_one::<E, _>(&txn, model).await?);
        }
        txn.commit().await?;
        Ok(stored)
    }

    async fn update(&self, model: E::Model) -> ServiceResult<E::Model> {
        debug!(table = E::default().table_name(), "update");
        update_one::<E, _>(&self.db, model).await
    }

    async fn update_range(&self, models: Vec<E::Model>) -> ServiceResult<Vec<E::Model>> {
        debug!(table = E::default().table_name(), n = models.len(), "update_range");
        let txn = self.db.begin().await?;
        let mut stored = Vec::with_capacity(models.len());
        for model in models {
            stored.push(update_one::<E, _>(&txn, model).await?);
        }
        txn.commit().await?;
        Ok(stored)
    }

    async fn remove(&self, model: E::Model) -> ServiceResult<u64> {
        let affected = delete_one::<E, _>(&self.db, model).await?;
        debug!(table = E::default().table_name(), affected, "remove");
        Ok(affected)
    }

    async fn remove_range(&self, models: Vec<E::Model>) -> ServiceResult<u64> {
        debug!(table = E::default().table_name(), n = models.len(), "remove_range");
        let txn = self.db.begin().await?;
        let mut affected = 0;
        for model in models {
            affected += delete_one::<E, _>(&txn, model).await?;
        }
        txn.commit().await?;
        Ok(affected)
    }
}
