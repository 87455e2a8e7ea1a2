//! Eager loading of related entities.
//!
//! Each include issues one batched query through SeaORM's loader and hands
//! the results to a setter that fills the model's `#[sea_orm(ignore)]`
//! navigation field.

use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, LoaderTrait, ModelTrait, Related};

#[async_trait]
pub trait Include<E: EntityTrait>: Send + Sync {
    fn name(&self) -> &str;
    async fn load(&self, db: &DatabaseConnection, models: &mut [E::Model]) -> Result<(), DbErr>;
}

/// To-one relation (`belongs_to`).
pub struct IncludeOne<E: EntityTrait, R: EntityTrait> {
    name: &'static str,
    attach: fn(&mut E::Model, Option<R::Model>),
    _rel: PhantomData<(E, R)>,
}

impl<E: EntityTrait, R: EntityTrait> IncludeOne<E, R> {
    pub fn new(name: &'static str, attach: fn(&mut E::Model, Option<R::Model>)) -> Self {
        Self { name, attach, _rel: PhantomData }
    }
}

/// To-many relation (`has_many`).
pub struct IncludeMany<E: EntityTrait, R: EntityTrait> {
    name: &'static str,
    attach: fn(&mut E::Model, Vec<R::Model>),
    _rel: PhantomData<(E, R)>,
}

impl<E: EntityTrait, R: EntityTrait> IncludeMany<E, R> {
    pub fn new(name: &'static str, attach: fn(&mut E::Model, Vec<R::Model>)) -> Self {
        Self { name, attach, _rel: PhantomData }
    }
}

#[async_trait]
impl<E, R> Include<E> for IncludeOne<E, R>
where
    E: EntityTrait + Related<R>,
    E::Model: ModelTrait<Entity = E> + Sync,
    R: EntityTrait,
    R::Model: Send + Sync,
{
    fn name(&self) -> &str {
        self.name
    }

    async fn load(&self, db: &DatabaseConnection, models: &mut [E::Model]) -> Result<(), DbErr> {
        let snapshot: Vec<E::Model> = models.to_vec();
        let loaded: Vec<Option<R::Model>> = snapshot.load_one(R::default(), db).await?;
        for (model, related) in models.iter_mut().zip(loaded) {
            (self.attach)(model, related);
        }
        Ok(())
    }
}

#[async_trait]
impl<E, R> Include<E> for IncludeMany<E, R>
where
    E: EntityTrait + Related<R>,
    E::Model: ModelTrait<Entity = E> + Sync,
    R: EntityTrait,
    R::Model: Send + Sync,
{
    fn name(&self) -> &str {
        self.name
    }

    async fn load(&self, db: &DatabaseConnection, models: &mut [E::Model]) -> Result<(), DbErr> {
        let snapshot: Vec<E::Model> = models.to_vec();
        let loaded: Vec<Vec<R::Model>> = snapshot.load_many(R::default(), db).await?;
        for (model, related) in models.iter_mut().zip(loaded) {
            (self.attach)(model, related);
        }
        Ok(())
    }
}
