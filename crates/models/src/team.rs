use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::person;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "team")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Filled only by eager loading.
    #[sea_orm(ignore)]
    #[serde(default)]
    pub members: Vec<person::Model>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Person,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Person => Entity::has_many(person::Entity).into() }
    }
}

impl Related<person::Entity> for Entity {
    fn to() -> RelationDef { Relation::Person.def() }
}

impl ActiveModelBehavior for ActiveModel {}
